//! Caller-facing command handlers
//!
//! Thin wrappers over the coordinator plus the stdin console that drives them.

pub mod console;
pub mod export;
pub mod recording;

pub use console::{run_console, ConsoleCommand};
pub use recording::RecorderState;
