//! Line-oriented console
//!
//! Reads one command per line from stdin and prints one JSON reply per line.

use super::export::{get_last_export, save_replay};
use super::recording::{
    get_buffer_status, get_recording_state, start_recording, stop_recording, RecorderState,
};
use crate::utils::{AppError, AppResult, ErrorResponse};
use serde_json::{json, Value};
use std::future::Future;
use std::str::FromStr;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};

/// Commands accepted on stdin
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleCommand {
    Save,
    Status,
    State,
    Last,
    Start,
    Stop,
    Help,
    Quit,
}

impl FromStr for ConsoleCommand {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "save" | "s" => Ok(Self::Save),
            "status" => Ok(Self::Status),
            "state" => Ok(Self::State),
            "last" => Ok(Self::Last),
            "start" => Ok(Self::Start),
            "stop" => Ok(Self::Stop),
            "help" | "?" => Ok(Self::Help),
            "quit" | "exit" | "q" => Ok(Self::Quit),
            other => Err(AppError::UnknownCommand(other.to_string())),
        }
    }
}

/// Whether the console keeps reading after a command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// Run one command and produce its JSON reply
pub async fn dispatch(state: &RecorderState, command: ConsoleCommand) -> AppResult<(Value, Flow)> {
    let reply = match command {
        ConsoleCommand::Save => serde_json::to_value(save_replay(state).await?)?,
        ConsoleCommand::Status => serde_json::to_value(get_buffer_status(state))?,
        ConsoleCommand::State => json!({ "state": get_recording_state(state) }),
        ConsoleCommand::Last => serde_json::to_value(get_last_export(state))?,
        ConsoleCommand::Start => {
            start_recording(state, state.config.clone()).await?;
            serde_json::to_value(get_buffer_status(state))?
        }
        ConsoleCommand::Stop => {
            stop_recording(state).await?;
            serde_json::to_value(get_buffer_status(state))?
        }
        ConsoleCommand::Help => json!({
            "commands": ["save", "status", "state", "last", "start", "stop", "help", "quit"]
        }),
        ConsoleCommand::Quit => return Ok((json!({ "bye": true }), Flow::Quit)),
    };
    Ok((reply, Flow::Continue))
}

async fn handle_line(state: &RecorderState, line: &str) -> (String, Flow) {
    let result = match line.parse::<ConsoleCommand>() {
        Ok(command) => dispatch(state, command).await,
        Err(e) => Err(e),
    };

    match result {
        Ok((value, flow)) => (value.to_string(), flow),
        Err(e) => {
            tracing::debug!("Command {:?} failed: {}", line, e);
            let response = ErrorResponse::from(e);
            let text = serde_json::to_string(&response)
                .unwrap_or_else(|_| format!("{{\"code\":\"{}\"}}", response.code));
            (text, Flow::Continue)
        }
    }
}

/// Serve commands from stdin until `quit`, Ctrl-C, or EOF followed by Ctrl-C
pub async fn run_console(state: &RecorderState) -> AppResult<()> {
    serve_lines(state, tokio::io::stdin(), tokio::signal::ctrl_c()).await
}

/// Command loop over any line source.
///
/// An interrupt that arrives while a command runs lets that command finish
/// and then ends the loop.
async fn serve_lines<R, I>(state: &RecorderState, input: R, interrupt: I) -> AppResult<()>
where
    R: AsyncRead + Unpin,
    I: Future<Output = std::io::Result<()>>,
{
    let mut lines = BufReader::new(input).lines();
    tokio::pin!(interrupt);

    loop {
        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = &mut interrupt => {
                tracing::info!("Interrupted");
                return Ok(());
            }
        };

        let Some(line) = line else {
            tracing::info!("stdin closed, capture continues until Ctrl-C");
            (&mut interrupt).await?;
            return Ok(());
        };

        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let handling = handle_line(state, line);
        tokio::pin!(handling);
        let (reply, flow) = tokio::select! {
            handled = &mut handling => handled,
            _ = &mut interrupt => {
                tracing::info!("Interrupted, finishing {:?} first", line);
                let (reply, _) = handling.await;
                (reply, Flow::Quit)
            }
        };

        println!("{}", reply);
        if flow == Flow::Quit {
            return Ok(());
        }
    }
}
