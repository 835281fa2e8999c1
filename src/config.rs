//! Replay buffer configuration
//!
//! Loaded from a JSON file when one is given, otherwise defaults are used.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Environment variable naming a JSON config file
pub const CONFIG_ENV_VAR: &str = "INSTANT_REPLAY_CONFIG";

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// FFmpeg capture settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CaptureSettings {
    /// FFmpeg executable
    pub ffmpeg_path: PathBuf,

    /// Arguments describing the capture source, placed before `-t`
    pub input_args: Vec<String>,

    /// Encoder arguments placed before the output path
    pub output_args: Vec<String>,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            ffmpeg_path: PathBuf::from("ffmpeg"),
            input_args: ["-f", "lavfi", "-i", "testsrc=size=1280x720:rate=30"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            output_args: [
                "-c:v",
                "libx264",
                "-preset",
                "veryfast",
                "-pix_fmt",
                "yuv420p",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }
}

/// Configuration for continuous capture
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReplayConfig {
    /// Length of each captured segment
    pub segment_duration_seconds: u64,

    /// Minimum amount of content kept in the buffer
    pub buffer_window_seconds: u64,

    /// Where segments are recorded
    pub segment_dir: PathBuf,

    /// Where exported replays are written
    pub export_dir: PathBuf,

    /// Container extension shared by segments and replays
    pub container: String,

    pub capture: CaptureSettings,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            segment_duration_seconds: 5,
            buffer_window_seconds: 30,
            segment_dir: std::env::temp_dir().join("instant-replay").join("segments"),
            export_dir: PathBuf::from("replays"),
            container: "mp4".to_string(),
            capture: CaptureSettings::default(),
        }
    }
}

impl ReplayConfig {
    /// Parse and validate a JSON config file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_json(&content)?;
        tracing::debug!("Loaded config from {:?}", path);
        Ok(config)
    }

    pub fn from_json(content: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from an explicit path, then `INSTANT_REPLAY_CONFIG`, then defaults
    pub fn resolve(explicit: Option<PathBuf>) -> Result<Self, ConfigError> {
        let path = explicit.or_else(|| std::env::var_os(CONFIG_ENV_VAR).map(PathBuf::from));
        match path {
            Some(path) => Self::load(&path),
            None => {
                let config = Self::default();
                config.validate()?;
                Ok(config)
            }
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.segment_duration_seconds == 0 {
            return Err(ConfigError::Invalid(
                "segmentDurationSeconds must be greater than zero".to_string(),
            ));
        }
        if self.buffer_window_seconds < self.segment_duration_seconds {
            return Err(ConfigError::Invalid(format!(
                "bufferWindowSeconds ({}) must be at least segmentDurationSeconds ({})",
                self.buffer_window_seconds, self.segment_duration_seconds
            )));
        }
        if self.container.is_empty() || self.container.contains(|c: char| matches!(c, '/' | '\\' | '.')) {
            return Err(ConfigError::Invalid(format!(
                "container must be a bare extension, got {:?}",
                self.container
            )));
        }
        Ok(())
    }

    pub fn segment_duration(&self) -> Duration {
        Duration::from_secs(self.segment_duration_seconds)
    }

    pub fn buffer_window(&self) -> Duration {
        Duration::from_secs(self.buffer_window_seconds)
    }
}
