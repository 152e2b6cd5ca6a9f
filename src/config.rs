use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::codec::ResponseCheck;

pub const DEFAULT_UNIT_ID: u8 = 1;
pub const DEFAULT_SETTLE_DELAY_MS: u64 = 300;
pub const DEFAULT_MAX_RESPONSE_LEN: usize = 8;
pub const DEFAULT_COMMAND_PAUSE_MS: u64 = 500;
pub const DEFAULT_MOTION_PAUSE_MS: u64 = 1000;
pub const DEFAULT_MOTION_KEYWORDS: [&str; 3] = ["enable", "trigger", "emergency"];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Cannot read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed config: {0}")]
    Json(#[from] serde_json::Error),
}

/// Timing and validation settings for one transport session.
///
/// The channel read timeout is not part of this: it belongs to whoever
/// opened the serial port. The pause fields only apply to command sequences.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub settle_delay_ms: u64,
    pub max_response_len: usize,
    pub response_check: ResponseCheck,
    pub command_pause_ms: u64,
    pub motion_pause_ms: u64,
    /// Case-insensitive words in a register description marking it as motion affecting.
    pub motion_keywords: Vec<String>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            settle_delay_ms: DEFAULT_SETTLE_DELAY_MS,
            max_response_len: DEFAULT_MAX_RESPONSE_LEN,
            response_check: ResponseCheck::Lenient,
            command_pause_ms: DEFAULT_COMMAND_PAUSE_MS,
            motion_pause_ms: DEFAULT_MOTION_PAUSE_MS,
            motion_keywords: DEFAULT_MOTION_KEYWORDS.iter().map(|k| k.to_string()).collect(),
        }
    }
}

impl SessionConfig {
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn pacing(&self) -> CommandPacing {
        CommandPacing {
            command_pause: Duration::from_millis(self.command_pause_ms),
            motion_pause: Duration::from_millis(self.motion_pause_ms),
            motion_keywords: self
                .motion_keywords
                .iter()
                .map(|k| k.to_lowercase())
                .collect(),
        }
    }
}

/// Pause inserted after each successful command of a sequence.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommandPacing {
    pub command_pause: Duration,
    pub motion_pause: Duration,
    pub motion_keywords: Vec<String>,
}

impl Default for CommandPacing {
    fn default() -> Self {
        SessionConfig::default().pacing()
    }
}

impl CommandPacing {
    /// No pauses at all.
    pub fn immediate() -> Self {
        CommandPacing {
            command_pause: Duration::ZERO,
            motion_pause: Duration::ZERO,
            motion_keywords: Vec::new(),
        }
    }

    pub fn is_motion(&self, description: &str) -> bool {
        let description = description.to_lowercase();
        self.motion_keywords
            .iter()
            .any(|keyword| description.contains(keyword.as_str()))
    }

    pub fn pause_after(&self, description: &str) -> Duration {
        if self.is_motion(description) {
            self.motion_pause
        } else {
            self.command_pause
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct DriveConfig {
    pub dictionary: PathBuf,
    #[serde(default = "default_unit_id")]
    pub unit_id: u8,
    #[serde(default)]
    pub session: SessionConfig,
}

fn default_unit_id() -> u8 {
    DEFAULT_UNIT_ID
}

impl DriveConfig {
    pub fn new(dictionary: impl Into<PathBuf>) -> Self {
        DriveConfig {
            dictionary: dictionary.into(),
            unit_id: DEFAULT_UNIT_ID,
            session: SessionConfig::default(),
        }
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let source = fs::read_to_string(path)?;
        Self::from_json_str(&source)
    }

    pub fn from_json_str(source: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(source)?)
    }
}
