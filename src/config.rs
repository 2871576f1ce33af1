//! Application configuration.

use crate::engine::ReplyPolicy;
use crate::games::tictactoe::{GameMode, Mark};
use derive_getters::Getters;
use derive_more::{Display, Error};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, instrument};

/// Settings for a play session, read from TOML.
#[derive(Debug, Clone, PartialEq, Eq, Getters, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Serial device the peer is attached to.
    port: String,

    /// Line speed of the serial device.
    baud_rate: u32,

    /// Mode used for new games.
    mode: GameMode,

    /// The human's mark in `HumanVsAgent`.
    human_side: Option<Mark>,

    /// File used by save and load.
    save_path: PathBuf,

    /// Milliseconds to wait for the peer before asking again; 0 waits forever.
    reply_timeout_ms: u64,

    /// Re-sends of an unanswered request.
    max_retries: u32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: "/dev/ttyUSB0".to_string(),
            baud_rate: 9600,
            mode: GameMode::HumanVsAgent,
            human_side: Some(Mark::X),
            save_path: PathBuf::from("games/last.ini"),
            reply_timeout_ms: 0,
            max_retries: 3,
        }
    }
}

impl AppConfig {
    /// Loads configuration from a TOML file.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        debug!("Loading config from file");
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::new(format!("Failed to read config file: {}", e)))?;

        let config = Self::from_toml(&content)?;
        info!(port = %config.port, mode = %config.mode, "Config loaded successfully");
        Ok(config)
    }

    /// Loads configuration from `path`, or defaults when the file is absent.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        if path.as_ref().exists() {
            Self::from_file(path)
        } else {
            debug!("Config file not found; using defaults");
            Ok(Self::default())
        }
    }

    /// Parses configuration from TOML text.
    #[instrument(skip(content))]
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content)
            .map_err(|e| ConfigError::new(format!("Failed to parse config: {}", e)))
    }

    /// Overrides the fields given on the command line.
    #[instrument(skip(self))]
    pub fn apply_overrides(
        mut self,
        port: Option<String>,
        baud_rate: Option<u32>,
        mode: Option<GameMode>,
        human_side: Option<Mark>,
        save_path: Option<PathBuf>,
    ) -> Self {
        if let Some(port) = port {
            self.port = port;
        }
        if let Some(baud_rate) = baud_rate {
            self.baud_rate = baud_rate;
        }
        if let Some(mode) = mode {
            self.mode = mode;
        }
        if human_side.is_some() {
            self.human_side = human_side;
        }
        if let Some(save_path) = save_path {
            self.save_path = save_path;
        }
        self
    }

    /// Reply timeout and retry budget for the engine.
    pub fn reply_policy(&self) -> ReplyPolicy {
        match self.reply_timeout_ms {
            0 => ReplyPolicy::default(),
            ms => ReplyPolicy::new(Duration::from_millis(ms), self.max_retries),
        }
    }
}

/// Configuration error.
#[derive(Debug, Clone, Display, Error)]
#[display("Config error: {} at {}:{}", message, file, line)]
pub struct ConfigError {
    /// Error message.
    pub message: String,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl ConfigError {
    /// Creates a new configuration error.
    #[track_caller]
    #[instrument(skip(message))]
    pub fn new(message: String) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            message,
            line: loc.line(),
            file: loc.file(),
        }
    }
}
