//! Error types for holecheck

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Result type alias using the holecheck Error
pub type Result<T> = std::result::Result<T, Error>;

/// holecheck error types
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("Config write error: {0}")]
    ConfigWrite(#[from] toml::ser::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Target failed to launch: {0}")]
    Launch(String),

    #[error("Target output ended while waiting for {waiting_for}")]
    StreamClosed { waiting_for: String },

    #[error("Target stalled: no {waiting_for} within {seconds}s")]
    Stalled { waiting_for: String, seconds: u64 },

    #[error("Run cancelled")]
    Cancelled,

    #[error("Control not found on screen: {0}")]
    ControlNotFound(String),

    #[error("Input injection failed: {0}")]
    Input(String),

    #[error("Unusable reply from target: {0}")]
    InvalidReply(String),

    #[error("Save file not found: {}", .0.display())]
    ArtifactMissing(PathBuf),

    #[error("Save file format error at line {line}: {reason}")]
    ArtifactFormat { line: usize, reason: String },

    #[error("Converter failed: {0}")]
    Converter(String),
}

impl Error {
    /// Build a stall error from the wait that ran out of time
    pub fn stalled(waiting_for: impl Into<String>, after: Duration) -> Self {
        Error::Stalled {
            waiting_for: waiting_for.into(),
            seconds: after.as_secs(),
        }
    }

    /// Classify this error for reporting
    pub fn kind(&self) -> FailureKind {
        match self {
            Error::Launch(_) => FailureKind::Launch,
            Error::StreamClosed { .. } => FailureKind::StreamClosed,
            Error::Stalled { .. } => FailureKind::Stalled,
            Error::Cancelled => FailureKind::Cancelled,
            Error::ControlNotFound(_) => FailureKind::ControlLocation,
            Error::Input(_) => FailureKind::Input,
            Error::InvalidReply(_) => FailureKind::InvalidReply,
            Error::ArtifactMissing(_) => FailureKind::ArtifactMissing,
            Error::ArtifactFormat { .. } => FailureKind::ArtifactFormat,
            Error::Converter(_) => FailureKind::Converter,
            Error::InvalidConfig(_) | Error::ConfigParse(_) | Error::ConfigWrite(_) => {
                FailureKind::Config
            }
            Error::Io(_) | Error::Serialization(_) => FailureKind::Io,
        }
    }
}

/// Coarse failure category carried by a failed run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Launch,
    StreamClosed,
    Stalled,
    Cancelled,
    ControlLocation,
    Input,
    InvalidReply,
    ArtifactMissing,
    ArtifactFormat,
    Converter,
    Config,
    Io,
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            FailureKind::Launch => "launch",
            FailureKind::StreamClosed => "stream_closed",
            FailureKind::Stalled => "stalled",
            FailureKind::Cancelled => "cancelled",
            FailureKind::ControlLocation => "control_location",
            FailureKind::Input => "input",
            FailureKind::InvalidReply => "invalid_reply",
            FailureKind::ArtifactMissing => "artifact_missing",
            FailureKind::ArtifactFormat => "artifact_format",
            FailureKind::Converter => "converter",
            FailureKind::Config => "config",
            FailureKind::Io => "io",
        };
        write!(f, "{}", s)
    }
}
