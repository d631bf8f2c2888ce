//! holecheck Common Library
//!
//! Shared error taxonomy, configuration, verdict types and save-file parsing
//! used by the oracle engine and its command-line front end.

pub mod config;
pub mod error;
pub mod save_file;
pub mod types;

// Re-export commonly used types
pub use config::{InteractionMode, OracleConfig};
pub use error::{Error, FailureKind, Result};
pub use types::*;

/// holecheck version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default Steam library `steamapps` directory
pub fn default_steam_apps_path() -> std::path::PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| std::path::PathBuf::from("."))
        .join(".steam")
        .join("steam")
        .join("steamapps")
}

/// Default configuration file path
pub fn default_config_path() -> std::path::PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| std::path::PathBuf::from("."))
        .join(".holecheck")
        .join("config.toml")
}

/// Home directory helper
mod dirs {
    pub fn home_dir() -> Option<std::path::PathBuf> {
        std::env::var_os("HOME").map(std::path::PathBuf::from)
    }
}
