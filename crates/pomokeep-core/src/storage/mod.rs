mod config;
pub mod keys;
pub mod migrations;
mod preferences;
mod store;

pub use config::{Config, LedgerConfig, TimerConfig};
pub use preferences::{PreferenceValues, Preferences, ThemeMode, MAX_DURATION_MIN, MIN_DURATION_MIN};
pub use store::Store;

use std::path::PathBuf;

use crate::error::ConfigError;

/// Returns `~/.config/pomokeep/`, or `$POMOKEEP_HOME` when set.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let dir = match std::env::var_os("POMOKEEP_HOME") {
        Some(home) if !home.is_empty() => PathBuf::from(home),
        _ => dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".config")
            .join("pomokeep"),
    };

    std::fs::create_dir_all(&dir).map_err(|source| ConfigError::DataDir {
        path: dir.clone(),
        source,
    })?;
    Ok(dir)
}
