mod config;
pub mod local_store;

pub use config::{ClockConfig, Config, GenerationConfig, RoutineConfig};
pub use local_store::LocalStore;

use std::path::PathBuf;

use crate::error::ConfigError;

/// Returns `~/.config/thed[-dev]/` based on THED_ENV.
///
/// Set THED_ENV=dev to use development data directory.
///
/// # Errors
/// Returns an error if creating the config directory fails.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("THED_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("thed-dev")
    } else {
        base_dir.join("thed")
    };

    std::fs::create_dir_all(&dir).map_err(|e| ConfigError::DataDir(e.to_string()))?;
    Ok(dir)
}
