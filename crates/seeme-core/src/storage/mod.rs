mod config;

pub use config::{CommitConfig, Config, RemoteConfig};

use std::path::PathBuf;

use crate::error::ConfigError;

/// Returns the data directory, creating it if needed.
///
/// Resolution order:
/// - `SEEME_DATA_DIR` if set
/// - `~/.config/seeme-dev/` when `SEEME_ENV=dev`
/// - `~/.config/seeme/`
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let dir = match std::env::var_os("SEEME_DATA_DIR") {
        Some(explicit) => PathBuf::from(explicit),
        None => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");

            let env = std::env::var("SEEME_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("seeme-dev")
            } else {
                base_dir.join("seeme")
            }
        }
    };

    std::fs::create_dir_all(&dir)
        .map_err(|e| ConfigError::DataDir(format!("{}: {e}", dir.display())))?;
    Ok(dir)
}
