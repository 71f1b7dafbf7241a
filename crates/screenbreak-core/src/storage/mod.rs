mod config;

pub use config::{Config, DashboardConfig, ForwarderConfig, InterventionConfig, ServerConfig};

use std::path::PathBuf;

use crate::error::{ConfigError, Result};

/// Returns the client's configuration directory.
///
/// Resolution order:
/// 1. `$SCREENBREAK_CONFIG_DIR` when set
/// 2. `~/.config/screenbreak-dev/` when `SCREENBREAK_ENV=dev`
/// 3. `~/.config/screenbreak/`
///
/// # Errors
/// Returns an error if the home directory cannot be determined or if
/// creating the config directory fails.
pub fn data_dir() -> Result<PathBuf> {
    let dir = match std::env::var_os("SCREENBREAK_CONFIG_DIR") {
        Some(dir) => PathBuf::from(dir),
        None => {
            let base_dir = dirs::home_dir()
                .ok_or(ConfigError::NoConfigDir)?
                .join(".config");

            let env = std::env::var("SCREENBREAK_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("screenbreak-dev")
            } else {
                base_dir.join("screenbreak")
            }
        }
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
