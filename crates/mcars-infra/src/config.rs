//! Configuration loader for the chat widget.
//!
//! Reads `config.toml` from the data directory (`~/.mcars/` in production)
//! and deserializes it into [`AppConfig`]. Falls back to the stock storefront
//! defaults when the file is missing or malformed.

use std::path::{Path, PathBuf};

use mcars_types::config::AppConfig;

/// Environment variable that overrides the data directory.
pub const DATA_DIR_ENV: &str = "MCARS_DATA_DIR";

/// Resolve the data directory.
///
/// `MCARS_DATA_DIR` wins, then `~/.mcars`, then `./.mcars`.
pub fn resolve_data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
        return PathBuf::from(dir);
    }

    if let Some(home) = dirs::home_dir() {
        return home.join(".mcars");
    }

    PathBuf::from(".mcars")
}

/// Load configuration from `{data_dir}/config.toml`.
///
/// - If the file does not exist, returns [`AppConfig::default()`].
/// - If the file cannot be read or parsed, logs a warning and returns the default.
pub async fn load_app_config(data_dir: &Path) -> AppConfig {
    let config_path = data_dir.join("config.toml");

    let content = match tokio::fs::read_to_string(&config_path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No config.toml found at {}, using defaults", config_path.display());
            return AppConfig::default();
        }
        Err(err) => {
            tracing::warn!("Failed to read {}: {err}, using defaults", config_path.display());
            return AppConfig::default();
        }
    };

    match toml::from_str::<AppConfig>(&content) {
        Ok(config) => {
            tracing::debug!(path = %config_path.display(), "Loaded config.toml");
            config
        }
        Err(err) => {
            tracing::warn!(
                "Failed to parse {}: {err}, using defaults",
                config_path.display()
            );
            AppConfig::default()
        }
    }
}
