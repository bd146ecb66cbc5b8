//! Configuration loader for chatlog.
//!
//! Reads `config.toml` from the data directory (`~/.chatlog/` in production)
//! and deserializes it into [`MemoryConfig`]. Falls back to defaults when the
//! file is missing or malformed.

use std::path::Path;

use chatlog_types::config::MemoryConfig;

/// Load configuration from `{data_dir}/config.toml`.
///
/// - If the file does not exist, returns [`MemoryConfig::default()`] (no indexes, no TTL).
/// - If the file exists but fails to parse, logs a warning and returns the default.
/// - If the file exists and parses successfully, returns the parsed config.
pub async fn load_config(data_dir: &Path) -> MemoryConfig {
    let config_path = data_dir.join("config.toml");

    let content = match tokio::fs::read_to_string(&config_path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No config.toml found at {}, using defaults", config_path.display());
            return MemoryConfig::default();
        }
        Err(err) => {
            tracing::warn!("Failed to read {}: {err}, using defaults", config_path.display());
            return MemoryConfig::default();
        }
    };

    match toml::from_str::<MemoryConfig>(&content) {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!(
                "Failed to parse {}: {err}, using defaults",
                config_path.display()
            );
            MemoryConfig::default()
        }
    }
}
