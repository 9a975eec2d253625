//! Runner configuration loader.
//!
//! Reads `config.toml` from the data directory (`~/.runweave/` in
//! production) and deserializes it into [`RunnerConfig`]. Falls back to
//! defaults when the file is missing or malformed -- a broken config file
//! must never stop runs from executing.

use std::path::Path;

use runweave_types::config::RunnerConfig;

/// Load runner configuration from `{data_dir}/config.toml`.
///
/// - If the file does not exist, returns [`RunnerConfig::default()`].
/// - If the file exists but cannot be read or parsed, logs a warning and
///   returns the default.
/// - Otherwise returns the parsed config.
pub async fn load_runner_config(data_dir: &Path) -> RunnerConfig {
    let config_path = data_dir.join("config.toml");

    let content = match tokio::fs::read_to_string(&config_path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!(
                "No config.toml found at {}, using defaults",
                config_path.display()
            );
            return RunnerConfig::default();
        }
        Err(err) => {
            tracing::warn!(
                "Failed to read {}: {err}, using defaults",
                config_path.display()
            );
            return RunnerConfig::default();
        }
    };

    match toml::from_str::<RunnerConfig>(&content) {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!(
                "Failed to parse {}: {err}, using defaults",
                config_path.display()
            );
            RunnerConfig::default()
        }
    }
}
