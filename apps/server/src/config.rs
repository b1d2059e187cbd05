use crate::error::{Result, WrapErr};
use config::{AppStrategy, create_strategy, resolve_dir};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default = "default_config", deny_unknown_fields)]
pub struct Config {
    pub runtime_dir: PathBuf,
    /// Sessions untouched for this long are dropped
    pub session_timeout_secs: u64,
    pub search: SearchSettings,
}

/// How the simulated search produces its results.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct SearchSettings {
    /// Rounds until the search is complete
    pub batches: u32,
    /// Offers found per round
    pub batch_size: u32,
    pub batch_interval_ms: u64,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            batches: 8,
            batch_size: 6,
            batch_interval_ms: 750,
        }
    }
}

impl SearchSettings {
    pub fn batch_interval(&self) -> Duration {
        Duration::from_millis(self.batch_interval_ms)
    }
}

fn default_config() -> Config {
    let runtime_dir = match create_strategy() {
        Ok(strategy) => resolve_dir("RUNTIME_DIRECTORY", &strategy, |s| s.runtime_dir()),
        Err(_) => std::env::temp_dir().join(config::constants::APP_NAME),
    };

    Config {
        runtime_dir,
        session_timeout_secs: 1800,
        search: SearchSettings::default(),
    }
}

impl Config {
    fn load_str(user_config_str: &str) -> Result<Config> {
        let user_config: Config = toml::from_str(user_config_str)?;
        Ok(user_config)
    }

    pub fn load() -> Result<Config> {
        let strategy = create_strategy()?;
        let config_path = config::config_file(&strategy, config::constants::SERVER_CONFIG_FILE_NAME);

        match std::fs::read_to_string(&config_path) {
            Ok(user_config_str) => Self::load_str(&user_config_str)
                .wrap_err_with(|| format!("Invalid configuration file {config_path:?}")),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Self::create_example_config(&config_path)?;
                Self::load_str("")
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn session_timeout(&self) -> Duration {
        Duration::from_secs(self.session_timeout_secs)
    }

    pub fn socket_path(&self) -> PathBuf {
        config::socket_path(&self.runtime_dir)
    }

    fn create_example_config(config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let example_config = r#"# skypoll search service configuration
#
# Created on first run. Restart the service after editing.

# Sessions that are not polled for this long are dropped
# session-timeout-secs = 1800

# Optional: custom runtime directory (holds the socket)
# runtime-dir = "/custom/runtime/path"

[search]
# A search finishes after this many rounds
# batches = 8
# Offers found per round
# batch-size = 6
# Delay between rounds
# batch-interval-ms = 750
"#;

        std::fs::write(config_path, example_config)
            .wrap_err_with(|| format!("Could not write example configuration {config_path:?}"))?;
        tracing::info!(?config_path, "created example configuration");

        Ok(())
    }
}
