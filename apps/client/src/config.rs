use crate::cli::Cli;
use crate::error::Result;
use config::{AppStrategy, constants as config_constants, create_strategy, resolve_dir};
use search_session::{DEFAULT_PAGE_SIZE, DEFAULT_POLL_INTERVAL_MS, SessionConfig};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct SessionSettings {
    pub page_size: u32,
    pub poll_interval_ms: u64,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub session: SessionSettings,

    // === System state ===
    pub socket_path: PathBuf,
    pub config_path: PathBuf,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
struct RawConfig {
    session: SessionSettings,
}

impl Config {
    fn from_raw(raw: RawConfig, runtime_dir: PathBuf, config_path: PathBuf) -> Self {
        Self {
            session: raw.session,
            socket_path: config::socket_path(runtime_dir),
            config_path,
        }
    }

    pub fn load() -> Result<Config> {
        let strategy = create_strategy()?;
        let config_path = config::config_file(&strategy, config_constants::CLIENT_CONFIG_FILE_NAME);
        let runtime_dir = resolve_dir("RUNTIME_DIRECTORY", &strategy, |s| s.runtime_dir());

        let raw_config: RawConfig = match std::fs::read_to_string(&config_path) {
            Ok(content) => toml::from_str(&content)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => RawConfig::default(),
            Err(e) => return Err(e.into()),
        };

        Ok(Self::from_raw(raw_config, runtime_dir, config_path))
    }

    #[cfg(test)]
    fn load_str(config_str: &str) -> Result<Self> {
        let raw: RawConfig = toml::from_str(config_str)?;
        Ok(Self::from_raw(
            raw,
            PathBuf::from("/run/skypoll"),
            PathBuf::from("/etc/skypoll/client.toml"),
        ))
    }

    /// Command line flags win over the file.
    pub fn apply_cli(&mut self, cli: &Cli) {
        if let Some(socket) = &cli.socket {
            self.socket_path = socket.clone();
        }
        if let Some(page_size) = cli.page_size {
            self.session.page_size = page_size;
        }
        if let Some(interval) = cli.poll_interval_ms {
            self.session.poll_interval_ms = interval;
        }
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            page_size: self.session.page_size.max(1),
            poll_interval: Duration::from_millis(self.session.poll_interval_ms),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_session_defaults() {
        let cfg = Config::load_str("").expect("Failed to load config");
        assert_eq!(cfg.session, SessionSettings::default());
        assert_eq!(cfg.socket_path, PathBuf::from("/run/skypoll/skypoll.sock"));
        assert_eq!(cfg.session_config(), SessionConfig::default());
    }

    #[test]
    fn test_load_config_values() {
        const USER_CONFIG: &str = r#"
        [session]
        page-size = 25
        "#;

        let cfg = Config::load_str(USER_CONFIG).expect("Failed to load config");

        assert_eq!(cfg.session.page_size, 25);
        assert_eq!(cfg.session.poll_interval_ms, DEFAULT_POLL_INTERVAL_MS);
    }

    #[test]
    fn test_load_config_unknown_field() {
        const USER_CONFIG: &str = r#"
        [session]
        refresh = 3
        "#;

        assert!(Config::load_str(USER_CONFIG).is_err());
    }

    #[test]
    fn test_cli_overrides_file() {
        let mut cfg = Config::load_str("[session]\npage-size = 25\npoll-interval-ms = 500")
            .expect("Failed to load config");
        let cli = Cli::parse_from([
            "skypoll",
            "--socket",
            "/tmp/other.sock",
            "--poll-interval-ms",
            "3000",
        ]);

        cfg.apply_cli(&cli);

        assert_eq!(cfg.socket_path, PathBuf::from("/tmp/other.sock"));
        assert_eq!(cfg.session.page_size, 25);
        assert_eq!(
            cfg.session_config().poll_interval,
            Duration::from_millis(3000)
        );
    }

    #[test]
    fn test_zero_page_size_is_raised() {
        let cfg = Config::load_str("[session]\npage-size = 0").expect("Failed to load config");
        assert_eq!(cfg.session_config().page_size, 1);
    }
}
