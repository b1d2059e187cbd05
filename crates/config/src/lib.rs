pub mod constants;

pub use etcetera::AppStrategy;
use etcetera::{AppStrategyArgs, choose_app_strategy};

use std::env;
use std::path::{Path, PathBuf};

pub fn create_strategy() -> std::result::Result<impl AppStrategy, etcetera::HomeDirError> {
    choose_app_strategy(AppStrategyArgs {
        top_level_domain: constants::TOP_LEVEL_DOMAIN.to_string(),
        author: constants::AUTHOR.to_string(),
        app_name: constants::APP_NAME.to_string(),
    })
}

/// Pick a directory: the environment variable wins, then the platform strategy, then a
/// per-app folder under the temp dir.
pub fn resolve_dir<S, F>(env_key: &str, strategy: &S, strategy_fn: F) -> PathBuf
where
    S: AppStrategy,
    F: FnOnce(&S) -> Option<PathBuf>,
{
    dir_or_fallback(env::var_os(env_key).map(PathBuf::from), || strategy_fn(strategy))
}

fn dir_or_fallback(from_env: Option<PathBuf>, from_strategy: impl FnOnce() -> Option<PathBuf>) -> PathBuf {
    from_env
        .filter(|p| !p.as_os_str().is_empty())
        .or_else(from_strategy)
        .unwrap_or_else(|| env::temp_dir().join(constants::APP_NAME))
}

/// Location of the search service socket inside a runtime directory.
pub fn socket_path(runtime_dir: impl AsRef<Path>) -> PathBuf {
    runtime_dir.as_ref().join(constants::UNIX_SOCKET_FILE_NAME)
}

/// Location of a named config file inside the platform config directory.
pub fn config_file<S: AppStrategy>(strategy: &S, file_name: &str) -> PathBuf {
    resolve_dir("CONFIG_DIRECTORY", strategy, |s| Some(s.config_dir())).join(file_name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_socket_path_joins_file_name() {
        let path = socket_path("/run/user/1000/skypoll");
        assert_eq!(path, PathBuf::from("/run/user/1000/skypoll/skypoll.sock"));
    }

    #[rstest]
    #[case(Some("/from/env"), Some("/from/strategy"), "/from/env")]
    #[case(None, Some("/from/strategy"), "/from/strategy")]
    #[case(Some(""), Some("/from/strategy"), "/from/strategy")]
    fn test_dir_precedence(
        #[case] from_env: Option<&str>,
        #[case] from_strategy: Option<&str>,
        #[case] expected: &str,
    ) {
        let dir = dir_or_fallback(from_env.map(PathBuf::from), || from_strategy.map(PathBuf::from));
        assert_eq!(dir, PathBuf::from(expected));
    }

    #[test]
    fn test_dir_falls_back_to_temp() {
        let dir = dir_or_fallback(None, || None);
        assert_eq!(dir, env::temp_dir().join(constants::APP_NAME));
    }
}
