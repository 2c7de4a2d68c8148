//! Process configuration for the dashboard core.
//!
//! # Responsibility
//! - Resolve where user data and logs live.
//! - Validate settings once at startup instead of at every call site.
//!
//! # Invariants
//! - `users_root` and `log_dir` are absolute after normalization.
//! - `log_level` is one of `trace|debug|info|warn|error`.

use crate::logging::{default_log_level, normalize_level};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

/// Environment variable overriding the users data root.
pub const USERS_ROOT_ENV: &str = "CONIFER_USERS_ROOT";
/// Environment variable overriding the log level.
pub const LOG_LEVEL_ENV: &str = "CONIFER_LOG_LEVEL";
/// Environment variable overriding the log directory.
pub const LOG_DIR_ENV: &str = "CONIFER_LOG_DIR";

const DEFAULT_USERS_ROOT: &str = "./app-data/users";
const DEFAULT_LOG_DIR_NAME: &str = "logs";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    EmptyUsersRoot,
    EmptyLogDir,
    UnsupportedLogLevel(String),
    CurrentDir(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyUsersRoot => write!(f, "users root must not be empty"),
            Self::EmptyLogDir => write!(f, "log dir must not be empty"),
            Self::UnsupportedLogLevel(message) => write!(f, "{message}"),
            Self::CurrentDir(message) => {
                write!(f, "cannot resolve current directory: {message}")
            }
        }
    }
}

impl Error for ConfigError {}

/// Validated core settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreConfig {
    users_root: PathBuf,
    log_level: &'static str,
    log_dir: PathBuf,
}

impl CoreConfig {
    /// Builds a config rooted at `users_root` with build-mode defaults.
    ///
    /// Logs go to a `logs` directory next to `users_root`.
    pub fn new(users_root: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let users_root = absolutize(users_root.as_ref(), ConfigError::EmptyUsersRoot)?;
        let log_dir = default_log_dir(&users_root);
        Ok(Self {
            users_root,
            log_level: default_log_level(),
            log_dir,
        })
    }

    /// Reads `CONIFER_USERS_ROOT`, `CONIFER_LOG_LEVEL` and `CONIFER_LOG_DIR`.
    ///
    /// Unset or blank variables fall back to defaults; the users root
    /// defaults to `./app-data/users` resolved against the current directory.
    pub fn from_env() -> Result<Self, ConfigError> {
        let users_root = env_value(USERS_ROOT_ENV).unwrap_or_else(|| DEFAULT_USERS_ROOT.into());
        let mut config = Self::new(users_root)?;
        if let Some(level) = env_value(LOG_LEVEL_ENV) {
            config = config.with_log_level(&level)?;
        }
        if let Some(dir) = env_value(LOG_DIR_ENV) {
            config = config.with_log_dir(dir)?;
        }
        Ok(config)
    }

    pub fn with_log_level(mut self, level: &str) -> Result<Self, ConfigError> {
        self.log_level = normalize_level(level).map_err(ConfigError::UnsupportedLogLevel)?;
        Ok(self)
    }

    pub fn with_log_dir(mut self, log_dir: impl AsRef<Path>) -> Result<Self, ConfigError> {
        self.log_dir = absolutize(log_dir.as_ref(), ConfigError::EmptyLogDir)?;
        Ok(self)
    }

    pub fn users_root(&self) -> &Path {
        &self.users_root
    }

    pub fn log_level(&self) -> &'static str {
        self.log_level
    }

    pub fn log_dir(&self) -> &Path {
        &self.log_dir
    }
}

fn env_value(name: &str) -> Option<String> {
    let raw = std::env::var(name).ok()?;
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn absolutize(path: &Path, empty_error: ConfigError) -> Result<PathBuf, ConfigError> {
    if path.as_os_str().is_empty() {
        return Err(empty_error);
    }
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    let cwd = std::env::current_dir().map_err(|err| ConfigError::CurrentDir(err.to_string()))?;
    Ok(cwd.join(path))
}

fn default_log_dir(users_root: &Path) -> PathBuf {
    match users_root.parent() {
        Some(parent) => parent.join(DEFAULT_LOG_DIR_NAME),
        None => users_root.join(DEFAULT_LOG_DIR_NAME),
    }
}

#[cfg(test)]
mod tests {
    use super::{ConfigError, CoreConfig};
    use std::path::Path;

    #[test]
    fn new_places_logs_next_to_users_root() {
        let config = CoreConfig::new("/srv/conifer/users").unwrap();
        assert_eq!(config.users_root(), Path::new("/srv/conifer/users"));
        assert_eq!(config.log_dir(), Path::new("/srv/conifer/logs"));
    }

    #[test]
    fn relative_users_root_is_made_absolute() {
        let config = CoreConfig::new("app-data/users").unwrap();
        assert!(config.users_root().is_absolute());
        assert!(config.users_root().ends_with("app-data/users"));
    }

    #[test]
    fn empty_paths_are_rejected() {
        assert_eq!(CoreConfig::new("").unwrap_err(), ConfigError::EmptyUsersRoot);
        let config = CoreConfig::new("/srv/conifer/users").unwrap();
        assert_eq!(config.with_log_dir("").unwrap_err(), ConfigError::EmptyLogDir);
    }

    #[test]
    fn log_level_is_normalized_or_rejected() {
        let config = CoreConfig::new("/srv/conifer/users")
            .unwrap()
            .with_log_level(" WARNING ")
            .unwrap();
        assert_eq!(config.log_level(), "warn");

        let err = config.with_log_level("loud").unwrap_err();
        assert!(matches!(err, ConfigError::UnsupportedLogLevel(message) if message.contains("loud")));
    }
}
