use std::env;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_PORT: u16 = 3306;
pub const DEFAULT_DATABASE: &str = "dbms_grp_activity";
pub const DEFAULT_USER: &str = "root";
pub const DEFAULT_LOG_LEVEL: &str = "info";

const APP_DIR: &str = "sqlgrid";

/// Where and as whom the single long-lived connection is opened.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ConnectionProfile {
    pub host: String,
    pub port: u16,
    pub database: Option<String>,
    pub user: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

impl ConnectionProfile {
    #[must_use]
    pub fn new(host: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: DEFAULT_PORT,
            database: None,
            user: user.into(),
            password: None,
        }
    }

    /// `mysql://user@host:port/database`, without the password.
    #[must_use]
    pub fn display_url(&self) -> String {
        let database = self.database.as_deref().unwrap_or_default();
        format!(
            "mysql://{}@{}:{}/{database}",
            self.user, self.host, self.port
        )
    }
}

impl Default for ConnectionProfile {
    fn default() -> Self {
        let mut profile = Self::new(DEFAULT_HOST, DEFAULT_USER);
        profile.database = Some(DEFAULT_DATABASE.to_string());
        profile
    }
}

impl fmt::Debug for ConnectionProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionProfile")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LoggingSettings {
    pub level: String,
    pub file: Option<PathBuf>,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: DEFAULT_LOG_LEVEL.to_string(),
            file: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AppConfig {
    pub connection: ConnectionProfile,
    pub logging: LoggingSettings,
}

/// Values that take precedence over the config file, typically command line
/// flags and their environment variables.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigOverrides {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub database: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub log_level: Option<String>,
    pub log_file: Option<PathBuf>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config directory is unavailable for this platform")]
    ConfigDirUnavailable,
    #[error("failed to read config file at {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

impl AppConfig {
    pub fn load_default() -> Result<Self, ConfigError> {
        Self::load_from_path(default_config_path()?)
    }

    /// A missing or blank file yields the defaults.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::debug!(path = %path.display(), "config file not found, using defaults");
            return Ok(Self::default());
        }

        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }

        toml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        let connection = &mut self.connection;
        if let Some(host) = non_empty(overrides.host) {
            connection.host = host;
        }
        if let Some(port) = overrides.port {
            connection.port = port;
        }
        if let Some(database) = non_empty(overrides.database) {
            connection.database = Some(database);
        }
        if let Some(user) = non_empty(overrides.user) {
            connection.user = user;
        }
        if let Some(password) = non_empty(overrides.password) {
            connection.password = Some(password);
        }
        if let Some(level) = non_empty(overrides.log_level) {
            self.logging.level = level;
        }
        if let Some(file) = overrides.log_file {
            self.logging.file = Some(file);
        }
    }

    /// The configured log file, or `sqlgrid.log` next to the default config.
    pub fn log_file_path(&self) -> Result<PathBuf, ConfigError> {
        if let Some(file) = &self.logging.file {
            return Ok(file.clone());
        }
        Ok(config_dir()?.join("sqlgrid.log"))
    }
}

pub fn default_config_path() -> Result<PathBuf, ConfigError> {
    Ok(config_dir()?.join("config.toml"))
}

fn config_dir() -> Result<PathBuf, ConfigError> {
    if let Some(custom) = env::var_os("SQLGRID_CONFIG_DIR") {
        return Ok(PathBuf::from(custom));
    }

    let base_dir = if cfg!(target_os = "windows") {
        env::var_os("APPDATA")
            .map(PathBuf::from)
            .ok_or(ConfigError::ConfigDirUnavailable)?
    } else if let Some(xdg_config_home) = env::var_os("XDG_CONFIG_HOME") {
        PathBuf::from(xdg_config_home)
    } else {
        let home = env::var_os("HOME").ok_or(ConfigError::ConfigDirUnavailable)?;
        PathBuf::from(home).join(".config")
    };

    Ok(base_dir.join(APP_DIR))
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|raw| !raw.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use tempfile::TempDir;

    use super::{AppConfig, ConfigError, ConfigOverrides, ConnectionProfile};

    #[test]
    fn missing_config_file_loads_defaults() {
        let temp_dir = TempDir::new().expect("failed to create temp directory");
        let config = AppConfig::load_from_path(temp_dir.path().join("config.toml"))
            .expect("missing file should load");

        assert_eq!(config, AppConfig::default());
        assert_eq!(config.connection.host, "localhost");
        assert_eq!(config.connection.port, 3306);
        assert_eq!(
            config.connection.database.as_deref(),
            Some("dbms_grp_activity")
        );
        assert_eq!(config.connection.user, "root");
        assert!(config.connection.password.is_none());
    }

    #[test]
    fn partial_file_keeps_defaults_for_missing_keys() {
        let temp_dir = TempDir::new().expect("failed to create temp directory");
        let path = temp_dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[connection]\nhost = \"db.internal\"\nport = 3307\n\n[logging]\nlevel = \"debug\"\n",
        )
        .expect("failed to write config");

        let config = AppConfig::load_from_path(&path).expect("config should parse");
        assert_eq!(config.connection.host, "db.internal");
        assert_eq!(config.connection.port, 3307);
        assert_eq!(config.connection.user, "root");
        assert_eq!(config.logging.level, "debug");
        assert!(config.logging.file.is_none());
    }

    #[test]
    fn malformed_file_reports_parse_error_with_path() {
        let temp_dir = TempDir::new().expect("failed to create temp directory");
        let path = temp_dir.path().join("config.toml");
        std::fs::write(&path, "[connection\nhost = ").expect("failed to write config");

        let err = AppConfig::load_from_path(&path).expect_err("parse should fail");
        assert!(matches!(err, ConfigError::Parse { path: ref p, .. } if *p == path));
    }

    #[test]
    fn overrides_win_over_file_values_but_blank_values_are_ignored() {
        let mut config = AppConfig::default();
        config.apply_overrides(ConfigOverrides {
            host: Some("10.0.0.5".to_string()),
            port: Some(3310),
            database: Some("  ".to_string()),
            user: None,
            password: Some("s3cret".to_string()),
            log_level: Some("trace".to_string()),
            log_file: Some(PathBuf::from("/tmp/sqlgrid-test.log")),
        });

        assert_eq!(config.connection.host, "10.0.0.5");
        assert_eq!(config.connection.port, 3310);
        assert_eq!(
            config.connection.database.as_deref(),
            Some("dbms_grp_activity")
        );
        assert_eq!(config.connection.user, "root");
        assert_eq!(config.connection.password.as_deref(), Some("s3cret"));
        assert_eq!(config.logging.level, "trace");
        assert_eq!(
            config.log_file_path().expect("explicit path"),
            PathBuf::from("/tmp/sqlgrid-test.log")
        );
    }

    #[test]
    fn debug_output_and_url_never_expose_password() {
        let mut profile = ConnectionProfile::default();
        profile.password = Some("hunter2".to_string());

        assert!(!format!("{profile:?}").contains("hunter2"));
        assert_eq!(
            profile.display_url(),
            "mysql://root@localhost:3306/dbms_grp_activity"
        );
    }
}
