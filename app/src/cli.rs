use std::path::PathBuf;

use clap::Parser;
use sqlgrid_core::config::ConfigOverrides;

#[derive(Debug, Parser)]
#[command(name = "sqlgrid")]
#[command(about = "Run SQL against a MySQL database and filter the results in a terminal grid")]
#[command(version)]
pub struct Cli {
    /// Config file to read instead of the default location
    #[arg(long, env = "SQLGRID_CONFIG")]
    pub config: Option<PathBuf>,

    #[arg(long, env = "SQLGRID_DB_HOST")]
    pub host: Option<String>,

    #[arg(long, env = "SQLGRID_DB_PORT")]
    pub port: Option<u16>,

    #[arg(long, env = "SQLGRID_DB_NAME")]
    pub database: Option<String>,

    #[arg(long, env = "SQLGRID_DB_USER")]
    pub user: Option<String>,

    /// Only read from the environment so it never shows up in `ps`
    #[arg(skip)]
    pub password: Option<String>,

    /// Log filter such as `info` or `sqlgrid_core=debug`; `RUST_LOG` wins
    #[arg(long)]
    pub log_level: Option<String>,

    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

impl Cli {
    #[must_use]
    pub fn parse_with_env() -> Self {
        let mut cli = Self::parse();
        cli.password = std::env::var("SQLGRID_DB_PASSWORD").ok();
        cli
    }

    #[must_use]
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            host: self.host.clone(),
            port: self.port,
            database: self.database.clone(),
            user: self.user.clone(),
            password: self.password.clone(),
            log_level: self.log_level.clone(),
            log_file: self.log_file.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use clap::Parser;

    use super::Cli;

    #[test]
    fn connection_flags_become_overrides() {
        let cli = Cli::try_parse_from([
            "sqlgrid",
            "--host",
            "db.internal",
            "--port",
            "3307",
            "--database",
            "shop",
            "--user",
            "reporter",
            "--log-level",
            "debug",
            "--log-file",
            "/tmp/sqlgrid.log",
        ])
        .expect("flags should parse");

        let overrides = cli.overrides();
        assert_eq!(overrides.host.as_deref(), Some("db.internal"));
        assert_eq!(overrides.port, Some(3307));
        assert_eq!(overrides.database.as_deref(), Some("shop"));
        assert_eq!(overrides.user.as_deref(), Some("reporter"));
        assert_eq!(overrides.log_level.as_deref(), Some("debug"));
        assert_eq!(overrides.log_file, Some(PathBuf::from("/tmp/sqlgrid.log")));
        assert!(overrides.password.is_none());
    }

    #[test]
    fn invalid_port_is_rejected() {
        let result = Cli::try_parse_from(["sqlgrid", "--port", "not-a-port"]);
        assert!(result.is_err());
    }

    #[test]
    fn password_has_no_flag() {
        let result = Cli::try_parse_from(["sqlgrid", "--password", "secret"]);
        assert!(result.is_err());
    }
}
