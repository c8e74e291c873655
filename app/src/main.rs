mod cli;
mod logging;

use std::error::Error;
use std::path::Path;

use sqlgrid_adapters::mysql::MysqlBackend;
use sqlgrid_core::config::{AppConfig, ConfigError, ConfigOverrides};
use sqlgrid_core::session::Session;
use sqlgrid_tui::ErrorDialog;

use crate::cli::Cli;
use crate::logging::LogConfig;

fn load_config(path: Option<&Path>, overrides: ConfigOverrides) -> Result<AppConfig, ConfigError> {
    let mut config = match path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load_default()?,
    };
    config.apply_overrides(overrides);
    Ok(config)
}

fn run_app(
    run_tui: impl FnOnce() -> Result<(), sqlgrid_tui::TuiError>,
) -> Result<(), Box<dyn Error>> {
    run_tui()?;
    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse_with_env();
    let config = load_config(cli.config.as_deref(), cli.overrides())?;

    let _log_guard = match LogConfig::new(config.logging.level.clone(), config.log_file_path()?)
        .init()
    {
        Ok(guard) => Some(guard),
        Err(error) => {
            eprintln!("sqlgrid: logging disabled: {error}");
            None
        }
    };

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    let mut session = Session::new(MysqlBackend);
    let startup_dialog = runtime
        .block_on(session.connect(config.connection.clone()))
        .err()
        .map(|error| ErrorDialog::connection_failed(&error));

    let result = run_app(|| sqlgrid_tui::run(&runtime, &mut session, startup_dialog));

    if let Err(error) = runtime.block_on(session.disconnect()) {
        tracing::warn!(%error, "disconnect on exit failed");
    }
    result
}

#[cfg(test)]
mod tests {
    use std::io;

    use sqlgrid_core::config::ConfigOverrides;
    use tempfile::TempDir;

    use super::{load_config, run_app};

    #[test]
    fn run_app_returns_ok_when_tui_runner_succeeds() {
        let result = run_app(|| Ok(()));
        assert!(result.is_ok());
    }

    #[test]
    fn run_app_propagates_tui_errors() {
        let result = run_app(|| Err(sqlgrid_tui::TuiError::Io(io::Error::other("boom"))));
        assert!(result.is_err());
    }

    #[test]
    fn flags_override_values_from_config_file() {
        let temp_dir = TempDir::new().expect("failed to create temp directory");
        let path = temp_dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[connection]\nhost = \"file-host\"\nuser = \"file-user\"\n",
        )
        .expect("failed to write config");

        let config = load_config(
            Some(path.as_path()),
            ConfigOverrides {
                host: Some("flag-host".to_string()),
                ..ConfigOverrides::default()
            },
        )
        .expect("config should load");

        assert_eq!(config.connection.host, "flag-host");
        assert_eq!(config.connection.user, "file-user");
        assert_eq!(config.connection.port, 3306);
    }
}
