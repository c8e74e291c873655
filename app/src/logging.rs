//! File logging. The terminal belongs to the UI, so nothing is written to
//! stdout or stderr while it runs.

use std::path::{Path, PathBuf};

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_FILE_NAME: &str = "sqlgrid.log";

#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Filter directive used when `RUST_LOG` is unset or invalid.
    pub level: String,
    pub file: PathBuf,
}

impl LogConfig {
    pub fn new(level: impl Into<String>, file: impl Into<PathBuf>) -> Self {
        Self {
            level: level.into(),
            file: file.into(),
        }
    }

    fn env_filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(&self.level))
            .unwrap_or_else(|_| EnvFilter::new("info"))
    }

    fn directory(&self) -> &Path {
        self.file
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."))
    }

    fn file_name(&self) -> &str {
        self.file
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or(DEFAULT_FILE_NAME)
    }

    /// Installs the global subscriber. Keep the guard alive until exit so
    /// buffered lines are flushed.
    pub fn init(self) -> Result<WorkerGuard, Box<dyn std::error::Error>> {
        std::fs::create_dir_all(self.directory())?;
        let file_appender = tracing_appender::rolling::never(self.directory(), self.file_name());
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        tracing_subscriber::registry()
            .with(self.env_filter())
            .with(
                fmt::layer()
                    .with_writer(non_blocking)
                    .with_ansi(false)
                    .compact(),
            )
            .try_init()?;

        Ok(guard)
    }
}
