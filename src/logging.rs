use color_eyre::{eyre::eyre, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;

/// Install the global tracing subscriber.
///
/// `RUST_LOG` takes precedence over the configured level. When a log file is
/// configured, output goes there through a background writer; the returned
/// guard must be kept alive until exit so buffered lines are flushed.
pub fn init(config: &LoggingConfig) -> Result<Option<WorkerGuard>> {
  let filter = EnvFilter::try_from_default_env()
    .or_else(|_| EnvFilter::try_new(&config.level))
    .map_err(|e| eyre!("Invalid log filter '{}': {}", config.level, e))?;

  match &config.file {
    Some(path) => {
      let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| std::path::Path::new("."));
      let file_name = path
        .file_name()
        .ok_or_else(|| eyre!("Log file path has no file name: {}", path.display()))?;

      std::fs::create_dir_all(dir)
        .map_err(|e| eyre!("Failed to create log directory {}: {}", dir.display(), e))?;

      let appender = tracing_appender::rolling::never(dir, file_name);
      let (writer, guard) = tracing_appender::non_blocking(appender);

      tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .try_init()
        .map_err(|e| eyre!("Failed to install tracing subscriber: {}", e))?;

      Ok(Some(guard))
    }
    None => {
      tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| eyre!("Failed to install tracing subscriber: {}", e))?;

      Ok(None)
    }
  }
}
