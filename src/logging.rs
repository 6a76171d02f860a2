//! Tracing setup: stdout plus an optional daily rolling log file.

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{Builder, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

use crate::config::LoggingConfig;

const LOG_FILE_PREFIX: &str = "exporter";
const LOG_FILE_SUFFIX: &str = "log";

/// Install the global subscriber.
///
/// `RUST_LOG` wins over `logging.level` when set. The returned guard flushes
/// the file writer on drop and must be held for the life of the process.
pub fn init(config: &LoggingConfig) -> anyhow::Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))?;

    let (file_writer, guard) = match &config.directory {
        Some(dir) => {
            let appender = Builder::new()
                .rotation(Rotation::DAILY)
                .filename_prefix(LOG_FILE_PREFIX)
                .filename_suffix(LOG_FILE_SUFFIX)
                .build(dir)?;
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (Some(writer), Some(guard))
        }
        None => (None, None),
    };

    // Layer types differ between json and text, hence the two branches.
    let registry = Registry::default().with(filter);
    if config.json {
        let file = file_writer.map(|w| fmt::layer().json().with_writer(w).with_ansi(false));
        registry
            .with(fmt::layer().json().with_target(true))
            .with(file)
            .try_init()?;
    } else {
        let file = file_writer.map(|w| fmt::layer().with_writer(w).with_ansi(false));
        registry
            .with(fmt::layer().with_target(true))
            .with(file)
            .try_init()?;
    }

    Ok(guard)
}
