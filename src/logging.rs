use std::fs;

use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::ServerConfig;
use crate::error::LoggingError;

/// Initialize structured logging.
///
/// Sets up:
/// - Console output on stderr. Stdout carries protocol lines only.
/// - File output when `log_dir` is configured: daily-rotated
///   `tool-rpc.*.log` files, keeping the latest 5.
/// - Environment filter: `RUST_LOG` if set, else `config.log_filter`.
pub fn init(config: &ServerConfig) -> Result<(), LoggingError> {
    let file_layer = match &config.log_dir {
        Some(log_dir) => {
            let _ = fs::create_dir_all(log_dir);
            let appender = RollingFileAppender::builder()
                .rotation(Rotation::DAILY)
                .filename_prefix("tool-rpc")
                .filename_suffix("log")
                .max_log_files(5)
                .build(log_dir)?;
            Some(
                fmt::layer()
                    .with_writer(appender)
                    .with_ansi(false)
                    .with_target(true)
                    .with_file(true)
                    .with_line_number(true),
            )
        }
        None => None,
    };

    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_target(true)
        .compact();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_filter));

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(console_layer)
        .try_init()?;

    match &config.log_dir {
        Some(dir) => tracing::info!(log_dir = %dir.display(), "Logger initialized"),
        None => tracing::info!("Logger initialized (stderr only)"),
    }
    Ok(())
}
