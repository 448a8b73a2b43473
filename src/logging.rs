//! Production-ready structured logging configuration
//!
//! Provides structured logging with:
//! - JSON output for machine consumption
//! - Pretty formatting for interactive use
//! - Configurable via environment variables
//! - Per-report request ids carried on spans

use crate::config::Config;
use tracing::Span;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};
use uuid::Uuid;

/// Initialize the logging system based on configuration.
///
/// When logs go to a file the returned guard must be held until exit so the
/// background writer can flush.
pub fn init_logging(config: &Config) -> Option<WorkerGuard> {
    let log_level = &config.logging.level;
    let log_format = &config.logging.format;

    // Build environment filter
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level.to_lowercase()));

    match config.logging.output.as_str() {
        "file" => Some(init_file_logging(env_filter, log_format, &config.paths.log_directory)),
        "both" => Some(init_combined_logging(
            env_filter,
            log_format,
            &config.paths.log_directory,
        )),
        _ => {
            init_console_logging(env_filter, log_format);
            None
        }
    }
}

fn init_console_logging(filter: EnvFilter, format: &str) {
    let subscriber = tracing_subscriber::registry().with(filter);

    // Console logs go to stderr so report output on stdout stays clean
    match format {
        "json" => {
            subscriber
                .with(
                    fmt::layer()
                        .json()
                        .with_writer(std::io::stderr)
                        .with_current_span(true)
                        .with_span_list(true)
                        .with_target(true),
                )
                .init();
        }
        _ => {
            subscriber
                .with(
                    fmt::layer()
                        .with_writer(std::io::stderr)
                        .with_target(true)
                        .with_ansi(true)
                        .with_span_events(FmtSpan::CLOSE),
                )
                .init();
        }
    }
}

fn init_file_logging(filter: EnvFilter, format: &str, log_dir: &std::path::Path) -> WorkerGuard {
    let file_appender = tracing_appender::rolling::daily(log_dir, "ga4-report.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let subscriber = tracing_subscriber::registry().with(filter);

    match format {
        "json" => {
            subscriber
                .with(
                    fmt::layer()
                        .json()
                        .with_writer(non_blocking)
                        .with_current_span(true)
                        .with_span_list(true),
                )
                .init();
        }
        _ => {
            subscriber
                .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
                .init();
        }
    }

    guard
}

fn init_combined_logging(filter: EnvFilter, format: &str, log_dir: &std::path::Path) -> WorkerGuard {
    let file_appender = tracing_appender::rolling::daily(log_dir, "ga4-report.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let subscriber = tracing_subscriber::registry().with(filter);

    match format {
        "json" => {
            subscriber
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .with(fmt::layer().json().with_writer(non_blocking))
                .init();
        }
        _ => {
            subscriber
                .with(fmt::layer().with_writer(std::io::stderr))
                .with(fmt::layer().with_ansi(false).with_writer(non_blocking))
                .init();
        }
    }

    guard
}

/// Span for a single report execution, tagged with a fresh request id
pub fn report_span(kind: &str, property_id: &str) -> Span {
    tracing::info_span!(
        "report",
        request_id = %Uuid::new_v4(),
        kind = %kind,
        property_id = %property_id
    )
}
