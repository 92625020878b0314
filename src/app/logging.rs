//! Usage: Tracing subscriber setup (stdout + optional daily rolling file) and panic hook.

use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{fmt, EnvFilter, Registry};

const LOG_FILE_PREFIX: &str = "anilist-token-relay.log";

/// Resolve the filter: `RUST_LOG` wins, then the configured directive, then `info`.
pub(crate) fn build_env_filter(configured: &str) -> EnvFilter {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return filter;
    }
    EnvFilter::try_new(configured.trim()).unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Install the global subscriber. Keep the returned guard alive so file logs are flushed.
pub fn init(filter: &str, log_dir: Option<&Path>) -> Option<WorkerGuard> {
    if let Err(err) = tracing_log::LogTracer::init() {
        eprintln!("log bridge already installed: {err}");
    }

    let stdout_layer = fmt::layer().with_target(true);

    let (file_layer, guard) = match log_dir {
        Some(dir) => match std::fs::create_dir_all(dir) {
            Ok(()) => {
                let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
                let (writer, guard) = tracing_appender::non_blocking(appender);
                let layer = fmt::layer().with_ansi(false).with_writer(writer);
                (Some(layer), Some(guard))
            }
            Err(err) => {
                eprintln!("failed to create log dir {}: {err}", dir.display());
                (None, None)
            }
        },
        None => (None, None),
    };

    let subscriber = Registry::default()
        .with(build_env_filter(filter))
        .with(stdout_layer)
        .with(file_layer);

    if let Err(err) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("tracing subscriber already installed: {err}");
    }

    install_panic_hook();
    guard
}

fn install_panic_hook() {
    // Payload is not logged; it may carry request data.
    std::panic::set_hook(Box::new(|panic_info| {
        let location = panic_info
            .location()
            .map(|l| format!("{}:{}:{}", l.file(), l.line(), l.column()))
            .unwrap_or_else(|| "unknown".to_string());
        tracing::error!(location = %location, "PANIC: relay panicked at {location}");
    }));
}
