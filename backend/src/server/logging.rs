use tracing_appender::rolling;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::server::config::ServerConfig;

/// Installs the global subscriber.
///
/// `RUST_LOG` wins when set; otherwise the filter comes from the environment
/// profile. Production logs JSON to stdout, other profiles log human-readable
/// lines. With `LOG_DIR` set, a daily-rotated JSON file is written as well.
pub fn init_logging(config: &ServerConfig) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.environment.default_log_filter()));

    let file_layer = config.log_dir.as_ref().map(|dir| {
        fmt::layer()
            .with_writer(rolling::daily(dir, "inventory-server.log"))
            .with_ansi(false) // No ANSI colors in file
            .json()
    });

    let (json_stdout_layer, stdout_layer) = if config.environment.is_production() {
        (Some(fmt::layer().json().with_writer(std::io::stdout)), None)
    } else {
        (None, Some(fmt::layer().with_writer(std::io::stdout)))
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(json_stdout_layer)
        .with(stdout_layer)
        .init();
}

/// Minimal stderr logger for failures that happen before the configuration is known.
pub fn init_fallback_logging() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::new("info"))
        .init();
}
