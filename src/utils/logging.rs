// src/utils/logging.rs
use tracing_subscriber::{fmt, EnvFilter};

/// Default filter when `RUST_LOG` is unset: our own spans at INFO,
/// dependencies (reqwest, hyper, tokio-postgres) only when they warn.
const DEFAULT_FILTER: &str = "earnings_etl=info,warn";

/// Sets up the logging framework using tracing_subscriber.
/// Reads log level filters from the `RUST_LOG` environment variable.
///
/// Logs go to stderr; stdout is reserved for command results
/// (the located release as JSON, the written CSV path, the loaded row count).
pub fn setup_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    tracing::debug!("Logging setup complete.");
}
