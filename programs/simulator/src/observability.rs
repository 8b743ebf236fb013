//! Observability for the simulator: pretty tracing logs to stdout.

use anyhow::{Context, Result};
use tracing::Level;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

/// Installs the global subscriber, filtering at `level`.
///
/// # Errors
/// Returns an error if a global subscriber is already set.
pub fn init_subscriber(level: Level) -> Result<()> {
    Registry::default()
        .with(EnvFilter::new(level.as_str().to_lowercase()))
        .with(
            fmt::layer()
                .pretty()
                .with_target(true)
                .with_line_number(true)
                .with_file(true),
        )
        .try_init()
        .context("Failed to set global default subscriber")
}
