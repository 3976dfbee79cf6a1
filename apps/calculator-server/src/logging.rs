use anyhow::{Context, Result};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{EnvFilter, Registry, fmt};

use crate::config::{LogFormat, LoggingConfig};

/// Noisy dependencies are held at `warn` unless `RUST_LOG` says otherwise.
const QUIET_DEPENDENCIES: &str = ",sqlx=warn,sea_orm_migration=warn,hyper=warn";

/// Install the global subscriber and route `log` records into it.
///
/// # Errors
/// Returns an error if the level directive is invalid or a global logger was
/// already installed.
pub fn init(config: &LoggingConfig) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(format!("{}{QUIET_DEPENDENCIES}", config.level))
            .with_context(|| format!("invalid log level directive: {}", config.level))?,
    };

    let registry = Registry::default().with(filter);
    match config.format {
        LogFormat::Text => tracing::subscriber::set_global_default(
            registry.with(fmt::layer().with_target(true)),
        ),
        LogFormat::Json => tracing::subscriber::set_global_default(
            registry.with(fmt::layer().json().with_current_span(true)),
        ),
    }
    .context("global tracing subscriber already set")?;

    tracing_log::LogTracer::init().context("log bridge already installed")?;
    Ok(())
}
