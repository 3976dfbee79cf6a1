//! Startup gate: block until the history store answers a probe.

use std::future::Future;

use thiserror::Error;
use tracing::{info, warn};

use super::error::DomainError;
use crate::config::ReadinessConfig;
use crate::metrics::{CalculatorMetrics, status};

#[derive(Error, Debug)]
pub enum ReadinessError {
    #[error("history store not reachable after {attempts} attempts: {last_error}")]
    Exhausted {
        attempts: u32,
        last_error: DomainError,
    },
}

/// Calls `probe` until it succeeds, sleeping `interval` between failed
/// attempts. Returns the 1-based attempt that succeeded.
///
/// There is no sleep after the last failed attempt. A `max_attempts` of zero
/// is treated as one.
///
/// # Errors
/// Returns [`ReadinessError::Exhausted`] with the last probe error once
/// every attempt has failed.
pub async fn wait_until_ready<F, Fut>(
    mut probe: F,
    config: &ReadinessConfig,
    metrics: &CalculatorMetrics,
) -> Result<u32, ReadinessError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<(), DomainError>>,
{
    let max_attempts = config.max_attempts.max(1);
    let mut attempt = 1;
    loop {
        match probe().await {
            Ok(()) => {
                metrics.record_readiness_probe(status::SUCCESS);
                info!(attempt, "History store is ready");
                return Ok(attempt);
            }
            Err(e) => {
                metrics.record_readiness_probe(status::ERROR);
                if attempt >= max_attempts {
                    return Err(ReadinessError::Exhausted {
                        attempts: attempt,
                        last_error: e,
                    });
                }
                warn!(
                    attempt,
                    max_attempts,
                    retry_in = ?config.interval,
                    error = %e,
                    "History store not ready, retrying"
                );
                tokio::time::sleep(config.interval).await;
                attempt += 1;
            }
        }
    }
}
