use std::sync::Arc;

use axum::routing::get;
use axum::{Extension, Router};

use super::handlers::{self, SharedCalculator};
use crate::metrics::CalculatorMetrics;

pub const CALCULATIONS_PATH: &str = "/calculator/v1/calculations";

/// All calculator routes: the calculations resource, `/metrics` and
/// `/health/ready`.
pub fn router(service: SharedCalculator, metrics: Arc<CalculatorMetrics>) -> Router {
    Router::new()
        .route(
            CALCULATIONS_PATH,
            get(handlers::list_calculations).post(handlers::create_calculation),
        )
        .route(
            "/calculator/v1/calculations/{id}",
            get(handlers::get_calculation)
                .put(handlers::update_calculation)
                .delete(handlers::delete_calculation),
        )
        .route(
            "/calculator/v1/calculations/{id}/delete",
            get(handlers::confirm_delete),
        )
        .route("/metrics", get(handlers::metrics))
        .route("/health/ready", get(handlers::ready))
        .layer(Extension(service))
        .layer(Extension(metrics))
}
