//! Calculator Module
//!
//! The calculation-processing pipeline: compute, persist, publish, consume.
//!
//! ## Architecture
//!
//! - `domain/` - arithmetic engine, history store contract, readiness gate,
//!   calculation service and request-boundary parsing
//! - `infra/storage/` - sea-orm history store, migrations, metrics decorator
//! - `infra/broker/` - message broker contract, the in-memory broker and
//!   the Kafka broker (`kafka` feature)
//! - `events/` - event publisher, background consumer and event handlers
//! - `api/rest/` - JSON handlers and routes
//! - `metrics.rs` - Prometheus registry shared by every component
//!
//! External consumers should use the `calculator-sdk` crate which provides
//! the `CalculatorApi` trait and models.

pub mod config;
pub mod metrics;

#[doc(hidden)]
pub mod api;
#[doc(hidden)]
pub mod domain;
#[doc(hidden)]
pub mod events;
#[doc(hidden)]
pub mod infra;

pub use config::CalculatorConfig;
pub use domain::service::CalculatorService;
pub use metrics::CalculatorMetrics;
