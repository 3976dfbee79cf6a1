//! Calculator SDK
//!
//! This crate provides everything needed to consume the calculator service:
//! - API trait (`CalculatorApi`)
//! - Models (`CalculationRecord`, `CalculationEvent`, `CalculationOutcome`, `Operation`)
//! - Error types (`CalculatorError`, `CalculationFailure`)
//!
//! ## Usage
//!
//! ```ignore
//! use calculator_sdk::CalculatorApi;
//!
//! let outcome = api.calculate(6.0, 3.0, "divide").await;
//! assert_eq!(outcome.result, Some(2.0));
//! ```

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]

// === API TRAIT ===
mod api;
pub use api::CalculatorApi;

// === ERRORS ===
mod errors;
pub use errors::{CalculationFailure, CalculatorError};

// === MODELS ===
mod models;
pub use models::{
    CalculationEvent, CalculationOutcome, CalculationRecord, Operation, RecordId, UnknownOperation,
};

/// Broker topic carrying `CalculationEvent` payloads.
pub const EVENTS_TOPIC: &str = "10_calculator";
