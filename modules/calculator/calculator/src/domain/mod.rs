pub mod arithmetic;
pub mod error;
pub mod input;
pub mod readiness;
pub mod repo;
pub mod service;

#[cfg(test)]
mod service_test;
