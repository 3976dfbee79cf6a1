//! Prometheus metrics for the calculation pipeline.
//!
//! One [`CalculatorMetrics`] is built at startup and handed to every
//! component as `Arc<CalculatorMetrics>`. Nothing registers into the
//! process-global default registry.
//!
//! Collected metrics (prefix is `metrics.namespace`, default: `calculator`):
//! - `<ns>_requests_total`: calculation requests by operation and status (counter)
//! - `<ns>_active_calculations`: calculations currently in flight (gauge)
//! - `<ns>_request_duration_seconds`: calculation latency by operation (histogram)
//! - `<ns>_database_operations_total`: store calls by operation and status (counter)
//! - `<ns>_database_operation_duration_seconds`: store latency by operation type (histogram)
//! - `<ns>_events_published_total`: publish attempts by status (counter)
//! - `<ns>_events_consumed_total`: consumed messages by status (counter)
//! - `<ns>_readiness_probes_total`: startup store probes by status (counter)

use prometheus::{
    Encoder, HistogramOpts, HistogramTimer, HistogramVec, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder, exponential_buckets, linear_buckets,
};

/// Request status labels for `requests_total`.
pub mod status {
    pub const SUCCESS: &str = "success";
    pub const INPUT_ERROR: &str = "input_error";
    pub const CALCULATION_ERROR: &str = "calculation_error";
    pub const EXCEPTION: &str = "exception";
    pub const NOT_FOUND: &str = "not_found";
    pub const ERROR: &str = "error";
}

/// Label used when the requested operation could not be recognized.
pub const UNKNOWN_OPERATION: &str = "unknown";

pub struct CalculatorMetrics {
    registry: Registry,
    requests_total: IntCounterVec,
    active_calculations: IntGauge,
    request_duration: HistogramVec,
    db_operations_total: IntCounterVec,
    db_operation_duration: HistogramVec,
    events_published_total: IntCounterVec,
    events_consumed_total: IntCounterVec,
    readiness_probes_total: IntCounterVec,
}

impl CalculatorMetrics {
    /// Build every metric and register it into a fresh registry.
    ///
    /// # Errors
    /// Returns an error if a metric definition is invalid (bad name, bad
    /// buckets) or a name is registered twice.
    pub fn new(namespace: &str) -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let requests_total = IntCounterVec::new(
            Opts::new("requests_total", "Total calculator requests").namespace(namespace),
            &["operation", "status"],
        )?;
        let active_calculations = IntGauge::with_opts(
            Opts::new("active_calculations", "Number of active calculations").namespace(namespace),
        )?;
        let request_duration = HistogramVec::new(
            HistogramOpts::new(
                "request_duration_seconds",
                "Calculator request duration in seconds",
            )
            .namespace(namespace)
            .buckets(exponential_buckets(0.01, 2.0, 10)?),
            &["operation"],
        )?;
        let db_operations_total = IntCounterVec::new(
            Opts::new("database_operations_total", "Total database operations")
                .namespace(namespace),
            &["operation", "status"],
        )?;
        let db_operation_duration = HistogramVec::new(
            HistogramOpts::new(
                "database_operation_duration_seconds",
                "Database operation duration in seconds",
            )
            .namespace(namespace)
            .buckets(linear_buckets(0.01, 0.05, 10)?),
            &["operation_type"],
        )?;
        let events_published_total = IntCounterVec::new(
            Opts::new("events_published_total", "Calculation events handed to the broker")
                .namespace(namespace),
            &["status"],
        )?;
        let events_consumed_total = IntCounterVec::new(
            Opts::new("events_consumed_total", "Calculation events drained from the broker")
                .namespace(namespace),
            &["status"],
        )?;
        let readiness_probes_total = IntCounterVec::new(
            Opts::new("readiness_probes_total", "Startup connectivity probes against the store")
                .namespace(namespace),
            &["status"],
        )?;

        registry.register(Box::new(requests_total.clone()))?;
        registry.register(Box::new(active_calculations.clone()))?;
        registry.register(Box::new(request_duration.clone()))?;
        registry.register(Box::new(db_operations_total.clone()))?;
        registry.register(Box::new(db_operation_duration.clone()))?;
        registry.register(Box::new(events_published_total.clone()))?;
        registry.register(Box::new(events_consumed_total.clone()))?;
        registry.register(Box::new(readiness_probes_total.clone()))?;

        Ok(Self {
            registry,
            requests_total,
            active_calculations,
            request_duration,
            db_operations_total,
            db_operation_duration,
            events_published_total,
            events_consumed_total,
            readiness_probes_total,
        })
    }

    pub fn record_request(&self, operation: &str, status: &str) {
        self.requests_total
            .with_label_values(&[operation, status])
            .inc();
    }

    /// Starts the duration timer and bumps the in-flight gauge until the
    /// returned guard is dropped.
    #[must_use]
    pub fn start_calculation(&self, operation: &str) -> InFlightCalculation {
        self.active_calculations.inc();
        InFlightCalculation {
            gauge: self.active_calculations.clone(),
            timer: Some(
                self.request_duration
                    .with_label_values(&[operation])
                    .start_timer(),
            ),
        }
    }

    #[must_use]
    pub fn start_db_operation(&self, operation: &str) -> HistogramTimer {
        self.db_operation_duration
            .with_label_values(&[operation])
            .start_timer()
    }

    pub fn record_db_operation(&self, operation: &str, status: &str) {
        self.db_operations_total
            .with_label_values(&[operation, status])
            .inc();
    }

    pub fn record_publish(&self, status: &str) {
        self.events_published_total
            .with_label_values(&[status])
            .inc();
    }

    pub fn record_consumed(&self, status: &str) {
        self.events_consumed_total.with_label_values(&[status]).inc();
    }

    pub fn record_readiness_probe(&self, status: &str) {
        self.readiness_probes_total
            .with_label_values(&[status])
            .inc();
    }

    #[must_use]
    pub fn active_calculations(&self) -> i64 {
        self.active_calculations.get()
    }

    #[must_use]
    pub fn requests(&self, operation: &str, status: &str) -> u64 {
        self.requests_total
            .with_label_values(&[operation, status])
            .get()
    }

    #[must_use]
    pub fn db_operations(&self, operation: &str, status: &str) -> u64 {
        self.db_operations_total
            .with_label_values(&[operation, status])
            .get()
    }

    #[must_use]
    pub fn published(&self, status: &str) -> u64 {
        self.events_published_total
            .with_label_values(&[status])
            .get()
    }

    #[must_use]
    pub fn consumed(&self, status: &str) -> u64 {
        self.events_consumed_total.with_label_values(&[status]).get()
    }

    #[must_use]
    pub fn readiness_probes(&self, status: &str) -> u64 {
        self.readiness_probes_total
            .with_label_values(&[status])
            .get()
    }

    /// Prometheus text exposition of everything in the registry.
    ///
    /// # Errors
    /// Returns an error if encoding fails.
    pub fn render(&self) -> Result<String, prometheus::Error> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

/// Guard returned by [`CalculatorMetrics::start_calculation`].
pub struct InFlightCalculation {
    gauge: IntGauge,
    timer: Option<HistogramTimer>,
}

impl Drop for InFlightCalculation {
    fn drop(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.observe_duration();
        }
        self.gauge.dec();
    }
}
