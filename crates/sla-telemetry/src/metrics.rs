//! Prometheus metrics for the case lifecycle.
//!
//! All metrics follow the naming convention: `sla_<area>_<metric>_<unit>`
//!
//! ## Metric Types
//!
//! - **Counter**: transitions, rejections, operations, donated amount
//! - **Gauge**: cases per status, refreshed by the read side
//! - **Histogram**: operation latency

use prometheus::{
    exponential_buckets, CounterVec, Encoder, GaugeVec, HistogramOpts, HistogramTimer,
    HistogramVec, IntCounter, Opts, Registry, TextEncoder,
};

use crate::TelemetryError;

/// Metrics for one lifecycle service instance.
///
/// Each instance owns its registry, so tests and multiple services in one
/// process never collide on metric registration.
pub struct LifecycleMetrics {
    registry: Registry,

    /// Persisted status transitions, by audit action
    transitions: CounterVec,

    /// Refused operations, by error kind
    rejections: CounterVec,

    /// Operations invoked, by operation name
    operations: CounterVec,

    /// Total currency units credited to cases
    donations_amount: IntCounter,

    /// Cases per status, as last reported by a projection refresh
    cases_by_status: GaugeVec,

    /// Operation latency
    operation_duration: HistogramVec,
}

impl LifecycleMetrics {
    pub fn new() -> Result<Self, TelemetryError> {
        let registry = Registry::new_custom(Some("sla".to_string()), None)
            .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;

        let transitions = CounterVec::new(
            Opts::new("case_transitions_total", "Persisted case status transitions"),
            &["action"],
        )
        .map_err(metrics_err)?;

        let rejections = CounterVec::new(
            Opts::new(
                "lifecycle_rejections_total",
                "Lifecycle operations refused, by error kind",
            ),
            &["kind"],
        )
        .map_err(metrics_err)?;

        let operations = CounterVec::new(
            Opts::new("operations_total", "Lifecycle operations invoked"),
            &["operation"],
        )
        .map_err(metrics_err)?;

        let donations_amount = IntCounter::new(
            "donations_amount_total",
            "Currency units credited to approved cases",
        )
        .map_err(metrics_err)?;

        let cases_by_status = GaugeVec::new(
            Opts::new("cases", "Number of cases per lifecycle status"),
            &["status"],
        )
        .map_err(metrics_err)?;

        let buckets = exponential_buckets(0.0001, 2.0, 14).map_err(metrics_err)?;
        let operation_duration = HistogramVec::new(
            HistogramOpts::new(
                "operation_duration_seconds",
                "Time spent executing lifecycle operations",
            )
            .buckets(buckets),
            &["operation"],
        )
        .map_err(metrics_err)?;

        let collectors: Vec<Box<dyn prometheus::core::Collector>> = vec![
            Box::new(transitions.clone()),
            Box::new(rejections.clone()),
            Box::new(operations.clone()),
            Box::new(donations_amount.clone()),
            Box::new(cases_by_status.clone()),
            Box::new(operation_duration.clone()),
        ];
        for collector in collectors {
            registry.register(collector).map_err(metrics_err)?;
        }

        Ok(Self {
            registry,
            transitions,
            rejections,
            operations,
            donations_amount,
            cases_by_status,
            operation_duration,
        })
    }

    pub fn record_operation(&self, operation: &str) {
        self.operations.with_label_values(&[operation]).inc();
    }

    pub fn record_transition(&self, action: &str) {
        self.transitions.with_label_values(&[action]).inc();
    }

    pub fn record_rejection(&self, kind: &str) {
        self.rejections.with_label_values(&[kind]).inc();
    }

    pub fn record_donation(&self, amount: u64) {
        self.donations_amount.inc_by(amount);
    }

    pub fn set_cases_in_status(&self, status: &str, count: usize) {
        self.cases_by_status
            .with_label_values(&[status])
            .set(count as f64);
    }

    /// Starts timing `operation`. Observation happens on drop.
    #[must_use]
    pub fn start_timer(&self, operation: &str) -> OperationTimer {
        OperationTimer(
            self.operation_duration
                .with_label_values(&[operation])
                .start_timer(),
        )
    }

    #[must_use]
    pub fn transitions(&self, action: &str) -> u64 {
        self.transitions.with_label_values(&[action]).get() as u64
    }

    #[must_use]
    pub fn rejections(&self, kind: &str) -> u64 {
        self.rejections.with_label_values(&[kind]).get() as u64
    }

    #[must_use]
    pub fn operations(&self, operation: &str) -> u64 {
        self.operations.with_label_values(&[operation]).get() as u64
    }

    #[must_use]
    pub fn donated_total(&self) -> u64 {
        self.donations_amount.get()
    }

    #[must_use]
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Encode all metrics as Prometheus text format.
    pub fn gather_text(&self) -> Result<String, TelemetryError> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer).map_err(metrics_err)?;
        String::from_utf8(buffer).map_err(|e| TelemetryError::MetricsInit(e.to_string()))
    }
}

impl std::fmt::Debug for LifecycleMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LifecycleMetrics")
            .field("donated_total", &self.donated_total())
            .finish_non_exhaustive()
    }
}

/// Timer guard for an operation histogram.
pub struct OperationTimer(HistogramTimer);

impl OperationTimer {
    /// Stops the timer and records the elapsed seconds.
    pub fn observe(self) -> f64 {
        self.0.stop_and_record()
    }
}

fn metrics_err(e: prometheus::Error) -> TelemetryError {
    TelemetryError::MetricsInit(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instances_do_not_collide() {
        let a = LifecycleMetrics::new().unwrap();
        let b = LifecycleMetrics::new().unwrap();
        a.record_transition("submitted");
        assert_eq!(a.transitions("submitted"), 1);
        assert_eq!(b.transitions("submitted"), 0);
    }

    #[test]
    fn test_counters() {
        let metrics = LifecycleMetrics::new().unwrap();
        metrics.record_operation("decide");
        metrics.record_operation("decide");
        metrics.record_rejection("invalid_state");
        metrics.record_donation(250);
        metrics.record_donation(750);

        assert_eq!(metrics.operations("decide"), 2);
        assert_eq!(metrics.rejections("invalid_state"), 1);
        assert_eq!(metrics.donated_total(), 1000);
    }

    #[test]
    fn test_gather_text_uses_namespace() {
        let metrics = LifecycleMetrics::new().unwrap();
        metrics.record_transition("approved");
        metrics.set_cases_in_status("approved", 3);

        let text = metrics.gather_text().unwrap();
        assert!(text.contains("sla_case_transitions_total"));
        assert!(text.contains("action=\"approved\""));
        assert!(text.contains("sla_cases{status=\"approved\"} 3"));
    }

    #[test]
    fn test_operation_timer_records() {
        let metrics = LifecycleMetrics::new().unwrap();
        let timer = metrics.start_timer("submit");
        assert!(timer.observe() >= 0.0);

        let text = metrics.gather_text().unwrap();
        assert!(text.contains("sla_operation_duration_seconds_count{operation=\"submit\"} 1"));
    }
}
