// Private module declaration
mod server;

use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts, Registry};

// Re-export for public API
pub use server::start_metrics_server;

// ============================================================================
// Metrics Module - Prometheus metrics for the orders service
// ============================================================================
//
// - Orders created and status changes applied
// - Workflow failures by operation and error kind
// - Catalog round-trip latency and outcome
// - Catalog/bus circuit breaker state
//
// Exposed for scraping on /metrics.
// ============================================================================

pub struct Metrics {
    registry: Registry,

    pub orders_created: IntCounter,
    pub status_changes: IntCounterVec,
    pub workflow_failures: IntCounterVec,
    pub catalog_request_duration: HistogramVec,
    pub circuit_breaker_state: IntGauge,
}

impl Metrics {
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let orders_created = IntCounter::new("orders_created_total", "Total orders created")?;
        registry.register(Box::new(orders_created.clone()))?;

        let status_changes = IntCounterVec::new(
            Opts::new("order_status_changes_total", "Status changes written to the store"),
            &["status"],
        )?;
        registry.register(Box::new(status_changes.clone()))?;

        let workflow_failures = IntCounterVec::new(
            Opts::new("order_workflow_failures_total", "Failed order operations"),
            &["operation", "kind"],
        )?;
        registry.register(Box::new(workflow_failures.clone()))?;

        let catalog_request_duration = HistogramVec::new(
            HistogramOpts::new(
                "catalog_request_duration_seconds",
                "Round-trip time of validate-products calls",
            )
            .buckets(vec![0.005, 0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]),
            &["outcome"],
        )?;
        registry.register(Box::new(catalog_request_duration.clone()))?;

        let circuit_breaker_state = IntGauge::new(
            "circuit_breaker_state",
            "Bus circuit breaker state (0=Closed, 1=Open, 2=HalfOpen)",
        )?;
        registry.register(Box::new(circuit_breaker_state.clone()))?;

        Ok(Self {
            registry,
            orders_created,
            status_changes,
            workflow_failures,
            catalog_request_duration,
            circuit_breaker_state,
        })
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn record_order_created(&self) {
        self.orders_created.inc();
    }

    pub fn record_status_change(&self, status: &str) {
        self.status_changes.with_label_values(&[status]).inc();
    }

    pub fn record_failure(&self, operation: &str, kind: &str) {
        self.workflow_failures
            .with_label_values(&[operation, kind])
            .inc();
    }

    pub fn record_catalog_request(&self, outcome: &str, duration_secs: f64) {
        self.catalog_request_duration
            .with_label_values(&[outcome])
            .observe(duration_secs);
    }

    pub fn update_circuit_breaker_state(&self, state: i64) {
        self.circuit_breaker_state.set(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counter_value(metrics: &Metrics, name: &str) -> Vec<f64> {
        metrics
            .registry()
            .gather()
            .iter()
            .find(|family| family.name() == name)
            .map(|family| {
                family
                    .metric
                    .iter()
                    .map(|m| m.counter.value.unwrap_or_default())
                    .collect()
            })
            .unwrap_or_default()
    }

    #[test]
    fn test_metrics_creation() {
        let metrics = Metrics::new().unwrap();
        metrics.record_order_created();
        assert!(!metrics.registry().gather().is_empty());
        assert_eq!(counter_value(&metrics, "orders_created_total"), vec![1.0]);
    }

    #[test]
    fn test_failures_labelled_by_operation_and_kind() {
        let metrics = Metrics::new().unwrap();
        metrics.record_failure("create", "product_not_found");
        metrics.record_failure("create", "product_not_found");
        metrics.record_failure("find_one", "not_found");

        let values = counter_value(&metrics, "order_workflow_failures_total");
        assert_eq!(values.len(), 2);
        assert_eq!(values.iter().sum::<f64>(), 3.0);
    }

    #[test]
    fn test_catalog_latency_observed() {
        let metrics = Metrics::new().unwrap();
        metrics.record_catalog_request("ok", 0.02);

        let gathered = metrics.registry().gather();
        let histogram = gathered
            .iter()
            .find(|m| m.name() == "catalog_request_duration_seconds")
            .unwrap();
        assert_eq!(histogram.metric[0].histogram.sample_count, Some(1));
    }
}
