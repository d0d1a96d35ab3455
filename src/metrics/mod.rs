// Private module declaration
mod server;

use prometheus::{HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry};

// Re-export for public API
pub use server::start_metrics_server;

// ============================================================================
// Metrics Module - Prometheus metrics for observability
// ============================================================================
//
// Provides metrics for:
// - Event store appends and version conflicts
// - Event bus publishes and handler failures
// - Command handling latency
//
// All metrics are registered with Prometheus and can be scraped via /metrics
// ============================================================================

/// Central metrics registry for the entire application
pub struct Metrics {
    registry: Registry,

    // Event Store Metrics
    pub events_appended: IntCounterVec,
    pub version_conflicts: IntCounterVec,

    // Event Bus Metrics
    pub events_published: IntCounterVec,
    pub handler_failures: IntCounterVec,

    // Command Metrics
    pub command_duration: HistogramVec,
}

impl Metrics {
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let events_appended = IntCounterVec::new(
            Opts::new("events_appended_total", "Total events appended to the event store"),
            &["aggregate_type"],
        )?;
        registry.register(Box::new(events_appended.clone()))?;

        let version_conflicts = IntCounterVec::new(
            Opts::new(
                "version_conflicts_total",
                "Appends rejected because the expected version was stale",
            ),
            &["aggregate_type"],
        )?;
        registry.register(Box::new(version_conflicts.clone()))?;

        let events_published = IntCounterVec::new(
            Opts::new("events_published_total", "Total events published on the event bus"),
            &["event_name"],
        )?;
        registry.register(Box::new(events_published.clone()))?;

        let handler_failures = IntCounterVec::new(
            Opts::new(
                "handler_failures_total",
                "Event handler failures swallowed at the bus boundary",
            ),
            &["event_name", "handler"],
        )?;
        registry.register(Box::new(handler_failures.clone()))?;

        let command_duration = HistogramVec::new(
            HistogramOpts::new("command_duration_seconds", "Command handling duration")
                .buckets(vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0]),
            &["aggregate_type"],
        )?;
        registry.register(Box::new(command_duration.clone()))?;

        Ok(Self {
            registry,
            events_appended,
            version_conflicts,
            events_published,
            handler_failures,
            command_duration,
        })
    }

    /// Get the Prometheus registry for exposing metrics via HTTP
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn record_append(&self, aggregate_type: &str, event_count: usize) {
        self.events_appended
            .with_label_values(&[aggregate_type])
            .inc_by(event_count as u64);
    }

    pub fn record_version_conflict(&self, aggregate_type: &str) {
        self.version_conflicts
            .with_label_values(&[aggregate_type])
            .inc();
    }

    pub fn record_publish(&self, event_name: &str) {
        self.events_published.with_label_values(&[event_name]).inc();
    }

    pub fn record_handler_failure(&self, event_name: &str, handler: &str) {
        self.handler_failures
            .with_label_values(&[event_name, handler])
            .inc();
    }

    pub fn observe_command(&self, aggregate_type: &str, duration_secs: f64) {
        self.command_duration
            .with_label_values(&[aggregate_type])
            .observe(duration_secs);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_creation() {
        let metrics = Metrics::new().unwrap();
        assert!(metrics.registry.gather().len() > 0);
    }

    #[test]
    fn test_record_append() {
        let metrics = Metrics::new().unwrap();
        metrics.record_append("Device", 2);

        let gathered = metrics.registry.gather();
        let appended = gathered
            .iter()
            .find(|m| m.name() == "events_appended_total")
            .unwrap();
        assert_eq!(appended.metric[0].counter.value, Some(2.0));
    }

    #[test]
    fn test_record_publish_and_failure() {
        let metrics = Metrics::new().unwrap();
        metrics.record_publish("DeviceCreated");
        metrics.record_publish("DeviceCreated");
        metrics.record_handler_failure("DeviceCreated", "device-read-model");

        let gathered = metrics.registry.gather();
        let published = gathered
            .iter()
            .find(|m| m.name() == "events_published_total")
            .unwrap();
        assert_eq!(published.metric[0].counter.value, Some(2.0));

        let failures = gathered
            .iter()
            .find(|m| m.name() == "handler_failures_total")
            .unwrap();
        assert_eq!(failures.metric[0].counter.value, Some(1.0));
    }

    #[test]
    fn test_record_version_conflict() {
        let metrics = Metrics::new().unwrap();
        metrics.record_version_conflict("User");

        let gathered = metrics.registry.gather();
        let conflicts = gathered
            .iter()
            .find(|m| m.name() == "version_conflicts_total")
            .unwrap();
        assert_eq!(conflicts.metric[0].counter.value, Some(1.0));
    }
}
