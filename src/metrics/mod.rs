// Private module declaration
mod server;

use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry};

// Re-export for public API
pub use server::start_metrics_server;

// ============================================================================
// Metrics Module - Prometheus metrics for observability
// ============================================================================
//
// Provides metrics for:
// - Follow edge events dispatched to the counter handlers
// - Counter transaction latency
// - Dispatcher retries
// - Dead Letter Queue volume
//
// All metrics are registered with Prometheus and can be scraped via /metrics
// ============================================================================

pub struct Metrics {
    registry: Registry,

    pub edge_events_processed: IntCounterVec,
    pub edge_events_failed: IntCounterVec,
    pub counter_update_duration: HistogramVec,

    pub dispatch_retry_attempts: IntCounter,

    pub dlq_messages_total: IntCounter,
}

impl Metrics {
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let edge_events_processed = IntCounterVec::new(
            Opts::new("edge_events_processed_total", "Follow edge events applied to counters"),
            &["kind"],
        )?;
        registry.register(Box::new(edge_events_processed.clone()))?;

        let edge_events_failed = IntCounterVec::new(
            Opts::new("edge_events_failed_total", "Follow edge events whose counter transaction failed"),
            &["kind", "reason"],
        )?;
        registry.register(Box::new(edge_events_failed.clone()))?;

        let counter_update_duration = HistogramVec::new(
            HistogramOpts::new("counter_update_duration_seconds", "Counter transaction duration, retries included")
                .buckets(vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0]),
            &["kind"],
        )?;
        registry.register(Box::new(counter_update_duration.clone()))?;

        let dispatch_retry_attempts = IntCounter::new(
            "dispatch_retry_attempts_total",
            "Extra delivery attempts made by the edge stream dispatcher",
        )?;
        registry.register(Box::new(dispatch_retry_attempts.clone()))?;

        let dlq_messages_total = IntCounter::new(
            "dlq_messages_total",
            "Total follow edge events sent to the dead letter queue",
        )?;
        registry.register(Box::new(dlq_messages_total.clone()))?;

        Ok(Self {
            registry,
            edge_events_processed,
            edge_events_failed,
            counter_update_duration,
            dispatch_retry_attempts,
            dlq_messages_total,
        })
    }

    /// Get the Prometheus registry for exposing metrics via HTTP
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Record the outcome of one dispatched edge event
    pub fn record_edge_event(&self, kind: &str, duration_secs: f64, failure_reason: Option<&str>) {
        match failure_reason {
            None => self.edge_events_processed.with_label_values(&[kind]).inc(),
            Some(reason) => self.edge_events_failed.with_label_values(&[kind, reason]).inc(),
        }
        self.counter_update_duration.with_label_values(&[kind]).observe(duration_secs);
    }

    /// Attempt numbers are 1-based; only attempts after the first count
    pub fn record_dispatch_attempt(&self, attempt: u32) {
        if attempt > 1 {
            self.dispatch_retry_attempts.inc();
        }
    }

    pub fn record_dlq_message(&self) {
        self.dlq_messages_total.inc();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_creation() {
        let metrics = Metrics::new().unwrap();
        assert!(!metrics.registry.gather().is_empty());
    }

    #[test]
    fn test_record_edge_event_success_and_failure() {
        let metrics = Metrics::new().unwrap();
        metrics.record_edge_event("FollowEdgeCreated", 0.002, None);
        metrics.record_edge_event("FollowEdgeCreated", 0.004, None);
        metrics.record_edge_event("FollowEdgeDeleted", 0.010, Some("user_not_found"));

        assert_eq!(
            metrics.edge_events_processed.with_label_values(&["FollowEdgeCreated"]).get(),
            2
        );
        assert_eq!(
            metrics
                .edge_events_failed
                .with_label_values(&["FollowEdgeDeleted", "user_not_found"])
                .get(),
            1
        );
    }

    #[test]
    fn test_first_attempt_is_not_a_retry() {
        let metrics = Metrics::new().unwrap();
        metrics.record_dispatch_attempt(1);
        metrics.record_dispatch_attempt(2);
        metrics.record_dispatch_attempt(3);

        assert_eq!(metrics.dispatch_retry_attempts.get(), 2);
    }

    #[test]
    fn test_record_dlq_message() {
        let metrics = Metrics::new().unwrap();
        metrics.record_dlq_message();
        metrics.record_dlq_message();

        let gathered = metrics.registry.gather();
        let dlq_total = gathered.iter().find(|m| m.name() == "dlq_messages_total").unwrap();
        assert_eq!(dlq_total.metric[0].counter.value, Some(2.0));
    }
}
