//! Metrics recording abstraction for webhook processing.

use prometheus::{IntCounter, IntCounterVec, Opts, Registry};

/// Abstraction for recording webhook processing metrics.
///
/// # Thread Safety
/// All implementations MUST be thread-safe (Send + Sync). Requests record metrics
/// concurrently and never read them back.
pub trait WebhookMetrics: Send + Sync {
    /// Records the terminal outcome of one webhook delivery.
    ///
    /// # Arguments
    /// * `outcome` - Stable outcome label, see `DispatchOutcome::label`
    fn record_webhook(&self, outcome: &str);

    /// Records one remote lookup made while waiting for branches to appear.
    fn record_resolution_attempt(&self);

    /// Records one branch protection write.
    ///
    /// # Arguments
    /// * `result` - `applied`, `not_found` or `failed`
    fn record_protection_write(&self, result: &str);
}

/// Prometheus metrics collector for webhook processing.
///
/// # Metrics
/// - `branch_sentry_webhooks_total{outcome}` (Counter)
/// - `branch_sentry_branch_resolution_attempts_total` (Counter)
/// - `branch_sentry_protection_writes_total{result}` (Counter)
#[derive(Clone)]
pub struct PrometheusWebhookMetrics {
    webhooks: IntCounterVec,
    resolution_attempts: IntCounter,
    protection_writes: IntCounterVec,
}

impl PrometheusWebhookMetrics {
    /// Creates the collectors and registers them with `registry`.
    ///
    /// # Errors
    /// Returns an error if metrics with the same names are already registered.
    pub fn new(registry: &Registry) -> Result<Self, prometheus::Error> {
        let webhooks = IntCounterVec::new(
            Opts::new(
                "branch_sentry_webhooks_total",
                "Webhook deliveries by terminal outcome",
            ),
            &["outcome"],
        )?;
        let resolution_attempts = IntCounter::new(
            "branch_sentry_branch_resolution_attempts_total",
            "Remote lookups made while waiting for branches to appear",
        )?;
        let protection_writes = IntCounterVec::new(
            Opts::new(
                "branch_sentry_protection_writes_total",
                "Branch protection writes by result",
            ),
            &["result"],
        )?;

        registry.register(Box::new(webhooks.clone()))?;
        registry.register(Box::new(resolution_attempts.clone()))?;
        registry.register(Box::new(protection_writes.clone()))?;

        Ok(Self {
            webhooks,
            resolution_attempts,
            protection_writes,
        })
    }
}

impl WebhookMetrics for PrometheusWebhookMetrics {
    fn record_webhook(&self, outcome: &str) {
        self.webhooks.with_label_values(&[outcome]).inc();
    }

    fn record_resolution_attempt(&self) {
        self.resolution_attempts.inc();
    }

    fn record_protection_write(&self, result: &str) {
        self.protection_writes.with_label_values(&[result]).inc();
    }
}

/// No-op metrics implementation for testing or when metrics are disabled.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpWebhookMetrics;

impl NoOpWebhookMetrics {
    pub fn new() -> Self {
        Self
    }
}

impl WebhookMetrics for NoOpWebhookMetrics {
    fn record_webhook(&self, _outcome: &str) {}
    fn record_resolution_attempt(&self) {}
    fn record_protection_write(&self, _result: &str) {}
}

#[cfg(test)]
#[path = "metrics_tests.rs"]
mod tests;
