//! Configuration metrics tracking using OpenTelemetry.

use opentelemetry::KeyValue;
use opentelemetry::metrics::{Counter, Gauge, Histogram, Meter};
use std::time::Instant;

/// Metrics collector for a configuration manager.
///
/// Tracks source additions, provider rebuilds, reload attempts and failures,
/// change notifications and the number of live providers.
///
/// # Examples
///
/// ```rust,no_run
/// use layered_config::core::ConfigurationManager;
/// use layered_config::metrics::ConfigMetrics;
/// use opentelemetry::global;
///
/// let meter = global::meter("layered-config");
/// let config = ConfigurationManager::new().with_metrics(ConfigMetrics::new(meter));
/// ```
#[derive(Clone)]
pub struct ConfigMetrics {
    source_additions: Counter<u64>,
    rebuilds: Counter<u64>,
    reload_attempts: Counter<u64>,
    reload_failures: Counter<u64>,
    reload_duration: Histogram<f64>,
    change_notifications: Counter<u64>,
    active_providers: Gauge<i64>,
}

impl ConfigMetrics {
    /// Create a new metrics collector with the provided meter.
    pub fn new(meter: Meter) -> Self {
        let source_additions = meter
            .u64_counter("layered_config.sources.added")
            .with_description("Number of sources appended to the manager")
            .build();

        let rebuilds = meter
            .u64_counter("layered_config.providers.rebuilds")
            .with_description("Number of full provider rebuilds")
            .build();

        let reload_attempts = meter
            .u64_counter("layered_config.reload.attempts")
            .with_description("Total number of reload attempts")
            .build();

        let reload_failures = meter
            .u64_counter("layered_config.reload.failures")
            .with_description("Number of failed reloads")
            .build();

        let reload_duration = meter
            .f64_histogram("layered_config.reload.duration")
            .with_description("Duration of reload and rebuild operations in seconds")
            .with_unit("s")
            .build();

        let change_notifications = meter
            .u64_counter("layered_config.notifications")
            .with_description("Number of change notifications raised")
            .build();

        let active_providers = meter
            .i64_gauge("layered_config.providers.active")
            .with_description("Number of live providers")
            .build();

        Self {
            source_additions,
            rebuilds,
            reload_attempts,
            reload_failures,
            reload_duration,
            change_notifications,
            active_providers,
        }
    }

    /// Record a source appended through the fast path.
    pub fn record_source_added(&self) {
        self.source_additions.add(1, &[]);
    }

    /// Record a full provider rebuild that started at `start`.
    pub fn record_rebuild(&self, start: Instant) {
        self.rebuilds.add(1, &[]);
        self.reload_duration
            .record(start.elapsed().as_secs_f64(), &[KeyValue::new("operation", "rebuild")]);
    }

    /// Start a reload operation timer.
    ///
    /// Returns an `Instant` that should be passed to `record_reload_success` or
    /// `record_reload_failure` when the operation completes.
    pub fn start_reload(&self) -> Instant {
        self.reload_attempts.add(1, &[]);
        Instant::now()
    }

    /// Record a successful reload operation.
    pub fn record_reload_success(&self, start: Instant) {
        self.reload_duration
            .record(start.elapsed().as_secs_f64(), &[KeyValue::new("operation", "reload")]);
    }

    /// Record a failed reload operation.
    pub fn record_reload_failure(&self, start: Instant) {
        self.reload_failures.add(1, &[]);
        self.reload_duration
            .record(start.elapsed().as_secs_f64(), &[KeyValue::new("operation", "reload")]);
    }

    /// Record a change notification raised by the manager.
    pub fn record_notification(&self) {
        self.change_notifications.add(1, &[]);
    }

    /// Update the number of live providers.
    pub fn update_provider_count(&self, count: usize) {
        self.active_providers.record(count as i64, &[]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use opentelemetry::global;

    #[test]
    fn test_metrics_creation() {
        let meter = global::meter("test");
        let metrics = ConfigMetrics::new(meter);

        // Test basic operations don't panic
        metrics.record_source_added();
        metrics.record_rebuild(Instant::now());

        let timer = metrics.start_reload();
        metrics.record_reload_success(timer);

        let timer = metrics.start_reload();
        metrics.record_reload_failure(timer);

        metrics.record_notification();
        metrics.update_provider_count(3);
    }

    #[test]
    fn test_metrics_clone() {
        let metrics = ConfigMetrics::new(global::meter("test"));
        let metrics2 = metrics.clone();

        let timer1 = metrics.start_reload();
        let timer2 = metrics2.start_reload();

        metrics.record_reload_success(timer1);
        metrics2.record_reload_success(timer2);
    }
}
