//! Internal observability metrics for vsphere-exporter
//!
//! Metrics about the exporter's own operation, served on `/metrics`
//! separately from the per-target scrape output.
//!
//! # Metrics
//!
//! ## Per-target metrics
//! - `vsphere_exporter_scrape_success_total{target="..."}` - Counter of complete scrapes
//! - `vsphere_exporter_scrape_failure_total{target="..."}` - Counter of scrapes that were down or partial
//! - `vsphere_exporter_scrape_duration_seconds{target="..."}` - Histogram of scrape durations
//!
//! ## Config metrics
//! - `vsphere_exporter_config_reload_total` - Counter of successful config reloads
//! - `vsphere_exporter_config_reload_failure_total` - Counter of rejected config reloads
//! - `vsphere_exporter_config_last_reload_timestamp` - Timestamp of last successful load

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::catalog::{MetricDesc, MetricType};
use crate::collector::MetricSample;
use crate::formatter::PrometheusFormatter;

/// Default histogram buckets for scrape duration (in seconds)
///
/// Inventory passes against a vCenter take far longer than a typical HTTP
/// request, so the upper buckets reach the default pass timeout.
pub const DEFAULT_HISTOGRAM_BUCKETS: &[f64] = &[0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 20.0, 30.0];

const TARGET_LABEL: &[&str] = &["target"];

pub static SCRAPE_SUCCESS_TOTAL: MetricDesc = MetricDesc {
    name: "vsphere_exporter_scrape_success_total",
    help: "Total number of scrapes where the target was up and every entity type was collected",
    labels: TARGET_LABEL,
    metric_type: MetricType::Counter,
};

pub static SCRAPE_FAILURE_TOTAL: MetricDesc = MetricDesc {
    name: "vsphere_exporter_scrape_failure_total",
    help: "Total number of scrapes where the target was down or an entity type failed",
    labels: TARGET_LABEL,
    metric_type: MetricType::Counter,
};

pub static SCRAPE_DURATION_SECONDS: MetricDesc = MetricDesc {
    name: "vsphere_exporter_scrape_duration_seconds",
    help: "Histogram of scrape durations",
    labels: TARGET_LABEL,
    metric_type: MetricType::Histogram,
};

pub static CONFIG_RELOAD_TOTAL: MetricDesc = MetricDesc {
    name: "vsphere_exporter_config_reload_total",
    help: "Total number of successful configuration reloads",
    labels: &[],
    metric_type: MetricType::Counter,
};

pub static CONFIG_RELOAD_FAILURE_TOTAL: MetricDesc = MetricDesc {
    name: "vsphere_exporter_config_reload_failure_total",
    help: "Total number of rejected configuration reloads",
    labels: &[],
    metric_type: MetricType::Counter,
};

pub static CONFIG_LAST_RELOAD_TIMESTAMP: MetricDesc = MetricDesc {
    name: "vsphere_exporter_config_last_reload_timestamp",
    help: "Unix timestamp of the last successful configuration load",
    labels: &[],
    metric_type: MetricType::Gauge,
};

/// Thread-safe counter using atomic operations
#[derive(Debug, Default)]
pub struct Counter {
    value: AtomicU64,
}

impl Counter {
    /// Create a new counter initialized to 0
    pub fn new() -> Self {
        Self {
            value: AtomicU64::new(0),
        }
    }

    /// Increment the counter by 1
    pub fn inc(&self) {
        self.value.fetch_add(1, Ordering::Relaxed);
    }

    /// Get the current value
    pub fn get(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }
}

/// Thread-safe gauge using atomic operations
#[derive(Debug, Default)]
pub struct Gauge {
    /// Stored as bits of f64 for atomic operations
    value: AtomicU64,
}

impl Gauge {
    /// Create a new gauge initialized to 0
    pub fn new() -> Self {
        Self {
            value: AtomicU64::new(0.0_f64.to_bits()),
        }
    }

    /// Set the gauge to a specific value
    pub fn set(&self, v: f64) {
        self.value.store(v.to_bits(), Ordering::Relaxed);
    }

    /// Get the current value
    pub fn get(&self) -> f64 {
        f64::from_bits(self.value.load(Ordering::Relaxed))
    }

    /// Set the gauge to the current Unix timestamp
    pub fn set_to_current_time(&self) {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs_f64())
            .unwrap_or(0.0);
        self.set(timestamp);
    }
}

/// Thread-safe histogram for measuring distributions
#[derive(Debug)]
pub struct Histogram {
    /// Bucket boundaries (upper bounds)
    buckets: Vec<f64>,
    /// Bucket counters (count of observations <= bucket boundary)
    bucket_counts: Vec<AtomicU64>,
    /// Sum of all observed values
    sum: AtomicU64,
    /// Total count of observations
    count: AtomicU64,
}

impl Histogram {
    /// Create a new histogram with the given bucket boundaries
    pub fn new(buckets: &[f64]) -> Self {
        let mut sorted_buckets: Vec<f64> = buckets.to_vec();
        sorted_buckets.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

        // Add +Inf bucket if not present
        if sorted_buckets
            .last()
            .map(|v| !v.is_infinite())
            .unwrap_or(true)
        {
            sorted_buckets.push(f64::INFINITY);
        }

        let bucket_counts = (0..sorted_buckets.len())
            .map(|_| AtomicU64::new(0))
            .collect();

        Self {
            buckets: sorted_buckets,
            bucket_counts,
            sum: AtomicU64::new(0.0_f64.to_bits()),
            count: AtomicU64::new(0),
        }
    }

    /// Create a histogram with default buckets for scrape durations
    pub fn with_default_buckets() -> Self {
        Self::new(DEFAULT_HISTOGRAM_BUCKETS)
    }

    /// Observe a value
    pub fn observe(&self, v: f64) {
        self.count.fetch_add(1, Ordering::Relaxed);

        // Update sum (atomic f64 add)
        loop {
            let current = self.sum.load(Ordering::Relaxed);
            let new = f64::from_bits(current) + v;
            if self
                .sum
                .compare_exchange_weak(current, new.to_bits(), Ordering::Relaxed, Ordering::Relaxed)
                .is_ok()
            {
                break;
            }
        }

        for (i, &bound) in self.buckets.iter().enumerate() {
            if v <= bound {
                self.bucket_counts[i].fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    /// Get the sum of all observations
    pub fn get_sum(&self) -> f64 {
        f64::from_bits(self.sum.load(Ordering::Relaxed))
    }

    /// Get the total count of observations
    pub fn get_count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    /// Get bucket boundaries and their cumulative counts
    pub fn get_buckets(&self) -> Vec<(f64, u64)> {
        self.buckets
            .iter()
            .zip(self.bucket_counts.iter())
            .map(|(&bound, count)| (bound, count.load(Ordering::Relaxed)))
            .collect()
    }
}

impl Default for Histogram {
    fn default() -> Self {
        Self::with_default_buckets()
    }
}

/// Per-target metrics
#[derive(Debug, Default)]
pub struct TargetMetrics {
    /// Counter of complete scrapes
    pub scrape_success_total: Counter,
    /// Counter of down or partial scrapes
    pub scrape_failure_total: Counter,
    /// Histogram of scrape durations
    pub scrape_duration_seconds: Histogram,
}

/// Config metrics
#[derive(Debug, Default)]
pub struct ConfigMetrics {
    /// Counter of successful config reloads
    pub reload_total: Counter,
    /// Counter of rejected config reloads
    pub reload_failure_total: Counter,
    /// Timestamp of last successful load
    pub last_reload_timestamp: Gauge,
}

/// Internal metrics registry
///
/// Cheap to clone; clones share the same counters.
#[derive(Debug, Clone)]
pub struct InternalMetrics {
    /// Per-target metrics, keyed by target endpoint
    targets: Arc<RwLock<BTreeMap<String, Arc<TargetMetrics>>>>,
    /// Config metrics
    pub config: Arc<ConfigMetrics>,
}

impl Default for InternalMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl InternalMetrics {
    /// Create a new internal metrics registry
    pub fn new() -> Self {
        let metrics = Self {
            targets: Arc::new(RwLock::new(BTreeMap::new())),
            config: Arc::new(ConfigMetrics::default()),
        };

        // Record initial config load timestamp
        metrics.config.last_reload_timestamp.set_to_current_time();

        metrics
    }

    /// Get or create metrics for a target
    pub fn target(&self, target: &str) -> Arc<TargetMetrics> {
        {
            let targets = self.targets.read().unwrap_or_else(|e| e.into_inner());
            if let Some(metrics) = targets.get(target) {
                return Arc::clone(metrics);
            }
        }

        let mut targets = self.targets.write().unwrap_or_else(|e| e.into_inner());
        Arc::clone(targets.entry(target.to_string()).or_default())
    }

    /// Record a complete scrape for a target
    pub fn record_scrape_success(&self, target: &str, duration_seconds: f64) {
        let metrics = self.target(target);
        metrics.scrape_success_total.inc();
        metrics.scrape_duration_seconds.observe(duration_seconds);
    }

    /// Record a down or partial scrape for a target
    pub fn record_scrape_failure(&self, target: &str, duration_seconds: f64) {
        let metrics = self.target(target);
        metrics.scrape_failure_total.inc();
        metrics.scrape_duration_seconds.observe(duration_seconds);
    }

    /// Record a successful config reload
    pub fn record_config_reload(&self) {
        self.config.reload_total.inc();
        self.config.last_reload_timestamp.set_to_current_time();
    }

    /// Record a rejected config reload
    pub fn record_config_reload_failure(&self) {
        self.config.reload_failure_total.inc();
    }

    /// Snapshot all internal metrics as samples
    pub fn to_samples(&self) -> Vec<MetricSample> {
        let mut samples = Vec::new();

        {
            let targets = self.targets.read().unwrap_or_else(|e| e.into_inner());
            for (target, metrics) in targets.iter() {
                let label = [target.as_str()];

                samples.push(MetricSample::new(
                    &SCRAPE_SUCCESS_TOTAL,
                    label,
                    metrics.scrape_success_total.get() as f64,
                ));
                samples.push(MetricSample::new(
                    &SCRAPE_FAILURE_TOTAL,
                    label,
                    metrics.scrape_failure_total.get() as f64,
                ));

                let histogram = &metrics.scrape_duration_seconds;
                for (bound, count) in histogram.get_buckets() {
                    samples.push(
                        MetricSample::new(&SCRAPE_DURATION_SECONDS, label, count as f64)
                            .with_suffix("_bucket")
                            .with_label("le", PrometheusFormatter::format_value(bound)),
                    );
                }
                samples.push(
                    MetricSample::new(&SCRAPE_DURATION_SECONDS, label, histogram.get_sum())
                        .with_suffix("_sum"),
                );
                samples.push(
                    MetricSample::new(
                        &SCRAPE_DURATION_SECONDS,
                        label,
                        histogram.get_count() as f64,
                    )
                    .with_suffix("_count"),
                );
            }
        }

        let no_labels = std::iter::empty::<&str>;
        samples.push(MetricSample::new(
            &CONFIG_RELOAD_TOTAL,
            no_labels(),
            self.config.reload_total.get() as f64,
        ));
        samples.push(MetricSample::new(
            &CONFIG_RELOAD_FAILURE_TOTAL,
            no_labels(),
            self.config.reload_failure_total.get() as f64,
        ));
        samples.push(MetricSample::new(
            &CONFIG_LAST_RELOAD_TIMESTAMP,
            no_labels(),
            self.config.last_reload_timestamp.get(),
        ));

        samples
    }

    /// Format internal metrics as Prometheus exposition format string
    pub fn format_prometheus(&self) -> String {
        PrometheusFormatter::new().format(&self.to_samples())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counter_operations() {
        let counter = Counter::new();
        assert_eq!(counter.get(), 0);

        counter.inc();
        counter.inc();
        assert_eq!(counter.get(), 2);
    }

    #[test]
    fn test_gauge_operations() {
        let gauge = Gauge::new();
        assert_eq!(gauge.get(), 0.0);

        gauge.set(42.5);
        assert_eq!(gauge.get(), 42.5);

        gauge.set_to_current_time();
        assert!(gauge.get() > 1_600_000_000.0);
    }

    #[test]
    fn test_histogram_operations() {
        let histogram = Histogram::new(&[0.1, 0.5, 1.0]);

        histogram.observe(0.05);
        histogram.observe(0.3);
        histogram.observe(0.8);
        histogram.observe(2.0);

        assert_eq!(histogram.get_count(), 4);

        let buckets = histogram.get_buckets();
        // 0.05 <= 0.1
        assert_eq!(buckets[0], (0.1, 1));
        // 0.05, 0.3 <= 0.5
        assert_eq!(buckets[1], (0.5, 2));
        // 0.05, 0.3, 0.8 <= 1.0
        assert_eq!(buckets[2], (1.0, 3));
        // All values <= +Inf
        assert_eq!(buckets[3].1, 4);
    }

    #[test]
    fn test_histogram_default_buckets() {
        let histogram = Histogram::with_default_buckets();
        let buckets = histogram.get_buckets();

        // Should have all default buckets plus +Inf
        assert_eq!(buckets.len(), DEFAULT_HISTOGRAM_BUCKETS.len() + 1);
    }

    #[test]
    fn test_internal_metrics_target() {
        let metrics = InternalMetrics::new();

        metrics.record_scrape_success("vc01", 0.05);
        metrics.record_scrape_success("vc01", 0.10);
        metrics.record_scrape_failure("vc01", 0.50);

        let target_metrics = metrics.target("vc01");
        assert_eq!(target_metrics.scrape_success_total.get(), 2);
        assert_eq!(target_metrics.scrape_failure_total.get(), 1);
        assert_eq!(target_metrics.scrape_duration_seconds.get_count(), 3);
    }

    #[test]
    fn test_clones_share_state() {
        let metrics = InternalMetrics::new();
        let cloned = metrics.clone();

        cloned.record_scrape_failure("vc01", 1.0);
        assert_eq!(metrics.target("vc01").scrape_failure_total.get(), 1);
    }

    #[test]
    fn test_internal_metrics_config() {
        let metrics = InternalMetrics::new();

        let initial_timestamp = metrics.config.last_reload_timestamp.get();
        assert!(initial_timestamp > 0.0);

        metrics.record_config_reload();
        metrics.record_config_reload_failure();

        assert_eq!(metrics.config.reload_total.get(), 1);
        assert_eq!(metrics.config.reload_failure_total.get(), 1);
        assert!(metrics.config.last_reload_timestamp.get() >= initial_timestamp);
    }

    #[test]
    fn test_format_prometheus() {
        let metrics = InternalMetrics::new();
        metrics.record_scrape_success("vc01.example.com", 0.3);

        let output = metrics.format_prometheus();

        assert!(output.contains("# TYPE vsphere_exporter_scrape_success_total counter"));
        assert!(output.contains("vsphere_exporter_scrape_success_total{target=\"vc01.example.com\"} 1"));
        assert!(output.contains("# TYPE vsphere_exporter_scrape_duration_seconds histogram"));
        assert!(output.contains(
            "vsphere_exporter_scrape_duration_seconds_bucket{target=\"vc01.example.com\",le=\"0.5\"} 1"
        ));
        assert!(output.contains(
            "vsphere_exporter_scrape_duration_seconds_bucket{target=\"vc01.example.com\",le=\"+Inf\"} 1"
        ));
        assert!(output.contains("vsphere_exporter_scrape_duration_seconds_count{target=\"vc01.example.com\"} 1"));
        assert!(output.contains("vsphere_exporter_config_reload_total 0"));
        assert_eq!(
            output
                .matches("# HELP vsphere_exporter_scrape_duration_seconds ")
                .count(),
            1
        );
    }
}
