//! `prometheus`-backed implementation of [`webhook_core::Metrics`], plus the
//! `GET /metrics` text encoding used by `http.rs`. Webhook-core's port takes
//! an arbitrary metric name and label set at the call site rather than a
//! fixed struct of fields, so counters/histograms are registered lazily on
//! first use and cached by name for subsequent calls.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use prometheus::{HistogramVec, IntCounterVec, Opts, Registry};

use webhook_core::Metrics;

const DURATION_BUCKETS: &[f64] = &[0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 10.0];

/// Registers counters/histograms against a private `Registry` the first time
/// a given metric name is seen, then reuses the registered family.
pub struct PrometheusMetrics {
    registry: Registry,
    counters: Mutex<HashMap<&'static str, IntCounterVec>>,
    histograms: Mutex<HashMap<&'static str, HistogramVec>>,
}

impl PrometheusMetrics {
    pub fn new() -> Self {
        Self {
            registry: Registry::new(),
            counters: Mutex::new(HashMap::new()),
            histograms: Mutex::new(HashMap::new()),
        }
    }

    /// Renders the registry in the Prometheus text exposition format.
    pub fn gather(&self) -> String {
        use prometheus::Encoder;
        let encoder = prometheus::TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        if encoder.encode(&metric_families, &mut buffer).is_err() {
            return String::new();
        }
        String::from_utf8(buffer).unwrap_or_default()
    }

    fn counter_for(&self, name: &'static str, label_keys: &[&'static str]) -> IntCounterVec {
        let mut counters = self.counters.lock().unwrap();
        if let Some(existing) = counters.get(name) {
            return existing.clone();
        }
        let counter = IntCounterVec::new(Opts::new(name, name), label_keys)
            .expect("metric name/labels must be valid for prometheus registration");
        let _ = self.registry.register(Box::new(counter.clone()));
        counters.insert(name, counter.clone());
        counter
    }

    fn histogram_for(&self, name: &'static str, label_keys: &[&'static str]) -> HistogramVec {
        let mut histograms = self.histograms.lock().unwrap();
        if let Some(existing) = histograms.get(name) {
            return existing.clone();
        }
        let opts = prometheus::HistogramOpts::new(name, name).buckets(DURATION_BUCKETS.to_vec());
        let histogram = HistogramVec::new(opts, label_keys)
            .expect("metric name/labels must be valid for prometheus registration");
        let _ = self.registry.register(Box::new(histogram.clone()));
        histograms.insert(name, histogram.clone());
        histogram
    }
}

impl Default for PrometheusMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics for PrometheusMetrics {
    fn increment_counter(&self, name: &'static str, labels: &[(&'static str, &str)]) {
        let keys: Vec<&'static str> = labels.iter().map(|(k, _)| *k).collect();
        let values: Vec<&str> = labels.iter().map(|(_, v)| *v).collect();
        self.counter_for(name, &keys).with_label_values(&values).inc();
    }

    fn record_duration(&self, name: &'static str, labels: &[(&'static str, &str)], duration: Duration) {
        let keys: Vec<&'static str> = labels.iter().map(|(k, _)| *k).collect();
        let values: Vec<&str> = labels.iter().map(|(_, v)| *v).collect();
        self.histogram_for(name, &keys)
            .with_label_values(&values)
            .observe(duration.as_secs_f64());
    }
}

#[cfg(test)]
#[path = "metrics_tests.rs"]
mod tests;
