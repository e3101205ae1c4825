//! A small metrics port so the domain crate can emit the mandatory counter
//! and histogram names from spec section 4.1/4.3 without depending on any
//! particular metrics backend. The service crate wires a `prometheus`-backed
//! implementation; tests use [`NoopMetrics`] or a recording double.

use std::time::Duration;

/// Sink for counters and duration histograms. Implementations must be cheap
/// to call on every request; they are invoked synchronously on the intake
/// and replay hot paths.
pub trait Metrics: Send + Sync {
    fn increment_counter(&self, name: &'static str, labels: &[(&'static str, &str)]);

    fn record_duration(&self, name: &'static str, labels: &[(&'static str, &str)], duration: Duration);
}

/// Discards every observation. Used as the default in tests and examples.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopMetrics;

impl Metrics for NoopMetrics {
    fn increment_counter(&self, _name: &'static str, _labels: &[(&'static str, &str)]) {}

    fn record_duration(&self, _name: &'static str, _labels: &[(&'static str, &str)], _duration: Duration) {}
}

/// Records every call it receives, for assertions in tests.
#[derive(Debug, Default)]
pub struct RecordingMetrics {
    pub counters: std::sync::Mutex<Vec<(&'static str, Vec<(String, String)>)>>,
    pub durations: std::sync::Mutex<Vec<(&'static str, Duration)>>,
}

impl RecordingMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn counter_total(&self, name: &str) -> usize {
        self.counters.lock().unwrap().iter().filter(|(n, _)| *n == name).count()
    }
}

impl Metrics for RecordingMetrics {
    fn increment_counter(&self, name: &'static str, labels: &[(&'static str, &str)]) {
        let labels = labels.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        self.counters.lock().unwrap().push((name, labels));
    }

    fn record_duration(&self, name: &'static str, _labels: &[(&'static str, &str)], duration: Duration) {
        self.durations.lock().unwrap().push((name, duration));
    }
}

#[cfg(test)]
#[path = "metrics_tests.rs"]
mod tests;
