//! Wall-clock latency measurements for inference steps
//!
//! A [`LatencyTracker`] is constructed once by the application and shared
//! (via `Arc`) with whatever needs to record or report timings.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::VecDeque;
use std::future::Future;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Operation names recorded by the analysis pipeline
pub mod ops {
    pub const SUMMARIZATION: &str = "summarization";
    pub const SENTIMENT_ANALYSIS: &str = "sentiment_analysis";
    pub const CONFIDENCE_ESTIMATION: &str = "confidence_estimation";
    pub const ANALYSIS: &str = "analysis";
}

/// Operations counted as local model inference in reports
const LOCAL_INFERENCE_OPS: [&str; 2] = [ops::SUMMARIZATION, ops::SENTIMENT_ANALYSIS];

/// Simulated cloud round trip, both directions (ms)
const CLOUD_NETWORK_MS: f64 = 300.0;
/// Simulated cloud API server overhead (ms)
const CLOUD_API_OVERHEAD_MS: f64 = 100.0;
/// Simulated cloud model queueing/startup (ms)
const CLOUD_STARTUP_MS: f64 = 200.0;

/// Measurements included in a report
const REPORT_TAIL: usize = 10;

/// Measurements retained; older ones are dropped
const MAX_MEASUREMENTS: usize = 10_000;

/// One timed operation
#[derive(Debug, Clone, Serialize)]
pub struct Measurement {
    pub operation: String,
    pub duration_ms: f64,
    pub timestamp: DateTime<Utc>,
}

/// Aggregated latency report
#[derive(Debug, Clone, Serialize)]
pub struct LatencyReport {
    pub local_inference_ms: f64,
    pub estimated_cloud_ms: f64,
    pub speedup_ratio: f64,
    pub time_saved_ms: f64,
    pub percentage_faster: f64,
    pub measurements_count: usize,
    pub measurements: Vec<Measurement>,
}

/// Records operation latencies
#[derive(Debug)]
pub struct LatencyTracker {
    measurements: Mutex<VecDeque<Measurement>>,
    capacity: usize,
    log_measurements: bool,
}

impl Default for LatencyTracker {
    fn default() -> Self {
        Self::new(true)
    }
}

impl LatencyTracker {
    /// Create a tracker; `log_measurements` emits one info line per measurement
    pub fn new(log_measurements: bool) -> Self {
        Self {
            measurements: Mutex::new(VecDeque::new()),
            capacity: MAX_MEASUREMENTS,
            log_measurements,
        }
    }

    /// Time a future and record it under `operation`
    pub async fn measure<F, T>(&self, operation: &str, fut: F) -> T
    where
        F: Future<Output = T>,
    {
        let start = Instant::now();
        let output = fut.await;
        self.record(operation, start.elapsed());
        output
    }

    /// Record an already-measured duration
    pub fn record(&self, operation: &str, elapsed: Duration) {
        let duration_ms = elapsed.as_secs_f64() * 1000.0;
        if self.log_measurements {
            info!("{} completed in {:.2}ms", operation, duration_ms);
        } else {
            debug!("{} completed in {:.2}ms", operation, duration_ms);
        }

        let mut measurements = self.lock();
        if measurements.len() >= self.capacity {
            measurements.pop_front();
        }
        measurements.push_back(Measurement {
            operation: operation.to_string(),
            duration_ms,
            timestamp: Utc::now(),
        });
    }

    /// Number of recorded measurements
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Average latency of local inference steps in milliseconds
    pub fn local_inference_latency(&self) -> f64 {
        mean_local_latency(&self.lock())
    }

    /// Estimated latency of the same inference behind a cloud API
    pub fn simulate_cloud_latency(local_latency_ms: f64) -> f64 {
        CLOUD_NETWORK_MS + CLOUD_API_OVERHEAD_MS + CLOUD_STARTUP_MS + local_latency_ms
    }

    /// Cloud latency divided by local latency (1.0 without measurements)
    pub fn speedup_ratio(&self) -> f64 {
        speedup(self.local_inference_latency())
    }

    /// Build a report over all measurements so far
    ///
    /// Every figure comes from the same snapshot of the measurements.
    pub fn report(&self) -> LatencyReport {
        let measurements = self.lock();

        let local = mean_local_latency(&measurements);
        let cloud = Self::simulate_cloud_latency(local);
        let tail_start = measurements.len().saturating_sub(REPORT_TAIL);

        LatencyReport {
            local_inference_ms: round2(local),
            estimated_cloud_ms: round2(cloud),
            speedup_ratio: round2(speedup(local)),
            time_saved_ms: round2(cloud - local),
            percentage_faster: if cloud > 0.0 {
                (((1.0 - local / cloud) * 100.0) * 10.0).round() / 10.0
            } else {
                0.0
            },
            measurements_count: measurements.len(),
            measurements: measurements.range(tail_start..).cloned().collect(),
        }
    }

    /// Log the current report
    pub fn log_report(&self) {
        let report = self.report();
        info!(
            local_ms = report.local_inference_ms,
            cloud_ms = report.estimated_cloud_ms,
            speedup = report.speedup_ratio,
            saved_ms = report.time_saved_ms,
            faster_pct = report.percentage_faster,
            "Latency report"
        );
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<Measurement>> {
        self.measurements.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn mean_local_latency(measurements: &VecDeque<Measurement>) -> f64 {
    let (sum, count) = measurements
        .iter()
        .filter(|m| LOCAL_INFERENCE_OPS.contains(&m.operation.as_str()))
        .fold((0.0, 0usize), |(sum, count), m| (sum + m.duration_ms, count + 1));

    if count == 0 {
        return 0.0;
    }
    sum / count as f64
}

/// Cloud latency divided by local latency (1.0 without measurements)
fn speedup(local_ms: f64) -> f64 {
    if local_ms == 0.0 {
        return 1.0;
    }
    LatencyTracker::simulate_cloud_latency(local_ms) / local_ms
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_report() {
        let tracker = LatencyTracker::new(false);
        let report = tracker.report();
        assert_eq!(report.local_inference_ms, 0.0);
        assert_eq!(report.estimated_cloud_ms, 600.0);
        assert_eq!(report.speedup_ratio, 1.0);
        assert_eq!(report.measurements_count, 0);
        assert!(tracker.is_empty());
    }

    #[test]
    fn test_local_latency_only_counts_inference_steps() {
        let tracker = LatencyTracker::new(false);
        tracker.record(ops::SUMMARIZATION, Duration::from_millis(100));
        tracker.record(ops::SENTIMENT_ANALYSIS, Duration::from_millis(300));
        tracker.record(ops::ANALYSIS, Duration::from_millis(5000));

        assert!((tracker.local_inference_latency() - 200.0).abs() < 1e-6);
        assert!((tracker.speedup_ratio() - 4.0).abs() < 1e-6);

        let report = tracker.report();
        assert_eq!(report.time_saved_ms, 600.0);
        assert_eq!(report.percentage_faster, 75.0);
        assert_eq!(report.measurements_count, 3);
    }

    #[test]
    fn test_report_keeps_last_ten() {
        let tracker = LatencyTracker::new(false);
        for i in 0..15 {
            tracker.record(ops::ANALYSIS, Duration::from_millis(i));
        }
        let report = tracker.report();
        assert_eq!(report.measurements_count, 15);
        assert_eq!(report.measurements.len(), 10);
        assert!((report.measurements[0].duration_ms - 5.0).abs() < 1e-6);
    }

    #[test]
    fn test_oldest_measurements_are_dropped_at_capacity() {
        let tracker = LatencyTracker {
            capacity: 3,
            ..LatencyTracker::new(false)
        };
        for i in 1..=5 {
            tracker.record(ops::SUMMARIZATION, Duration::from_millis(i * 10));
        }

        let report = tracker.report();
        assert_eq!(report.measurements_count, 3);
        let kept: Vec<f64> = report.measurements.iter().map(|m| m.duration_ms.round()).collect();
        assert_eq!(kept, vec![30.0, 40.0, 50.0]);
        assert_eq!(report.local_inference_ms, 40.0);
    }

    #[test]
    fn test_report_figures_agree() {
        let tracker = LatencyTracker::new(false);
        tracker.record(ops::SUMMARIZATION, Duration::from_millis(50));
        tracker.record(ops::SENTIMENT_ANALYSIS, Duration::from_millis(150));

        let report = tracker.report();
        let cloud = LatencyTracker::simulate_cloud_latency(report.local_inference_ms);
        assert_eq!(report.estimated_cloud_ms, cloud);
        assert_eq!(report.speedup_ratio, round2(cloud / report.local_inference_ms));
        assert_eq!(report.time_saved_ms, round2(cloud - report.local_inference_ms));
    }

    #[tokio::test]
    async fn test_measure_returns_output() {
        let tracker = LatencyTracker::new(false);
        let value = tracker.measure(ops::SUMMARIZATION, async { 42 }).await;
        assert_eq!(value, 42);
        assert_eq!(tracker.len(), 1);
    }
}
