//! Per-source fetch metrics
//!
//! Tracks a rolling latency window and success counts for each upstream
//! source, surfaced through the health endpoint.

use serde::Serialize;
use std::collections::VecDeque;
use std::time::Duration;
use tokio::sync::RwLock;

/// Maximum number of samples kept in the rolling window
const MAX_SAMPLES: usize = 100;

/// Point-in-time metrics for one source
#[derive(Debug, Clone, Serialize)]
pub struct SourceMetrics {
    /// Name of the source
    pub source_name: String,
    /// 50th percentile fetch latency in milliseconds
    pub latency_p50_ms: f64,
    /// 99th percentile fetch latency in milliseconds
    pub latency_p99_ms: f64,
    /// Success rate (0.0 to 1.0)
    pub success_rate: f64,
    /// Total fetches (lifetime)
    pub total_fetches: u64,
    /// Failed fetches (lifetime)
    pub failed_fetches: u64,
}

impl SourceMetrics {
    /// Metrics with no recorded data
    pub fn empty(source_name: &str) -> Self {
        Self {
            source_name: source_name.to_string(),
            latency_p50_ms: 0.0,
            latency_p99_ms: 0.0,
            success_rate: 1.0,
            total_fetches: 0,
            failed_fetches: 0,
        }
    }
}

#[derive(Debug, Clone)]
struct LatencySample {
    duration_ms: f64,
    success: bool,
}

#[derive(Default)]
struct Counters {
    samples: VecDeque<LatencySample>,
    total: u64,
    failed: u64,
}

/// Collects fetch outcomes for one source
pub struct MetricsCollector {
    source_name: String,
    counters: RwLock<Counters>,
}

impl MetricsCollector {
    /// Creates a collector for the named source
    pub fn new(source_name: &str) -> Self {
        Self {
            source_name: source_name.to_string(),
            counters: RwLock::new(Counters::default()),
        }
    }

    /// Records one fetch with its duration and outcome
    pub async fn record_fetch(&self, duration: Duration, success: bool) {
        let mut counters = self.counters.write().await;
        counters.total += 1;
        if !success {
            counters.failed += 1;
        }
        if counters.samples.len() >= MAX_SAMPLES {
            counters.samples.pop_front();
        }
        counters.samples.push_back(LatencySample {
            duration_ms: duration.as_secs_f64() * 1000.0,
            success,
        });
    }

    /// Computes current metrics from the collected samples
    pub async fn snapshot(&self) -> SourceMetrics {
        let counters = self.counters.read().await;
        if counters.samples.is_empty() {
            return SourceMetrics::empty(&self.source_name);
        }

        let mut latencies: Vec<f64> = counters
            .samples
            .iter()
            .filter(|s| s.success)
            .map(|s| s.duration_ms)
            .collect();
        latencies.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

        let success_rate = if counters.total > 0 {
            (counters.total - counters.failed) as f64 / counters.total as f64
        } else {
            1.0
        };

        SourceMetrics {
            source_name: self.source_name.clone(),
            latency_p50_ms: percentile(&latencies, 50.0),
            latency_p99_ms: percentile(&latencies, 99.0),
            success_rate,
            total_fetches: counters.total,
            failed_fetches: counters.failed,
        }
    }
}

/// Nearest-rank percentile over sorted values
fn percentile(sorted_values: &[f64], p: f64) -> f64 {
    if sorted_values.is_empty() {
        return 0.0;
    }
    let idx = (p / 100.0 * (sorted_values.len() - 1) as f64).round() as usize;
    sorted_values[idx.min(sorted_values.len() - 1)]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn collector_tracks_totals_and_success_rate() {
        let collector = MetricsCollector::new("dexscreener");

        collector
            .record_fetch(Duration::from_millis(100), true)
            .await;
        collector
            .record_fetch(Duration::from_millis(200), true)
            .await;
        collector
            .record_fetch(Duration::from_millis(150), false)
            .await;

        let metrics = collector.snapshot().await;
        assert_eq!(metrics.source_name, "dexscreener");
        assert_eq!(metrics.total_fetches, 3);
        assert_eq!(metrics.failed_fetches, 1);
        assert!(metrics.success_rate > 0.6 && metrics.success_rate < 0.7);
    }

    #[test]
    fn percentile_of_sorted_values() {
        let values = vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0];
        assert_eq!(percentile(&values, 50.0), 5.0);
        assert_eq!(percentile(&values, 99.0), 10.0);
    }
}
