//! Rolling performance metrics.
//!
//! A bounded, append-only sample buffer of per-assessment latencies plus
//! per-decision-action counters. Safe for concurrent recording; samples
//! beyond the configured bound evict the oldest first.

use crate::types::TransactionAction;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::sync::RwLock;
use std::time::Instant;

/// Snapshot of rolling performance over the bounded sample window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceSnapshot {
    /// Total assessments recorded since startup.
    pub total_assessments: u64,
    /// Samples currently in the rolling window.
    pub sample_count: usize,
    /// Mean processing time (ms).
    pub mean_ms: f64,
    /// Median processing time (ms).
    pub median_ms: f64,
    /// 95th percentile processing time (ms).
    pub p95_ms: f64,
    /// 99th percentile processing time (ms).
    pub p99_ms: f64,
    /// Decision counts by action name.
    pub actions: HashMap<String, u64>,
}

#[derive(Debug, Default)]
struct MetricsInner {
    samples: VecDeque<f64>,
    actions: HashMap<TransactionAction, u64>,
    total: u64,
}

/// Bounded rolling metrics recorder.
#[derive(Debug)]
pub struct RollingMetrics {
    inner: RwLock<MetricsInner>,
    capacity: usize,
}

impl RollingMetrics {
    /// Create a recorder keeping at most `capacity` latency samples.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: RwLock::new(MetricsInner::default()),
            capacity: capacity.max(1),
        }
    }

    /// Record a processing latency in milliseconds.
    pub fn record(&self, latency_ms: f64) {
        let mut inner = self.inner.write().unwrap();
        inner.total += 1;
        inner.samples.push_back(latency_ms);
        if inner.samples.len() > self.capacity {
            inner.samples.pop_front();
        }
    }

    /// Record a latency together with the decided action.
    pub fn record_decision(&self, latency_ms: f64, action: TransactionAction) {
        {
            let mut inner = self.inner.write().unwrap();
            inner.total += 1;
            inner.samples.push_back(latency_ms);
            if inner.samples.len() > self.capacity {
                inner.samples.pop_front();
            }
            *inner.actions.entry(action).or_insert(0) += 1;
        }
    }

    /// Compute a snapshot over the current window.
    #[must_use]
    pub fn snapshot(&self) -> PerformanceSnapshot {
        let inner = self.inner.read().unwrap();
        let mut sorted: Vec<f64> = inner.samples.iter().copied().collect();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

        let mean = if sorted.is_empty() {
            0.0
        } else {
            sorted.iter().sum::<f64>() / sorted.len() as f64
        };

        PerformanceSnapshot {
            total_assessments: inner.total,
            sample_count: sorted.len(),
            mean_ms: mean,
            median_ms: percentile(&sorted, 50.0),
            p95_ms: percentile(&sorted, 95.0),
            p99_ms: percentile(&sorted, 99.0),
            actions: inner
                .actions
                .iter()
                .map(|(action, count)| (action.as_str().to_string(), *count))
                .collect(),
        }
    }

    /// Clear all samples and counters.
    pub fn reset(&self) {
        let mut inner = self.inner.write().unwrap();
        *inner = MetricsInner::default();
    }
}

/// Percentile over a pre-sorted sample (nearest-rank).
fn percentile(sorted: &[f64], pct: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let idx = ((pct / 100.0) * sorted.len() as f64).ceil() as usize;
    sorted[idx.saturating_sub(1).min(sorted.len() - 1)]
}

/// RAII guard recording elapsed time into a `RollingMetrics` on drop.
pub struct TimingGuard<'a> {
    metrics: &'a RollingMetrics,
    start: Instant,
}

impl<'a> TimingGuard<'a> {
    /// Start timing against the given recorder.
    #[must_use]
    pub fn new(metrics: &'a RollingMetrics) -> Self {
        Self {
            metrics,
            start: Instant::now(),
        }
    }

    /// Milliseconds elapsed since the guard was created.
    #[must_use]
    pub fn elapsed_ms(&self) -> f64 {
        self.start.elapsed().as_secs_f64() * 1000.0
    }
}

impl Drop for TimingGuard<'_> {
    fn drop(&mut self) {
        self.metrics.record(self.elapsed_ms());
    }
}
