//! Anomaly analysis service.
//!
//! Wraps the ensemble detector with risk-level mapping, indicator
//! extraction, rolling processing-time metrics, and write-through result
//! caching via the cache collaborator. Cache failures degrade to uncached
//! operation, never to an analysis failure.

use crate::ensemble::{ComponentBreakdown, EnsembleAnomalyDetector};
use sentinel_core::collaborators::CacheStore;
use sentinel_core::error::Result;
use sentinel_core::metrics::{PerformanceSnapshot, RollingMetrics};
use sentinel_core::types::{RiskLevel, Transaction};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Cached anomaly results expire after this TTL.
const RESULT_TTL: Duration = Duration::from_secs(3_600);

/// Detection thresholds, updatable at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnomalyThresholds {
    /// Scores at or above this are anomalies.
    pub anomaly: f64,
    /// Scores at or above this are high risk.
    pub high_risk: f64,
}

impl Default for AnomalyThresholds {
    fn default() -> Self {
        Self {
            anomaly: 0.6,
            high_risk: 0.8,
        }
    }
}

/// Result of one anomaly analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnomalyReport {
    /// Ensemble anomaly score in [0,1].
    pub anomaly_score: f64,
    /// Whether the score crossed the anomaly threshold.
    pub is_anomaly: bool,
    /// Risk level derived from the score.
    pub risk_level: RiskLevel,
    /// Per-scorer breakdown.
    pub component_scores: ComponentBreakdown,
    /// Named indicators explaining the score.
    pub anomaly_indicators: Vec<String>,
    /// Wall-clock processing time in milliseconds.
    pub processing_time_ms: f64,
}

/// Anomaly analysis service.
pub struct AnomalyAnalysisService {
    ensemble: Arc<EnsembleAnomalyDetector>,
    cache: Option<Arc<dyn CacheStore>>,
    thresholds: RwLock<AnomalyThresholds>,
    metrics: RollingMetrics,
}

impl AnomalyAnalysisService {
    /// Create a service around an ensemble, without caching.
    #[must_use]
    pub fn new(ensemble: Arc<EnsembleAnomalyDetector>) -> Self {
        Self {
            ensemble,
            cache: None,
            thresholds: RwLock::new(AnomalyThresholds::default()),
            metrics: RollingMetrics::new(1_000),
        }
    }

    /// Attach a cache collaborator for result write-through.
    #[must_use]
    pub fn with_cache(mut self, cache: Arc<dyn CacheStore>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// The wrapped ensemble detector.
    #[must_use]
    pub fn ensemble(&self) -> &Arc<EnsembleAnomalyDetector> {
        &self.ensemble
    }

    /// Analyze one transaction.
    pub async fn analyze_transaction_anomaly(
        &self,
        transaction: &Transaction,
        history: &[Transaction],
    ) -> (f64, AnomalyReport) {
        let start = Instant::now();
        let (score, breakdown) = self.ensemble.predict_anomaly_score(transaction, history);
        let thresholds = *self.thresholds.read().unwrap();

        let report = AnomalyReport {
            anomaly_score: score,
            is_anomaly: score >= thresholds.anomaly,
            risk_level: RiskLevel::from(score),
            component_scores: breakdown,
            anomaly_indicators: extract_indicators(transaction, &breakdown, score, thresholds),
            processing_time_ms: start.elapsed().as_secs_f64() * 1000.0,
        };
        self.metrics.record(report.processing_time_ms);

        if let Some(cache) = &self.cache {
            let key = format!("anomaly:{}", transaction.id);
            match serde_json::to_vec(&report) {
                Ok(bytes) => {
                    if let Err(err) = cache.set(&key, bytes, RESULT_TTL).await {
                        warn!(transaction_id = %transaction.id, error = %err,
                            "anomaly result cache write failed");
                    }
                }
                Err(err) => {
                    warn!(transaction_id = %transaction.id, error = %err,
                        "anomaly result serialization failed");
                }
            }
        }

        debug!(
            transaction_id = %transaction.id,
            score,
            is_anomaly = report.is_anomaly,
            "anomaly analysis complete"
        );
        (score, report)
    }

    /// Analyze a batch; one report per input, in input order.
    pub async fn batch_analyze_transactions(
        &self,
        transactions: &[Transaction],
    ) -> Vec<(f64, AnomalyReport)> {
        let mut results = Vec::with_capacity(transactions.len());
        for tx in transactions {
            results.push(self.analyze_transaction_anomaly(tx, &[]).await);
        }
        results
    }

    /// Replace detection thresholds.
    pub fn update_thresholds(&self, thresholds: AnomalyThresholds) -> Result<()> {
        if !(0.0..=1.0).contains(&thresholds.anomaly)
            || !(0.0..=1.0).contains(&thresholds.high_risk)
        {
            return Err(sentinel_core::error::SentinelError::config(
                "anomaly thresholds must lie in [0,1]",
            ));
        }
        *self.thresholds.write().unwrap() = thresholds;
        Ok(())
    }

    /// Current thresholds.
    #[must_use]
    pub fn thresholds(&self) -> AnomalyThresholds {
        *self.thresholds.read().unwrap()
    }

    /// Rolling performance snapshot.
    #[must_use]
    pub fn get_performance_metrics(&self) -> PerformanceSnapshot {
        self.metrics.snapshot()
    }
}

fn extract_indicators(
    transaction: &Transaction,
    breakdown: &ComponentBreakdown,
    score: f64,
    thresholds: AnomalyThresholds,
) -> Vec<String> {
    let mut indicators = Vec::new();

    if breakdown.tree_ensemble >= thresholds.anomaly {
        indicators.push("tree_ensemble_anomaly".to_string());
    }
    if breakdown.statistical >= thresholds.anomaly {
        indicators.push("statistical_deviation".to_string());
    }
    if breakdown.rule_based >= 0.5 {
        indicators.push("rule_violation".to_string());
    }
    if transaction.amount > 10_000.0 {
        indicators.push("large_amount".to_string());
    }
    let hour = (transaction.timestamp % 86_400) / 3_600;
    if hour <= 5 {
        indicators.push("unusual_timing".to_string());
    }
    if score >= thresholds.high_risk {
        indicators.push("high_anomaly_score".to_string());
    }
    indicators
}

#[cfg(test)]
mod tests {
    use super::*;
    use sentinel_core::collaborators::MemoryCache;

    const BASE_TIME: u64 = 1_736_346_600;

    fn trained_service() -> AnomalyAnalysisService {
        let ensemble = Arc::new(EnsembleAnomalyDetector::new());
        let batch: Vec<Transaction> = (0..50)
            .map(|i| {
                Transaction::new(
                    format!("tx_{i}"),
                    "sender",
                    format!("wallet_{}", i % 8),
                    90.0 + (i % 30) as f64,
                    BASE_TIME + i * 300,
                )
            })
            .collect();
        ensemble.train(&batch).unwrap();
        AnomalyAnalysisService::new(ensemble)
    }

    #[tokio::test]
    async fn test_basic_analysis_shape() {
        let service = trained_service();
        let tx = Transaction::new("tx_x", "sender", "wallet_1", 100.0, BASE_TIME);

        let (score, report) = service.analyze_transaction_anomaly(&tx, &[]).await;
        assert!((0.0..=1.0).contains(&score));
        assert_eq!(report.anomaly_score, score);
        assert!(report.processing_time_ms >= 0.0);
    }

    #[tokio::test]
    async fn test_large_deviation_flags_indicators() {
        let service = trained_service();
        let tx = Transaction::new("tx_big", "sender", "wallet_new", 50_000.0, 1_736_305_200);

        let (_, report) = service.analyze_transaction_anomaly(&tx, &[]).await;
        assert!(report
            .anomaly_indicators
            .contains(&"large_amount".to_string()));
        assert!(report
            .anomaly_indicators
            .contains(&"unusual_timing".to_string()));
    }

    #[tokio::test]
    async fn test_batch_preserves_order() {
        let service = trained_service();
        let batch: Vec<Transaction> = (0..5)
            .map(|i| {
                Transaction::new(
                    format!("tx_{i}"),
                    "sender",
                    format!("wallet_{i}"),
                    100.0 + i as f64 * 10.0,
                    BASE_TIME,
                )
            })
            .collect();

        let results = service.batch_analyze_transactions(&batch).await;
        assert_eq!(results.len(), 5);
        for (score, _) in &results {
            assert!((0.0..=1.0).contains(score));
        }
    }

    #[tokio::test]
    async fn test_cache_write_through() {
        let cache = Arc::new(MemoryCache::new());
        let service = trained_service().with_cache(cache.clone());
        let tx = Transaction::new("tx_cached", "sender", "wallet_1", 100.0, BASE_TIME);

        service.analyze_transaction_anomaly(&tx, &[]).await;
        assert!(cache.get("anomaly:tx_cached").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_threshold_update() {
        let service = trained_service();
        service
            .update_thresholds(AnomalyThresholds {
                anomaly: 0.7,
                high_risk: 0.9,
            })
            .unwrap();
        assert_eq!(service.thresholds().anomaly, 0.7);

        let invalid = service.update_thresholds(AnomalyThresholds {
            anomaly: 1.7,
            high_risk: 0.9,
        });
        assert!(invalid.is_err());
        // Prior thresholds survive a rejected update.
        assert_eq!(service.thresholds().anomaly, 0.7);
    }

    #[tokio::test]
    async fn test_metrics_accumulate() {
        let service = trained_service();
        let tx = Transaction::new("tx_m", "sender", "wallet_1", 100.0, BASE_TIME);
        for _ in 0..3 {
            service.analyze_transaction_anomaly(&tx, &[]).await;
        }

        let snapshot = service.get_performance_metrics();
        assert_eq!(snapshot.total_assessments, 3);
    }
}
