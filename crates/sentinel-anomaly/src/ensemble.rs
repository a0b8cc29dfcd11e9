//! Ensemble anomaly detector.
//!
//! Combines the statistical, rule-based, and tree-ensemble scorers with
//! adjustable weights. Weight updates are applied atomically so concurrent
//! scoring never observes a partially-updated weight set.

use crate::forest::{ForestSummary, IsolationForest, TreeEnsembleScorer};
use crate::matrix::DataMatrix;
use crate::rules::RuleBasedDetector;
use crate::statistical::{StatisticalDetector, StatsSummary};
use sentinel_core::error::{Result, SentinelError};
use sentinel_core::types::Transaction;
use sentinel_features::{FeatureExtractor, FeatureVector, FEATURE_NAMES};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

/// Weight normalization tolerance.
const WEIGHT_TOLERANCE: f64 = 1e-6;

/// The fixed set of sub-scorers in the ensemble.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScorerKind {
    /// Trained tree-ensemble (isolation forest) scorer.
    TreeEnsemble,
    /// Statistical deviation scorer.
    Statistical,
    /// Rule-based heuristic scorer.
    RuleBased,
}

impl ScorerKind {
    /// All scorer kinds.
    pub const ALL: &'static [ScorerKind] = &[
        ScorerKind::TreeEnsemble,
        ScorerKind::Statistical,
        ScorerKind::RuleBased,
    ];

    /// Returns the kind name as a string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            ScorerKind::TreeEnsemble => "tree_ensemble",
            ScorerKind::Statistical => "statistical",
            ScorerKind::RuleBased => "rule_based",
        }
    }
}

impl fmt::Display for ScorerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Ensemble weights; always sum to 1.0 within tolerance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnsembleWeights {
    /// Weight of the tree-ensemble scorer.
    pub tree_ensemble: f64,
    /// Weight of the statistical scorer.
    pub statistical: f64,
    /// Weight of the rule-based scorer.
    pub rule_based: f64,
}

impl Default for EnsembleWeights {
    fn default() -> Self {
        Self {
            tree_ensemble: 0.5,
            statistical: 0.3,
            rule_based: 0.2,
        }
    }
}

impl EnsembleWeights {
    /// Sum of all weights.
    #[must_use]
    pub fn sum(&self) -> f64 {
        self.tree_ensemble + self.statistical + self.rule_based
    }

    /// Weight for one scorer kind.
    #[must_use]
    pub fn get(&self, kind: ScorerKind) -> f64 {
        match kind {
            ScorerKind::TreeEnsemble => self.tree_ensemble,
            ScorerKind::Statistical => self.statistical,
            ScorerKind::RuleBased => self.rule_based,
        }
    }

    /// Validate that weights are non-negative and sum to 1.0.
    pub fn validate(&self) -> Result<()> {
        for kind in ScorerKind::ALL {
            let w = self.get(*kind);
            if !w.is_finite() || w < 0.0 {
                return Err(SentinelError::config(format!(
                    "weight for {kind} must be a non-negative number, got {w}"
                )));
            }
        }
        if (self.sum() - 1.0).abs() > WEIGHT_TOLERANCE {
            return Err(SentinelError::config(format!(
                "ensemble weights must sum to 1.0, got {}",
                self.sum()
            )));
        }
        Ok(())
    }
}

/// Per-scorer score breakdown accompanying an ensemble prediction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ComponentBreakdown {
    /// Tree-ensemble score.
    pub tree_ensemble: f64,
    /// Statistical score.
    pub statistical: f64,
    /// Rule-based score.
    pub rule_based: f64,
}

impl ComponentBreakdown {
    /// Neutral breakdown returned before training.
    #[must_use]
    pub fn neutral() -> Self {
        Self {
            tree_ensemble: 0.5,
            statistical: 0.5,
            rule_based: 0.5,
        }
    }

    /// Score for one scorer kind.
    #[must_use]
    pub fn get(&self, kind: ScorerKind) -> f64 {
        match kind {
            ScorerKind::TreeEnsemble => self.tree_ensemble,
            ScorerKind::Statistical => self.statistical,
            ScorerKind::RuleBased => self.rule_based,
        }
    }
}

/// Summary returned by ensemble training.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnsembleTrainingSummary {
    /// Tree-ensemble training summary.
    pub tree_ensemble: ForestSummary,
    /// Statistical training summary.
    pub statistical: StatsSummary,
    /// Number of transactions used.
    pub samples: usize,
}

/// Ensemble anomaly detector.
///
/// Interior state follows the copy-then-swap discipline: weights live
/// behind their own lock, the trainable sub-detectors behind theirs, and
/// the trained flag is atomic, so scoring never blocks on training state
/// it does not read.
pub struct EnsembleAnomalyDetector {
    extractor: FeatureExtractor,
    statistical: RwLock<StatisticalDetector>,
    rule_based: RuleBasedDetector,
    tree_ensemble: RwLock<Box<dyn TreeEnsembleScorer>>,
    weights: RwLock<EnsembleWeights>,
    trained: AtomicBool,
}

impl EnsembleAnomalyDetector {
    /// Create an ensemble with the default isolation-forest scorer.
    #[must_use]
    pub fn new() -> Self {
        Self::with_tree_ensemble(Box::new(IsolationForest::default()))
    }

    /// Create an ensemble with a custom tree-ensemble scorer.
    #[must_use]
    pub fn with_tree_ensemble(scorer: Box<dyn TreeEnsembleScorer>) -> Self {
        Self {
            extractor: FeatureExtractor::new(),
            statistical: RwLock::new(StatisticalDetector::new()),
            rule_based: RuleBasedDetector::new(),
            tree_ensemble: RwLock::new(scorer),
            weights: RwLock::new(EnsembleWeights::default()),
            trained: AtomicBool::new(false),
        }
    }

    /// Returns true once `train` has completed.
    #[must_use]
    pub fn is_trained(&self) -> bool {
        self.trained.load(Ordering::Acquire)
    }

    /// Current weights.
    #[must_use]
    pub fn weights(&self) -> EnsembleWeights {
        *self.weights.read().unwrap()
    }

    /// Train every trainable sub-detector over a transaction batch.
    ///
    /// Features are extracted without history; callers that hold per-sender
    /// histories extract them upstream.
    pub fn train(&self, transactions: &[Transaction]) -> Result<EnsembleTrainingSummary> {
        if transactions.is_empty() {
            return Err(SentinelError::validation(
                "ensemble training requires at least one transaction",
            ));
        }

        let features: Vec<FeatureVector> = transactions
            .iter()
            .map(|tx| self.extractor.extract(tx, &[]))
            .collect();

        let statistical = self.statistical.write().unwrap().train(&features)?;

        let matrix = DataMatrix::from_features(&features);
        let names: Vec<String> = FEATURE_NAMES.iter().map(|s| s.to_string()).collect();
        let tree_ensemble = self.tree_ensemble.write().unwrap().train(&matrix, &names)?;

        self.trained.store(true, Ordering::Release);
        tracing::info!(
            samples = transactions.len(),
            threshold = tree_ensemble.threshold,
            "ensemble anomaly detector trained"
        );

        Ok(EnsembleTrainingSummary {
            tree_ensemble,
            statistical,
            samples: transactions.len(),
        })
    }

    /// Predict the anomaly score for a transaction.
    ///
    /// Untrained ensembles return exactly 0.5 overall with every component
    /// at 0.5, so callers always receive a complete, bounded structure.
    #[must_use]
    pub fn predict_anomaly_score(
        &self,
        transaction: &Transaction,
        history: &[Transaction],
    ) -> (f64, ComponentBreakdown) {
        if !self.is_trained() {
            return (0.5, ComponentBreakdown::neutral());
        }

        let features = self.extractor.extract(transaction, history);
        let breakdown = ComponentBreakdown {
            tree_ensemble: self.tree_ensemble.read().unwrap().score(&features),
            statistical: self.statistical.read().unwrap().score(&features),
            rule_based: self.rule_based.score(&features),
        };

        let weights = self.weights();
        let score = weights.tree_ensemble * breakdown.tree_ensemble
            + weights.statistical * breakdown.statistical
            + weights.rule_based * breakdown.rule_based;

        (score.clamp(0.0, 1.0), breakdown)
    }

    /// Re-derive weights proportionally to observed per-scorer performance.
    ///
    /// Higher performance yields higher weight; the result is renormalized
    /// to sum to 1.0 and swapped in atomically. Returns the new weights.
    pub fn update_weights(
        &self,
        performance: &HashMap<ScorerKind, f64>,
    ) -> Result<EnsembleWeights> {
        let mut total = 0.0;
        for kind in ScorerKind::ALL {
            let p = performance.get(kind).copied().unwrap_or(0.0);
            if !p.is_finite() || p < 0.0 {
                return Err(SentinelError::config(format!(
                    "performance for {kind} must be a non-negative number"
                )));
            }
            total += p;
        }
        if total <= WEIGHT_TOLERANCE {
            return Err(SentinelError::config(
                "at least one scorer must report positive performance",
            ));
        }

        let updated = EnsembleWeights {
            tree_ensemble: performance
                .get(&ScorerKind::TreeEnsemble)
                .copied()
                .unwrap_or(0.0)
                / total,
            statistical: performance
                .get(&ScorerKind::Statistical)
                .copied()
                .unwrap_or(0.0)
                / total,
            rule_based: performance
                .get(&ScorerKind::RuleBased)
                .copied()
                .unwrap_or(0.0)
                / total,
        };
        updated.validate()?;

        *self.weights.write().unwrap() = updated;
        Ok(updated)
    }
}

impl Default for EnsembleAnomalyDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for EnsembleAnomalyDetector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnsembleAnomalyDetector")
            .field("trained", &self.is_trained())
            .field("weights", &self.weights())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE_TIME: u64 = 1_736_346_600; // 2025-01-08T14:30:00Z

    fn training_batch() -> Vec<Transaction> {
        (0..60)
            .map(|i| {
                Transaction::new(
                    format!("tx_{i}"),
                    "wallet_sender",
                    format!("wallet_{}", i % 10),
                    80.0 + (i % 40) as f64,
                    BASE_TIME + i * 600,
                )
            })
            .collect()
    }

    #[test]
    fn test_untrained_returns_exact_neutral() {
        let ensemble = EnsembleAnomalyDetector::new();
        let tx = Transaction::new("tx_1", "a", "b", 100.0, BASE_TIME);

        let (score, breakdown) = ensemble.predict_anomaly_score(&tx, &[]);
        assert_eq!(score, 0.5);
        assert_eq!(breakdown.tree_ensemble, 0.5);
        assert_eq!(breakdown.statistical, 0.5);
        assert_eq!(breakdown.rule_based, 0.5);
    }

    #[test]
    fn test_training_summary_shape() {
        let ensemble = EnsembleAnomalyDetector::new();
        let summary = ensemble.train(&training_batch()).unwrap();

        assert!(ensemble.is_trained());
        assert_eq!(summary.samples, 60);
        assert_eq!(summary.tree_ensemble.samples_trained, 60);
        assert_eq!(summary.statistical.samples_used, 60);
    }

    #[test]
    fn test_prediction_bounded_after_training() {
        let ensemble = EnsembleAnomalyDetector::new();
        ensemble.train(&training_batch()).unwrap();

        let normal = Transaction::new("tx_n", "wallet_sender", "wallet_1", 100.0, BASE_TIME);
        let odd = Transaction::new(
            "tx_a",
            "wallet_sender",
            "wallet_new",
            50_000.0,
            1_736_305_200, // 03:00, night band
        );

        let (normal_score, _) = ensemble.predict_anomaly_score(&normal, &[]);
        let (odd_score, breakdown) = ensemble.predict_anomaly_score(&odd, &[]);

        assert!((0.0..=1.0).contains(&normal_score));
        assert!((0.0..=1.0).contains(&odd_score));
        assert!(odd_score > normal_score);
        assert!(breakdown.rule_based > 0.0);
    }

    #[test]
    fn test_update_weights_normalizes() {
        let ensemble = EnsembleAnomalyDetector::new();
        let original = ensemble.weights();

        let performance: HashMap<ScorerKind, f64> = [
            (ScorerKind::TreeEnsemble, 0.9),
            (ScorerKind::Statistical, 0.5),
            (ScorerKind::RuleBased, 0.7),
        ]
        .into_iter()
        .collect();

        let updated = ensemble.update_weights(&performance).unwrap();
        assert!((updated.sum() - 1.0).abs() < WEIGHT_TOLERANCE);
        assert_ne!(updated, original);
        assert!(updated.tree_ensemble > updated.statistical);
        assert_eq!(ensemble.weights(), updated);
    }

    #[test]
    fn test_update_weights_rejects_invalid() {
        let ensemble = EnsembleAnomalyDetector::new();
        let before = ensemble.weights();

        let nan: HashMap<ScorerKind, f64> =
            [(ScorerKind::TreeEnsemble, f64::NAN)].into_iter().collect();
        assert!(ensemble.update_weights(&nan).is_err());

        let zeros: HashMap<ScorerKind, f64> = HashMap::new();
        assert!(ensemble.update_weights(&zeros).is_err());

        // Rejection leaves the prior weights intact.
        assert_eq!(ensemble.weights(), before);
    }

    #[test]
    fn test_ensemble_monotone_in_anomalous_signals() {
        let ensemble = EnsembleAnomalyDetector::new();
        ensemble.train(&training_batch()).unwrap();

        // Rule-based component is weighted positively, so raising the
        // amount through the heuristic thresholds must not lower the score.
        let small = Transaction::new("a", "wallet_sender", "wallet_1", 100.0, BASE_TIME);
        let large = Transaction::new("b", "wallet_sender", "wallet_1", 20_000.0, BASE_TIME);

        let (small_score, small_parts) = ensemble.predict_anomaly_score(&small, &[]);
        let (large_score, large_parts) = ensemble.predict_anomaly_score(&large, &[]);

        assert!(large_parts.rule_based >= small_parts.rule_based);
        assert!(large_score > small_score);
    }
}
