//! Risk score calculator.
//!
//! Fuses component scores into one overall score and an agreement-based
//! confidence. Out-of-range or non-numeric inputs are sanitized rather
//! than propagated: NaN falls back to the component's documented default,
//! finite values clamp to [0,1].

use crate::config::ScoreWeights;
use sentinel_core::detector::{Detector, DetectorMetadata};
use sentinel_core::domain::Domain;
use sentinel_core::error::Result;
use sentinel_core::types::{ComponentScores, TransactionContext};
use std::sync::RwLock;

/// Risk score calculator with atomically-swappable weights.
#[derive(Debug)]
pub struct RiskScoreCalculator {
    metadata: DetectorMetadata,
    weights: RwLock<ScoreWeights>,
}

impl RiskScoreCalculator {
    /// Create a calculator with default weights.
    #[must_use]
    pub fn new() -> Self {
        Self::with_weights(ScoreWeights::default())
    }

    /// Create a calculator with explicit weights.
    #[must_use]
    pub fn with_weights(weights: ScoreWeights) -> Self {
        Self {
            metadata: DetectorMetadata::inline("risk/ensemble-score", Domain::RiskDecision)
                .with_description("Weighted component fusion with agreement confidence")
                .with_throughput(1_000_000)
                .with_latency_us(2.0),
            weights: RwLock::new(weights),
        }
    }

    /// Current weights.
    #[must_use]
    pub fn weights(&self) -> ScoreWeights {
        *self.weights.read().unwrap()
    }

    /// Replace the weights after validation.
    pub fn set_weights(&self, weights: ScoreWeights) -> Result<()> {
        weights.validate()?;
        *self.weights.write().unwrap() = weights;
        Ok(())
    }

    /// Fuse component scores into (overall score, confidence).
    ///
    /// Both outputs are bounded to [0,1]. Confidence reflects agreement
    /// among components: high when they cluster, low when they diverge.
    #[must_use]
    pub fn calculate_ensemble_score(
        &self,
        scores: &ComponentScores,
        _context: &TransactionContext,
    ) -> (f64, f64) {
        let behavioral = sanitize(scores.behavioral, ComponentScores::BEHAVIORAL_DEFAULT);
        let graph = sanitize(scores.graph, ComponentScores::GRAPH_DEFAULT);
        let anomaly = sanitize(scores.anomaly, ComponentScores::ANOMALY_DEFAULT);
        let rule_based = sanitize(scores.rule_based, 0.0);

        let weights = self.weights();
        let overall = weights.behavioral * behavioral
            + weights.graph * graph
            + weights.anomaly * anomaly
            + weights.rule_based * rule_based;

        let components = [behavioral, graph, anomaly, rule_based];
        let mean = components.iter().sum::<f64>() / components.len() as f64;
        let variance = components
            .iter()
            .map(|c| (c - mean).powi(2))
            .sum::<f64>()
            / components.len() as f64;
        // Maximum possible spread of [0,1] values is std = 0.5.
        let confidence = (1.0 - 2.0 * variance.sqrt()).clamp(0.0, 1.0);

        (overall.clamp(0.0, 1.0), confidence)
    }
}

impl Default for RiskScoreCalculator {
    fn default() -> Self {
        Self::new()
    }
}

impl Detector for RiskScoreCalculator {
    fn metadata(&self) -> &DetectorMetadata {
        &self.metadata
    }
}

/// NaN falls back to the component default; finite values clamp to [0,1].
fn sanitize(value: f64, default: f64) -> f64 {
    if value.is_nan() {
        default
    } else {
        value.clamp(0.0, 1.0)
    }
}
