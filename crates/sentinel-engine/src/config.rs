//! Engine configuration.
//!
//! All weight and threshold settings used by the calculator and decision
//! engine live in one validated object, swapped atomically on update.
//! Invalid configurations are rejected synchronously, leaving the prior
//! configuration intact.

use sentinel_core::error::{Result, SentinelError};
use sentinel_graph::SuspicionWeights;
use serde::{Deserialize, Serialize};

/// Weight normalization tolerance.
const WEIGHT_TOLERANCE: f64 = 1e-6;

/// Component fusion weights.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreWeights {
    /// Behavioral component weight.
    pub behavioral: f64,
    /// Graph component weight.
    pub graph: f64,
    /// Anomaly component weight.
    pub anomaly: f64,
    /// Rule-based component weight.
    pub rule_based: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            behavioral: 0.35,
            graph: 0.30,
            anomaly: 0.25,
            rule_based: 0.10,
        }
    }
}

impl ScoreWeights {
    /// Sum of all weights.
    #[must_use]
    pub fn sum(&self) -> f64 {
        self.behavioral + self.graph + self.anomaly + self.rule_based
    }

    /// Validate that weights are in [0,1] and sum to 1.0.
    pub fn validate(&self) -> Result<()> {
        for (name, w) in [
            ("behavioral", self.behavioral),
            ("graph", self.graph),
            ("anomaly", self.anomaly),
            ("rule_based", self.rule_based),
        ] {
            if !w.is_finite() || !(0.0..=1.0).contains(&w) {
                return Err(SentinelError::config(format!(
                    "score weight {name} must lie in [0,1], got {w}"
                )));
            }
        }
        if (self.sum() - 1.0).abs() > WEIGHT_TOLERANCE {
            return Err(SentinelError::config(format!(
                "score weights must sum to 1.0, got {}",
                self.sum()
            )));
        }
        Ok(())
    }
}

/// Risk-level thresholds over the overall score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskThresholds {
    /// Scores at or above this are medium risk.
    pub medium: f64,
    /// Scores at or above this are high risk.
    pub high: f64,
    /// Scores at or above this are critical.
    pub critical: f64,
}

impl Default for RiskThresholds {
    fn default() -> Self {
        Self {
            medium: 0.4,
            high: 0.6,
            critical: 0.8,
        }
    }
}

impl RiskThresholds {
    /// Validate ordering and bounds.
    pub fn validate(&self) -> Result<()> {
        let ordered = 0.0 < self.medium && self.medium < self.high && self.high < self.critical
            && self.critical <= 1.0;
        if !ordered
            || !self.medium.is_finite()
            || !self.high.is_finite()
            || !self.critical.is_finite()
        {
            return Err(SentinelError::config(
                "risk thresholds must satisfy 0 < medium < high < critical <= 1",
            ));
        }
        Ok(())
    }
}

/// Complete engine configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Component fusion weights.
    pub score_weights: ScoreWeights,
    /// Risk-level thresholds.
    pub risk_thresholds: RiskThresholds,
    /// Community suspicion coefficients.
    pub suspicion_weights: SuspicionWeights,
    /// Rolling metrics sample bound.
    pub metrics_window: usize,
    /// Ensemble weights are re-derived after this many fraud-confirmation
    /// feedback events; 0 disables recalibration.
    pub recalibrate_after: u32,
    /// Interval for the deferred centrality/community refresh, seconds.
    pub refresh_interval_secs: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            score_weights: ScoreWeights::default(),
            risk_thresholds: RiskThresholds::default(),
            suspicion_weights: SuspicionWeights::default(),
            metrics_window: 1_000,
            recalibrate_after: 25,
            refresh_interval_secs: 60,
        }
    }
}

impl EngineConfig {
    /// Validate the whole configuration.
    pub fn validate(&self) -> Result<()> {
        self.score_weights.validate()?;
        self.risk_thresholds.validate()?;
        self.suspicion_weights.validate()?;
        if self.metrics_window == 0 {
            return Err(SentinelError::config("metrics window must be positive"));
        }
        if self.refresh_interval_secs == 0 {
            return Err(SentinelError::config("refresh interval must be positive"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_valid() {
        assert!(EngineConfig::default().validate().is_ok());
    }

    #[test]
    fn test_weights_must_sum_to_one() {
        let mut weights = ScoreWeights::default();
        weights.behavioral = 0.9;
        assert!(weights.validate().is_err());
    }

    #[test]
    fn test_weights_reject_nan() {
        let mut weights = ScoreWeights::default();
        weights.graph = f64::NAN;
        assert!(weights.validate().is_err());
    }

    #[test]
    fn test_threshold_ordering() {
        let mut thresholds = RiskThresholds::default();
        thresholds.high = 0.3; // below medium
        assert!(thresholds.validate().is_err());
    }

    #[test]
    fn test_zero_metrics_window_rejected() {
        let mut config = EngineConfig::default();
        config.metrics_window = 0;
        assert!(config.validate().is_err());
    }
}
