//! Rule-based anomaly detector.
//!
//! Stateless additive point system over named heuristics. Each heuristic
//! contributes a bounded increment; the final score is clamped to [0,1].
//! Requires no training, and is monotone non-decreasing in every signal.

use sentinel_core::detector::{Detector, DetectorMetadata};
use sentinel_core::domain::Domain;
use sentinel_features::FeatureVector;
use serde::{Deserialize, Serialize};

/// Bounded increments for each heuristic.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RulePoints {
    /// Round amount at or above 100.
    pub round_amount: f64,
    /// Velocity score at or above `velocity_high`.
    pub high_velocity: f64,
    /// Velocity score at or above `velocity_elevated`.
    pub elevated_velocity: f64,
    /// Micro amount (below 1.0).
    pub micro_amount: f64,
    /// Night-time transaction.
    pub night_time: f64,
    /// New recipient receiving a large amount.
    pub new_recipient_large: f64,
    /// Large amount (above 10_000).
    pub large_amount: f64,
    /// Elevated amount (above 1_000).
    pub elevated_amount: f64,
}

impl Default for RulePoints {
    fn default() -> Self {
        Self {
            round_amount: 0.25,
            high_velocity: 0.8,
            elevated_velocity: 0.4,
            micro_amount: 0.3,
            night_time: 0.15,
            new_recipient_large: 0.35,
            large_amount: 0.3,
            elevated_amount: 0.1,
        }
    }
}

/// Velocity score at which the high-velocity heuristic fires.
const VELOCITY_HIGH: f64 = 0.8;
/// Velocity score at which the elevated-velocity heuristic fires.
const VELOCITY_ELEVATED: f64 = 0.5;
/// Amount above which a new recipient is treated as high risk.
const NEW_RECIPIENT_AMOUNT: f64 = 1_000.0;

/// Stateless heuristic anomaly scorer.
#[derive(Debug, Clone)]
pub struct RuleBasedDetector {
    metadata: DetectorMetadata,
    points: RulePoints,
}

impl RuleBasedDetector {
    /// Create a detector with default points.
    #[must_use]
    pub fn new() -> Self {
        Self::with_points(RulePoints::default())
    }

    /// Create a detector with custom points.
    #[must_use]
    pub fn with_points(points: RulePoints) -> Self {
        Self {
            metadata: DetectorMetadata::inline("anomaly/rule-based", Domain::Anomaly)
                .with_description("Additive heuristic scoring (round, velocity, micro, night)")
                .with_throughput(500_000)
                .with_latency_us(5.0),
            points,
        }
    }

    /// Score a feature vector, in [0,1].
    ///
    /// Heuristics read the named features produced by the extractor; the
    /// detector itself holds no state.
    #[must_use]
    pub fn score(&self, features: &FeatureVector) -> f64 {
        let amount = features.get("amount");
        let mut score = 0.0;

        if features.get("is_round_amount") > 0.5 {
            score += self.points.round_amount;
        }

        let velocity = features.get("velocity_score");
        if velocity >= VELOCITY_HIGH {
            score += self.points.high_velocity;
        } else if velocity >= VELOCITY_ELEVATED {
            score += self.points.elevated_velocity;
        }

        if features.get("amount_is_very_small") > 0.5 {
            score += self.points.micro_amount;
        }

        if features.get("is_night") > 0.5 {
            score += self.points.night_time;
        }

        if features.get("is_new_recipient") > 0.5 && amount > NEW_RECIPIENT_AMOUNT {
            score += self.points.new_recipient_large;
        }

        if features.get("amount_is_very_large") > 0.5 {
            score += self.points.large_amount;
        } else if amount > NEW_RECIPIENT_AMOUNT {
            score += self.points.elevated_amount;
        }

        score.clamp(0.0, 1.0)
    }

    /// Named heuristics that fired, for explainability.
    #[must_use]
    pub fn triggered(&self, features: &FeatureVector) -> Vec<&'static str> {
        let amount = features.get("amount");
        let mut fired = Vec::new();

        if features.get("is_round_amount") > 0.5 {
            fired.push("round_amount");
        }
        if features.get("velocity_score") >= VELOCITY_ELEVATED {
            fired.push("high_velocity");
        }
        if features.get("amount_is_very_small") > 0.5 {
            fired.push("micro_amount");
        }
        if features.get("is_night") > 0.5 {
            fired.push("night_time");
        }
        if features.get("is_new_recipient") > 0.5 && amount > NEW_RECIPIENT_AMOUNT {
            fired.push("new_recipient_large_amount");
        }
        if features.get("amount_is_very_large") > 0.5 {
            fired.push("large_amount");
        }
        fired
    }
}

impl Default for RuleBasedDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl Detector for RuleBasedDetector {
    fn metadata(&self) -> &DetectorMetadata {
        &self.metadata
    }
}
