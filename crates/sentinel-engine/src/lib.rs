//! # Sentinel Engine
//!
//! Risk fusion and decisioning.
//!
//! This crate provides:
//! - The risk score calculator (sanitizing weighted fusion + confidence)
//! - The decision engine (prioritized, runtime-mutable rules)
//! - The real-time risk engine façade with rolling performance metrics
//! - The fraud analyzer orchestrating collaborators end to end

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod analyzer;
pub mod calculator;
pub mod config;
pub mod decision;
pub mod engine;

pub use analyzer::{FraudAnalyzer, UserContext};
pub use calculator::RiskScoreCalculator;
pub use config::{EngineConfig, RiskThresholds, ScoreWeights};
pub use decision::{ComponentKind, DecisionEngine, DecisionRule, RuleCondition};
pub use engine::{BatchAssessment, FeedbackSummary, RealTimeRiskEngine};
