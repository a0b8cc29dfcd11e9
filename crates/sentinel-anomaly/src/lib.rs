//! # Sentinel Anomaly
//!
//! Ensemble anomaly detection for transactions.
//!
//! This crate provides:
//! - Statistical detector (per-feature robust deviation scoring)
//! - Rule-based detector (stateless additive heuristics)
//! - Isolation forest (the trained tree-ensemble scorer contract)
//! - Ensemble detector combining the three with adaptive weights
//! - Anomaly analysis service with rolling metrics and result caching

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod ensemble;
pub mod forest;
pub mod matrix;
pub mod rules;
pub mod service;
pub mod statistical;

pub use ensemble::{ComponentBreakdown, EnsembleAnomalyDetector, EnsembleWeights, ScorerKind};
pub use forest::{ForestConfig, ForestSummary, IsolationForest, TreeEnsembleScorer};
pub use matrix::DataMatrix;
pub use rules::RuleBasedDetector;
pub use service::{AnomalyAnalysisService, AnomalyReport, AnomalyThresholds};
pub use statistical::{StatisticalDetector, StatsSummary};
