//! # Sentinel Core
//!
//! Core abstractions for the Sentinel real-time fraud-risk scoring engine.
//!
//! This crate provides:
//! - Transaction, score, and assessment types shared by all detectors
//! - Detector metadata and execution-mode definitions
//! - Error types and the crate-wide `Result` alias
//! - Async collaborator traits (cache store, behavioral scorer)
//! - Rolling performance metrics and latency-budget validation

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod budget;
pub mod collaborators;
pub mod detector;
pub mod domain;
pub mod error;
pub mod metrics;
pub mod types;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::budget::{BudgetResult, BudgetValidator};
    pub use crate::collaborators::{
        BehavioralScorer, CacheStore, MemoryCache, ScoreOutcome,
    };
    pub use crate::detector::{Detector, DetectorMetadata, ExecutionMode};
    pub use crate::domain::Domain;
    pub use crate::error::{Result, SentinelError};
    pub use crate::metrics::{PerformanceSnapshot, RollingMetrics, TimingGuard};
    pub use crate::types::{
        ComponentScores, RiskAssessment, RiskLevel, Transaction, TransactionAction,
        TransactionContext,
    };
}
