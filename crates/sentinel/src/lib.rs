//! # Sentinel
//!
//! Real-time transaction fraud-risk scoring engine.
//!
//! Sentinel assigns a fraud-risk score and an enforcement action to each
//! financial transaction, combining independent signal sources into one
//! decision under a 100ms p99 latency objective:
//!
//! - **Features**: deterministic transaction feature extraction
//! - **Anomaly**: statistical + rule-based + isolation-forest ensemble
//!   with adaptive weighting
//! - **Graph**: incremental wallet-transfer graph with centrality and
//!   community (laundering-ring) analysis
//! - **Engine**: weighted score fusion, prioritized decision rules, and
//!   rolling performance metrics
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use sentinel::prelude::*;
//!
//! #[tokio::main]
//! async fn main() {
//!     let analyzer = Arc::new(FraudAnalyzer::new(
//!         Arc::new(RealTimeRiskEngine::new()),
//!         Arc::new(EnsembleAnomalyDetector::new()),
//!         Arc::new(GraphAnalysisService::new()),
//!     ));
//!
//!     // Keep global graph passes off the per-transaction path.
//!     let _refresh = analyzer.spawn_refresh_loop();
//!
//!     let tx = Transaction::new("tx_1", "wallet_a", "wallet_b", 125.0, 1_736_346_600);
//!     let assessment = analyzer.analyze(&tx, &UserContext::default()).await;
//!     println!("{}: {}", assessment.transaction_id, assessment.recommended_action);
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

// Re-export the domain crates.
pub use sentinel_anomaly as anomaly;
pub use sentinel_core as core;
pub use sentinel_engine as engine;
pub use sentinel_features as features;
pub use sentinel_graph as graph;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use sentinel_anomaly::{
        AnomalyAnalysisService, EnsembleAnomalyDetector, IsolationForest, ScorerKind,
    };
    pub use sentinel_core::prelude::*;
    pub use sentinel_engine::{
        DecisionEngine, DecisionRule, EngineConfig, FraudAnalyzer, RealTimeRiskEngine,
        RuleCondition, UserContext,
    };
    pub use sentinel_features::{FeatureExtractor, FeatureVector};
    pub use sentinel_graph::{CommunityDetector, GraphAnalysisService, TransactionGraph};
}

/// Version information.
pub mod version {
    /// Crate version.
    pub const VERSION: &str = env!("CARGO_PKG_VERSION");
}

#[cfg(test)]
mod tests {
    #[test]
    fn test_prelude_imports() {
        use crate::prelude::*;

        let _level = RiskLevel::Low;
        let _action = TransactionAction::Approve;
    }

    #[test]
    fn test_version() {
        assert!(!crate::version::VERSION.is_empty());
    }
}
