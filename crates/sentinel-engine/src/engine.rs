//! Real-time risk engine façade.
//!
//! Fuses component scores, derives risk level and risk factors, consults
//! the decision engine, and records rolling performance. Assessment never
//! raises: the worst case is a neutral assessment with fallback
//! indicators attached.

use crate::calculator::RiskScoreCalculator;
use crate::config::EngineConfig;
use crate::decision::{DecisionEngine, DecisionInput, DecisionRule};
use sentinel_core::error::Result;
use sentinel_core::metrics::{PerformanceSnapshot, RollingMetrics};
use sentinel_core::types::{
    ComponentScores, RiskAssessment, RiskLevel, TransactionAction, TransactionContext,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Instant;
use tracing::info;

/// One item of a batch assessment request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchAssessment {
    /// Transaction ID.
    pub transaction_id: String,
    /// Component scores for the transaction.
    pub component_scores: ComponentScores,
    /// Transaction context.
    pub context: TransactionContext,
}

/// Feedback counters fed by the feedback operation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeedbackSummary {
    /// Total feedback events received.
    pub total: u64,
    /// Events confirming actual fraud.
    pub confirmed_fraud: u64,
    /// Events by feedback type.
    pub by_type: HashMap<String, u64>,
    /// Fraud confirmations since the last recalibration.
    pub since_recalibration: u32,
}

/// Real-time risk engine.
pub struct RealTimeRiskEngine {
    calculator: RiskScoreCalculator,
    decisions: DecisionEngine,
    config: RwLock<EngineConfig>,
    metrics: RollingMetrics,
    feedback: RwLock<FeedbackSummary>,
}

impl RealTimeRiskEngine {
    /// Create an engine with default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    /// Create an engine with explicit configuration.
    #[must_use]
    pub fn with_config(config: EngineConfig) -> Self {
        Self {
            calculator: RiskScoreCalculator::with_weights(config.score_weights),
            decisions: DecisionEngine::new(),
            metrics: RollingMetrics::new(config.metrics_window),
            config: RwLock::new(config),
            feedback: RwLock::new(FeedbackSummary::default()),
        }
    }

    /// The decision engine, for rule management.
    #[must_use]
    pub fn decisions(&self) -> &DecisionEngine {
        &self.decisions
    }

    /// Current configuration.
    #[must_use]
    pub fn config(&self) -> EngineConfig {
        *self.config.read().unwrap()
    }

    /// Assess one transaction.
    ///
    /// Infallible by design: invalid component inputs are sanitized by the
    /// calculator, and every output field is bounded.
    #[must_use]
    pub fn assess_transaction_risk(
        &self,
        transaction_id: &str,
        component_scores: ComponentScores,
        context: &TransactionContext,
    ) -> RiskAssessment {
        let start = Instant::now();

        let (overall, confidence) = self
            .calculator
            .calculate_ensemble_score(&component_scores, context);

        let thresholds = self.config.read().unwrap().risk_thresholds;
        let risk_level = if overall >= thresholds.critical {
            RiskLevel::Critical
        } else if overall >= thresholds.high {
            RiskLevel::High
        } else if overall >= thresholds.medium {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        };

        let risk_factors = extract_risk_factors(&component_scores, context);

        let recommended_action = self.decisions.make_decision(&DecisionInput {
            overall_risk_score: overall,
            confidence,
            components: &component_scores,
            context,
        });

        let processing_time_ms = start.elapsed().as_secs_f64() * 1000.0;
        self.metrics
            .record_decision(processing_time_ms, recommended_action);

        RiskAssessment {
            transaction_id: transaction_id.to_string(),
            overall_risk_score: overall,
            confidence,
            risk_level,
            recommended_action,
            risk_factors,
            component_scores,
            processing_time_ms,
        }
    }

    /// Assess a batch concurrently; output order matches input order, and
    /// a failed item degrades to a neutral assessment instead of aborting
    /// the batch.
    pub async fn batch_assess_transactions(
        self: &Arc<Self>,
        items: Vec<BatchAssessment>,
    ) -> Vec<RiskAssessment> {
        let handles: Vec<_> = items
            .into_iter()
            .map(|item| {
                let engine = Arc::clone(self);
                tokio::task::spawn_blocking(move || {
                    engine.assess_transaction_risk(
                        &item.transaction_id,
                        item.component_scores,
                        &item.context,
                    )
                })
            })
            .collect();

        let mut results = Vec::with_capacity(handles.len());
        for handle in handles {
            match handle.await {
                Ok(assessment) => results.push(assessment),
                Err(_) => results.push(RiskAssessment::degraded("unknown")),
            }
        }
        results
    }

    /// Rolling performance snapshot (mean/median/p95/p99 + action counts).
    #[must_use]
    pub fn get_performance_metrics(&self) -> PerformanceSnapshot {
        self.metrics.snapshot()
    }

    /// Validate and atomically swap weight/threshold configuration.
    ///
    /// A rejected configuration leaves the previous one fully in effect;
    /// there is no partial application.
    pub fn update_configuration(&self, config: EngineConfig) -> Result<()> {
        config.validate()?;
        self.calculator.set_weights(config.score_weights)?;
        *self.config.write().unwrap() = config;
        info!("engine configuration updated");
        Ok(())
    }

    /// Install or replace a decision rule.
    pub fn add_decision_rule(&self, rule: DecisionRule) -> Result<()> {
        self.decisions.add_custom_rule(rule)
    }

    /// Remove a decision rule by name.
    pub fn remove_decision_rule(&self, name: &str) -> bool {
        self.decisions.remove_decision_rule(name)
    }

    /// Record a feedback event.
    ///
    /// Returns true when the configured recalibration trigger fired; the
    /// caller owning the ensemble performs the actual weight update.
    pub fn record_feedback(
        &self,
        transaction_id: &str,
        was_actually_fraud: bool,
        feedback_type: &str,
    ) -> bool {
        let recalibrate_after = self.config.read().unwrap().recalibrate_after;
        let mut feedback = self.feedback.write().unwrap();
        feedback.total += 1;
        *feedback
            .by_type
            .entry(feedback_type.to_string())
            .or_insert(0) += 1;
        if was_actually_fraud {
            feedback.confirmed_fraud += 1;
            feedback.since_recalibration += 1;
        }
        info!(
            transaction_id,
            was_actually_fraud, feedback_type, "feedback recorded"
        );

        if recalibrate_after > 0 && feedback.since_recalibration >= recalibrate_after {
            feedback.since_recalibration = 0;
            true
        } else {
            false
        }
    }

    /// Feedback counters.
    #[must_use]
    pub fn feedback_summary(&self) -> FeedbackSummary {
        self.feedback.read().unwrap().clone()
    }
}

impl Default for RealTimeRiskEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Human-readable factors from component and context threshold crossings.
fn extract_risk_factors(scores: &ComponentScores, context: &TransactionContext) -> Vec<String> {
    let mut factors = Vec::new();

    if scores.behavioral > 0.7 {
        factors.push("unusual_behavior".to_string());
    }
    if scores.graph > 0.6 {
        factors.push("suspicious_network".to_string());
    }
    if scores.anomaly > 0.8 {
        factors.push("transaction_anomaly".to_string());
    }
    if scores.rule_based > 0.5 {
        factors.push("rule_violation".to_string());
    }

    if context.amount > 10_000.0 {
        factors.push("high_amount".to_string());
    } else if context.amount > 0.0 && context.amount < 1.0 {
        factors.push("micro_amount".to_string());
    }
    if context.recent_transactions_1h > 10 {
        factors.push("high_velocity".to_string());
    }
    if context.is_new_location {
        factors.push("new_location".to_string());
    }
    factors
}
