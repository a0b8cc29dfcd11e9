//! Fraud analyzer.
//!
//! The exposed interface consumed by the transport layer: orchestrates the
//! behavioral collaborator, the graph service, the anomaly ensemble (with
//! cached sender history), and the locally computed rule-based score, then
//! runs the risk engine. Every collaborator failure is caught and degraded
//! to its documented default; no analysis-internal fault blocks a
//! transaction.

use crate::engine::RealTimeRiskEngine;
use sentinel_anomaly::{ComponentBreakdown, EnsembleAnomalyDetector, ScorerKind};
use sentinel_core::collaborators::{BehavioralScorer, CacheStore, ScoreOutcome};
use sentinel_core::error::Result;
use sentinel_core::metrics::PerformanceSnapshot;
use sentinel_core::types::{
    ComponentScores, RiskAssessment, Transaction, TransactionContext,
};
use sentinel_graph::GraphAnalysisService;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use uuid::Uuid;

/// Assessment results are cached under this TTL.
const ASSESSMENT_TTL: Duration = Duration::from_secs(3_600);
/// Bound on remembered per-transaction score breakdowns.
const BREAKDOWN_CAPACITY: usize = 10_000;

/// Caller-supplied user context accompanying an analysis request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserContext {
    /// Account age in days.
    pub user_age_days: u32,
    /// Transactions observed in the last hour.
    pub recent_transactions_1h: u32,
    /// Whether the transaction originates from a new location.
    pub is_new_location: bool,
}

impl Default for UserContext {
    fn default() -> Self {
        Self {
            user_age_days: 365,
            recent_transactions_1h: 0,
            is_new_location: false,
        }
    }
}

#[derive(Debug, Default)]
struct BreakdownCache {
    order: VecDeque<String>,
    entries: HashMap<String, ComponentBreakdown>,
}

#[derive(Debug, Default)]
struct ScorerHits {
    hits: HashMap<ScorerKind, u64>,
    totals: HashMap<ScorerKind, u64>,
}

/// End-to-end fraud analyzer.
pub struct FraudAnalyzer {
    engine: Arc<RealTimeRiskEngine>,
    ensemble: Arc<EnsembleAnomalyDetector>,
    graph: Arc<GraphAnalysisService>,
    behavioral: Option<Arc<dyn BehavioralScorer>>,
    cache: Option<Arc<dyn CacheStore>>,
    breakdowns: RwLock<BreakdownCache>,
    scorer_hits: RwLock<ScorerHits>,
}

impl FraudAnalyzer {
    /// Create an analyzer without external collaborators.
    #[must_use]
    pub fn new(
        engine: Arc<RealTimeRiskEngine>,
        ensemble: Arc<EnsembleAnomalyDetector>,
        graph: Arc<GraphAnalysisService>,
    ) -> Self {
        Self {
            engine,
            ensemble,
            graph,
            behavioral: None,
            cache: None,
            breakdowns: RwLock::new(BreakdownCache::default()),
            scorer_hits: RwLock::new(ScorerHits::default()),
        }
    }

    /// Attach the behavioral scorer collaborator.
    #[must_use]
    pub fn with_behavioral(mut self, scorer: Arc<dyn BehavioralScorer>) -> Self {
        self.behavioral = Some(scorer);
        self
    }

    /// Attach the cache collaborator.
    #[must_use]
    pub fn with_cache(mut self, cache: Arc<dyn CacheStore>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// The underlying risk engine.
    #[must_use]
    pub fn engine(&self) -> &Arc<RealTimeRiskEngine> {
        &self.engine
    }

    /// The graph analysis service.
    #[must_use]
    pub fn graph(&self) -> &Arc<GraphAnalysisService> {
        &self.graph
    }

    /// The anomaly ensemble.
    #[must_use]
    pub fn ensemble(&self) -> &Arc<EnsembleAnomalyDetector> {
        &self.ensemble
    }

    /// Analyze one transaction end to end.
    pub async fn analyze(
        &self,
        transaction: &Transaction,
        user_context: &UserContext,
    ) -> RiskAssessment {
        let request_id = Uuid::new_v4();
        let user_id = transaction.sender.clone();

        let behavioral = self.behavioral_score(&user_id, transaction).await;

        let graph = self
            .graph
            .analyze_transaction_network(&user_id, transaction);

        let history = self.user_history(&user_id).await;
        let (anomaly_score, breakdown) = self
            .ensemble
            .predict_anomaly_score(transaction, &history);
        self.remember_breakdown(&transaction.id, breakdown);

        let context = TransactionContext {
            amount: transaction.amount,
            user_id: user_id.clone(),
            user_age_days: user_context.user_age_days,
            recent_transactions_1h: user_context.recent_transactions_1h,
            is_new_location: user_context.is_new_location,
            currency: transaction.currency.clone(),
        };
        let rule_based = rule_based_score(transaction, &context);

        let component_scores = ComponentScores {
            behavioral: behavioral.value,
            graph,
            anomaly: anomaly_score,
            rule_based,
        };

        let mut assessment =
            self.engine
                .assess_transaction_risk(&transaction.id, component_scores, &context);
        if behavioral.degraded {
            assessment
                .risk_factors
                .push("behavioral_fallback".to_string());
        }

        self.cache_assessment(&assessment).await;

        info!(
            request_id = %request_id,
            transaction_id = %assessment.transaction_id,
            score = assessment.overall_risk_score,
            action = %assessment.recommended_action,
            confidence = assessment.confidence,
            time_ms = assessment.processing_time_ms,
            "risk assessment complete"
        );
        assessment
    }

    async fn behavioral_score(&self, user_id: &str, transaction: &Transaction) -> ScoreOutcome {
        let Some(scorer) = &self.behavioral else {
            return ScoreOutcome::fallback(ComponentScores::BEHAVIORAL_DEFAULT);
        };
        match scorer.score(user_id, transaction).await {
            Ok(score) if score.is_finite() => ScoreOutcome::live(score.clamp(0.0, 1.0)),
            Ok(_) => ScoreOutcome::fallback(ComponentScores::BEHAVIORAL_DEFAULT),
            Err(err) => {
                warn!(user_id, error = %err, "behavioral scorer unavailable");
                ScoreOutcome::fallback(ComponentScores::BEHAVIORAL_DEFAULT)
            }
        }
    }

    /// Sender history from the cache; any failure reads as empty history.
    async fn user_history(&self, user_id: &str) -> Vec<Transaction> {
        let Some(cache) = &self.cache else {
            return Vec::new();
        };
        let key = format!("user_history:{user_id}");
        match cache.get(&key).await {
            Ok(Some(bytes)) => serde_json::from_slice(&bytes).unwrap_or_else(|err| {
                warn!(user_id, error = %err, "cached history malformed");
                Vec::new()
            }),
            Ok(None) => Vec::new(),
            Err(err) => {
                warn!(user_id, error = %err, "history cache unavailable");
                Vec::new()
            }
        }
    }

    async fn cache_assessment(&self, assessment: &RiskAssessment) {
        let Some(cache) = &self.cache else {
            return;
        };
        let key = format!("assessment:{}", assessment.transaction_id);
        match serde_json::to_vec(assessment) {
            Ok(bytes) => {
                if let Err(err) = cache.set(&key, bytes, ASSESSMENT_TTL).await {
                    warn!(transaction_id = %assessment.transaction_id, error = %err,
                        "assessment cache write failed");
                }
            }
            Err(err) => {
                warn!(transaction_id = %assessment.transaction_id, error = %err,
                    "assessment serialization failed");
            }
        }
    }

    fn remember_breakdown(&self, transaction_id: &str, breakdown: ComponentBreakdown) {
        let mut cache = self.breakdowns.write().unwrap();
        if cache.entries.insert(transaction_id.to_string(), breakdown).is_none() {
            cache.order.push_back(transaction_id.to_string());
        }
        while cache.order.len() > BREAKDOWN_CAPACITY {
            if let Some(evicted) = cache.order.pop_front() {
                cache.entries.remove(&evicted);
            }
        }
    }

    /// Record analyst feedback for a transaction.
    ///
    /// Per-scorer hit rates accumulate from the remembered breakdowns;
    /// when the engine's configured recalibration trigger fires, ensemble
    /// weights are re-derived from those hit rates.
    pub fn record_feedback(
        &self,
        transaction_id: &str,
        was_actually_fraud: bool,
        feedback_type: &str,
    ) -> Result<()> {
        let breakdown = self
            .breakdowns
            .read()
            .unwrap()
            .entries
            .get(transaction_id)
            .copied();

        if let Some(breakdown) = breakdown {
            let mut hits = self.scorer_hits.write().unwrap();
            for kind in ScorerKind::ALL {
                let score = breakdown.get(*kind);
                // A scorer "hit" when its verdict agreed with the ground truth.
                let agreed = (score >= 0.5) == was_actually_fraud;
                *hits.totals.entry(*kind).or_insert(0) += 1;
                if agreed {
                    *hits.hits.entry(*kind).or_insert(0) += 1;
                }
            }
        }

        let recalibrate =
            self.engine
                .record_feedback(transaction_id, was_actually_fraud, feedback_type);
        if recalibrate {
            let performance = self.scorer_performance();
            if !performance.is_empty() {
                let updated = self.ensemble.update_weights(&performance)?;
                info!(?updated, "ensemble weights recalibrated from feedback");
            }
        }
        Ok(())
    }

    fn scorer_performance(&self) -> HashMap<ScorerKind, f64> {
        let hits = self.scorer_hits.read().unwrap();
        ScorerKind::ALL
            .iter()
            .filter_map(|kind| {
                let total = hits.totals.get(kind).copied().unwrap_or(0);
                if total == 0 {
                    return None;
                }
                let hit = hits.hits.get(kind).copied().unwrap_or(0);
                Some((*kind, hit as f64 / total as f64))
            })
            .collect()
    }

    /// Rolling engine performance snapshot.
    #[must_use]
    pub fn get_performance_metrics(&self) -> PerformanceSnapshot {
        self.engine.get_performance_metrics()
    }

    /// Validate and atomically swap the engine configuration.
    pub fn update_configuration(&self, config: crate::config::EngineConfig) -> Result<()> {
        self.engine.update_configuration(config)
    }

    /// Install or replace a named decision rule.
    pub fn add_decision_rule(&self, rule: crate::decision::DecisionRule) -> Result<()> {
        self.engine.add_decision_rule(rule)
    }

    /// Remove a decision rule by name.
    pub fn remove_decision_rule(&self, name: &str) -> bool {
        self.engine.remove_decision_rule(name)
    }

    /// Spawn the deferred refresh loop for centrality and communities.
    ///
    /// Keeps global graph passes off the per-transaction path; the handle
    /// is aborted by the caller on shutdown.
    #[must_use]
    pub fn spawn_refresh_loop(self: &Arc<Self>) -> JoinHandle<()> {
        let analyzer = Arc::clone(self);
        let interval_secs = analyzer.engine.config().refresh_interval_secs;
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(interval_secs.max(1)));
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                let graph = Arc::clone(&analyzer.graph);
                // Global passes run on the blocking pool, outside any
                // per-transaction latency budget.
                let _ = tokio::task::spawn_blocking(move || {
                    graph.refresh_centrality();
                    graph.refresh_communities();
                })
                .await;
            }
        })
    }
}

/// Locally computed rule-based risk over raw transaction and context.
fn rule_based_score(transaction: &Transaction, context: &TransactionContext) -> f64 {
    let mut score: f64 = 0.0;
    let amount = transaction.amount;

    if amount > 10_000.0 {
        score += 0.3;
    } else if amount > 1_000.0 {
        score += 0.1;
    }
    if amount > 0.0 && amount < 1.0 {
        score += 0.2;
    }

    match context.recent_transactions_1h {
        n if n > 10 => score += 0.4,
        n if n > 5 => score += 0.2,
        _ => {}
    }

    if context.is_new_location {
        score += 0.2;
    }
    if context.user_age_days < 7 && amount > 1_000.0 {
        score += 0.3;
    }

    score.clamp(0.0, 1.0)
}
