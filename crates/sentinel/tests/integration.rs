//! Integration tests for Sentinel
//!
//! These tests verify cross-crate workflows: end-to-end analysis through
//! the fraud analyzer, decision ordering, graceful degradation, and the
//! laundering-ring detection path.

use async_trait::async_trait;
use sentinel::prelude::*;
use sentinel_core::error::{Result, SentinelError};
use sentinel_core::types::ComponentScores;
use sentinel_engine::{BatchAssessment, ComponentKind};
use std::sync::Arc;
use std::time::Duration;

// 2025-01-08T14:30:00Z, a Wednesday afternoon.
const BUSINESS_HOURS: u64 = 1_736_346_600;
// 2025-01-08T03:00:00Z, night band.
const NIGHT: u64 = 1_736_305_200;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}

fn transaction(id: &str, sender: &str, recipient: &str, amount: f64, timestamp: u64) -> Transaction {
    Transaction::new(id, sender, recipient, amount, timestamp)
}

fn trained_analyzer() -> Arc<FraudAnalyzer> {
    let ensemble = Arc::new(EnsembleAnomalyDetector::new());
    let training: Vec<Transaction> = (0..80)
        .map(|i| {
            transaction(
                &format!("train_{i}"),
                "wallet_user",
                &format!("wallet_{}", i % 12),
                80.0 + (i % 45) as f64,
                BUSINESS_HOURS - 80 * 600 + i * 600,
            )
        })
        .collect();
    ensemble.train(&training).unwrap();

    Arc::new(FraudAnalyzer::new(
        Arc::new(RealTimeRiskEngine::new()),
        ensemble,
        Arc::new(GraphAnalysisService::new()),
    ))
}

/// Test double for the black-box behavioral model: deviation from the
/// user's typical amount drives the score, the way the real model reacts
/// to out-of-profile spending.
struct ProfileBehavioral {
    typical_amount: f64,
}

#[async_trait]
impl BehavioralScorer for ProfileBehavioral {
    async fn score(&self, _user_id: &str, tx: &Transaction) -> Result<f64> {
        let ratio = tx.amount / self.typical_amount.max(1.0);
        Ok((0.1 + 0.1 * ratio.log10().max(0.0) * 4.0).clamp(0.0, 1.0))
    }
}

struct FailingBehavioral;

#[async_trait]
impl BehavioralScorer for FailingBehavioral {
    async fn score(&self, _user_id: &str, _tx: &Transaction) -> Result<f64> {
        Err(SentinelError::collaborator("behavioral model unreachable"))
    }
}

struct FailingCache;

#[async_trait]
impl CacheStore for FailingCache {
    async fn get(&self, _key: &str) -> Result<Option<Vec<u8>>> {
        Err(SentinelError::collaborator("cache timeout"))
    }
    async fn set(&self, _key: &str, _value: Vec<u8>, _ttl: Duration) -> Result<()> {
        Err(SentinelError::collaborator("cache timeout"))
    }
}

// ============================================================================
// End-to-End Scenarios
// ============================================================================

#[tokio::test]
async fn test_high_risk_transaction_flagged_or_stricter() {
    init_tracing();
    let base = trained_analyzer();

    // Seed cached history: sender averages $100 with previously seen
    // recipients only.
    let cache = Arc::new(MemoryCache::new());
    let history: Vec<Transaction> = (0..10)
        .map(|i| {
            transaction(
                &format!("h_{i}"),
                "wallet_suspect",
                &format!("wallet_{}", i % 3),
                100.0,
                BUSINESS_HOURS - 30 * 86_400 + i * 86_400,
            )
        })
        .collect();
    cache
        .set(
            "user_history:wallet_suspect",
            serde_json::to_vec(&history).unwrap(),
            Duration::from_secs(600),
        )
        .await
        .unwrap();

    let analyzer = Arc::new(
        FraudAnalyzer::new(
            base.engine().clone(),
            base.ensemble().clone(),
            base.graph().clone(),
        )
        .with_cache(cache)
        .with_behavioral(Arc::new(ProfileBehavioral {
            typical_amount: 100.0,
        })),
    );

    // $10,000 at 03:00 to a never-seen recipient, no recent activity.
    let tx = transaction(
        "tx_high",
        "wallet_suspect",
        "wallet_never_seen",
        10_000.0,
        NIGHT,
    );
    let context = UserContext {
        user_age_days: 400,
        recent_transactions_1h: 0,
        is_new_location: false,
    };

    let assessment = analyzer.analyze(&tx, &context).await;

    assert!(
        assessment.overall_risk_score > 0.5,
        "expected > 0.5, got {}",
        assessment.overall_risk_score
    );
    assert!(
        assessment.recommended_action >= TransactionAction::Flag,
        "expected flag or stricter, got {}",
        assessment.recommended_action
    );
}

#[tokio::test]
async fn test_low_risk_transaction_approved() {
    init_tracing();
    let analyzer = trained_analyzer();

    // $25 during business hours to a recipient from the training set.
    let tx = transaction("tx_low", "wallet_user", "wallet_3", 25.0, BUSINESS_HOURS);
    let assessment = analyzer.analyze(&tx, &UserContext::default()).await;

    assert!(
        assessment.overall_risk_score < 0.3,
        "expected < 0.3, got {}",
        assessment.overall_risk_score
    );
    assert_eq!(assessment.recommended_action, TransactionAction::Approve);
}

#[tokio::test]
async fn test_untrained_ensemble_neutral() {
    let ensemble = EnsembleAnomalyDetector::new();
    let tx = transaction("tx_1", "a", "b", 100.0, BUSINESS_HOURS);

    let (score, breakdown) = ensemble.predict_anomaly_score(&tx, &[]);
    assert_eq!(score, 0.5);
    assert_eq!(breakdown.tree_ensemble, 0.5);
    assert_eq!(breakdown.statistical, 0.5);
    assert_eq!(breakdown.rule_based, 0.5);
}

// ============================================================================
// Graceful Degradation
// ============================================================================

#[tokio::test]
async fn test_collaborator_outage_still_yields_complete_assessment() {
    let analyzer = trained_analyzer();
    let analyzer = Arc::new(
        FraudAnalyzer::new(
            analyzer.engine().clone(),
            analyzer.ensemble().clone(),
            analyzer.graph().clone(),
        )
        .with_behavioral(Arc::new(FailingBehavioral))
        .with_cache(Arc::new(FailingCache)),
    );

    let tx = transaction("tx_outage", "wallet_user", "wallet_3", 250.0, BUSINESS_HOURS);
    let assessment = analyzer.analyze(&tx, &UserContext::default()).await;

    assert!((0.0..=1.0).contains(&assessment.overall_risk_score));
    assert_eq!(assessment.component_scores.behavioral, 0.5);
    assert!(assessment
        .risk_factors
        .contains(&"behavioral_fallback".to_string()));
}

// ============================================================================
// Decision Engine Workflows
// ============================================================================

#[test]
fn test_decision_priority_and_fallthrough() {
    let engine = RealTimeRiskEngine::new();
    engine
        .add_decision_rule(DecisionRule {
            name: "graph_hold".to_string(),
            condition: RuleCondition::ComponentAbove {
                component: ComponentKind::Graph,
                threshold: 0.5,
            },
            action: TransactionAction::Hold,
            priority: 95,
            description: "hold on strong network signals".to_string(),
        })
        .unwrap();

    let scores = ComponentScores {
        behavioral: 0.4,
        graph: 0.7,
        anomaly: 0.4,
        rule_based: 0.4,
    };
    let context = sentinel_core::types::TransactionContext::default();

    // Custom rule outranks the default flag band.
    let held = engine.assess_transaction_risk("tx_1", scores, &context);
    assert_eq!(held.recommended_action, TransactionAction::Hold);

    // Removing it falls through to the default flag rule.
    assert!(engine.remove_decision_rule("graph_hold"));
    let flagged = engine.assess_transaction_risk("tx_2", scores, &context);
    assert_eq!(flagged.recommended_action, TransactionAction::Flag);
}

#[test]
fn test_configuration_validation_is_atomic() {
    let engine = RealTimeRiskEngine::new();
    let good = engine.config();

    let mut bad = good;
    bad.score_weights.anomaly = 0.9; // weights no longer sum to 1
    assert!(engine.update_configuration(bad).is_err());
    assert_eq!(engine.config(), good);
}

// ============================================================================
// Graph / Ring Detection
// ============================================================================

#[tokio::test]
async fn test_laundering_ring_scores_above_normal_traffic() {
    let analyzer = trained_analyzer();

    // Ring: A -> B -> C -> D -> A with large, similar amounts.
    let ring = [
        ("launderer_1", "launderer_2", 10_000.0),
        ("launderer_2", "launderer_3", 9_500.0),
        ("launderer_3", "launderer_4", 9_000.0),
        ("launderer_4", "launderer_1", 8_500.0),
    ];
    // Normal traffic among several counterparties.
    let normal = [
        ("user_a", "user_b", 50.0),
        ("user_b", "user_c", 75.0),
        ("user_c", "user_d", 100.0),
        ("user_d", "user_e", 25.0),
        ("user_e", "user_a", 60.0),
    ];

    for (i, (src, dst, amount)) in ring.iter().chain(normal.iter()).enumerate() {
        let tx = transaction(
            &format!("seed_{i}"),
            src,
            dst,
            *amount,
            BUSINESS_HOURS + i as u64 * 60,
        );
        analyzer.analyze(&tx, &UserContext::default()).await;
    }

    // Run the deferred global passes directly.
    analyzer.graph().refresh_centrality();
    analyzer.graph().refresh_communities();

    let networks = analyzer.graph().get_suspicious_networks(0.3);
    assert!(!networks.is_empty(), "ring should surface as suspicious");
    assert!(networks[0]
        .nodes
        .iter()
        .any(|n| n.starts_with("launderer")));

    // Ring members now assess above normal users on the graph component.
    let ring_tx = transaction(
        "tx_ring",
        "launderer_1",
        "launderer_2",
        9_800.0,
        BUSINESS_HOURS + 1_200,
    );
    let ring_assessment = analyzer.analyze(&ring_tx, &UserContext::default()).await;

    let normal_tx = transaction(
        "tx_normal",
        "user_a",
        "user_b",
        55.0,
        BUSINESS_HOURS + 1_200,
    );
    let normal_assessment = analyzer.analyze(&normal_tx, &UserContext::default()).await;

    assert!(
        ring_assessment.component_scores.graph > normal_assessment.component_scores.graph,
        "ring graph {} should exceed normal graph {}",
        ring_assessment.component_scores.graph,
        normal_assessment.component_scores.graph
    );
}

// ============================================================================
// Batch, Metrics, Feedback
// ============================================================================

#[tokio::test]
async fn test_batch_assessment_order_and_bounds() {
    let engine = Arc::new(RealTimeRiskEngine::new());
    let items: Vec<BatchAssessment> = (0..50)
        .map(|i| BatchAssessment {
            transaction_id: format!("batch_{i}"),
            component_scores: ComponentScores {
                behavioral: (i as f64) / 50.0,
                graph: 0.2,
                anomaly: 0.3,
                rule_based: 0.1,
            },
            context: sentinel_core::types::TransactionContext::default(),
        })
        .collect();

    let results = engine.batch_assess_transactions(items).await;
    assert_eq!(results.len(), 50);
    for (i, assessment) in results.iter().enumerate() {
        assert_eq!(assessment.transaction_id, format!("batch_{i}"));
        assert!((0.0..=1.0).contains(&assessment.overall_risk_score));
    }
}

#[tokio::test]
async fn test_performance_metrics_report() {
    let analyzer = trained_analyzer();
    for i in 0..10 {
        let tx = transaction(
            &format!("tx_{i}"),
            "wallet_user",
            "wallet_2",
            100.0,
            BUSINESS_HOURS + i,
        );
        analyzer.analyze(&tx, &UserContext::default()).await;
    }

    let snapshot = analyzer.get_performance_metrics();
    assert_eq!(snapshot.total_assessments, 10);
    assert!(snapshot.p99_ms >= snapshot.median_ms);
    assert!(!snapshot.actions.is_empty());

    // Per-assessment processing sits far inside the 100ms p99 budget.
    let validator = BudgetValidator::new();
    assert!(validator.validate_p99(&snapshot).is_met());
}

#[tokio::test]
async fn test_feedback_recalibrates_ensemble_weights() {
    let mut config = EngineConfig::default();
    config.recalibrate_after = 2;

    let ensemble = Arc::new(EnsembleAnomalyDetector::new());
    let training: Vec<Transaction> = (0..40)
        .map(|i| {
            transaction(
                &format!("train_{i}"),
                "wallet_user",
                &format!("wallet_{}", i % 6),
                90.0 + (i % 30) as f64,
                BUSINESS_HOURS + i * 300,
            )
        })
        .collect();
    ensemble.train(&training).unwrap();

    let analyzer = Arc::new(FraudAnalyzer::new(
        Arc::new(RealTimeRiskEngine::with_config(config)),
        ensemble,
        Arc::new(GraphAnalysisService::new()),
    ));

    let before = analyzer.ensemble().weights();
    for i in 0..3 {
        let tx = transaction(
            &format!("fraud_{i}"),
            "wallet_user",
            "wallet_mule",
            30_000.0,
            NIGHT,
        );
        analyzer.analyze(&tx, &UserContext::default()).await;
        analyzer
            .record_feedback(&format!("fraud_{i}"), true, "fraud_confirmation")
            .unwrap();
    }

    let after = analyzer.ensemble().weights();
    assert!((after.sum() - 1.0).abs() < 1e-6);
    assert_ne!(before, after);
}
