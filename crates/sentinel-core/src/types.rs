//! Shared transaction and assessment types.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

// ============================================================================
// Transaction Types
// ============================================================================

/// A financial transaction submitted for risk analysis.
///
/// Created by the caller and never mutated inside the core. The transport
/// layer validates fields (non-negative amount, well-formed wallet ids)
/// before a transaction reaches this crate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// Transaction ID.
    pub id: String,
    /// Sender wallet ID.
    pub sender: String,
    /// Recipient wallet ID.
    pub recipient: String,
    /// Transaction amount (non-negative).
    pub amount: f64,
    /// Currency code.
    pub currency: String,
    /// Timestamp (Unix epoch seconds, UTC).
    pub timestamp: u64,
    /// Optional caller-supplied metadata.
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl Transaction {
    /// Create a new transaction.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        sender: impl Into<String>,
        recipient: impl Into<String>,
        amount: f64,
        timestamp: u64,
    ) -> Self {
        Self {
            id: id.into(),
            sender: sender.into(),
            recipient: recipient.into(),
            amount,
            currency: "USD".to_string(),
            timestamp,
            metadata: HashMap::new(),
        }
    }

    /// Set the currency.
    #[must_use]
    pub fn with_currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = currency.into();
        self
    }

    /// Attach a metadata entry.
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// Caller-supplied context about the sending user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionContext {
    /// Transaction amount.
    pub amount: f64,
    /// Sending user / wallet ID.
    pub user_id: String,
    /// Account age in days.
    pub user_age_days: u32,
    /// Transactions observed in the last hour.
    pub recent_transactions_1h: u32,
    /// Whether the transaction originates from a new location.
    pub is_new_location: bool,
    /// Currency code.
    pub currency: String,
}

impl Default for TransactionContext {
    fn default() -> Self {
        Self {
            amount: 0.0,
            user_id: String::new(),
            user_age_days: 365,
            recent_transactions_1h: 0,
            is_new_location: false,
            currency: "USD".to_string(),
        }
    }
}

// ============================================================================
// Score Types
// ============================================================================

/// Per-model risk estimates feeding the ensemble calculator.
///
/// Each score is independently defaulted when its source is unavailable;
/// `rule_based` is computed locally and never defaulted to failure.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ComponentScores {
    /// Behavioral model score.
    pub behavioral: f64,
    /// Transaction-graph network score.
    pub graph: f64,
    /// Ensemble anomaly score.
    pub anomaly: f64,
    /// Rule-based heuristic score.
    pub rule_based: f64,
}

impl ComponentScores {
    /// Fallback for an unavailable behavioral scorer.
    pub const BEHAVIORAL_DEFAULT: f64 = 0.5;
    /// Fallback for an unavailable graph service.
    pub const GRAPH_DEFAULT: f64 = 0.1;
    /// Fallback for an unavailable anomaly ensemble.
    pub const ANOMALY_DEFAULT: f64 = 0.15;

    /// Component scores with every source defaulted.
    #[must_use]
    pub fn neutral() -> Self {
        Self {
            behavioral: Self::BEHAVIORAL_DEFAULT,
            graph: Self::GRAPH_DEFAULT,
            anomaly: Self::ANOMALY_DEFAULT,
            rule_based: 0.0,
        }
    }

    /// Component values paired with their names, in fixed order.
    #[must_use]
    pub fn named(&self) -> [(&'static str, f64); 4] {
        [
            ("behavioral", self.behavioral),
            ("graph", self.graph),
            ("anomaly", self.anomaly),
            ("rule_based", self.rule_based),
        ]
    }
}

// ============================================================================
// Assessment Types
// ============================================================================

/// Risk level classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    /// Low risk - normal processing.
    Low,
    /// Medium risk - flag for review.
    Medium,
    /// High risk - hold for investigation.
    High,
    /// Critical - block immediately.
    Critical,
}

impl RiskLevel {
    /// Returns the level name as a string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
            RiskLevel::Critical => "critical",
        }
    }
}

impl From<f64> for RiskLevel {
    fn from(score: f64) -> Self {
        match score {
            s if s >= 0.8 => RiskLevel::Critical,
            s if s >= 0.6 => RiskLevel::High,
            s if s >= 0.4 => RiskLevel::Medium,
            _ => RiskLevel::Low,
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Enforcement action recommended for a transaction.
///
/// Ordered by strictness: `Approve < Flag < Hold < Block`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionAction {
    /// Allow the transaction.
    Approve,
    /// Allow but flag for review.
    Flag,
    /// Hold pending investigation.
    Hold,
    /// Block the transaction.
    Block,
}

impl TransactionAction {
    /// Returns the action name as a string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            TransactionAction::Approve => "approve",
            TransactionAction::Flag => "flag",
            TransactionAction::Hold => "hold",
            TransactionAction::Block => "block",
        }
    }
}

impl fmt::Display for TransactionAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Result of a single transaction risk assessment.
///
/// Created once per transaction and immutable after construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    /// Transaction ID the assessment belongs to.
    pub transaction_id: String,
    /// Overall fused risk score in [0,1].
    pub overall_risk_score: f64,
    /// Agreement-based confidence in [0,1].
    pub confidence: f64,
    /// Risk level derived from the overall score.
    pub risk_level: RiskLevel,
    /// Recommended enforcement action.
    pub recommended_action: TransactionAction,
    /// Human-readable risk factors, ordered, deduplicated.
    pub risk_factors: Vec<String>,
    /// Component scores that produced the overall score.
    pub component_scores: ComponentScores,
    /// Wall-clock processing time in milliseconds.
    pub processing_time_ms: f64,
}

impl RiskAssessment {
    /// Fully-neutral assessment used when every component fell back.
    ///
    /// The attached `degraded_assessment` factor signals the fallback to
    /// downstream consumers; a transaction is never blocked on an
    /// analysis-internal fault.
    #[must_use]
    pub fn degraded(transaction_id: impl Into<String>) -> Self {
        let scores = ComponentScores::neutral();
        Self {
            transaction_id: transaction_id.into(),
            overall_risk_score: 0.0,
            confidence: 0.0,
            risk_level: RiskLevel::Low,
            recommended_action: TransactionAction::Approve,
            risk_factors: vec!["degraded_assessment".to_string()],
            component_scores: scores,
            processing_time_ms: 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_risk_level_thresholds() {
        assert_eq!(RiskLevel::from(0.1), RiskLevel::Low);
        assert_eq!(RiskLevel::from(0.4), RiskLevel::Medium);
        assert_eq!(RiskLevel::from(0.6), RiskLevel::High);
        assert_eq!(RiskLevel::from(0.85), RiskLevel::Critical);
    }

    #[test]
    fn test_action_strictness_ordering() {
        assert!(TransactionAction::Block > TransactionAction::Hold);
        assert!(TransactionAction::Hold > TransactionAction::Flag);
        assert!(TransactionAction::Flag > TransactionAction::Approve);
    }

    #[test]
    fn test_neutral_component_scores() {
        let scores = ComponentScores::neutral();
        assert_eq!(scores.behavioral, 0.5);
        assert_eq!(scores.graph, 0.1);
        assert_eq!(scores.anomaly, 0.15);
        assert_eq!(scores.rule_based, 0.0);
    }

    #[test]
    fn test_degraded_assessment_is_safe() {
        let assessment = RiskAssessment::degraded("tx_1");
        assert_eq!(assessment.recommended_action, TransactionAction::Approve);
        assert!(assessment
            .risk_factors
            .contains(&"degraded_assessment".to_string()));
    }

    #[test]
    fn test_transaction_builder() {
        let tx = Transaction::new("tx_1", "wallet_a", "wallet_b", 125.0, 1_736_294_400)
            .with_currency("EUR")
            .with_metadata("category", "payment");

        assert_eq!(tx.currency, "EUR");
        assert_eq!(tx.metadata.get("category").map(String::as_str), Some("payment"));
    }
}
