//! Decision engine.
//!
//! Evaluates a risk assessment against an ordered rule set to select an
//! enforcement action. Built-in defaults combine with user rules; rules
//! evaluate in priority order (higher first, ties by insertion order) and
//! the first match wins, falling through to `Approve`.

use sentinel_core::error::{Result, SentinelError};
use sentinel_core::types::{ComponentScores, TransactionAction, TransactionContext};
use serde::{Deserialize, Serialize};
use std::sync::RwLock;
use tracing::info;

/// One component of the fused score, addressable from rule conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentKind {
    /// Behavioral model score.
    Behavioral,
    /// Graph network score.
    Graph,
    /// Anomaly ensemble score.
    Anomaly,
    /// Rule-based heuristic score.
    RuleBased,
}

impl ComponentKind {
    fn value(&self, scores: &ComponentScores) -> f64 {
        match self {
            ComponentKind::Behavioral => scores.behavioral,
            ComponentKind::Graph => scores.graph,
            ComponentKind::Anomaly => scores.anomaly,
            ComponentKind::RuleBased => scores.rule_based,
        }
    }
}

/// Closed predicate AST over a risk assessment and its context.
///
/// A fixed, serializable condition language rather than open-ended
/// predicate dispatch, so submitted rules can be validated synchronously.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleCondition {
    /// Overall risk score strictly above the threshold.
    ScoreAbove(f64),
    /// Confidence strictly below the threshold.
    ConfidenceBelow(f64),
    /// A single component strictly above the threshold.
    ComponentAbove {
        /// Component to inspect.
        component: ComponentKind,
        /// Threshold in [0,1].
        threshold: f64,
    },
    /// Transaction amount strictly above the threshold.
    AmountAbove(f64),
    /// Transactions in the last hour strictly above the count.
    RecentTransactionsAbove(u32),
    /// Transaction originates from a new location.
    NewLocation,
    /// Account younger than the given number of days.
    UserAgeBelowDays(u32),
    /// All sub-conditions hold.
    All(Vec<RuleCondition>),
    /// At least one sub-condition holds.
    Any(Vec<RuleCondition>),
}

impl RuleCondition {
    /// Validate thresholds; malformed conditions are rejected on submit.
    pub fn validate(&self) -> Result<()> {
        match self {
            RuleCondition::ScoreAbove(t)
            | RuleCondition::ConfidenceBelow(t)
            | RuleCondition::ComponentAbove { threshold: t, .. } => {
                if !t.is_finite() || !(0.0..=1.0).contains(t) {
                    return Err(SentinelError::config(format!(
                        "score threshold must lie in [0,1], got {t}"
                    )));
                }
            }
            RuleCondition::AmountAbove(t) => {
                if !t.is_finite() || *t < 0.0 {
                    return Err(SentinelError::config(format!(
                        "amount threshold must be non-negative, got {t}"
                    )));
                }
            }
            RuleCondition::RecentTransactionsAbove(_)
            | RuleCondition::NewLocation
            | RuleCondition::UserAgeBelowDays(_) => {}
            RuleCondition::All(inner) | RuleCondition::Any(inner) => {
                if inner.is_empty() {
                    return Err(SentinelError::config(
                        "combinator conditions require at least one sub-condition",
                    ));
                }
                for condition in inner {
                    condition.validate()?;
                }
            }
        }
        Ok(())
    }

    fn evaluate(&self, input: &DecisionInput<'_>) -> bool {
        match self {
            RuleCondition::ScoreAbove(t) => input.overall_risk_score > *t,
            RuleCondition::ConfidenceBelow(t) => input.confidence < *t,
            RuleCondition::ComponentAbove {
                component,
                threshold,
            } => component.value(input.components) > *threshold,
            RuleCondition::AmountAbove(t) => input.context.amount > *t,
            RuleCondition::RecentTransactionsAbove(count) => {
                input.context.recent_transactions_1h > *count
            }
            RuleCondition::NewLocation => input.context.is_new_location,
            RuleCondition::UserAgeBelowDays(days) => input.context.user_age_days < *days,
            RuleCondition::All(inner) => inner.iter().all(|c| c.evaluate(input)),
            RuleCondition::Any(inner) => inner.iter().any(|c| c.evaluate(input)),
        }
    }
}

/// A named, prioritized decision rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionRule {
    /// Unique rule name; adding an existing name replaces the rule.
    pub name: String,
    /// Match condition.
    pub condition: RuleCondition,
    /// Action taken when the rule matches first.
    pub action: TransactionAction,
    /// Evaluation priority; higher evaluates first.
    pub priority: i32,
    /// Human-readable description.
    pub description: String,
}

/// Inputs a rule condition evaluates against.
#[derive(Debug, Clone, Copy)]
pub struct DecisionInput<'a> {
    /// Overall fused risk score.
    pub overall_risk_score: f64,
    /// Agreement confidence.
    pub confidence: f64,
    /// Component scores.
    pub components: &'a ComponentScores,
    /// Transaction context.
    pub context: &'a TransactionContext,
}

#[derive(Debug, Default)]
struct RuleSet {
    /// Kept sorted by priority descending; stable sort preserves insertion
    /// order among equal priorities.
    rules: Vec<DecisionRule>,
}

/// Decision engine with a runtime-mutable rule set.
#[derive(Debug)]
pub struct DecisionEngine {
    rules: RwLock<RuleSet>,
}

impl DecisionEngine {
    /// Create an engine seeded with the built-in default rules.
    #[must_use]
    pub fn new() -> Self {
        let engine = Self {
            rules: RwLock::new(RuleSet::default()),
        };
        for rule in Self::default_rules() {
            // Built-ins are valid by construction.
            let _ = engine.add_custom_rule(rule);
        }
        engine
    }

    /// Built-in default rules.
    #[must_use]
    pub fn default_rules() -> Vec<DecisionRule> {
        vec![
            DecisionRule {
                name: "default_block".to_string(),
                condition: RuleCondition::ScoreAbove(0.9),
                action: TransactionAction::Block,
                priority: 100,
                description: "Block when the overall risk score exceeds 0.9".to_string(),
            },
            DecisionRule {
                name: "default_hold".to_string(),
                condition: RuleCondition::ScoreAbove(0.7),
                action: TransactionAction::Hold,
                priority: 90,
                description: "Hold when the overall risk score exceeds 0.7".to_string(),
            },
            DecisionRule {
                name: "default_flag".to_string(),
                condition: RuleCondition::ScoreAbove(0.4),
                action: TransactionAction::Flag,
                priority: 80,
                description: "Flag when the overall risk score exceeds 0.4".to_string(),
            },
        ]
    }

    /// Number of installed rules.
    #[must_use]
    pub fn rule_count(&self) -> usize {
        self.rules.read().unwrap().rules.len()
    }

    /// Names of installed rules in evaluation order.
    #[must_use]
    pub fn rule_names(&self) -> Vec<String> {
        self.rules
            .read()
            .unwrap()
            .rules
            .iter()
            .map(|r| r.name.clone())
            .collect()
    }

    /// Add (or replace, on name collision) a rule.
    ///
    /// The condition is validated first; a rejected rule leaves the
    /// existing set untouched.
    pub fn add_custom_rule(&self, rule: DecisionRule) -> Result<()> {
        if rule.name.is_empty() {
            return Err(SentinelError::config("rule name must not be empty"));
        }
        rule.condition.validate()?;

        let mut set = self.rules.write().unwrap();
        set.rules.retain(|existing| existing.name != rule.name);
        set.rules.push(rule);
        // Stable sort: equal priorities keep insertion order.
        set.rules.sort_by_key(|r| std::cmp::Reverse(r.priority));
        Ok(())
    }

    /// Remove a rule by name; returns true if one was removed.
    pub fn remove_decision_rule(&self, name: &str) -> bool {
        let mut set = self.rules.write().unwrap();
        let before = set.rules.len();
        set.rules.retain(|rule| rule.name != name);
        let removed = set.rules.len() < before;
        if removed {
            info!(rule = name, "decision rule removed");
        }
        removed
    }

    /// Evaluate rules in priority order; the first match decides.
    ///
    /// No match falls through to the safe default, `Approve`.
    #[must_use]
    pub fn make_decision(&self, input: &DecisionInput<'_>) -> TransactionAction {
        let set = self.rules.read().unwrap();
        for rule in &set.rules {
            if rule.condition.evaluate(input) {
                return rule.action;
            }
        }
        TransactionAction::Approve
    }
}

impl Default for DecisionEngine {
    fn default() -> Self {
        Self::new()
    }
}
