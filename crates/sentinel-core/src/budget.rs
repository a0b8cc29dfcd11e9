//! Latency-budget validation.
//!
//! Runtime validation of observed latencies against detector targets and
//! the engine-wide budget (100ms at the 99th percentile).

use crate::detector::DetectorMetadata;
use crate::metrics::PerformanceSnapshot;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Result of a budget check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum BudgetResult {
    /// Budget is met.
    Met {
        /// Observed value.
        actual: f64,
        /// Target value.
        target: f64,
        /// Headroom percentage.
        headroom_pct: f64,
    },
    /// Budget is at risk (within tolerance of the target).
    AtRisk {
        /// Observed value.
        actual: f64,
        /// Target value.
        target: f64,
        /// Percentage of target used.
        usage_pct: f64,
    },
    /// Budget is violated.
    Violated {
        /// Observed value.
        actual: f64,
        /// Target value.
        target: f64,
        /// Percentage over target.
        overage_pct: f64,
    },
}

impl BudgetResult {
    /// Returns true if the budget is met.
    #[must_use]
    pub fn is_met(&self) -> bool {
        matches!(self, BudgetResult::Met { .. })
    }

    /// Returns true if the budget is at risk.
    #[must_use]
    pub fn is_at_risk(&self) -> bool {
        matches!(self, BudgetResult::AtRisk { .. })
    }

    /// Returns true if the budget is violated.
    #[must_use]
    pub fn is_violated(&self) -> bool {
        matches!(self, BudgetResult::Violated { .. })
    }
}

/// Latency-budget validator.
#[derive(Debug)]
pub struct BudgetValidator {
    /// Engine-wide p99 budget in milliseconds.
    p99_budget_ms: f64,
    /// Per-detector latency target overrides (microseconds).
    overrides: HashMap<String, f64>,
    /// Tolerance percentage before a miss counts as violated.
    tolerance_pct: f64,
}

impl Default for BudgetValidator {
    fn default() -> Self {
        Self {
            p99_budget_ms: 100.0,
            overrides: HashMap::new(),
            tolerance_pct: 10.0,
        }
    }
}

impl BudgetValidator {
    /// Create a validator with the default 100ms p99 budget.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the engine-wide p99 budget.
    #[must_use]
    pub fn with_p99_budget_ms(mut self, budget_ms: f64) -> Self {
        self.p99_budget_ms = budget_ms;
        self
    }

    /// Override the latency target for one detector.
    #[must_use]
    pub fn with_override(mut self, detector_id: impl Into<String>, target_us: f64) -> Self {
        self.overrides.insert(detector_id.into(), target_us);
        self
    }

    /// Validate an observed latency against a detector's target.
    #[must_use]
    pub fn validate_latency(&self, metadata: &DetectorMetadata, actual_us: f64) -> BudgetResult {
        let target = self
            .overrides
            .get(&metadata.id)
            .copied()
            .unwrap_or(metadata.target_latency_us);
        self.classify(actual_us, target)
    }

    /// Validate the engine-wide p99 budget against a metrics snapshot.
    #[must_use]
    pub fn validate_p99(&self, snapshot: &PerformanceSnapshot) -> BudgetResult {
        self.classify(snapshot.p99_ms, self.p99_budget_ms)
    }

    fn classify(&self, actual: f64, target: f64) -> BudgetResult {
        if actual <= target {
            let headroom = ((target - actual) / target) * 100.0;
            BudgetResult::Met {
                actual,
                target,
                headroom_pct: headroom,
            }
        } else {
            let usage = (actual / target) * 100.0;
            if usage <= 100.0 + self.tolerance_pct {
                BudgetResult::AtRisk {
                    actual,
                    target,
                    usage_pct: usage,
                }
            } else {
                BudgetResult::Violated {
                    actual,
                    target,
                    overage_pct: usage - 100.0,
                }
            }
        }
    }
}
