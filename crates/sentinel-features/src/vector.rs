//! Fixed-shape feature vector type.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The versioned, fixed feature key set.
///
/// Every extraction produces exactly these keys, whether or not history is
/// available; absent history yields the documented neutral defaults.
pub const FEATURE_NAMES: &[&str] = &[
    // Amount shape
    "amount",
    "amount_log",
    "amount_sqrt",
    "is_round_amount",
    "amount_digits",
    "amount_is_power_of_10",
    "amount_is_very_small",
    "amount_is_very_large",
    // Temporal
    "hour",
    "day_of_week",
    "is_weekend",
    "is_night",
    "is_business_hours",
    "month",
    "day_of_month",
    // History-derived
    "user_avg_amount",
    "user_transaction_count",
    "amount_vs_user_avg",
    "is_new_recipient",
    "unique_recipients",
    "transactions_last_1h",
    "transactions_last_24h",
    "transactions_last_7d",
    "avg_time_between_tx",
    "velocity_score",
];

/// Mapping from feature name to numeric value.
///
/// Keys are fixed per extractor version; iteration order is the canonical
/// `FEATURE_NAMES` order so matrix consumers see stable columns.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FeatureVector {
    values: BTreeMap<String, f64>,
}

impl FeatureVector {
    /// Create an empty vector (used internally by the extractor).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of features in the fixed key set.
    #[must_use]
    pub fn dimension() -> usize {
        FEATURE_NAMES.len()
    }

    /// Set a feature value.
    pub fn insert(&mut self, name: &str, value: f64) {
        self.values.insert(name.to_string(), value);
    }

    /// Get a feature value; missing keys read as 0.0.
    #[must_use]
    pub fn get(&self, name: &str) -> f64 {
        self.values.get(name).copied().unwrap_or(0.0)
    }

    /// Returns true if the vector contains the key.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Number of keys present.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true if no keys are present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterate over (name, value) pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.values.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// The key set, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.values.keys().map(String::as_str).collect()
    }

    /// Values in canonical `FEATURE_NAMES` order.
    #[must_use]
    pub fn to_vector(&self) -> Vec<f64> {
        FEATURE_NAMES.iter().map(|name| self.get(name)).collect()
    }
}
