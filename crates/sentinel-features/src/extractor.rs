//! Transaction feature extraction.

use crate::vector::FeatureVector;
use chrono::{DateTime, Datelike, Timelike};
use sentinel_core::detector::{Detector, DetectorMetadata};
use sentinel_core::domain::Domain;
use sentinel_core::types::Transaction;
use std::collections::HashSet;

/// Amounts below this are treated as micro payments.
const VERY_SMALL_AMOUNT: f64 = 1.0;
/// Amounts above this are treated as very large.
const VERY_LARGE_AMOUNT: f64 = 10_000.0;
/// Night band: hours 0..=5.
const NIGHT_END_HOUR: u32 = 5;
/// Business hours band: 9..18.
const BUSINESS_START_HOUR: u32 = 9;
const BUSINESS_END_HOUR: u32 = 18;

/// Deterministic transaction feature extractor.
///
/// Identical `(transaction, history)` input yields identical output: the
/// only time source is the transaction's own timestamp, and history order
/// does not matter (it is normalized internally).
#[derive(Debug, Clone)]
pub struct FeatureExtractor {
    metadata: DetectorMetadata,
}

impl FeatureExtractor {
    /// Feature-set version; bump when `FEATURE_NAMES` changes.
    pub const VERSION: u32 = 1;

    /// Create a new extractor.
    #[must_use]
    pub fn new() -> Self {
        Self {
            metadata: DetectorMetadata::inline("features/transaction", Domain::Features)
                .with_description("Fixed-shape transaction feature extraction")
                .with_throughput(500_000)
                .with_latency_us(10.0)
                .with_version(Self::VERSION),
        }
    }

    /// Extract the feature vector for a transaction.
    ///
    /// `history` holds prior transactions of the same sender, in any
    /// chronological order. An empty history yields the documented neutral
    /// defaults under the same key set.
    #[must_use]
    pub fn extract(&self, transaction: &Transaction, history: &[Transaction]) -> FeatureVector {
        let mut features = FeatureVector::new();
        Self::amount_features(&mut features, transaction.amount);
        Self::temporal_features(&mut features, transaction.timestamp);
        Self::history_features(&mut features, transaction, history);
        features
    }

    fn amount_features(features: &mut FeatureVector, amount: f64) {
        features.insert("amount", amount);
        features.insert("amount_log", amount.max(0.0).ln_1p());
        features.insert("amount_sqrt", amount.max(0.0).sqrt());
        features.insert(
            "is_round_amount",
            flag(amount >= 100.0 && (amount % 100.0).abs() < 1e-9),
        );
        features.insert("amount_digits", integer_digits(amount) as f64);
        features.insert("amount_is_power_of_10", flag(is_power_of_10(amount)));
        features.insert(
            "amount_is_very_small",
            flag(amount > 0.0 && amount < VERY_SMALL_AMOUNT),
        );
        features.insert("amount_is_very_large", flag(amount >= VERY_LARGE_AMOUNT));
    }

    fn temporal_features(features: &mut FeatureVector, timestamp: u64) {
        let datetime = DateTime::from_timestamp(timestamp as i64, 0)
            .unwrap_or(DateTime::UNIX_EPOCH);
        let hour = datetime.hour();
        let day_of_week = datetime.weekday().num_days_from_monday();

        features.insert("hour", hour as f64);
        features.insert("day_of_week", day_of_week as f64);
        features.insert("is_weekend", flag(day_of_week >= 5));
        features.insert("is_night", flag(hour <= NIGHT_END_HOUR));
        features.insert(
            "is_business_hours",
            flag((BUSINESS_START_HOUR..BUSINESS_END_HOUR).contains(&hour)),
        );
        features.insert("month", datetime.month() as f64);
        features.insert("day_of_month", datetime.day() as f64);
    }

    fn history_features(
        features: &mut FeatureVector,
        transaction: &Transaction,
        history: &[Transaction],
    ) {
        if history.is_empty() {
            features.insert("user_avg_amount", 0.0);
            features.insert("user_transaction_count", 0.0);
            features.insert("amount_vs_user_avg", 1.0);
            features.insert("is_new_recipient", 1.0);
            features.insert("unique_recipients", 0.0);
            features.insert("transactions_last_1h", 0.0);
            features.insert("transactions_last_24h", 0.0);
            features.insert("transactions_last_7d", 0.0);
            features.insert("avg_time_between_tx", 0.0);
            features.insert("velocity_score", 0.0);
            return;
        }

        let count = history.len() as f64;
        let avg_amount = history.iter().map(|tx| tx.amount).sum::<f64>() / count;
        features.insert("user_avg_amount", avg_amount);
        features.insert("user_transaction_count", count);
        features.insert(
            "amount_vs_user_avg",
            if avg_amount > f64::EPSILON {
                transaction.amount / avg_amount
            } else {
                1.0
            },
        );

        let recipients: HashSet<&str> =
            history.iter().map(|tx| tx.recipient.as_str()).collect();
        features.insert(
            "is_new_recipient",
            flag(!recipients.contains(transaction.recipient.as_str())),
        );
        features.insert("unique_recipients", recipients.len() as f64);

        let now = transaction.timestamp;
        features.insert("transactions_last_1h", count_within(history, now, 3_600));
        features.insert("transactions_last_24h", count_within(history, now, 86_400));
        features.insert(
            "transactions_last_7d",
            count_within(history, now, 7 * 86_400),
        );

        let avg_gap_hours = average_gap_hours(transaction, history);
        features.insert("avg_time_between_tx", avg_gap_hours);
        features.insert("velocity_score", velocity_score(avg_gap_hours));
    }
}

impl Default for FeatureExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl Detector for FeatureExtractor {
    fn metadata(&self) -> &DetectorMetadata {
        &self.metadata
    }
}

fn flag(condition: bool) -> f64 {
    if condition {
        1.0
    } else {
        0.0
    }
}

/// Digit count of the integer part (100.50 -> 3; 0.25 -> 1).
fn integer_digits(amount: f64) -> u32 {
    let mut n = amount.abs().trunc() as u64;
    let mut digits = 1;
    while n >= 10 {
        n /= 10;
        digits += 1;
    }
    digits
}

fn is_power_of_10(amount: f64) -> bool {
    if amount <= 0.0 {
        return false;
    }
    let log = amount.log10();
    (log - log.round()).abs() < 1e-9
}

fn count_within(history: &[Transaction], now: u64, window_secs: u64) -> f64 {
    history
        .iter()
        .filter(|tx| now.saturating_sub(tx.timestamp) < window_secs)
        .count() as f64
}

/// Mean gap in hours over the chronologically sorted history plus the
/// current transaction. Fewer than two points yields 0.0.
fn average_gap_hours(transaction: &Transaction, history: &[Transaction]) -> f64 {
    let mut timestamps: Vec<u64> = history.iter().map(|tx| tx.timestamp).collect();
    timestamps.push(transaction.timestamp);
    timestamps.sort_unstable();

    if timestamps.len() < 2 {
        return 0.0;
    }

    let total_gap: u64 = timestamps
        .windows(2)
        .map(|pair| pair[1] - pair[0])
        .sum();
    let gaps = (timestamps.len() - 1) as f64;
    (total_gap as f64 / gaps) / 3_600.0
}

/// Velocity in [0,1]: 1.0 for back-to-back transactions, approaching 0 as
/// gaps grow. Monotone non-increasing in the mean gap.
fn velocity_score(avg_gap_hours: f64) -> f64 {
    if avg_gap_hours <= 0.0 {
        return 0.0;
    }
    (1.0 / (1.0 + avg_gap_hours)).clamp(0.0, 1.0)
}
