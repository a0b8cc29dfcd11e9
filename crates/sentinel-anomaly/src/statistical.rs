//! Statistical anomaly detector.
//!
//! Learns per-feature robust statistics (mean, median, standard deviation)
//! from a training batch and scores a feature vector by its aggregate
//! normalized deviation from the learned distribution.

use sentinel_core::detector::{Detector, DetectorMetadata};
use sentinel_core::domain::Domain;
use sentinel_core::error::{Result, SentinelError};
use sentinel_features::FeatureVector;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Absolute z-scores are capped here before averaging into [0,1].
const Z_CAP: f64 = 3.0;

/// Per-feature training statistics.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureStats {
    /// Sample mean.
    pub mean: f64,
    /// Sample median.
    pub median: f64,
    /// Sample standard deviation.
    pub std_dev: f64,
}

/// Summary returned by statistical training.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsSummary {
    /// Number of features with fitted statistics.
    pub features_analyzed: usize,
    /// Number of training samples used.
    pub samples_used: usize,
}

/// Statistical anomaly detector.
#[derive(Debug, Clone)]
pub struct StatisticalDetector {
    metadata: DetectorMetadata,
    stats: HashMap<String, FeatureStats>,
    trained: bool,
}

impl StatisticalDetector {
    /// Create an untrained detector.
    #[must_use]
    pub fn new() -> Self {
        Self {
            metadata: DetectorMetadata::inline("anomaly/statistical", Domain::Anomaly)
                .with_description("Per-feature robust deviation scoring")
                .with_throughput(200_000)
                .with_latency_us(20.0),
            stats: HashMap::new(),
            trained: false,
        }
    }

    /// Returns true once `train` has completed.
    #[must_use]
    pub fn is_trained(&self) -> bool {
        self.trained
    }

    /// Fitted statistics for one feature, if present.
    #[must_use]
    pub fn feature_stats(&self, name: &str) -> Option<&FeatureStats> {
        self.stats.get(name)
    }

    /// Fit per-feature statistics over a training batch.
    pub fn train(&mut self, samples: &[FeatureVector]) -> Result<StatsSummary> {
        if samples.is_empty() {
            return Err(SentinelError::validation(
                "statistical training requires at least one sample",
            ));
        }

        let mut by_feature: HashMap<String, Vec<f64>> = HashMap::new();
        for sample in samples {
            for (name, value) in sample.iter() {
                if value.is_finite() {
                    by_feature.entry(name.to_string()).or_default().push(value);
                }
            }
        }

        self.stats = by_feature
            .into_iter()
            .map(|(name, values)| (name, fit(&values)))
            .collect();
        self.trained = true;

        Ok(StatsSummary {
            features_analyzed: self.stats.len(),
            samples_used: samples.len(),
        })
    }

    /// Score deviation from the learned distribution, in [0,1].
    ///
    /// Untrained detectors return the neutral 0.5.
    #[must_use]
    pub fn score(&self, features: &FeatureVector) -> f64 {
        if !self.trained || self.stats.is_empty() {
            return 0.5;
        }

        let mut total = 0.0;
        let mut counted = 0usize;
        for (name, value) in features.iter() {
            let Some(stats) = self.stats.get(name) else {
                continue;
            };
            if !value.is_finite() {
                continue;
            }
            let z = if stats.std_dev > f64::EPSILON {
                (value - stats.mean).abs() / stats.std_dev
            } else if (value - stats.mean).abs() > f64::EPSILON {
                Z_CAP
            } else {
                0.0
            };
            total += (z / Z_CAP).min(1.0);
            counted += 1;
        }

        if counted == 0 {
            return 0.5;
        }
        (total / counted as f64).clamp(0.0, 1.0)
    }
}

impl Default for StatisticalDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl Detector for StatisticalDetector {
    fn metadata(&self) -> &DetectorMetadata {
        &self.metadata
    }
}

fn fit(values: &[f64]) -> FeatureStats {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let median = if sorted.len() % 2 == 0 {
        (sorted[sorted.len() / 2 - 1] + sorted[sorted.len() / 2]) / 2.0
    } else {
        sorted[sorted.len() / 2]
    };

    FeatureStats {
        mean,
        median,
        std_dev: variance.sqrt(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(pairs: &[(&str, f64)]) -> FeatureVector {
        let mut fv = FeatureVector::new();
        for (name, value) in pairs {
            fv.insert(name, *value);
        }
        fv
    }

    #[test]
    fn test_untrained_neutral() {
        let detector = StatisticalDetector::new();
        assert_eq!(detector.score(&sample(&[("amount", 5.0)])), 0.5);
    }

    #[test]
    fn test_training_statistics() {
        let mut detector = StatisticalDetector::new();
        let samples = vec![
            sample(&[("f1", 1.0), ("f2", 2.0)]),
            sample(&[("f1", 2.0), ("f2", 3.0)]),
            sample(&[("f1", 3.0), ("f2", 4.0)]),
            sample(&[("f1", 1.5), ("f2", 2.5)]),
        ];

        let summary = detector.train(&samples).unwrap();
        assert_eq!(summary.features_analyzed, 2);
        assert_eq!(summary.samples_used, 4);

        let stats = detector.feature_stats("f1").unwrap();
        assert!((stats.mean - 1.875).abs() < 1e-9);
        assert!((stats.median - 1.75).abs() < 1e-9);
    }

    #[test]
    fn test_deviation_ordering() {
        let mut detector = StatisticalDetector::new();
        let samples: Vec<FeatureVector> = (1..=10)
            .map(|i| sample(&[("f1", i as f64), ("f2", 2.0 * i as f64)]))
            .collect();
        detector.train(&samples).unwrap();

        let normal = detector.score(&sample(&[("f1", 5.0), ("f2", 10.0)]));
        let anomalous = detector.score(&sample(&[("f1", 100.0), ("f2", 200.0)]));

        assert!((0.0..=1.0).contains(&normal));
        assert!((0.0..=1.0).contains(&anomalous));
        assert!(anomalous > normal);
    }

    #[test]
    fn test_empty_training_rejected() {
        let mut detector = StatisticalDetector::new();
        assert!(detector.train(&[]).is_err());
        assert!(!detector.is_trained());
    }

    #[test]
    fn test_constant_feature() {
        let mut detector = StatisticalDetector::new();
        let samples: Vec<FeatureVector> = (0..5).map(|_| sample(&[("f1", 7.0)])).collect();
        detector.train(&samples).unwrap();

        // Exact match on a constant feature is not anomalous.
        assert_eq!(detector.score(&sample(&[("f1", 7.0)])), 0.0);
        // Any deviation from a constant feature is maximally anomalous.
        assert_eq!(detector.score(&sample(&[("f1", 9.0)])), 1.0);
    }
}
