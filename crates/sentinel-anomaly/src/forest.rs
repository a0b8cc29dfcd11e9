//! Isolation forest anomaly scorer.
//!
//! Implements the trained tree-ensemble contract consumed by the ensemble
//! detector: anomalous points isolate in fewer random splits, so short
//! average path lengths map to scores near 1.0 via `2^(-E(h)/c(n))`.
//! Model persistence is handled offline and is out of scope here.

use crate::matrix::DataMatrix;
use rand::prelude::*;
use rand::rngs::StdRng;
use sentinel_core::detector::{Detector, DetectorMetadata};
use sentinel_core::domain::Domain;
use sentinel_core::error::{Result, SentinelError};
use sentinel_features::FeatureVector;
use serde::{Deserialize, Serialize};

/// Euler-Mascheroni constant, used in the average path-length correction.
const EULER_GAMMA: f64 = 0.577_215_664_9;

/// Trained tree-ensemble scorer contract.
///
/// The in-memory interface the ensemble depends on; implementations are
/// swappable and retrained offline.
pub trait TreeEnsembleScorer: Send + Sync {
    /// Fit the model over a training matrix.
    fn train(&mut self, data: &DataMatrix, feature_names: &[String]) -> Result<ForestSummary>;

    /// Score a feature vector, in [0,1]. Untrained models return 0.5.
    fn score(&self, features: &FeatureVector) -> f64;

    /// Returns true once `train` has completed.
    fn is_trained(&self) -> bool;
}

/// Isolation forest configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForestConfig {
    /// Number of trees in the forest.
    pub n_trees: usize,
    /// Maximum samples per tree.
    pub sample_size: usize,
    /// Expected proportion of anomalies, used to place the threshold.
    pub contamination: f64,
    /// RNG seed for reproducible splits.
    pub seed: u64,
}

impl Default for ForestConfig {
    fn default() -> Self {
        Self {
            n_trees: 100,
            sample_size: 256,
            contamination: 0.1,
            seed: 42,
        }
    }
}

/// Summary returned by forest training.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForestSummary {
    /// Number of training samples.
    pub samples_trained: usize,
    /// Number of feature columns.
    pub features_count: usize,
    /// Training samples scoring at or above the threshold.
    pub anomalies_detected: usize,
    /// Score threshold derived from the contamination rate.
    pub threshold: f64,
}

#[derive(Debug, Clone)]
enum Node {
    Internal {
        split_feature: usize,
        split_value: f64,
        left: Box<Node>,
        right: Box<Node>,
    },
    External {
        size: usize,
    },
}

#[derive(Debug, Clone)]
struct IsolationTree {
    root: Node,
}

impl IsolationTree {
    fn build(samples: &[&[f64]], max_depth: usize, rng: &mut StdRng) -> Self {
        Self {
            root: Self::build_node(samples, 0, max_depth, rng),
        }
    }

    fn build_node(samples: &[&[f64]], depth: usize, max_depth: usize, rng: &mut StdRng) -> Node {
        if samples.len() <= 1 || depth >= max_depth {
            return Node::External {
                size: samples.len(),
            };
        }

        let n_features = samples[0].len();
        if n_features == 0 {
            return Node::External {
                size: samples.len(),
            };
        }

        let feature = rng.random_range(0..n_features);
        let values: Vec<f64> = samples.iter().map(|s| s[feature]).collect();
        let min_val = values.iter().cloned().fold(f64::INFINITY, f64::min);
        let max_val = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);

        if (max_val - min_val).abs() < 1e-10 {
            return Node::External {
                size: samples.len(),
            };
        }

        let split_value = rng.random_range(min_val..max_val);
        let (left, right): (Vec<&[f64]>, Vec<&[f64]>) =
            samples.iter().partition(|s| s[feature] < split_value);

        Node::Internal {
            split_feature: feature,
            split_value,
            left: Box::new(Self::build_node(&left, depth + 1, max_depth, rng)),
            right: Box::new(Self::build_node(&right, depth + 1, max_depth, rng)),
        }
    }

    fn path_length(&self, point: &[f64]) -> f64 {
        let mut node = &self.root;
        let mut depth = 0.0;
        loop {
            match node {
                Node::External { size } => return depth + c_factor(*size),
                Node::Internal {
                    split_feature,
                    split_value,
                    left,
                    right,
                } => {
                    node = if point[*split_feature] < *split_value {
                        left
                    } else {
                        right
                    };
                    depth += 1.0;
                }
            }
        }
    }
}

/// Average unsuccessful-search path length in a BST of `n` points.
fn c_factor(n: usize) -> f64 {
    if n <= 1 {
        0.0
    } else if n == 2 {
        1.0
    } else {
        let n_f = n as f64;
        2.0 * ((n_f - 1.0).ln() + EULER_GAMMA) - 2.0 * (n_f - 1.0) / n_f
    }
}

/// Isolation forest anomaly scorer.
#[derive(Debug, Clone)]
pub struct IsolationForest {
    metadata: DetectorMetadata,
    config: ForestConfig,
    trees: Vec<IsolationTree>,
    feature_names: Vec<String>,
    effective_sample_size: usize,
    threshold: f64,
    trained: bool,
}

impl IsolationForest {
    /// Create an untrained forest with the given configuration.
    #[must_use]
    pub fn new(config: ForestConfig) -> Self {
        Self {
            metadata: DetectorMetadata::inline("anomaly/isolation-forest", Domain::Anomaly)
                .with_description("Isolation forest tree-ensemble scoring")
                .with_throughput(50_000)
                .with_latency_us(100.0),
            config,
            trees: Vec::new(),
            feature_names: Vec::new(),
            effective_sample_size: 0,
            threshold: 0.5,
            trained: false,
        }
    }

    /// The score threshold fitted during training.
    #[must_use]
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    fn score_point(&self, point: &[f64]) -> f64 {
        if self.trees.is_empty() {
            return 0.5;
        }
        let avg_path: f64 = self
            .trees
            .iter()
            .map(|tree| tree.path_length(point))
            .sum::<f64>()
            / self.trees.len() as f64;

        let c_n = c_factor(self.effective_sample_size);
        if c_n.abs() < 1e-10 {
            return 0.5;
        }
        2.0_f64.powf(-avg_path / c_n)
    }
}

impl Default for IsolationForest {
    fn default() -> Self {
        Self::new(ForestConfig::default())
    }
}

impl Detector for IsolationForest {
    fn metadata(&self) -> &DetectorMetadata {
        &self.metadata
    }
}

impl TreeEnsembleScorer for IsolationForest {
    fn train(&mut self, data: &DataMatrix, feature_names: &[String]) -> Result<ForestSummary> {
        if data.n_samples == 0 {
            return Err(SentinelError::validation(
                "isolation forest training requires at least one sample",
            ));
        }
        if feature_names.len() != data.n_features {
            return Err(SentinelError::validation(format!(
                "feature name count {} does not match matrix width {}",
                feature_names.len(),
                data.n_features
            )));
        }

        let sample_size = self.config.sample_size.min(data.n_samples).max(2);
        let max_depth = (sample_size as f64).log2().ceil() as usize;
        let rows: Vec<&[f64]> = (0..data.n_samples).map(|i| data.row(i)).collect();

        let mut rng = StdRng::seed_from_u64(self.config.seed);
        self.trees = (0..self.config.n_trees)
            .map(|_| {
                let subset: Vec<&[f64]> = rows
                    .choose_multiple(&mut rng, sample_size)
                    .copied()
                    .collect();
                IsolationTree::build(&subset, max_depth, &mut rng)
            })
            .collect();
        self.effective_sample_size = sample_size;
        self.feature_names = feature_names.to_vec();

        // Place the threshold at the (1 - contamination) quantile of the
        // training scores.
        let mut scores: Vec<f64> = rows.iter().map(|row| self.score_point(row)).collect();
        scores.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        let quantile = (1.0 - self.config.contamination.clamp(0.0, 0.5)) * scores.len() as f64;
        let idx = (quantile as usize).min(scores.len() - 1);
        self.threshold = scores[idx];

        let anomalies = scores.iter().filter(|s| **s >= self.threshold).count();
        self.trained = true;

        Ok(ForestSummary {
            samples_trained: data.n_samples,
            features_count: data.n_features,
            anomalies_detected: anomalies,
            threshold: self.threshold,
        })
    }

    fn score(&self, features: &FeatureVector) -> f64 {
        if !self.trained {
            return 0.5;
        }
        let point: Vec<f64> = self
            .feature_names
            .iter()
            .map(|name| features.get(name))
            .collect();
        self.score_point(&point).clamp(0.0, 1.0)
    }

    fn is_trained(&self) -> bool {
        self.trained
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clustered_matrix() -> (DataMatrix, Vec<String>) {
        // 100 points near the origin plus a handful of far outliers.
        let mut data = Vec::new();
        for i in 0..100 {
            data.push((i % 10) as f64 * 0.1);
            data.push((i % 7) as f64 * 0.1);
        }
        for _ in 0..5 {
            data.push(50.0);
            data.push(50.0);
        }
        (
            DataMatrix::new(data, 105, 2),
            vec!["f0".to_string(), "f1".to_string()],
        )
    }

    fn fv(pairs: &[(&str, f64)]) -> FeatureVector {
        let mut features = FeatureVector::new();
        for (name, value) in pairs {
            features.insert(name, *value);
        }
        features
    }

    #[test]
    fn test_untrained_neutral() {
        let forest = IsolationForest::default();
        assert_eq!(forest.score(&fv(&[("f0", 1.0)])), 0.5);
        assert!(!forest.is_trained());
    }

    #[test]
    fn test_training_summary() {
        let mut forest = IsolationForest::new(ForestConfig {
            n_trees: 20,
            sample_size: 64,
            contamination: 0.1,
            seed: 42,
        });
        let (data, names) = clustered_matrix();

        let summary = forest.train(&data, &names).unwrap();
        assert!(forest.is_trained());
        assert_eq!(summary.samples_trained, 105);
        assert_eq!(summary.features_count, 2);
        assert!(summary.threshold > 0.0);
        assert!(summary.anomalies_detected > 0);
    }

    #[test]
    fn test_outliers_score_higher() {
        let mut forest = IsolationForest::new(ForestConfig {
            n_trees: 50,
            sample_size: 64,
            contamination: 0.1,
            seed: 42,
        });
        let (data, names) = clustered_matrix();
        forest.train(&data, &names).unwrap();

        let normal = forest.score(&fv(&[("f0", 0.3), ("f1", 0.3)]));
        let outlier = forest.score(&fv(&[("f0", 50.0), ("f1", 50.0)]));

        assert!((0.0..=1.0).contains(&normal));
        assert!((0.0..=1.0).contains(&outlier));
        assert!(outlier > normal, "outlier {outlier} <= normal {normal}");
    }

    #[test]
    fn test_seed_reproducibility() {
        let (data, names) = clustered_matrix();

        let mut a = IsolationForest::new(ForestConfig {
            n_trees: 10,
            seed: 7,
            ..Default::default()
        });
        let mut b = IsolationForest::new(ForestConfig {
            n_trees: 10,
            seed: 7,
            ..Default::default()
        });
        a.train(&data, &names).unwrap();
        b.train(&data, &names).unwrap();

        let point = fv(&[("f0", 0.5), ("f1", 0.2)]);
        assert_eq!(a.score(&point), b.score(&point));
    }

    #[test]
    fn test_feature_name_mismatch_rejected() {
        let mut forest = IsolationForest::default();
        let (data, _) = clustered_matrix();
        let err = forest.train(&data, &["only_one".to_string()]).unwrap_err();
        assert!(!forest.is_trained());
        assert!(err.to_string().contains("feature name count"));
    }

    #[test]
    fn test_c_factor() {
        assert_eq!(c_factor(1), 0.0);
        assert_eq!(c_factor(2), 1.0);
        assert!(c_factor(256) > c_factor(16));
    }
}
