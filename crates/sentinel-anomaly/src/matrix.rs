//! Dense sample matrix for detector training.

use sentinel_features::FeatureVector;
use serde::{Deserialize, Serialize};

/// A dense row-major matrix of training samples.
///
/// Each row is one transaction's feature vector in canonical column order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataMatrix {
    /// Flat storage of all values (row-major).
    pub data: Vec<f64>,
    /// Number of samples (rows).
    pub n_samples: usize,
    /// Number of features (columns).
    pub n_features: usize,
}

impl DataMatrix {
    /// Create a matrix from flat data.
    ///
    /// # Panics
    ///
    /// Panics if `data.len() != n_samples * n_features`.
    #[must_use]
    pub fn new(data: Vec<f64>, n_samples: usize, n_features: usize) -> Self {
        assert_eq!(data.len(), n_samples * n_features);
        Self {
            data,
            n_samples,
            n_features,
        }
    }

    /// Create a matrix from extracted feature vectors.
    ///
    /// Columns follow the canonical feature order; an empty slice yields an
    /// empty matrix with the canonical width.
    #[must_use]
    pub fn from_features(samples: &[FeatureVector]) -> Self {
        let n_features = FeatureVector::dimension();
        let mut data = Vec::with_capacity(samples.len() * n_features);
        for sample in samples {
            data.extend(sample.to_vector());
        }
        Self {
            data,
            n_samples: samples.len(),
            n_features,
        }
    }

    /// Get a row (sample) as a slice.
    #[must_use]
    pub fn row(&self, idx: usize) -> &[f64] {
        let start = idx * self.n_features;
        &self.data[start..start + self.n_features]
    }

    /// Get element at (row, col).
    #[must_use]
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.data[row * self.n_features + col]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_flat() {
        let m = DataMatrix::new(vec![1.0, 2.0, 3.0, 4.0], 2, 2);
        assert_eq!(m.row(0), &[1.0, 2.0]);
        assert_eq!(m.get(1, 1), 4.0);
    }

    #[test]
    fn test_from_features() {
        let mut fv = FeatureVector::new();
        fv.insert("amount", 10.0);

        let m = DataMatrix::from_features(&[fv.clone(), fv]);
        assert_eq!(m.n_samples, 2);
        assert_eq!(m.n_features, FeatureVector::dimension());
        assert_eq!(m.get(0, 0), 10.0); // "amount" is column 0
    }
}
