//! # Sentinel Features
//!
//! Deterministic transaction feature extraction.
//!
//! Turns a raw transaction plus optional sender history into a fixed-shape
//! numeric feature vector. The key set is identical regardless of history
//! availability, and extraction depends on no state besides its inputs.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod extractor;
pub mod vector;

pub use extractor::FeatureExtractor;
pub use vector::{FeatureVector, FEATURE_NAMES};
