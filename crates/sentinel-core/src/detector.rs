//! Detector metadata and execution modes.
//!
//! Every scoring component declares metadata describing where it runs
//! relative to the per-transaction hot path, and what latency it is
//! expected to hold.

use crate::domain::Domain;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Detector execution mode.
///
/// Determines where a detector runs relative to the assessment hot path:
/// - `Inline`: invoked on every transaction; must fit the latency budget
/// - `Deferred`: global recomputation (centrality, communities) scheduled
///   off the hot path, never inline with a single assessment
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExecutionMode {
    /// Runs on the per-transaction path.
    Inline,
    /// Runs as a periodic background pass over a snapshot.
    Deferred,
}

impl ExecutionMode {
    /// Returns true if this detector runs on the per-transaction path.
    #[must_use]
    pub const fn is_inline(&self) -> bool {
        matches!(self, ExecutionMode::Inline)
    }

    /// Returns true if this detector runs as a background pass.
    #[must_use]
    pub const fn is_deferred(&self) -> bool {
        matches!(self, ExecutionMode::Deferred)
    }

    /// Returns the mode name as a string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            ExecutionMode::Inline => "inline",
            ExecutionMode::Deferred => "deferred",
        }
    }
}

impl fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Detector metadata.
///
/// Contains identification and performance expectations for a detector.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DetectorMetadata {
    /// Unique detector identifier (e.g., "graph/pagerank").
    pub id: String,

    /// Execution mode.
    pub mode: ExecutionMode,

    /// Analysis domain.
    pub domain: Domain,

    /// Human-readable description.
    pub description: String,

    /// Expected throughput in scores per second.
    pub expected_throughput: u64,

    /// Target latency in microseconds.
    pub target_latency_us: f64,

    /// Version of the detector implementation.
    pub version: u32,
}

impl DetectorMetadata {
    /// Create metadata for an inline (hot-path) detector.
    #[must_use]
    pub fn inline(id: impl Into<String>, domain: Domain) -> Self {
        Self {
            id: id.into(),
            mode: ExecutionMode::Inline,
            domain,
            description: String::new(),
            expected_throughput: 10_000,
            target_latency_us: 1_000.0,
            version: 1,
        }
    }

    /// Create metadata for a deferred (background) detector.
    #[must_use]
    pub fn deferred(id: impl Into<String>, domain: Domain) -> Self {
        Self {
            id: id.into(),
            mode: ExecutionMode::Deferred,
            domain,
            description: String::new(),
            expected_throughput: 100,
            target_latency_us: 100_000.0,
            version: 1,
        }
    }

    /// Set the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Set the expected throughput.
    #[must_use]
    pub fn with_throughput(mut self, scores_per_sec: u64) -> Self {
        self.expected_throughput = scores_per_sec;
        self
    }

    /// Set the target latency.
    #[must_use]
    pub fn with_latency_us(mut self, latency_us: f64) -> Self {
        self.target_latency_us = latency_us;
        self
    }

    /// Set the version.
    #[must_use]
    pub fn with_version(mut self, version: u32) -> Self {
        self.version = version;
        self
    }
}

impl Default for DetectorMetadata {
    fn default() -> Self {
        Self::inline("unnamed", Domain::Core)
    }
}

/// Base trait for all scoring detectors.
pub trait Detector {
    /// Returns this detector's metadata.
    fn metadata(&self) -> &DetectorMetadata;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_execution_mode_properties() {
        assert!(ExecutionMode::Inline.is_inline());
        assert!(!ExecutionMode::Inline.is_deferred());
        assert!(ExecutionMode::Deferred.is_deferred());
    }

    #[test]
    fn test_metadata_builders() {
        let meta = DetectorMetadata::inline("anomaly/statistical", Domain::Anomaly)
            .with_description("Per-feature deviation scoring")
            .with_throughput(100_000)
            .with_latency_us(50.0);

        assert_eq!(meta.id, "anomaly/statistical");
        assert_eq!(meta.mode, ExecutionMode::Inline);
        assert_eq!(meta.domain, Domain::Anomaly);
        assert_eq!(meta.expected_throughput, 100_000);
    }

    #[test]
    fn test_deferred_defaults() {
        let meta = DetectorMetadata::deferred("graph/centrality", Domain::GraphAnalytics);
        assert!(meta.mode.is_deferred());
        assert!(meta.target_latency_us > 1_000.0);
    }
}
