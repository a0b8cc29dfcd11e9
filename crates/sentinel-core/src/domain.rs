//! Analysis domains for detector organization.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Analysis domain a detector belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Domain {
    /// Core infrastructure (metrics, configuration).
    Core,
    /// Transaction feature extraction.
    Features,
    /// Anomaly detection (statistical, rule-based, tree-ensemble).
    Anomaly,
    /// Transaction-graph analytics (centrality, communities).
    GraphAnalytics,
    /// Risk fusion and decisioning.
    RiskDecision,
}

impl Domain {
    /// All domains.
    pub const ALL: &'static [Domain] = &[
        Domain::Core,
        Domain::Features,
        Domain::Anomaly,
        Domain::GraphAnalytics,
        Domain::RiskDecision,
    ];

    /// Returns the domain name as a string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Domain::Core => "core",
            Domain::Features => "features",
            Domain::Anomaly => "anomaly",
            Domain::GraphAnalytics => "graph",
            Domain::RiskDecision => "risk",
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_strings() {
        assert_eq!(Domain::GraphAnalytics.as_str(), "graph");
        assert_eq!(Domain::Anomaly.to_string(), "anomaly");
    }

    #[test]
    fn test_all_domains_distinct() {
        let mut seen = std::collections::HashSet::new();
        for d in Domain::ALL {
            assert!(seen.insert(d.as_str()));
        }
    }
}
