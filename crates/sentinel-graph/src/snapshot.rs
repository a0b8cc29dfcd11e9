//! Point-in-time graph snapshot.
//!
//! Global passes (centrality, community detection) operate on an immutable
//! snapshot taken under the graph lock, so they never interleave with a
//! mutation in a way that produces an inconsistent read.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A directed edge in a snapshot, with aggregated weight and count.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SnapshotEdge {
    /// Source node index.
    pub source: usize,
    /// Target node index.
    pub target: usize,
    /// Aggregated edge weight (sum of retained amounts).
    pub weight: f64,
    /// Number of retained transactions.
    pub count: u64,
}

/// Immutable topology snapshot with index-based adjacency.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GraphSnapshot {
    /// Wallet id per node index.
    pub node_ids: Vec<String>,
    /// Wallet id to node index.
    pub index: HashMap<String, usize>,
    /// Directed out-adjacency per node.
    pub out: Vec<Vec<usize>>,
    /// Undirected (deduplicated) adjacency per node.
    pub undirected: Vec<Vec<usize>>,
    /// All directed edges.
    pub edges: Vec<SnapshotEdge>,
    /// First-seen timestamp per node.
    pub first_seen: Vec<u64>,
    /// Last-active timestamp per node.
    pub last_active: Vec<u64>,
    /// Latest transaction timestamp observed at snapshot time.
    pub latest_timestamp: u64,
}

impl GraphSnapshot {
    /// Number of nodes.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.node_ids.len()
    }

    /// Number of directed edges.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Returns true if the snapshot holds no nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.node_ids.is_empty()
    }

    /// Directed out-degree of a node index.
    #[must_use]
    pub fn out_degree(&self, node: usize) -> usize {
        self.out.get(node).map_or(0, Vec::len)
    }

    /// Undirected degree of a node index.
    #[must_use]
    pub fn undirected_degree(&self, node: usize) -> usize {
        self.undirected.get(node).map_or(0, Vec::len)
    }

    /// Number of undirected edges (each counted once).
    #[must_use]
    pub fn undirected_edge_count(&self) -> usize {
        self.undirected.iter().map(Vec::len).sum::<usize>() / 2
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_snapshot() {
        let snap = GraphSnapshot::default();
        assert!(snap.is_empty());
        assert_eq!(snap.out_degree(0), 0);
        assert_eq!(snap.undirected_edge_count(), 0);
    }
}
