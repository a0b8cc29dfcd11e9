//! Incremental transaction graph.
//!
//! A directed multigraph of wallet-to-wallet transfers with bounded size
//! and a sliding retention window. Nodes hold monotonic cumulative
//! aggregates plus cached centrality values; edges retain the individual
//! transactions contributing to them so the weight invariant
//! `weight == sum(retained amounts)` holds through cleanup.

use crate::snapshot::{GraphSnapshot, SnapshotEdge};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::RwLock;
use tracing::debug;

/// Graph capacity and retention configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GraphConfig {
    /// Maximum node count; exceeding it evicts least-recently-active nodes.
    pub max_nodes: usize,
    /// Retention window for edge transactions, in seconds.
    pub window_secs: u64,
    /// Minimum spacing between automatic cleanup passes, in seconds.
    pub cleanup_interval_secs: u64,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            max_nodes: 100_000,
            window_secs: 86_400,
            cleanup_interval_secs: 300,
        }
    }
}

/// Cumulative node aggregates and cached centrality values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeFeatures {
    /// Total amount sent.
    pub total_sent: f64,
    /// Total amount received.
    pub total_received: f64,
    /// Outgoing transaction count.
    pub tx_count_out: u64,
    /// Incoming transaction count.
    pub tx_count_in: u64,
    /// Distinct recipients.
    pub unique_recipients: usize,
    /// Distinct senders.
    pub unique_senders: usize,
    /// Average amount over all transactions touching the node.
    pub avg_transaction_amount: f64,
    /// First-seen timestamp.
    pub first_seen: u64,
    /// Last-active timestamp.
    pub last_active: u64,
    /// Cached PageRank.
    pub pagerank: f64,
    /// Cached betweenness centrality.
    pub betweenness: f64,
    /// Cached local clustering coefficient.
    pub clustering_coefficient: f64,
    /// Cached node suspicious-score.
    pub suspicious_score: f64,
}

#[derive(Debug, Clone)]
struct NodeState {
    total_sent: f64,
    total_received: f64,
    tx_count_out: u64,
    tx_count_in: u64,
    recipients: HashSet<String>,
    senders: HashSet<String>,
    first_seen: u64,
    last_active: u64,
    pagerank: f64,
    betweenness: f64,
    clustering_coefficient: f64,
    suspicious_score: f64,
}

impl NodeState {
    fn new(timestamp: u64) -> Self {
        Self {
            total_sent: 0.0,
            total_received: 0.0,
            tx_count_out: 0,
            tx_count_in: 0,
            recipients: HashSet::new(),
            senders: HashSet::new(),
            first_seen: timestamp,
            last_active: timestamp,
            pagerank: 0.0,
            betweenness: 0.0,
            clustering_coefficient: 0.0,
            suspicious_score: 0.0,
        }
    }

    fn features(&self) -> NodeFeatures {
        let touched = self.tx_count_out + self.tx_count_in;
        NodeFeatures {
            total_sent: self.total_sent,
            total_received: self.total_received,
            tx_count_out: self.tx_count_out,
            tx_count_in: self.tx_count_in,
            unique_recipients: self.recipients.len(),
            unique_senders: self.senders.len(),
            avg_transaction_amount: if touched > 0 {
                (self.total_sent + self.total_received) / touched as f64
            } else {
                0.0
            },
            first_seen: self.first_seen,
            last_active: self.last_active,
            pagerank: self.pagerank,
            betweenness: self.betweenness,
            clustering_coefficient: self.clustering_coefficient,
            suspicious_score: self.suspicious_score,
        }
    }
}

/// A transaction retained on an edge for eviction and recency queries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeTransaction {
    /// Transaction ID.
    pub id: String,
    /// Amount.
    pub amount: f64,
    /// Timestamp (epoch seconds).
    pub timestamp: u64,
}

#[derive(Debug, Clone, Default)]
struct EdgeState {
    weight: f64,
    tx_count: u64,
    retained: VecDeque<EdgeTransaction>,
}

/// Induced subgraph returned by `get_subgraph`.
#[derive(Debug, Clone, Default)]
pub struct Subgraph {
    /// Wallets reachable within the requested radius.
    pub nodes: HashSet<String>,
    /// Directed edges induced on those wallets, with weights.
    pub edges: Vec<(String, String, f64)>,
}

#[derive(Debug, Default)]
struct GraphInner {
    nodes: HashMap<String, NodeState>,
    edges: HashMap<(String, String), EdgeState>,
    out_adj: HashMap<String, HashSet<String>>,
    in_adj: HashMap<String, HashSet<String>>,
    last_cleanup: u64,
}

/// Incremental directed transaction graph.
///
/// All mutation is serialized through an interior lock; global passes read
/// a cloned snapshot, so centrality never observes a half-applied update.
#[derive(Debug)]
pub struct TransactionGraph {
    config: GraphConfig,
    inner: RwLock<GraphInner>,
}

impl TransactionGraph {
    /// Create an empty graph.
    #[must_use]
    pub fn new(config: GraphConfig) -> Self {
        Self {
            config,
            inner: RwLock::new(GraphInner::default()),
        }
    }

    /// The graph configuration.
    #[must_use]
    pub fn config(&self) -> GraphConfig {
        self.config
    }

    /// Record a transfer, creating nodes and the edge as needed.
    pub fn add_transaction(
        &self,
        sender: &str,
        recipient: &str,
        amount: f64,
        timestamp: u64,
        transaction_id: &str,
    ) {
        let mut inner = self.inner.write().unwrap();

        let sender_node = inner
            .nodes
            .entry(sender.to_string())
            .or_insert_with(|| NodeState::new(timestamp));
        sender_node.total_sent += amount;
        sender_node.tx_count_out += 1;
        sender_node.recipients.insert(recipient.to_string());
        sender_node.last_active = sender_node.last_active.max(timestamp);

        let recipient_node = inner
            .nodes
            .entry(recipient.to_string())
            .or_insert_with(|| NodeState::new(timestamp));
        recipient_node.total_received += amount;
        recipient_node.tx_count_in += 1;
        recipient_node.senders.insert(sender.to_string());
        recipient_node.last_active = recipient_node.last_active.max(timestamp);

        let edge = inner
            .edges
            .entry((sender.to_string(), recipient.to_string()))
            .or_default();
        edge.weight += amount;
        edge.tx_count += 1;
        edge.retained.push_back(EdgeTransaction {
            id: transaction_id.to_string(),
            amount,
            timestamp,
        });

        inner
            .out_adj
            .entry(sender.to_string())
            .or_default()
            .insert(recipient.to_string());
        inner
            .in_adj
            .entry(recipient.to_string())
            .or_default()
            .insert(sender.to_string());

        if timestamp.saturating_sub(inner.last_cleanup) >= self.config.cleanup_interval_secs {
            Self::cleanup_inner(&mut inner, timestamp, self.config.window_secs);
        }
        Self::evict_inner(
            &mut inner,
            self.config.max_nodes,
            &[sender, recipient],
        );
    }

    /// Number of nodes.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.inner.read().unwrap().nodes.len()
    }

    /// Number of directed edges.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.inner.read().unwrap().edges.len()
    }

    /// Returns true if the edge (sender, recipient) exists.
    #[must_use]
    pub fn has_edge(&self, sender: &str, recipient: &str) -> bool {
        self.inner
            .read()
            .unwrap()
            .edges
            .contains_key(&(sender.to_string(), recipient.to_string()))
    }

    /// Aggregated weight and count of an edge, if present.
    #[must_use]
    pub fn edge_stats(&self, sender: &str, recipient: &str) -> Option<(f64, u64)> {
        self.inner
            .read()
            .unwrap()
            .edges
            .get(&(sender.to_string(), recipient.to_string()))
            .map(|edge| (edge.weight, edge.tx_count))
    }

    /// Clone a node's aggregates and cached centrality values.
    #[must_use]
    pub fn node_features(&self, wallet: &str) -> Option<NodeFeatures> {
        self.inner
            .read()
            .unwrap()
            .nodes
            .get(wallet)
            .map(NodeState::features)
    }

    /// Induced subgraph reachable from `wallet` within `radius` undirected
    /// hops. An absent wallet yields an empty subgraph.
    #[must_use]
    pub fn get_subgraph(&self, wallet: &str, radius: usize) -> Subgraph {
        let inner = self.inner.read().unwrap();
        if !inner.nodes.contains_key(wallet) {
            return Subgraph::default();
        }

        let mut reached: HashSet<String> = HashSet::new();
        reached.insert(wallet.to_string());
        let mut frontier: VecDeque<(String, usize)> = VecDeque::new();
        frontier.push_back((wallet.to_string(), 0));

        while let Some((current, depth)) = frontier.pop_front() {
            if depth >= radius {
                continue;
            }
            let empty = HashSet::new();
            let outgoing = inner.out_adj.get(&current).unwrap_or(&empty);
            let incoming = inner.in_adj.get(&current).unwrap_or(&empty);
            for neighbor in outgoing.iter().chain(incoming.iter()) {
                if reached.insert(neighbor.clone()) {
                    frontier.push_back((neighbor.clone(), depth + 1));
                }
            }
        }

        let edges = inner
            .edges
            .iter()
            .filter(|((src, dst), _)| reached.contains(src) && reached.contains(dst))
            .map(|((src, dst), edge)| (src.clone(), dst.clone(), edge.weight))
            .collect();

        Subgraph {
            nodes: reached,
            edges,
        }
    }

    /// Purge retained edge transactions older than the window.
    ///
    /// Edge weight and count shrink with the purged entries; empty edges
    /// are dropped, then nodes left without any edges and inactive beyond
    /// the window are removed. Node aggregates are monotonic summaries and
    /// are not re-derived.
    pub fn cleanup(&self, now: u64) {
        let mut inner = self.inner.write().unwrap();
        Self::cleanup_inner(&mut inner, now, self.config.window_secs);
    }

    fn cleanup_inner(inner: &mut GraphInner, now: u64, window_secs: u64) {
        let cutoff = now.saturating_sub(window_secs);
        let mut removed_edges = Vec::new();

        inner.edges.retain(|key, edge| {
            while let Some(front) = edge.retained.front() {
                if front.timestamp < cutoff {
                    edge.weight = (edge.weight - front.amount).max(0.0);
                    edge.tx_count = edge.tx_count.saturating_sub(1);
                    edge.retained.pop_front();
                } else {
                    break;
                }
            }
            if edge.retained.is_empty() {
                removed_edges.push(key.clone());
                false
            } else {
                true
            }
        });

        for (src, dst) in &removed_edges {
            if let Some(set) = inner.out_adj.get_mut(src) {
                set.remove(dst);
            }
            if let Some(set) = inner.in_adj.get_mut(dst) {
                set.remove(src);
            }
        }

        let orphaned: Vec<String> = inner
            .nodes
            .iter()
            .filter(|(wallet, node)| {
                node.last_active < cutoff
                    && inner.out_adj.get(*wallet).map_or(true, HashSet::is_empty)
                    && inner.in_adj.get(*wallet).map_or(true, HashSet::is_empty)
            })
            .map(|(wallet, _)| wallet.clone())
            .collect();
        for wallet in &orphaned {
            inner.nodes.remove(wallet);
            inner.out_adj.remove(wallet);
            inner.in_adj.remove(wallet);
        }

        inner.last_cleanup = now;
        if !removed_edges.is_empty() || !orphaned.is_empty() {
            debug!(
                edges = removed_edges.len(),
                nodes = orphaned.len(),
                "graph cleanup purged expired entries"
            );
        }
    }

    fn evict_inner(inner: &mut GraphInner, max_nodes: usize, protected: &[&str]) {
        while inner.nodes.len() > max_nodes {
            let victim = inner
                .nodes
                .iter()
                .filter(|(wallet, _)| !protected.contains(&wallet.as_str()))
                .min_by_key(|(_, node)| node.last_active)
                .map(|(wallet, _)| wallet.clone());

            let Some(wallet) = victim else {
                break;
            };
            inner.nodes.remove(&wallet);
            inner
                .edges
                .retain(|(src, dst), _| src != &wallet && dst != &wallet);

            let outgoing = inner.out_adj.remove(&wallet).unwrap_or_default();
            for dst in outgoing {
                if let Some(set) = inner.in_adj.get_mut(&dst) {
                    set.remove(&wallet);
                }
            }
            let incoming = inner.in_adj.remove(&wallet).unwrap_or_default();
            for src in incoming {
                if let Some(set) = inner.out_adj.get_mut(&src) {
                    set.remove(&wallet);
                }
            }
        }
    }

    /// Take an immutable topology snapshot for global passes.
    #[must_use]
    pub fn snapshot(&self) -> GraphSnapshot {
        let inner = self.inner.read().unwrap();

        let mut node_ids: Vec<String> = inner.nodes.keys().cloned().collect();
        node_ids.sort_unstable();
        let index: HashMap<String, usize> = node_ids
            .iter()
            .enumerate()
            .map(|(i, wallet)| (wallet.clone(), i))
            .collect();

        let n = node_ids.len();
        let mut out = vec![Vec::new(); n];
        let mut undirected: Vec<HashSet<usize>> = vec![HashSet::new(); n];
        let mut edges = Vec::with_capacity(inner.edges.len());
        let mut latest = 0u64;

        for ((src, dst), edge) in &inner.edges {
            let (Some(&s), Some(&t)) = (index.get(src), index.get(dst)) else {
                continue;
            };
            out[s].push(t);
            undirected[s].insert(t);
            undirected[t].insert(s);
            edges.push(SnapshotEdge {
                source: s,
                target: t,
                weight: edge.weight,
                count: edge.tx_count,
            });
            if let Some(last) = edge.retained.back() {
                latest = latest.max(last.timestamp);
            }
        }

        let first_seen = node_ids
            .iter()
            .map(|wallet| inner.nodes[wallet].first_seen)
            .collect();
        let last_active = node_ids
            .iter()
            .map(|wallet| inner.nodes[wallet].last_active)
            .collect();

        GraphSnapshot {
            node_ids,
            index,
            out,
            undirected: undirected
                .into_iter()
                .map(|set| {
                    let mut v: Vec<usize> = set.into_iter().collect();
                    v.sort_unstable();
                    v
                })
                .collect(),
            edges,
            first_seen,
            last_active,
            latest_timestamp: latest,
        }
    }

    /// Write computed centrality values back into node caches.
    ///
    /// Nodes evicted since the snapshot are skipped.
    pub fn apply_centrality(
        &self,
        snapshot: &GraphSnapshot,
        pagerank: &[f64],
        betweenness: &[f64],
        clustering: &[f64],
    ) {
        let max_pagerank = pagerank.iter().cloned().fold(0.0f64, f64::max);
        let mut inner = self.inner.write().unwrap();

        for (i, wallet) in snapshot.node_ids.iter().enumerate() {
            let Some(node) = inner.nodes.get_mut(wallet) else {
                continue;
            };
            node.pagerank = pagerank.get(i).copied().unwrap_or(0.0);
            node.betweenness = betweenness.get(i).copied().unwrap_or(0.0);
            node.clustering_coefficient = clustering.get(i).copied().unwrap_or(0.0);

            // Hub-ness proxy: influential, path-bridging nodes score high.
            let pr_norm = if max_pagerank > f64::EPSILON {
                node.pagerank / max_pagerank
            } else {
                0.0
            };
            node.suspicious_score = (0.5 * pr_norm + 0.5 * node.betweenness).clamp(0.0, 1.0);
        }
    }
}

impl Default for TransactionGraph {
    fn default() -> Self {
        Self::new(GraphConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const T0: u64 = 1_736_294_400; // 2025-01-08T00:00:00Z

    fn graph() -> TransactionGraph {
        TransactionGraph::new(GraphConfig {
            max_nodes: 1_000,
            window_secs: 86_400,
            cleanup_interval_secs: u64::MAX, // manual cleanup in tests
        })
    }

    #[test]
    fn test_add_single_transaction() {
        let g = graph();
        g.add_transaction("wallet_1", "wallet_2", 100.0, T0, "tx_001");

        assert_eq!(g.node_count(), 2);
        assert_eq!(g.edge_count(), 1);
        assert!(g.has_edge("wallet_1", "wallet_2"));
        assert_eq!(g.edge_stats("wallet_1", "wallet_2"), Some((100.0, 1)));

        let sender = g.node_features("wallet_1").unwrap();
        assert_eq!(sender.total_sent, 100.0);
        assert_eq!(sender.tx_count_out, 1);
        assert_eq!(sender.unique_recipients, 1);

        let recipient = g.node_features("wallet_2").unwrap();
        assert_eq!(recipient.total_received, 100.0);
        assert_eq!(recipient.tx_count_in, 1);
        assert_eq!(recipient.unique_senders, 1);
    }

    #[test]
    fn test_edge_aggregation() {
        let g = graph();
        g.add_transaction("wallet_1", "wallet_2", 100.0, T0, "tx_001");
        g.add_transaction("wallet_1", "wallet_2", 200.0, T0 + 1_800, "tx_002");

        assert_eq!(g.edge_stats("wallet_1", "wallet_2"), Some((300.0, 2)));

        let sender = g.node_features("wallet_1").unwrap();
        assert_eq!(sender.total_sent, 300.0);
        assert_eq!(sender.tx_count_out, 2);
        assert_eq!(sender.avg_transaction_amount, 150.0);
        assert_eq!(sender.last_active, T0 + 1_800);
    }

    #[test]
    fn test_subgraph_radius() {
        let g = graph();
        let transfers = [
            ("wallet_1", "wallet_2", 100.0),
            ("wallet_2", "wallet_3", 50.0),
            ("wallet_3", "wallet_4", 25.0),
            ("wallet_1", "wallet_4", 75.0),
            ("wallet_5", "wallet_6", 200.0), // isolated pair
        ];
        for (i, (src, dst, amount)) in transfers.iter().enumerate() {
            g.add_transaction(src, dst, *amount, T0 + i as u64 * 60, &format!("tx_{i:03}"));
        }

        let radius_1 = g.get_subgraph("wallet_1", 1);
        let expected: HashSet<String> = ["wallet_1", "wallet_2", "wallet_4"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(radius_1.nodes, expected);

        let radius_2 = g.get_subgraph("wallet_1", 2);
        assert_eq!(radius_2.nodes.len(), 4);
        assert!(!radius_2.nodes.contains("wallet_5"));

        let absent = g.get_subgraph("nonexistent", 1);
        assert!(absent.nodes.is_empty());
        assert!(absent.edges.is_empty());
    }

    #[test]
    fn test_cleanup_purges_old_transactions() {
        let g = graph();
        g.add_transaction("wallet_1", "wallet_2", 100.0, T0, "tx_old");
        g.add_transaction("wallet_3", "wallet_4", 200.0, T0 + 2 * 86_400, "tx_recent");

        g.cleanup(T0 + 2 * 86_400);

        assert!(!g.has_edge("wallet_1", "wallet_2"));
        assert!(g.has_edge("wallet_3", "wallet_4"));
        assert!(g.node_features("wallet_1").is_none());
        assert!(g.node_features("wallet_3").is_some());
    }

    #[test]
    fn test_cleanup_weight_invariant() {
        let g = graph();
        g.add_transaction("a", "b", 100.0, T0, "tx_1");
        g.add_transaction("a", "b", 50.0, T0 + 86_000, "tx_2");

        // First retained entry ages out; weight drops by its amount.
        g.cleanup(T0 + 86_400 + 60);
        assert_eq!(g.edge_stats("a", "b"), Some((50.0, 1)));
    }

    #[test]
    fn test_node_eviction() {
        let g = TransactionGraph::new(GraphConfig {
            max_nodes: 4,
            window_secs: 86_400,
            cleanup_interval_secs: u64::MAX,
        });

        g.add_transaction("a", "b", 10.0, T0, "tx_1");
        g.add_transaction("c", "d", 10.0, T0 + 100, "tx_2");
        assert_eq!(g.node_count(), 4);

        // Two new nodes push the count past the bound; the least-recently
        // active pair is evicted.
        g.add_transaction("e", "f", 10.0, T0 + 200, "tx_3");
        assert!(g.node_count() <= 4);
        assert!(g.node_features("e").is_some());
        assert!(g.node_features("a").is_none());
    }

    #[test]
    fn test_snapshot_consistency() {
        let g = graph();
        g.add_transaction("a", "b", 10.0, T0, "tx_1");
        g.add_transaction("b", "c", 20.0, T0 + 60, "tx_2");

        let snap = g.snapshot();
        assert_eq!(snap.node_count(), 3);
        assert_eq!(snap.edge_count(), 2);
        assert_eq!(snap.undirected_edge_count(), 2);
        assert_eq!(snap.latest_timestamp, T0 + 60);

        let a = snap.index["a"];
        let b = snap.index["b"];
        assert!(snap.out[a].contains(&b));
    }

    #[test]
    fn test_apply_centrality_writes_cache() {
        let g = graph();
        g.add_transaction("a", "b", 10.0, T0, "tx_1");

        let snap = g.snapshot();
        let n = snap.node_count();
        g.apply_centrality(&snap, &vec![0.6; n], &vec![0.25; n], &vec![0.1; n]);

        let features = g.node_features("a").unwrap();
        assert_eq!(features.pagerank, 0.6);
        assert_eq!(features.betweenness, 0.25);
        assert_eq!(features.clustering_coefficient, 0.1);
        assert!(features.suspicious_score > 0.0);
    }
}
