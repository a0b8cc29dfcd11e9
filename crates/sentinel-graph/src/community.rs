//! Community detection and suspicion scoring.
//!
//! Partitions the graph into densely-connected clusters via greedy
//! modularity local moving, then scores each cluster's suspiciousness from
//! density, volume, velocity, and connectivity features. Communities are
//! recomputed from scratch on each detection pass.

use crate::snapshot::GraphSnapshot;
use sentinel_core::detector::{Detector, DetectorMetadata};
use sentinel_core::domain::Domain;
use sentinel_core::error::{Result, SentinelError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Local-moving passes before giving up on further gain.
const MAX_PASSES: u32 = 10;
/// Minimum modularity gain for a move.
const MIN_GAIN: f64 = 1e-7;

/// Derived features of one community.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommunityFeatures {
    /// Member count.
    pub size: usize,
    /// Internal directed edges / possible directed edges.
    pub density: f64,
    /// Directed edges with both endpoints inside.
    pub internal_edges: usize,
    /// Directed edges crossing the community boundary.
    pub external_edges: usize,
    /// Sum of internal edge weights.
    pub total_volume: f64,
    /// Mean amount per internal transaction.
    pub avg_transaction_amount: f64,
    /// Internal transactions per hour over the retention window.
    pub transaction_velocity: f64,
    /// Fraction of members first seen within the window.
    pub new_nodes_ratio: f64,
}

/// A detected community with its suspicion score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Community {
    /// Community id, contiguous within one detection pass.
    pub id: usize,
    /// Member wallet ids.
    pub nodes: Vec<String>,
    /// Derived features.
    pub features: CommunityFeatures,
    /// Suspicion score in [0,1].
    pub suspicion_score: f64,
}

/// Tunable suspicion-scoring coefficients.
///
/// The qualitative contract is monotonicity: suspicion rises with density,
/// volume, per-transaction average, velocity, and new-member ratio, and
/// falls with external connectivity. The exact magnitudes are heuristic
/// and deployment-tunable.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SuspicionWeights {
    /// Contribution of internal density.
    pub density: f64,
    /// Contribution of total volume (saturating).
    pub volume: f64,
    /// Contribution of mean transaction amount (saturating).
    pub avg_amount: f64,
    /// Contribution of transaction velocity (saturating).
    pub velocity: f64,
    /// Contribution of the new-member ratio.
    pub new_members: f64,
    /// Penalty for external connectivity.
    pub external_penalty: f64,
    /// Volume saturation midpoint.
    pub volume_scale: f64,
    /// Average-amount saturation midpoint.
    pub avg_amount_scale: f64,
    /// Velocity saturation midpoint (transactions/hour).
    pub velocity_scale: f64,
}

impl Default for SuspicionWeights {
    fn default() -> Self {
        Self {
            density: 0.30,
            volume: 0.20,
            avg_amount: 0.15,
            velocity: 0.15,
            new_members: 0.10,
            external_penalty: 0.25,
            volume_scale: 20_000.0,
            avg_amount_scale: 2_000.0,
            velocity_scale: 10.0,
        }
    }
}

impl SuspicionWeights {
    /// Validate that contributions are non-negative and scales positive.
    pub fn validate(&self) -> Result<()> {
        let contributions = [
            self.density,
            self.volume,
            self.avg_amount,
            self.velocity,
            self.new_members,
            self.external_penalty,
        ];
        if contributions.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(SentinelError::config(
                "suspicion contributions must be non-negative numbers",
            ));
        }
        let scales = [self.volume_scale, self.avg_amount_scale, self.velocity_scale];
        if scales.iter().any(|s| !s.is_finite() || *s <= 0.0) {
            return Err(SentinelError::config(
                "suspicion scales must be positive numbers",
            ));
        }
        Ok(())
    }
}

/// Community detector.
#[derive(Debug, Clone)]
pub struct CommunityDetector {
    metadata: DetectorMetadata,
    weights: SuspicionWeights,
}

impl CommunityDetector {
    /// Create a detector with default suspicion weights.
    #[must_use]
    pub fn new() -> Self {
        Self::with_weights(SuspicionWeights::default())
    }

    /// Create a detector with custom suspicion weights.
    #[must_use]
    pub fn with_weights(weights: SuspicionWeights) -> Self {
        Self {
            metadata: DetectorMetadata::deferred("graph/community", Domain::GraphAnalytics)
                .with_description("Modularity clustering with suspicion scoring"),
            weights,
        }
    }

    /// Current suspicion weights.
    #[must_use]
    pub fn weights(&self) -> SuspicionWeights {
        self.weights
    }

    /// Detect communities over a snapshot and score each one.
    ///
    /// `window_secs` is the graph retention window, used for velocity and
    /// new-member features. Singleton communities are valid outputs.
    #[must_use]
    pub fn detect_communities(
        &self,
        snapshot: &GraphSnapshot,
        window_secs: u64,
    ) -> Vec<Community> {
        let assignments = modularity_partition(snapshot);
        let mut members: HashMap<usize, Vec<usize>> = HashMap::new();
        for (node, community) in assignments.iter().enumerate() {
            members.entry(*community).or_default().push(node);
        }

        let mut communities: Vec<Community> = members
            .into_iter()
            .map(|(id, nodes)| {
                let features = community_features(snapshot, &nodes, &assignments, window_secs);
                let suspicion_score = self.suspicion(&features);
                Community {
                    id,
                    nodes: nodes
                        .iter()
                        .map(|&i| snapshot.node_ids[i].clone())
                        .collect(),
                    features,
                    suspicion_score,
                }
            })
            .collect();
        communities.sort_by_key(|c| c.id);
        communities
    }

    /// Suspicion score for a feature set, in [0,1].
    ///
    /// Monotone increasing in density, volume, average amount, velocity,
    /// and new-member ratio; monotone decreasing in external connectivity.
    #[must_use]
    pub fn suspicion(&self, features: &CommunityFeatures) -> f64 {
        let w = &self.weights;
        let external_ratio = if features.external_edges + features.internal_edges > 0 {
            features.external_edges as f64
                / (features.external_edges + features.internal_edges) as f64
        } else {
            0.0
        };

        let raw = w.density * features.density
            + w.volume * saturate(features.total_volume, w.volume_scale)
            + w.avg_amount * saturate(features.avg_transaction_amount, w.avg_amount_scale)
            + w.velocity * saturate(features.transaction_velocity, w.velocity_scale)
            + w.new_members * features.new_nodes_ratio
            - w.external_penalty * external_ratio;

        raw.clamp(0.0, 1.0)
    }

    /// Communities with suspicion at or above `threshold`, sorted
    /// descending by score.
    #[must_use]
    pub fn get_suspicious_communities(
        communities: &[Community],
        threshold: f64,
    ) -> Vec<Community> {
        let mut suspicious: Vec<Community> = communities
            .iter()
            .filter(|c| c.suspicion_score >= threshold)
            .cloned()
            .collect();
        suspicious.sort_by(|a, b| {
            b.suspicion_score
                .partial_cmp(&a.suspicion_score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        suspicious
    }
}

impl Default for CommunityDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl Detector for CommunityDetector {
    fn metadata(&self) -> &DetectorMetadata {
        &self.metadata
    }
}

/// Saturating normalizer: monotone increasing, bounded below 1.
fn saturate(value: f64, midpoint: f64) -> f64 {
    let v = value.max(0.0);
    v / (v + midpoint)
}

/// Greedy modularity partition over the undirected view.
///
/// Each node starts in its own community; local-moving passes relocate
/// nodes to the neighboring community with the best modularity gain, then
/// an aggregation phase merges whole communities while doing so still
/// improves modularity. Community ids are renumbered to be contiguous.
fn modularity_partition(snapshot: &GraphSnapshot) -> Vec<usize> {
    let n = snapshot.node_count();
    if n == 0 {
        return Vec::new();
    }

    let m = snapshot.undirected_edge_count() as f64;
    let mut communities: Vec<usize> = (0..n).collect();
    if m == 0.0 {
        return communities;
    }

    let mut community_degrees: HashMap<usize, f64> = (0..n)
        .map(|i| (i, snapshot.undirected_degree(i) as f64))
        .collect();

    let mut improved = true;
    let mut pass = 0;
    while improved && pass < MAX_PASSES {
        improved = false;
        pass += 1;

        for node in 0..n {
            let current = communities[node];
            let degree = snapshot.undirected_degree(node) as f64;

            let mut neighbor_communities: HashMap<usize, f64> = HashMap::new();
            for &neighbor in &snapshot.undirected[node] {
                *neighbor_communities
                    .entry(communities[neighbor])
                    .or_insert(0.0) += 1.0;
            }

            let edges_to_current = neighbor_communities.get(&current).copied().unwrap_or(0.0);
            let sigma_current = community_degrees.get(&current).copied().unwrap_or(0.0);

            let mut best_community = current;
            let mut best_gain = 0.0;
            for (&candidate, &edges_to_candidate) in &neighbor_communities {
                if candidate == current {
                    continue;
                }
                let sigma_candidate =
                    community_degrees.get(&candidate).copied().unwrap_or(0.0);
                let gain = (edges_to_candidate - edges_to_current)
                    - degree * (sigma_candidate - sigma_current + degree) / (2.0 * m);
                if gain > best_gain {
                    best_gain = gain;
                    best_community = candidate;
                }
            }

            if best_gain > MIN_GAIN {
                if let Some(d) = community_degrees.get_mut(&current) {
                    *d -= degree;
                }
                *community_degrees.entry(best_community).or_insert(0.0) += degree;
                communities[node] = best_community;
                improved = true;
            }
        }
    }

    merge_communities(snapshot, &mut communities, m);

    // Renumber communities to be contiguous.
    let mut remap: HashMap<usize, usize> = HashMap::new();
    let mut next = 0usize;
    for community in &mut communities {
        let id = *remap.entry(*community).or_insert_with(|| {
            let id = next;
            next += 1;
            id
        });
        *community = id;
    }
    communities
}

/// Aggregation phase: merge connected communities while the merge improves
/// modularity. Single-node moves alone stall on symmetric structures (a
/// closed ring splits into pairs); whole-community merges recover them.
fn merge_communities(snapshot: &GraphSnapshot, communities: &mut [usize], m: f64) {
    let n = communities.len();
    loop {
        // Community degree sums and inter-community undirected edge counts.
        let mut sigma: HashMap<usize, f64> = HashMap::new();
        for node in 0..n {
            *sigma.entry(communities[node]).or_insert(0.0) +=
                snapshot.undirected_degree(node) as f64;
        }
        let mut between: HashMap<(usize, usize), f64> = HashMap::new();
        for node in 0..n {
            for &neighbor in &snapshot.undirected[node] {
                if node < neighbor && communities[node] != communities[neighbor] {
                    let a = communities[node].min(communities[neighbor]);
                    let b = communities[node].max(communities[neighbor]);
                    *between.entry((a, b)).or_insert(0.0) += 1.0;
                }
            }
        }

        let mut best: Option<((usize, usize), f64)> = None;
        for (&pair, &edges) in &between {
            let sigma_a = sigma.get(&pair.0).copied().unwrap_or(0.0);
            let sigma_b = sigma.get(&pair.1).copied().unwrap_or(0.0);
            let gain = edges / m - 2.0 * (sigma_a / (2.0 * m)) * (sigma_b / (2.0 * m));
            if gain > MIN_GAIN && best.map_or(true, |(_, g)| gain > g) {
                best = Some((pair, gain));
            }
        }

        let Some(((keep, absorb), _)) = best else {
            break;
        };
        for community in communities.iter_mut() {
            if *community == absorb {
                *community = keep;
            }
        }
    }
}

fn community_features(
    snapshot: &GraphSnapshot,
    members: &[usize],
    assignments: &[usize],
    window_secs: u64,
) -> CommunityFeatures {
    let size = members.len();
    let community = assignments[members[0]];

    let mut internal_edges = 0usize;
    let mut external_edges = 0usize;
    let mut total_volume = 0.0;
    let mut internal_tx = 0u64;

    for edge in &snapshot.edges {
        let src_in = assignments[edge.source] == community;
        let dst_in = assignments[edge.target] == community;
        if src_in && dst_in {
            internal_edges += 1;
            total_volume += edge.weight;
            internal_tx += edge.count;
        } else if src_in || dst_in {
            external_edges += 1;
        }
    }

    let density = if size > 1 {
        internal_edges as f64 / (size * (size - 1)) as f64
    } else {
        0.0
    };
    let avg_transaction_amount = if internal_tx > 0 {
        total_volume / internal_tx as f64
    } else {
        0.0
    };
    let window_hours = (window_secs as f64 / 3_600.0).max(1.0 / 60.0);
    let transaction_velocity = internal_tx as f64 / window_hours;

    let fresh_cutoff = snapshot.latest_timestamp.saturating_sub(window_secs);
    let new_members = members
        .iter()
        .filter(|&&i| snapshot.first_seen[i] >= fresh_cutoff)
        .count();
    let new_nodes_ratio = if size > 0 {
        new_members as f64 / size as f64
    } else {
        0.0
    };

    CommunityFeatures {
        size,
        density,
        internal_edges,
        external_edges,
        total_volume,
        avg_transaction_amount,
        transaction_velocity,
        new_nodes_ratio,
    }
}
