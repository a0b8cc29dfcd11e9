//! Centrality computation over graph snapshots.
//!
//! - PageRank via power iteration with teleportation
//! - Betweenness centrality via the Brandes algorithm
//! - Local clustering coefficient over the undirected view
//!
//! All three are global passes over a point-in-time snapshot; they run as
//! a deferred background refresh, never inline on the per-transaction path.

use crate::snapshot::GraphSnapshot;
use sentinel_core::detector::{Detector, DetectorMetadata};
use sentinel_core::domain::Domain;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// PageRank damping factor.
const DAMPING: f64 = 0.85;
/// PageRank convergence threshold.
const CONVERGENCE: f64 = 1e-6;
/// PageRank iteration cap.
const MAX_ITERATIONS: u32 = 100;

/// Result of one full centrality pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CentralityScores {
    /// PageRank per node index.
    pub pagerank: Vec<f64>,
    /// Normalized betweenness per node index.
    pub betweenness: Vec<f64>,
    /// Local clustering coefficient per node index.
    pub clustering: Vec<f64>,
    /// PageRank iterations run.
    pub iterations: u32,
    /// Whether PageRank converged.
    pub converged: bool,
}

/// Deferred centrality pass over a graph snapshot.
#[derive(Debug, Clone)]
pub struct CentralityPass {
    metadata: DetectorMetadata,
}

impl CentralityPass {
    /// Create a new pass.
    #[must_use]
    pub fn new() -> Self {
        Self {
            metadata: DetectorMetadata::deferred("graph/centrality", Domain::GraphAnalytics)
                .with_description("PageRank, betweenness, clustering coefficient refresh"),
        }
    }

    /// Compute all centrality measures for a snapshot.
    #[must_use]
    pub fn compute(snapshot: &GraphSnapshot) -> CentralityScores {
        let (pagerank, iterations, converged) = pagerank(snapshot);
        CentralityScores {
            pagerank,
            betweenness: betweenness(snapshot, true),
            clustering: clustering_coefficients(snapshot),
            iterations,
            converged,
        }
    }
}

impl Default for CentralityPass {
    fn default() -> Self {
        Self::new()
    }
}

impl Detector for CentralityPass {
    fn metadata(&self) -> &DetectorMetadata {
        &self.metadata
    }
}

/// PageRank by power iteration with teleportation.
///
/// Returns (scores, iterations, converged).
#[must_use]
pub fn pagerank(snapshot: &GraphSnapshot) -> (Vec<f64>, u32, bool) {
    let n = snapshot.node_count();
    if n == 0 {
        return (Vec::new(), 0, true);
    }

    // Incoming adjacency, derived once from the directed edges.
    let mut incoming: Vec<Vec<usize>> = vec![Vec::new(); n];
    for (source, targets) in snapshot.out.iter().enumerate() {
        for &target in targets {
            incoming[target].push(source);
        }
    }

    let teleport = (1.0 - DAMPING) / n as f64;
    let mut scores = vec![1.0 / n as f64; n];
    let mut prev = vec![0.0; n];
    let mut iterations = 0;
    let mut converged = false;

    while iterations < MAX_ITERATIONS {
        std::mem::swap(&mut scores, &mut prev);
        let mut max_diff = 0.0f64;

        for node in 0..n {
            let mut rank_sum = 0.0;
            for &source in &incoming[node] {
                let out_degree = snapshot.out_degree(source) as f64;
                if out_degree > 0.0 {
                    rank_sum += prev[source] / out_degree;
                }
            }
            let updated = teleport + DAMPING * rank_sum;
            scores[node] = updated;
            max_diff = max_diff.max((updated - prev[node]).abs());
        }

        iterations += 1;
        if max_diff < CONVERGENCE {
            converged = true;
            break;
        }
    }

    (scores, iterations, converged)
}

/// Betweenness centrality via the Brandes algorithm.
///
/// BFS from each source with a single backward dependency-accumulation
/// pass; `normalized` scales by 1/((n-1)(n-2)).
#[must_use]
pub fn betweenness(snapshot: &GraphSnapshot, normalized: bool) -> Vec<f64> {
    let n = snapshot.node_count();
    let mut centrality = vec![0.0f64; n];

    for source in 0..n {
        let mut stack: Vec<usize> = Vec::with_capacity(n);
        let mut predecessors: Vec<Vec<usize>> = vec![Vec::new(); n];
        let mut sigma = vec![0.0f64; n];
        let mut dist = vec![-1i64; n];

        sigma[source] = 1.0;
        dist[source] = 0;

        let mut queue = VecDeque::new();
        queue.push_back(source);

        while let Some(v) = queue.pop_front() {
            stack.push(v);
            for &w in &snapshot.out[v] {
                if dist[w] < 0 {
                    dist[w] = dist[v] + 1;
                    queue.push_back(w);
                }
                if dist[w] == dist[v] + 1 {
                    sigma[w] += sigma[v];
                    predecessors[w].push(v);
                }
            }
        }

        let mut delta = vec![0.0f64; n];
        while let Some(w) = stack.pop() {
            for &v in &predecessors[w] {
                delta[v] += (sigma[v] / sigma[w]) * (1.0 + delta[w]);
            }
            if w != source {
                centrality[w] += delta[w];
            }
        }
    }

    if normalized && n > 2 {
        let scale = 1.0 / ((n - 1) * (n - 2)) as f64;
        for c in &mut centrality {
            *c *= scale;
        }
    }
    centrality
}

/// Local clustering coefficient over the undirected view.
#[must_use]
pub fn clustering_coefficients(snapshot: &GraphSnapshot) -> Vec<f64> {
    let n = snapshot.node_count();
    let mut coefficients = vec![0.0f64; n];

    for node in 0..n {
        let neighbors = &snapshot.undirected[node];
        let k = neighbors.len();
        if k < 2 {
            continue;
        }

        let mut links = 0usize;
        for (i, &u) in neighbors.iter().enumerate() {
            for &v in &neighbors[i + 1..] {
                // Undirected lists are sorted, so membership is a binary search.
                if snapshot.undirected[u].binary_search(&v).is_ok() {
                    links += 1;
                }
            }
        }
        coefficients[node] = 2.0 * links as f64 / (k * (k - 1)) as f64;
    }
    coefficients
}
