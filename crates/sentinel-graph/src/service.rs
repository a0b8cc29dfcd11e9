//! Graph analysis service.
//!
//! Orchestrates graph updates and per-transaction network risk scoring.
//! Global passes (centrality refresh, community detection) are deferred:
//! the service exposes explicit `refresh_*` methods that the engine
//! schedules off the per-transaction path.

use crate::centrality::CentralityPass;
use crate::community::{Community, CommunityDetector, CommunityFeatures, SuspicionWeights};
use crate::graph::{GraphConfig, TransactionGraph};
use sentinel_core::types::Transaction;
use serde::{Deserialize, Serialize};
use std::sync::RwLock;
use tracing::{debug, info};

/// Network risk returned before any graph state exists for a node.
const DEFAULT_NETWORK_RISK: f64 = 0.1;

/// Graph service configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GraphServiceConfig {
    /// Underlying graph capacity and retention.
    pub graph: GraphConfig,
    /// Suspicion threshold for community contributions.
    pub suspicion_threshold: f64,
    /// Half-life for decaying community contributions, in seconds.
    pub community_half_life_secs: u64,
}

impl Default for GraphServiceConfig {
    fn default() -> Self {
        Self {
            graph: GraphConfig::default(),
            suspicion_threshold: 0.4,
            community_half_life_secs: 3_600,
        }
    }
}

/// Suspicious community report entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuspiciousNetwork {
    /// Community id within the detection pass.
    pub community_id: usize,
    /// Suspicion score in [0,1].
    pub suspicion_score: f64,
    /// Member wallets.
    pub nodes: Vec<String>,
    /// Member count.
    pub size: usize,
    /// Derived community features.
    pub features: CommunityFeatures,
}

#[derive(Debug, Default)]
struct CommunityState {
    communities: Vec<Community>,
    computed_at: u64,
}

/// Graph analysis service.
pub struct GraphAnalysisService {
    graph: TransactionGraph,
    detector: CommunityDetector,
    config: GraphServiceConfig,
    state: RwLock<CommunityState>,
}

impl GraphAnalysisService {
    /// Create a service with default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(GraphServiceConfig::default(), SuspicionWeights::default())
    }

    /// Create a service with explicit configuration.
    #[must_use]
    pub fn with_config(config: GraphServiceConfig, weights: SuspicionWeights) -> Self {
        Self {
            graph: TransactionGraph::new(config.graph),
            detector: CommunityDetector::with_weights(weights),
            config,
            state: RwLock::new(CommunityState::default()),
        }
    }

    /// The underlying transaction graph.
    #[must_use]
    pub fn graph(&self) -> &TransactionGraph {
        &self.graph
    }

    /// Update the graph with a transaction and compute its network risk.
    ///
    /// Combines local pattern signals for the originating wallet (hub
    /// fan-out, rapid cycling back to recent counterparties, cached node
    /// suspicion) with a decayed contribution from any suspicious
    /// community containing the wallet. Bounded to [0,1]; a wallet with no
    /// prior graph state scores near the 0.1 default.
    #[must_use]
    pub fn analyze_transaction_network(&self, wallet: &str, transaction: &Transaction) -> f64 {
        self.graph.add_transaction(
            &transaction.sender,
            &transaction.recipient,
            transaction.amount,
            transaction.timestamp,
            &transaction.id,
        );

        let Some(features) = self.graph.node_features(wallet) else {
            return DEFAULT_NETWORK_RISK;
        };

        let mut score = DEFAULT_NETWORK_RISK;

        // Hub fan-out: many distinct recipients from one wallet.
        let fan_out = features.unique_recipients as f64;
        score += 0.3 * (fan_out / (fan_out + 10.0));

        // Rapid cycling: sending back to a wallet that recently sent to us.
        if features.unique_senders > 0 && wallet == transaction.sender {
            let cycles_back = self
                .graph
                .node_features(&transaction.recipient)
                .map(|recipient| recipient.unique_recipients > 0)
                .unwrap_or(false)
                && self.graph.has_edge(&transaction.recipient, wallet);
            if cycles_back {
                score += 0.25;
            }
        }

        // Cached node suspicion from the last centrality pass.
        score += 0.2 * features.suspicious_score;

        // Decayed contribution from a suspicious community, if any.
        score += self.community_contribution(wallet, transaction.timestamp);

        let score = score.clamp(0.0, 1.0);
        debug!(wallet, score, "network risk computed");
        score
    }

    fn community_contribution(&self, wallet: &str, now: u64) -> f64 {
        let state = self.state.read().unwrap();
        let member_of = state
            .communities
            .iter()
            .filter(|c| c.suspicion_score >= self.config.suspicion_threshold)
            .find(|c| c.nodes.iter().any(|n| n == wallet));

        let Some(community) = member_of else {
            return 0.0;
        };

        let age = now.saturating_sub(state.computed_at) as f64;
        let half_life = self.config.community_half_life_secs.max(1) as f64;
        let decay = 0.5_f64.powf(age / half_life);
        0.5 * community.suspicion_score * decay
    }

    /// Recompute centrality measures over a snapshot and write them back.
    ///
    /// Global pass; schedule it off the per-transaction path.
    pub fn refresh_centrality(&self) {
        let snapshot = self.graph.snapshot();
        if snapshot.is_empty() {
            return;
        }
        let scores = CentralityPass::compute(&snapshot);
        self.graph.apply_centrality(
            &snapshot,
            &scores.pagerank,
            &scores.betweenness,
            &scores.clustering,
        );
        info!(
            nodes = snapshot.node_count(),
            iterations = scores.iterations,
            converged = scores.converged,
            "centrality refresh complete"
        );
    }

    /// Recompute communities from scratch over the current snapshot.
    ///
    /// Global pass; schedule it off the per-transaction path.
    pub fn refresh_communities(&self) {
        let snapshot = self.graph.snapshot();
        let communities = self
            .detector
            .detect_communities(&snapshot, self.config.graph.window_secs);
        let mut state = self.state.write().unwrap();
        state.computed_at = snapshot.latest_timestamp;
        state.communities = communities;
        info!(
            communities = state.communities.len(),
            "community refresh complete"
        );
    }

    /// Suspicious communities from the latest refresh, sorted descending.
    #[must_use]
    pub fn get_suspicious_networks(&self, threshold: f64) -> Vec<SuspiciousNetwork> {
        let state = self.state.read().unwrap();
        CommunityDetector::get_suspicious_communities(&state.communities, threshold)
            .into_iter()
            .map(|c| SuspiciousNetwork {
                community_id: c.id,
                suspicion_score: c.suspicion_score,
                size: c.nodes.len(),
                nodes: c.nodes,
                features: c.features,
            })
            .collect()
    }
}

impl Default for GraphAnalysisService {
    fn default() -> Self {
        Self::new()
    }
}
