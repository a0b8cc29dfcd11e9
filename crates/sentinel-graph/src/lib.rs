//! # Sentinel Graph
//!
//! Incremental transaction-graph analytics.
//!
//! This crate provides:
//! - A bounded, time-windowed directed graph of wallet-to-wallet transfers
//! - Centrality computation over point-in-time snapshots (PageRank,
//!   betweenness, local clustering coefficient)
//! - Community detection with suspicion scoring (laundering-ring patterns)
//! - The graph analysis service producing per-transaction network risk

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod centrality;
pub mod community;
pub mod graph;
pub mod service;
pub mod snapshot;

pub use community::{Community, CommunityDetector, CommunityFeatures, SuspicionWeights};
pub use centrality::{CentralityPass, CentralityScores};
pub use graph::{GraphConfig, NodeFeatures, Subgraph, TransactionGraph};
pub use service::{GraphAnalysisService, GraphServiceConfig, SuspiciousNetwork};
pub use snapshot::{GraphSnapshot, SnapshotEdge};
