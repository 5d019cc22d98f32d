//! Structural analysis of extraction snapshots.
//!
//! A snapshot is loaded into a directed `KnowledgeGraph` and measured by the
//! stateless `StructuralAnalyzer`: connectivity, shortest paths, centrality,
//! clustering, cut structure, cycles and communities. Metrics that cannot be
//! computed degrade to an undefined value plus a `Diagnostic` instead of
//! failing the whole analysis.

pub mod analyzer;
pub mod community;
pub mod config;
pub mod error;
pub mod graph;
pub mod louvain;
pub mod metrics;
pub mod requirements;

mod centrality;
mod clustering;
mod connectivity;
mod paths;

pub use analyzer::StructuralAnalyzer;
pub use community::{Communities, CommunityAlgorithm};
pub use config::AnalyzerConfig;
pub use error::{Result, StructureError};
pub use graph::{KnowledgeGraph, UndirectedView};
pub use louvain::LouvainDetector;
pub use metrics::{
    BasicMetrics, CentralityMetrics, ClusteringMetrics, ConnectivityMetrics, Diagnostic,
    PathMetrics,
    StructuralIssues, StructuralMetrics, StructureComparison,
};
