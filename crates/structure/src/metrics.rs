use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A metric that degraded instead of failing the analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub metric: String,
    pub message: String,
}

impl Diagnostic {
    pub fn new(metric: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            metric: metric.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BasicMetrics {
    pub node_count: usize,
    pub edge_count: usize,
    pub density: f64,
    pub average_degree: f64,
    pub max_degree: usize,
    pub min_degree: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConnectivityMetrics {
    pub is_connected: bool,
    pub connected_components: usize,
    pub largest_component_size: usize,
    pub weakly_connected_components: usize,
    pub strongly_connected_components: usize,
}

/// `None` means the value could not be computed
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PathMetrics {
    pub diameter: Option<usize>,
    pub average_path_length: Option<f64>,
    pub radius: Option<usize>,
}

impl PathMetrics {
    pub fn zero() -> Self {
        Self {
            diameter: Some(0),
            average_path_length: Some(0.0),
            radius: Some(0),
        }
    }

    pub fn undefined() -> Self {
        Self::default()
    }
}

/// Per-entity scores; an empty map means the measure was not available
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CentralityMetrics {
    pub degree: BTreeMap<String, f64>,
    pub betweenness: BTreeMap<String, f64>,
    pub closeness: BTreeMap<String, f64>,
    pub eigenvector: BTreeMap<String, f64>,
    pub pagerank: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClusteringMetrics {
    pub clustering_coefficient: f64,
    pub transitivity: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StructuralIssues {
    pub isolated_nodes: Vec<String>,
    pub bridges: Vec<(String, String)>,
    pub articulation_points: Vec<String>,
    pub cycles: Vec<Vec<String>>,
    pub self_loops: Vec<String>,
}

/// Everything `analyze_comprehensive` knows about one graph
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StructuralMetrics {
    pub node_count: usize,
    pub edge_count: usize,
    pub density: f64,
    pub is_connected: bool,
    pub connected_components: usize,
    pub largest_component_size: usize,
    pub weakly_connected_components: usize,
    pub strongly_connected_components: usize,
    pub diameter: Option<usize>,
    pub average_path_length: Option<f64>,
    pub radius: Option<usize>,
    pub average_degree: f64,
    pub max_degree: usize,
    pub min_degree: usize,
    pub clustering_coefficient: f64,
    pub transitivity: f64,
    pub isolated_nodes: Vec<String>,
    pub bridges: Vec<(String, String)>,
    pub articulation_points: Vec<String>,
    pub cycles: Vec<Vec<String>>,
    pub self_loops: Vec<String>,
    pub centrality: CentralityMetrics,
    pub diagnostics: Vec<Diagnostic>,
}

impl StructuralMetrics {
    pub fn compose(
        basic: BasicMetrics,
        connectivity: ConnectivityMetrics,
        paths: PathMetrics,
        centrality: CentralityMetrics,
        clustering: ClusteringMetrics,
        issues: StructuralIssues,
        diagnostics: Vec<Diagnostic>,
    ) -> Self {
        Self {
            node_count: basic.node_count,
            edge_count: basic.edge_count,
            density: basic.density,
            is_connected: connectivity.is_connected,
            connected_components: connectivity.connected_components,
            largest_component_size: connectivity.largest_component_size,
            weakly_connected_components: connectivity.weakly_connected_components,
            strongly_connected_components: connectivity.strongly_connected_components,
            diameter: paths.diameter,
            average_path_length: paths.average_path_length,
            radius: paths.radius,
            average_degree: basic.average_degree,
            max_degree: basic.max_degree,
            min_degree: basic.min_degree,
            clustering_coefficient: clustering.clustering_coefficient,
            transitivity: clustering.transitivity,
            isolated_nodes: issues.isolated_nodes,
            bridges: issues.bridges,
            articulation_points: issues.articulation_points,
            cycles: issues.cycles,
            self_loops: issues.self_loops,
            centrality,
            diagnostics,
        }
    }
}

/// Deltas between two analyses, see `StructuralAnalyzer::compare_structures`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StructureComparison {
    pub node_count_change: i64,
    pub edge_count_change: i64,
    pub density_change: f64,
    pub connectivity_changed: bool,
    pub component_change: i64,
    pub new_isolated_nodes: Vec<String>,
    pub resolved_isolated_nodes: Vec<String>,
    /// Metric name -> relative change, only entries above tolerance
    pub significant_changes: BTreeMap<String, f64>,
    pub stability_score: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_undefined_paths_serialize_as_null() {
        let metrics = StructuralMetrics {
            diagnostics: vec![Diagnostic::new("path_metrics", "no BFS sources allowed")],
            ..Default::default()
        };

        let json = serde_json::to_value(&metrics).unwrap();
        assert!(json["diameter"].is_null());
        assert_eq!(json["diagnostics"][0]["metric"], "path_metrics");

        let back: StructuralMetrics = serde_json::from_value(json).unwrap();
        assert_eq!(back, metrics);
    }
}
