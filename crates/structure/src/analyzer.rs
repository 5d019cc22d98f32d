use extract::{Entity, Relationship};
use tracing::{debug, warn};

use crate::centrality;
use crate::clustering;
use crate::config::AnalyzerConfig;
use crate::connectivity;
use crate::graph::{KnowledgeGraph, UndirectedView};
use crate::metrics::{
    BasicMetrics, CentralityMetrics, ClusteringMetrics, ConnectivityMetrics, Diagnostic,
    PathMetrics,
    StructuralIssues, StructuralMetrics,
};
use crate::paths;

/// Stateless structural analysis of a `KnowledgeGraph`.
///
/// Algorithms that can fail on pathological input (path metrics, eigenvector
/// centrality, PageRank) never abort the analysis: they degrade to an
/// undefined/empty value and push a `Diagnostic`.
#[derive(Debug, Clone, Default)]
pub struct StructuralAnalyzer {
    config: AnalyzerConfig,
}

impl StructuralAnalyzer {
    pub fn new(config: AnalyzerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    /// Build the graph for a raw snapshot and analyze it
    pub fn analyze(
        &self,
        entities: &[Entity],
        relationships: &[Relationship],
    ) -> StructuralMetrics {
        self.analyze_comprehensive(&KnowledgeGraph::from_snapshot(entities, relationships))
    }

    pub fn analyze_comprehensive(&self, graph: &KnowledgeGraph) -> StructuralMetrics {
        let view = graph.undirected();
        let mut diagnostics = Vec::new();

        let basic = basic_from_view(graph, &view);
        let connectivity = connectivity_from_view(graph, &view);
        let paths = self.paths_from_view(&view, &mut diagnostics);
        let centrality = self.centrality_metrics(graph, &mut diagnostics);
        let clustering = clustering::clustering_metrics(&view);
        let issues = self.issues_from_view(graph, &view);

        debug!(
            nodes = basic.node_count,
            edges = basic.edge_count,
            components = connectivity.connected_components,
            diagnostics = diagnostics.len(),
            "Structural analysis complete"
        );

        StructuralMetrics::compose(
            basic,
            connectivity,
            paths,
            centrality,
            clustering,
            issues,
            diagnostics,
        )
    }

    pub fn basic_metrics(&self, graph: &KnowledgeGraph) -> BasicMetrics {
        basic_from_view(graph, &graph.undirected())
    }

    pub fn connectivity_metrics(&self, graph: &KnowledgeGraph) -> ConnectivityMetrics {
        connectivity_from_view(graph, &graph.undirected())
    }

    pub fn path_metrics(
        &self,
        graph: &KnowledgeGraph,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> PathMetrics {
        self.paths_from_view(&graph.undirected(), diagnostics)
    }

    pub fn centrality_metrics(
        &self,
        graph: &KnowledgeGraph,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> CentralityMetrics {
        let eigenvector = centrality::eigenvector_centrality(
            graph,
            self.config.eigenvector_max_iter,
            self.config.eigenvector_tolerance,
        )
        .unwrap_or_else(|e| {
            warn!(measure = "eigenvector", error = %e, "Centrality unavailable");
            diagnostics.push(Diagnostic::new("eigenvector_centrality", e.to_string()));
            Default::default()
        });

        let pagerank = centrality::pagerank(
            graph,
            self.config.pagerank_damping,
            self.config.pagerank_max_iter,
            self.config.pagerank_tolerance,
        )
        .unwrap_or_else(|e| {
            warn!(measure = "pagerank", error = %e, "Centrality unavailable");
            diagnostics.push(Diagnostic::new("pagerank", e.to_string()));
            Default::default()
        });

        CentralityMetrics {
            degree: centrality::degree_centrality(graph),
            betweenness: centrality::betweenness_centrality(graph),
            closeness: centrality::closeness_centrality(graph),
            eigenvector,
            pagerank,
        }
    }

    pub fn clustering_metrics(&self, graph: &KnowledgeGraph) -> ClusteringMetrics {
        clustering::clustering_metrics(&graph.undirected())
    }

    pub fn structural_issues(&self, graph: &KnowledgeGraph) -> StructuralIssues {
        self.issues_from_view(graph, &graph.undirected())
    }

    fn paths_from_view(
        &self,
        view: &UndirectedView,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> PathMetrics {
        paths::path_metrics(view, self.config.max_path_samples).unwrap_or_else(|e| {
            warn!(error = %e, "Path metrics unavailable");
            diagnostics.push(Diagnostic::new("path_metrics", e.to_string()));
            PathMetrics::undefined()
        })
    }

    fn issues_from_view(&self, graph: &KnowledgeGraph, view: &UndirectedView) -> StructuralIssues {
        let ids = |nodes: Vec<usize>| -> Vec<String> {
            nodes.into_iter().map(|idx| graph.id(idx).to_string()).collect()
        };
        let cuts = connectivity::cut_structure(view);

        StructuralIssues {
            isolated_nodes: ids(connectivity::isolated_nodes(view)),
            bridges: cuts
                .bridges
                .into_iter()
                .map(|(a, b)| (graph.id(a).to_string(), graph.id(b).to_string()))
                .collect(),
            articulation_points: ids(cuts.articulation_points),
            cycles: connectivity::simple_cycles(graph, self.config.max_cycles)
                .into_iter()
                .map(ids)
                .collect(),
            self_loops: ids(connectivity::self_loops(view)),
        }
    }
}

fn basic_from_view(graph: &KnowledgeGraph, view: &UndirectedView) -> BasicMetrics {
    let n = graph.node_count();
    let e = graph.edge_count();
    let degrees: Vec<usize> = (0..n).map(|idx| view.degree(idx)).collect();

    let density = if n < 2 {
        0.0
    } else {
        (e as f64 / (n * (n - 1)) as f64).min(1.0)
    };

    BasicMetrics {
        node_count: n,
        edge_count: e,
        density,
        average_degree: if n == 0 {
            0.0
        } else {
            degrees.iter().sum::<usize>() as f64 / n as f64
        },
        max_degree: degrees.iter().copied().max().unwrap_or(0),
        min_degree: degrees.iter().copied().min().unwrap_or(0),
    }
}

fn connectivity_from_view(graph: &KnowledgeGraph, view: &UndirectedView) -> ConnectivityMetrics {
    if graph.is_empty() {
        return ConnectivityMetrics::default();
    }

    let components = view.component_count();
    ConnectivityMetrics {
        is_connected: components == 1,
        connected_components: components,
        largest_component_size: view.largest_component().len(),
        weakly_connected_components: petgraph::algo::connected_components(graph.inner()),
        strongly_connected_components: petgraph::algo::kosaraju_scc(graph.inner()).len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entities(ids: &[&str]) -> Vec<Entity> {
        ids.iter().map(|id| Entity::new(*id, "Concept")).collect()
    }

    #[test]
    fn test_empty_graph() {
        let metrics = StructuralAnalyzer::default().analyze(&[], &[]);

        assert_eq!(metrics.node_count, 0);
        assert_eq!(metrics.density, 0.0);
        assert!(!metrics.is_connected);
        assert_eq!(metrics.connected_components, 0);
        assert_eq!(metrics.diameter, Some(0));
        assert_eq!(metrics.clustering_coefficient, 0.0);
        assert!(metrics.diagnostics.is_empty());
    }

    #[test]
    fn test_single_isolated_node() {
        let metrics = StructuralAnalyzer::default().analyze(&entities(&["X"]), &[]);

        assert!(metrics.is_connected);
        assert_eq!(metrics.connected_components, 1);
        assert_eq!(metrics.isolated_nodes, vec!["X".to_string()]);
        assert_eq!(metrics.density, 0.0);
        assert_eq!(metrics.average_path_length, Some(0.0));
    }

    #[test]
    fn test_edgeless_graph_has_zero_density() {
        let metrics = StructuralAnalyzer::default().analyze(&entities(&["A", "B", "C"]), &[]);

        assert_eq!(metrics.density, 0.0);
        assert_eq!(metrics.connected_components, 3);
        assert_eq!(metrics.largest_component_size, 1);
        assert_eq!(metrics.isolated_nodes.len(), 3);
    }

    #[test]
    fn test_connected_path() {
        let relationships = vec![
            Relationship::new("A", "B", "leads"),
            Relationship::new("B", "C", "owns"),
            Relationship::new("C", "Missing", "owns"),
        ];
        let metrics =
            StructuralAnalyzer::default().analyze(&entities(&["A", "B", "C"]), &relationships);

        assert_eq!(metrics.edge_count, 2);
        assert!((metrics.density - 2.0 / 6.0).abs() < 1e-9);
        assert!(metrics.is_connected);
        assert_eq!(metrics.weakly_connected_components, 1);
        assert_eq!(metrics.strongly_connected_components, 3);
        assert_eq!(metrics.diameter, Some(2));
        assert_eq!(metrics.max_degree, 2);
        assert_eq!(metrics.min_degree, 1);
        assert_eq!(metrics.articulation_points, vec!["B".to_string()]);
        assert_eq!(metrics.bridges.len(), 2);
        assert!(metrics.cycles.is_empty());
    }

    #[test]
    fn test_non_convergence_degrades_to_empty() {
        let analyzer = StructuralAnalyzer::new(AnalyzerConfig {
            eigenvector_max_iter: 1,
            pagerank_max_iter: 1,
            ..Default::default()
        });
        let relationships = vec![Relationship::new("A", "B", "leads")];
        let metrics = analyzer.analyze(&entities(&["A", "B"]), &relationships);

        assert!(metrics.centrality.eigenvector.is_empty());
        assert!(metrics.centrality.pagerank.is_empty());
        assert_eq!(metrics.centrality.degree.len(), 2);
        assert_eq!(metrics.diagnostics.len(), 2);
        assert_eq!(metrics.diagnostics[1].metric, "pagerank");
    }

    #[test]
    fn test_self_loop_and_cycle_reported() {
        let relationships = vec![
            Relationship::new("A", "A", "references"),
            Relationship::new("A", "B", "leads"),
            Relationship::new("B", "A", "reports to"),
        ];
        let metrics = StructuralAnalyzer::default().analyze(&entities(&["A", "B"]), &relationships);

        assert_eq!(metrics.self_loops, vec!["A".to_string()]);
        assert_eq!(metrics.cycles.len(), 2);
        assert!(metrics.isolated_nodes.is_empty());
    }

    #[test]
    fn test_path_failure_leaves_paths_undefined() {
        let analyzer = StructuralAnalyzer::new(AnalyzerConfig {
            max_path_samples: 0,
            ..Default::default()
        });
        let relationships = vec![
            Relationship::new("A", "B", "leads"),
            Relationship::new("B", "C", "leads"),
            Relationship::new("C", "A", "leads"),
        ];
        let metrics = analyzer.analyze(&entities(&["A", "B", "C"]), &relationships);

        assert_eq!(metrics.diameter, None);
        assert_eq!(metrics.average_path_length, None);
        assert_eq!(metrics.radius, None);
        assert_eq!(metrics.diagnostics.len(), 1);
        assert_eq!(metrics.diagnostics[0].metric, "path_metrics");
        assert_eq!(metrics.node_count, 3);
        assert!(metrics.is_connected);
    }

    #[test]
    fn test_long_ring_issues_and_connectivity() {
        let ids: Vec<String> = (0..20_000).map(|i| format!("N{i}")).collect();
        let refs: Vec<&str> = ids.iter().map(String::as_str).collect();
        let mut relationships: Vec<Relationship> = refs
            .windows(2)
            .map(|pair| Relationship::new(pair[0], pair[1], "next"))
            .collect();
        relationships.push(Relationship::new(refs[19_999], refs[0], "next"));
        let graph = KnowledgeGraph::from_snapshot(&entities(&refs), &relationships);
        let analyzer = StructuralAnalyzer::default();

        let issues = analyzer.structural_issues(&graph);
        assert_eq!(issues.cycles.len(), 1);
        assert!(issues.bridges.is_empty());
        assert!(issues.articulation_points.is_empty());

        let connectivity = analyzer.connectivity_metrics(&graph);
        assert!(connectivity.is_connected);
        assert_eq!(connectivity.strongly_connected_components, 1);
    }
}
