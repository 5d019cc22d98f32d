use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use tracing::info;

use crate::analyzer::StructuralAnalyzer;
use crate::error::{Result, StructureError};
use crate::graph::{KnowledgeGraph, UndirectedView};
use crate::louvain::{LouvainDetector, renumber};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommunityAlgorithm {
    Louvain,
    LabelPropagation,
    ConnectedComponents,
}

impl CommunityAlgorithm {
    pub const ALL: [CommunityAlgorithm; 3] = [
        CommunityAlgorithm::Louvain,
        CommunityAlgorithm::LabelPropagation,
        CommunityAlgorithm::ConnectedComponents,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            CommunityAlgorithm::Louvain => "louvain",
            CommunityAlgorithm::LabelPropagation => "label_propagation",
            CommunityAlgorithm::ConnectedComponents => "connected_components",
        }
    }
}

impl fmt::Display for CommunityAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for CommunityAlgorithm {
    type Err = StructureError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|algorithm| algorithm.name() == wanted)
            .ok_or_else(|| StructureError::UnsupportedAlgorithm {
                name: s.to_string(),
                supported: Self::ALL.map(|a| a.name()).join(", "),
            })
    }
}

/// Partition of the undirected projection into communities
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Communities {
    pub algorithm: CommunityAlgorithm,
    /// Entity id -> community index in `0..community_count`
    pub assignments: BTreeMap<String, usize>,
    pub community_count: usize,
    pub modularity: f64,
}

impl Communities {
    pub fn members(&self, community: usize) -> Vec<&str> {
        self.assignments
            .iter()
            .filter(|&(_, &c)| c == community)
            .map(|(id, _)| id.as_str())
            .collect()
    }
}

impl StructuralAnalyzer {
    /// Run the named community detection algorithm. Unknown names fail with
    /// `StructureError::UnsupportedAlgorithm`.
    pub fn detect_communities(
        &self,
        graph: &KnowledgeGraph,
        algorithm: &str,
    ) -> Result<Communities> {
        let algorithm: CommunityAlgorithm = algorithm.parse()?;
        let view = graph.undirected();

        let labels = match algorithm {
            CommunityAlgorithm::Louvain => {
                LouvainDetector::new(&view, self.config().community_max_iterations)
                    .detect_communities()
            }
            CommunityAlgorithm::LabelPropagation => label_propagation(
                &view,
                self.config().community_max_iterations,
                self.config().label_propagation_seed,
            ),
            CommunityAlgorithm::ConnectedComponents => component_labels(&view),
        };

        let community_count = labels.iter().copied().max().map_or(0, |max| max + 1);
        let modularity = modularity(&view, &labels);

        info!(
            algorithm = %algorithm,
            communities = community_count,
            modularity,
            "Detected communities"
        );

        Ok(Communities {
            algorithm,
            assignments: labels
                .iter()
                .enumerate()
                .map(|(idx, &label)| (graph.id(idx).to_string(), label))
                .collect(),
            community_count,
            modularity,
        })
    }
}

/// Asynchronous label propagation. Visit order is shuffled with a seeded RNG
/// each round; ties keep the current label, otherwise the smallest wins.
fn label_propagation(view: &UndirectedView, max_iterations: usize, seed: u64) -> Vec<usize> {
    let n = view.node_count();
    let mut labels: Vec<usize> = (0..n).collect();
    let mut order: Vec<usize> = (0..n).collect();
    let mut rng = StdRng::seed_from_u64(seed);

    for _ in 0..max_iterations {
        order.shuffle(&mut rng);
        let mut changed = false;

        for &node in &order {
            let mut counts: BTreeMap<usize, usize> = BTreeMap::new();
            for &neighbor in view.neighbors(node) {
                *counts.entry(labels[neighbor]).or_insert(0) += 1;
            }
            let Some(&best_count) = counts.values().max() else {
                continue;
            };

            let current = labels[node];
            if counts.get(&current) == Some(&best_count) {
                continue;
            }
            if let Some((&label, _)) = counts.iter().find(|&(_, &count)| count == best_count) {
                labels[node] = label;
                changed = true;
            }
        }

        if !changed {
            break;
        }
    }

    renumber(&labels)
}

fn component_labels(view: &UndirectedView) -> Vec<usize> {
    let mut labels = vec![0; view.node_count()];
    for (label, component) in view.components().into_iter().enumerate() {
        for node in component {
            labels[node] = label;
        }
    }
    labels
}

/// Newman modularity of a partition; 0 for graphs without edges
pub(crate) fn modularity(view: &UndirectedView, labels: &[usize]) -> f64 {
    let edges = view.edges();
    let m = edges.len() as f64;
    if m == 0.0 {
        return 0.0;
    }

    let community_count = labels.iter().copied().max().map_or(0, |max| max + 1);
    let mut internal = vec![0.0; community_count];
    let mut degree_sum = vec![0.0; community_count];

    for &(a, b) in &edges {
        if labels[a] == labels[b] {
            internal[labels[a]] += 1.0;
        }
    }
    for (node, &label) in labels.iter().enumerate() {
        degree_sum[label] += view.neighbors(node).len() as f64;
    }

    internal
        .iter()
        .zip(&degree_sum)
        .map(|(l, d)| l / m - (d / (2.0 * m)).powi(2))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AnalyzerConfig;
    use extract::{Entity, Relationship};

    fn graph(ids: &[&str], edges: &[(&str, &str)]) -> KnowledgeGraph {
        let entities: Vec<Entity> = ids.iter().map(|id| Entity::new(*id, "Concept")).collect();
        let relationships: Vec<Relationship> = edges
            .iter()
            .map(|(s, t)| Relationship::new(*s, *t, ""))
            .collect();
        KnowledgeGraph::from_snapshot(&entities, &relationships)
    }

    fn bridged_triangles() -> KnowledgeGraph {
        graph(
            &["A", "B", "C", "D", "E", "F"],
            &[("A", "B"), ("B", "C"), ("C", "A"), ("C", "D"), ("D", "E"), ("E", "F"), ("F", "D")],
        )
    }

    #[test]
    fn test_parse_algorithm_names() {
        assert_eq!("louvain".parse::<CommunityAlgorithm>().unwrap(), CommunityAlgorithm::Louvain);
        assert_eq!(
            " Label_Propagation ".parse::<CommunityAlgorithm>().unwrap(),
            CommunityAlgorithm::LabelPropagation
        );
    }

    #[test]
    fn test_unknown_algorithm_is_rejected() {
        let err = StructuralAnalyzer::default()
            .detect_communities(&bridged_triangles(), "girvan_newman")
            .unwrap_err();

        match err {
            StructureError::UnsupportedAlgorithm { name, supported } => {
                assert_eq!(name, "girvan_newman");
                assert!(supported.contains("louvain"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_louvain_splits_bridged_triangles() {
        let communities = StructuralAnalyzer::default()
            .detect_communities(&bridged_triangles(), "louvain")
            .unwrap();

        assert_eq!(communities.community_count, 2);
        assert_eq!(communities.members(0), vec!["A", "B", "C"]);
        // 2 * (3/7 - (7/14)^2)
        assert!((communities.modularity - 2.0 * (3.0 / 7.0 - 0.25)).abs() < 1e-9);
    }

    #[test]
    fn test_label_propagation_is_seeded() {
        let g = graph(
            &["A", "B", "C", "D", "E", "F"],
            &[("A", "B"), ("B", "C"), ("C", "A"), ("D", "E"), ("E", "F"), ("F", "D")],
        );
        let analyzer = StructuralAnalyzer::new(AnalyzerConfig {
            label_propagation_seed: 7,
            ..Default::default()
        });

        let first = analyzer.detect_communities(&g, "label_propagation").unwrap();
        let second = analyzer.detect_communities(&g, "label_propagation").unwrap();

        assert_eq!(first, second);
        assert_eq!(first.community_count, 2);
        assert_eq!(first.assignments["A"], first.assignments["C"]);
        assert_ne!(first.assignments["A"], first.assignments["D"]);
    }

    #[test]
    fn test_connected_components_partition() {
        let g = graph(&["A", "B", "C"], &[("A", "B")]);
        let communities = StructuralAnalyzer::default()
            .detect_communities(&g, "connected_components")
            .unwrap();

        assert_eq!(communities.community_count, 2);
        assert_eq!(communities.assignments["C"], 1);
    }

    #[test]
    fn test_empty_graph_has_no_communities() {
        let communities = StructuralAnalyzer::default()
            .detect_communities(&KnowledgeGraph::new(), "louvain")
            .unwrap();

        assert_eq!(communities.community_count, 0);
        assert_eq!(communities.modularity, 0.0);
    }
}
