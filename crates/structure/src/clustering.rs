use crate::graph::UndirectedView;
use crate::metrics::ClusteringMetrics;

/// Ordered neighbor pairs of `node` that are themselves connected
fn closed_pairs(view: &UndirectedView, node: usize) -> usize {
    let neighbors = view.neighbors(node);
    neighbors
        .iter()
        .map(|&a| {
            neighbors
                .iter()
                .filter(|&&b| b != a && view.neighbors(a).binary_search(&b).is_ok())
                .count()
        })
        .sum()
}

/// Average local clustering and global transitivity. Self-loops are ignored
/// and nodes with fewer than two neighbors contribute 0 to the average.
pub(crate) fn clustering_metrics(view: &UndirectedView) -> ClusteringMetrics {
    let n = view.node_count();
    if n == 0 {
        return ClusteringMetrics::default();
    }

    let mut local_sum = 0.0;
    let mut closed_total = 0usize;
    let mut triads_total = 0usize;

    for node in 0..n {
        let k = view.neighbors(node).len();
        let closed = closed_pairs(view, node);
        let triads = k * k.saturating_sub(1);

        if triads > 0 {
            local_sum += closed as f64 / triads as f64;
        }
        closed_total += closed;
        triads_total += triads;
    }

    ClusteringMetrics {
        clustering_coefficient: local_sum / n as f64,
        transitivity: if closed_total == 0 {
            0.0
        } else {
            closed_total as f64 / triads_total as f64
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::KnowledgeGraph;
    use extract::{Entity, Relationship};

    fn view(ids: &[&str], edges: &[(&str, &str)]) -> UndirectedView {
        let entities: Vec<Entity> = ids.iter().map(|id| Entity::new(*id, "Concept")).collect();
        let relationships: Vec<Relationship> = edges
            .iter()
            .map(|(s, t)| Relationship::new(*s, *t, ""))
            .collect();
        KnowledgeGraph::from_snapshot(&entities, &relationships).undirected()
    }

    #[test]
    fn test_triangle_is_fully_clustered() {
        let triangle = view(&["A", "B", "C"], &[("A", "B"), ("B", "C"), ("C", "A")]);
        let metrics = clustering_metrics(&triangle);
        assert_eq!(metrics.clustering_coefficient, 1.0);
        assert_eq!(metrics.transitivity, 1.0);
    }

    #[test]
    fn test_triangle_with_tail() {
        let metrics = clustering_metrics(&view(
            &["A", "B", "C", "D"],
            &[("A", "B"), ("B", "C"), ("C", "A"), ("C", "D")],
        ));

        // A=1, B=1, C=1/3, D=0
        assert!((metrics.clustering_coefficient - (7.0 / 3.0) / 4.0).abs() < 1e-9);
        // 3 triangles-through-node * 2 / (2 + 2 + 6)
        assert!((metrics.transitivity - 0.6).abs() < 1e-9);
    }

    #[test]
    fn test_empty_and_edgeless() {
        assert_eq!(clustering_metrics(&view(&[], &[])), ClusteringMetrics::default());
        assert_eq!(clustering_metrics(&view(&["A", "B"], &[])).transitivity, 0.0);
    }
}
