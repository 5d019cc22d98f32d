use std::collections::VecDeque;

use crate::error::{Result, StructureError};
use crate::graph::UndirectedView;
use crate::metrics::PathMetrics;

/// Hop distances from `source`; `None` for unreachable nodes
pub(crate) fn bfs_distances<F, I>(
    node_count: usize,
    source: usize,
    mut neighbors: F,
) -> Vec<Option<usize>>
where
    F: FnMut(usize) -> I,
    I: IntoIterator<Item = usize>,
{
    let mut distances = vec![None; node_count];
    let mut queue = VecDeque::new();
    distances[source] = Some(0);
    queue.push_back(source);

    while let Some(node) = queue.pop_front() {
        let next = distances[node].map_or(0, |d| d + 1);
        for neighbor in neighbors(node) {
            if distances[neighbor].is_none() {
                distances[neighbor] = Some(next);
                queue.push_back(neighbor);
            }
        }
    }

    distances
}

/// Diameter, average shortest path and radius over the largest component.
///
/// Components larger than `max_samples` use evenly spaced BFS sources, so the
/// values are estimates there. A cap of zero sources is a `PathComputation`
/// error once there is a component to measure.
pub(crate) fn path_metrics(view: &UndirectedView, max_samples: usize) -> Result<PathMetrics> {
    if view.node_count() <= 1 {
        return Ok(PathMetrics::zero());
    }

    let component = view.largest_component();
    if component.len() <= 1 {
        return Ok(PathMetrics::zero());
    }

    if max_samples == 0 {
        return Err(StructureError::PathComputation(format!(
            "no BFS sources allowed for a component of {} nodes",
            component.len()
        )));
    }

    let step = component.len().div_ceil(max_samples);
    let mut diameter = 0;
    let mut radius = usize::MAX;
    let mut total_distance = 0usize;
    let mut pairs = 0usize;

    for &source in component.iter().step_by(step) {
        let distances = bfs_distances(view.node_count(), source, |node| {
            view.neighbors(node).iter().copied()
        });
        let reached: Vec<usize> = distances.iter().flatten().copied().collect();

        let eccentricity = reached.iter().copied().max().unwrap_or(0);
        diameter = diameter.max(eccentricity);
        radius = radius.min(eccentricity);
        total_distance += reached.iter().sum::<usize>();
        pairs += reached.len().saturating_sub(1);
    }

    // Every source in a component of two or more nodes reaches a neighbor
    Ok(PathMetrics {
        diameter: Some(diameter),
        average_path_length: Some(total_distance as f64 / pairs.max(1) as f64),
        radius: Some(radius),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::KnowledgeGraph;
    use extract::{Entity, Relationship};

    fn path_graph(ids: &[&str]) -> KnowledgeGraph {
        let entities: Vec<Entity> = ids.iter().map(|id| Entity::new(*id, "Concept")).collect();
        let relationships: Vec<Relationship> = ids
            .windows(2)
            .map(|pair| Relationship::new(pair[0], pair[1], "next"))
            .collect();
        KnowledgeGraph::from_snapshot(&entities, &relationships)
    }

    #[test]
    fn test_path_of_four() {
        let metrics = path_metrics(&path_graph(&["A", "B", "C", "D"]).undirected(), 100).unwrap();

        assert_eq!(metrics.diameter, Some(3));
        assert_eq!(metrics.radius, Some(2));
        // 2 * (1+2+3+1+2+1) / 12
        assert!((metrics.average_path_length.unwrap() - 20.0 / 12.0).abs() < 1e-9);
    }

    #[test]
    fn test_single_node_is_zero() {
        let metrics = path_metrics(&path_graph(&["A"]).undirected(), 100).unwrap();
        assert_eq!(metrics, PathMetrics::zero());
    }

    #[test]
    fn test_uses_largest_component() {
        let mut graph = path_graph(&["A", "B", "C"]);
        graph.add_entity(Entity::new("X", "Concept"));
        graph.add_entity(Entity::new("Y", "Concept"));
        graph.add_relationship(Relationship::new("X", "Y", "next"));

        let metrics = path_metrics(&graph.undirected(), 100).unwrap();
        assert_eq!(metrics.diameter, Some(2));
    }

    #[test]
    fn test_sampling_bounds_sources() {
        let ids: Vec<String> = (0..50).map(|i| format!("N{i}")).collect();
        let refs: Vec<&str> = ids.iter().map(String::as_str).collect();
        let metrics = path_metrics(&path_graph(&refs).undirected(), 5).unwrap();

        // First sample is an endpoint, so the true diameter is still found
        assert_eq!(metrics.diameter, Some(49));
        assert!(metrics.average_path_length.unwrap() > 0.0);
    }

    #[test]
    fn test_zero_sample_cap_fails() {
        let view = path_graph(&["A", "B"]).undirected();
        assert!(matches!(path_metrics(&view, 0), Err(StructureError::PathComputation(_))));
        // Nothing to measure, so no sources are needed
        assert_eq!(path_metrics(&path_graph(&["A"]).undirected(), 0).unwrap(), PathMetrics::zero());
    }
}
