use std::collections::{BTreeMap, VecDeque};

use crate::error::{Result, StructureError};
use crate::graph::KnowledgeGraph;
use crate::paths::bfs_distances;

type Scores = BTreeMap<String, f64>;

fn keyed(graph: &KnowledgeGraph, values: Vec<f64>) -> Scores {
    values
        .into_iter()
        .enumerate()
        .map(|(idx, value)| (graph.id(idx).to_string(), value))
        .collect()
}

/// (in + out) degree over `n - 1`
pub(crate) fn degree_centrality(graph: &KnowledgeGraph) -> Scores {
    let n = graph.node_count();
    if n == 0 {
        return Scores::new();
    }
    if n == 1 {
        return keyed(graph, vec![1.0]);
    }

    let scale = 1.0 / (n - 1) as f64;
    let values = (0..n)
        .map(|idx| (graph.successors(idx).len() + graph.predecessors(idx).len()) as f64 * scale)
        .collect();
    keyed(graph, values)
}

/// Brandes' algorithm on the directed graph, normalized by `(n-1)(n-2)`
pub(crate) fn betweenness_centrality(graph: &KnowledgeGraph) -> Scores {
    let n = graph.node_count();
    let successors: Vec<Vec<usize>> = (0..n)
        .map(|idx| graph.successors(idx).into_iter().filter(|&s| s != idx).collect())
        .collect();
    let mut betweenness = vec![0.0; n];

    for source in 0..n {
        let mut stack = Vec::with_capacity(n);
        let mut predecessors: Vec<Vec<usize>> = vec![Vec::new(); n];
        let mut sigma = vec![0.0; n];
        let mut distance: Vec<Option<usize>> = vec![None; n];
        sigma[source] = 1.0;
        distance[source] = Some(0);

        let mut queue = VecDeque::from([source]);
        while let Some(v) = queue.pop_front() {
            stack.push(v);
            let dv = distance[v].unwrap_or(0);
            for &w in &successors[v] {
                if distance[w].is_none() {
                    distance[w] = Some(dv + 1);
                    queue.push_back(w);
                }
                if distance[w] == Some(dv + 1) {
                    sigma[w] += sigma[v];
                    predecessors[w].push(v);
                }
            }
        }

        let mut delta = vec![0.0; n];
        while let Some(w) = stack.pop() {
            for &v in &predecessors[w] {
                delta[v] += sigma[v] / sigma[w] * (1.0 + delta[w]);
            }
            if w != source {
                betweenness[w] += delta[w];
            }
        }
    }

    if n > 2 {
        let scale = 1.0 / ((n - 1) * (n - 2)) as f64;
        betweenness.iter_mut().for_each(|b| *b *= scale);
    }
    keyed(graph, betweenness)
}

/// Closeness over incoming distances, scaled by the reachable fraction
/// (Wasserman and Faust) so partially reachable nodes are comparable.
pub(crate) fn closeness_centrality(graph: &KnowledgeGraph) -> Scores {
    let n = graph.node_count();
    let predecessors: Vec<Vec<usize>> = (0..n).map(|idx| graph.predecessors(idx)).collect();

    let values = (0..n)
        .map(|target| {
            let distances = bfs_distances(n, target, |node| predecessors[node].iter().copied());
            let reached: Vec<usize> = distances.iter().flatten().copied().collect();
            let total: usize = reached.iter().sum();
            let others = reached.len() - 1;

            if total == 0 || n <= 1 {
                return 0.0;
            }
            (others as f64 / total as f64) * (others as f64 / (n - 1) as f64)
        })
        .collect();
    keyed(graph, values)
}

/// Power iteration on `x + Aᵀx` starting from the uniform vector
pub(crate) fn eigenvector_centrality(
    graph: &KnowledgeGraph,
    max_iter: usize,
    tolerance: f64,
) -> Result<Scores> {
    let n = graph.node_count();
    if n == 0 {
        return Ok(Scores::new());
    }

    let edges: Vec<(usize, usize)> = graph.edges().collect();
    let mut x = vec![1.0 / n as f64; n];

    for _ in 0..max_iter {
        let last = x.clone();
        for &(source, target) in &edges {
            x[target] += last[source];
        }

        let norm = x.iter().map(|v| v * v).sum::<f64>().sqrt();
        let norm = if norm == 0.0 { 1.0 } else { norm };
        x.iter_mut().for_each(|v| *v /= norm);

        let change: f64 = x.iter().zip(&last).map(|(a, b)| (a - b).abs()).sum();
        if change < n as f64 * tolerance {
            return Ok(keyed(graph, x));
        }
    }

    Err(StructureError::NonConvergence {
        measure: "eigenvector",
        iterations: max_iter,
    })
}

/// PageRank with uniform teleport; dangling mass is spread uniformly
pub(crate) fn pagerank(
    graph: &KnowledgeGraph,
    damping: f64,
    max_iter: usize,
    tolerance: f64,
) -> Result<Scores> {
    let n = graph.node_count();
    if n == 0 {
        return Ok(Scores::new());
    }

    let successors: Vec<Vec<usize>> = (0..n).map(|idx| graph.successors(idx)).collect();
    let dangling: Vec<usize> = (0..n).filter(|&idx| successors[idx].is_empty()).collect();
    let uniform = 1.0 / n as f64;
    let mut x = vec![uniform; n];

    for _ in 0..max_iter {
        let last = x.clone();
        let dangle_sum = damping * dangling.iter().map(|&idx| last[idx]).sum::<f64>();
        x = vec![dangle_sum * uniform + (1.0 - damping) * uniform; n];

        for (source, targets) in successors.iter().enumerate() {
            let share = damping * last[source] / targets.len().max(1) as f64;
            for &target in targets {
                x[target] += share;
            }
        }

        let change: f64 = x.iter().zip(&last).map(|(a, b)| (a - b).abs()).sum();
        if change < n as f64 * tolerance {
            return Ok(keyed(graph, x));
        }
    }

    Err(StructureError::NonConvergence {
        measure: "pagerank",
        iterations: max_iter,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use extract::{Entity, Relationship};

    fn graph(ids: &[&str], edges: &[(&str, &str)]) -> KnowledgeGraph {
        let entities: Vec<Entity> = ids.iter().map(|id| Entity::new(*id, "Concept")).collect();
        let relationships: Vec<Relationship> = edges
            .iter()
            .map(|(s, t)| Relationship::new(*s, *t, "related"))
            .collect();
        KnowledgeGraph::from_snapshot(&entities, &relationships)
    }

    #[test]
    fn test_degree_centrality_star() {
        let g = graph(&["hub", "a", "b", "c"], &[("hub", "a"), ("hub", "b"), ("hub", "c")]);
        let scores = degree_centrality(&g);

        assert_eq!(scores["hub"], 1.0);
        assert!((scores["a"] - 1.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_betweenness_directed_path() {
        let g = graph(&["A", "B", "C"], &[("A", "B"), ("B", "C")]);
        let scores = betweenness_centrality(&g);

        // Only A->C passes through B; normalized by (n-1)(n-2) = 2
        assert!((scores["B"] - 0.5).abs() < 1e-9);
        assert_eq!(scores["A"], 0.0);
        assert_eq!(scores["C"], 0.0);
    }

    #[test]
    fn test_closeness_uses_incoming_distances() {
        let g = graph(&["A", "B", "C"], &[("A", "B"), ("B", "C")]);
        let scores = closeness_centrality(&g);

        assert_eq!(scores["A"], 0.0);
        // C is reached from B (1) and A (2): (2/3) * (2/2)
        assert!((scores["C"] - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_pagerank_sums_to_one() {
        let g = graph(&["A", "B", "C"], &[("A", "B"), ("B", "C"), ("C", "A")]);
        let scores = pagerank(&g, 0.85, 100, 1e-6).unwrap();

        let total: f64 = scores.values().sum();
        assert!((total - 1.0).abs() < 1e-6);
        assert!((scores["A"] - 1.0 / 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_pagerank_iteration_cap() {
        let g = graph(&["A", "B"], &[("A", "B")]);
        let result = pagerank(&g, 0.85, 1, 1e-12);
        assert!(matches!(result, Err(StructureError::NonConvergence { measure: "pagerank", .. })));
    }

    #[test]
    fn test_eigenvector_cycle_converges() {
        let g = graph(&["A", "B", "C"], &[("A", "B"), ("B", "C"), ("C", "A")]);
        let scores = eigenvector_centrality(&g, 100, 1e-6).unwrap();

        assert!((scores["A"] - scores["B"]).abs() < 1e-9);
    }

    #[test]
    fn test_eigenvector_dag_does_not_converge() {
        let g = graph(&["A", "B"], &[("A", "B")]);
        assert!(eigenvector_centrality(&g, 100, 1e-6).is_err());
    }

    #[test]
    fn test_eigenvector_empty_graph() {
        assert!(eigenvector_centrality(&KnowledgeGraph::new(), 100, 1e-6).unwrap().is_empty());
    }
}
