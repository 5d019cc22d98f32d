use petgraph::algo::kosaraju_scc;
use petgraph::graph::NodeIndex;
use petgraph::visit::NodeFiltered;

use crate::graph::{KnowledgeGraph, UndirectedView};

/// Bridges and articulation points of the undirected projection from one
/// lowlink DFS.
pub(crate) struct CutStructure {
    pub bridges: Vec<(usize, usize)>,
    pub articulation_points: Vec<usize>,
}

/// A vertex on the lowlink DFS stack and the position of the next neighbor
/// to try
struct Frame {
    node: usize,
    parent: Option<usize>,
    cursor: usize,
}

pub(crate) fn cut_structure(view: &UndirectedView) -> CutStructure {
    let n = view.node_count();
    let mut discovery: Vec<Option<usize>> = vec![None; n];
    let mut low = vec![0; n];
    let mut is_cut = vec![false; n];
    let mut bridges = Vec::new();
    let mut timer = 0;
    let mut stack: Vec<Frame> = Vec::new();

    for root in 0..n {
        if discovery[root].is_some() {
            continue;
        }
        discovery[root] = Some(timer);
        low[root] = timer;
        timer += 1;
        let mut root_children = 0;
        stack.push(Frame {
            node: root,
            parent: None,
            cursor: 0,
        });

        while let Some(frame) = stack.last_mut() {
            let (node, parent) = (frame.node, frame.parent);

            if let Some(&next) = view.neighbors(node).get(frame.cursor) {
                frame.cursor += 1;
                if Some(next) == parent {
                    continue;
                }
                match discovery[next] {
                    Some(seen) => low[node] = low[node].min(seen),
                    None => {
                        if parent.is_none() {
                            root_children += 1;
                        }
                        discovery[next] = Some(timer);
                        low[next] = timer;
                        timer += 1;
                        stack.push(Frame {
                            node: next,
                            parent: Some(node),
                            cursor: 0,
                        });
                    }
                }
                continue;
            }

            stack.pop();
            let Some(parent) = parent else {
                continue;
            };
            low[parent] = low[parent].min(low[node]);

            let disc = discovery[parent].unwrap_or(0);
            if low[node] > disc {
                bridges.push((parent.min(node), parent.max(node)));
            }
            // Only the root frame is left below a child of the root
            if stack.len() > 1 && low[node] >= disc {
                is_cut[parent] = true;
            }
        }

        if root_children > 1 {
            is_cut[root] = true;
        }
    }

    bridges.sort_unstable();
    CutStructure {
        bridges,
        articulation_points: (0..n).filter(|&node| is_cut[node]).collect(),
    }
}

pub(crate) fn isolated_nodes(view: &UndirectedView) -> Vec<usize> {
    (0..view.node_count()).filter(|&node| view.degree(node) == 0).collect()
}

pub(crate) fn self_loops(view: &UndirectedView) -> Vec<usize> {
    (0..view.node_count()).filter(|&node| view.has_self_loop(node)).collect()
}

/// Johnson-style circuit search over the directed graph. Each cycle is
/// reported once, rotated to start at its lowest index. Stops at `limit`.
///
/// Every round searches only the strongly connected component holding the
/// least vertex that still lies on a cycle, with vertices below it removed.
pub(crate) fn simple_cycles(graph: &KnowledgeGraph, limit: usize) -> Vec<Vec<usize>> {
    let n = graph.node_count();
    let successors: Vec<Vec<usize>> = (0..n).map(|idx| graph.successors(idx)).collect();
    let mut search = CircuitSearch {
        successors: &successors,
        in_scope: vec![false; n],
        blocked: vec![false; n],
        blocked_by: vec![Vec::new(); n],
        cycles: Vec::new(),
        limit,
    };

    let mut lowest = 0;
    while lowest < n && !search.done() {
        let Some(component) = least_cyclic_component(graph, &successors, lowest) else {
            break;
        };
        let start = component.iter().copied().min().unwrap_or(lowest);

        search.in_scope.iter_mut().for_each(|s| *s = false);
        for &node in &component {
            search.in_scope[node] = true;
            search.blocked[node] = false;
            search.blocked_by[node].clear();
        }
        search.circuits_from(start);
        lowest = start + 1;
    }

    search.cycles
}

/// The strongly connected component of the subgraph induced by vertices
/// `>= lowest` that contains the smallest vertex lying on some cycle
fn least_cyclic_component(
    graph: &KnowledgeGraph,
    successors: &[Vec<usize>],
    lowest: usize,
) -> Option<Vec<usize>> {
    let remaining = NodeFiltered::from_fn(graph.inner(), |node: NodeIndex| node.index() >= lowest);

    kosaraju_scc(&remaining)
        .into_iter()
        .map(|component| component.into_iter().map(|node| node.index()).collect::<Vec<usize>>())
        .filter(|component| component.len() > 1 || successors[component[0]].contains(&component[0]))
        .min_by_key(|component| component.iter().copied().min().unwrap_or(usize::MAX))
}

struct CircuitSearch<'a> {
    successors: &'a [Vec<usize>],
    in_scope: Vec<bool>,
    blocked: Vec<bool>,
    blocked_by: Vec<Vec<usize>>,
    cycles: Vec<Vec<usize>>,
    limit: usize,
}

/// A vertex on the current path, the next successor to try, and whether a
/// circuit back to the start has been closed below it
struct PathFrame {
    node: usize,
    cursor: usize,
    found: bool,
}

impl CircuitSearch<'_> {
    fn done(&self) -> bool {
        self.cycles.len() >= self.limit
    }

    fn circuits_from(&mut self, start: usize) {
        let successors = self.successors;
        let mut path = vec![start];
        let mut stack = vec![PathFrame {
            node: start,
            cursor: 0,
            found: false,
        }];
        self.blocked[start] = true;

        while let Some(frame) = stack.last_mut() {
            if self.done() {
                return;
            }
            let node = frame.node;

            if let Some(&next) = successors[node].get(frame.cursor) {
                frame.cursor += 1;
                if !self.in_scope[next] {
                    continue;
                }
                if next == start {
                    self.cycles.push(path.clone());
                    frame.found = true;
                } else if !self.blocked[next] {
                    self.blocked[next] = true;
                    path.push(next);
                    stack.push(PathFrame {
                        node: next,
                        cursor: 0,
                        found: false,
                    });
                }
                continue;
            }

            let found = frame.found;
            stack.pop();
            path.pop();

            if found {
                self.unblock(node);
                if let Some(caller) = stack.last_mut() {
                    caller.found = true;
                }
            } else {
                for &next in &successors[node] {
                    if self.in_scope[next] && !self.blocked_by[next].contains(&node) {
                        self.blocked_by[next].push(node);
                    }
                }
            }
        }
    }

    fn unblock(&mut self, node: usize) {
        self.blocked[node] = false;
        let mut pending = vec![node];
        while let Some(current) = pending.pop() {
            for other in std::mem::take(&mut self.blocked_by[current]) {
                if self.blocked[other] {
                    self.blocked[other] = false;
                    pending.push(other);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use extract::{Entity, Relationship};

    fn graph(ids: &[&str], edges: &[(&str, &str)]) -> KnowledgeGraph {
        let entities: Vec<Entity> = ids.iter().map(|id| Entity::new(*id, "Concept")).collect();
        let relationships: Vec<Relationship> = edges
            .iter()
            .map(|(s, t)| Relationship::new(*s, *t, ""))
            .collect();
        KnowledgeGraph::from_snapshot(&entities, &relationships)
    }

    #[test]
    fn test_path_bridges_and_cut_vertices() {
        let g = graph(&["A", "B", "C"], &[("A", "B"), ("B", "C")]);
        let cuts = cut_structure(&g.undirected());

        assert_eq!(cuts.bridges, vec![(0, 1), (1, 2)]);
        assert_eq!(cuts.articulation_points, vec![1]);
    }

    #[test]
    fn test_triangle_has_no_cuts() {
        let g = graph(&["A", "B", "C"], &[("A", "B"), ("B", "C"), ("C", "A")]);
        let cuts = cut_structure(&g.undirected());

        assert!(cuts.bridges.is_empty());
        assert!(cuts.articulation_points.is_empty());
    }

    #[test]
    fn test_bowtie_articulation() {
        let g = graph(
            &["A", "B", "C", "D", "E"],
            &[("A", "B"), ("B", "C"), ("C", "A"), ("C", "D"), ("D", "E"), ("E", "C")],
        );
        let cuts = cut_structure(&g.undirected());

        assert!(cuts.bridges.is_empty());
        assert_eq!(cuts.articulation_points, vec![2]);
    }

    #[test]
    fn test_isolated_and_self_loops() {
        let g = graph(&["A", "B", "C"], &[("A", "A")]);
        let view = g.undirected();

        assert_eq!(isolated_nodes(&view), vec![1, 2]);
        assert_eq!(self_loops(&view), vec![0]);
    }

    #[test]
    fn test_simple_cycles() {
        let g = graph(
            &["A", "B", "C"],
            &[("A", "B"), ("B", "A"), ("B", "C"), ("C", "A"), ("C", "C")],
        );
        let mut cycles = simple_cycles(&g, 10);
        cycles.sort();

        assert_eq!(cycles, vec![vec![0, 1], vec![0, 1, 2], vec![2]]);
    }

    #[test]
    fn test_cycle_limit() {
        // Complete digraph on 5 nodes has far more than 3 simple cycles
        let ids = ["A", "B", "C", "D", "E"];
        let edges: Vec<(&str, &str)> = ids
            .iter()
            .flat_map(|a| ids.iter().filter(move |b| *b != a).map(move |b| (*a, *b)))
            .collect();
        let g = graph(&ids, &edges);

        assert_eq!(simple_cycles(&g, 3).len(), 3);
        assert!(simple_cycles(&graph(&ids, &[("A", "B")]), 10).is_empty());
    }

    fn chain_ids(len: usize) -> Vec<String> {
        (0..len).map(|i| format!("N{i}")).collect()
    }

    #[test]
    fn test_long_chain_cuts() {
        let ids = chain_ids(20_000);
        let refs: Vec<&str> = ids.iter().map(String::as_str).collect();
        let edges: Vec<(&str, &str)> = refs.windows(2).map(|pair| (pair[0], pair[1])).collect();
        let cuts = cut_structure(&graph(&refs, &edges).undirected());

        assert_eq!(cuts.bridges.len(), 19_999);
        assert_eq!(cuts.bridges[0], (0, 1));
        assert_eq!(cuts.articulation_points.len(), 19_998);
        assert!(!cuts.articulation_points.contains(&0));
        assert!(!cuts.articulation_points.contains(&19_999));
    }

    #[test]
    fn test_long_ring_is_one_cycle() {
        let ids = chain_ids(20_000);
        let refs: Vec<&str> = ids.iter().map(String::as_str).collect();
        let mut edges: Vec<(&str, &str)> = refs.windows(2).map(|pair| (pair[0], pair[1])).collect();
        edges.push((refs[19_999], refs[0]));
        let g = graph(&refs, &edges);

        let cycles = simple_cycles(&g, 10);
        assert_eq!(cycles.len(), 1);
        assert_eq!(cycles[0].len(), 20_000);
        assert_eq!(cycles[0][0], 0);

        let cuts = cut_structure(&g.undirected());
        assert!(cuts.bridges.is_empty());
        assert!(cuts.articulation_points.is_empty());
    }

    #[test]
    fn test_cycle_search_skips_acyclic_prefix() {
        // 0 -> 1 -> 2 <-> 3, only the tail closes a loop
        let g = graph(&["A", "B", "C", "D"], &[("A", "B"), ("B", "C"), ("C", "D"), ("D", "C")]);
        assert_eq!(simple_cycles(&g, 10), vec![vec![2, 3]]);
        assert!(simple_cycles(&g, 0).is_empty());
    }
}
