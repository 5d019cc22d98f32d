use extract::{Entity, ExtractionResult, Relationship};
use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex, UnGraph};
use petgraph::unionfind::UnionFind;
use petgraph::visit::EdgeRef;
use std::collections::HashMap;
use tracing::debug;

/// Directed graph of one extraction snapshot.
///
/// Nodes are never removed, so node indices are contiguous `0..node_count()`
/// and follow first-insertion order of entity ids.
#[derive(Debug, Clone, Default)]
pub struct KnowledgeGraph {
    graph: DiGraph<Entity, Relationship>,
    entity_to_idx: HashMap<String, NodeIndex>,
    skipped_relationships: usize,
}

impl KnowledgeGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshot(entities: &[Entity], relationships: &[Relationship]) -> Self {
        let mut graph = Self::new();

        for entity in entities {
            graph.add_entity(entity.clone());
        }
        for relationship in relationships {
            graph.add_relationship(relationship.clone());
        }

        debug!(
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            skipped = graph.skipped_relationships,
            "Built knowledge graph"
        );
        graph
    }

    pub fn from_extraction(result: &ExtractionResult) -> Self {
        Self::from_snapshot(&result.entities, &result.relationships)
    }

    /// Insert an entity; a repeated id replaces the earlier record (last wins)
    pub fn add_entity(&mut self, entity: Entity) -> usize {
        if let Some(&idx) = self.entity_to_idx.get(&entity.id) {
            self.graph[idx] = entity;
            return idx.index();
        }

        let id = entity.id.clone();
        let idx = self.graph.add_node(entity);
        self.entity_to_idx.insert(id, idx);
        idx.index()
    }

    /// Insert a directed edge. Returns false, without error, when an endpoint
    /// is not a known entity. A repeated (source, target) pair keeps one edge
    /// carrying the latest relationship.
    pub fn add_relationship(&mut self, relationship: Relationship) -> bool {
        let endpoints = (
            self.entity_to_idx.get(&relationship.source_id).copied(),
            self.entity_to_idx.get(&relationship.target_id).copied(),
        );

        match endpoints {
            (Some(source), Some(target)) => {
                self.graph.update_edge(source, target, relationship);
                true
            }
            _ => {
                debug!(
                    source = %relationship.source_id,
                    target = %relationship.target_id,
                    "Skipping relationship with unknown endpoint"
                );
                self.skipped_relationships += 1;
                false
            }
        }
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// Relationships dropped because an endpoint was missing
    pub fn skipped_relationships(&self) -> usize {
        self.skipped_relationships
    }

    pub fn id(&self, idx: usize) -> &str {
        &self.graph[NodeIndex::new(idx)].id
    }

    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.entity_to_idx.get(id).map(|idx| idx.index())
    }

    pub fn entity(&self, id: &str) -> Option<&Entity> {
        self.entity_to_idx.get(id).map(|&idx| &self.graph[idx])
    }

    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.graph.node_indices().map(move |idx| &self.graph[idx])
    }

    pub fn relationships(&self) -> impl Iterator<Item = &Relationship> {
        self.graph.edge_references().map(|edge| edge.weight())
    }

    /// Directed (source, target) index pairs
    pub fn edges(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.graph
            .edge_references()
            .map(|edge| (edge.source().index(), edge.target().index()))
    }

    pub fn successors(&self, idx: usize) -> Vec<usize> {
        self.neighbors(idx, Direction::Outgoing)
    }

    pub fn predecessors(&self, idx: usize) -> Vec<usize> {
        self.neighbors(idx, Direction::Incoming)
    }

    fn neighbors(&self, idx: usize, direction: Direction) -> Vec<usize> {
        let mut out: Vec<usize> = self
            .graph
            .neighbors_directed(NodeIndex::new(idx), direction)
            .map(|n| n.index())
            .collect();
        out.sort_unstable();
        out.dedup();
        out
    }

    pub fn inner(&self) -> &DiGraph<Entity, Relationship> {
        &self.graph
    }

    /// Undirected projection: one edge per connected pair, self-loops tracked
    /// separately so they count toward degree but not toward neighborhoods.
    pub fn undirected(&self) -> UndirectedView {
        let n = self.node_count();
        let mut graph: UnGraph<(), ()> = UnGraph::with_capacity(n, self.edge_count());
        for _ in 0..n {
            graph.add_node(());
        }

        let mut self_loops = vec![false; n];
        for (source, target) in self.edges() {
            if source == target {
                self_loops[source] = true;
                continue;
            }
            let (a, b) = (NodeIndex::new(source), NodeIndex::new(target));
            if graph.find_edge(a, b).is_none() {
                graph.add_edge(a, b, ());
            }
        }

        let adjacency = (0..n)
            .map(|idx| {
                let mut neighbors: Vec<usize> =
                    graph.neighbors(NodeIndex::new(idx)).map(|n| n.index()).collect();
                neighbors.sort_unstable();
                neighbors
            })
            .collect();

        UndirectedView {
            graph,
            adjacency,
            self_loops,
        }
    }
}

#[derive(Debug, Clone)]
pub struct UndirectedView {
    graph: UnGraph<(), ()>,
    adjacency: Vec<Vec<usize>>,
    self_loops: Vec<bool>,
}

impl UndirectedView {
    pub fn node_count(&self) -> usize {
        self.adjacency.len()
    }

    /// Distinct node pairs plus self-loops
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count() + self.self_loop_count()
    }

    pub fn self_loop_count(&self) -> usize {
        self.self_loops.iter().filter(|&&looped| looped).count()
    }

    pub fn has_self_loop(&self, idx: usize) -> bool {
        self.self_loops[idx]
    }

    pub fn neighbors(&self, idx: usize) -> &[usize] {
        &self.adjacency[idx]
    }

    /// A self-loop contributes 2
    pub fn degree(&self, idx: usize) -> usize {
        self.adjacency[idx].len() + if self.self_loops[idx] { 2 } else { 0 }
    }

    /// Pairs `(a, b)` with `a < b`
    pub fn edges(&self) -> Vec<(usize, usize)> {
        let mut edges: Vec<(usize, usize)> = self
            .graph
            .edge_references()
            .map(|edge| {
                let (a, b) = (edge.source().index(), edge.target().index());
                (a.min(b), a.max(b))
            })
            .collect();
        edges.sort_unstable();
        edges
    }

    pub fn component_count(&self) -> usize {
        petgraph::algo::connected_components(&self.graph)
    }

    /// Components ordered by their smallest member, members ascending
    pub fn components(&self) -> Vec<Vec<usize>> {
        let n = self.node_count();
        let mut sets = UnionFind::<usize>::new(n);
        for edge in self.graph.edge_references() {
            sets.union(edge.source().index(), edge.target().index());
        }

        let mut by_root: HashMap<usize, usize> = HashMap::new();
        let mut components: Vec<Vec<usize>> = Vec::new();
        for idx in 0..n {
            let root = sets.find(idx);
            let slot = *by_root.entry(root).or_insert_with(|| {
                components.push(Vec::new());
                components.len() - 1
            });
            components[slot].push(idx);
        }
        components
    }

    /// Largest component; ties go to the one containing the lowest index
    pub fn largest_component(&self) -> Vec<usize> {
        self.components()
            .into_iter()
            .fold(Vec::new(), |best, component| {
                if component.len() > best.len() { component } else { best }
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skips_unknown_endpoints() {
        let entities = vec![Entity::new("A", "Person"), Entity::new("B", "Person")];
        let relationships = vec![
            Relationship::new("A", "B", "knows"),
            Relationship::new("A", "Z", "knows"),
        ];

        let graph = KnowledgeGraph::from_snapshot(&entities, &relationships);
        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.edge_count(), 1);
        assert_eq!(graph.skipped_relationships(), 1);
    }

    #[test]
    fn test_duplicate_ids_last_wins() {
        let entities = vec![
            Entity::new("A", "Person"),
            Entity::new("B", "Person"),
            Entity::new("A", "Organization"),
        ];

        let graph = KnowledgeGraph::from_snapshot(&entities, &[]);
        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.index_of("A"), Some(0));
        assert_eq!(graph.entity("A").unwrap().entity_type, "Organization");
    }

    #[test]
    fn test_repeated_pair_keeps_latest_edge() {
        let entities = vec![Entity::new("A", "Person"), Entity::new("B", "Person")];
        let relationships = vec![
            Relationship::new("A", "B", "knows"),
            Relationship::new("A", "B", "manages"),
        ];

        let graph = KnowledgeGraph::from_snapshot(&entities, &relationships);
        assert_eq!(graph.edge_count(), 1);
        assert_eq!(graph.relationships().next().unwrap().keywords.as_text(), "manages");
    }

    #[test]
    fn test_undirected_projection() {
        let entities: Vec<Entity> = ["A", "B", "C", "D"]
            .iter()
            .map(|id| Entity::new(*id, ""))
            .collect();
        let relationships = vec![
            Relationship::new("A", "B", ""),
            Relationship::new("B", "A", ""),
            Relationship::new("C", "C", ""),
        ];

        let view = KnowledgeGraph::from_snapshot(&entities, &relationships).undirected();
        assert_eq!(view.edge_count(), 2);
        assert_eq!(view.degree(0), 1);
        assert_eq!(view.degree(2), 2);
        assert_eq!(view.degree(3), 0);
        assert_eq!(view.component_count(), 3);
        assert_eq!(view.components(), vec![vec![0, 1], vec![2], vec![3]]);
        assert_eq!(view.largest_component(), vec![0, 1]);
    }
}
