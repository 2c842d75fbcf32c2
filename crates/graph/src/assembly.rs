use extract::ParsedResponse;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use std::collections::HashMap;
use tracing::debug;

/// Directed graph of entity labels with relation-labeled edges.
///
/// Node labels are used verbatim as identifiers. There is at most one edge
/// per (source, target) pair; setting it again replaces the label.
#[derive(Debug, Clone, Default)]
pub struct KnowledgeGraph {
    graph: DiGraph<String, String>,
    label_to_idx: HashMap<String, NodeIndex>,
}

impl KnowledgeGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the graph from parser output: entities first, then edges,
    /// creating endpoint nodes the entity list did not declare.
    pub fn assemble(parsed: &ParsedResponse) -> Self {
        let mut graph = Self::new();

        for entity in &parsed.entities {
            graph.ensure_node(entity);
        }
        let declared = graph.node_count();

        for rel in &parsed.relationships {
            graph.set_edge(&rel.source, &rel.relation, &rel.target);
        }

        debug!(
            nodes = graph.node_count(),
            implicit_nodes = graph.node_count() - declared,
            edges = graph.edge_count(),
            "Assembled knowledge graph"
        );

        graph
    }

    /// Index of the node with this label, adding it if missing
    pub fn ensure_node(&mut self, label: &str) -> NodeIndex {
        if let Some(&idx) = self.label_to_idx.get(label) {
            return idx;
        }

        let idx = self.graph.add_node(label.to_string());
        self.label_to_idx.insert(label.to_string(), idx);
        idx
    }

    /// Add the edge source -> target, or overwrite its label (last write wins)
    pub fn set_edge(&mut self, source: &str, relation: &str, target: &str) {
        let source_idx = self.ensure_node(source);
        let target_idx = self.ensure_node(target);
        self.graph
            .update_edge(source_idx, target_idx, relation.to_string());
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

    pub fn contains_node(&self, label: &str) -> bool {
        self.label_to_idx.contains_key(label)
    }

    /// Node labels in insertion order
    pub fn nodes(&self) -> impl Iterator<Item = &str> + '_ {
        self.graph.node_indices().map(|idx| self.graph[idx].as_str())
    }

    /// `(source, target, relation)` in the order edges were first added
    pub fn edges(&self) -> impl Iterator<Item = (&str, &str, &str)> + '_ {
        self.graph.edge_references().map(|e| {
            (
                self.graph[e.source()].as_str(),
                self.graph[e.target()].as_str(),
                e.weight().as_str(),
            )
        })
    }

    pub fn edge_label(&self, source: &str, target: &str) -> Option<&str> {
        let source_idx = *self.label_to_idx.get(source)?;
        let target_idx = *self.label_to_idx.get(target)?;
        self.graph
            .find_edge(source_idx, target_idx)
            .map(|e| self.graph[e].as_str())
    }

    pub(crate) fn inner(&self) -> &DiGraph<String, String> {
        &self.graph
    }
}
