use crate::error::{GraphError, Result};
use crate::types::{EdgeKind, GraphEdge, GraphNode, NodeKind};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Repository graph for one indexing run.
///
/// Nodes are keyed by their content-addressed ID in a `BTreeMap` so the
/// serialized form is byte-stable for unchanged input; edges keep insertion
/// order. Duplicate edges are permitted only when `(from, to, kind)` differ
/// in `meta`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepoGraph {
    repo_id: String,
    nodes: BTreeMap<String, GraphNode>,
    edges: Vec<GraphEdge>,
}

impl RepoGraph {
    #[must_use]
    pub fn new(repo_id: impl Into<String>) -> Self {
        Self {
            repo_id: repo_id.into(),
            nodes: BTreeMap::new(),
            edges: Vec::new(),
        }
    }

    #[must_use]
    pub fn repo_id(&self) -> &str {
        &self.repo_id
    }

    /// Insert a node, returning its ID.
    ///
    /// Inserting the same content twice is a no-op (IDs are content
    /// hashes); inserting different content under an existing ID is an
    /// error.
    pub fn insert_node(&mut self, node: GraphNode) -> Result<String> {
        let id = node.id.clone();
        if let Some(existing) = self.nodes.get(&id) {
            if existing != &node {
                return Err(GraphError::ConflictingNode(id));
            }
            return Ok(id);
        }
        self.nodes.insert(id.clone(), node);
        Ok(id)
    }

    /// Add a directed edge. Both endpoints must already exist.
    pub fn add_edge(&mut self, edge: GraphEdge) -> Result<()> {
        if !self.nodes.contains_key(&edge.from) {
            return Err(GraphError::DanglingEdge(edge.from));
        }
        if !self.nodes.contains_key(&edge.to) {
            return Err(GraphError::DanglingEdge(edge.to));
        }
        self.edges.push(edge);
        Ok(())
    }

    #[must_use]
    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.nodes.get(id)
    }

    pub fn node_mut(&mut self, id: &str) -> Option<&mut GraphNode> {
        self.nodes.get_mut(id)
    }

    #[must_use]
    pub fn contains_node(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &GraphNode> {
        self.nodes.values()
    }

    pub fn nodes_of_kind(&self, kind: NodeKind) -> impl Iterator<Item = &GraphNode> {
        self.nodes.values().filter(move |n| n.kind == kind)
    }

    #[must_use]
    pub fn edges(&self) -> &[GraphEdge] {
        &self.edges
    }

    pub fn edges_of_kind(&self, kind: EdgeKind) -> impl Iterator<Item = &GraphEdge> {
        self.edges.iter().filter(move |e| e.kind == kind)
    }

    pub fn edges_from<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a GraphEdge> {
        self.edges.iter().filter(move |e| e.from == id)
    }

    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Serialize the graph for the external consumers of a run.
    pub fn to_json(&self) -> Result<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }
}
