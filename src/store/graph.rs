//! Arena-backed page graph.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::analytics::timing::PhaseTimings;
use crate::canonical::canonical_hash_hex;
use crate::types::edge::{Edge, EdgeKind};
use crate::types::node::{Node, NodeId, NodeIndex, NodeKind};
use super::tables::DeferredTables;

/// Error type for graph mutations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GraphError {
    /// Node id already present.
    #[error("Node already exists: {0}")]
    DuplicateNode(NodeId),

    /// Edge endpoint or lookup target is not in the graph.
    #[error("Node not found: {0}")]
    MissingNode(NodeId),

    /// Arena index does not belong to this graph.
    #[error("Node index out of range: {0}")]
    InvalidIndex(usize),

    /// Operation needs a request node.
    #[error("Not a request node: {0}")]
    NotARequest(NodeId),
}

/// Page graph session for one recorded timeline.
///
/// Nodes are stored in an arena and never removed. Adding an edge appends to
/// the edge log and updates both adjacency lists, so
/// `inbound_edge_count() == parents.len()` holds at every observation point.
#[derive(Debug, Clone)]
pub struct AdGraph {
    /// URL of the visited page.
    base_url: String,
    /// Node arena.
    nodes: Vec<Node>,
    /// Id -> arena index.
    index: BTreeMap<NodeId, NodeIndex>,
    /// Append-only edge log.
    edges: Vec<Edge>,
    /// Katz centrality per arena slot, 0 at creation.
    centrality: Vec<f64>,
    /// Deferred-resolution tables.
    tables: DeferredTables,
    /// Cumulative analytics timings.
    timings: PhaseTimings,
}

#[derive(Serialize)]
struct FingerprintInput<'a> {
    nodes: Vec<&'a NodeId>,
    edges: &'a [Edge],
}

impl AdGraph {
    /// Create an empty graph for the page at `base_url`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            nodes: Vec::new(),
            index: BTreeMap::new(),
            edges: Vec::new(),
            centrality: Vec::new(),
            tables: DeferredTables::new(),
            timings: PhaseTimings::default(),
        }
    }

    /// URL of the visited page.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Insert a node. Fails if `id` is already present.
    pub fn create_node(&mut self, id: NodeId, kind: NodeKind) -> Result<NodeIndex, GraphError> {
        if self.index.contains_key(&id) {
            return Err(GraphError::DuplicateNode(id));
        }
        let idx = NodeIndex(self.nodes.len());
        self.index.insert(id.clone(), idx);
        self.nodes.push(Node::new(id, kind));
        self.centrality.push(0.0);
        Ok(idx)
    }

    /// Arena index of `id`.
    pub fn node_index(&self, id: &NodeId) -> Option<NodeIndex> {
        self.index.get(id).copied()
    }

    /// Node with the given id.
    pub fn get_node(&self, id: &NodeId) -> Option<&Node> {
        self.node_index(id).map(|idx| &self.nodes[idx.0])
    }

    /// Mutable node with the given id.
    pub fn get_node_mut(&mut self, id: &NodeId) -> Option<&mut Node> {
        let idx = self.node_index(id)?;
        self.nodes.get_mut(idx.0)
    }

    /// Node at `idx`.
    pub fn node(&self, idx: NodeIndex) -> Option<&Node> {
        self.nodes.get(idx.0)
    }

    /// Mutable node at `idx`.
    pub fn node_mut(&mut self, idx: NodeIndex) -> Option<&mut Node> {
        self.nodes.get_mut(idx.0)
    }

    /// Whether `id` is present.
    pub fn contains(&self, id: &NodeId) -> bool {
        self.index.contains_key(id)
    }

    /// Add an edge between two existing nodes.
    ///
    /// Both endpoints must already exist; a missing one is reported as
    /// [`GraphError::MissingNode`] and nothing is recorded.
    pub fn add_edge(
        &mut self,
        source: &NodeId,
        target: &NodeId,
        kind: EdgeKind,
    ) -> Result<(), GraphError> {
        let src = self
            .node_index(source)
            .ok_or_else(|| GraphError::MissingNode(source.clone()))?;
        let dst = self
            .node_index(target)
            .ok_or_else(|| GraphError::MissingNode(target.clone()))?;
        self.link(src, dst, kind)
    }

    /// Add an edge between two arena slots.
    pub fn link(&mut self, src: NodeIndex, dst: NodeIndex, kind: EdgeKind) -> Result<(), GraphError> {
        for idx in [src, dst] {
            if idx.0 >= self.nodes.len() {
                return Err(GraphError::InvalidIndex(idx.0));
            }
        }
        self.edges.push(Edge::new(
            self.nodes[src.0].id.clone(),
            self.nodes[dst.0].id.clone(),
            kind,
        ));
        self.nodes[src.0].children.push(dst);
        self.nodes[dst.0].parents.push(src);
        Ok(())
    }

    /// All nodes in creation order.
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Edge log in insertion order.
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// Number of nodes.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of edges.
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Arena indices of all request nodes, in creation order.
    pub fn request_indices(&self) -> Vec<NodeIndex> {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| matches!(n.kind, NodeKind::Request(_)))
            .map(|(i, _)| NodeIndex(i))
            .collect()
    }

    /// Number of request nodes.
    pub fn request_count(&self) -> usize {
        self.nodes
            .iter()
            .filter(|n| matches!(n.kind, NodeKind::Request(_)))
            .count()
    }

    /// Largest inbound plus outbound degree over all nodes.
    pub fn max_degree(&self) -> usize {
        self.nodes.iter().map(Node::degree).max().unwrap_or(0)
    }

    /// Cached Katz centrality of `idx` (0 before the first converged solve).
    pub fn centrality(&self, idx: NodeIndex) -> f64 {
        self.centrality.get(idx.0).copied().unwrap_or(0.0)
    }

    /// Centrality cache, indexed by arena slot.
    pub fn centrality_values(&self) -> &[f64] {
        &self.centrality
    }

    pub(crate) fn centrality_mut(&mut self) -> &mut Vec<f64> {
        &mut self.centrality
    }

    /// Deferred-resolution tables.
    pub fn tables(&self) -> &DeferredTables {
        &self.tables
    }

    /// Mutable deferred-resolution tables.
    pub fn tables_mut(&mut self) -> &mut DeferredTables {
        &mut self.tables
    }

    /// Apply a ground-truth advertising label to a request node.
    pub fn mark_request_ad(&mut self, id: &NodeId) -> Result<(), GraphError> {
        let node = self
            .get_node_mut(id)
            .ok_or_else(|| GraphError::MissingNode(id.clone()))?;
        let request = node
            .as_request_mut()
            .ok_or_else(|| GraphError::NotARequest(id.clone()))?;
        request.is_ad = true;
        Ok(())
    }

    /// Cumulative analytics timings.
    pub fn timings(&self) -> &PhaseTimings {
        &self.timings
    }

    pub(crate) fn timings_mut(&mut self) -> &mut PhaseTimings {
        &mut self.timings
    }

    /// Deterministic fingerprint of the graph structure.
    ///
    /// Depends only on node ids and the ordered edge log.
    pub fn fingerprint(&self) -> String {
        canonical_hash_hex(&FingerprintInput {
            nodes: self.nodes.iter().map(|n| &n.id).collect(),
            edges: &self.edges,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::node::{HtmlElement, ScriptNode};

    fn element(graph: &mut AdGraph, raw: &str) -> NodeIndex {
        graph
            .create_node(NodeId::element(raw), NodeKind::Element(HtmlElement::new("div")))
            .unwrap()
    }

    #[test]
    fn test_duplicate_node_rejected() {
        let mut graph = AdGraph::new("https://example.com/");
        element(&mut graph, "1");
        let err = graph
            .create_node(NodeId::element("1"), NodeKind::Element(HtmlElement::new("p")))
            .unwrap_err();
        assert_eq!(err, GraphError::DuplicateNode(NodeId::element("1")));
        assert_eq!(graph.node_count(), 1);
    }

    #[test]
    fn test_edge_updates_both_lists_and_log() {
        let mut graph = AdGraph::new("https://example.com/");
        let a = element(&mut graph, "1");
        let b = element(&mut graph, "2");
        graph
            .add_edge(&NodeId::element("1"), &NodeId::element("2"), EdgeKind::Dom)
            .unwrap();

        assert_eq!(graph.node(a).unwrap().children, vec![b]);
        assert_eq!(graph.node(b).unwrap().parents, vec![a]);
        assert_eq!(graph.edges()[0].kind, EdgeKind::Dom);
        assert_eq!(graph.edge_count(), 1);
    }

    #[test]
    fn test_edge_to_missing_node_rejected() {
        let mut graph = AdGraph::new("https://example.com/");
        element(&mut graph, "1");
        let err = graph
            .add_edge(&NodeId::element("1"), &NodeId::script("9"), EdgeKind::Actor)
            .unwrap_err();
        assert_eq!(err, GraphError::MissingNode(NodeId::script("9")));
        assert_eq!(graph.edge_count(), 0);
        assert!(graph.node(NodeIndex(0)).unwrap().children.is_empty());
    }

    #[test]
    fn test_centrality_initialized_to_zero() {
        let mut graph = AdGraph::new("https://example.com/");
        let idx = graph
            .create_node(NodeId::script("1"), NodeKind::Script(ScriptNode::new("x", false)))
            .unwrap();
        assert_eq!(graph.centrality(idx), 0.0);
        assert_eq!(graph.centrality_values().len(), 1);
    }

    #[test]
    fn test_fingerprint_tracks_edges() {
        let mut graph = AdGraph::new("https://example.com/");
        element(&mut graph, "1");
        element(&mut graph, "2");
        let before = graph.fingerprint();
        assert_eq!(before, graph.fingerprint());

        graph
            .add_edge(&NodeId::element("1"), &NodeId::element("2"), EdgeKind::Dom)
            .unwrap();
        assert_ne!(before, graph.fingerprint());
    }
}
