//! Feature record assembly.
//!
//! The extractor composes every analytics block into one [`FeatureRecord`]
//! per request node.
//!
//! ## Algorithm
//!
//! 1. Re-solve Katz centrality (once per record, before any read)
//! 2. Graph counts and ratios
//! 3. Request node block
//! 4. First and second parent blocks
//! 5. URL block
//! 6. Ascendant walk and descendant count
//!
//! Every phase is timed into the graph's [`PhaseTimings`](super::timing::PhaseTimings).

use std::time::Instant;

use crate::config::FeatureConfig;
use crate::store::{AdGraph, GraphError};
use crate::types::features::{FeatureRecord, GraphFeatures, NodeFeatures, LABEL_AD, LABEL_NONAD};
use crate::types::node::{NodeId, NodeIndex};
use super::lexical::{UrlDecomposer, WhatwgDecomposer};
use super::parent::ParentRank;
use super::timing::Phase;

/// Assembles feature records from a finished graph.
pub struct FeatureExtractor<D: UrlDecomposer = WhatwgDecomposer> {
    config: FeatureConfig,
    decomposer: D,
}

impl FeatureExtractor<WhatwgDecomposer> {
    /// Create an extractor using the standard URL decomposer.
    pub fn new(config: FeatureConfig) -> Self {
        Self {
            config,
            decomposer: WhatwgDecomposer,
        }
    }
}

impl<D: UrlDecomposer> FeatureExtractor<D> {
    /// Create an extractor with a custom URL decomposer.
    pub fn with_decomposer(config: FeatureConfig, decomposer: D) -> Self {
        Self { config, decomposer }
    }

    /// Active configuration.
    pub fn config(&self) -> &FeatureConfig {
        &self.config
    }

    /// Assemble the record of `request`, labeling it with the resource kind
    /// that created the request.
    pub fn extract(&self, graph: &mut AdGraph, request: NodeIndex) -> Result<FeatureRecord, GraphError> {
        let label = request_node(graph, request)?.resource.event_label();
        self.extract_labeled(graph, request, label)
    }

    /// Assemble the record of `request` with an explicit event-kind label.
    pub fn extract_labeled(
        &self,
        graph: &mut AdGraph,
        request: NodeIndex,
        event_label: &str,
    ) -> Result<FeatureRecord, GraphError> {
        request_node(graph, request)?;

        let start = Instant::now();
        graph.update_katz_centrality(&self.config.katz);
        graph.timings_mut().record(Phase::Katz, start.elapsed());

        let graph_block = graph.graph_features();

        let start = Instant::now();
        let node = graph.node_features(request, event_label)?;
        graph.timings_mut().record(Phase::Node, start.elapsed());

        let start = Instant::now();
        let first_parent = graph.parent_features(request, ParentRank::First);
        graph.timings_mut().record(Phase::FirstParent, start.elapsed());

        let start = Instant::now();
        let second_parent = graph.parent_features(request, ParentRank::Second);
        graph.timings_mut().record(Phase::SecondParent, start.elapsed());

        let start = Instant::now();
        let url = graph.url_features_with(request, &self.decomposer);
        graph.timings_mut().record(Phase::Url, start.elapsed());

        let start = Instant::now();
        let ascendant = graph.ascendant_features(request, self.config.ascendant_hops);
        graph.timings_mut().record(Phase::Ascendant, start.elapsed());

        let start = Instant::now();
        let number_of_descendants = graph.descendant_count(request, self.config.descendant_hops);
        graph.timings_mut().record(Phase::Descendant, start.elapsed());

        Ok(FeatureRecord {
            graph: graph_block,
            node,
            first_parent,
            second_parent,
            url,
            ascendant,
            number_of_descendants,
        })
    }

    /// Assemble records for every request node, in creation order.
    pub fn extract_all(&self, graph: &mut AdGraph) -> Result<Vec<FeatureRecord>, GraphError> {
        let requests = graph.request_indices();
        let mut records = Vec::with_capacity(requests.len());
        for request in requests {
            records.push(self.extract(graph, request)?);
        }
        tracing::info!(
            records = records.len(),
            katz_ms = graph.timings().katz_properties.as_millis() as u64,
            "feature extraction complete"
        );
        Ok(records)
    }
}

fn request_node(
    graph: &AdGraph,
    request: NodeIndex,
) -> Result<&crate::types::node::RequestNode, GraphError> {
    let node = graph
        .node(request)
        .ok_or(GraphError::InvalidIndex(request.index()))?;
    node.as_request()
        .ok_or_else(|| GraphError::NotARequest(node.id.clone()))
}

impl AdGraph {
    /// Node and edge totals with their ratios (0 when the divisor is 0).
    pub fn graph_features(&self) -> GraphFeatures {
        let nodes = self.node_count();
        let edges = self.edge_count();
        let ratio = |a: usize, b: usize| if b == 0 { 0.0 } else { a as f64 / b as f64 };
        GraphFeatures {
            nodes,
            edges,
            nodes_per_edge: ratio(nodes, edges),
            edges_per_node: ratio(edges, nodes),
        }
    }

    /// Connectivity, centrality and script-activity block of a request.
    pub fn node_features(&self, request: NodeIndex, event_label: &str) -> Result<NodeFeatures, GraphError> {
        let node = self
            .node(request)
            .ok_or(GraphError::InvalidIndex(request.index()))?;
        let req = node
            .as_request()
            .ok_or_else(|| GraphError::NotARequest(node.id.clone()))?;

        let script_is_eval_or_function = req
            .active_script_id
            .as_deref()
            .and_then(|raw| self.get_node(&NodeId::script(raw)))
            .and_then(|n| n.as_script())
            .map(|s| s.is_eval_or_function)
            .unwrap_or(false);

        Ok(NodeFeatures {
            node_id: node.id.to_string(),
            inbound_connections: node.inbound_edge_count(),
            outbound_connections: node.outbound_edge_count(),
            inbound_outbound_connections: node.degree(),
            katz_centrality: self.centrality(request),
            average_degree_connectivity: self.average_degree_connectivity(request),
            script_is_active: req.script_is_active,
            script_is_eval_or_function,
            node_category: event_label.to_string(),
            class: if req.is_ad { LABEL_AD } else { LABEL_NONAD }.to_string(),
        })
    }
}
