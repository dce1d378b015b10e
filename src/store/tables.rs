//! Deferred-resolution tables.
//!
//! Every lookup returns `Option` and every removal is a no-op when the key
//! is absent, so callers must handle "not found" explicitly.

use std::collections::{BTreeMap, BTreeSet};

use crate::types::event::{NetworkRequest, NetworkResource};
use crate::types::node::{NodeId, NodeIndex};

/// Network event queued until its requestor element exists.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingRequest {
    /// Resource kind of the original event.
    pub resource: NetworkResource,
    /// Original event payload.
    pub request: NetworkRequest,
    /// Request node already created for this event, if the actor was known.
    pub request_node: Option<NodeId>,
}

/// Auxiliary indices maintained during ingestion.
///
/// Uses BTreeMap/BTreeSet for deterministic iteration order.
#[derive(Debug, Clone, Default)]
pub struct DeferredTables {
    /// Element -> request it most recently spawned.
    html_to_request: BTreeMap<NodeIndex, NodeIndex>,
    /// Element id -> id of the parent it will be attached under.
    deferred_parent: BTreeMap<NodeId, NodeId>,
    /// Requestor element id -> pending network event.
    deferred_request: BTreeMap<NodeId, PendingRequest>,
    /// Scripts compiled by advertising resources.
    suppressed_scripts: BTreeSet<NodeId>,
}

impl DeferredTables {
    /// Create empty tables.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `element` spawned `request`, replacing any earlier mapping.
    pub fn add_request_mapping(&mut self, element: NodeIndex, request: NodeIndex) {
        self.html_to_request.insert(element, request);
    }

    /// Forget the request mapping of `element`.
    pub fn remove_request_mapping(&mut self, element: NodeIndex) {
        self.html_to_request.remove(&element);
    }

    /// Request most recently spawned by `element`.
    pub fn request_mapping(&self, element: NodeIndex) -> Option<NodeIndex> {
        self.html_to_request.get(&element).copied()
    }

    /// Record that `element` will be attached under `parent`.
    pub fn add_deferred_parent(&mut self, element: NodeId, parent: NodeId) {
        self.deferred_parent.insert(element, parent);
    }

    /// Clear the deferred parent of `element`.
    pub fn remove_deferred_parent(&mut self, element: &NodeId) {
        self.deferred_parent.remove(element);
    }

    /// Deferred parent of `element`.
    pub fn deferred_parent(&self, element: &NodeId) -> Option<&NodeId> {
        self.deferred_parent.get(element)
    }

    /// Queue a network event until `requestor` exists.
    pub fn add_deferred_request(&mut self, requestor: NodeId, pending: PendingRequest) {
        self.deferred_request.insert(requestor, pending);
    }

    /// Drop the queued event of `requestor`.
    pub fn remove_deferred_request(&mut self, requestor: &NodeId) {
        self.deferred_request.remove(requestor);
    }

    /// Queued event of `requestor`.
    pub fn deferred_request(&self, requestor: &NodeId) -> Option<&PendingRequest> {
        self.deferred_request.get(requestor)
    }

    /// Number of events still queued.
    pub fn pending_request_count(&self) -> usize {
        self.deferred_request.len()
    }

    /// Mark a script as suppressed.
    pub fn suppress_script(&mut self, script: NodeId) {
        self.suppressed_scripts.insert(script);
    }

    /// Whether `script` was suppressed.
    pub fn is_suppressed(&self, script: &NodeId) -> bool {
        self.suppressed_scripts.contains(script)
    }

    /// Number of suppressed scripts.
    pub fn suppressed_count(&self) -> usize {
        self.suppressed_scripts.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pending(url: &str) -> PendingRequest {
        PendingRequest {
            resource: NetworkResource::Image,
            request: NetworkRequest {
                actor_id: None,
                request_url: url.to_string(),
                requestor_id: "3".to_string(),
            },
            request_node: None,
        }
    }

    #[test]
    fn test_remove_absent_is_noop() {
        let mut tables = DeferredTables::new();
        tables.remove_deferred_parent(&NodeId::element("1"));
        tables.remove_deferred_request(&NodeId::element("1"));
        tables.remove_request_mapping(NodeIndex(4));
        assert!(tables.deferred_parent(&NodeId::element("1")).is_none());
        assert!(tables.deferred_request(&NodeId::element("1")).is_none());
        assert!(tables.request_mapping(NodeIndex(4)).is_none());
    }

    #[test]
    fn test_deferred_request_replaced() {
        let mut tables = DeferredTables::new();
        let key = NodeId::element("3");
        tables.add_deferred_request(key.clone(), pending("https://a.test/1.png"));
        tables.add_deferred_request(key.clone(), pending("https://a.test/2.png"));
        assert_eq!(tables.pending_request_count(), 1);
        assert_eq!(
            tables.deferred_request(&key).map(|p| p.request.request_url.as_str()),
            Some("https://a.test/2.png")
        );
    }

    #[test]
    fn test_request_mapping_latest_wins() {
        let mut tables = DeferredTables::new();
        tables.add_request_mapping(NodeIndex(1), NodeIndex(2));
        tables.add_request_mapping(NodeIndex(1), NodeIndex(5));
        assert_eq!(tables.request_mapping(NodeIndex(1)), Some(NodeIndex(5)));
    }

    #[test]
    fn test_suppression() {
        let mut tables = DeferredTables::new();
        tables.suppress_script(NodeId::script("9"));
        assert!(tables.is_suppressed(&NodeId::script("9")));
        assert!(!tables.is_suppressed(&NodeId::element("9")));
        assert_eq!(tables.suppressed_count(), 1);
    }
}
