//! Event ingestion.
//!
//! Consumes a timeline in causal order and builds the page graph.
//!
//! ## Resolution
//!
//! ```text
//! event ──► actor known? ──no──► unresolved list (never retried)
//!             │
//!            yes
//!             ▼
//!        requestor known? ──no──► deferred parent? ──yes──► placeholder link
//!             │                         │
//!            yes                        no
//!             ▼                         ▼
//!        requestor edge           deferred_request (materialized when the
//!                                 requestor element is created)
//! ```
//!
//! Missing references never abort the pass. Unknown actor scripts land in
//! [`IngestReport::unresolved`]; a missing structural parent, compiling
//! element or parent script lands in [`IngestReport::dangling`].
//! [`IngestError`] is reserved for internal consistency failures of the
//! graph store.

use serde::Serialize;

use crate::store::{AdGraph, GraphError, PendingRequest};
use crate::types::edge::EdgeKind;
use crate::types::event::{
    AttributeChange, NetworkRequest, NetworkResource, NodeInsertion, NodeRemoval, PageTimeline,
    ScriptCompilation,
    ScriptEval, TimelineEvent,
};
use crate::types::node::{
    Attribute, HtmlElement, Influence, NodeId, NodeIndex, NodeKind, RequestNode, ScriptNode,
};

/// Tag name of the implicit document root.
pub const ROOT_TAG: &str = "UNAVAILABLE";

const FLG_TEXTNODE_TAGS: [&str; 2] = ["flg-textnode", "FLG-TEXTNODE"];
const FLG_IMAGE_ATTR: &str = "flg-image";
const FLG_AD_ATTR: &str = "flg-ad";
const ELEMENT_NODE_TYPE: i64 = 1;

/// Error type for ingestion.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    /// The graph store rejected a mutation the ingestor considered valid.
    #[error("Graph error: {0}")]
    Graph(#[from] GraphError),
}

/// Event that named references absent from the graph.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnresolvedEvent {
    /// Position in the timeline.
    pub index: usize,
    /// The event as recorded.
    pub event: TimelineEvent,
    /// Ids that could not be found.
    pub missing: Vec<NodeId>,
}

/// Outcome of an ingestion pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IngestReport {
    /// Events handed to the ingestor.
    pub events_seen: usize,
    /// Events skipped because their actor was suppressed.
    pub skipped_suppressed: usize,
    /// Events of kinds the graph does not model.
    pub unsupported: usize,
    /// Events naming an actor script absent from the graph.
    pub unresolved: Vec<UnresolvedEvent>,
    /// Events whose structural parent, compiling element or parent script
    /// was absent; their dependent edges were skipped.
    pub dangling: Vec<UnresolvedEvent>,
    /// Request nodes created.
    pub requests_created: usize,
    /// Network events still waiting for their requestor at the end of the pass.
    pub pending_requests: usize,
}

/// References a single event named that were absent from the graph.
#[derive(Debug, Default)]
struct Misses {
    actors: Vec<NodeId>,
    targets: Vec<NodeId>,
}

impl Misses {
    fn actor(id: NodeId) -> Self {
        Self { actors: vec![id], targets: Vec::new() }
    }

    fn target(id: NodeId) -> Self {
        Self { actors: Vec::new(), targets: vec![id] }
    }
}

/// Builds one [`AdGraph`] from one timeline.
pub struct EventIngestor {
    graph: AdGraph,
    request_counter: u64,
    awaiting_root: bool,
    report: IngestReport,
}

impl EventIngestor {
    /// Create an ingestor for the page at `base_url`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            graph: AdGraph::new(base_url),
            request_counter: 0,
            awaiting_root: true,
            report: IngestReport::default(),
        }
    }

    /// Graph built so far.
    pub fn graph(&self) -> &AdGraph {
        &self.graph
    }

    /// Mutable graph built so far.
    pub fn graph_mut(&mut self) -> &mut AdGraph {
        &mut self.graph
    }

    /// Report so far.
    pub fn report(&self) -> &IngestReport {
        &self.report
    }

    /// Ingest every event in order.
    pub fn ingest_all<'a, I>(&mut self, events: I) -> Result<(), IngestError>
    where
        I: IntoIterator<Item = &'a TimelineEvent>,
    {
        for (index, event) in events.into_iter().enumerate() {
            self.ingest_event(index, event)?;
        }
        Ok(())
    }

    /// Finish the pass and hand out the graph and the report.
    pub fn finish(mut self) -> (AdGraph, IngestReport) {
        self.report.pending_requests = self.graph.tables().pending_request_count();
        tracing::info!(
            nodes = self.graph.node_count(),
            edges = self.graph.edge_count(),
            requests = self.report.requests_created,
            unresolved = self.report.unresolved.len(),
            dangling = self.report.dangling.len(),
            pending = self.report.pending_requests,
            "ingestion complete"
        );
        (self.graph, self.report)
    }

    /// Ingest one event at timeline position `index`.
    pub fn ingest_event(&mut self, index: usize, event: &TimelineEvent) -> Result<(), IngestError> {
        self.report.events_seen += 1;

        if let Some(actor) = event.actor() {
            if self.graph.tables().is_suppressed(&NodeId::script(actor)) {
                tracing::trace!(index, kind = event.kind_label(), actor, "suppressed actor, skipping");
                self.report.skipped_suppressed += 1;
                return Ok(());
            }
        }

        let misses = match event {
            TimelineEvent::NodeInsertion(e) => self.on_insertion(e)?,
            TimelineEvent::NodeRemoval(e) => self.on_removal(e)?,
            TimelineEvent::NodeAttachLater(e) => {
                self.graph
                    .tables_mut()
                    .add_deferred_parent(NodeId::element(&e.node_id), NodeId::element(&e.node_parent_id));
                Misses::default()
            }
            TimelineEvent::ScriptCompilation(e) => self.on_compilation(e)?,
            TimelineEvent::ScriptEval(e) => self.on_eval(e)?,
            TimelineEvent::AttrAddition(e) => self.on_attribute(e, Influence::AttrAddition)?,
            TimelineEvent::AttrModification(e) => self.on_attribute(e, Influence::AttrModification)?,
            TimelineEvent::AttrRemoval(e) => self.on_attribute(e, Influence::AttrRemoval)?,
            TimelineEvent::AttrStyleTextAddition(e) => self.on_attribute(e, Influence::StyleAddition)?,
            TimelineEvent::AttrStyleRemoval(e) => self.on_attribute(e, Influence::StyleRemoval)?,
            TimelineEvent::NetworkIframeRequest(e) => self.on_network(NetworkResource::Iframe, e)?,
            TimelineEvent::NetworkLinkRequest(e) => self.on_network(NetworkResource::Link, e)?,
            TimelineEvent::NetworkXmlHttpRequest(e) => self.on_network(NetworkResource::XmlHttp, e)?,
            TimelineEvent::NetworkScriptRequest(e) => self.on_network(NetworkResource::Script, e)?,
            TimelineEvent::NetworkImageRequest(e) => self.on_network(NetworkResource::Image, e)?,
            TimelineEvent::NetworkVideoRequest(e) => self.on_network(NetworkResource::Video, e)?,
            TimelineEvent::Unsupported => {
                tracing::trace!(index, "unsupported event kind");
                self.report.unsupported += 1;
                Misses::default()
            }
        };

        if !misses.actors.is_empty() {
            tracing::warn!(
                index,
                kind = event.kind_label(),
                missing = ?misses.actors,
                "unresolved actor"
            );
            self.report.unresolved.push(UnresolvedEvent {
                index,
                event: event.clone(),
                missing: misses.actors,
            });
        }
        if !misses.targets.is_empty() {
            tracing::debug!(
                index,
                kind = event.kind_label(),
                missing = ?misses.targets,
                "dangling target"
            );
            self.report.dangling.push(UnresolvedEvent {
                index,
                event: event.clone(),
                missing: misses.targets,
            });
        }
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────
    // DOM events
    // ─────────────────────────────────────────────────────────────────────

    fn on_insertion(&mut self, e: &NodeInsertion) -> Result<Misses, GraphError> {
        let mut misses = Misses::default();
        let child_id = NodeId::element(&e.node_id);
        let parent_id = NodeId::element(&e.node_parent_id);

        if self.awaiting_root {
            self.awaiting_root = false;
            if !self.graph.contains(&parent_id) {
                self.graph
                    .create_node(parent_id.clone(), NodeKind::Element(HtmlElement::new(ROOT_TAG)))?;
            }
        }

        match self.graph.node_index(&parent_id) {
            Some(parent) => {
                let child = self.inserted_element(&child_id, e)?;
                self.graph.link(parent, child, EdgeKind::Dom)?;
            }
            None => misses.targets.push(parent_id),
        }

        if let Some(actor) = e.actor_id.as_deref() {
            let actor_id = NodeId::script(actor);
            match self.graph.node_index(&actor_id) {
                Some(script) => {
                    let child = self.inserted_element(&child_id, e)?;
                    self.graph.link(script, child, EdgeKind::Actor)?;
                }
                None => misses.actors.push(actor_id),
            }
        }

        let is_textnode_marker = e.node_type == Some(ELEMENT_NODE_TYPE)
            && e.tag_name
                .as_deref()
                .is_some_and(|tag| FLG_TEXTNODE_TAGS.contains(&tag));
        if is_textnode_marker && self.graph.contains(&child_id) {
            let sibling_id = NodeId::element(&e.node_previous_sibling_id);
            if let Some(sibling) = self.graph.get_node_mut(&sibling_id).and_then(|n| n.as_element_mut()) {
                sibling.labels.textnode = true;
            }
        }

        if let Some(child) = self.graph.node_index(&child_id) {
            self.materialize_deferred_request(&child_id, child)?;
        }
        Ok(misses)
    }

    /// Existing element `id`, or a new one built from the insertion record.
    /// Identity fields are only taken from the first observation; the
    /// insertion flag is refreshed on every call.
    fn inserted_element(&mut self, id: &NodeId, e: &NodeInsertion) -> Result<NodeIndex, GraphError> {
        let idx = match self.graph.node_index(id) {
            Some(idx) => idx,
            None => self
                .graph
                .create_node(id.clone(), NodeKind::Element(element_from_insertion(e)))?,
        };
        if e.actor_id.is_some() {
            if let Some(element) = self.graph.node_mut(idx).and_then(|n| n.as_element_mut()) {
                element.influence.mark(Influence::Insertion);
            }
        }
        Ok(idx)
    }

    fn on_removal(&mut self, e: &NodeRemoval) -> Result<Misses, GraphError> {
        let Some(actor) = e.actor_id.as_deref() else {
            return Ok(Misses::default());
        };
        let actor_id = NodeId::script(actor);
        let Some(script) = self.graph.node_index(&actor_id) else {
            return Ok(Misses::actor(actor_id));
        };

        let id = NodeId::element(&e.node_id);
        let element = match self.graph.node_index(&id) {
            Some(idx) => idx,
            None => {
                let mut element = HtmlElement::new(e.tag_name.clone().unwrap_or_default());
                element.script_is_active = true;
                self.graph.create_node(id.clone(), NodeKind::Element(element))?
            }
        };
        if let Some(el) = self.graph.node_mut(element).and_then(|n| n.as_element_mut()) {
            el.influence.mark(Influence::Removal);
        }
        self.graph.link(script, element, EdgeKind::Actor)?;
        self.materialize_deferred_request(&id, element)?;
        Ok(Misses::default())
    }

    fn on_attribute(&mut self, e: &AttributeChange, influence: Influence) -> Result<Misses, GraphError> {
        let mut misses = Misses::default();
        let element_id = NodeId::element(&e.node_id);
        let attr = &e.node_attribute;

        if let Some(actor) = e.actor_id.as_deref() {
            let actor_id = NodeId::script(actor);
            match self.graph.node_index(&actor_id) {
                Some(script) => match self.graph.node_index(&element_id) {
                    Some(target) => {
                        let recorded_tag_empty = self
                            .graph
                            .node(target)
                            .and_then(|n| n.as_element())
                            .is_some_and(|el| el.tag_name.is_empty());
                        // An absent event tag is not an empty one.
                        let event_tag_empty = e.tag_name.as_deref() == Some("");
                        let tracked_name = matches!(attr.attr_name.as_str(), "src" | "href");
                        if event_tag_empty || recorded_tag_empty || tracked_name {
                            self.graph.link(script, target, EdgeKind::Actor)?;
                            if let Some(el) = self.graph.node_mut(target).and_then(|n| n.as_element_mut()) {
                                el.attributes
                                    .push(Attribute::new(attr.attr_name.clone(), attr.attr_value.clone()));
                                el.influence.mark(influence);
                            }
                        }
                    }
                    None => {
                        tracing::trace!(element = %element_id, "attribute change on element not yet inserted");
                    }
                },
                None => misses.actors.push(actor_id),
            }
        }

        if attr.attr_value == "true" {
            if let Some(el) = self.graph.get_node_mut(&element_id).and_then(|n| n.as_element_mut()) {
                match attr.attr_name.as_str() {
                    FLG_IMAGE_ATTR => el.labels.image = true,
                    FLG_AD_ATTR => el.labels.ad = true,
                    _ => {}
                }
            }
        }
        Ok(misses)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Script events
    // ─────────────────────────────────────────────────────────────────────

    fn on_compilation(&mut self, e: &ScriptCompilation) -> Result<Misses, GraphError> {
        let element_id = NodeId::element(&e.node_id);
        let Some(element) = self.graph.node_index(&element_id) else {
            return Ok(Misses::target(element_id));
        };
        let script_id = NodeId::script(&e.script_id);

        let attach_to = match self.graph.tables().request_mapping(element) {
            Some(request) => {
                let is_ad = self
                    .graph
                    .node(request)
                    .and_then(|n| n.as_request())
                    .is_some_and(|r| r.is_ad);
                if is_ad {
                    tracing::debug!(script = %script_id, "script compiled by ad resource, suppressing");
                    self.graph.tables_mut().suppress_script(script_id);
                    return Ok(Misses::default());
                }
                request
            }
            None => element,
        };

        let script = self.script_or_create(script_id, &e.script_text, false)?;
        self.graph.link(attach_to, script, EdgeKind::NodeToScript)?;
        Ok(Misses::default())
    }

    fn on_eval(&mut self, e: &ScriptEval) -> Result<Misses, GraphError> {
        let parent_id = NodeId::script(&e.script_parent_id);
        let Some(parent) = self.graph.node_index(&parent_id) else {
            return Ok(Misses::target(parent_id));
        };
        let script = self.script_or_create(NodeId::script(&e.script_id), &e.script_text, true)?;
        self.graph.link(parent, script, EdgeKind::Actor)?;
        Ok(Misses::default())
    }

    fn script_or_create(&mut self, id: NodeId, text: &str, is_eval: bool) -> Result<NodeIndex, GraphError> {
        match self.graph.node_index(&id) {
            Some(idx) => Ok(idx),
            None => self
                .graph
                .create_node(id, NodeKind::Script(ScriptNode::new(text, is_eval))),
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Network events
    // ─────────────────────────────────────────────────────────────────────

    fn on_network(&mut self, resource: NetworkResource, e: &NetworkRequest) -> Result<Misses, GraphError> {
        if e.request_url.is_empty() {
            tracing::trace!(resource = %resource, "empty request url, ignoring");
            return Ok(Misses::default());
        }
        let mut misses = Misses::default();
        self.request_counter += 1;
        let request_id = NodeId::request(self.request_counter);

        if let Some(actor) = e.actor_id.as_deref() {
            let actor_id = NodeId::script(actor);
            match self.graph.node_index(&actor_id) {
                Some(script) => {
                    let request = self.request_or_create(&request_id, resource, e)?;
                    self.graph.link(script, request, EdgeKind::Actor)?;
                }
                None => misses.actors.push(actor_id),
            }
        }

        let requestor_id = NodeId::element(&e.requestor_id);
        if let Some(requestor) = self.graph.node_index(&requestor_id) {
            let request = self.request_or_create(&request_id, resource, e)?;
            self.graph.link(requestor, request, EdgeKind::Requestor)?;
            if resource == NetworkResource::Script {
                self.graph.tables_mut().add_request_mapping(requestor, request);
            }
            self.stamp_requested_url(requestor, &e.request_url);
            return Ok(misses);
        }

        if let Some(parent_id) = self.graph.tables().deferred_parent(&requestor_id).cloned() {
            if let Some(parent) = self.graph.node_index(&parent_id) {
                let mut placeholder = HtmlElement::new("");
                placeholder.script_is_active = e.actor_id.is_some();
                let requestor = self
                    .graph
                    .create_node(requestor_id.clone(), NodeKind::Element(placeholder))?;
                self.graph.link(parent, requestor, EdgeKind::Requestor)?;
                self.materialize_deferred_request(&requestor_id, requestor)?;
                let request = self.request_or_create(&request_id, resource, e)?;
                self.graph.link(requestor, request, EdgeKind::Requestor)?;
                if resource == NetworkResource::Script {
                    self.graph.tables_mut().add_request_mapping(requestor, request);
                }
                self.graph.tables_mut().remove_deferred_parent(&requestor_id);
                self.stamp_requested_url(requestor, &e.request_url);
                tracing::debug!(
                    requestor = %requestor_id,
                    parent = %parent_id,
                    request = %request_id,
                    "resolved requestor through deferred parent"
                );
                return Ok(misses);
            }
        }

        tracing::debug!(requestor = %requestor_id, request = %request_id, "deferring request until requestor exists");
        let request_node = self.graph.contains(&request_id).then_some(request_id);
        self.graph.tables_mut().add_deferred_request(
            requestor_id,
            PendingRequest {
                resource,
                request: e.clone(),
                request_node,
            },
        );
        Ok(misses)
    }

    fn request_or_create(
        &mut self,
        id: &NodeId,
        resource: NetworkResource,
        e: &NetworkRequest,
    ) -> Result<NodeIndex, GraphError> {
        if let Some(idx) = self.graph.node_index(id) {
            return Ok(idx);
        }
        self.report.requests_created += 1;
        self.graph.create_node(
            id.clone(),
            NodeKind::Request(RequestNode {
                url: e.request_url.clone(),
                script_is_active: e.actor_id.is_some(),
                active_script_id: e.actor_id.clone(),
                is_ad: false,
                requestor_id: e.requestor_id.clone(),
                resource,
            }),
        )
    }

    /// Attach a request queued against `element_id` now that the element
    /// exists. Every path that creates an element calls this.
    fn materialize_deferred_request(&mut self, element_id: &NodeId, element: NodeIndex) -> Result<(), GraphError> {
        let Some(pending) = self.graph.tables().deferred_request(element_id).cloned() else {
            return Ok(());
        };
        self.graph.tables_mut().remove_deferred_request(element_id);

        let request_id = match pending.request_node {
            Some(id) if self.graph.contains(&id) => id,
            _ => {
                self.request_counter += 1;
                NodeId::request(self.request_counter)
            }
        };
        let request = self.request_or_create(&request_id, pending.resource, &pending.request)?;
        self.graph.link(element, request, EdgeKind::AttachedLater)?;
        self.graph.tables_mut().add_request_mapping(element, request);
        self.stamp_requested_url(element, &pending.request.request_url);
        tracing::debug!(element = %element_id, request = %request_id, "materialized deferred request");
        Ok(())
    }

    fn stamp_requested_url(&mut self, element: NodeIndex, url: &str) {
        if let Some(el) = self.graph.node_mut(element).and_then(|n| n.as_element_mut()) {
            el.requested_url = url.to_string();
        }
    }
}

fn element_from_insertion(e: &NodeInsertion) -> HtmlElement {
    let mut element = HtmlElement::new(e.tag_name.clone().unwrap_or_default());
    element.attributes = e
        .node_attributes
        .iter()
        .map(|a| Attribute::new(a.attr_name.clone(), a.attr_value.clone()))
        .collect();
    element.previous_sibling_id = e.node_previous_sibling_id.clone();
    element.script_is_active = e.actor_id.is_some();
    if element.is_script_tag() {
        element.is_async = element.attributes.iter().any(|a| a.name == "async");
        element.is_defer = element.attributes.iter().any(|a| a.name == "defer");
    }
    element
}

/// Build the graph of a parsed timeline in one pass.
pub fn build_graph(timeline: &PageTimeline) -> Result<(AdGraph, IngestReport), IngestError> {
    let mut ingestor = EventIngestor::new(timeline.url.clone());
    ingestor.ingest_all(&timeline.events)?;
    Ok(ingestor.finish())
}
