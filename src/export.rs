//! Visualization export and diagnostics summary.
//!
//! ## Visualization
//!
//! Force-directed layouts consume `{nodes, links}`:
//!
//! ```text
//! nodes: [{ id, connections, info, group, flg-image?, flg-textnode?, flg-ad?, requested_url? }]
//! links: [{ source, target, edge_type }]
//! ```
//!
//! | Node | `info` | `group` |
//! |------|--------|---------|
//! | element `img` | tag | 2 |
//! | element `iframe` | tag | 4 |
//! | element `link` | tag | 8 |
//! | other element | tag | 1 |
//! | script | `script` | 7 |
//! | request | URL | 6 |

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::FeatureConfig;
use crate::ingest::IngestReport;
use crate::store::AdGraph;
use crate::types::node::{HtmlElement, Node, NodeKind};

/// Render group of element nodes without a dedicated group.
pub const GROUP_ELEMENT: u8 = 1;
/// Render group of `<img>` elements.
pub const GROUP_IMAGE: u8 = 2;
/// Render group of `<iframe>` elements.
pub const GROUP_IFRAME: u8 = 4;
/// Render group of request nodes.
pub const GROUP_REQUEST: u8 = 6;
/// Render group of script nodes.
pub const GROUP_SCRIPT: u8 = 7;
/// Render group of `<link>` elements.
pub const GROUP_LINK: u8 = 8;

/// Node entry of the visualization export.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VisNode {
    /// Node id.
    pub id: String,
    /// Inbound plus outbound degree.
    pub connections: usize,
    /// Tag name, `script`, or URL.
    pub info: String,
    /// Render group.
    pub group: u8,
    /// FLG image label, elements only.
    #[serde(rename = "flg-image", skip_serializing_if = "Option::is_none")]
    pub flg_image: Option<String>,
    /// FLG text-node label, elements only.
    #[serde(rename = "flg-textnode", skip_serializing_if = "Option::is_none")]
    pub flg_textnode: Option<String>,
    /// FLG ad label, elements only.
    #[serde(rename = "flg-ad", skip_serializing_if = "Option::is_none")]
    pub flg_ad: Option<String>,
    /// URL requested by the element, elements only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requested_url: Option<String>,
}

/// Link entry of the visualization export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VisLink {
    /// Source node id.
    pub source: String,
    /// Target node id.
    pub target: String,
    /// Edge kind wire name.
    pub edge_type: String,
}

/// Complete visualization export.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VisualizationGraph {
    /// Nodes in creation order.
    pub nodes: Vec<VisNode>,
    /// Links in edge-log order.
    pub links: Vec<VisLink>,
}

fn element_group(element: &HtmlElement) -> u8 {
    match element.tag_name.to_ascii_lowercase().as_str() {
        "img" => GROUP_IMAGE,
        "iframe" => GROUP_IFRAME,
        "link" => GROUP_LINK,
        _ => GROUP_ELEMENT,
    }
}

fn flag(value: bool) -> Option<String> {
    Some(value.to_string())
}

fn vis_node(node: &Node) -> VisNode {
    let base = VisNode {
        id: node.id.to_string(),
        connections: node.degree(),
        info: String::new(),
        group: GROUP_ELEMENT,
        flg_image: None,
        flg_textnode: None,
        flg_ad: None,
        requested_url: None,
    };
    match &node.kind {
        NodeKind::Element(element) => VisNode {
            info: element.tag_name.clone(),
            group: element_group(element),
            flg_image: flag(element.labels.image),
            flg_textnode: flag(element.labels.textnode),
            flg_ad: flag(element.labels.ad),
            requested_url: Some(element.requested_url.clone()),
            ..base
        },
        NodeKind::Script(_) => VisNode {
            info: "script".to_string(),
            group: GROUP_SCRIPT,
            ..base
        },
        NodeKind::Request(request) => VisNode {
            info: request.url.clone(),
            group: GROUP_REQUEST,
            ..base
        },
    }
}

impl AdGraph {
    /// Nodes and links for rendering, including attached-later edges.
    pub fn visualization(&self) -> VisualizationGraph {
        VisualizationGraph {
            nodes: self.nodes().iter().map(vis_node).collect(),
            links: self
                .edges()
                .iter()
                .map(|e| VisLink {
                    source: e.source.to_string(),
                    target: e.target.to_string(),
                    edge_type: e.kind.as_str().to_string(),
                })
                .collect(),
        }
    }
}

/// Counts, cumulative timings and provenance of one run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiagnosticsSummary {
    /// Node count.
    pub nodes: usize,
    /// Edge count.
    pub edges: usize,
    /// Request node count.
    pub url_nodes: usize,
    /// Node block time (ms).
    pub node_properties: f64,
    /// First parent block time (ms).
    pub first_parent_properties: f64,
    /// Second parent block time (ms).
    pub second_parent_properties: f64,
    /// URL block time (ms).
    pub url_properties: f64,
    /// Ascendant walk time (ms).
    pub ascendant_properties: f64,
    /// Descendant count time (ms).
    pub descendant_properties: f64,
    /// Katz solve time (ms).
    pub katz_properties: f64,
    /// Events naming an unknown actor script.
    pub unresolved_events: usize,
    /// Events whose structural target was absent.
    pub dangling_events: usize,
    /// Network events still waiting for their requestor.
    pub pending_requests: usize,
    /// Hash of the feature configuration.
    pub params_hash: String,
    /// Structural fingerprint of the graph.
    pub graph_fingerprint: String,
    /// Summary creation time.
    pub generated_at: DateTime<Utc>,
}

impl DiagnosticsSummary {
    /// Summarize a finished run.
    pub fn collect(graph: &AdGraph, report: &IngestReport, config: &FeatureConfig) -> Self {
        let t = graph.timings();
        let ms = |d: std::time::Duration| d.as_secs_f64() * 1000.0;
        Self {
            nodes: graph.node_count(),
            edges: graph.edge_count(),
            url_nodes: graph.request_count(),
            node_properties: ms(t.node_properties),
            first_parent_properties: ms(t.first_parent_properties),
            second_parent_properties: ms(t.second_parent_properties),
            url_properties: ms(t.url_properties),
            ascendant_properties: ms(t.ascendant_properties),
            descendant_properties: ms(t.descendant_properties),
            katz_properties: ms(t.katz_properties),
            unresolved_events: report.unresolved.len(),
            dangling_events: report.dangling.len(),
            pending_requests: report.pending_requests,
            params_hash: config.params_hash(),
            graph_fingerprint: graph.fingerprint(),
            generated_at: Utc::now(),
        }
    }
}
