//! Feature record types.
//!
//! One [`FeatureRecord`] is produced per request node. Blocks are kept as
//! nested structs for typed access; [`FeatureRecord::flatten`] yields the
//! fixed tabular schema consumed by downstream classifiers.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::node::ScriptInfluence;

/// Class label of an advertising request.
pub const LABEL_AD: &str = "AD";
/// Class label of a non-advertising request.
pub const LABEL_NONAD: &str = "NONAD";
/// Tag name reported when no tag could be determined.
pub const UNKNOWN_TAG: &str = "UNKNOWN";
/// First-parent tag name reported when no tag could be determined.
pub const UNSET_FIRST_PARENT_TAG: &str = "";

/// Graph-wide counts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphFeatures {
    /// Number of nodes.
    pub nodes: usize,
    /// Number of edges.
    pub edges: usize,
    /// nodes / edges (0 when there are no edges).
    pub nodes_per_edge: f64,
    /// edges / nodes (0 when there are no nodes).
    pub edges_per_node: f64,
}

/// Features of the request node itself.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeFeatures {
    /// Namespaced request id.
    pub node_id: String,
    /// Incoming edges.
    pub inbound_connections: usize,
    /// Outgoing edges.
    pub outbound_connections: usize,
    /// Incoming plus outgoing edges.
    pub inbound_outbound_connections: usize,
    /// Katz centrality from the latest converged solve.
    pub katz_centrality: f64,
    /// Normalized average degree connectivity.
    pub average_degree_connectivity: f64,
    /// A script was running when the request was issued.
    pub script_is_active: bool,
    /// The active script was itself created by eval/Function.
    pub script_is_eval_or_function: bool,
    /// Event-kind label of the request.
    pub node_category: String,
    /// `AD` / `NONAD`.
    pub class: String,
}

/// Features of the first or second structural parent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParentFeatures {
    /// Parent is an async script.
    pub is_async: bool,
    /// Parent is a deferred script.
    pub is_defer: bool,
    /// First non-empty tag name among the parent's own parents.
    pub tag_name: String,
    /// Outbound degree of the parent.
    pub number_of_siblings: usize,
    /// Summed outbound degree of the parent's element parents that were walked.
    pub parent_number_of_siblings: usize,
    /// Tag name of the parent's previous sibling.
    pub sibling_tag_name: String,
    /// Previous sibling carries an ad keyword in its attribute values.
    pub sibling_ad_keyword: bool,
    /// Incoming edges of the parent.
    pub inbound_connections: usize,
    /// Outgoing edges of the parent.
    pub outbound_connections: usize,
    /// Incoming plus outgoing edges of the parent.
    pub inbound_outbound_connections: usize,
    /// Katz centrality of the parent.
    pub katz_centrality: f64,
    /// Average degree connectivity of the parent.
    pub average_degree_connectivity: f64,
    /// Disjunction of script-mutation flags over the walked grandparents.
    pub influence: ScriptInfluence,
}

impl Default for ParentFeatures {
    fn default() -> Self {
        Self {
            is_async: false,
            is_defer: false,
            tag_name: UNKNOWN_TAG.to_string(),
            number_of_siblings: 0,
            parent_number_of_siblings: 0,
            sibling_tag_name: UNKNOWN_TAG.to_string(),
            sibling_ad_keyword: false,
            inbound_connections: 0,
            outbound_connections: 0,
            inbound_outbound_connections: 0,
            katz_centrality: 0.0,
            average_degree_connectivity: 0.0,
            influence: ScriptInfluence::default(),
        }
    }
}

impl ParentFeatures {
    /// Default block whose `tag_name` is `unset_tag`.
    pub fn with_unset_tag(unset_tag: &str) -> Self {
        Self {
            tag_name: unset_tag.to_string(),
            ..Self::default()
        }
    }

    fn push_columns(&self, prefix: &str, out: &mut Vec<(String, Value)>) {
        let mut col = |name: &str, value: Value| out.push((format!("{prefix}_{name}"), value));
        col("parent_is_async", self.is_async.into());
        col("parent_is_defer", self.is_defer.into());
        col("parent_tag_name", self.tag_name.clone().into());
        col("number_of_siblings", self.number_of_siblings.into());
        col("parent_number_of_siblings", self.parent_number_of_siblings.into());
        col("parent_sibling_tag_name", self.sibling_tag_name.clone().into());
        col("parent_sibling_ad_keyword", self.sibling_ad_keyword.into());
        col("parent_inbound_connections", self.inbound_connections.into());
        col("parent_outbound_connections", self.outbound_connections.into());
        col(
            "parent_inbound_outbound_connections",
            self.inbound_outbound_connections.into(),
        );
        col("parent_katz_centrality", self.katz_centrality.into());
        col(
            "parent_average_degree_connectivity",
            self.average_degree_connectivity.into(),
        );
        col("parent_node_added_by_script", self.influence.inserted.into());
        col("parent_node_removed_by_script", self.influence.removed.into());
        col("parent_attr_added_by_script", self.influence.attr_added.into());
        col("parent_attr_modified_by_script", self.influence.attr_modified.into());
        col("parent_attr_removed_by_script", self.influence.attr_removed.into());
        col("parent_style_attr_added_by_script", self.influence.style_added.into());
        col("parent_style_attr_removed_by_script", self.influence.style_removed.into());
    }
}

/// Lexical features of the request URL.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrlFeatures {
    /// URL contains an ad keyword.
    pub ad_related_keyword: bool,
    /// An ad keyword is preceded by URL punctuation.
    pub special_char_ad_keyword: bool,
    /// URL contains `;`.
    pub semicolon_in_url: bool,
    /// URL has no query parameters.
    pub valid_query_string: bool,
    /// A query value contains the page's base domain.
    pub base_domain_in_qs: bool,
    /// A query value looks like `300x250`.
    pub ad_dimensions_in_qs: bool,
    /// The full URL contains a `300x250`-like pattern.
    pub ad_dimensions_in_complete_url: bool,
    /// A query key names a screen dimension.
    pub screen_dimensions_in_qs: bool,
    /// Host equals the base domain (first party).
    pub domain_party: bool,
    /// Host contains the base domain.
    pub sub_domain_check: bool,
    /// URL length in bytes.
    pub url_length: usize,
}

/// Features aggregated over the request's ancestors.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AscendantFeatures {
    /// A script element or script node is an ancestor.
    pub descendant_of_script: bool,
    /// Some element ancestor carries an ad keyword.
    pub ascendants_have_ad_keyword: bool,
    /// Some script ancestor was created by eval/Function.
    pub descendant_of_eval_or_function: bool,
    /// Some script ancestor's text mentions eval/Function.
    pub ascendant_has_eval_or_function: bool,
    /// Some script ancestor's text mentions a fingerprinting API.
    pub ascendant_has_fingerprinting_keyword: bool,
    /// Text length of the nearest script ancestor.
    pub ascendant_script_length: usize,
}

/// Complete feature record of one request node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureRecord {
    /// Graph-wide counts.
    pub graph: GraphFeatures,
    /// Request node features.
    pub node: NodeFeatures,
    /// First parent block.
    pub first_parent: ParentFeatures,
    /// Second parent block.
    pub second_parent: ParentFeatures,
    /// URL block.
    pub url: UrlFeatures,
    /// Ancestor block.
    pub ascendant: AscendantFeatures,
    /// Descendants within the hop limit.
    pub number_of_descendants: usize,
}

impl Default for FeatureRecord {
    fn default() -> Self {
        Self {
            graph: GraphFeatures::default(),
            node: NodeFeatures::default(),
            first_parent: ParentFeatures::with_unset_tag(UNSET_FIRST_PARENT_TAG),
            second_parent: ParentFeatures::default(),
            url: UrlFeatures::default(),
            ascendant: AscendantFeatures::default(),
            number_of_descendants: 0,
        }
    }
}

impl FeatureRecord {
    /// Flatten to the fixed, ordered tabular schema.
    pub fn flatten(&self) -> Vec<(String, Value)> {
        fn col(out: &mut Vec<(String, Value)>, name: &str, value: Value) {
            out.push((name.to_string(), value));
        }

        let mut out: Vec<(String, Value)> = Vec::with_capacity(70);

        col(&mut out, "graph_nodes", self.graph.nodes.into());
        col(&mut out, "graph_edges", self.graph.edges.into());
        col(&mut out, "graph_nodes_edges", self.graph.nodes_per_edge.into());
        col(&mut out, "graph_edges_nodes", self.graph.edges_per_node.into());

        let n = &self.node;
        col(&mut out, "node_id", n.node_id.clone().into());
        col(&mut out, "inbound_connections", n.inbound_connections.into());
        col(&mut out, "outbound_connections", n.outbound_connections.into());
        col(
            &mut out,
            "inbound_outbound_connections",
            n.inbound_outbound_connections.into(),
        );
        col(&mut out, "katz_centrality", n.katz_centrality.into());
        col(
            &mut out,
            "average_degree_connectivity",
            n.average_degree_connectivity.into(),
        );
        col(&mut out, "script_is_active", n.script_is_active.into());
        col(
            &mut out,
            "script_is_eval_or_function",
            n.script_is_eval_or_function.into(),
        );
        col(&mut out, "node_category", n.node_category.clone().into());
        col(&mut out, "class", n.class.clone().into());

        self.first_parent.push_columns("first", &mut out);
        self.second_parent.push_columns("second", &mut out);

        let u = &self.url;
        col(&mut out, "ad_related_keyword", u.ad_related_keyword.into());
        col(&mut out, "special_char_ad_keyword", u.special_char_ad_keyword.into());
        col(&mut out, "valid_query_string", u.valid_query_string.into());
        col(&mut out, "semicolon_in_url", u.semicolon_in_url.into());
        col(&mut out, "base_domain_in_qs", u.base_domain_in_qs.into());
        col(&mut out, "domain_party", u.domain_party.into());
        col(&mut out, "sub_domain_check", u.sub_domain_check.into());
        col(&mut out, "screen_dimensions_in_qs", u.screen_dimensions_in_qs.into());
        col(&mut out, "ad_dimensions_in_qs", u.ad_dimensions_in_qs.into());
        col(
            &mut out,
            "ad_dimensions_in_complete_url",
            u.ad_dimensions_in_complete_url.into(),
        );
        col(&mut out, "url_length", u.url_length.into());

        let a = &self.ascendant;
        col(&mut out, "decendant_of_a_script", a.descendant_of_script.into());
        col(
            &mut out,
            "ascendants_have_ad_keyword",
            a.ascendants_have_ad_keyword.into(),
        );
        col(
            &mut out,
            "descendant_of_eval_or_function",
            a.descendant_of_eval_or_function.into(),
        );
        col(
            &mut out,
            "ascendant_has_eval_or_function",
            a.ascendant_has_eval_or_function.into(),
        );
        col(
            &mut out,
            "ascendant_has_fingerprinting_keyword",
            a.ascendant_has_fingerprinting_keyword.into(),
        );
        col(&mut out, "ascendant_script_length", a.ascendant_script_length.into());

        col(&mut out, "number_of_descendants", self.number_of_descendants.into());
        out
    }

    /// Column names of the flat schema, in order.
    pub fn column_names() -> Vec<String> {
        Self::default().flatten().into_iter().map(|(name, _)| name).collect()
    }
}
