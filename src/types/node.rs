//! Node types for the page graph.
//!
//! Every node lives in the [`AdGraph`](crate::store::AdGraph) arena and is
//! addressed by a [`NodeIndex`]. Parent and child lists hold indices, never
//! references, so the graph may contain shared ancestors (and, on malformed
//! timelines, cycles) without ownership conflicts.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::event::NetworkResource;
use crate::analytics::keywords;

/// Prefix for HTML element identifiers.
pub const ELEMENT_ID_PREFIX: &str = "NODE_";
/// Prefix for script identifiers.
pub const SCRIPT_ID_PREFIX: &str = "SCRIPT_";
/// Prefix for request identifiers.
pub const REQUEST_ID_PREFIX: &str = "URL_";

/// Kind-namespaced node identifier.
///
/// The raw ids carried by timeline events are per-kind counters emitted by
/// the browser, so element `7` and script `7` are different entities. The
/// prefix keeps them apart inside one graph.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    /// Wrap an already namespaced identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Identifier of the HTML element with raw id `raw`.
    pub fn element(raw: &str) -> Self {
        Self(format!("{ELEMENT_ID_PREFIX}{raw}"))
    }

    /// Identifier of the script with raw id `raw`.
    pub fn script(raw: &str) -> Self {
        Self(format!("{SCRIPT_ID_PREFIX}{raw}"))
    }

    /// Identifier of the `counter`-th request of a timeline.
    pub fn request(counter: u64) -> Self {
        Self(format!("{REQUEST_ID_PREFIX}{counter}"))
    }

    /// Borrow the identifier text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Stable arena key of a node inside one graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeIndex(pub usize);

impl NodeIndex {
    /// Position in the arena.
    pub fn index(self) -> usize {
        self.0
    }
}

/// Name/value attribute pair recorded on an element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    /// Attribute name.
    pub name: String,
    /// Attribute value.
    pub value: String,
}

impl Attribute {
    /// Create a new attribute pair.
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Kind of script-driven mutation observed on an element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Influence {
    /// Element inserted by a script.
    Insertion,
    /// Element removed by a script.
    Removal,
    /// Attribute added by a script.
    AttrAddition,
    /// Attribute modified by a script.
    AttrModification,
    /// Attribute removed by a script.
    AttrRemoval,
    /// Style text added by a script.
    StyleAddition,
    /// Style removed by a script.
    StyleRemoval,
}

/// Sticky "modified by script" flags of an element.
///
/// Flags only ever move from `false` to `true`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptInfluence {
    /// Inserted by a script.
    pub inserted: bool,
    /// Removed by a script.
    pub removed: bool,
    /// Attribute added by a script.
    pub attr_added: bool,
    /// Attribute modified by a script.
    pub attr_modified: bool,
    /// Attribute removed by a script.
    pub attr_removed: bool,
    /// Style added by a script.
    pub style_added: bool,
    /// Style removed by a script.
    pub style_removed: bool,
}

impl ScriptInfluence {
    /// Set the flag for `kind`.
    pub fn mark(&mut self, kind: Influence) {
        match kind {
            Influence::Insertion => self.inserted = true,
            Influence::Removal => self.removed = true,
            Influence::AttrAddition => self.attr_added = true,
            Influence::AttrModification => self.attr_modified = true,
            Influence::AttrRemoval => self.attr_removed = true,
            Influence::StyleAddition => self.style_added = true,
            Influence::StyleRemoval => self.style_removed = true,
        }
    }

    /// Read the flag for `kind`.
    pub fn get(&self, kind: Influence) -> bool {
        match kind {
            Influence::Insertion => self.inserted,
            Influence::Removal => self.removed,
            Influence::AttrAddition => self.attr_added,
            Influence::AttrModification => self.attr_modified,
            Influence::AttrRemoval => self.attr_removed,
            Influence::StyleAddition => self.style_added,
            Influence::StyleRemoval => self.style_removed,
        }
    }

    /// Fold another element's flags in by disjunction.
    pub fn absorb(&mut self, other: &ScriptInfluence) {
        self.inserted |= other.inserted;
        self.removed |= other.removed;
        self.attr_added |= other.attr_added;
        self.attr_modified |= other.attr_modified;
        self.attr_removed |= other.attr_removed;
        self.style_added |= other.style_added;
        self.style_removed |= other.style_removed;
    }

    /// True once every flag is set.
    pub fn all(&self) -> bool {
        self.inserted
            && self.removed
            && self.attr_added
            && self.attr_modified
            && self.attr_removed
            && self.style_added
            && self.style_removed
    }
}

/// Ground-truth labels attached through the FLG attribute convention.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelFlags {
    /// Element carried `flg-image="true"`.
    pub image: bool,
    /// Element is followed by an FLG text-node marker.
    pub textnode: bool,
    /// Element carried `flg-ad="true"`.
    pub ad: bool,
}

/// HTML element payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HtmlElement {
    /// Tag name as recorded by the browser (case preserved).
    pub tag_name: String,
    /// Attributes in observation order.
    pub attributes: Vec<Attribute>,
    /// Raw id of the previous sibling element (`"0"` when none).
    pub previous_sibling_id: String,
    /// `<script async>`.
    pub is_async: bool,
    /// `<script defer>`.
    pub is_defer: bool,
    /// A script was running when the element was first observed.
    pub script_is_active: bool,
    /// Sticky script-mutation flags.
    pub influence: ScriptInfluence,
    /// FLG labels.
    pub labels: LabelFlags,
    /// URL of the most recent request this element triggered.
    pub requested_url: String,
    ad_keyword: Option<bool>,
    ad_keyword_scans: u32,
}

impl HtmlElement {
    /// Create an element with identity fields only.
    pub fn new(tag_name: impl Into<String>) -> Self {
        Self {
            tag_name: tag_name.into(),
            previous_sibling_id: "0".to_string(),
            ..Default::default()
        }
    }

    /// True if the tag is `script` or `SCRIPT`.
    pub fn is_script_tag(&self) -> bool {
        matches!(self.tag_name.as_str(), "script" | "SCRIPT")
    }

    /// Memoized "ad keyword present in attribute values" flag, or `None`
    /// if it has not been computed yet.
    pub fn has_ad_keyword(&self) -> Option<bool> {
        self.ad_keyword
    }

    /// Whether the memoized keyword flag has been computed.
    pub fn is_ad_keyword_computed(&self) -> bool {
        self.ad_keyword.is_some()
    }

    /// Number of times the attribute list was actually scanned.
    pub fn ad_keyword_scans(&self) -> u32 {
        self.ad_keyword_scans
    }

    /// Return the memoized keyword flag, scanning attributes on first use.
    pub fn ad_keyword(&mut self) -> bool {
        if let Some(flag) = self.ad_keyword {
            return flag;
        }
        let flag = keywords::attributes_have_ad_keyword(&self.attributes);
        self.ad_keyword_scans += 1;
        self.ad_keyword = Some(flag);
        flag
    }
}

/// Eval and fingerprinting traits derived from a script's text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptTextTraits {
    /// Text mentions `eval` or `Function`.
    pub has_eval_or_function: bool,
    /// Text mentions a canvas fingerprinting API.
    pub has_fingerprinting_keyword: bool,
}

/// Script payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScriptNode {
    /// Script source text.
    pub text: String,
    /// Created through a dynamic evaluation construct.
    pub is_eval_or_function: bool,
    traits: Option<ScriptTextTraits>,
    trait_scans: u32,
}

impl ScriptNode {
    /// Create a script node.
    pub fn new(text: impl Into<String>, is_eval_or_function: bool) -> Self {
        Self {
            text: text.into(),
            is_eval_or_function,
            ..Default::default()
        }
    }

    /// Length of the source text in bytes.
    pub fn length(&self) -> usize {
        self.text.len()
    }

    /// Memoized text traits, or `None` before first computation.
    pub fn text_traits(&self) -> Option<ScriptTextTraits> {
        self.traits
    }

    /// Number of times the script text was actually scanned.
    pub fn trait_scans(&self) -> u32 {
        self.trait_scans
    }

    /// Return the memoized text traits, scanning the text on first use.
    pub fn traits(&mut self) -> ScriptTextTraits {
        if let Some(traits) = self.traits {
            return traits;
        }
        let traits = keywords::script_text_traits(&self.text);
        self.trait_scans += 1;
        self.traits = Some(traits);
        traits
    }
}

/// Network request payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestNode {
    /// Requested URL.
    pub url: String,
    /// A script was running when the request was issued.
    pub script_is_active: bool,
    /// Raw id of the active script, if any.
    pub active_script_id: Option<String>,
    /// Ground-truth advertising label (false at construction).
    pub is_ad: bool,
    /// Raw id of the requesting element.
    pub requestor_id: String,
    /// Resource kind of the network event that minted the request.
    pub resource: NetworkResource,
}

/// Kind-specific payload of a node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NodeKind {
    /// HTML element.
    Element(HtmlElement),
    /// Script.
    Script(ScriptNode),
    /// Network request.
    Request(RequestNode),
}

impl NodeKind {
    /// Short kind label.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Element(_) => "element",
            Self::Script(_) => "script",
            Self::Request(_) => "request",
        }
    }
}

/// A node of the page graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Namespaced identifier.
    pub id: NodeId,
    /// Sources of incoming edges, in edge-add order.
    pub parents: Vec<NodeIndex>,
    /// Targets of outgoing edges, in edge-add order.
    pub children: Vec<NodeIndex>,
    /// Kind-specific payload.
    pub kind: NodeKind,
}

impl Node {
    /// Create an unlinked node.
    pub fn new(id: NodeId, kind: NodeKind) -> Self {
        Self {
            id,
            parents: Vec::new(),
            children: Vec::new(),
            kind,
        }
    }

    /// Number of incoming edges.
    pub fn inbound_edge_count(&self) -> usize {
        self.parents.len()
    }

    /// Number of outgoing edges.
    pub fn outbound_edge_count(&self) -> usize {
        self.children.len()
    }

    /// Inbound plus outbound edges.
    pub fn degree(&self) -> usize {
        self.parents.len() + self.children.len()
    }

    /// Element payload, if this is an element.
    pub fn as_element(&self) -> Option<&HtmlElement> {
        match &self.kind {
            NodeKind::Element(e) => Some(e),
            _ => None,
        }
    }

    /// Mutable element payload, if this is an element.
    pub fn as_element_mut(&mut self) -> Option<&mut HtmlElement> {
        match &mut self.kind {
            NodeKind::Element(e) => Some(e),
            _ => None,
        }
    }

    /// Script payload, if this is a script.
    pub fn as_script(&self) -> Option<&ScriptNode> {
        match &self.kind {
            NodeKind::Script(s) => Some(s),
            _ => None,
        }
    }

    /// Mutable script payload, if this is a script.
    pub fn as_script_mut(&mut self) -> Option<&mut ScriptNode> {
        match &mut self.kind {
            NodeKind::Script(s) => Some(s),
            _ => None,
        }
    }

    /// Request payload, if this is a request.
    pub fn as_request(&self) -> Option<&RequestNode> {
        match &self.kind {
            NodeKind::Request(r) => Some(r),
            _ => None,
        }
    }

    /// Mutable request payload, if this is a request.
    pub fn as_request_mut(&mut self) -> Option<&mut RequestNode> {
        match &mut self.kind {
            NodeKind::Request(r) => Some(r),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_namespaced() {
        assert_eq!(NodeId::element("7").as_str(), "NODE_7");
        assert_eq!(NodeId::script("7").as_str(), "SCRIPT_7");
        assert_eq!(NodeId::request(7).as_str(), "URL_7");
        assert_ne!(NodeId::element("7"), NodeId::script("7"));
    }

    #[test]
    fn test_influence_is_sticky() {
        let mut flags = ScriptInfluence::default();
        flags.mark(Influence::Removal);
        flags.mark(Influence::Removal);
        assert!(flags.get(Influence::Removal));
        assert!(!flags.get(Influence::Insertion));
        assert!(!flags.all());
    }

    #[test]
    fn test_ad_keyword_memoized() {
        let mut el = HtmlElement::new("div");
        el.attributes.push(Attribute::new("class", "top-banner"));
        assert!(!el.is_ad_keyword_computed());

        assert!(el.ad_keyword());
        // Later attributes do not invalidate the memo.
        el.attributes.clear();
        assert!(el.ad_keyword());
        assert_eq!(el.ad_keyword_scans(), 1);
        assert_eq!(el.has_ad_keyword(), Some(true));
    }

    #[test]
    fn test_script_traits_memoized() {
        let mut script = ScriptNode::new("var c = canvas.toDataURL();", false);
        let traits = script.traits();
        assert!(traits.has_fingerprinting_keyword);
        assert!(!traits.has_eval_or_function);
        script.traits();
        assert_eq!(script.trait_scans(), 1);
        assert_eq!(script.length(), 27);
    }

    #[test]
    fn test_script_tag_exact_spellings() {
        assert!(HtmlElement::new("SCRIPT").is_script_tag());
        assert!(HtmlElement::new("script").is_script_tag());
        assert!(!HtmlElement::new("Script").is_script_tag());
        assert!(!HtmlElement::new("img").is_script_tag());
    }
}
