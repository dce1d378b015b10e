//! First and second parent feature blocks.

use crate::store::AdGraph;
use crate::types::features::{ParentFeatures, UNKNOWN_TAG, UNSET_FIRST_PARENT_TAG};
use crate::types::node::{NodeId, NodeIndex};

/// Which incoming parent of a request to describe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParentRank {
    /// `parents[0]`.
    First,
    /// `parents[1]`.
    Second,
}

impl ParentRank {
    /// Position in the parent list.
    pub fn position(self) -> usize {
        match self {
            Self::First => 0,
            Self::Second => 1,
        }
    }

    /// Column prefix in the flat record.
    pub fn prefix(self) -> &'static str {
        match self {
            Self::First => "first",
            Self::Second => "second",
        }
    }

    /// Tag name reported when the grandparent walk finds none.
    pub fn unset_tag(self) -> &'static str {
        match self {
            Self::First => UNSET_FIRST_PARENT_TAG,
            Self::Second => UNKNOWN_TAG,
        }
    }
}

impl AdGraph {
    /// Describe the `rank`-th parent of `request`.
    ///
    /// Only element parents are described; a missing or non-element parent
    /// yields the default block with the rank's unset tag. The parent's own parents are then walked in
    /// list order to find the first non-empty tag name and to OR together
    /// their script-mutation flags. The walk stops once a tag was found and
    /// all seven flags are set.
    pub fn parent_features(&mut self, request: NodeIndex, rank: ParentRank) -> ParentFeatures {
        let mut features = ParentFeatures::with_unset_tag(rank.unset_tag());

        let Some(parent_idx) = self
            .node(request)
            .and_then(|n| n.parents.get(rank.position()).copied())
        else {
            return features;
        };
        let Some(parent) = self.node(parent_idx) else {
            return features;
        };
        let Some(element) = parent.as_element() else {
            return features;
        };

        features.is_async = element.is_async;
        features.is_defer = element.is_defer;
        features.inbound_connections = parent.inbound_edge_count();
        features.outbound_connections = parent.outbound_edge_count();
        features.inbound_outbound_connections = parent.degree();
        features.number_of_siblings = parent.outbound_edge_count();

        let sibling_id = NodeId::element(&element.previous_sibling_id);
        let grandparents = parent.parents.clone();

        if let Some(sibling) = self.get_node_mut(&sibling_id).and_then(|n| n.as_element_mut()) {
            features.sibling_tag_name = sibling.tag_name.clone();
            features.sibling_ad_keyword = sibling.ad_keyword();
        }

        features.katz_centrality = self.centrality(parent_idx);
        features.average_degree_connectivity = self.average_degree_connectivity(parent_idx);

        let mut tag_found = false;
        for gp_idx in grandparents {
            let Some(gp) = self.node(gp_idx) else {
                continue;
            };
            if let Some(gp_element) = gp.as_element() {
                if !tag_found && !gp_element.tag_name.is_empty() {
                    features.tag_name = gp_element.tag_name.clone();
                    tag_found = true;
                }
                features.influence.absorb(&gp_element.influence);
                features.parent_number_of_siblings += gp.outbound_edge_count();
            }
            if tag_found && features.influence.all() {
                break;
            }
        }

        features
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::edge::EdgeKind;
    use crate::types::event::NetworkResource;
    use crate::types::node::{
        Attribute, HtmlElement, Influence, NodeKind, RequestNode, ScriptNode,
    };

    fn request(graph: &mut AdGraph, n: u64) -> NodeIndex {
        graph
            .create_node(
                NodeId::request(n),
                NodeKind::Request(RequestNode {
                    url: "https://cdn.test/x.js".into(),
                    script_is_active: false,
                    active_script_id: None,
                    is_ad: false,
                    requestor_id: "1".into(),
                    resource: NetworkResource::Script,
                }),
            )
            .unwrap()
    }

    fn element(graph: &mut AdGraph, raw: &str, el: HtmlElement) -> NodeIndex {
        graph.create_node(NodeId::element(raw), NodeKind::Element(el)).unwrap()
    }

    #[test]
    fn test_no_parent_gives_default() {
        let mut graph = AdGraph::new("https://example.com/");
        let req = request(&mut graph, 1);
        assert_eq!(
            graph.parent_features(req, ParentRank::First),
            ParentFeatures::with_unset_tag("")
        );
        assert_eq!(graph.parent_features(req, ParentRank::Second), ParentFeatures::default());
    }

    #[test]
    fn test_script_parent_gives_default() {
        let mut graph = AdGraph::new("https://example.com/");
        let script = graph
            .create_node(NodeId::script("1"), NodeKind::Script(ScriptNode::new("", false)))
            .unwrap();
        let req = request(&mut graph, 1);
        graph.link(script, req, EdgeKind::Actor).unwrap();
        let f = graph.parent_features(req, ParentRank::First);
        assert_eq!(f, ParentFeatures::with_unset_tag(UNSET_FIRST_PARENT_TAG));
        assert_eq!(f.sibling_tag_name, UNKNOWN_TAG);
    }

    #[test]
    fn test_first_parent_block() {
        let mut graph = AdGraph::new("https://example.com/");

        let mut body = HtmlElement::new("body");
        body.influence.mark(Influence::AttrAddition);
        let body = element(&mut graph, "1", body);

        let mut sibling = HtmlElement::new("div");
        sibling.attributes.push(Attribute::new("class", "banner"));
        let sibling = element(&mut graph, "2", sibling);

        let mut tag = HtmlElement::new("script");
        tag.is_async = true;
        tag.previous_sibling_id = "2".into();
        let tag = element(&mut graph, "3", tag);

        let req = request(&mut graph, 1);
        graph.link(body, sibling, EdgeKind::Dom).unwrap();
        graph.link(body, tag, EdgeKind::Dom).unwrap();
        graph.link(tag, req, EdgeKind::Requestor).unwrap();

        let f = graph.parent_features(req, ParentRank::First);
        assert!(f.is_async);
        assert!(!f.is_defer);
        assert_eq!(f.inbound_connections, 1);
        assert_eq!(f.outbound_connections, 1);
        assert_eq!(f.inbound_outbound_connections, 2);
        assert_eq!(f.number_of_siblings, 1);
        assert_eq!(f.sibling_tag_name, "div");
        assert!(f.sibling_ad_keyword);
        assert_eq!(f.tag_name, "body");
        assert_eq!(f.parent_number_of_siblings, 2);
        assert!(f.influence.attr_added);
        assert!(!f.influence.inserted);

        // Second parent does not exist.
        let s = graph.parent_features(req, ParentRank::Second);
        assert_eq!(s.tag_name, UNKNOWN_TAG);
    }

    #[test]
    fn test_sibling_flag_same_for_both_ranks() {
        let mut graph = AdGraph::new("https://example.com/");
        let mut sibling = HtmlElement::new("div");
        sibling.attributes.push(Attribute::new("id", "banner-top"));
        element(&mut graph, "5", sibling);

        let mut a = HtmlElement::new("img");
        a.previous_sibling_id = "5".into();
        let a = element(&mut graph, "6", a);
        let mut b = HtmlElement::new("iframe");
        b.previous_sibling_id = "5".into();
        let b = element(&mut graph, "7", b);

        let req = request(&mut graph, 1);
        graph.link(a, req, EdgeKind::Requestor).unwrap();
        graph.link(b, req, EdgeKind::Requestor).unwrap();

        let first = graph.parent_features(req, ParentRank::First);
        let second = graph.parent_features(req, ParentRank::Second);
        assert!(first.sibling_ad_keyword);
        assert_eq!(first.sibling_ad_keyword, second.sibling_ad_keyword);

        let sib = graph.get_node(&NodeId::element("5")).unwrap().as_element().unwrap();
        assert_eq!(sib.ad_keyword_scans(), 1);
    }

    #[test]
    fn test_grandparent_walk_stops_when_saturated() {
        let mut graph = AdGraph::new("https://example.com/");
        let mut all = HtmlElement::new("section");
        for kind in [
            Influence::Insertion,
            Influence::Removal,
            Influence::AttrAddition,
            Influence::AttrModification,
            Influence::AttrRemoval,
            Influence::StyleAddition,
            Influence::StyleRemoval,
        ] {
            all.influence.mark(kind);
        }
        let gp1 = element(&mut graph, "1", all);
        let gp2 = element(&mut graph, "2", HtmlElement::new("article"));
        let parent = element(&mut graph, "3", HtmlElement::new("div"));
        let req = request(&mut graph, 1);
        graph.link(gp1, parent, EdgeKind::Dom).unwrap();
        graph.link(gp2, parent, EdgeKind::Dom).unwrap();
        graph.link(parent, req, EdgeKind::Requestor).unwrap();

        let f = graph.parent_features(req, ParentRank::First);
        assert_eq!(f.tag_name, "section");
        assert!(f.influence.all());
        // gp2 was not reached.
        assert_eq!(f.parent_number_of_siblings, 1);
    }
}
