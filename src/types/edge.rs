//! Edge types for the page graph.

use serde::{Deserialize, Serialize};
use super::node::NodeId;

/// Kind of edge in the page graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
    /// Structural DOM parent to child.
    Dom,
    /// Executing script to the element, request or script it produced.
    Actor,
    /// Element or script that triggered a network fetch.
    Requestor,
    /// Element (or its fetched resource) to the script compiled in it.
    NodeToScript,
    /// Element to a request that was queued before the element existed.
    AttachedLater,
}

impl EdgeKind {
    /// Parse edge kind from its wire name.
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "dom" => Some(Self::Dom),
            "actor" => Some(Self::Actor),
            "requestor" => Some(Self::Requestor),
            "node_to_script" => Some(Self::NodeToScript),
            "attached_later" => Some(Self::AttachedLater),
            _ => None,
        }
    }

    /// Wire name used in the visualization export.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Dom => "dom",
            Self::Actor => "actor",
            Self::Requestor => "requestor",
            Self::NodeToScript => "node_to_script",
            Self::AttachedLater => "attached_later",
        }
    }
}

impl std::fmt::Display for EdgeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Entry of the append-only edge log.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Edge {
    /// Source node.
    pub source: NodeId,
    /// Target node.
    pub target: NodeId,
    /// Kind of edge.
    pub kind: EdgeKind,
}

impl Edge {
    /// Create a new edge.
    pub fn new(source: NodeId, target: NodeId, kind: EdgeKind) -> Self {
        Self {
            source,
            target,
            kind,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_names_roundtrip() {
        for kind in [
            EdgeKind::Dom,
            EdgeKind::Actor,
            EdgeKind::Requestor,
            EdgeKind::NodeToScript,
            EdgeKind::AttachedLater,
        ] {
            assert_eq!(EdgeKind::from_str(&kind.to_string()), Some(kind));
        }
        assert_eq!(EdgeKind::from_str("reply"), None);
    }

    #[test]
    fn test_serde_matches_display() {
        let json = serde_json::to_string(&EdgeKind::NodeToScript).unwrap();
        assert_eq!(json, "\"node_to_script\"");
    }
}
