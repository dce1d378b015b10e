//! Core types for the page graph.

pub mod node;
pub mod edge;
pub mod event;
pub mod features;

pub use node::{
    Attribute, HtmlElement, Influence, LabelFlags, Node, NodeId, NodeIndex, NodeKind, RequestNode,
    ScriptInfluence, ScriptNode, ScriptTextTraits,
};
pub use edge::{Edge, EdgeKind};
pub use event::{EventError, NetworkRequest, NetworkResource, PageTimeline, TimelineEvent};
pub use features::{FeatureRecord, LABEL_AD, LABEL_NONAD, UNKNOWN_TAG, UNSET_FIRST_PARENT_TAG};
