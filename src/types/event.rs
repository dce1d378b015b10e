//! Timeline event types.
//!
//! A recorded page load is a JSON document of the form
//!
//! ```text
//! { "url": "https://www.example.com/", "timeline": [ { "event_type": ..., ... }, ... ] }
//! ```
//!
//! Every record is parsed into a typed [`TimelineEvent`]. Required fields are
//! enforced by the deserializer: a record missing one is rejected with an
//! [`EventError`] naming its position in the timeline. The only substituted
//! default is the actor sentinel `"0"`, which becomes `None`.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Actor id the browser records when no script was running.
pub const NO_ACTOR: &str = "0";

/// Error type for timeline parsing.
#[derive(Debug, thiserror::Error)]
pub enum EventError {
    /// The document is not a `{url, timeline}` object.
    #[error("Invalid timeline document: {0}")]
    InvalidDocument(#[source] serde_json::Error),

    /// A timeline record is missing a required field or has a wrong type.
    #[error("Malformed event at index {index}: {source}")]
    Malformed {
        /// Position of the record in the timeline.
        index: usize,
        /// Underlying decode error.
        #[source]
        source: serde_json::Error,
    },
}

mod actor_sentinel {
    use super::NO_ACTOR;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Ok((raw != NO_ACTOR).then_some(raw))
    }

    pub fn serialize<S>(actor: &Option<String>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(actor.as_deref().unwrap_or(NO_ACTOR))
    }
}

/// Attribute pair as carried by events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventAttribute {
    /// Attribute name.
    pub attr_name: String,
    /// Attribute value.
    pub attr_value: String,
}

/// DOM insertion of an element under a parent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeInsertion {
    /// Raw id of the inserted element.
    pub node_id: String,
    /// Raw id of the structural parent.
    pub node_parent_id: String,
    /// Raw id of the inserting script.
    #[serde(with = "actor_sentinel")]
    pub actor_id: Option<String>,
    /// Tag name, absent for some node types.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag_name: Option<String>,
    /// DOM node type code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_type: Option<i64>,
    /// Raw id of the previous sibling (`"0"` when none).
    pub node_previous_sibling_id: String,
    /// Attributes present at insertion time.
    #[serde(default)]
    pub node_attributes: Vec<EventAttribute>,
}

/// Script-driven removal of an element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeRemoval {
    /// Raw id of the removed element.
    pub node_id: String,
    /// Raw id of the removing script.
    #[serde(with = "actor_sentinel")]
    pub actor_id: Option<String>,
    /// Tag name, if recorded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag_name: Option<String>,
}

/// Forward reference from an element to its future parent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachLater {
    /// Raw id of the element.
    pub node_id: String,
    /// Raw id of the intended parent.
    pub node_parent_id: String,
}

/// Script compiled inside an element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptCompilation {
    /// Raw id of the compiling element.
    pub node_id: String,
    /// Raw id of the compiled script.
    pub script_id: String,
    /// Source text.
    pub script_text: String,
}

/// Script created by `eval` / `Function` from a parent script.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptEval {
    /// Raw id of the new script.
    pub script_id: String,
    /// Raw id of the evaluating script.
    pub script_parent_id: String,
    /// Source text.
    pub script_text: String,
}

/// Attribute addition, modification, removal or style change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeChange {
    /// Raw id of the target element.
    pub node_id: String,
    /// Raw id of the mutating script.
    #[serde(with = "actor_sentinel")]
    pub actor_id: Option<String>,
    /// Tag name, if recorded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag_name: Option<String>,
    /// Changed attribute.
    pub node_attribute: EventAttribute,
}

/// Network fetch of a resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkRequest {
    /// Raw id of the script active at request time.
    #[serde(with = "actor_sentinel")]
    pub actor_id: Option<String>,
    /// Requested URL (empty requests are ignored).
    pub request_url: String,
    /// Raw id of the requesting element.
    pub requestor_id: String,
}

/// Resource kind of a network event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NetworkResource {
    /// `<iframe>` document.
    #[serde(rename = "NetworkIframeRequest")]
    Iframe,
    /// `<link>` resource.
    #[serde(rename = "NetworkLinkRequest")]
    Link,
    /// XMLHttpRequest / fetch.
    #[serde(rename = "NetworkXMLHTTPRequest")]
    XmlHttp,
    /// Script fetch.
    #[serde(rename = "NetworkScriptRequest")]
    Script,
    /// Image fetch.
    #[serde(rename = "NetworkImageRequest")]
    Image,
    /// Video fetch.
    #[serde(rename = "NetworkVideoRequest")]
    Video,
}

impl NetworkResource {
    /// Event-kind label, also used as the feature record's node category.
    pub fn event_label(&self) -> &'static str {
        match self {
            Self::Iframe => "NetworkIframeRequest",
            Self::Link => "NetworkLinkRequest",
            Self::XmlHttp => "NetworkXMLHTTPRequest",
            Self::Script => "NetworkScriptRequest",
            Self::Image => "NetworkImageRequest",
            Self::Video => "NetworkVideoRequest",
        }
    }

    /// Parse from an event-kind label.
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "NetworkIframeRequest" => Some(Self::Iframe),
            "NetworkLinkRequest" => Some(Self::Link),
            "NetworkXMLHTTPRequest" => Some(Self::XmlHttp),
            "NetworkScriptRequest" => Some(Self::Script),
            "NetworkImageRequest" => Some(Self::Image),
            "NetworkVideoRequest" => Some(Self::Video),
            _ => None,
        }
    }
}

impl fmt::Display for NetworkResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.event_label())
    }
}

/// One record of the browser timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event_type")]
pub enum TimelineEvent {
    /// Element inserted into the DOM.
    NodeInsertion(NodeInsertion),
    /// Element removed from the DOM.
    NodeRemoval(NodeRemoval),
    /// Element will be attached under a parent later.
    NodeAttachLater(AttachLater),
    /// Script compiled in an element.
    ScriptCompilation(ScriptCompilation),
    /// Script created by dynamic evaluation.
    ScriptEval(ScriptEval),
    /// Attribute added.
    AttrAddition(AttributeChange),
    /// Attribute modified.
    AttrModification(AttributeChange),
    /// Attribute removed.
    AttrRemoval(AttributeChange),
    /// Style text added.
    AttrStyleTextAddition(AttributeChange),
    /// Style removed.
    AttrStyleRemoval(AttributeChange),
    /// Iframe fetch.
    NetworkIframeRequest(NetworkRequest),
    /// Link fetch.
    NetworkLinkRequest(NetworkRequest),
    /// XMLHttpRequest.
    #[serde(rename = "NetworkXMLHTTPRequest")]
    NetworkXmlHttpRequest(NetworkRequest),
    /// Script fetch.
    NetworkScriptRequest(NetworkRequest),
    /// Image fetch.
    NetworkImageRequest(NetworkRequest),
    /// Video fetch.
    NetworkVideoRequest(NetworkRequest),
    /// Recorded kind the graph does not model (NodeCreation, ScriptExecution, ...).
    #[serde(other)]
    Unsupported,
}

impl TimelineEvent {
    /// Parse one timeline record.
    pub fn from_value(index: usize, value: serde_json::Value) -> Result<Self, EventError> {
        serde_json::from_value(value).map_err(|source| EventError::Malformed { index, source })
    }

    /// Event-kind label.
    pub fn kind_label(&self) -> &'static str {
        match self {
            Self::NodeInsertion(_) => "NodeInsertion",
            Self::NodeRemoval(_) => "NodeRemoval",
            Self::NodeAttachLater(_) => "NodeAttachLater",
            Self::ScriptCompilation(_) => "ScriptCompilation",
            Self::ScriptEval(_) => "ScriptEval",
            Self::AttrAddition(_) => "AttrAddition",
            Self::AttrModification(_) => "AttrModification",
            Self::AttrRemoval(_) => "AttrRemoval",
            Self::AttrStyleTextAddition(_) => "AttrStyleTextAddition",
            Self::AttrStyleRemoval(_) => "AttrStyleRemoval",
            Self::NetworkIframeRequest(_) => "NetworkIframeRequest",
            Self::NetworkLinkRequest(_) => "NetworkLinkRequest",
            Self::NetworkXmlHttpRequest(_) => "NetworkXMLHTTPRequest",
            Self::NetworkScriptRequest(_) => "NetworkScriptRequest",
            Self::NetworkImageRequest(_) => "NetworkImageRequest",
            Self::NetworkVideoRequest(_) => "NetworkVideoRequest",
            Self::Unsupported => "Unsupported",
        }
    }

    /// Raw id of the script that caused the event, if the kind carries one.
    pub fn actor(&self) -> Option<&str> {
        match self {
            Self::NodeInsertion(e) => e.actor_id.as_deref(),
            Self::NodeRemoval(e) => e.actor_id.as_deref(),
            Self::AttrAddition(e)
            | Self::AttrModification(e)
            | Self::AttrRemoval(e)
            | Self::AttrStyleTextAddition(e)
            | Self::AttrStyleRemoval(e) => e.actor_id.as_deref(),
            Self::NetworkIframeRequest(e)
            | Self::NetworkLinkRequest(e)
            | Self::NetworkXmlHttpRequest(e)
            | Self::NetworkScriptRequest(e)
            | Self::NetworkImageRequest(e)
            | Self::NetworkVideoRequest(e) => e.actor_id.as_deref(),
            Self::NodeAttachLater(_)
            | Self::ScriptCompilation(_)
            | Self::ScriptEval(_)
            | Self::Unsupported => None,
        }
    }

    /// Network payload and resource kind, for network events.
    pub fn as_network(&self) -> Option<(NetworkResource, &NetworkRequest)> {
        match self {
            Self::NetworkIframeRequest(e) => Some((NetworkResource::Iframe, e)),
            Self::NetworkLinkRequest(e) => Some((NetworkResource::Link, e)),
            Self::NetworkXmlHttpRequest(e) => Some((NetworkResource::XmlHttp, e)),
            Self::NetworkScriptRequest(e) => Some((NetworkResource::Script, e)),
            Self::NetworkImageRequest(e) => Some((NetworkResource::Image, e)),
            Self::NetworkVideoRequest(e) => Some((NetworkResource::Video, e)),
            _ => None,
        }
    }

    /// Build the network event variant for a resource kind.
    pub fn network(resource: NetworkResource, request: NetworkRequest) -> Self {
        match resource {
            NetworkResource::Iframe => Self::NetworkIframeRequest(request),
            NetworkResource::Link => Self::NetworkLinkRequest(request),
            NetworkResource::XmlHttp => Self::NetworkXmlHttpRequest(request),
            NetworkResource::Script => Self::NetworkScriptRequest(request),
            NetworkResource::Image => Self::NetworkImageRequest(request),
            NetworkResource::Video => Self::NetworkVideoRequest(request),
        }
    }
}

/// Raw timeline document.
#[derive(Debug, Clone, Deserialize)]
struct TimelineDocument {
    url: String,
    timeline: Vec<serde_json::Value>,
}

/// Parsed recording of one page load.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageTimeline {
    /// URL of the visited page (source of the base domain).
    pub url: String,
    /// Events in causal order.
    pub events: Vec<TimelineEvent>,
}

impl PageTimeline {
    /// Parse a `{url, timeline}` JSON document.
    ///
    /// Fails on the first malformed record.
    pub fn from_json_str(input: &str) -> Result<Self, EventError> {
        let doc: TimelineDocument =
            serde_json::from_str(input).map_err(EventError::InvalidDocument)?;
        let events = doc
            .timeline
            .into_iter()
            .enumerate()
            .map(|(index, value)| TimelineEvent::from_value(index, value))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            url: doc.url,
            events,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_actor_sentinel_maps_to_none() {
        let event = TimelineEvent::from_value(
            0,
            json!({
                "event_type": "NodeRemoval",
                "node_id": "5",
                "actor_id": "0"
            }),
        )
        .unwrap();
        assert_eq!(event.actor(), None);

        let event = TimelineEvent::from_value(
            0,
            json!({
                "event_type": "NodeRemoval",
                "node_id": "5",
                "actor_id": "12"
            }),
        )
        .unwrap();
        assert_eq!(event.actor(), Some("12"));
    }

    #[test]
    fn test_missing_required_field_is_loud() {
        let err = TimelineEvent::from_value(
            3,
            json!({
                "event_type": "NetworkImageRequest",
                "actor_id": "0",
                "requestor_id": "4"
            }),
        )
        .unwrap_err();
        match err {
            EventError::Malformed { index, source } => {
                assert_eq!(index, 3);
                assert!(source.to_string().contains("request_url"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_unknown_kind_is_unsupported() {
        let event = TimelineEvent::from_value(
            0,
            json!({ "event_type": "ScriptExecution", "script_id": "3", "actor_id": "0" }),
        )
        .unwrap();
        assert_eq!(event, TimelineEvent::Unsupported);
    }

    #[test]
    fn test_xmlhttp_label() {
        let event = TimelineEvent::from_value(
            0,
            json!({
                "event_type": "NetworkXMLHTTPRequest",
                "actor_id": "0",
                "request_url": "https://a.test/x",
                "requestor_id": "1"
            }),
        )
        .unwrap();
        let (resource, request) = event.as_network().unwrap();
        assert_eq!(resource, NetworkResource::XmlHttp);
        assert_eq!(request.request_url, "https://a.test/x");
        assert_eq!(event.kind_label(), "NetworkXMLHTTPRequest");
    }

    #[test]
    fn test_serialize_restores_sentinel() {
        let event = TimelineEvent::network(
            NetworkResource::Script,
            NetworkRequest {
                actor_id: None,
                request_url: "https://a.test/s.js".into(),
                requestor_id: "9".into(),
            },
        );
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["event_type"], "NetworkScriptRequest");
        assert_eq!(value["actor_id"], "0");
    }

    #[test]
    fn test_document_parse() {
        let doc = r#"{
            "url": "https://www.example.com/",
            "timeline": [
                {"event_type": "NodeCreation", "node_id": "1", "actor_id": "0"},
                {"event_type": "NodeAttachLater", "node_id": "42", "node_parent_id": "7"}
            ]
        }"#;
        let timeline = PageTimeline::from_json_str(doc).unwrap();
        assert_eq!(timeline.url, "https://www.example.com/");
        assert_eq!(timeline.events.len(), 2);
        assert!(matches!(timeline.events[1], TimelineEvent::NodeAttachLater(_)));
    }

    #[test]
    fn test_document_without_timeline_rejected() {
        let err = PageTimeline::from_json_str(r#"{"url": "x"}"#).unwrap_err();
        assert!(matches!(err, EventError::InvalidDocument(_)));
    }
}
