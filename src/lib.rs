//! # adgraph-kernel
//!
//! Page-graph construction and feature extraction for ad and tracker
//! classification.
//!
//! The kernel answers one question:
//!
//! > Given a recorded page load, how was each network request caused, and
//! > what does its neighborhood look like?
//!
//! ## Core Contract
//!
//! 1. Ingest a browser event timeline in causal order into one [`AdGraph`],
//!    resolving forward references through deferred tables
//! 2. Report every event whose references could not be resolved
//! 3. Produce one flat [`FeatureRecord`] per request node
//!
//! ## Architecture
//!
//! ```text
//! PageTimeline → EventIngestor → AdGraph → FeatureExtractor → FeatureRecord
//!                     ↓             ↓
//!              IngestReport   VisualizationGraph / DiagnosticsSummary
//! ```
//!
//! ## Determinism Guarantees
//!
//! - Same timeline → identical node ids, edge log and graph fingerprint
//! - Same configuration → identical `params_hash`
//! - Auxiliary tables iterate in key order (BTreeMap)

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod types;
pub mod config;
pub mod store;
pub mod ingest;
pub mod analytics;
pub mod export;
pub mod canonical;

// Re-exports
pub use types::{
    Attribute, Edge, EdgeKind, HtmlElement, Influence, LabelFlags, Node, NodeId, NodeIndex,
    NodeKind, RequestNode, ScriptInfluence, ScriptNode,
};
pub use types::event::{EventError, NetworkRequest, NetworkResource, PageTimeline, TimelineEvent};
pub use types::features::{
    AscendantFeatures, FeatureRecord, GraphFeatures, NodeFeatures, ParentFeatures, UrlFeatures,
};
pub use config::{ConfigError, FeatureConfig, KatzParams};
pub use store::{AdGraph, DeferredTables, GraphError, PendingRequest};
pub use ingest::{build_graph, EventIngestor, IngestError, IngestReport, UnresolvedEvent};
pub use analytics::{
    FeatureExtractor, KatzOutcome, ParentRank, Phase, PhaseTimings, UrlDecomposer, UrlError,
    WhatwgDecomposer,
};
pub use export::{DiagnosticsSummary, VisLink, VisNode, VisualizationGraph};
pub use canonical::{canonical_hash, canonical_hash_hex, to_canonical_bytes};

/// Schema version of the feature record and exports.
/// Increment on breaking changes to any column or export field.
pub const ADGRAPH_SCHEMA_VERSION: &str = "1.0.0";

/// Default feature configuration version identifier.
pub const DEFAULT_CONFIG_VERSION: &str = "feature_config_v1";
