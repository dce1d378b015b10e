//! Graph analytics.
//!
//! Every analysis is an `impl AdGraph` block in its own module and reads the
//! graph produced by ingestion. Some reads fill lazily memoized flags on
//! elements and scripts, so most entry points take `&mut AdGraph`.
//!
//! ## Modules
//!
//! - [`centrality`]: Katz solver and average degree connectivity
//! - [`walk`]: ascendant features and descendant count
//! - [`parent`]: first and second parent blocks
//! - [`lexical`]: URL features and the [`UrlDecomposer`] seam
//! - [`keywords`]: keyword dictionaries and pure scanners
//! - [`extractor`]: [`FeatureExtractor`], one record per request node
//! - [`timing`]: cumulative per-phase timings

pub mod centrality;
pub mod extractor;
pub mod keywords;
pub mod lexical;
pub mod parent;
pub mod timing;
pub mod walk;

pub use centrality::{KatzOutcome, KATZ_SCALE};
pub use extractor::FeatureExtractor;
pub use lexical::{url_features, DecomposedUrl, UrlDecomposer, UrlError, WhatwgDecomposer};
pub use parent::ParentRank;
pub use timing::{Phase, PhaseTimings};
