//! URL lexical features.
//!
//! Host and query decomposition is delegated to a [`UrlDecomposer`]. A
//! decomposition failure is never propagated: the URL is treated as having
//! an empty host and no query parameters.

use crate::store::AdGraph;
use crate::types::features::UrlFeatures;
use crate::types::node::NodeIndex;
use super::keywords;

/// Error type for URL decomposition.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum UrlError {
    /// The string is not an absolute URL.
    #[error("Unparseable URL {url:?}: {reason}")]
    Unparseable {
        /// Input text.
        url: String,
        /// Parser message.
        reason: String,
    },
}

/// Host and ordered query parameters of a URL.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecomposedUrl {
    /// Host name (empty when the URL has none).
    pub host: String,
    /// Query parameters in order of appearance.
    pub query: Vec<(String, String)>,
}

/// Splits a URL into host and query parameters.
pub trait UrlDecomposer {
    /// Decompose `url`.
    fn decompose(&self, url: &str) -> Result<DecomposedUrl, UrlError>;
}

/// [`UrlDecomposer`] backed by the WHATWG parser of the `url` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct WhatwgDecomposer;

impl UrlDecomposer for WhatwgDecomposer {
    fn decompose(&self, url: &str) -> Result<DecomposedUrl, UrlError> {
        let parsed = url::Url::parse(url).map_err(|e| UrlError::Unparseable {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        Ok(DecomposedUrl {
            host: parsed.host_str().unwrap_or_default().to_string(),
            query: parsed
                .query_pairs()
                .map(|(k, v)| (k.into_owned(), v.into_owned()))
                .collect(),
        })
    }
}

fn decompose_or_empty(decomposer: &dyn UrlDecomposer, url: &str) -> DecomposedUrl {
    decomposer.decompose(url).unwrap_or_else(|err| {
        tracing::trace!(error = %err, "url decomposition failed, using empty host and query");
        DecomposedUrl::default()
    })
}

fn strip_www(host: &str) -> &str {
    host.strip_prefix("www.").unwrap_or(host)
}

/// Compute lexical features of `url` relative to the page at `base_url`.
pub fn url_features(url: &str, base_url: &str, decomposer: &dyn UrlDecomposer) -> UrlFeatures {
    let target = decompose_or_empty(decomposer, url);
    let base = decompose_or_empty(decomposer, base_url);
    let domain = strip_www(&base.host);
    let host = strip_www(&target.host);

    UrlFeatures {
        ad_related_keyword: keywords::contains_ad_keyword(url),
        special_char_ad_keyword: keywords::ad_keyword_after_special_char(url),
        semicolon_in_url: url.contains(';'),
        valid_query_string: target.query.is_empty(),
        base_domain_in_qs: !domain.is_empty()
            && target.query.iter().any(|(_, value)| value.contains(domain)),
        ad_dimensions_in_qs: target
            .query
            .iter()
            .any(|(_, value)| keywords::has_dimension_pattern(value)),
        ad_dimensions_in_complete_url: keywords::has_dimension_pattern(url),
        screen_dimensions_in_qs: target
            .query
            .iter()
            .any(|(key, _)| keywords::is_screen_keyword(key)),
        domain_party: domain == host,
        sub_domain_check: !domain.is_empty() && host.contains(domain),
        url_length: url.len(),
    }
}

impl AdGraph {
    /// Lexical features of a request node's URL using the default decomposer.
    pub fn url_features(&self, request: NodeIndex) -> UrlFeatures {
        self.url_features_with(request, &WhatwgDecomposer)
    }

    /// Lexical features of a request node's URL.
    ///
    /// Non-request nodes yield the default block.
    pub fn url_features_with(
        &self,
        request: NodeIndex,
        decomposer: &dyn UrlDecomposer,
    ) -> UrlFeatures {
        match self.node(request).and_then(|n| n.as_request()) {
            Some(req) => url_features(&req.url, self.base_url(), decomposer),
            None => UrlFeatures::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "https://www.news.example/article";

    fn features(url: &str) -> UrlFeatures {
        url_features(url, BASE, &WhatwgDecomposer)
    }

    #[test]
    fn test_first_party_after_www_strip() {
        let f = features("https://news.example/static/app.js");
        assert!(f.domain_party);
        assert!(f.sub_domain_check);
        assert!(f.valid_query_string);
    }

    #[test]
    fn test_third_party_subdomain() {
        let f = features("https://cdn.news.example/lib.js");
        assert!(!f.domain_party);
        assert!(f.sub_domain_check);
    }

    #[test]
    fn test_query_heuristics() {
        let f = features(
            "https://adserver.test/serve;tile=1?sz=300x250&ref=https%3A%2F%2Fnews.example%2F&screenwidth=1920",
        );
        assert!(f.ad_related_keyword);
        assert!(f.semicolon_in_url);
        assert!(!f.valid_query_string);
        assert!(f.base_domain_in_qs);
        assert!(f.ad_dimensions_in_qs);
        assert!(f.ad_dimensions_in_complete_url);
        assert!(f.screen_dimensions_in_qs);
        assert!(!f.domain_party);
    }

    #[test]
    fn test_dimension_outside_query() {
        let f = features("https://img.test/creative/728x90/banner.gif");
        assert!(!f.ad_dimensions_in_qs);
        assert!(f.ad_dimensions_in_complete_url);
        assert!(f.special_char_ad_keyword);
    }

    #[test]
    fn test_parse_failure_degrades() {
        let f = features("not a url ; really");
        assert!(f.valid_query_string);
        assert!(!f.sub_domain_check);
        assert!(!f.base_domain_in_qs);
        assert!(!f.domain_party);
        assert!(f.semicolon_in_url);
        assert_eq!(f.url_length, 18);
    }

    struct Failing;

    impl UrlDecomposer for Failing {
        fn decompose(&self, url: &str) -> Result<DecomposedUrl, UrlError> {
            Err(UrlError::Unparseable {
                url: url.to_string(),
                reason: "always".into(),
            })
        }
    }

    #[test]
    fn test_custom_decomposer_failure_never_aborts() {
        let f = url_features("https://a.test/?x=1", BASE, &Failing);
        assert!(f.valid_query_string);
        // Both hosts empty.
        assert!(f.domain_party);
        assert_eq!(f.url_length, 19);
    }
}
