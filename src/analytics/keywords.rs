//! Keyword dictionaries and pure text scanners.
//!
//! Nothing here touches the graph. Memoizing callers keep the result on the
//! node ([`HtmlElement::ad_keyword`](crate::types::node::HtmlElement::ad_keyword),
//! [`ScriptNode::traits`](crate::types::node::ScriptNode::traits)).

use std::sync::OnceLock;

use regex_lite::Regex;

use crate::types::node::{Attribute, ScriptTextTraits};

/// Substrings that suggest advertising or tracking.
pub const AD_KEYWORDS: &[&str] = &[
    "ad", "ads", "advert", "popup", "banner", "sponsor", "iframe", "googlead", "adsys",
    "adser", "advertise", "redirect", "popunder", "punder", "popout", "click", "track",
    "play", "pop", "prebid", "bid", "pb.min", "affiliate", "ban", "delivery", "promo",
    "tag", "zoneid", "siteid", "pageid", "size", "viewid", "zone_id", "google_afc",
    "google_afs",
];

/// URL punctuation that, directly before an ad keyword, marks it as a path
/// or parameter token.
pub const KEYWORD_PRECEDING_CHARS: &[u8] = b"./&=;-_*^?|,";

/// Query keys that carry screen or viewport dimensions.
pub const SCREEN_KEYWORDS: &[&str] = &[
    "screenheight",
    "screenwidth",
    "browserheight",
    "browserwidth",
    "screendensity",
    "screen_res",
    "screen_param",
    "screenresolution",
    "browsertimeoffset",
];

/// Canvas fingerprinting API names.
pub const FINGERPRINTING_KEYWORDS: &[&str] = &[
    "CanvasRenderingContext2D",
    "HTMLCanvasElement",
    "toDataURL",
    "getImageData",
    "measureText",
    "font",
    "fillText",
    "strokeText",
    "fillStyle",
    "strokeStyle",
    "HTMLCanvasElement.addEventListener",
    "save",
    "restore",
];

/// Dynamic evaluation markers.
pub const EVAL_KEYWORDS: &[&str] = &["eval", "Function"];

/// `\d{2,4}[xX_-]\d{2,4}`, e.g. `300x250`.
pub fn dimension_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\d{2,4}[xX_-]\d{2,4}").expect("dimension pattern is valid"))
}

/// True if `text` contains a creative-size pattern.
pub fn has_dimension_pattern(text: &str) -> bool {
    dimension_pattern().is_match(text)
}

/// True if `text` contains any ad keyword.
pub fn contains_ad_keyword(text: &str) -> bool {
    AD_KEYWORDS.iter().any(|key| text.contains(key))
}

/// True if some occurrence of an ad keyword is directly preceded by URL
/// punctuation.
pub fn ad_keyword_after_special_char(text: &str) -> bool {
    let bytes = text.as_bytes();
    AD_KEYWORDS.iter().any(|key| {
        text.match_indices(key).any(|(pos, _)| {
            pos > 0 && KEYWORD_PRECEDING_CHARS.contains(&bytes[pos - 1])
        })
    })
}

/// True if any attribute value contains an ad keyword.
pub fn attributes_have_ad_keyword(attributes: &[Attribute]) -> bool {
    attributes.iter().any(|attr| contains_ad_keyword(&attr.value))
}

/// True if any query key names a screen dimension.
pub fn is_screen_keyword(key: &str) -> bool {
    SCREEN_KEYWORDS.iter().any(|k| key.contains(k))
}

/// Derive eval and fingerprinting traits from script text.
pub fn script_text_traits(text: &str) -> ScriptTextTraits {
    ScriptTextTraits {
        has_eval_or_function: EVAL_KEYWORDS.iter().any(|k| text.contains(k)),
        has_fingerprinting_keyword: FINGERPRINTING_KEYWORDS.iter().any(|k| text.contains(k)),
    }
}
