//! Canonical hashing for configuration and graph fingerprints.
//!
//! Values are serialized to compact JSON in declaration order and hashed
//! with xxh64. Inputs must not contain `HashMap`s, and floats are quantized
//! to integers first (see [`quantize`]) so that the same configuration
//! always hashes the same on every platform.

use serde::Serialize;
use xxhash_rust::xxh64::xxh64;

/// Quantization factor applied to floats before hashing.
pub const FLOAT_QUANTIZATION_FACTOR: f64 = 1_000_000.0;

/// Serialize a value to canonical JSON bytes.
///
/// Falls back to an empty buffer for values serde_json cannot represent
/// (maps with non-string keys), which none of the hashed types contain.
pub fn to_canonical_bytes<T: Serialize>(value: &T) -> Vec<u8> {
    serde_json::to_vec(value).unwrap_or_default()
}

/// xxh64 of the canonical bytes.
pub fn canonical_hash<T: Serialize>(value: &T) -> u64 {
    xxh64(&to_canonical_bytes(value), 0)
}

/// Canonical hash as 16 lowercase hex digits.
pub fn canonical_hash_hex<T: Serialize>(value: &T) -> String {
    format!("{:016x}", canonical_hash(value))
}

/// Quantize a float to an integer for hashing.
pub fn quantize(value: f64) -> i64 {
    (value * FLOAT_QUANTIZATION_FACTOR).round() as i64
}
