//! Feature extraction configuration.
//!
//! ## Float Normalization for Deterministic Hashing
//!
//! Floats are quantized (×1e6, rounded to i64) before hashing so the
//! `params_hash` recorded in diagnostics is identical across platforms.
//!
//! ## Environment
//!
//! | Variable | Field | Default |
//! |----------|-------|---------|
//! | `ADGRAPH_KATZ_ALPHA` | `katz.alpha` | 0.1 |
//! | `ADGRAPH_KATZ_BETA` | `katz.beta` | 1.0 |
//! | `ADGRAPH_KATZ_MAX_ITER` | `katz.max_iter` | 1000 |
//! | `ADGRAPH_KATZ_TOL` | `katz.tol` | 1e-6 |
//! | `ADGRAPH_ASCENDANT_HOPS` | `ascendant_hops` | 3 |
//! | `ADGRAPH_DESCENDANT_HOPS` | `descendant_hops` | 3 |

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::canonical::{canonical_hash_hex, quantize};
use crate::DEFAULT_CONFIG_VERSION;

/// Error type for configuration loading.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    /// A variable is set but cannot be parsed or is out of range.
    #[error("Invalid value for {key}: {value:?}")]
    InvalidValue {
        /// Variable name.
        key: String,
        /// Raw value.
        value: String,
    },
}

/// Katz centrality solver parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KatzParams {
    /// Attenuation factor.
    pub alpha: f64,
    /// Constant added to every node each iteration.
    pub beta: f64,
    /// Iteration cap.
    pub max_iter: usize,
    /// Per-node convergence tolerance.
    pub tol: f64,
}

impl Default for KatzParams {
    fn default() -> Self {
        Self {
            alpha: 0.1,
            beta: 1.0,
            max_iter: 1000,
            tol: 1e-6,
        }
    }
}

/// Quantized parameters for deterministic hashing.
#[derive(Serialize)]
struct QuantizedConfig<'a> {
    version: &'a str,
    alpha: i64,
    beta: i64,
    max_iter: usize,
    tol: i64,
    ascendant_hops: usize,
    descendant_hops: usize,
}

/// Feature extraction configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureConfig {
    /// Configuration version identifier.
    pub version: String,
    /// Katz solver parameters.
    pub katz: KatzParams,
    /// Hop limit of the ascendant walk.
    pub ascendant_hops: usize,
    /// Hop limit of the descendant count.
    pub descendant_hops: usize,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            version: DEFAULT_CONFIG_VERSION.to_string(),
            katz: KatzParams::default(),
            ascendant_hops: 3,
            descendant_hops: 3,
        }
    }
}

impl FeatureConfig {
    /// Deterministic hash of the parameters.
    ///
    /// The tolerance is hashed at 1e-12 resolution since it is usually far
    /// below the standard quantization step.
    pub fn params_hash(&self) -> String {
        canonical_hash_hex(&QuantizedConfig {
            version: &self.version,
            alpha: quantize(self.katz.alpha),
            beta: quantize(self.katz.beta),
            max_iter: self.katz.max_iter,
            tol: quantize(self.katz.tol * 1_000_000.0),
            ascendant_hops: self.ascendant_hops,
            descendant_hops: self.descendant_hops,
        })
    }

    /// Load from process environment, keeping defaults for unset variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(v) = parse_var(&lookup, "ADGRAPH_KATZ_ALPHA")? {
            config.katz.alpha = v;
        }
        if let Some(v) = parse_var(&lookup, "ADGRAPH_KATZ_BETA")? {
            config.katz.beta = v;
        }
        if let Some(v) = parse_var(&lookup, "ADGRAPH_KATZ_MAX_ITER")? {
            config.katz.max_iter = v;
        }
        if let Some(v) = parse_var::<f64, _>(&lookup, "ADGRAPH_KATZ_TOL")? {
            if v <= 0.0 {
                return Err(ConfigError::InvalidValue {
                    key: "ADGRAPH_KATZ_TOL".to_string(),
                    value: v.to_string(),
                });
            }
            config.katz.tol = v;
        }
        if let Some(v) = parse_var(&lookup, "ADGRAPH_ASCENDANT_HOPS")? {
            config.ascendant_hops = v;
        }
        if let Some(v) = parse_var(&lookup, "ADGRAPH_DESCENDANT_HOPS")? {
            config.descendant_hops = v;
        }
        Ok(config)
    }
}

fn parse_var<T, F>(lookup: &F, key: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue {
                key: key.to_string(),
                value: raw,
            }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = FeatureConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, FeatureConfig::default());
        assert_eq!(config.katz.max_iter, 1000);
        assert_eq!(config.ascendant_hops, 3);
    }

    #[test]
    fn test_overrides() {
        let config = FeatureConfig::from_lookup(lookup(&[
            ("ADGRAPH_KATZ_ALPHA", "0.05"),
            ("ADGRAPH_DESCENDANT_HOPS", " 5 "),
        ]))
        .unwrap();
        assert_eq!(config.katz.alpha, 0.05);
        assert_eq!(config.descendant_hops, 5);
    }

    #[test]
    fn test_invalid_value() {
        let err = FeatureConfig::from_lookup(lookup(&[("ADGRAPH_ASCENDANT_HOPS", "three")]))
            .unwrap_err();
        assert_eq!(
            err,
            ConfigError::InvalidValue {
                key: "ADGRAPH_ASCENDANT_HOPS".into(),
                value: "three".into()
            }
        );
        assert!(FeatureConfig::from_lookup(lookup(&[("ADGRAPH_KATZ_TOL", "0")])).is_err());
    }

    #[test]
    fn test_params_hash_deterministic() {
        let a = FeatureConfig::default();
        let b = FeatureConfig::default();
        assert_eq!(a.params_hash(), b.params_hash());

        let mut c = FeatureConfig::default();
        c.katz.tol = 1e-8;
        assert_ne!(a.params_hash(), c.params_hash());
    }
}
