//! Engine configuration.

use crate::error::OtfError;
use serde::{Deserialize, Serialize};

/// Tunables for scanning and dispatch.
///
/// # Examples
///
/// ```rust
/// use otf_engine::EngineConfig;
///
/// let config = EngineConfig::from_json(r#"{ "max_dispatch_depth": 3 }"#).unwrap();
/// assert_eq!(config.max_dispatch_depth, 3);
/// assert_eq!(config.three_die_formula, "3d6");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// How deep hooks and attack damage may nest dispatches.
    pub max_dispatch_depth: usize,
    /// Formula rolled for skill, attribute, attack and control rolls.
    pub three_die_formula: String,
    /// CSS class of rendered formula spans.
    pub span_class: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_dispatch_depth: 8,
            three_die_formula: String::from("3d6"),
            span_class: String::from("otf-link"),
        }
    }
}

impl EngineConfig {
    /// Load a (possibly partial) JSON document over the defaults.
    pub fn from_json(json: &str) -> Result<Self, OtfError> {
        serde_json::from_str(json).map_err(|e| OtfError::Config(e.to_string()))
    }
}
