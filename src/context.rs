//! Context passed alongside a dispatch.
//!
//! `EventContext` carries the input modifiers of the click or command that
//! triggered a formula. `OptionBag` carries loosely typed extras to the
//! roller (blind flag, mode text, the resolved action and object). The
//! engine does not interpret bag entries beyond setting them.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The input event that triggered a dispatch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventContext {
    pub shift: bool,
    pub ctrl: bool,
    /// Chat message data the event originated from, if any.
    #[serde(default)]
    pub chat_data: Option<serde_json::Value>,
}

impl EventContext {
    /// A plain click: no modifier keys, no chat data.
    pub fn new() -> Self {
        Self::default()
    }

    /// An event for a private (shift) roll.
    pub fn private() -> Self {
        Self {
            shift: true,
            ..Self::default()
        }
    }
}

/// Extra options handed to the roller.
///
/// # Examples
///
/// ```rust
/// use otf_engine::OptionBag;
///
/// let mut options = OptionBag::new();
/// options.set("blind", true);
/// options.set("text", "(Swing)");
///
/// let blind: Option<bool> = options.get("blind");
/// assert_eq!(blind, Some(true));
/// assert!(options.contains_key("text"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OptionBag {
    data: HashMap<String, serde_json::Value>,
}

impl OptionBag {
    /// Create an empty option bag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set an option. Values that fail to serialize are not added.
    pub fn set(&mut self, key: impl Into<String>, value: impl Serialize) {
        if let Ok(json_value) = serde_json::to_value(value) {
            self.data.insert(key.into(), json_value);
        }
    }

    /// Get an option, or `None` if missing or of another type.
    pub fn get<T: for<'de> Deserialize<'de>>(&self, key: &str) -> Option<T> {
        self.data
            .get(key)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
