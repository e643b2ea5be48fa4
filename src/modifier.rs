//! Pending roll modifiers.
//!
//! The modifier stack ("bucket") is shared state owned by the host. The
//! dispatcher is its only writer: it posts modifiers while preparing a
//! roll and restores a snapshot whenever a dispatch ends without handing a
//! roll off.

use crate::character::{Character, Resource};
use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

static COST_PATTERN: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?i)\*\s?costs?\s+(\d+)\s?([ \w()]+)").ok());
static MAX_PATTERN: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?i)\*max:\s?(\d+)").ok());

/// One pending modifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModifierEntry {
    pub amount: i32,
    pub description: String,
}

impl ModifierEntry {
    pub fn new(amount: i32, description: impl Into<String>) -> Self {
        Self {
            amount,
            description: description.into(),
        }
    }
}

/// The shared stack of pending modifiers.
pub trait ModifierStack {
    /// Post a modifier and return the entry that was added.
    fn add_modifier(&mut self, amount: i32, description: &str) -> ModifierEntry;

    /// Copy of the current entries, in posting order.
    fn snapshot(&self) -> Vec<ModifierEntry>;

    /// Replace the current entries with a snapshot.
    fn restore(&mut self, entries: Vec<ModifierEntry>);
}

/// An in-memory modifier stack.
///
/// # Examples
///
/// ```rust
/// use otf_engine::{ModifierBucket, ModifierStack};
///
/// let mut bucket = ModifierBucket::new();
/// let saved = bucket.snapshot();
/// bucket.add_modifier(-2, "Darkness");
/// assert_eq!(bucket.total(), -2);
///
/// bucket.restore(saved);
/// assert!(bucket.entries().is_empty());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModifierBucket {
    entries: Vec<ModifierEntry>,
}

impl ModifierBucket {
    /// Create an empty bucket.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[ModifierEntry] {
        &self.entries
    }

    /// Sum of all pending amounts.
    pub fn total(&self) -> i32 {
        self.entries
            .iter()
            .fold(0i32, |total, e| total.saturating_add(e.amount))
    }
}

impl ModifierStack for ModifierBucket {
    fn add_modifier(&mut self, amount: i32, description: &str) -> ModifierEntry {
        let entry = ModifierEntry::new(amount, description);
        self.entries.push(entry.clone());
        entry
    }

    fn snapshot(&self) -> Vec<ModifierEntry> {
        self.entries.clone()
    }

    fn restore(&mut self, entries: Vec<ModifierEntry>) {
        self.entries = entries;
    }
}

/// What a cost annotation draws from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CostTarget {
    Resource(Resource),
    /// A named resource tracker, such as `"tr(Mana)"`.
    Tracker(String),
}

/// A parsed `*Costs N target` annotation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cost {
    pub amount: i32,
    pub target: CostTarget,
}

/// Directives embedded in a modifier description.
///
/// # Examples
///
/// ```rust
/// use otf_engine::modifier::{CostTarget, ModifierDirectives};
/// use otf_engine::Resource;
///
/// let d = ModifierDirectives::parse("Fireball *Costs 2FP");
/// let cost = d.cost.unwrap();
/// assert_eq!(cost.amount, 2);
/// assert_eq!(cost.target, CostTarget::Resource(Resource::FP));
///
/// assert_eq!(ModifierDirectives::parse("Aim *Max:9").max, Some(9));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModifierDirectives {
    pub cost: Option<Cost>,
    /// Cap on the effective skill level.
    pub max: Option<i32>,
}

impl ModifierDirectives {
    pub fn parse(description: &str) -> Self {
        let cost = COST_PATTERN
            .as_ref()
            .and_then(|re| re.captures(description))
            .and_then(|caps| {
                let amount = caps.get(1)?.as_str().parse().ok()?;
                let target_text = caps.get(2)?.as_str().trim();
                let lowered = target_text.to_ascii_lowercase();
                let target = if lowered.starts_with("hp") {
                    CostTarget::Resource(Resource::HP)
                } else if lowered.starts_with("fp") {
                    CostTarget::Resource(Resource::FP)
                } else if lowered.starts_with("tr") {
                    CostTarget::Tracker(target_text.to_string())
                } else {
                    return None;
                };
                Some(Cost { amount, target })
            });
        let max = MAX_PATTERN
            .as_ref()
            .and_then(|re| re.captures(description))
            .and_then(|caps| caps.get(1)?.as_str().parse().ok());
        Self { cost, max }
    }

    /// Deduct a HP/FP cost from `character`.
    ///
    /// Returns the tracker command to run when the cost targets a tracker.
    pub fn apply_cost(&self, character: &mut Character) -> Option<String> {
        let cost = self.cost.as_ref()?;
        match &cost.target {
            CostTarget::Resource(resource) => {
                character.spend(*resource, cost.amount);
                None
            }
            CostTarget::Tracker(name) => Some(format!(
                "/setEventFlags true false false\n/{} -{}",
                name, cost.amount
            )),
        }
    }
}
