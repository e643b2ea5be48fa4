//! Host collaborators.
//!
//! The engine computes what to roll; the host does the rolling, chat,
//! document opening and damage application. Each concern is its own
//! trait so a host can be assembled from separate parts. Anything that
//! implements all of them is a `Host`.

use crate::action::DocumentKind;
use crate::character::CharacterView;
use crate::context::{EventContext, OptionBag};
use crate::modifier::ModifierEntry;
use serde::{Deserialize, Serialize};

/// A roll handed to the roller.
///
/// `target` is the level to roll against, or negative for an untargeted
/// roll such as a plain dice expression.
///
/// # Examples
///
/// ```rust
/// use otf_engine::RollRequest;
///
/// let request = RollRequest::new("3d6+2", -1);
/// assert!(!request.is_targeted());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RollRequest {
    pub formula: String,
    pub prefix: String,
    pub subject: String,
    pub target: i32,
    /// Modifier stack contents at hand-off.
    pub modifiers: Vec<ModifierEntry>,
    pub options: OptionBag,
}

impl RollRequest {
    pub fn new(formula: impl Into<String>, target: i32) -> Self {
        Self {
            formula: formula.into(),
            prefix: String::new(),
            subject: String::new(),
            target,
            modifiers: Vec::new(),
            options: OptionBag::new(),
        }
    }

    pub fn is_targeted(&self) -> bool {
        self.target > 0
    }

    /// Sum of the modifiers riding on this roll.
    pub fn modifier_total(&self) -> i32 {
        self.modifiers
            .iter()
            .fold(0i32, |total, m| total.saturating_add(m.amount))
    }
}

/// What the roller reports back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollOutcome {
    pub success: bool,
}

impl RollOutcome {
    pub fn success() -> Self {
        Self { success: true }
    }

    pub fn failure() -> Self {
        Self { success: false }
    }
}

/// Damage handed to the damage pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DamageRequest {
    /// Dice expression, with swing/thrust already substituted.
    pub formula: String,
    /// How the formula was written, when it differs from `formula`.
    pub label: Option<String>,
    pub damage_type: String,
    pub ext_damage_type: Option<String>,
    pub hit_location: Option<String>,
    /// Names of the tokens the damage is spread over.
    pub targets: Vec<String>,
    pub modifiers: Vec<ModifierEntry>,
}

/// Rolls dice.
pub trait Roller {
    fn roll(&mut self, actor: Option<&dyn CharacterView>, request: &RollRequest) -> RollOutcome;
}

/// Runs chat commands.
pub trait ChatProcessor {
    /// Run `lines`; returns whether every line was handled.
    fn submit(&mut self, lines: &str, event: &EventContext) -> bool;
}

/// Opens documents and page references.
pub trait DocumentHost {
    fn open(&mut self, kind: DocumentKind, id: &str);
    fn open_reference(&mut self, link: &str);
}

/// Applies damage.
pub trait DamagePipeline {
    fn damage(&mut self, actor: Option<&dyn CharacterView>, request: &DamageRequest);
}

/// Shows user-facing warnings.
pub trait Notifier {
    fn warn(&mut self, message: &str);
}

/// Everything the dispatcher talks to.
pub trait Host: Roller + ChatProcessor + DocumentHost + DamagePipeline + Notifier {}

impl<T> Host for T where T: Roller + ChatProcessor + DocumentHost + DamagePipeline + Notifier {}
