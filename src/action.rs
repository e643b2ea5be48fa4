//! Parsed formula actions.
//!
//! An `Action` is one parsed formula node: what kind of thing to do plus
//! the fields every kind may carry (description, pre-set level, flat
//! modifier, blind flag, cost annotation, follow-up text). Alternatives
//! ("try A, else B") are held by an `ActionChain`, an owned, non-empty
//! list evaluated left to right.

use crate::character::{Attribute, AttackScope, DerivedBase, SkillScope};
use crate::error::OtfError;
use serde::{Deserialize, Serialize};

/// Kind of document a linked-document formula opens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DocumentKind {
    JournalEntry,
    Actor,
    RollTable,
    Item,
}

impl DocumentKind {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "JournalEntry" => Some(DocumentKind::JournalEntry),
            "Actor" => Some(DocumentKind::Actor),
            "RollTable" => Some(DocumentKind::RollTable),
            "Item" => Some(DocumentKind::Item),
            _ => None,
        }
    }
}

/// What an action does.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ActionKind {
    /// Open a page reference such as `"B325"`.
    Pdf { link: String },
    /// Post a modifier to the bucket.
    Modifier { amount: i32 },
    /// Forward a chat command.
    Chat { quiet: bool },
    /// Open a document by kind and id.
    LinkedDocument { document: DocumentKind, id: String },
    /// Three dice against an explicit level.
    ControlRoll,
    /// An untargeted dice expression.
    Roll {
        formula: String,
        display_formula: Option<String>,
    },
    /// A damage expression handed to the damage pipeline.
    Damage {
        formula: String,
        damage_type: String,
        ext_damage_type: Option<String>,
        hit_location: Option<String>,
    },
    /// Damage built on the character's swing or thrust.
    DerivedDamage {
        base: DerivedBase,
        derived_formula: String,
        formula: String,
        damage_type: String,
        ext_damage_type: Option<String>,
        hit_location: Option<String>,
    },
    /// A roll built on the character's swing or thrust.
    DerivedRoll {
        base: DerivedBase,
        derived_formula: String,
        formula: String,
    },
    SkillOrSpell {
        name: String,
        scope: SkillScope,
        /// Attribute a floating ("based") skill is computed from.
        floating: Option<Attribute>,
    },
    Attribute {
        attribute: Attribute,
        /// Attack whose parry or block is meant, for `Parry:`/`Block:`.
        melee: Option<String>,
    },
    Attack { name: String, scope: AttackScope },
    AttackDamage { name: String, scope: AttackScope },
}

/// One parsed formula node.
///
/// # Examples
///
/// ```rust
/// use otf_engine::{Action, ActionKind};
///
/// let action = Action::new(ActionKind::Modifier { amount: -2 }, "-2 Darkness")
///     .with_desc("Darkness");
/// assert_eq!(action.desc.as_deref(), Some("Darkness"));
/// assert!(!action.is_chainable());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    #[serde(flatten)]
    pub kind: ActionKind,
    /// The formula text this node was parsed from.
    pub orig: String,
    #[serde(default)]
    pub desc: Option<String>,
    /// Pre-set level, for formulas like `ST12`.
    #[serde(default)]
    pub target: Option<i32>,
    #[serde(default, rename = "mod")]
    pub modifier: Option<i32>,
    #[serde(default)]
    pub blind: bool,
    /// Cost annotation such as `"*Costs 2FP"`.
    #[serde(default)]
    pub costs: Option<String>,
    #[serde(default)]
    pub true_text: Option<String>,
    #[serde(default)]
    pub false_text: Option<String>,
}

impl Action {
    pub fn new(kind: ActionKind, orig: impl Into<String>) -> Self {
        Self {
            kind,
            orig: orig.into(),
            desc: None,
            target: None,
            modifier: None,
            blind: false,
            costs: None,
            true_text: None,
            false_text: None,
        }
    }

    pub fn with_desc(mut self, desc: impl Into<String>) -> Self {
        self.desc = Some(desc.into());
        self
    }

    pub fn with_target(mut self, target: i32) -> Self {
        self.target = Some(target);
        self
    }

    pub fn with_modifier(mut self, modifier: i32) -> Self {
        self.modifier = Some(modifier);
        self
    }

    pub fn with_costs(mut self, costs: impl Into<String>) -> Self {
        self.costs = Some(costs.into());
        self
    }

    /// Whether this node takes part in best-of resolution.
    pub fn is_chainable(&self) -> bool {
        matches!(
            self.kind,
            ActionKind::SkillOrSpell { .. } | ActionKind::Attribute { .. }
        )
    }

    /// The pre-set level, ignoring a zero level.
    pub fn preset_target(&self) -> Option<i32> {
        self.target.filter(|t| *t != 0)
    }
}

/// A non-empty, ordered list of alternative actions.
///
/// # Examples
///
/// ```rust
/// use otf_engine::{Action, ActionChain, ActionKind, Attribute};
///
/// let dx = Action::new(
///     ActionKind::Attribute { attribute: Attribute::DX, melee: None },
///     "DX",
/// );
/// let chain = ActionChain::single(dx);
/// assert_eq!(chain.len(), 1);
/// assert!(ActionChain::new(vec![]).is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Action>", into = "Vec<Action>")]
pub struct ActionChain {
    nodes: Vec<Action>,
}

impl ActionChain {
    /// Build a chain from its nodes in evaluation order.
    pub fn new(nodes: Vec<Action>) -> Result<Self, OtfError> {
        if nodes.is_empty() {
            return Err(OtfError::EmptyChain);
        }
        Ok(Self { nodes })
    }

    pub fn single(action: Action) -> Self {
        Self {
            nodes: vec![action],
        }
    }

    /// Build a chain from parser output linked by `next` indices.
    ///
    /// The chain starts at node 0 and follows each node's link. Links that
    /// revisit a node are rejected; nodes that are never reached are dropped.
    pub fn from_links(nodes: Vec<(Action, Option<usize>)>) -> Result<Self, OtfError> {
        if nodes.is_empty() {
            return Err(OtfError::EmptyChain);
        }
        let mut order = Vec::new();
        let mut visited = vec![false; nodes.len()];
        let mut cursor = Some(0);
        while let Some(index) = cursor {
            match visited.get(index) {
                None => return Err(OtfError::DanglingLink(index)),
                Some(true) => return Err(OtfError::CyclicChain(index)),
                Some(false) => {}
            }
            visited[index] = true;
            order.push(index);
            cursor = nodes[index].1;
        }
        let mut slots: Vec<Option<Action>> = nodes.into_iter().map(|(a, _)| Some(a)).collect();
        let chained = order.into_iter().filter_map(|i| slots[i].take()).collect();
        Self::new(chained)
    }

    /// The first node.
    pub fn head(&self) -> &Action {
        &self.nodes[0]
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Action> {
        self.nodes.iter()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Always false; chains hold at least one node.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn nodes(&self) -> &[Action] {
        &self.nodes
    }
}

impl From<Action> for ActionChain {
    fn from(action: Action) -> Self {
        Self::single(action)
    }
}

impl TryFrom<Vec<Action>> for ActionChain {
    type Error = OtfError;

    fn try_from(nodes: Vec<Action>) -> Result<Self, Self::Error> {
        Self::new(nodes)
    }
}

impl From<ActionChain> for Vec<Action> {
    fn from(chain: ActionChain) -> Self {
        chain.nodes
    }
}

impl<'a> IntoIterator for &'a ActionChain {
    type Item = &'a Action;
    type IntoIter = std::slice::Iter<'a, Action>;

    fn into_iter(self) -> Self::IntoIter {
        self.nodes.iter()
    }
}
