//! Action chain resolver.
//!
//! Provides the `ChainResolver` type, which scores every alternative of a
//! skill/attribute chain against the current character and picks the one
//! to roll against.

use crate::action::{Action, ActionChain, ActionKind};
use crate::character::{
    find_attack, find_skill_spell, Attack, AttackScope, Attribute, CharacterView, Skill,
    SkillScope,
};
use crate::error::OtfError;
use crate::matcher::NameMatcher;
use serde::Serialize;

/// The character entry a resolution was made from.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ResolvedObject {
    Skill(Skill),
    Attack(Attack),
}

impl ResolvedObject {
    /// Pre-roll gate formula.
    pub fn check_otf(&self) -> Option<&str> {
        match self {
            ResolvedObject::Skill(s) => s.check_otf.as_deref(),
            ResolvedObject::Attack(a) => a.check_otf.as_deref(),
        }
        .filter(|f| !f.trim().is_empty())
    }

    /// Formula run alongside the roll.
    pub fn during_otf(&self) -> Option<&str> {
        match self {
            ResolvedObject::Skill(s) => s.during_otf.as_deref(),
            ResolvedObject::Attack(a) => a.during_otf.as_deref(),
        }
        .filter(|f| !f.trim().is_empty())
    }
}

/// The winning node of a chain.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    /// The selected node, carrying the chain's follow-up text.
    pub action: Action,
    /// `"Roll vs "` for attributes, empty for skills.
    pub prefix: String,
    pub subject: String,
    /// Level before the node's own modifier is applied.
    pub level: i32,
    pub object: Option<ResolvedObject>,
}

impl Resolution {
    /// The level the node competed with: base level plus its modifier.
    pub fn score(&self) -> i32 {
        self.level.saturating_add(self.action.modifier.unwrap_or(0))
    }
}

/// Result of resolving a chain.
#[derive(Debug, Clone, PartialEq)]
pub enum ChainOutcome {
    Selected(Resolution),
    /// Nothing resolved; the names that were tried, in chain order.
    Unresolved { attempts: Vec<String> },
}

/// Outcome of resolving a single node.
enum NodeOutcome {
    Resolved(Resolution),
    Missed(String),
}

/// Resolves skill and attribute chains against a character.
///
/// # Examples
///
/// ```rust
/// use otf_engine::*;
///
/// let mut ann = Character::new("Ann");
/// ann.set_attribute(Attribute::DX, 12);
/// ann.skills.append(Skill::new("Stealth", 11));
///
/// let chain = BasicParser.parse("S:Stealth | DX-2").unwrap();
/// let resolver = ChainResolver::new(Some(&ann));
///
/// match resolver.resolve(&chain).unwrap() {
///     ChainOutcome::Selected(r) => {
///         assert_eq!(r.subject, "Stealth");
///         assert_eq!(r.level, 11);
///     }
///     ChainOutcome::Unresolved { .. } => unreachable!(),
/// }
/// ```
pub struct ChainResolver<'a> {
    actor: Option<&'a dyn CharacterView>,
}

impl<'a> ChainResolver<'a> {
    pub fn new(actor: Option<&'a dyn CharacterView>) -> Self {
        Self { actor }
    }

    /// Pick the best node of `chain`.
    ///
    /// Nodes are compared on base level plus modifier. Only a strictly
    /// higher score replaces the current winner, so ties go to the earlier
    /// node. Nodes that cannot be resolved add their name to the attempts.
    pub fn resolve(&self, chain: &ActionChain) -> Result<ChainOutcome, OtfError> {
        let mut best: Option<Resolution> = None;
        let mut attempts = Vec::new();

        for node in chain {
            match self.resolve_node(node)? {
                NodeOutcome::Resolved(candidate) => {
                    tracing::debug!(
                        subject = %candidate.subject,
                        score = candidate.score(),
                        "chain candidate"
                    );
                    if best.as_ref().map_or(true, |b| candidate.score() > b.score()) {
                        best = Some(candidate);
                    }
                }
                NodeOutcome::Missed(name) => {
                    tracing::debug!(name = %name, "chain node did not resolve");
                    attempts.push(name);
                }
            }
        }

        let Some(mut winner) = best else {
            return Ok(ChainOutcome::Unresolved { attempts });
        };
        if let Some(carrier) = chain
            .iter()
            .find(|n| n.true_text.is_some() || n.false_text.is_some())
        {
            winner.action.true_text = carrier.true_text.clone();
            winner.action.false_text = carrier.false_text.clone();
        }
        tracing::debug!(subject = %winner.subject, level = winner.level, "chain resolved");
        Ok(ChainOutcome::Selected(winner))
    }

    fn resolve_node(&self, node: &Action) -> Result<NodeOutcome, OtfError> {
        match &node.kind {
            ActionKind::Attribute { attribute, melee } => {
                self.resolve_attribute(node, *attribute, melee.as_deref())
            }
            ActionKind::SkillOrSpell {
                name,
                scope,
                floating,
            } => self.resolve_skill(node, name, *scope, *floating),
            _ => Ok(NodeOutcome::Missed(node.orig.clone())),
        }
    }

    fn resolve_attribute(
        &self,
        node: &Action,
        attribute: Attribute,
        melee: Option<&str>,
    ) -> Result<NodeOutcome, OtfError> {
        let label = attribute.label();
        let selected = |level: i32, subject: String| Resolution {
            action: node.clone(),
            prefix: String::from("Roll vs "),
            subject,
            level,
            object: None,
        };

        if let Some(target) = node.preset_target() {
            return Ok(NodeOutcome::Resolved(selected(target, label.to_string())));
        }

        if let Some(name) = melee {
            let attempt = format!("{}:{}", label, name);
            let Some(actor) = self.actor else {
                return Ok(NodeOutcome::Missed(attempt));
            };
            let matcher = NameMatcher::new(name)?;
            let Some(attack) = find_attack(actor, &matcher, AttackScope::MeleeOnly) else {
                return Ok(NodeOutcome::Missed(attempt));
            };
            let Some(level) = attack.defense(attribute).filter(|v| *v != 0) else {
                return Ok(NodeOutcome::Missed(attempt));
            };
            let mut resolution = selected(level, format!("{} for {}", label, attack.name));
            if resolution.action.desc.is_none() {
                resolution.action.desc = attack.mode.as_ref().map(|m| format!("({})", m));
            }
            resolution.object = Some(ResolvedObject::Attack(attack.clone()));
            return Ok(NodeOutcome::Resolved(resolution));
        }

        let level = self
            .actor
            .and_then(|actor| actor.attribute(attribute))
            .filter(|v| *v != 0);
        Ok(match level {
            Some(level) => NodeOutcome::Resolved(selected(level, label.to_string())),
            None => NodeOutcome::Missed(label.to_string()),
        })
    }

    fn resolve_skill(
        &self,
        node: &Action,
        name: &str,
        scope: SkillScope,
        floating: Option<Attribute>,
    ) -> Result<NodeOutcome, OtfError> {
        let selected = |level: i32, subject: String, object: Option<ResolvedObject>| {
            NodeOutcome::Resolved(Resolution {
                action: node.clone(),
                prefix: String::new(),
                subject,
                level,
                object,
            })
        };

        if let Some(target) = node.preset_target() {
            return Ok(selected(target, name.to_string(), None));
        }
        let Some(actor) = self.actor else {
            return Ok(NodeOutcome::Missed(name.to_string()));
        };
        let matcher = NameMatcher::new(name)?;
        let Some(skill) = find_skill_spell(actor, &matcher, scope) else {
            return Ok(NodeOutcome::Missed(name.to_string()));
        };

        let object = Some(ResolvedObject::Skill(skill.clone()));
        let Some(basis) = floating else {
            return Ok(selected(skill.level, skill.name.clone(), object));
        };
        let Some(base) = actor.attribute(basis) else {
            return Ok(NodeOutcome::Missed(name.to_string()));
        };
        let offset = skill
            .relative_level
            .as_deref()
            .and_then(trailing_signed_int)
            .unwrap_or(0);
        Ok(selected(
            base.saturating_add(offset),
            format!("{}-based {}", basis.label(), skill.name),
            object,
        ))
    }
}

/// The signed integer a relative level ends with (`"IQ-2"` → -2).
pub fn trailing_signed_int(text: &str) -> Option<i32> {
    let text = text.trim();
    let sign = text.rfind(['+', '-'])?;
    let digits = &text[sign + 1..];
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    text[sign..].parse().ok()
}
