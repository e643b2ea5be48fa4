//! Formula parsing.
//!
//! `FormulaParser` is the boundary between the engine and whatever turns
//! a bracket body into actions. `BasicParser` covers the common formula
//! shapes:
//!
//! ```text
//! PDF:B325                 page reference
//! /r 3d6                   chat command (!/… for a quiet one)
//! +2 Aim & -1 Wound        modifiers
//! CR:12 Bad Temper         control roll
//! 3d6+2 | 2d+1 cut         roll | damage
//! sw+2 cut | thr           derived damage | derived roll
//! S:Stealth -2 dark        skill or spell (Sk:/Sp: restrict the list)
//! S:Acrobatics=14          pre-targeted skill
//! S:Climbing (Based:ST)    floating skill
//! IQ-2 | ST12 | Parry:Axe  attributes
//! M:Sword | R:Bow | A:Axe  attacks; D:Sword for an attack's damage
//! JournalEntry[id]{Label}  linked document
//! ```
//!
//! `!` in front of a node makes it blind, `*Costs …` at the end attaches a
//! cost, and `|` separates alternatives of skills and attributes.

use crate::action::{Action, ActionChain, ActionKind, DocumentKind};
use crate::character::{Attribute, AttackScope, DerivedBase, SkillScope};
use regex_lite::{Captures, Regex};
use std::sync::LazyLock;

/// Damage type abbreviations recognised after a dice expression.
pub const DAMAGE_TYPES: &[&str] = &[
    "cut", "imp", "cr", "cor", "burn", "tox", "fat", "aff", "pi-", "pi", "pi+", "pi++", "inj",
    "dmg", "sur", "spec",
];

/// Turns formula text into actions.
pub trait FormulaParser {
    /// Parse a bracket body. `None` when it is not a formula.
    fn parse(&self, text: &str) -> Option<ActionChain>;

    /// Parse a stored damage or roll string such as an attack's damage.
    fn parse_roll_or_damage(&self, text: &str) -> Option<Action> {
        let chain = self.parse(text)?;
        let head = chain.head();
        match head.kind {
            ActionKind::Roll { .. }
            | ActionKind::Damage { .. }
            | ActionKind::DerivedRoll { .. }
            | ActionKind::DerivedDamage { .. } => Some(head.clone()),
            _ => None,
        }
    }
}

struct Patterns {
    costs: Regex,
    document: Regex,
    modifier: Regex,
    control: Regex,
    skill: Regex,
    attack: Regex,
    defense: Regex,
    attribute_tail: Regex,
    derived: Regex,
    dice: Regex,
}

impl Patterns {
    fn compile() -> Option<Self> {
        let re = |p: &str| Regex::new(p).ok();
        Some(Self {
            costs: re(r"(?i)\s*(\*costs?\s.*)$")?,
            document: re(r"^(JournalEntry|Actor|RollTable|Item)\[([^\]]+)\](?:\{(.*)\})?$")?,
            modifier: re(r"^([+-]\d+)\s*(.*)$")?,
            control: re(r"(?i)^CR:\s*(\d+)\s*(.*)$")?,
            skill: re(
                r"(?i)^(S|SK|SP):\s*(.+?)(?:=(\d+))?(?:\s*\(Based:\s*([A-Za-z ]+?)\))?(?:\s+([+-]\d+)(?:\s+(.*))?)?$",
            )?,
            attack: re(r"(?i)^(D:M|D:R|A|M|R|D):\s*(.+?)(?:\s+([+-]\d+)(?:\s+(.*))?)?$")?,
            defense: re(r"(?i)^(Parry|Block):\s*(.+?)(?:\s+([+-]\d+)(?:\s+(.*))?)?$")?,
            attribute_tail: re(r"^(\d+)?\s*([+-]\d+)?(?:\s+(.*))?$")?,
            derived: re(r"(?i)^(sw|thr)([+-]\d+)?(?:\s+(.*))?$")?,
            dice: re(r"(?i)^(\d+d\d*(?:[+-]\d+)?)(?:\s+(.*))?$")?,
        })
    }
}

static PATTERNS: LazyLock<Option<Patterns>> = LazyLock::new(Patterns::compile);

const ATTRIBUTE_ALIASES: &[(&str, Attribute)] = &[
    ("fright check", Attribute::FrightCheck),
    ("frightcheck", Attribute::FrightCheck),
    ("taste smell", Attribute::TasteSmell),
    ("tastesmell", Attribute::TasteSmell),
    ("hearing", Attribute::Hearing),
    ("vision", Attribute::Vision),
    ("taste", Attribute::TasteSmell),
    ("smell", Attribute::TasteSmell),
    ("touch", Attribute::Touch),
    ("dodge", Attribute::Dodge),
    ("parry", Attribute::Parry),
    ("block", Attribute::Block),
    ("will", Attribute::Will),
    ("per", Attribute::Per),
    ("st", Attribute::ST),
    ("dx", Attribute::DX),
    ("iq", Attribute::IQ),
    ("ht", Attribute::HT),
];

/// Normalise dice shorthand: `"2d+1"` becomes `"2d6+1"`.
///
/// # Examples
///
/// ```rust
/// use otf_engine::parser::d6ify;
///
/// assert_eq!(d6ify("1d+2 cut"), "1d6+2 cut");
/// assert_eq!(d6ify("3d6"), "3d6");
/// assert_eq!(d6ify("2d"), "2d6");
/// ```
pub fn d6ify(formula: &str) -> String {
    let chars: Vec<char> = formula.chars().collect();
    let mut out = String::with_capacity(formula.len() + 2);
    for (i, &ch) in chars.iter().enumerate() {
        out.push(ch);
        let after_digit = i > 0 && chars[i - 1].is_ascii_digit();
        let before_digit = chars.get(i + 1).is_some_and(|c| c.is_ascii_digit());
        if ch == 'd' && after_digit && !before_digit {
            out.push('6');
        }
    }
    out
}

fn group<'t>(caps: &Captures<'t>, i: usize) -> Option<&'t str> {
    caps.get(i).map(|m| m.as_str()).filter(|s| !s.is_empty())
}

fn int_group(caps: &Captures<'_>, i: usize) -> Option<i32> {
    group(caps, i).and_then(|s| s.parse().ok())
}

fn is_damage_type(word: &str) -> bool {
    DAMAGE_TYPES.iter().any(|t| t.eq_ignore_ascii_case(word))
}

/// Split `"cut Torso hit"` into a leading damage type and the rest.
fn split_damage_type(rest: Option<&str>) -> (Option<String>, Option<String>) {
    let Some(rest) = rest else {
        return (None, None);
    };
    let mut words = rest.splitn(2, char::is_whitespace);
    match words.next() {
        Some(word) if is_damage_type(word) => (
            Some(word.to_ascii_lowercase()),
            words.next().map(|s| s.trim().to_string()).filter(|s| !s.is_empty()),
        ),
        _ => (None, Some(rest.to_string())),
    }
}

/// A parser for the common formula grammar.
///
/// # Examples
///
/// ```rust
/// use otf_engine::{ActionKind, BasicParser, FormulaParser};
///
/// let chain = BasicParser.parse("S:Stealth | DX-5").unwrap();
/// assert_eq!(chain.len(), 2);
/// assert_eq!(chain.nodes()[1].modifier, Some(-5));
///
/// assert!(BasicParser.parse("just some words").is_none());
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct BasicParser;

impl FormulaParser for BasicParser {
    fn parse(&self, text: &str) -> Option<ActionChain> {
        let patterns = PATTERNS.as_ref()?;
        let text = text.trim();
        if text.is_empty() {
            return None;
        }

        let (blind, body) = match text.strip_prefix('!') {
            Some(rest) => (true, rest.trim_start()),
            None => (false, text),
        };

        if body.starts_with('/') {
            let action = Action::new(ActionKind::Chat { quiet: blind }, body);
            return Some(ActionChain::single(action));
        }

        if body.starts_with(['+', '-']) && patterns.modifier.is_match(body) {
            return parse_modifiers(patterns, body);
        }

        let mut nodes = Vec::new();
        for part in body.split('|') {
            let mut node = parse_node(patterns, part.trim())?;
            node.blind |= blind;
            nodes.push(node);
        }
        if nodes.len() > 1 && !nodes.iter().all(Action::is_chainable) {
            tracing::debug!(formula = text, "alternatives must be skills or attributes");
            return None;
        }
        ActionChain::new(nodes).ok()
    }
}

fn parse_modifiers(patterns: &Patterns, body: &str) -> Option<ActionChain> {
    let mut nodes = Vec::new();
    for part in body.split('&') {
        let part = part.trim();
        let caps = patterns.modifier.captures(part)?;
        let amount = int_group(&caps, 1)?;
        let mut action = Action::new(ActionKind::Modifier { amount }, part);
        action.modifier = Some(amount);
        action.desc = group(&caps, 2).map(str::to_string);
        nodes.push(action);
    }
    ActionChain::new(nodes).ok()
}

fn parse_node(patterns: &Patterns, part: &str) -> Option<Action> {
    let (blind, part) = match part.strip_prefix('!') {
        Some(rest) => (true, rest.trim_start()),
        None => (false, part),
    };
    let (costs, body) = match patterns.costs.captures(part) {
        Some(caps) => {
            let whole = caps.get(0)?;
            (group(&caps, 1).map(str::to_string), part[..whole.start()].trim())
        }
        None => (None, part),
    };
    if body.is_empty() {
        return None;
    }

    let mut action = parse_kind(patterns, body)?;
    action.blind = blind;
    action.costs = costs;
    Some(action)
}

fn parse_kind(patterns: &Patterns, body: &str) -> Option<Action> {
    if let Some(link) = strip_prefix_ignore_case(body, "PDF:") {
        let link = link.trim();
        if link.is_empty() {
            return None;
        }
        return Some(Action::new(ActionKind::Pdf { link: link.to_string() }, body));
    }

    if let Some(caps) = patterns.document.captures(body) {
        let document = DocumentKind::from_name(group(&caps, 1)?)?;
        let id = group(&caps, 2)?.to_string();
        let mut action = Action::new(ActionKind::LinkedDocument { document, id }, body);
        action.desc = group(&caps, 3).map(str::to_string);
        return Some(action);
    }

    if let Some(caps) = patterns.control.captures(body) {
        let mut action = Action::new(ActionKind::ControlRoll, body);
        action.target = int_group(&caps, 1);
        action.desc = group(&caps, 2).map(str::to_string);
        return Some(action);
    }

    if let Some(caps) = patterns.skill.captures(body) {
        let scope = match group(&caps, 1)?.to_ascii_uppercase().as_str() {
            "SK" => SkillScope::SkillOnly,
            "SP" => SkillScope::SpellOnly,
            _ => SkillScope::Any,
        };
        let floating = match group(&caps, 4) {
            Some(name) => Some(Attribute::from_name(name)?),
            None => None,
        };
        let kind = ActionKind::SkillOrSpell {
            name: group(&caps, 2)?.trim().to_string(),
            scope,
            floating,
        };
        let mut action = Action::new(kind, body);
        action.target = int_group(&caps, 3);
        action.modifier = int_group(&caps, 5);
        action.desc = group(&caps, 6).map(str::to_string);
        return Some(action);
    }

    if let Some(caps) = patterns.attack.captures(body) {
        let name = group(&caps, 2)?.trim().to_string();
        let kind = match group(&caps, 1)?.to_ascii_uppercase().as_str() {
            "M" => ActionKind::Attack { name, scope: AttackScope::MeleeOnly },
            "R" => ActionKind::Attack { name, scope: AttackScope::RangedOnly },
            "D" => ActionKind::AttackDamage { name, scope: AttackScope::Any },
            "D:M" => ActionKind::AttackDamage { name, scope: AttackScope::MeleeOnly },
            "D:R" => ActionKind::AttackDamage { name, scope: AttackScope::RangedOnly },
            _ => ActionKind::Attack { name, scope: AttackScope::Any },
        };
        let mut action = Action::new(kind, body);
        action.modifier = int_group(&caps, 3);
        action.desc = group(&caps, 4).map(str::to_string);
        return Some(action);
    }

    if let Some(caps) = patterns.defense.captures(body) {
        let attribute = Attribute::from_name(group(&caps, 1)?)?;
        let kind = ActionKind::Attribute {
            attribute,
            melee: Some(group(&caps, 2)?.trim().to_string()),
        };
        let mut action = Action::new(kind, body);
        action.modifier = int_group(&caps, 3);
        action.desc = group(&caps, 4).map(str::to_string);
        return Some(action);
    }

    if let Some(caps) = patterns.derived.captures(body) {
        let derived_formula = group(&caps, 1)?.to_ascii_lowercase();
        let base = DerivedBase::from_formula(&derived_formula);
        let formula = group(&caps, 2).unwrap_or_default().to_string();
        let (damage_type, desc) = split_damage_type(group(&caps, 3));
        let kind = match damage_type {
            Some(damage_type) => ActionKind::DerivedDamage {
                base,
                derived_formula,
                formula,
                damage_type,
                ext_damage_type: None,
                hit_location: None,
            },
            None => ActionKind::DerivedRoll {
                base,
                derived_formula,
                formula,
            },
        };
        let mut action = Action::new(kind, body);
        action.desc = desc;
        return Some(action);
    }

    if let Some(caps) = patterns.dice.captures(body) {
        let written = group(&caps, 1)?;
        let formula = d6ify(written);
        let (damage_type, desc) = split_damage_type(group(&caps, 2));
        let kind = match damage_type {
            Some(damage_type) => ActionKind::Damage {
                formula,
                damage_type,
                ext_damage_type: None,
                hit_location: None,
            },
            None => ActionKind::Roll {
                display_formula: (formula != written).then(|| written.to_string()),
                formula,
            },
        };
        let mut action = Action::new(kind, body);
        action.desc = desc;
        return Some(action);
    }

    parse_attribute(patterns, body)
}

fn parse_attribute(patterns: &Patterns, body: &str) -> Option<Action> {
    let lowered = body.to_ascii_lowercase();
    for (alias, attribute) in ATTRIBUTE_ALIASES {
        if !lowered.starts_with(alias) {
            continue;
        }
        let Some(caps) = patterns.attribute_tail.captures(&body[alias.len()..]) else {
            continue;
        };
        let kind = ActionKind::Attribute {
            attribute: *attribute,
            melee: None,
        };
        let mut action = Action::new(kind, body);
        action.target = int_group(&caps, 1);
        action.modifier = int_group(&caps, 2);
        action.desc = group(&caps, 3).map(str::to_string);
        return Some(action);
    }
    None
}

fn strip_prefix_ignore_case<'t>(text: &'t str, prefix: &str) -> Option<&'t str> {
    let head = text.get(..prefix.len())?;
    head.eq_ignore_ascii_case(prefix)
        .then(|| &text[prefix.len()..])
}
