//! Character data as seen by formulas.
//!
//! Formulas look values up by name at run time ("IQ", "Fright Check",
//! "Acrobatics"). Names are mapped onto typed accessors here: attributes
//! and resources are enums, and the skill, spell and attack lists are
//! ordered collections. The resolver and dispatcher only read through the
//! `CharacterView` trait.

use crate::collection::{Nested, OrderedCollection};
use crate::matcher::NameMatcher;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A named value a formula can roll against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Attribute {
    ST,
    DX,
    IQ,
    HT,
    Will,
    Per,
    Vision,
    FrightCheck,
    Hearing,
    TasteSmell,
    Touch,
    Dodge,
    Parry,
    Block,
}

impl Attribute {
    /// Every attribute, in display order.
    pub const ALL: [Attribute; 14] = [
        Attribute::ST,
        Attribute::DX,
        Attribute::IQ,
        Attribute::HT,
        Attribute::Will,
        Attribute::Per,
        Attribute::Vision,
        Attribute::FrightCheck,
        Attribute::Hearing,
        Attribute::TasteSmell,
        Attribute::Touch,
        Attribute::Dodge,
        Attribute::Parry,
        Attribute::Block,
    ];

    /// Look an attribute up by any name a formula may use for it.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use otf_engine::Attribute;
    ///
    /// assert_eq!(Attribute::from_name("will"), Some(Attribute::Will));
    /// assert_eq!(Attribute::from_name("Fright Check"), Some(Attribute::FrightCheck));
    /// assert_eq!(Attribute::from_name("Smell"), Some(Attribute::TasteSmell));
    /// assert_eq!(Attribute::from_name("Luck"), None);
    /// ```
    pub fn from_name(name: &str) -> Option<Self> {
        let attribute = match name.trim().to_ascii_uppercase().as_str() {
            "ST" => Attribute::ST,
            "DX" => Attribute::DX,
            "IQ" => Attribute::IQ,
            "HT" => Attribute::HT,
            "WILL" => Attribute::Will,
            "PER" => Attribute::Per,
            "VISION" => Attribute::Vision,
            "FRIGHTCHECK" | "FRIGHT CHECK" => Attribute::FrightCheck,
            "HEARING" => Attribute::Hearing,
            "TASTESMELL" | "TASTE SMELL" | "TASTE" | "SMELL" => Attribute::TasteSmell,
            "TOUCH" => Attribute::Touch,
            "DODGE" => Attribute::Dodge,
            "PARRY" => Attribute::Parry,
            "BLOCK" => Attribute::Block,
            _ => return None,
        };
        Some(attribute)
    }

    /// Display name, used as the roll subject.
    pub fn label(self) -> &'static str {
        match self {
            Attribute::ST => "ST",
            Attribute::DX => "DX",
            Attribute::IQ => "IQ",
            Attribute::HT => "HT",
            Attribute::Will => "Will",
            Attribute::Per => "Per",
            Attribute::Vision => "Vision",
            Attribute::FrightCheck => "Fright Check",
            Attribute::Hearing => "Hearing",
            Attribute::TasteSmell => "Taste/Smell",
            Attribute::Touch => "Touch",
            Attribute::Dodge => "Dodge",
            Attribute::Parry => "Parry",
            Attribute::Block => "Block",
        }
    }
}

/// Spendable pools a cost annotation can draw from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Resource {
    HP,
    FP,
}

impl Resource {
    /// Parse `"HP"`/`"FP"` (any case).
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_uppercase().as_str() {
            "HP" => Some(Resource::HP),
            "FP" => Some(Resource::FP),
            _ => None,
        }
    }
}

/// Base damage a derived formula builds on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DerivedBase {
    Swing,
    Thrust,
}

impl DerivedBase {
    /// Pick the base referenced by a formula such as `"sw+2"` or `"thr"`.
    pub fn from_formula(formula: &str) -> Self {
        if formula.to_ascii_lowercase().contains("sw") {
            DerivedBase::Swing
        } else {
            DerivedBase::Thrust
        }
    }

    /// Short formula label.
    pub fn label(self) -> &'static str {
        match self {
            DerivedBase::Swing => "SW",
            DerivedBase::Thrust => "THR",
        }
    }
}

/// A skill or spell entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Skill {
    pub name: String,
    pub level: i32,
    /// Level relative to the controlling attribute, such as `"IQ-2"`.
    #[serde(default, rename = "relativelevel")]
    pub relative_level: Option<String>,
    /// Formula that must succeed before the roll is made.
    #[serde(default, rename = "checkotf")]
    pub check_otf: Option<String>,
    /// Formula executed alongside the roll.
    #[serde(default, rename = "duringotf")]
    pub during_otf: Option<String>,
    #[serde(default)]
    pub contains: OrderedCollection<Skill>,
}

impl Skill {
    /// Create a skill at `level` with no relative level or hooks.
    pub fn new(name: impl Into<String>, level: i32) -> Self {
        Self {
            name: name.into(),
            level,
            relative_level: None,
            check_otf: None,
            during_otf: None,
            contains: OrderedCollection::new(),
        }
    }

    /// Set the relative level text, e.g. `"DX+1"`.
    pub fn with_relative_level(mut self, relative: impl Into<String>) -> Self {
        self.relative_level = Some(relative.into());
        self
    }
}

impl Nested for Skill {
    fn children(&self) -> Option<&OrderedCollection<Self>> {
        Some(&self.contains)
    }
}

/// A melee or ranged attack entry.
///
/// `level` is free text: a leading integer optionally followed by a cost
/// annotation, e.g. `"13 *Costs 1FP"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attack {
    pub name: String,
    #[serde(default)]
    pub mode: Option<String>,
    pub level: String,
    #[serde(default)]
    pub damage: String,
    #[serde(default)]
    pub parry: Option<String>,
    #[serde(default)]
    pub block: Option<String>,
    #[serde(default, rename = "checkotf")]
    pub check_otf: Option<String>,
    #[serde(default, rename = "duringotf")]
    pub during_otf: Option<String>,
}

impl Attack {
    /// Create an attack with a level text and no damage.
    pub fn new(name: impl Into<String>, level: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            mode: None,
            level: level.into(),
            damage: String::new(),
            parry: None,
            block: None,
            check_otf: None,
            during_otf: None,
        }
    }

    /// Set the attack mode, such as `"Swing"`.
    pub fn with_mode(mut self, mode: impl Into<String>) -> Self {
        self.mode = Some(mode.into());
        self
    }

    /// Set the damage formula, e.g. `"sw+1 cut"`.
    pub fn with_damage(mut self, damage: impl Into<String>) -> Self {
        self.damage = damage.into();
        self
    }

    /// Name with the mode suffix, as matched by formulas.
    pub fn full_name(&self) -> String {
        match self.mode.as_deref() {
            Some(mode) if !mode.is_empty() => format!("{} ({})", self.name, mode),
            _ => self.name.clone(),
        }
    }

    /// Numeric parry or block value, for `Parry:`/`Block:` references.
    pub fn defense(&self, attribute: Attribute) -> Option<i32> {
        let text = match attribute {
            Attribute::Parry => self.parry.as_deref(),
            Attribute::Block => self.block.as_deref(),
            _ => None,
        }?;
        let text = text.trim_start();
        let end = text
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(text.len());
        text[..end].parse().ok()
    }
}

/// Which lists an attack lookup searches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AttackScope {
    #[default]
    Any,
    MeleeOnly,
    RangedOnly,
}

/// Which lists a skill lookup searches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SkillScope {
    #[default]
    Any,
    SkillOnly,
    SpellOnly,
}

/// Read access to a character, as needed by formula resolution.
pub trait CharacterView {
    fn name(&self) -> &str;
    fn attribute(&self, attribute: Attribute) -> Option<i32>;
    fn resource(&self, resource: Resource) -> Option<i32>;
    fn skills(&self) -> &OrderedCollection<Skill>;
    fn spells(&self) -> &OrderedCollection<Skill>;
    fn melee(&self) -> &OrderedCollection<Attack>;
    fn ranged(&self) -> &OrderedCollection<Attack>;
    fn base_damage(&self, base: DerivedBase) -> Option<&str>;
}

/// A character document.
///
/// # Examples
///
/// ```rust
/// use otf_engine::{Attribute, Character, CharacterView, Skill};
///
/// let mut ann = Character::new("Ann");
/// ann.set_attribute(Attribute::IQ, 12);
/// ann.skills.append(Skill::new("Acrobatics", 14));
///
/// assert_eq!(ann.attribute(Attribute::IQ), Some(12));
/// assert_eq!(ann.skills().len(), 1);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Character {
    pub name: String,
    #[serde(default)]
    pub attributes: BTreeMap<Attribute, i32>,
    #[serde(default)]
    pub resources: BTreeMap<Resource, i32>,
    #[serde(default)]
    pub swing: Option<String>,
    #[serde(default)]
    pub thrust: Option<String>,
    #[serde(default)]
    pub skills: OrderedCollection<Skill>,
    #[serde(default)]
    pub spells: OrderedCollection<Skill>,
    #[serde(default)]
    pub melee: OrderedCollection<Attack>,
    #[serde(default)]
    pub ranged: OrderedCollection<Attack>,
}

impl Character {
    /// Create an empty character.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use otf_engine::{Attribute, Character, CharacterView};
    ///
    /// let mut ann = Character::new("Ann");
    /// ann.set_attribute(Attribute::DX, 12);
    /// assert_eq!(ann.attribute(Attribute::DX), Some(12));
    /// assert_eq!(ann.attribute(Attribute::IQ), None);
    /// ```
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Set an attribute value, replacing any previous one.
    pub fn set_attribute(&mut self, attribute: Attribute, value: i32) {
        self.attributes.insert(attribute, value);
    }

    /// Set the current value of a resource.
    pub fn set_resource(&mut self, resource: Resource, value: i32) {
        self.resources.insert(resource, value);
    }

    /// Deduct `amount` from a resource and return the new value.
    pub fn spend(&mut self, resource: Resource, amount: i32) -> Option<i32> {
        let value = self.resources.get_mut(&resource)?;
        *value -= amount;
        Some(*value)
    }
}

impl CharacterView for Character {
    fn name(&self) -> &str {
        &self.name
    }

    fn attribute(&self, attribute: Attribute) -> Option<i32> {
        self.attributes.get(&attribute).copied()
    }

    fn resource(&self, resource: Resource) -> Option<i32> {
        self.resources.get(&resource).copied()
    }

    fn skills(&self) -> &OrderedCollection<Skill> {
        &self.skills
    }

    fn spells(&self) -> &OrderedCollection<Skill> {
        &self.spells
    }

    fn melee(&self) -> &OrderedCollection<Attack> {
        &self.melee
    }

    fn ranged(&self) -> &OrderedCollection<Attack> {
        &self.ranged
    }

    fn base_damage(&self, base: DerivedBase) -> Option<&str> {
        let formula = match base {
            DerivedBase::Swing => self.swing.as_deref(),
            DerivedBase::Thrust => self.thrust.as_deref(),
        };
        formula.filter(|f| !f.trim().is_empty())
    }
}

/// Parse the integer a level text starts with (`"13 *Costs 1FP"` → 13).
pub fn leading_int(text: &str) -> Option<i32> {
    text.split_whitespace().next()?.parse().ok()
}

/// Find the best skill (or spell) matching `matcher`.
///
/// The highest positive level anywhere in the skill hierarchy wins; ties go
/// to the entry found first. Spells are only searched when no skill matched.
pub fn find_skill_spell<'a>(
    character: &'a dyn CharacterView,
    matcher: &NameMatcher,
    scope: SkillScope,
) -> Option<&'a Skill> {
    fn best_in<'a>(list: &'a OrderedCollection<Skill>, matcher: &NameMatcher) -> Option<&'a Skill> {
        let mut best: Option<&'a Skill> = None;
        list.walk(&mut |skill: &'a Skill| {
            let floor = best.map_or(0, |b| b.level);
            if matcher.is_match(&skill.name) && skill.level > floor {
                best = Some(skill);
            }
        });
        best
    }

    let skill = match scope {
        SkillScope::SpellOnly => None,
        _ => best_in(character.skills(), matcher),
    };
    match (skill, scope) {
        (Some(found), _) => Some(found),
        (None, SkillScope::SkillOnly) => None,
        (None, _) => best_in(character.spells(), matcher),
    }
}

/// Find the first attack matching `matcher`, melee list before ranged.
pub fn find_attack<'a>(
    character: &'a dyn CharacterView,
    matcher: &NameMatcher,
    scope: AttackScope,
) -> Option<&'a Attack> {
    let first_in = |list: &'a OrderedCollection<Attack>| {
        list.values().find(|a| matcher.is_match(&a.full_name()))
    };
    let melee = match scope {
        AttackScope::RangedOnly => None,
        _ => first_in(character.melee()),
    };
    match (melee, scope) {
        (Some(found), _) => Some(found),
        (None, AttackScope::MeleeOnly) => None,
        (None, _) => first_in(character.ranged()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fighter() -> Character {
        let mut c = Character::new("Fighter");
        let mut combat = Skill::new("Combat Skills", 0);
        combat.contains.append(Skill::new("Broadsword", 13));
        combat.contains.append(Skill::new("Brawling", 15));
        c.skills.append(Skill::new("Brawling", 12));
        c.skills.append(combat);
        c.spells.append(Skill::new("Bravery", 16));
        c.melee.append(Attack::new("Sword", "14").with_mode("Swing"));
        c.melee.append(Attack::new("Sword", "12").with_mode("Thrust"));
        c.ranged.append(Attack::new("Sword", "18").with_mode("Thrown"));
        c
    }

    #[test]
    fn test_find_skill_takes_highest_in_hierarchy() {
        let c = fighter();
        let m = NameMatcher::new("Brawling").unwrap();
        let found = find_skill_spell(&c, &m, SkillScope::Any).unwrap();
        assert_eq!(found.level, 15);
    }

    #[test]
    fn test_find_skill_falls_back_to_spells() {
        let c = fighter();
        let m = NameMatcher::new("Brav").unwrap();
        assert_eq!(find_skill_spell(&c, &m, SkillScope::Any).unwrap().level, 16);
        assert!(find_skill_spell(&c, &m, SkillScope::SkillOnly).is_none());

        let bra = NameMatcher::new("Bra").unwrap();
        assert_eq!(
            find_skill_spell(&c, &bra, SkillScope::SpellOnly).unwrap().name,
            "Bravery"
        );
    }

    #[test]
    fn test_find_attack_takes_first_match() {
        let c = fighter();
        let m = NameMatcher::new("Sword").unwrap();
        let found = find_attack(&c, &m, AttackScope::Any).unwrap();
        assert_eq!(found.full_name(), "Sword (Swing)");

        let thrown = find_attack(&c, &m, AttackScope::RangedOnly).unwrap();
        assert_eq!(thrown.level, "18");

        let none = NameMatcher::new("Bow").unwrap();
        assert!(find_attack(&c, &none, AttackScope::MeleeOnly).is_none());
    }

    #[test]
    fn test_leading_int() {
        assert_eq!(leading_int("13 *Costs 1FP"), Some(13));
        assert_eq!(leading_int("-"), None);
        assert_eq!(leading_int(""), None);
    }

    #[test]
    fn test_spend_resource() {
        let mut c = Character::new("Mage");
        c.set_resource(Resource::FP, 10);
        assert_eq!(c.spend(Resource::FP, 3), Some(7));
        assert_eq!(c.spend(Resource::HP, 1), None);
    }

    #[test]
    fn test_character_loads_from_json() {
        let json = r#"{
            "name": "Ann",
            "attributes": { "IQ": 12, "Will": 11 },
            "thrust": "1d-1",
            "skills": { "00000": { "name": "Stealth", "level": 13, "relativelevel": "DX+1" } }
        }"#;
        let c: Character = serde_json::from_str(json).unwrap();
        assert_eq!(c.attribute(Attribute::Will), Some(11));
        assert_eq!(c.base_damage(DerivedBase::Thrust), Some("1d-1"));
        assert_eq!(c.base_damage(DerivedBase::Swing), None);
        assert_eq!(
            c.skills.get("00000").unwrap().relative_level.as_deref(),
            Some("DX+1")
        );
    }
}
