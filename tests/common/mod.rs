#![allow(dead_code)]

use otf_engine::*;

/// Host double that records every call.
#[derive(Debug, Default)]
pub struct RecordingHost {
    pub rolls: Vec<RollRequest>,
    pub chat: Vec<String>,
    pub opened: Vec<(DocumentKind, String)>,
    pub references: Vec<String>,
    pub damage: Vec<DamageRequest>,
    pub warnings: Vec<String>,
    /// Result every roll reports.
    pub roll_succeeds: bool,
}

impl RecordingHost {
    pub fn new() -> Self {
        Self {
            roll_succeeds: true,
            ..Self::default()
        }
    }
}

impl Roller for RecordingHost {
    fn roll(&mut self, _actor: Option<&dyn CharacterView>, request: &RollRequest) -> RollOutcome {
        self.rolls.push(request.clone());
        RollOutcome {
            success: self.roll_succeeds,
        }
    }
}

impl ChatProcessor for RecordingHost {
    fn submit(&mut self, lines: &str, _event: &EventContext) -> bool {
        self.chat.push(lines.to_string());
        true
    }
}

impl DocumentHost for RecordingHost {
    fn open(&mut self, kind: DocumentKind, id: &str) {
        self.opened.push((kind, id.to_string()));
    }

    fn open_reference(&mut self, link: &str) {
        self.references.push(link.to_string());
    }
}

impl DamagePipeline for RecordingHost {
    fn damage(&mut self, _actor: Option<&dyn CharacterView>, request: &DamageRequest) {
        self.damage.push(request.clone());
    }
}

impl Notifier for RecordingHost {
    fn warn(&mut self, message: &str) {
        self.warnings.push(message.to_string());
    }
}

/// A character with a little of everything.
pub fn sample_character() -> Character {
    let mut c = Character::new("Ann");
    c.set_attribute(Attribute::ST, 11);
    c.set_attribute(Attribute::DX, 12);
    c.set_attribute(Attribute::IQ, 10);
    c.set_attribute(Attribute::HT, 11);
    c.set_attribute(Attribute::Will, 10);
    c.set_resource(Resource::HP, 11);
    c.set_resource(Resource::FP, 11);
    c.swing = Some("1d+1".into());
    c.thrust = Some("1d-1".into());

    c.skills.append(Skill::new("Acrobatics", 14).with_relative_level("DX+2"));
    c.skills.append(Skill::new("Stealth", 12).with_relative_level("DX+0"));
    c.skills.append(Skill::new("Climbing", 12).with_relative_level("DX+0"));
    c.spells.append(Skill::new("Fireball", 13).with_relative_level("IQ+3"));

    let mut swing = Attack::new("Sword", "13")
        .with_mode("Swing")
        .with_damage("sw+1 cut");
    swing.parry = Some("9".into());
    c.melee.append(swing);
    c.melee.append(
        Attack::new("Sword", "12")
            .with_mode("Thrust")
            .with_damage("thr+1 imp"),
    );
    c.ranged.append(
        Attack::new("Sword", "16")
            .with_mode("Thrown")
            .with_damage("thr imp"),
    );
    c
}

/// Parse a formula with the basic grammar.
pub fn chain(formula: &str) -> ActionChain {
    BasicParser
        .parse(formula)
        .unwrap_or_else(|| panic!("{} should parse", formula))
}
