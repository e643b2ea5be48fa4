//! Basic example: render formulas in text and dispatch them
//!
//! This example demonstrates:
//! - Rendering bracketed formulas into spans
//! - Calculating a level without touching the modifier stack
//! - Performing a roll through a console host

use otf_engine::scanner::decode_span_action;
use otf_engine::*;

/// Prints everything it is asked to do.
struct Console;

impl Roller for Console {
    fn roll(&mut self, _: Option<&dyn CharacterView>, request: &RollRequest) -> RollOutcome {
        println!(
            "  roll {} {}{} vs {} ({:+})",
            request.formula,
            request.prefix,
            request.subject,
            request.target,
            request.modifier_total()
        );
        RollOutcome::success()
    }
}

impl ChatProcessor for Console {
    fn submit(&mut self, lines: &str, _: &EventContext) -> bool {
        println!("  chat {:?}", lines);
        true
    }
}

impl DocumentHost for Console {
    fn open(&mut self, kind: DocumentKind, id: &str) {
        println!("  open {:?} {}", kind, id);
    }

    fn open_reference(&mut self, link: &str) {
        println!("  open page {}", link);
    }
}

impl DamagePipeline for Console {
    fn damage(&mut self, _: Option<&dyn CharacterView>, request: &DamageRequest) {
        println!("  damage {} {}", request.formula, request.damage_type);
    }
}

impl Notifier for Console {
    fn warn(&mut self, message: &str) {
        println!("  warning: {}", message);
    }
}

fn main() -> Result<(), OtfError> {
    // A character to roll for
    let mut ann = Character::new("Ann");
    ann.set_attribute(Attribute::DX, 12);
    ann.set_attribute(Attribute::IQ, 11);
    ann.swing = Some("1d+1".into());
    ann.skills.append(Skill::new("Acrobatics", 14));
    ann.melee.append(Attack::new("Sword", "13").with_mode("Swing").with_damage("sw+1 cut"));

    // Render formulas embedded in text
    let config = EngineConfig::default();
    let text = "Jump with [S:Acrobatics | DX-2], then [M:Sword] for [D:Sword]. [Not a formula]";
    let html = BracketScanner::new(&BasicParser, &config).render(text);
    println!("=== Rendered ===\n{}\n", html);

    let mut console = Console;
    let mut bucket = ModifierBucket::new();
    bucket.add_modifier(-1, "Shock");
    let mut dispatcher = Dispatcher::new(&BasicParser, &mut console, &mut bucket, &config);

    // Click each rendered span
    println!("=== Dispatch ===");
    for span in html.split("<span").skip(1) {
        if let Some(chain) = decode_span_action(span) {
            println!("{}", chain.head().orig);
            if let Ok(DispatchOutcome::Calculated(calc)) = dispatcher.calculate(&chain, Some(&ann)) {
                println!("  would roll {} at {}", calc.subject, calc.target);
            }
            dispatcher.perform(&chain, Some(&ann), &EventContext::new(), &[])?;
        }
    }

    // Formulas can also be run directly
    println!("\n=== Direct ===");
    let _ = dispatcher.execute_otf("[S:Juggling]", Some(&ann), &EventContext::new());

    Ok(())
}
