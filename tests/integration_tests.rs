mod common;

use common::{chain, sample_character, RecordingHost};
use otf_engine::*;
use std::sync::Arc;

fn perform(
    host: &mut RecordingHost,
    bucket: &mut ModifierBucket,
    chain: &ActionChain,
    actor: Option<&Character>,
) -> Result<DispatchOutcome, OtfError> {
    let config = EngineConfig::default();
    let mut dispatcher = Dispatcher::new(&BasicParser, host, bucket, &config);
    dispatcher.perform(
        chain,
        actor.map(|a| a as &dyn CharacterView),
        &EventContext::new(),
        &[],
    )
}

/// An attribute roll with nobody selected is refused.
#[test]
fn test_attribute_without_character() {
    let mut host = RecordingHost::new();
    let mut bucket = ModifierBucket::new();

    let result = perform(&mut host, &mut bucket, &chain("IQ-2"), None);

    assert_eq!(result, Err(OtfError::NoCharacterSelected));
    assert_eq!(host.warnings, vec!["You must have a character selected"]);
    assert!(host.rolls.is_empty());
    assert!(bucket.entries().is_empty());
}

/// A bare skill name resolves against the skill list.
#[test]
fn test_skill_resolves_to_three_dice() {
    let ann = sample_character();
    let mut host = RecordingHost::new();
    let mut bucket = ModifierBucket::new();
    let acrobatics = ActionChain::single(Action::new(
        ActionKind::SkillOrSpell {
            name: "Acrobatics".into(),
            scope: SkillScope::Any,
            floating: None,
        },
        "Acrobatics",
    ));

    let outcome = perform(&mut host, &mut bucket, &acrobatics, Some(&ann)).unwrap();

    assert!(outcome.is_success());
    let roll = &host.rolls[0];
    assert_eq!(roll.target, 14);
    assert_eq!(roll.subject, "Acrobatics");
    assert_eq!(roll.formula, "3d6");
    assert_eq!(roll.prefix, "");
}

/// The first matching attack wins, not the best one.
#[test]
fn test_attack_first_match_in_list_order() {
    let ann = sample_character();
    let mut host = RecordingHost::new();
    let mut bucket = ModifierBucket::new();

    perform(&mut host, &mut bucket, &chain("A:Sword*Thrust"), Some(&ann)).unwrap();
    perform(&mut host, &mut bucket, &chain("A:Sword"), Some(&ann)).unwrap();
    perform(&mut host, &mut bucket, &chain("R:Sword"), Some(&ann)).unwrap();

    let rolled: Vec<_> = host
        .rolls
        .iter()
        .map(|r| (r.subject.as_str(), r.options.get::<String>("text"), r.target))
        .collect();
    assert_eq!(
        rolled,
        vec![
            ("Sword", Some("(Thrust)".to_string()), 12),
            ("Sword", Some("(Swing)".to_string()), 13),
            ("Sword", Some("(Thrown)".to_string()), 16)
        ]
    );
}

/// Equal levels go to the alternative written first.
#[test]
fn test_tie_break_is_chain_order() {
    let ann = sample_character();
    let mut host = RecordingHost::new();
    let mut bucket = ModifierBucket::new();

    perform(&mut host, &mut bucket, &chain("S:Stealth | S:Climbing"), Some(&ann)).unwrap();
    perform(&mut host, &mut bucket, &chain("S:Climbing | S:Stealth"), Some(&ann)).unwrap();

    assert_eq!(host.rolls[0].subject, "Stealth");
    assert_eq!(host.rolls[1].subject, "Climbing");
}

/// Alternatives compete on level plus modifier.
#[test]
fn test_best_alternative_includes_modifier() {
    let ann = sample_character();
    let mut host = RecordingHost::new();
    let mut bucket = ModifierBucket::new();

    perform(
        &mut host,
        &mut bucket,
        &chain("S:Acrobatics -4 | DX"),
        Some(&ann),
    )
    .unwrap();

    let roll = &host.rolls[0];
    assert_eq!(roll.subject, "DX");
    assert_eq!(roll.prefix, "Roll vs ");
    assert_eq!(roll.target, 12);
    assert!(roll.modifiers.is_empty());
}

/// Calculating applies only the formula's own modifiers, then withdraws them.
#[test]
fn test_calculate_snapshot_round_trip() {
    let ann = sample_character();
    let mut host = RecordingHost::new();
    let mut bucket = ModifierBucket::new();
    bucket.add_modifier(-1, "Shock");
    let before = bucket.snapshot();

    let config = EngineConfig::default();
    let mut dispatcher = Dispatcher::new(&BasicParser, &mut host, &mut bucket, &config);
    let outcome = dispatcher
        .calculate(&chain("S:Fireball +2 *Costs 2FP"), Some(&ann))
        .unwrap();

    assert_eq!(
        outcome,
        DispatchOutcome::Calculated(CalcResult {
            target: 15,
            subject: "Fireball".into()
        })
    );
    assert_eq!(bucket.snapshot(), before);
    assert!(host.rolls.is_empty());
}

/// Pending modifiers from elsewhere do not shift a calculated level.
#[test]
fn test_calculate_ignores_pending_modifiers() {
    let ann = sample_character();
    let mut host = RecordingHost::new();
    let config = EngineConfig::default();

    let mut empty = ModifierBucket::new();
    let mut dispatcher = Dispatcher::new(&BasicParser, &mut host, &mut empty, &config);
    let clean = dispatcher.calculate(&chain("S:Acrobatics +1"), Some(&ann)).unwrap();

    let mut busy = ModifierBucket::new();
    busy.add_modifier(-5, "pending");
    let mut dispatcher = Dispatcher::new(&BasicParser, &mut host, &mut busy, &config);
    let crowded = dispatcher.calculate(&chain("S:Acrobatics +1"), Some(&ann)).unwrap();

    assert_eq!(clean.calculation().map(|c| c.target), Some(15));
    assert_eq!(crowded, clean);
    assert_eq!(busy.total(), -5);
}

/// Modifiers posted by a side formula are not part of the calculated level.
#[test]
fn test_calculate_ignores_during_hook_modifiers() {
    let mut ann = sample_character();
    let mut dancing = Skill::new("Dancing", 12);
    dancing.during_otf = Some("[+3 Music]".into());
    ann.skills.append(dancing);

    let mut host = RecordingHost::new();
    let mut bucket = ModifierBucket::new();
    let config = EngineConfig::default();
    let mut dispatcher = Dispatcher::new(&BasicParser, &mut host, &mut bucket, &config);
    let outcome = dispatcher.calculate(&chain("S:Dancing -1"), Some(&ann)).unwrap();

    assert_eq!(outcome.calculation().map(|c| c.target), Some(11));
    assert!(bucket.entries().is_empty());
}

/// An oversized modifier saturates instead of overflowing.
#[test]
fn test_extreme_modifier_does_not_overflow() {
    let ann = sample_character();
    let mut host = RecordingHost::new();
    let mut bucket = ModifierBucket::new();
    let config = EngineConfig::default();
    let mut dispatcher = Dispatcher::new(&BasicParser, &mut host, &mut bucket, &config);

    let outcome = dispatcher
        .execute_otf("[S:Acrobatics +2147483647 | DX]", Some(&ann), &EventContext::new())
        .unwrap();
    assert!(outcome.is_success());
    let calc = dispatcher
        .calculate(&chain("S:Acrobatics +2147483647"), Some(&ann))
        .unwrap();
    assert_eq!(calc.calculation().map(|c| c.target), Some(i32::MAX));

    assert_eq!(host.rolls[0].subject, "Acrobatics");
    assert_eq!(host.rolls[0].target, 14);
    assert_eq!(host.rolls[0].modifier_total(), i32::MAX);
}

/// Untargeted rolls calculate to -1 plus their own modifiers.
#[test]
fn test_calculate_untargeted_roll() {
    let ann = sample_character();
    let mut host = RecordingHost::new();
    let mut bucket = ModifierBucket::new();
    let config = EngineConfig::default();
    let mut dispatcher = Dispatcher::new(&BasicParser, &mut host, &mut bucket, &config);

    let plain = dispatcher.calculate(&chain("3d6+2"), None).unwrap();
    let derived = dispatcher.calculate(&chain("sw"), Some(&ann)).unwrap();

    assert_eq!(
        plain,
        DispatchOutcome::Calculated(CalcResult {
            target: -1,
            subject: String::new()
        })
    );
    assert_eq!(derived.calculation().map(|c| c.target), Some(-1));
    assert!(host.rolls.is_empty());
}

/// Attacks calculate from the level text; its cost is posted and withdrawn.
#[test]
fn test_calculate_attack() {
    let mut ann = sample_character();
    ann.melee
        .append(Attack::new("Staff", "11 *Costs 1FP").with_mode("Swing"));
    let mut host = RecordingHost::new();
    let mut bucket = ModifierBucket::new();
    bucket.add_modifier(2, "Aim");
    let before = bucket.snapshot();

    let config = EngineConfig::default();
    let mut dispatcher = Dispatcher::new(&BasicParser, &mut host, &mut bucket, &config);
    let outcome = dispatcher.calculate(&chain("M:Staff -1"), Some(&ann)).unwrap();

    assert_eq!(
        outcome,
        DispatchOutcome::Calculated(CalcResult {
            target: 10,
            subject: "Staff".into()
        })
    );
    assert_eq!(bucket.snapshot(), before);
    assert!(host.rolls.is_empty());
}

/// Calculating for a missing attack returns the error without a warning.
#[test]
fn test_calculate_missing_attack_is_quiet() {
    let ann = sample_character();
    let mut host = RecordingHost::new();
    let mut bucket = ModifierBucket::new();
    let config = EngineConfig::default();
    let mut dispatcher = Dispatcher::new(&BasicParser, &mut host, &mut bucket, &config);

    let err = dispatcher.calculate(&chain("M:Bow"), Some(&ann)).unwrap_err();
    assert!(matches!(err, OtfError::AttackNotFound { .. }));
    assert!(host.warnings.is_empty());
}

/// Every linked document kind is opened by id.
#[test]
fn test_linked_documents_open() {
    let mut host = RecordingHost::new();
    let mut bucket = ModifierBucket::new();

    for formula in [
        "JournalEntry[j1]{Notes}",
        "Actor[a1]{Goblin}",
        "RollTable[t1]",
        "Item[i1]{Rope}",
    ] {
        let outcome = perform(&mut host, &mut bucket, &chain(formula), None).unwrap();
        assert_eq!(outcome, DispatchOutcome::Applied, "{}", formula);
    }

    assert_eq!(
        host.opened,
        vec![
            (DocumentKind::JournalEntry, "j1".to_string()),
            (DocumentKind::Actor, "a1".to_string()),
            (DocumentKind::RollTable, "t1".to_string()),
            (DocumentKind::Item, "i1".to_string()),
        ]
    );
}

/// A blind formula asks the roller for a blind roll.
#[test]
fn test_blind_flag_reaches_roll_options() {
    let ann = sample_character();
    let mut host = RecordingHost::new();
    let mut bucket = ModifierBucket::new();

    perform(&mut host, &mut bucket, &chain("!S:Stealth"), Some(&ann)).unwrap();
    perform(&mut host, &mut bucket, &chain("S:Stealth"), Some(&ann)).unwrap();

    assert_eq!(host.rolls[0].options.get::<bool>("blind"), Some(true));
    assert_eq!(host.rolls[1].options.get::<bool>("blind"), Some(false));
}

/// A level of zero or below never rolls and never touches the stack.
#[test]
fn test_non_positive_target_is_no_roll() {
    let ann = sample_character();
    let mut host = RecordingHost::new();
    let mut bucket = ModifierBucket::new();

    let negative = ActionChain::single(
        Action::new(
            ActionKind::Attribute {
                attribute: Attribute::HT,
                melee: None,
            },
            "HT",
        )
        .with_target(-3)
        .with_modifier(-2)
        .with_costs("*Costs 1FP"),
    );
    let outcome = perform(&mut host, &mut bucket, &negative, Some(&ann)).unwrap();
    assert_eq!(outcome, DispatchOutcome::NoRoll);

    let outcome = perform(&mut host, &mut bucket, &chain("CR:0"), Some(&ann)).unwrap();
    assert!(!outcome.is_success());

    assert!(host.rolls.is_empty());
    assert!(bucket.entries().is_empty());
}

/// Unresolved chains report every name that was tried.
#[test]
fn test_not_found_lists_attempts() {
    let ann = sample_character();
    let mut host = RecordingHost::new();
    let mut bucket = ModifierBucket::new();

    let err = perform(&mut host, &mut bucket, &chain("S:Juggling | Per"), Some(&ann)).unwrap_err();

    assert_eq!(
        err,
        OtfError::NotFound {
            attempts: vec!["Juggling".into(), "Per".into()],
            actor: "Ann".into()
        }
    );
    assert_eq!(host.warnings, vec!["Unable to find 'Juggling' or 'Per' on Ann"]);
}

/// Spells are found when no skill matches.
#[test]
fn test_spell_fallback_and_floating_skill() {
    let ann = sample_character();
    let mut host = RecordingHost::new();
    let mut bucket = ModifierBucket::new();

    perform(&mut host, &mut bucket, &chain("S:Fire*"), Some(&ann)).unwrap();
    perform(
        &mut host,
        &mut bucket,
        &chain("S:Stealth (Based:IQ)"),
        Some(&ann),
    )
    .unwrap();

    assert_eq!(host.rolls[0].subject, "Fireball");
    assert_eq!(host.rolls[0].target, 13);
    assert_eq!(host.rolls[1].subject, "IQ-based Stealth");
    assert_eq!(host.rolls[1].target, 10);
}

/// Parry references read the attack's parry value.
#[test]
fn test_parry_reference() {
    let ann = sample_character();
    let mut host = RecordingHost::new();
    let mut bucket = ModifierBucket::new();

    perform(&mut host, &mut bucket, &chain("Parry:Sword"), Some(&ann)).unwrap();

    let roll = &host.rolls[0];
    assert_eq!(roll.target, 9);
    assert_eq!(roll.subject, "Parry for Sword");
    let text: Option<String> = roll.options.get("text");
    assert_eq!(text.as_deref(), Some("(Swing)"));
}

/// Damage goes to the damage pipeline with the targets attached.
#[test]
fn test_damage_reaches_pipeline() {
    let ann = sample_character();
    let mut host = RecordingHost::new();
    let mut bucket = ModifierBucket::new();
    let config = EngineConfig::default();
    let targets = vec!["Goblin".to_string(), "Orc".to_string()];

    let mut dispatcher = Dispatcher::new(&BasicParser, &mut host, &mut bucket, &config);
    dispatcher
        .perform(&chain("D:Sword*Thrust"), Some(&ann), &EventContext::new(), &targets)
        .unwrap();

    let damage = &host.damage[0];
    assert_eq!(damage.formula, "1d6-1+1");
    assert_eq!(damage.label.as_deref(), Some("thr+1"));
    assert_eq!(damage.damage_type, "imp");
    assert_eq!(damage.targets, targets);
}

/// Parsers that hand back attack damage for attack damage loop until the
/// depth limit stops them.
#[test]
fn test_attack_damage_recursion_limit() {
    struct Looping;

    impl FormulaParser for Looping {
        fn parse(&self, text: &str) -> Option<ActionChain> {
            BasicParser.parse(text)
        }

        fn parse_roll_or_damage(&self, text: &str) -> Option<Action> {
            self.parse(text).map(|c| c.head().clone())
        }
    }

    let mut ann = sample_character();
    ann.melee.append(Attack::new("Ouroboros", "12").with_damage("D:Ouroboros"));

    let mut host = RecordingHost::new();
    let mut bucket = ModifierBucket::new();
    let config = EngineConfig::from_json(r#"{ "max_dispatch_depth": 4 }"#).unwrap();
    let mut dispatcher = Dispatcher::new(&Looping, &mut host, &mut bucket, &config);

    let err = dispatcher
        .perform(&chain("D:Ouroboros -1"), Some(&ann), &EventContext::new(), &[])
        .unwrap_err();

    assert_eq!(err, OtfError::RecursionLimitExceeded { limit: 4 });
    assert!(bucket.entries().is_empty());
    assert_eq!(host.warnings, vec!["Formula nesting exceeded 4 levels"]);
}

/// A skill whose pre-roll check names itself stops at the depth limit.
#[test]
fn test_self_referencing_check_is_bounded() {
    let mut ann = sample_character();
    let mut echo = Skill::new("Echo", 12);
    echo.check_otf = Some("[S:Echo]".into());
    ann.skills.append(echo);

    let mut host = RecordingHost::new();
    let mut bucket = ModifierBucket::new();
    let err = perform(&mut host, &mut bucket, &chain("S:Echo"), Some(&ann)).unwrap_err();

    assert!(matches!(err, OtfError::RecursionLimitExceeded { .. }));
    assert!(host.rolls.is_empty());
}

/// The selected actor is passed in explicitly by its owner.
#[test]
fn test_dispatch_with_current_actor() {
    let mut current: CurrentActor<Character> = CurrentActor::new();
    let ann = Arc::new(sample_character());
    current.set(ann.clone());

    let mut host = RecordingHost::new();
    let mut bucket = ModifierBucket::new();
    let config = EngineConfig::default();
    let mut dispatcher = Dispatcher::new(&BasicParser, &mut host, &mut bucket, &config);

    let actor = current.get().map(|a| a as &dyn CharacterView);
    let outcome = dispatcher
        .execute_otf(" [Will+1] ", actor, &EventContext::new())
        .unwrap();
    assert!(outcome.is_success());

    current.clear(&ann);
    let actor = current.get().map(|a| a as &dyn CharacterView);
    let result = dispatcher.execute_otf("[Will+1]", actor, &EventContext::new());
    assert_eq!(result, Err(OtfError::NoCharacterSelected));

    assert_eq!(host.rolls.len(), 1);
    assert_eq!(host.rolls[0].modifier_total(), 1);
}

/// The three-die formula comes from configuration.
#[test]
fn test_configured_three_die_formula() {
    let ann = sample_character();
    let mut host = RecordingHost::new();
    let mut bucket = ModifierBucket::new();
    let config = EngineConfig::from_json(r#"{ "three_die_formula": "3d6x" }"#).unwrap();

    let mut dispatcher = Dispatcher::new(&BasicParser, &mut host, &mut bucket, &config);
    dispatcher
        .perform(&chain("ST"), Some(&ann), &EventContext::new(), &[])
        .unwrap();

    assert_eq!(host.rolls[0].formula, "3d6x");
    assert_eq!(host.rolls[0].target, 11);
}

/// Cost annotations ride along as zero modifiers the host can act on.
#[test]
fn test_cost_annotation_applied_by_host() {
    let mut ann = sample_character();
    let mut host = RecordingHost::new();
    let mut bucket = ModifierBucket::new();

    perform(&mut host, &mut bucket, &chain("S:Fireball *Costs 2FP"), Some(&ann)).unwrap();

    let roll = &host.rolls[0];
    let cost = roll
        .modifiers
        .iter()
        .map(|m| modifier::ModifierDirectives::parse(&m.description))
        .find(|d| d.cost.is_some())
        .unwrap();
    cost.apply_cost(&mut ann);
    assert_eq!(ann.resource(Resource::FP), Some(9));
}
