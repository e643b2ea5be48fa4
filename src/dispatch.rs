//! Action dispatcher.
//!
//! `Dispatcher` executes a parsed chain: it posts modifiers, opens
//! documents, forwards chat commands, or works out a formula and level and
//! hands them to the roller. In calculate mode it stops short of rolling
//! and returns the level instead.
//!
//! The modifier stack is snapshotted on entry to every dispatch. Any exit
//! that does not apply an effect or hand off a roll (an error, a no-roll,
//! a calculation) restores that snapshot, so failed and calculated
//! formulas leave the stack as they found it. A calculated level counts
//! only the modifiers the action posted for itself.

use crate::action::{Action, ActionChain, ActionKind};
use crate::character::{find_attack, leading_int, AttackScope, CharacterView};
use crate::config::EngineConfig;
use crate::context::{EventContext, OptionBag};
use crate::error::OtfError;
use crate::host::{DamageRequest, Host, RollOutcome, RollRequest};
use crate::matcher::NameMatcher;
use crate::modifier::{ModifierEntry, ModifierStack};
use crate::parser::{d6ify, FormulaParser};
use crate::resolver::{ChainOutcome, ChainResolver, ResolvedObject};

/// A calculated level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalcResult {
    /// Level after every pending modifier.
    pub target: i32,
    pub subject: String,
}

/// How a dispatch ended.
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchOutcome {
    /// A direct effect was applied (modifier posted, document opened,
    /// damage handed off).
    Applied,
    /// A chat command ran; whether it was handled.
    Chat(bool),
    Rolled(RollOutcome),
    Calculated(CalcResult),
    /// Nothing to roll: no formula, or a level of zero or below.
    NoRoll,
}

impl DispatchOutcome {
    pub fn is_success(&self) -> bool {
        match self {
            DispatchOutcome::Applied | DispatchOutcome::Calculated(_) => true,
            DispatchOutcome::Chat(handled) => *handled,
            DispatchOutcome::Rolled(outcome) => outcome.success,
            DispatchOutcome::NoRoll => false,
        }
    }

    /// The calculation, in calculate mode.
    pub fn calculation(&self) -> Option<&CalcResult> {
        match self {
            DispatchOutcome::Calculated(result) => Some(result),
            _ => None,
        }
    }

    fn keeps_modifiers(&self) -> bool {
        matches!(
            self,
            DispatchOutcome::Applied | DispatchOutcome::Chat(_) | DispatchOutcome::Rolled(_)
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Perform,
    Calculate,
}

/// Per-call inputs shared by nested dispatches.
struct Call<'c> {
    actor: Option<&'c dyn CharacterView>,
    event: &'c EventContext,
    targets: &'c [String],
    mode: Mode,
}

/// A roll being assembled.
struct RollPlan {
    formula: String,
    prefix: String,
    subject: String,
    target: i32,
    /// Entries this action posted for itself; a calculation applies only these.
    targeted: Vec<ModifierEntry>,
    options: OptionBag,
}

/// Executes actions against a host.
///
/// # Examples
///
/// ```rust
/// use otf_engine::*;
///
/// #[derive(Default)]
/// struct Table {
///     rolls: Vec<RollRequest>,
/// }
///
/// impl Roller for Table {
///     fn roll(&mut self, _: Option<&dyn CharacterView>, request: &RollRequest) -> RollOutcome {
///         self.rolls.push(request.clone());
///         RollOutcome::success()
///     }
/// }
/// impl ChatProcessor for Table {
///     fn submit(&mut self, _: &str, _: &EventContext) -> bool { true }
/// }
/// impl DocumentHost for Table {
///     fn open(&mut self, _: DocumentKind, _: &str) {}
///     fn open_reference(&mut self, _: &str) {}
/// }
/// impl DamagePipeline for Table {
///     fn damage(&mut self, _: Option<&dyn CharacterView>, _: &DamageRequest) {}
/// }
/// impl Notifier for Table {
///     fn warn(&mut self, _: &str) {}
/// }
///
/// let mut ann = Character::new("Ann");
/// ann.skills.append(Skill::new("Acrobatics", 14));
///
/// let mut table = Table::default();
/// let mut bucket = ModifierBucket::new();
/// let config = EngineConfig::default();
/// let mut dispatcher = Dispatcher::new(&BasicParser, &mut table, &mut bucket, &config);
///
/// let outcome = dispatcher
///     .execute_otf("[S:Acrobatics -1]", Some(&ann), &EventContext::new())
///     .unwrap();
/// assert!(outcome.is_success());
/// assert_eq!(table.rolls[0].target, 14);
/// assert_eq!(table.rolls[0].modifier_total(), -1);
/// ```
pub struct Dispatcher<'a> {
    parser: &'a dyn FormulaParser,
    host: &'a mut dyn Host,
    bucket: &'a mut dyn ModifierStack,
    config: &'a EngineConfig,
}

impl<'a> Dispatcher<'a> {
    /// Create a dispatcher over a parser, a host and a modifier stack.
    pub fn new(
        parser: &'a dyn FormulaParser,
        host: &'a mut dyn Host,
        bucket: &'a mut dyn ModifierStack,
        config: &'a EngineConfig,
    ) -> Self {
        Self {
            parser,
            host,
            bucket,
            config,
        }
    }

    /// Execute `chain`, rolling if it resolves to a roll.
    ///
    /// `targets` names the tokens damage is spread over.
    pub fn perform(
        &mut self,
        chain: &ActionChain,
        actor: Option<&dyn CharacterView>,
        event: &EventContext,
        targets: &[String],
    ) -> Result<DispatchOutcome, OtfError> {
        let call = Call {
            actor,
            event,
            targets,
            mode: Mode::Perform,
        };
        self.run(chain, &call)
    }

    /// Work out the level `chain` would roll against without rolling.
    ///
    /// The modifier stack is left exactly as it was.
    pub fn calculate(
        &mut self,
        chain: &ActionChain,
        actor: Option<&dyn CharacterView>,
    ) -> Result<DispatchOutcome, OtfError> {
        let event = EventContext::new();
        let call = Call {
            actor,
            event: &event,
            targets: &[],
            mode: Mode::Calculate,
        };
        self.run(chain, &call)
    }

    /// Parse and perform formula text such as `"[S:Stealth]"`.
    pub fn execute_otf(
        &mut self,
        text: &str,
        actor: Option<&dyn CharacterView>,
        event: &EventContext,
    ) -> Result<DispatchOutcome, OtfError> {
        let chain = match self.parse_formula(text) {
            Ok(chain) => chain,
            Err(e) => {
                self.report(&e);
                return Err(e);
            }
        };
        self.perform(&chain, actor, event, &[])
    }

    fn parse_formula(&self, text: &str) -> Result<ActionChain, OtfError> {
        let trimmed = text.trim();
        let body = trimmed
            .strip_prefix('[')
            .and_then(|t| t.strip_suffix(']'))
            .unwrap_or(trimmed);
        self.parser
            .parse(body)
            .ok_or_else(|| OtfError::ParseFailure(body.to_string()))
    }

    fn run(&mut self, chain: &ActionChain, call: &Call<'_>) -> Result<DispatchOutcome, OtfError> {
        let result = self.dispatch(chain, call, 0);
        if let Err(e) = &result {
            let quiet = call.mode == Mode::Calculate
                && matches!(e, OtfError::NotFound { .. } | OtfError::AttackNotFound { .. });
            if !quiet {
                self.report(e);
            }
        }
        result
    }

    fn report(&mut self, error: &OtfError) {
        tracing::warn!(error = %error, "formula failed");
        self.host.warn(&error.to_string());
    }

    fn dispatch(
        &mut self,
        chain: &ActionChain,
        call: &Call<'_>,
        depth: usize,
    ) -> Result<DispatchOutcome, OtfError> {
        if depth > self.config.max_dispatch_depth {
            return Err(OtfError::RecursionLimitExceeded {
                limit: self.config.max_dispatch_depth,
            });
        }
        let saved = self.bucket.snapshot();
        let result = self.dispatch_kind(chain, call, depth);
        if !matches!(&result, Ok(outcome) if outcome.keeps_modifiers()) {
            tracing::debug!(depth, "restoring modifier stack");
            self.bucket.restore(saved);
        }
        result
    }

    fn dispatch_kind(
        &mut self,
        chain: &ActionChain,
        call: &Call<'_>,
        depth: usize,
    ) -> Result<DispatchOutcome, OtfError> {
        let action = chain.head();
        tracing::debug!(formula = %action.orig, mode = ?call.mode, depth, "dispatching");

        match &action.kind {
            ActionKind::SkillOrSpell { .. } | ActionKind::Attribute { .. } => {
                return self.dispatch_resolved(chain, call, depth);
            }
            ActionKind::Attack { name, scope } => {
                return self.dispatch_attack(action, name, *scope, call, depth);
            }
            ActionKind::AttackDamage { name, scope } => {
                return self.dispatch_attack_damage(action, name, *scope, call, depth);
            }
            _ => {}
        }

        if call.mode == Mode::Calculate && !is_roll_kind(&action.kind) {
            tracing::debug!(formula = %action.orig, "nothing to calculate");
            return Ok(DispatchOutcome::NoRoll);
        }

        match &action.kind {
            ActionKind::Pdf { link } => {
                self.host.open_reference(link);
                Ok(DispatchOutcome::Applied)
            }
            ActionKind::Modifier { .. } => {
                for node in chain {
                    if let ActionKind::Modifier { amount } = node.kind {
                        let description = node.desc.as_deref().unwrap_or(&node.orig);
                        self.bucket.add_modifier(amount, description);
                    }
                }
                Ok(DispatchOutcome::Applied)
            }
            ActionKind::Chat { quiet } => {
                let lines = format!(
                    "/setEventFlags {} {} {}\n{}",
                    quiet, call.event.shift, call.event.ctrl, action.orig
                );
                Ok(DispatchOutcome::Chat(self.host.submit(&lines, call.event)))
            }
            ActionKind::LinkedDocument { document, id } => {
                self.host.open(*document, id);
                Ok(DispatchOutcome::Applied)
            }
            ActionKind::ControlRoll => {
                let plan = RollPlan {
                    formula: self.config.three_die_formula.clone(),
                    prefix: String::from("Control Roll, "),
                    subject: action.desc.clone().unwrap_or_default(),
                    target: action.target.unwrap_or(0),
                    targeted: Vec::new(),
                    options: base_options(action),
                };
                self.finish_three_die(plan, call)
            }
            ActionKind::Roll {
                formula,
                display_formula,
            } => {
                let targeted = self.post_node_modifiers(action);
                let shown = display_formula.as_deref().unwrap_or(formula);
                let plan = RollPlan {
                    formula: formula.clone(),
                    prefix: rolling_prefix(shown, action.desc.as_deref()),
                    subject: String::new(),
                    target: -1,
                    targeted,
                    options: base_options(action),
                };
                self.finish_roll(plan, call)
            }
            ActionKind::DerivedRoll {
                base,
                derived_formula,
                formula,
            } => {
                let actor = call.actor.ok_or(OtfError::NoCharacterSelected)?;
                let base_formula =
                    actor
                        .base_damage(*base)
                        .ok_or_else(|| OtfError::MissingBaseFormula {
                            actor: actor.name().to_string(),
                            base: *base,
                        })?;
                let targeted = self.post_node_modifiers(action);
                let shown = format!("{}{}", derived_formula, formula);
                let plan = RollPlan {
                    formula: d6ify(&format!("{}{}", base_formula, formula)),
                    prefix: rolling_prefix(&shown, action.desc.as_deref()),
                    subject: String::new(),
                    target: -1,
                    targeted,
                    options: base_options(action),
                };
                self.finish_roll(plan, call)
            }
            ActionKind::Damage {
                formula,
                damage_type,
                ext_damage_type,
                hit_location,
            } => {
                self.post_node_modifiers(action);
                let request = DamageRequest {
                    formula: formula.clone(),
                    label: None,
                    damage_type: damage_type.clone(),
                    ext_damage_type: ext_damage_type.clone(),
                    hit_location: hit_location.clone(),
                    targets: call.targets.to_vec(),
                    modifiers: self.bucket.snapshot(),
                };
                self.host.damage(call.actor, &request);
                Ok(DispatchOutcome::Applied)
            }
            ActionKind::DerivedDamage {
                base,
                derived_formula,
                formula,
                damage_type,
                ext_damage_type,
                hit_location,
            } => {
                let actor = call.actor.ok_or(OtfError::NoCharacterSelected)?;
                let base_formula =
                    actor
                        .base_damage(*base)
                        .ok_or_else(|| OtfError::MissingBaseFormula {
                            actor: actor.name().to_string(),
                            base: *base,
                        })?;
                self.post_node_modifiers(action);
                let request = DamageRequest {
                    formula: d6ify(&format!("{}{}", base_formula, formula)),
                    label: Some(format!("{}{}", derived_formula, formula)),
                    damage_type: damage_type.clone(),
                    ext_damage_type: ext_damage_type.clone(),
                    hit_location: hit_location.clone(),
                    targets: call.targets.to_vec(),
                    modifiers: self.bucket.snapshot(),
                };
                self.host.damage(Some(actor), &request);
                Ok(DispatchOutcome::Applied)
            }
            ActionKind::SkillOrSpell { .. }
            | ActionKind::Attribute { .. }
            | ActionKind::Attack { .. }
            | ActionKind::AttackDamage { .. } => Ok(DispatchOutcome::NoRoll),
        }
    }

    fn dispatch_resolved(
        &mut self,
        chain: &ActionChain,
        call: &Call<'_>,
        depth: usize,
    ) -> Result<DispatchOutcome, OtfError> {
        let resolution = match ChainResolver::new(call.actor).resolve(chain)? {
            ChainOutcome::Selected(resolution) => resolution,
            ChainOutcome::Unresolved { attempts } => {
                return Err(match call.actor {
                    None => OtfError::NoCharacterSelected,
                    Some(actor) => OtfError::NotFound {
                        attempts,
                        actor: actor.name().to_string(),
                    },
                });
            }
        };

        let object = resolution.object.as_ref();
        if !self.run_check_hook(object, call, depth)? {
            return Ok(DispatchOutcome::NoRoll);
        }
        let targeted = self.post_node_modifiers(&resolution.action);
        self.run_during_hook(object, call, depth)?;

        let mut options = base_options(&resolution.action);
        if let Some(object) = object {
            options.set("obj", object);
        }
        let plan = RollPlan {
            formula: self.config.three_die_formula.clone(),
            prefix: resolution.prefix.clone(),
            subject: resolution.subject.clone(),
            target: resolution.level,
            targeted,
            options,
        };
        self.finish_three_die(plan, call)
    }

    fn dispatch_attack(
        &mut self,
        action: &Action,
        name: &str,
        scope: AttackScope,
        call: &Call<'_>,
        depth: usize,
    ) -> Result<DispatchOutcome, OtfError> {
        let actor = call.actor.ok_or(OtfError::NoCharacterSelected)?;
        let matcher = NameMatcher::new(name)?;
        let attack = find_attack(actor, &matcher, scope).ok_or_else(|| {
            OtfError::AttackNotFound {
                name: name.to_string(),
                actor: actor.name().to_string(),
            }
        })?;

        let level_text = attack.level.trim();
        let target = leading_int(level_text).unwrap_or_else(|| {
            let error = OtfError::NonNumericTarget(level_text.to_string());
            tracing::debug!(error = %error, "attack has no level");
            0
        });
        let object = ResolvedObject::Attack(attack.clone());

        if !self.run_check_hook(Some(&object), call, depth)? {
            return Ok(DispatchOutcome::NoRoll);
        }
        let mut targeted = Vec::new();
        let level_costs = level_text
            .split_once(char::is_whitespace)
            .map(|(_, rest)| rest.trim())
            .filter(|rest| !rest.is_empty());
        if let Some(costs) = level_costs {
            targeted.push(self.bucket.add_modifier(0, costs));
        }
        targeted.extend(self.post_node_modifiers(action));
        self.run_during_hook(Some(&object), call, depth)?;

        let mut options = base_options(action);
        options.set("obj", &object);
        if let Some(mode) = attack.mode.as_deref().filter(|m| !m.is_empty()) {
            options.set("text", format!("({})", mode));
        }
        let plan = RollPlan {
            formula: self.config.three_die_formula.clone(),
            prefix: String::new(),
            subject: attack.name.clone(),
            target,
            targeted,
            options,
        };
        self.finish_three_die(plan, call)
    }

    fn dispatch_attack_damage(
        &mut self,
        action: &Action,
        name: &str,
        scope: AttackScope,
        call: &Call<'_>,
        depth: usize,
    ) -> Result<DispatchOutcome, OtfError> {
        let actor = call.actor.ok_or(OtfError::NoCharacterSelected)?;
        let matcher = NameMatcher::new(name)?;
        let attack = find_attack(actor, &matcher, scope).ok_or_else(|| {
            OtfError::AttackNotFound {
                name: name.to_string(),
                actor: actor.name().to_string(),
            }
        })?;

        let mut nested = self
            .parser
            .parse_roll_or_damage(&attack.damage)
            .ok_or_else(|| OtfError::ParseFailure(attack.damage.clone()))?;
        if action.costs.is_some() {
            nested.costs = action.costs.clone();
        }
        if action.modifier.is_some() {
            nested.modifier = action.modifier;
        }
        if action.desc.is_some() {
            nested.desc = action.desc.clone();
        }
        nested.blind |= action.blind;
        tracing::debug!(attack = %attack.full_name(), damage = %attack.damage, "attack damage");
        self.dispatch(&ActionChain::single(nested), call, depth + 1)
    }

    /// Run a pre-roll gate. Returns whether the roll may go ahead.
    fn run_check_hook(
        &mut self,
        object: Option<&ResolvedObject>,
        call: &Call<'_>,
        depth: usize,
    ) -> Result<bool, OtfError> {
        let Some(formula) = object.and_then(ResolvedObject::check_otf) else {
            return Ok(true);
        };
        let chain = self.parse_formula(formula)?;
        let outcome = self.dispatch(&chain, call, depth + 1)?;
        if !outcome.is_success() {
            tracing::debug!(formula, "pre-roll check failed");
        }
        Ok(outcome.is_success())
    }

    fn run_during_hook(
        &mut self,
        object: Option<&ResolvedObject>,
        call: &Call<'_>,
        depth: usize,
    ) -> Result<(), OtfError> {
        let Some(formula) = object.and_then(ResolvedObject::during_otf) else {
            return Ok(());
        };
        let result = self
            .parse_formula(formula)
            .and_then(|chain| self.dispatch(&chain, call, depth + 1));
        match result {
            Err(e @ OtfError::RecursionLimitExceeded { .. }) => Err(e),
            Err(e) => {
                tracing::debug!(formula, error = %e, "side formula failed");
                Ok(())
            }
            Ok(_) => Ok(()),
        }
    }

    /// Post a node's cost annotation and flat modifier, returning what was posted.
    fn post_node_modifiers(&mut self, action: &Action) -> Vec<ModifierEntry> {
        let mut posted = Vec::new();
        if let Some(costs) = action.costs.as_deref() {
            posted.push(self.bucket.add_modifier(0, costs));
        }
        if let Some(amount) = action.modifier.filter(|m| *m != 0) {
            let description = action.desc.as_deref().unwrap_or(&action.orig);
            posted.push(self.bucket.add_modifier(amount, description));
        }
        posted
    }

    fn finish_three_die(
        &mut self,
        plan: RollPlan,
        call: &Call<'_>,
    ) -> Result<DispatchOutcome, OtfError> {
        if plan.target <= 0 {
            tracing::debug!(subject = %plan.subject, target = plan.target, "no level to roll against");
            return Ok(DispatchOutcome::NoRoll);
        }
        self.finish_roll(plan, call)
    }

    fn finish_roll(&mut self, plan: RollPlan, call: &Call<'_>) -> Result<DispatchOutcome, OtfError> {
        if plan.formula.is_empty() || plan.target == 0 {
            return Ok(DispatchOutcome::NoRoll);
        }
        match call.mode {
            Mode::Calculate => {
                let target = plan
                    .targeted
                    .iter()
                    .fold(plan.target, |target, m| target.saturating_add(m.amount));
                Ok(DispatchOutcome::Calculated(CalcResult {
                    target,
                    subject: plan.subject,
                }))
            }
            Mode::Perform => {
                let modifiers = self.bucket.snapshot();
                let request = RollRequest {
                    formula: plan.formula,
                    prefix: plan.prefix,
                    subject: plan.subject,
                    target: plan.target,
                    modifiers,
                    options: plan.options,
                };
                tracing::debug!(formula = %request.formula, target = request.target, "rolling");
                let outcome = self.host.roll(call.actor, &request);
                Ok(DispatchOutcome::Rolled(outcome))
            }
        }
    }
}

fn is_roll_kind(kind: &ActionKind) -> bool {
    matches!(
        kind,
        ActionKind::ControlRoll | ActionKind::Roll { .. } | ActionKind::DerivedRoll { .. }
    )
}

fn rolling_prefix(formula: &str, desc: Option<&str>) -> String {
    match desc {
        Some(desc) => format!("Rolling {} {}", formula, desc),
        None => format!("Rolling {}", formula),
    }
}

fn base_options(action: &Action) -> OptionBag {
    let mut options = OptionBag::new();
    options.set("blind", action.blind);
    if let Some(desc) = &action.desc {
        options.set("text", desc);
    }
    options.set("action", action);
    options
}
