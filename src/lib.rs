//! # otf_engine - On-the-Fly Formula Engine
//!
//! Turns bracketed formulas embedded in free text into rolls:
//! - **Scanning** finds top-level `[...]` spans and renders them as clickable markup
//! - **Resolution** picks the best alternative of a skill/attribute chain for a character
//! - **Dispatch** posts modifiers, opens documents, runs chat commands or hands a roll
//!   to the host, with a calculate mode that leaves shared state untouched
//!
//! ## Core Concepts
//!
//! ### Formula Pipeline
//!
//! ```text
//! text → [BracketScanner] → [ActionChain] → [ChainResolver] → [Dispatcher] → host
//! ```
//!
//! 1. **FormulaParser** turns a bracket body into an `ActionChain`
//! 2. **ChainResolver** scores alternatives against a `CharacterView`
//! 3. **Dispatcher** executes the chain through the `Host` traits
//!
//! ### Key Features
//!
//! - **Typed Character Access**: attributes and resources are enums, lists are ordered collections
//! - **Wildcard Matching**: `*` globs, case-insensitive, anchored at the start of the name
//! - **Deterministic Tie-Break**: equal scores go to the earlier alternative
//! - **Snapshot Restore**: failed and calculated dispatches leave the modifier stack as found
//! - **Bounded Nesting**: side formulas and attack damage stop at a configured depth
//!
//! ## Example
//!
//! ```rust
//! use otf_engine::*;
//!
//! let mut ann = Character::new("Ann");
//! ann.set_attribute(Attribute::DX, 12);
//! ann.skills.append(Skill::new("Acrobatics", 14));
//!
//! // Render
//! let config = EngineConfig::default();
//! let html = BracketScanner::new(&BasicParser, &config).render("Try [S:Acrobatics | DX]");
//! assert!(html.contains("data-action="));
//!
//! // Resolve
//! let chain = scanner::decode_span_action(&html).unwrap();
//! match ChainResolver::new(Some(&ann)).resolve(&chain).unwrap() {
//!     ChainOutcome::Selected(r) => assert_eq!((r.subject.as_str(), r.level), ("Acrobatics", 14)),
//!     ChainOutcome::Unresolved { .. } => unreachable!(),
//! }
//! ```
//!
//! ## Modules
//!
//! - [`scanner`] - Bracket scanning and span rendering
//! - [`parser`] - Formula parser boundary and the basic grammar
//! - [`action`] - Parsed actions and alternative chains
//! - [`resolver`] - Best-alternative chain resolution
//! - [`dispatch`] - Action execution
//! - [`host`] - Roller, chat, document and damage collaborators
//! - [`character`] - Character data model and lookups
//! - [`collection`] - Ordered collection with zero-padded keys
//! - [`matcher`] - Wildcard name matching
//! - [`modifier`] - Modifier stack and modifier directives
//! - [`actor`] - The currently selected character
//! - [`context`] - Event context and roll options
//! - [`config`] - Engine configuration
//! - [`error`] - Error types

pub mod action;
pub mod actor;
pub mod character;
pub mod collection;
pub mod config;
pub mod context;
pub mod dispatch;
pub mod error;
pub mod host;
pub mod matcher;
pub mod modifier;
pub mod parser;
pub mod resolver;
pub mod scanner;

// Re-export main types for convenience
pub use action::{Action, ActionChain, ActionKind, DocumentKind};
pub use actor::CurrentActor;
pub use config::EngineConfig;
pub use context::{EventContext, OptionBag};
pub use dispatch::{CalcResult, DispatchOutcome, Dispatcher};
pub use error::OtfError;
pub use resolver::{ChainOutcome, ChainResolver, Resolution, ResolvedObject};
pub use scanner::BracketScanner;

// Re-export character model types
pub use character::{
    find_attack, find_skill_spell, Attack, AttackScope, Attribute, Character, CharacterView,
    DerivedBase, Resource, Skill, SkillScope,
};
pub use collection::OrderedCollection;
pub use matcher::NameMatcher;

// Re-export host and modifier types
pub use host::{
    ChatProcessor, DamagePipeline, DamageRequest, DocumentHost, Host, Notifier, RollOutcome,
    RollRequest, Roller,
};
pub use modifier::{ModifierBucket, ModifierEntry, ModifierStack};
pub use parser::{BasicParser, FormulaParser};
