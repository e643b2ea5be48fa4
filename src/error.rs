//! Error types for formula resolution and dispatch.
//!
//! Every failure the engine can report is a variant of `OtfError`. None of
//! them are fatal: the dispatcher reports the failure and returns it, and
//! the scanner renders unparsable spans as literal text.

use crate::character::DerivedBase;
use thiserror::Error;

/// Escape the characters that are significant in rendered markup.
///
/// # Examples
///
/// ```rust
/// use otf_engine::error::escape_markup;
///
/// assert_eq!(escape_markup("<b>Axe</b>"), "&lt;b&gt;Axe&lt;/b&gt;");
/// ```
pub fn escape_markup(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Format the names tried by an unresolved chain.
fn format_attempts(attempts: &[String]) -> String {
    if attempts.is_empty() {
        return String::from("(nothing)");
    }
    escape_markup(&attempts.join("' or '"))
}

/// Errors that can occur while resolving or dispatching a formula.
///
/// # Examples
///
/// ```rust
/// use otf_engine::OtfError;
///
/// let err = OtfError::NotFound {
///     attempts: vec!["Stealth".into(), "DX".into()],
///     actor: "Ann".into(),
/// };
/// assert_eq!(err.to_string(), "Unable to find 'Stealth' or 'DX' on Ann");
/// ```
#[derive(Debug, Error, Clone, PartialEq)]
pub enum OtfError {
    /// The bracket body did not match the formula grammar.
    #[error("\"{0}\" did not parse into a valid On-the-Fly formula")]
    ParseFailure(String),

    /// The formula needs a character and none is selected.
    #[error("You must have a character selected")]
    NoCharacterSelected,

    /// No alternative of a chain matched anything on the character.
    #[error("Unable to find '{}' on {}", format_attempts(.attempts), escape_markup(.actor))]
    NotFound { attempts: Vec<String>, actor: String },

    /// No melee or ranged attack matched the requested name.
    #[error("No melee or ranged attack named '{}' found on {}", escape_markup(.name), escape_markup(.actor))]
    AttackNotFound { name: String, actor: String },

    /// A level text did not start with an integer.
    #[error("Cannot roll against non-numeric level '{0}'")]
    NonNumericTarget(String),

    /// A swing or thrust based formula was used on a character without one.
    #[error("{} does not have a {} formula", escape_markup(.actor), .base.label())]
    MissingBaseFormula { actor: String, base: DerivedBase },

    /// Nested dispatch went deeper than the configured limit.
    #[error("Formula nesting exceeded {limit} levels")]
    RecursionLimitExceeded { limit: usize },

    /// An action chain was built with no nodes.
    #[error("Action chain must contain at least one action")]
    EmptyChain,

    /// An action chain's links loop back onto an earlier node.
    #[error("Action chain links back to node {0}")]
    CyclicChain(usize),

    /// An action chain link points at a node that does not exist.
    #[error("Action chain links to missing node {0}")]
    DanglingLink(usize),

    /// A collection key was not a zero-padded decimal index.
    #[error("Invalid collection key: {0}")]
    InvalidKey(String),

    /// A collection key points past the end of the collection.
    #[error("Key {key} is out of range for a collection of {len}")]
    KeyOutOfRange { key: String, len: usize },

    /// A name pattern could not be compiled.
    #[error("Invalid name pattern '{0}'")]
    InvalidPattern(String),

    /// Engine configuration could not be loaded.
    #[error("Invalid configuration: {0}")]
    Config(String),
}
