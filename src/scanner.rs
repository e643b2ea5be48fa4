//! Bracket scanning and span rendering.
//!
//! The scanner walks free text looking for top-level `[...]` spans. Each
//! span body goes to the formula parser; recognised formulas are replaced
//! by a marked-up span that embeds the parsed chain as JSON, so a later
//! click can re-dispatch it without parsing again. Anything the parser
//! rejects is put back exactly as written.

use crate::action::ActionChain;
use crate::config::EngineConfig;
use crate::error::escape_markup;
use crate::parser::FormulaParser;

const DATA_ATTRIBUTE: &str = "data-action='";

/// Replaces bracketed formulas in text with rendered spans.
///
/// # Examples
///
/// ```rust
/// use otf_engine::{BasicParser, BracketScanner, EngineConfig};
///
/// let config = EngineConfig::default();
/// let scanner = BracketScanner::new(&BasicParser, &config);
///
/// let html = scanner.render("Roll [3d6+2] or [nothing here]");
/// assert!(html.starts_with("Roll <span class='otf-link'"));
/// assert!(html.ends_with(" or [nothing here]"));
/// ```
pub struct BracketScanner<'a> {
    parser: &'a dyn FormulaParser,
    config: &'a EngineConfig,
}

impl<'a> BracketScanner<'a> {
    pub fn new(parser: &'a dyn FormulaParser, config: &'a EngineConfig) -> Self {
        Self { parser, config }
    }

    /// Render every top-level bracketed formula in `text`.
    ///
    /// Depth counts every `[` and every `]`; only a `]` that brings depth
    /// back to zero closes a span, so nested brackets stay part of the
    /// body. An unclosed span is emitted verbatim.
    pub fn render(&self, text: &str) -> String {
        let mut out = String::with_capacity(text.len());
        let mut depth: i32 = 0;
        let mut start: Option<usize> = None;
        let mut emitted = 0;

        for (i, ch) in text.char_indices() {
            match ch {
                '[' => {
                    if depth == 0 {
                        start = Some(i + 1);
                    }
                    depth += 1;
                }
                ']' => {
                    depth -= 1;
                    if depth == 0 {
                        if let Some(body_start) = start.take() {
                            out.push_str(&text[emitted..body_start - 1]);
                            out.push_str(&self.render_span(&text[body_start..i]));
                            emitted = i + 1;
                        }
                    }
                }
                _ => {}
            }
        }
        out.push_str(&text[emitted..]);
        out
    }

    /// Render one bracket body, or put it back in brackets if it does not
    /// parse.
    pub fn render_span(&self, body: &str) -> String {
        let Some(chain) = self.parser.parse(body) else {
            tracing::debug!(body, "bracket body is not a formula");
            return format!("[{}]", body);
        };
        match serde_json::to_string(&chain) {
            Ok(json) => {
                tracing::debug!(body, nodes = chain.len(), "rendering formula span");
                format!(
                    "<span class='{}' {}{}'>{}</span>",
                    escape_markup(&self.config.span_class),
                    DATA_ATTRIBUTE,
                    escape_markup(&json),
                    escape_markup(body.trim())
                )
            }
            Err(e) => {
                tracing::warn!(body, error = %e, "could not encode formula");
                format!("[{}]", body)
            }
        }
    }
}

/// Recover the chain embedded in a rendered span.
///
/// # Examples
///
/// ```rust
/// use otf_engine::{BasicParser, BracketScanner, EngineConfig};
/// use otf_engine::scanner::decode_span_action;
///
/// let config = EngineConfig::default();
/// let html = BracketScanner::new(&BasicParser, &config).render("[IQ-2]");
/// let chain = decode_span_action(&html).unwrap();
/// assert_eq!(chain.head().modifier, Some(-2));
/// ```
pub fn decode_span_action(markup: &str) -> Option<ActionChain> {
    let from = markup.find(DATA_ATTRIBUTE)? + DATA_ATTRIBUTE.len();
    let len = markup[from..].find('\'')?;
    let json = unescape_markup(&markup[from..from + len]);
    serde_json::from_str(&json).ok()
}

fn unescape_markup(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}
