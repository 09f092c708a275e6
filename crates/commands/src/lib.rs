//! Outfit commands — the micro-language the model emits to edit outfits.
//!
//! The model is asked to answer with calls like
//! `outfit-system_wear_headwear("red cap")`. This crate finds those calls in
//! free-form text, parses them strictly, and scores how safe each one is to
//! apply. It never interprets prose.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────┐   raw    ┌────────────┐  Command  ┌────────────┐
//! │  Scanner   │─────────▶│  Parser    │──────────▶│ Confidence │
//! │ (extract)  │ substr.  │  (strict)  │           │  scoring   │
//! └────────────┘          └────────────┘           └────────────┘
//! ```
//!
//! The scanner is a small explicit-state machine rather than a regex: a
//! rejected candidate resumes one character past its start, and quoted spans
//! are opaque to paren counting, so unbalanced or adversarial input never
//! backtracks.
//!
//! # Grammar
//!
//! ```text
//! command  = "outfit-system_" action "_" slot "(" [ string ] ")"
//! action   = "wear" | "remove" | "change" | "replace" | "unequip"
//! slot     = 1*( ALPHA / DIGIT / "_" / "-" )
//! string   = '"' *( escaped / not-quote ) '"'
//! escaped  = "\" any
//! ```

mod confidence;
mod model;
mod parser;
mod scanner;
mod strip;

pub use confidence::{score, Confidence, MIN_CONFIDENCE};
pub use model::{Action, Command};
pub use parser::parse_command;
pub use scanner::{extract_commands, NAMESPACE};
pub use strip::strip_macros;

/// Errors from the strict command parser.
///
/// These never escape the extraction stage as failures of a whole batch; a
/// command that fails to parse is dropped and its siblings still apply.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("command does not start with '{NAMESPACE}'")]
    MissingNamespace,

    #[error("unknown action '{0}'")]
    UnknownAction(String),

    #[error("invalid slot token '{0}'")]
    InvalidSlotToken(String),

    #[error("missing parenthesized argument")]
    MissingArguments,

    #[error("argument must be empty or a double-quoted string, got '{0}'")]
    UnquotedArgument(String),

    #[error("unterminated string argument")]
    UnterminatedString,

    #[error("unexpected input after argument: '{0}'")]
    TrailingInput(String),
}
