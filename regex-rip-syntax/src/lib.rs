use thiserror::Error;

mod ast;
mod parse;
pub mod ranges;

pub use ast::{Assertion, Node};
pub use ranges::{intersect_ranges, Range, RangeSet};

/// The constructs a pattern can be rejected for.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParseErrorKind {
    /// Lookaround, atomic, conditional, comment or balancing groups.
    #[error("unsupported grouping construct")]
    UnsupportedGroup,
    /// Inline `(?i)` modifiers or flags on a `/.../i` literal.
    #[error("unsupported mode modifier")]
    UnsupportedModifier,
    #[error("unsupported escape sequence")]
    UnsupportedEscape,
    #[error("non-ASCII character in pattern")]
    NonAscii,
    #[error("backreferences are not supported")]
    InvalidBackreference,
    /// A character class that is never closed.
    #[error("incomplete range definition")]
    IncompleteRange,
    /// `[z-a]` or `{3,2}`.
    #[error("range out of order")]
    OutOfOrder,
    #[error("possessive quantifiers are not supported")]
    UnsupportedPossessive,
    #[error("nothing to repeat")]
    NothingToRepeat,
    #[error("unbalanced parenthesis")]
    UnbalancedParenthesis,
    #[error("could not tokenize pattern")]
    CouldNotTokenize,
}

/// A rejected pattern, with the byte offset of the construct that caused it.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[error("{kind} at offset {offset}")]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub offset: usize,
    /// The offending character, when there is a single one to blame.
    pub code_point: Option<u32>,
}

impl ParseError {
    pub fn new(kind: ParseErrorKind, offset: usize) -> Self {
        Self {
            kind,
            offset,
            code_point: None,
        }
    }

    pub fn with_code_point(mut self, code_point: u32) -> Self {
        self.code_point = Some(code_point);
        self
    }
}

/// Parse a pattern, either bare (`a|b`) or as a literal (`/a|b/g`).
pub fn parse_pattern(pattern: impl AsRef<str>) -> Result<Node, ParseError> {
    parse::parse(pattern.as_ref())
}
