#![warn(missing_docs)]
#![doc = include_str!("../README.md")]
//! ## This Documentation
//!
//! * [`compile`] and [`compile_with`] turn a pattern into an [`Automaton`]
//! * [`Automaton::is_match`] and [`SubsetMatcher`] run it
//! * [`Automaton::analyze_pumpability`] looks for inputs that make a backtracking matcher blow up
//! * [`regex_rip_syntax`] (re-exported here) parses patterns and does character set arithmetic
#![cfg_attr(docsrs, feature(doc_auto_cfg, doc_cfg))]

use thiserror::Error;

pub mod analyze;
mod automaton;
mod build;
mod guard;
mod matcher;

#[cfg(feature = "dot")]
mod render;

pub use regex_rip_syntax::*;

pub use analyze::{AnalysisOptions, Pumpability, Witness};
pub use automaton::{Automaton, Edge, State, StateId};
pub use build::{build, CompileOptions};
pub use guard::{is_word_char, Guard};
pub use matcher::{RegexMatcher, SubsetMatcher};

/// Why a pattern could not be turned into an [`Automaton`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CompileError {
    /// The pattern uses syntax that is unsupported or malformed.
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),
    /// Unrolling bounded repetition needs more states than allowed.
    #[error("pattern needs more than {limit} states")]
    TooManyStates {
        /// The [`max_states`](CompileOptions::max_states) that was exceeded.
        limit: usize,
    },
    /// Unrolling bounded repetition of a nullable body needs more edges than allowed.
    #[error("pattern needs more than {limit} edges")]
    TooManyEdges {
        /// The [`max_edges`](CompileOptions::max_edges) that was exceeded.
        limit: usize,
    },
}

/// Parses `pattern` and builds its automaton with the default [`CompileOptions`].
///
/// ```rust
/// use regex_rip::*;
///
/// let automaton = compile("/(a|b)*c/").unwrap();
/// assert!(automaton.is_match("abbac"));
/// assert!(!automaton.is_match("abba"));
///
/// assert!(matches!(
///     compile("(?=a)"),
///     Err(CompileError::Parse(ParseError { kind: ParseErrorKind::UnsupportedGroup, .. }))
/// ));
/// ```
pub fn compile(pattern: impl AsRef<str>) -> Result<Automaton, CompileError> {
    compile_with(pattern, &CompileOptions::default())
}

/// Like [`compile`], with explicit limits.
pub fn compile_with(pattern: impl AsRef<str>, options: &CompileOptions) -> Result<Automaton, CompileError> {
    let pattern = pattern.as_ref();
    let node = parse_pattern(pattern)?;
    log::debug!("parsed {pattern:?}");
    build(&node, options)
}
