//! Zero-width conditions on the position between two characters.

use itertools::Itertools;
use regex_rip_syntax::{Assertion, RangeSet};
use std::fmt::{Display, Formatter};

const ASSERTIONS: [(Assertion, &str); 4] = [
    (Assertion::Start, "^"),
    (Assertion::End, "$"),
    (Assertion::WordBoundary, "\\b"),
    (Assertion::NotWordBoundary, "\\B"),
];

/// A conjunction of [`Assertion`]s that must hold where a transition is taken or a match
/// ends.
///
/// Guards are evaluated between the previous and the next character of the input, either of
/// which is missing at the ends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Guard {
    bits: u8,
}

fn bit(assertion: Assertion) -> u8 {
    match assertion {
        Assertion::Start => 1,
        Assertion::End => 2,
        Assertion::WordBoundary => 4,
        Assertion::NotWordBoundary => 8,
    }
}

/// Whether `c` is a word character for `\b`, `\B` and `\w`.
pub fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// `Some(true)` when every code point of `label` is a word character, `Some(false)` when none
/// is, `None` when it contains both kinds.
pub(crate) fn word_kind(label: &RangeSet) -> Option<bool> {
    let word = RangeSet::word();
    if label.intersect(&word) == *label {
        Some(true)
    } else if !label.overlaps(&word) {
        Some(false)
    } else {
        None
    }
}

impl Guard {
    /// The guard without conditions.
    pub const ALWAYS: Guard = Guard { bits: 0 };

    /// Both guards at once.
    pub fn and(self, other: Guard) -> Guard {
        Guard {
            bits: self.bits | other.bits,
        }
    }

    /// Whether this guard holds everywhere.
    pub fn is_always(self) -> bool {
        self.bits == 0
    }

    /// Whether `assertion` is one of the conditions of this guard.
    pub fn requires(self, assertion: Assertion) -> bool {
        self.bits & bit(assertion) != 0
    }

    /// This guard with `assertion` dropped from its conditions.
    pub fn without(self, assertion: Assertion) -> Guard {
        Guard {
            bits: self.bits & !bit(assertion),
        }
    }

    /// Whether some position of some input satisfies this guard.
    pub fn is_satisfiable(self) -> bool {
        !(self.requires(Assertion::WordBoundary) && self.requires(Assertion::NotWordBoundary))
    }

    /// Evaluates the guard between `previous` and `next`.
    pub fn holds(self, previous: Option<char>, next: Option<char>) -> bool {
        let boundary =
            previous.is_some_and(is_word_char) != next.is_some_and(is_word_char);

        ASSERTIONS
            .iter()
            .filter(|(assertion, _)| self.requires(*assertion))
            .all(|(assertion, _)| match assertion {
                Assertion::Start => previous.is_none(),
                Assertion::End => next.is_none(),
                Assertion::WordBoundary => boundary,
                Assertion::NotWordBoundary => !boundary,
            })
    }
}

impl From<Assertion> for Guard {
    fn from(assertion: Assertion) -> Self {
        Guard {
            bits: bit(assertion),
        }
    }
}

impl Display for Guard {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let conditions = ASSERTIONS
            .iter()
            .filter(|(assertion, _)| self.requires(*assertion))
            .map(|(_, symbol)| symbol)
            .join("");
        write!(f, "{conditions}")
    }
}

/// Drops unsatisfiable guards and duplicates. A list that contains [`Guard::ALWAYS`]
/// collapses to just that.
pub(crate) fn normalize(guards: impl IntoIterator<Item = Guard>) -> Vec<Guard> {
    let guards: Vec<Guard> = guards
        .into_iter()
        .filter(|g| g.is_satisfiable())
        .unique()
        .collect();

    if guards.iter().any(|g| g.is_always()) {
        vec![Guard::ALWAYS]
    } else {
        guards
    }
}
