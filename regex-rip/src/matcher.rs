//! Contains the [`SubsetMatcher`], which runs an [`Automaton`] over an input by tracking
//! every state it could be in at once.
//!
//! This never backtracks, so it takes time linear in the input no matter how ambiguous the
//! automaton is. It is the reference for what a pattern matches, not how fast a
//! backtracking engine would match it.

use crate::automaton::{Automaton, StateId};
use itertools::Itertools;

/// A matcher that is fed its input one symbol at a time.
pub trait RegexMatcher {
    /// The symbols the matcher consumes.
    type Alphabet;

    /// Consumes the specified symbol.
    fn accept(&mut self, inp: Self::Alphabet);

    /// Consumes every symbol of `inp` in order.
    fn accept_many(&mut self, inp: impl IntoIterator<Item = Self::Alphabet>) {
        for i in inp {
            self.accept(i);
        }
    }

    /// Returns true if the input matches, stopping early once no match is possible anymore.
    fn accepts(&mut self, iter: impl IntoIterator<Item = Self::Alphabet>) -> bool {
        for i in iter {
            self.accept(i);
            if self.is_empty() {
                return false;
            }
        }

        self.is_accepting()
    }

    /// Whether the input consumed so far matches.
    fn is_accepting(&self) -> bool;

    /// Whether no continuation of the input consumed so far can match.
    fn is_empty(&self) -> bool;
}

/// Tracks the set of active states of an [`Automaton`].
///
/// Matching follows search semantics: a pattern matches an input when it matches any
/// substring of it. Guards are evaluated against the characters around the current position,
/// so `^`, `$`, `\b` and `\B` hold wherever they would in JavaScript.
#[derive(Debug, Clone)]
pub struct SubsetMatcher<'a> {
    automaton: &'a Automaton,
    active: Vec<bool>,
    /// the last character consumed
    previous: Option<char>,
    /// some prefix of the input already contained a match
    matched: bool,
}

impl Automaton {
    /// A matcher positioned at the start of the input.
    pub fn matcher(&self) -> SubsetMatcher<'_> {
        let mut active = vec![false; self.state_count()];
        active[self.start()] = true;

        SubsetMatcher {
            automaton: self,
            active,
            previous: None,
            matched: false,
        }
    }

    /// Whether `input` matches this automaton.
    pub fn is_match(&self, input: &str) -> bool {
        self.matcher().accepts(input.chars())
    }
}

impl SubsetMatcher<'_> {
    /// The states the matcher is currently in, ascending.
    pub fn active_states(&self) -> Vec<StateId> {
        self.active.iter().positions(|&active| active).collect()
    }

    /// Whether a match may end at the current position, given the character after it.
    fn accepts_here(&self, next: Option<char>) -> bool {
        self.automaton
            .states()
            .iter()
            .zip(&self.active)
            .filter(|&(_, &active)| active)
            .flat_map(|(state, _)| &state.accept)
            .any(|guard| guard.holds(self.previous, next))
    }
}

impl RegexMatcher for SubsetMatcher<'_> {
    type Alphabet = char;

    fn accept(&mut self, inp: char) {
        if self.accepts_here(Some(inp)) {
            self.matched = true;
        }

        let mut next = vec![false; self.active.len()];
        for state in self.active.iter().positions(|&active| active) {
            for edge in &self.automaton.state(state).edges {
                if edge.label.contains(inp as u32) && edge.guard.holds(self.previous, Some(inp)) {
                    next[edge.target] = true;
                }
            }
        }
        self.previous = Some(inp);

        // an unanchored match may begin at every position
        if !self.automaton.is_anchored_start() {
            next[self.automaton.start()] = true;
        }

        self.active = next;
    }

    fn is_accepting(&self) -> bool {
        self.matched || self.accepts_here(None)
    }

    fn is_empty(&self) -> bool {
        !self.matched && !self.active.contains(&true)
    }
}

#[cfg(test)]
mod tests {
    use crate::{compile, RegexMatcher};

    #[test]
    fn containment() {
        let any = compile(".*").unwrap();
        assert!(any.is_match("a"));
        assert!(any.is_match(""));

        let a = compile("/a/").unwrap();
        assert!(!a.is_match("b"));
        assert!(a.is_match("ba"));
        assert!(a.is_match("bab"));
    }

    #[test]
    fn anchors() {
        let start = compile("^a").unwrap();
        assert!(start.is_match("ab"));
        assert!(!start.is_match("ba"));

        let end = compile("a$").unwrap();
        assert!(end.is_match("ba"));
        assert!(!end.is_match("ab"));

        let both = compile("^a+$").unwrap();
        assert!(both.is_match("aaa"));
        assert!(!both.is_match("aab"));
        assert!(!both.is_match(""));
    }

    #[test]
    fn word_boundaries() {
        let boundary = compile("/\\bm/").unwrap();
        assert!(boundary.is_match("moon about"));
        assert!(boundary.is_match("m"));
        assert!(boundary.is_match("a m"));
        assert!(!boundary.is_match("am"));

        let inside = compile("/\\Ba/").unwrap();
        assert!(!inside.is_match("moon about"));
        assert!(inside.is_match("moon bat"));

        let whole = compile("\\b\\w+\\b").unwrap();
        assert!(whole.is_match("  x "));
        assert!(!whole.is_match(" ,; "));
        assert!(compile("\\b").unwrap().is_match("x"));
        assert!(!compile("\\b").unwrap().is_match(""));
        assert!(compile("\\B").unwrap().is_match(""));
    }

    #[test]
    fn anchors_inside_the_pattern() {
        assert!(!compile("a^b").unwrap().is_match("ab"));
        assert!(!compile("x|^b").unwrap().is_match("ab"));
        assert!(compile("x|^b").unwrap().is_match("bx"));
        assert!(compile("x|^b").unwrap().is_match("ax"));
        assert!(!compile("a$|b").unwrap().is_match("ax"));
        assert!(compile("a$|b").unwrap().is_match("xa"));
        assert!(!compile("(a$)b").unwrap().is_match("ab"));
        assert!(compile("(^a|b)c").unwrap().is_match("ac"));
        assert!(!compile("(^a|b)c").unwrap().is_match("xac"));
    }

    #[test]
    fn bounded_repetition() {
        let bounded = compile("a{3,10}").unwrap();
        assert!(!bounded.is_match("aa"));
        assert!(bounded.is_match("aaa"));
        assert!(bounded.is_match(&"a".repeat(12)));

        let exact = compile("^a{3,10}$").unwrap();
        assert!(exact.is_match(&"a".repeat(10)));
        assert!(!exact.is_match(&"a".repeat(11)));
    }

    #[test]
    fn early_exit() {
        let automaton = compile("^ab").unwrap();
        let mut matcher = automaton.matcher();
        matcher.accept('b');
        assert!(matcher.is_empty());
        assert_eq!(matcher.active_states(), Vec::<usize>::new());

        let mut matcher = automaton.matcher();
        matcher.accept_many("ab".chars());
        assert!(matcher.is_accepting());
        matcher.accept('c');
        // the match is already behind us
        assert!(!matcher.is_empty());
        assert!(matcher.is_accepting());
    }
}
