use crate::guard::Guard;
use itertools::Itertools;
use regex_rip_syntax::{Assertion, RangeSet};
use std::fmt::Write;

/// Index of a state in its [`Automaton`].
pub type StateId = usize;

/// A consuming transition: any code point in `label` moves to `target`, provided `guard`
/// holds right before that code point.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Edge {
    /// The code points this edge consumes.
    pub label: RangeSet,
    /// The state this edge moves to.
    pub target: StateId,
    /// The assertions crossed on the way to `target`.
    pub guard: Guard,
}

/// A state and its outgoing edges, in construction order.
///
/// Edges of one state may overlap, even when they share a target. That overlap is
/// exactly the choice a backtracking matcher has to retry, so it is never merged away.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct State {
    /// A match may end in this state wherever one of these guards holds.
    pub accept: Vec<Guard>,
    /// Outgoing edges.
    pub edges: Vec<Edge>,
}

impl State {
    /// Whether a match can end in this state at all.
    pub fn is_accepting(&self) -> bool {
        !self.accept.is_empty()
    }
}

/// An epsilon-free automaton with one state per symbol occurrence of its pattern,
/// plus a start state.
///
/// Immutable once built: every edge target exists and every state is reachable from
/// [`start`](Automaton::start).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Automaton {
    states: Vec<State>,
    start: StateId,
    anchored_start: bool,
    anchored_end: bool,
}

impl Automaton {
    pub(crate) fn new(states: Vec<State>, start: StateId) -> Self {
        debug_assert!(start < states.len());
        debug_assert!(states
            .iter()
            .flat_map(|s| &s.edges)
            .all(|e| e.target < states.len()));

        let anchored_start = states[start]
            .edges
            .iter()
            .map(|e| e.guard)
            .chain(states[start].accept.iter().copied())
            .all(|g| g.requires(Assertion::Start));
        let anchored_end = states
            .iter()
            .flat_map(|s| &s.accept)
            .all(|g| g.requires(Assertion::End));

        Self {
            states,
            start,
            anchored_start,
            anchored_end,
        }
    }

    /// The state every run begins in.
    pub fn start(&self) -> StateId {
        self.start
    }

    /// All states, indexed by [`StateId`].
    pub fn states(&self) -> &[State] {
        &self.states
    }

    /// The state with the given id.
    ///
    /// # Panics
    ///
    /// When `id` is not a state of this automaton.
    pub fn state(&self, id: StateId) -> &State {
        &self.states[id]
    }

    /// Number of states, the start state included.
    pub fn state_count(&self) -> usize {
        self.states.len()
    }

    /// Whether matches may only begin at the start of the input, as in `^a|^b`.
    pub fn is_anchored_start(&self) -> bool {
        self.anchored_start
    }

    /// Whether matches may only end at the end of the input, as in `a$|b$`.
    pub fn is_anchored_end(&self) -> bool {
        self.anchored_end
    }

    /// States with two distinct edges that can consume the same character at the same
    /// position.
    ///
    /// These are the places a backtracking matcher has to make a choice it may later retry.
    pub fn decision_points(&self) -> Vec<StateId> {
        self.states
            .iter()
            .enumerate()
            .filter(|(_, state)| {
                state.edges.iter().enumerate().any(|(i, a)| {
                    state.edges[i + 1..].iter().any(|b| {
                        a.label.overlaps(&b.label) && a.guard.and(b.guard).is_satisfiable()
                    })
                })
            })
            .map(|(id, _)| id)
            .collect()
    }

    /// Successor lists, ignoring labels.
    pub(crate) fn successors(&self) -> Vec<Vec<StateId>> {
        self.states
            .iter()
            .map(|s| s.edges.iter().map(|e| e.target).collect())
            .collect()
    }

    /// A deterministic dump of the automaton, one line per state followed by a line per
    /// edge of that state. Guards other than [`Guard::ALWAYS`] are appended after `if`.
    ///
    /// ```text
    /// 0
    /// 0: a -> 1 if ^
    /// 1 [accepting if $]
    /// ```
    ///
    /// Meant for golden tests; the format is not a stable interface.
    pub fn summarize(&self) -> String {
        let mut out = String::new();
        for (id, state) in self.states.iter().enumerate() {
            // writing to a String cannot fail
            let _ = match state.accept.as_slice() {
                [] => writeln!(out, "{id}"),
                [g] if g.is_always() => writeln!(out, "{id} [accepting]"),
                guards => writeln!(out, "{id} [accepting if {}]", guards.iter().join(" | ")),
            };
            for edge in &state.edges {
                let _ = if edge.guard.is_always() {
                    writeln!(out, "{id}: {} -> {}", edge.label, edge.target)
                } else {
                    writeln!(out, "{id}: {} -> {} if {}", edge.label, edge.target, edge.guard)
                };
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use crate::compile;

    #[test]
    fn decision_points() {
        assert_eq!(compile("ab").unwrap().decision_points(), Vec::<usize>::new());
        assert_eq!(compile("a|b").unwrap().decision_points(), Vec::<usize>::new());
        assert_eq!(compile("a|a").unwrap().decision_points(), vec![0]);
        assert_eq!(compile("\\w*1").unwrap().decision_points(), vec![0, 1]);
        // two loops close over the same position
        assert_eq!(compile("(a*)*").unwrap().decision_points(), vec![1]);
        // the two edges out of `.` are never both enabled
        assert_eq!(compile(".(?:\\ba|\\Ba)").unwrap().decision_points(), Vec::<usize>::new());
    }

    #[test]
    fn derived_anchors() {
        let both = compile("^a|^b").unwrap();
        assert!(both.is_anchored_start());
        assert!(!both.is_anchored_end());

        let one = compile("^a|b").unwrap();
        assert!(!one.is_anchored_start());

        let end = compile("a$|(b$)").unwrap();
        assert!(end.is_anchored_end());
    }

    #[test]
    fn successors() {
        let automaton = compile("ab|c").unwrap();
        assert_eq!(automaton.successors(), vec![vec![1, 3], vec![2], vec![], vec![]]);
    }
}
