use crate::automaton::{Automaton, Edge, State, StateId};
use crate::guard::{normalize, word_kind, Guard};
use crate::CompileError;
use itertools::Itertools;
use regex_rip_syntax::{Assertion, Node, RangeSet};
use std::collections::VecDeque;

/// Limits applied while turning a pattern into an [`Automaton`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompileOptions {
    /// The most states an automaton may have, the start state included.
    ///
    /// Bounded repetition is unrolled into one copy per iteration, so `a{1000}{1000}`
    /// needs a million states. Exceeding the limit fails with
    /// [`CompileError::TooManyStates`].
    pub max_states: usize,
    /// The most edges the builder may create.
    ///
    /// Unrolling a nullable body connects every copy to all copies after it, so
    /// `(?:a?){n}` needs about `n * n / 2` edges. Exceeding the limit fails with
    /// [`CompileError::TooManyEdges`].
    pub max_edges: usize,
}

impl CompileOptions {
    /// Sets [`max_states`](CompileOptions::max_states).
    pub fn with_max_states(mut self, max_states: usize) -> Self {
        self.max_states = max_states;
        self
    }

    /// Sets [`max_edges`](CompileOptions::max_edges).
    pub fn with_max_edges(mut self, max_edges: usize) -> Self {
        self.max_edges = max_edges;
        self
    }
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            max_states: 10_000,
            max_edges: 100_000,
        }
    }
}

/// The positions a sub-pattern can start and end in, each with the assertions that must hold
/// right before (entries) or right after (exits) it.
///
/// `empty` holds one guard per way the sub-pattern can match the empty string, so the
/// sub-pattern is nullable when it is not empty.
#[derive(Debug, Clone, Default)]
struct Fragment {
    entries: Vec<(StateId, Guard)>,
    exits: Vec<(StateId, Guard)>,
    empty: Vec<Guard>,
}

impl Fragment {
    fn epsilon() -> Self {
        Self::zero_width(Guard::ALWAYS)
    }

    fn zero_width(guard: Guard) -> Self {
        Self {
            empty: vec![guard],
            ..Default::default()
        }
    }
}

/// Drops positions whose guard can never hold, and duplicates.
fn dedup_positions(list: impl IntoIterator<Item = (StateId, Guard)>) -> Vec<(StateId, Guard)> {
    list.into_iter()
        .filter(|(_, g)| g.is_satisfiable())
        .unique()
        .collect()
}

/// Builds a position automaton: state 0 is the start, every other state is one
/// occurrence of a character class in the pattern, and an edge into a state is labelled
/// with (a subset of) that state's class.
struct AutomatonBuilder<'o> {
    options: &'o CompileOptions,
    /// the class consumed when entering each state
    labels: Vec<RangeSet>,
    /// targets of the edges leaving each state, in construction order
    follow: Vec<Vec<(StateId, Guard)>>,
    edges: usize,
}

impl<'o> AutomatonBuilder<'o> {
    fn new(options: &'o CompileOptions) -> Self {
        Self {
            options,
            labels: vec![RangeSet::empty()],
            follow: vec![Vec::new()],
            edges: 0,
        }
    }

    fn new_state(&mut self, label: RangeSet) -> Result<StateId, CompileError> {
        if self.labels.len() >= self.options.max_states {
            return Err(CompileError::TooManyStates {
                limit: self.options.max_states,
            });
        }

        self.labels.push(label);
        self.follow.push(Vec::new());
        Ok(self.labels.len() - 1)
    }

    fn connect(
        &mut self,
        from: &[(StateId, Guard)],
        to: &[(StateId, Guard)],
    ) -> Result<(), CompileError> {
        self.edges = self.edges.saturating_add(from.len().saturating_mul(to.len()));
        if self.edges > self.options.max_edges {
            return Err(CompileError::TooManyEdges {
                limit: self.options.max_edges,
            });
        }

        for &(source, exit) in from {
            let targets = to
                .iter()
                .map(|&(target, entry)| (target, exit.and(entry)))
                .filter(|(_, g)| g.is_satisfiable());
            self.follow[source].extend(targets);
        }
        Ok(())
    }

    fn fragment(&mut self, node: &Node) -> Result<Fragment, CompileError> {
        Ok(match node {
            Node::Empty => Fragment::epsilon(),
            Node::Assertion(assertion) => Fragment::zero_width(Guard::from(*assertion)),
            Node::Literal(_) | Node::Class(_) => {
                let label = node.label().unwrap_or_default();
                self.symbol(label)?
            }
            Node::Concat(items) => {
                let mut result = Fragment::epsilon();
                for item in items {
                    let next = self.fragment(item)?;
                    result = self.concat(result, next)?;
                }
                result
            }
            Node::Alternation(alternatives) => {
                let mut result = Fragment::default();
                for alternative in alternatives {
                    let next = self.fragment(alternative)?;
                    result.entries.extend(next.entries);
                    result.exits.extend(next.exits);
                    result.empty.extend(next.empty);
                }
                Fragment {
                    entries: dedup_positions(result.entries),
                    exits: dedup_positions(result.exits),
                    empty: normalize(result.empty),
                }
            }
            Node::Star(inner) => {
                let inner = self.fragment(inner)?;
                self.star(inner)?
            }
            Node::Plus(inner) => {
                let inner = self.fragment(inner)?;
                self.plus(inner)?
            }
            Node::Optional(inner) => optional(self.fragment(inner)?),
            Node::Repeat { node, min, max } => self.repeat(node, *min, *max)?,
        })
    }

    fn symbol(&mut self, label: RangeSet) -> Result<Fragment, CompileError> {
        // surrogates can never be read from a `&str`
        let state = self.new_state(label.intersect(&RangeSet::scalar_values()))?;
        Ok(Fragment {
            entries: vec![(state, Guard::ALWAYS)],
            exits: vec![(state, Guard::ALWAYS)],
            empty: Vec::new(),
        })
    }

    fn concat(&mut self, first: Fragment, second: Fragment) -> Result<Fragment, CompileError> {
        self.connect(&first.exits, &second.entries)?;

        let entries = first.entries.iter().copied().chain(
            second
                .entries
                .iter()
                .cartesian_product(&first.empty)
                .map(|(&(state, entry), skipped)| (state, skipped.and(entry))),
        );
        let exits = first
            .exits
            .iter()
            .cartesian_product(&second.empty)
            .map(|(&(state, exit), skipped)| (state, exit.and(*skipped)))
            .chain(second.exits.iter().copied());
        let empty = first
            .empty
            .iter()
            .cartesian_product(&second.empty)
            .map(|(a, b)| a.and(*b));

        Ok(Fragment {
            entries: dedup_positions(entries),
            exits: dedup_positions(exits),
            empty: normalize(empty),
        })
    }

    fn plus(&mut self, inner: Fragment) -> Result<Fragment, CompileError> {
        self.connect(&inner.exits, &inner.entries)?;
        Ok(inner)
    }

    fn star(&mut self, inner: Fragment) -> Result<Fragment, CompileError> {
        Ok(optional(self.plus(inner)?))
    }

    /// Unrolls `node{min,max}`, building a fresh copy of `node` for every iteration.
    fn repeat(&mut self, node: &Node, min: u32, max: Option<u32>) -> Result<Fragment, CompileError> {
        if !node.has_symbols() {
            // repeating a conjunction of assertions adds nothing to it
            let once = self.fragment(node)?;
            return Ok(if min == 0 { optional(once) } else { once });
        }

        match (min, max) {
            (0, None) => {
                let inner = self.fragment(node)?;
                return self.star(inner);
            }
            (1, None) => {
                let inner = self.fragment(node)?;
                return self.plus(inner);
            }
            (0, Some(1)) => return Ok(optional(self.fragment(node)?)),
            _ => {}
        }

        let mut result = Fragment::epsilon();
        for _ in 0..min {
            let copy = self.fragment(node)?;
            result = self.concat(result, copy)?;
        }

        let tail = match max {
            None => {
                let copy = self.fragment(node)?;
                self.star(copy)?
            }
            Some(max) => {
                // `a{1,3}` is `a(a(a)?)?`, so an optional copy is only reachable after the
                // one before it and unrolling adds no ambiguity
                let mut copies = Vec::new();
                for _ in min..max {
                    copies.push(self.fragment(node)?);
                }
                let mut tail = Fragment::epsilon();
                for copy in copies.into_iter().rev() {
                    tail = optional(self.concat(copy, tail)?);
                }
                tail
            }
        };

        self.concat(result, tail)
    }

    /// What is known about the character consumed on entering `state`: `Some(true)` for a
    /// word character, `Some(false)` for none at all or a non-word character.
    fn previous_kind(&self, state: StateId, guard: Guard) -> Option<bool> {
        if state == 0 {
            guard.requires(Assertion::Start).then_some(false)
        } else {
            word_kind(&self.labels[state])
        }
    }

    /// Resolves the guard of an edge as far as the classes around it allow. Word boundary
    /// conditions whose previous character is known become a narrower label.
    fn narrow_edge(&self, source: StateId, target: StateId, guard: Guard) -> Option<Edge> {
        // every edge consumes a character, and only state 0 is visited before the first one
        if guard.requires(Assertion::End) || (source != 0 && guard.requires(Assertion::Start)) {
            return None;
        }

        let mut label = self.labels[target].clone();
        let mut guard = guard;
        if let Some(previous_is_word) = self.previous_kind(source, guard) {
            for (assertion, next_is_word) in [
                (Assertion::WordBoundary, !previous_is_word),
                (Assertion::NotWordBoundary, previous_is_word),
            ] {
                if guard.requires(assertion) {
                    let kind = if next_is_word {
                        RangeSet::word()
                    } else {
                        RangeSet::word().complement()
                    };
                    label = label.intersect(&kind);
                    guard = guard.without(assertion);
                }
            }
        }

        (!label.is_empty()).then_some(Edge {
            label,
            target,
            guard,
        })
    }

    /// Like [`narrow_edge`](Self::narrow_edge) for a guard under which a match ends in `state`.
    fn narrow_accept(&self, state: StateId, guard: Guard) -> Option<Guard> {
        if state != 0 && guard.requires(Assertion::Start) {
            return None;
        }

        let previous = self.previous_kind(state, guard);
        let next = guard.requires(Assertion::End).then_some(false);
        match (previous, next) {
            (Some(previous), Some(next)) => {
                let boundary = previous != next;
                if (guard.requires(Assertion::WordBoundary) && !boundary)
                    || (guard.requires(Assertion::NotWordBoundary) && boundary)
                {
                    None
                } else {
                    Some(
                        guard
                            .without(Assertion::WordBoundary)
                            .without(Assertion::NotWordBoundary),
                    )
                }
            }
            _ => Some(guard),
        }
    }

    fn compile(mut self, pattern: &Node) -> Result<Automaton, CompileError> {
        let root = self.fragment(pattern)?;
        self.connect(&[(0, Guard::ALWAYS)], &root.entries)?;

        let mut accept = vec![Vec::new(); self.labels.len()];
        accept[0] = root.empty;
        for &(exit, guard) in &root.exits {
            accept[exit].push(guard);
        }
        let accept: Vec<Vec<Guard>> = accept
            .into_iter()
            .enumerate()
            .map(|(state, guards)| {
                normalize(guards.into_iter().filter_map(|g| self.narrow_accept(state, g)))
            })
            .collect();

        // edges into a state whose class is empty, or whose guard can never hold, can never
        // be taken
        let follow: Vec<Vec<Edge>> = self
            .follow
            .iter()
            .enumerate()
            .map(|(source, targets)| {
                targets
                    .iter()
                    .filter_map(|&(target, guard)| self.narrow_edge(source, target, guard))
                    .collect()
            })
            .collect();

        // keep only states reachable from the start, renumbered in construction order
        let mut reachable = vec![false; self.labels.len()];
        reachable[0] = true;
        let mut queue = VecDeque::from([0]);
        while let Some(state) = queue.pop_front() {
            for edge in &follow[state] {
                if !reachable[edge.target] {
                    reachable[edge.target] = true;
                    queue.push_back(edge.target);
                }
            }
        }

        let kept: Vec<StateId> = (0..self.labels.len()).filter(|&s| reachable[s]).collect();
        let mut renumber = vec![None; self.labels.len()];
        for (new, &old) in kept.iter().enumerate() {
            renumber[old] = Some(new);
        }

        let states: Vec<State> = kept
            .iter()
            .map(|&old| State {
                accept: accept[old].clone(),
                edges: follow[old]
                    .iter()
                    .filter_map(|edge| {
                        renumber[edge.target].map(|target| Edge {
                            target,
                            ..edge.clone()
                        })
                    })
                    .collect(),
            })
            .collect();

        log::debug!(
            "built automaton with {} states and {} edges ({} positions unreachable)",
            states.len(),
            states.iter().map(|s| s.edges.len()).sum::<usize>(),
            self.labels.len() - states.len(),
        );

        Ok(Automaton::new(states, 0))
    }
}

fn optional(inner: Fragment) -> Fragment {
    let mut empty = inner.empty;
    empty.push(Guard::ALWAYS);
    Fragment {
        empty: normalize(empty),
        ..inner
    }
}

/// Builds the position automaton of a parsed pattern.
///
/// Fails only when the automaton would need more than
/// [`max_states`](CompileOptions::max_states) states or
/// [`max_edges`](CompileOptions::max_edges) edges.
pub fn build(pattern: &Node, options: &CompileOptions) -> Result<Automaton, CompileError> {
    AutomatonBuilder::new(options).compile(pattern)
}
