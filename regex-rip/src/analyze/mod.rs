//! Decides whether a backtracking matcher can take super-linear time on an [`Automaton`].
//!
//! A backtracking matcher explores every path through the automaton that is consistent with
//! the input. When some state `r` has two different loops back to itself that read the same
//! word `w`, the input `w^k` has `2^k` paths through `r`: the pattern has *exponential
//! ambiguity*, and is reported as [vulnerable](Witness::vulnerable). When instead two
//! different loops `p` and `q` are connected by `w` such that `p -w-> p`, `p -w-> q` and
//! `q -w-> q`, the number of paths only grows polynomially in `k`. Such patterns are
//! pumpable, but not vulnerable.
//!
//! Both searches run on the product of the automaton with itself, which can be quadratic in
//! its size; [`AnalysisOptions::max_visits`] bounds the work done, and running out of it
//! gives [`Pumpability::Inconclusive`] rather than a guess.

mod product;
mod scc;

use crate::automaton::{Automaton, StateId};
use product::{connecting_word, PairGraph};
use scc::strongly_connected;
use std::collections::VecDeque;

/// Limits applied by [`Automaton::analyze_pumpability_with`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnalysisOptions {
    /// How many product states the analysis may create before giving up.
    pub max_visits: usize,
}

impl AnalysisOptions {
    /// Sets [`max_visits`](AnalysisOptions::max_visits).
    pub fn with_max_visits(mut self, max_visits: usize) -> Self {
        self.max_visits = max_visits;
        self
    }
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            max_visits: 250_000,
        }
    }
}

/// An input family a backtracking matcher does super-linear work on: `prefix`, then `pump`
/// any number of times, then `suffix`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Witness {
    /// Whether the work is exponential in the number of pumps, rather than polynomial.
    pub vulnerable: bool,
    /// Leads from the start to the [`pivot`](Witness::pivot).
    pub prefix: String,
    /// Non-empty, and readable in more than one way starting from the pivot.
    pub pump: String,
    /// Leads from the end of the pumps to an accepting state.
    pub suffix: String,
    /// The state the ambiguous loops go through.
    pub pivot: StateId,
}

impl Witness {
    /// The input with `pump` repeated `repetitions` times.
    pub fn attack(&self, repetitions: usize) -> String {
        let mut input = String::with_capacity(
            self.prefix.len() + self.pump.len() * repetitions + self.suffix.len(),
        );
        input.push_str(&self.prefix);
        for _ in 0..repetitions {
            input.push_str(&self.pump);
        }
        input.push_str(&self.suffix);
        input
    }
}

/// The outcome of [`Automaton::analyze_pumpability`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pumpability {
    /// No input makes backtracking do more than linear work per character.
    NotPumpable,
    /// Some input family makes backtracking do super-linear work.
    Pumpable(Witness),
    /// The search ran out of budget.
    ///
    /// This says nothing about the pattern either way.
    Inconclusive {
        /// Product states created before giving up.
        visited: usize,
    },
}

impl Pumpability {
    /// Whether a witness was found.
    pub fn is_pumpable(&self) -> bool {
        matches!(self, Pumpability::Pumpable(_))
    }

    /// Whether the pattern is pumpable with exponential blow-up.
    pub fn is_vulnerable(&self) -> bool {
        self.witness().is_some_and(|witness| witness.vulnerable)
    }

    /// The witness, when pumpable.
    pub fn witness(&self) -> Option<&Witness> {
        match self {
            Pumpability::Pumpable(witness) => Some(witness),
            _ => None,
        }
    }
}

/// Counts product states created across all searches of one analysis.
#[derive(Debug)]
pub(crate) struct Budget {
    limit: usize,
    visited: usize,
}

/// The [`Budget`] ran out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Exhausted;

impl Budget {
    pub(crate) fn new(limit: usize) -> Self {
        Self { limit, visited: 0 }
    }

    pub(crate) fn visit(&mut self) -> Result<(), Exhausted> {
        self.visited += 1;
        if self.visited > self.limit {
            Err(Exhausted)
        } else {
            Ok(())
        }
    }

    pub(crate) fn visited(&self) -> usize {
        self.visited
    }
}

impl Automaton {
    /// Searches this automaton for ambiguity a backtracking matcher would pay for, with the
    /// default [`AnalysisOptions`].
    ///
    /// The result is deterministic: when several witnesses exist, the one through the lowest
    /// state id is reported.
    pub fn analyze_pumpability(&self) -> Pumpability {
        self.analyze_pumpability_with(&AnalysisOptions::default())
    }

    /// Like [`analyze_pumpability`](Automaton::analyze_pumpability), with explicit limits.
    pub fn analyze_pumpability_with(&self, options: &AnalysisOptions) -> Pumpability {
        // without a choice to retry, backtracking never revisits a position
        if self.decision_points().is_empty() {
            log::info!("no decision points, not pumpable");
            return Pumpability::NotPumpable;
        }

        let mut budget = Budget::new(options.max_visits);
        match find_witness(self, &mut budget) {
            Ok(Some(witness)) => {
                log::info!(
                    "pumpable through state {} (vulnerable: {})",
                    witness.pivot,
                    witness.vulnerable
                );
                Pumpability::Pumpable(witness)
            }
            Ok(None) => {
                log::info!("not pumpable ({} product states)", budget.visited());
                Pumpability::NotPumpable
            }
            Err(Exhausted) => {
                log::warn!(
                    "gave up after creating {} product states",
                    budget.visited()
                );
                Pumpability::Inconclusive {
                    visited: budget.visited(),
                }
            }
        }
    }
}

fn find_witness(automaton: &Automaton, budget: &mut Budget) -> Result<Option<Witness>, Exhausted> {
    let pairs = PairGraph::explore(automaton, budget)?;
    let co_live = pairs.co_live(automaton);
    log::debug!(
        "pair product has {} states, {} of which can still accept",
        pairs.len(),
        co_live.iter().filter(|&&c| c).count()
    );

    if let Some(witness) = find_exponential(automaton, &pairs, &co_live) {
        return Ok(Some(witness));
    }
    find_polynomial(automaton, &pairs, &co_live, budget)
}

/// Looks for a loop of the pair product through some `(r, r)` on which the two runs take
/// different edges at least once.
fn find_exponential(automaton: &Automaton, pairs: &PairGraph, co_live: &[bool]) -> Option<Witness> {
    let successors: Vec<Vec<usize>> = pairs
        .transitions
        .iter()
        .enumerate()
        .map(|(node, transitions)| {
            if !co_live[node] {
                return Vec::new();
            }
            transitions
                .iter()
                .map(|t| t.target)
                .filter(|&target| co_live[target])
                .collect()
        })
        .collect();
    let components = strongly_connected(&successors);

    let mut diverging = vec![false; components.count()];
    for (node, targets) in successors.iter().enumerate() {
        let component = components.of(node);
        for transition in &pairs.transitions[node] {
            if transition.diverges
                && targets.contains(&transition.target)
                && components.of(transition.target) == component
            {
                diverging[component] = true;
            }
        }
    }

    for pivot in 0..automaton.state_count() {
        let Some(root) = pairs.get((pivot, pivot)) else {
            continue;
        };
        let component = components.of(root);
        if !co_live[root] || !diverging[component] {
            continue;
        }

        let within = |node: usize| co_live[node] && components.of(node) == component;
        let Some(pump) = ambiguous_cycle(pairs, root, within) else {
            continue;
        };
        let Some(prefix) = shortest_word(automaton, automaton.start(), |s| s == pivot) else {
            continue;
        };
        let Some(suffix) = shortest_word(automaton, pivot, |s| automaton.state(s).is_accepting()) else {
            continue;
        };

        log::debug!("exponential ambiguity through state {pivot}, pump {pump:?}");
        return Some(Witness {
            vulnerable: true,
            prefix,
            pump,
            suffix,
            pivot,
        });
    }

    None
}

/// The shortest loop from `root` back to itself, staying in `within`, that takes a diverging
/// transition.
fn ambiguous_cycle(pairs: &PairGraph, root: usize, within: impl Fn(usize) -> bool) -> Option<String> {
    let n = pairs.len();

    // forward from the root: how we got to each node
    let mut distance_from = vec![None; n];
    let mut parent: Vec<Option<(usize, usize)>> = vec![None; n];
    distance_from[root] = Some(0);
    let mut queue = VecDeque::from([root]);
    while let Some(node) = queue.pop_front() {
        let distance = distance_from[node].unwrap_or_default();
        for (k, transition) in pairs.transitions[node].iter().enumerate() {
            let target = transition.target;
            if within(target) && distance_from[target].is_none() {
                distance_from[target] = Some(distance + 1);
                parent[target] = Some((node, k));
                queue.push_back(target);
            }
        }
    }

    // backward to the root: which transition brings each node closer
    let mut reverse = vec![Vec::new(); n];
    for (node, transitions) in pairs.transitions.iter().enumerate() {
        if !within(node) {
            continue;
        }
        for (k, transition) in transitions.iter().enumerate() {
            if within(transition.target) {
                reverse[transition.target].push((node, k));
            }
        }
    }
    let mut distance_to = vec![None; n];
    let mut toward: Vec<Option<usize>> = vec![None; n];
    distance_to[root] = Some(0);
    let mut queue = VecDeque::from([root]);
    while let Some(node) = queue.pop_front() {
        let distance = distance_to[node].unwrap_or_default();
        for &(source, k) in &reverse[node] {
            if distance_to[source].is_none() {
                distance_to[source] = Some(distance + 1);
                toward[source] = Some(k);
                queue.push_back(source);
            }
        }
    }

    let mut best: Option<(usize, usize, usize)> = None;
    for node in 0..n {
        let Some(before) = distance_from[node] else {
            continue;
        };
        for (k, transition) in pairs.transitions[node].iter().enumerate() {
            if !transition.diverges || !within(transition.target) {
                continue;
            }
            let Some(after) = distance_to[transition.target] else {
                continue;
            };
            let length = before + 1 + after;
            if best.map_or(true, |(shortest, _, _)| length < shortest) {
                best = Some((length, node, k));
            }
        }
    }
    let (_, node, k) = best?;

    let mut head = Vec::new();
    let mut current = node;
    while let Some((previous, step)) = parent[current] {
        head.push(pairs.transitions[previous][step].label.pick_char()?);
        current = previous;
    }

    let mut word: String = head.into_iter().rev().collect();
    let diverging = &pairs.transitions[node][k];
    word.push(diverging.label.pick_char()?);

    let mut current = diverging.target;
    while current != root {
        let transition = &pairs.transitions[current][toward[current]?];
        word.push(transition.label.pick_char()?);
        current = transition.target;
    }

    Some(word)
}

/// Looks for distinct loops through `p` and `q` and a word `w` with `p -w-> p`, `p -w-> q`
/// and `q -w-> q`. Only worth doing when there is no exponential ambiguity.
fn find_polynomial(
    automaton: &Automaton,
    pairs: &PairGraph,
    co_live: &[bool],
    budget: &mut Budget,
) -> Result<Option<Witness>, Exhausted> {
    let successors = automaton.successors();
    let components = strongly_connected(&successors);
    let cyclic = components.cyclic(&successors);
    let loops = |state: StateId| cyclic[components.of(state)];
    let can_accept = can_accept(automaton);

    for p in (0..automaton.state_count()).filter(|&p| loops(p)) {
        if !pairs.get((p, p)).is_some_and(|node| co_live[node]) {
            continue;
        }

        let reachable = reachable_from(&successors, p);
        for q in 0..automaton.state_count() {
            if components.of(q) == components.of(p)
                || !loops(q)
                || !reachable[q]
                || !can_accept[q]
                || !pairs.get((p, q)).is_some_and(|node| co_live[node])
            {
                continue;
            }

            let Some(pump) = connecting_word(automaton, [p, p, q], [p, q, q], budget)? else {
                continue;
            };
            let Some(prefix) = shortest_word(automaton, automaton.start(), |s| s == p) else {
                continue;
            };
            let Some(suffix) = shortest_word(automaton, q, |s| automaton.state(s).is_accepting()) else {
                continue;
            };

            log::debug!("polynomial ambiguity from state {p} to state {q}, pump {pump:?}");
            return Ok(Some(Witness {
                vulnerable: false,
                prefix,
                pump,
                suffix,
                pivot: p,
            }));
        }
    }

    Ok(None)
}

/// The shortest word leading from `from` to a state satisfying `goal`, taking edges in
/// construction order.
fn shortest_word(automaton: &Automaton, from: StateId, goal: impl Fn(StateId) -> bool) -> Option<String> {
    let mut parent: Vec<Option<(StateId, char)>> = vec![None; automaton.state_count()];
    let mut seen = vec![false; automaton.state_count()];
    seen[from] = true;

    let mut queue = VecDeque::from([from]);
    while let Some(state) = queue.pop_front() {
        if goal(state) {
            let mut word = Vec::new();
            let mut current = state;
            while let Some((previous, c)) = parent[current] {
                word.push(c);
                current = previous;
            }
            return Some(word.into_iter().rev().collect());
        }

        for edge in &automaton.state(state).edges {
            if seen[edge.target] {
                continue;
            }
            if let Some(c) = edge.label.pick_char() {
                seen[edge.target] = true;
                parent[edge.target] = Some((state, c));
                queue.push_back(edge.target);
            }
        }
    }

    None
}

fn reachable_from(successors: &[Vec<StateId>], from: StateId) -> Vec<bool> {
    let mut reachable = vec![false; successors.len()];
    reachable[from] = true;
    let mut queue = VecDeque::from([from]);
    while let Some(state) = queue.pop_front() {
        for &target in &successors[state] {
            if !reachable[target] {
                reachable[target] = true;
                queue.push_back(target);
            }
        }
    }
    reachable
}

/// Per state: whether some accepting state is reachable from it.
fn can_accept(automaton: &Automaton) -> Vec<bool> {
    let mut predecessors = vec![Vec::new(); automaton.state_count()];
    for (state, targets) in automaton.successors().into_iter().enumerate() {
        for target in targets {
            predecessors[target].push(state);
        }
    }

    let accepting: Vec<StateId> = (0..automaton.state_count())
        .filter(|&s| automaton.state(s).is_accepting())
        .collect();
    let mut can_accept = vec![false; automaton.state_count()];
    let mut queue = VecDeque::new();
    for state in accepting {
        can_accept[state] = true;
        queue.push_back(state);
    }
    while let Some(state) = queue.pop_front() {
        for &source in &predecessors[state] {
            if !can_accept[source] {
                can_accept[source] = true;
                queue.push_back(source);
            }
        }
    }
    can_accept
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compile;
    use pretty_assertions::assert_eq;

    #[ctor::ctor]
    fn init() {
        env_logger::init();
    }

    fn witness(pattern: &str) -> Witness {
        match compile(pattern).unwrap().analyze_pumpability() {
            Pumpability::Pumpable(witness) => witness,
            other => panic!("expected {pattern} to be pumpable, got {other:?}"),
        }
    }

    #[test]
    fn nested_star() {
        assert_eq!(
            witness("(a*)*"),
            Witness {
                vulnerable: true,
                prefix: "a".into(),
                pump: "a".into(),
                suffix: "".into(),
                pivot: 1,
            }
        );
    }

    #[test]
    fn nested_plus_needs_suffix() {
        let witness = witness("(a+)+b");
        assert!(witness.vulnerable);
        assert_eq!((witness.prefix.as_str(), witness.pump.as_str()), ("a", "a"));
        assert_eq!(witness.suffix, "b");
    }

    #[test]
    fn adjacent_stars() {
        assert_eq!(
            witness("a*a*"),
            Witness {
                vulnerable: false,
                prefix: "a".into(),
                pump: "a".into(),
                suffix: "".into(),
                pivot: 1,
            }
        );
    }

    #[test]
    fn not_pumpable() {
        for pattern in ["a", "a*b*", "(ab|cd)*", "^[a-z]+$", "a|a"] {
            assert_eq!(
                compile(pattern).unwrap().analyze_pumpability(),
                Pumpability::NotPumpable,
                "{pattern}"
            );
        }
    }

    #[test]
    fn budget_exhaustion() {
        let automaton = compile("(a|a)*").unwrap();
        let options = AnalysisOptions::default().with_max_visits(1);
        assert_eq!(
            automaton.analyze_pumpability_with(&options),
            Pumpability::Inconclusive { visited: 2 }
        );
        assert!(automaton.analyze_pumpability().is_vulnerable());
    }

    #[test]
    fn attack() {
        let witness = Witness {
            vulnerable: true,
            prefix: "<".into(),
            pump: "ab".into(),
            suffix: ">".into(),
            pivot: 0,
        };
        assert_eq!(witness.attack(0), "<>");
        assert_eq!(witness.attack(3), "<ababab>");
    }

    #[test]
    fn shortest_words() {
        let automaton = compile("ab|c").unwrap();
        assert_eq!(shortest_word(&automaton, 0, |s| s == 2), Some("ab".to_string()));
        assert_eq!(
            shortest_word(&automaton, 0, |s| automaton.state(s).is_accepting()),
            Some("c".to_string())
        );
        assert_eq!(shortest_word(&automaton, 2, |s| s == 0), None);
        assert_eq!(can_accept(&automaton), vec![true; 4]);
    }
}
