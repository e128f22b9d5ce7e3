use super::{Budget, Exhausted};
use crate::automaton::{Automaton, StateId};
use regex_rip_syntax::RangeSet;
use std::collections::{HashMap, VecDeque};

/// A step both runs of a [`PairGraph`] take on the same character.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct PairTransition {
    /// The characters both component edges accept.
    pub label: RangeSet,
    pub target: usize,
    /// The two runs take different edges, so from here on they are different paths.
    pub diverges: bool,
}

/// The reachable part of the product of an automaton with itself.
///
/// Node `(p, q)` means one run of the automaton is in `p` while another run on the same
/// input is in `q`. Nodes are numbered in breadth-first order from `(start, start)`.
#[derive(Debug, Clone)]
pub(crate) struct PairGraph {
    pub pairs: Vec<(StateId, StateId)>,
    pub transitions: Vec<Vec<PairTransition>>,
    index: HashMap<(StateId, StateId), usize>,
}

impl PairGraph {
    pub(crate) fn explore(automaton: &Automaton, budget: &mut Budget) -> Result<Self, Exhausted> {
        let mut graph = Self {
            pairs: Vec::new(),
            transitions: Vec::new(),
            index: HashMap::new(),
        };
        graph.insert((automaton.start(), automaton.start()), budget)?;

        while graph.transitions.len() < graph.pairs.len() {
            let (p, q) = graph.pairs[graph.transitions.len()];

            let mut transitions = Vec::new();
            for (i, left) in automaton.state(p).edges.iter().enumerate() {
                for (j, right) in automaton.state(q).edges.iter().enumerate() {
                    let label = left.label.intersect(&right.label);
                    if label.is_empty() || !left.guard.and(right.guard).is_satisfiable() {
                        continue;
                    }

                    let target = graph.insert((left.target, right.target), budget)?;
                    transitions.push(PairTransition {
                        label,
                        target,
                        diverges: p != q || i != j,
                    });
                }
            }
            graph.transitions.push(transitions);
        }

        Ok(graph)
    }

    fn insert(&mut self, pair: (StateId, StateId), budget: &mut Budget) -> Result<usize, Exhausted> {
        if let Some(&id) = self.index.get(&pair) {
            return Ok(id);
        }

        budget.visit()?;
        let id = self.pairs.len();
        self.pairs.push(pair);
        self.index.insert(pair, id);
        Ok(id)
    }

    pub(crate) fn get(&self, pair: (StateId, StateId)) -> Option<usize> {
        self.index.get(&pair).copied()
    }

    pub(crate) fn len(&self) -> usize {
        self.pairs.len()
    }

    /// Per node: whether it can reach a node where either run is in an accepting state.
    pub(crate) fn co_live(&self, automaton: &Automaton) -> Vec<bool> {
        let mut reverse = vec![Vec::new(); self.len()];
        for (source, transitions) in self.transitions.iter().enumerate() {
            for transition in transitions {
                reverse[transition.target].push(source);
            }
        }

        let mut co_live: Vec<bool> = self
            .pairs
            .iter()
            .map(|&(p, q)| automaton.state(p).is_accepting() || automaton.state(q).is_accepting())
            .collect();
        let mut queue: VecDeque<usize> = (0..self.len()).filter(|&node| co_live[node]).collect();
        while let Some(node) = queue.pop_front() {
            for &source in &reverse[node] {
                if !co_live[source] {
                    co_live[source] = true;
                    queue.push_back(source);
                }
            }
        }

        co_live
    }
}

/// The shortest word that moves three runs from `from` to `to` simultaneously, searching the
/// triple product breadth-first.
pub(crate) fn connecting_word(
    automaton: &Automaton,
    from: [StateId; 3],
    to: [StateId; 3],
    budget: &mut Budget,
) -> Result<Option<String>, Exhausted> {
    let mut parent: HashMap<[StateId; 3], Option<([StateId; 3], char)>> = HashMap::new();
    let mut queue = VecDeque::new();

    budget.visit()?;
    parent.insert(from, None);
    queue.push_back(from);

    while let Some(node) = queue.pop_front() {
        let [x, y, z] = node;
        for first in &automaton.state(x).edges {
            for second in &automaton.state(y).edges {
                let both = first.label.intersect(&second.label);
                let guard = first.guard.and(second.guard);
                if both.is_empty() || !guard.is_satisfiable() {
                    continue;
                }

                for third in &automaton.state(z).edges {
                    let next = [first.target, second.target, third.target];
                    if parent.contains_key(&next) || !guard.and(third.guard).is_satisfiable() {
                        continue;
                    }
                    let Some(c) = both.intersect(&third.label).pick_char() else {
                        continue;
                    };

                    budget.visit()?;
                    parent.insert(next, Some((node, c)));
                    if next == to {
                        return Ok(Some(path_to(&parent, to)));
                    }
                    queue.push_back(next);
                }
            }
        }
    }

    Ok(None)
}

fn path_to(parent: &HashMap<[StateId; 3], Option<([StateId; 3], char)>>, to: [StateId; 3]) -> String {
    let mut word = Vec::new();
    let mut current = to;
    while let Some(&Some((previous, c))) = parent.get(&current) {
        word.push(c);
        current = previous;
    }
    word.iter().rev().collect()
}
