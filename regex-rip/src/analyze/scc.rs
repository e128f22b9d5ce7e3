const UNVISITED: usize = usize::MAX;

/// The strongly connected components of a graph given as successor lists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Components {
    component: Vec<usize>,
    count: usize,
}

impl Components {
    /// The component a node belongs to.
    pub(crate) fn of(&self, node: usize) -> usize {
        self.component[node]
    }

    pub(crate) fn count(&self) -> usize {
        self.count
    }

    /// Per component: whether it contains a cycle, that is more than one node or a self loop.
    pub(crate) fn cyclic(&self, successors: &[Vec<usize>]) -> Vec<bool> {
        let mut sizes = vec![0usize; self.count];
        for &c in &self.component {
            sizes[c] += 1;
        }

        let mut cyclic: Vec<bool> = sizes.iter().map(|&size| size > 1).collect();
        for (node, targets) in successors.iter().enumerate() {
            if targets.contains(&node) {
                cyclic[self.component[node]] = true;
            }
        }
        cyclic
    }
}

/// Tarjan's algorithm, with an explicit stack so deep graphs can't overflow the call stack.
///
/// Components are numbered in the order they are completed, which is a reverse topological
/// order of the condensed graph.
pub(crate) fn strongly_connected(successors: &[Vec<usize>]) -> Components {
    let n = successors.len();
    let mut index = vec![UNVISITED; n];
    let mut lowlink = vec![0; n];
    let mut on_stack = vec![false; n];
    let mut stack = Vec::new();

    let mut component = vec![UNVISITED; n];
    let mut next_index = 0;
    let mut count = 0;

    // (node, position of the next successor to look at)
    let mut work: Vec<(usize, usize)> = Vec::new();

    for root in 0..n {
        if index[root] != UNVISITED {
            continue;
        }

        work.push((root, 0));
        while let Some((node, position)) = work.pop() {
            if position == 0 {
                index[node] = next_index;
                lowlink[node] = next_index;
                next_index += 1;
                stack.push(node);
                on_stack[node] = true;
            }

            if let Some(&next) = successors[node].get(position) {
                work.push((node, position + 1));
                if index[next] == UNVISITED {
                    work.push((next, 0));
                } else if on_stack[next] {
                    lowlink[node] = lowlink[node].min(index[next]);
                }
                continue;
            }

            if lowlink[node] == index[node] {
                while let Some(member) = stack.pop() {
                    on_stack[member] = false;
                    component[member] = count;
                    if member == node {
                        break;
                    }
                }
                count += 1;
            }

            if let Some(&(parent, _)) = work.last() {
                lowlink[parent] = lowlink[parent].min(lowlink[node]);
            }
        }
    }

    Components { component, count }
}
