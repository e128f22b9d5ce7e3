use crate::automaton::Automaton;
use std::io;
use std::io::Write;

impl Automaton {
    /// Writes this automaton as a Graphviz digraph.
    ///
    /// Accepting states are drawn as double circles and decision points are drawn red. Edges
    /// are labelled like in [`summarize`](Automaton::summarize).
    pub fn render_dot(&self, w: &mut impl Write) -> io::Result<()> {
        let decision_points = self.decision_points();

        writeln!(w, "digraph {{")?;
        writeln!(w, "start [shape=point]")?;
        writeln!(w, "start -> s{}", self.start())?;

        for (src, state) in self.states().iter().enumerate() {
            let mut attrs = String::new();
            if state.is_accepting() {
                attrs.push_str(", shape=doublecircle");
            }
            if decision_points.binary_search(&src).is_ok() {
                attrs.push_str(", color=red");
            }
            writeln!(w, "node[label=\"{src}\"{attrs}] s{src}")?;

            for edge in &state.edges {
                let label = if edge.guard.is_always() {
                    edge.label.to_string()
                } else {
                    format!("{} if {}", edge.label, edge.guard)
                };
                let label = label.replace('\\', "\\\\");
                writeln!(w, "s{src} -> s{} [label=\"{label}\"]", edge.target)?;
            }
        }

        writeln!(w, "}}")?;

        Ok(())
    }
}
