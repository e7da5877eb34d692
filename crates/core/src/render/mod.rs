//! GraphViz rendering of the serialization graph.
//!
//! Output is byte-deterministic: nodes and edges are emitted in ascending
//! order, so the same history always renders the same document.

use alloc::string::String;
use alloc::vec::Vec;
use core::fmt::{Display, Write};
use core::hash::Hash;

use crate::anomaly::dsg::Dsg;
use crate::history::types::TransactionId;
use crate::history::History;

/// Renders the full graph as a DOT document.
///
/// Nodes listed in `highlight` (typically the transactions of a reported
/// cycle) are filled; every edge is labelled with its dependency kinds and
/// the operation pair justifying each kind.
#[must_use]
pub fn render_dot<K, V>(
    history: &History<K, V>,
    dsg: &Dsg,
    highlight: Option<&[TransactionId]>,
) -> String
where
    K: Eq + Hash + Clone + Display,
    V: Display,
{
    let highlighted = |txn: TransactionId| {
        highlight.is_some_and(|nodes| nodes.contains(&txn))
    };

    let mut out = String::new();
    let _ = writeln!(out, "digraph dsg {{");
    let _ = writeln!(out, "  rankdir=LR;");
    let _ = writeln!(out, "  node [shape=box];");

    for txn in dsg.graph.vertices() {
        if highlighted(txn) {
            let _ = writeln!(out, "  \"{txn}\" [style=filled, fillcolor=grey85];");
        } else {
            let _ = writeln!(out, "  \"{txn}\";");
        }
    }

    for ((source, target), info) in &dsg.edges {
        let mut label = String::new();
        for (i, witness) in info.witnesses.iter().enumerate() {
            if i > 0 {
                label.push_str("\\n");
            }
            let _ = write!(label, "{} {}", witness.kind, witness.source);
            if let Some(op) = history.operation(witness.source) {
                let _ = write!(label, "({op})");
            }
            let _ = write!(label, " -> {}", witness.target);
            if let Some(op) = history.operation(witness.target) {
                let _ = write!(label, "({op})");
            }
        }
        let _ = writeln!(out, "  \"{source}\" -> \"{target}\" [label=\"{label}\"];");
    }

    let _ = writeln!(out, "}}");
    out
}

/// Renders a single cycle: only its nodes and the edges between consecutive
/// members.
#[must_use]
pub fn cycle_dot<K, V>(
    history: &History<K, V>,
    dsg: &Dsg,
    cycle: &[TransactionId],
) -> String
where
    K: Eq + Hash + Clone + Display,
    V: Display,
{
    let mut sub = Dsg {
        graph: crate::graph::digraph::DiGraph::default(),
        edges: dsg
            .edges
            .iter()
            .filter(|((source, target), _)| {
                cycle.iter().enumerate().any(|(i, txn)| {
                    *txn == *source && cycle[(i + 1) % cycle.len()] == *target
                })
            })
            .map(|(pair, info)| (*pair, info.clone()))
            .collect(),
    };
    for txn in cycle {
        sub.graph.add_vertex(*txn);
    }
    let pairs: Vec<(TransactionId, TransactionId)> = sub.edges.keys().copied().collect();
    for (source, target) in pairs {
        sub.graph.add_edge(source, target);
    }
    render_dot(history, &sub, Some(cycle))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anomaly::resolve::resolve;
    use crate::anomaly::{dsg, IsolationLevel};
    use crate::history::types::{Operation, Transaction};

    fn lost_update_history() -> History<&'static str, u64> {
        History::new(
            vec![("x", 0)],
            vec![
                Transaction::committed(
                    TransactionId(1),
                    vec![Operation::read("x", 0), Operation::write("x", 1)],
                ),
                Transaction::committed(
                    TransactionId(2),
                    vec![Operation::read("x", 0), Operation::write("x", 2)],
                ),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_render_is_deterministic() {
        let history = lost_update_history();
        let build = dsg::build(&history, &resolve(&history));
        let first = render_dot(&history, &build.dsg, None);
        let second = render_dot(&history, &build.dsg, None);
        assert_eq!(first, second);
        assert!(first.starts_with("digraph dsg {"));
        assert!(first.contains("\"T1\" -> \"T2\""));
    }

    #[test]
    fn test_highlight_marks_cycle_nodes() {
        let history = lost_update_history();
        let report = crate::check(&history, IsolationLevel::Serializable, None).unwrap();
        assert!(!report.anomalies.is_empty());
        let out = render_dot(
            &history,
            &report.dsg,
            Some(&[TransactionId(1), TransactionId(2)]),
        );
        assert!(out.contains("\"T1\" [style=filled"));
        assert!(out.contains("\"T2\" [style=filled"));
    }

    #[test]
    fn test_cycle_dot_restricts_to_cycle_edges() {
        let history = lost_update_history();
        let report = crate::check(&history, IsolationLevel::Serializable, None).unwrap();
        let out = cycle_dot(&history, &report.dsg, &[TransactionId(1), TransactionId(2)]);
        assert!(out.contains("\"T1\" -> \"T2\""));
        assert!(out.contains("\"T2\" -> \"T1\""));
    }
}
