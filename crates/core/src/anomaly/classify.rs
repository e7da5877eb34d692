//! Mapping cycles onto named Adya anomalies.

use alloc::vec::Vec;
use core::fmt::{self, Display, Formatter};

use crate::anomaly::dsg::{DepKind, EdgeInfo};

/// Named isolation anomalies.
///
/// `G1a` and `G1b` are non-cyclic findings; the rest classify cycles of the
/// serialization graph by the kinds of edges they contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AnomalyKind {
    /// Write cycle: every edge is a pure write dependency.
    G0,
    /// Aborted read.
    G1a,
    /// Intermediate read.
    G1b,
    /// Dependency cycle of write and read dependencies only.
    G1c,
    /// Cycle with exactly one antidependency edge and nothing else on it.
    GSingle,
    /// Cycle with item antidependencies but no predicate involvement.
    G2Item,
    /// Cycle involving a predicate antidependency.
    G2,
}

impl AnomalyKind {
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::G0 => "G0",
            Self::G1a => "G1a",
            Self::G1b => "G1b",
            Self::G1c => "G1c",
            Self::GSingle => "G-single",
            Self::G2Item => "G2-item",
            Self::G2 => "G2",
        }
    }
}

impl Display for AnomalyKind {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Classifies a cycle by its edge labels; the first matching name wins, so
/// every cycle gets its single most specific name.
///
/// The predicates, in order:
///
/// | name     | condition                                                      |
/// |----------|----------------------------------------------------------------|
/// | G0       | every label is `{WW}`                                          |
/// | G1c      | labels within `{WW, WR}`, at least one WR                      |
/// | G-single | exactly one edge carries RW/PRW, and nothing else on that edge |
/// | G2-item  | labels within `{WW, WR, RW}`, at least one RW                  |
/// | G2       | at least one PRW                                               |
///
/// New cycle predicates slot in here without touching the enumerator.
#[must_use]
pub fn classify_cycle(edges: &[EdgeInfo]) -> AnomalyKind {
    let is_anti = |kind: &DepKind| matches!(kind, DepKind::Rw | DepKind::Prw);
    let anti_edges: Vec<&EdgeInfo> = edges
        .iter()
        .filter(|e| e.kinds.iter().any(is_anti))
        .collect();

    if anti_edges.is_empty() {
        if edges.iter().any(|e| e.kinds.contains(&DepKind::Wr)) {
            AnomalyKind::G1c
        } else {
            AnomalyKind::G0
        }
    } else if anti_edges.len() == 1 && anti_edges[0].kinds.iter().all(is_anti) {
        AnomalyKind::GSingle
    } else if edges.iter().any(|e| e.kinds.contains(&DepKind::Prw)) {
        AnomalyKind::G2
    } else {
        AnomalyKind::G2Item
    }
}

#[cfg(test)]
mod tests {
    use alloc::collections::BTreeSet;
    use alloc::vec::Vec;

    use super::*;

    fn edge(kinds: &[DepKind]) -> EdgeInfo {
        EdgeInfo {
            kinds: kinds.iter().copied().collect::<BTreeSet<_>>(),
            witnesses: Vec::new(),
        }
    }

    #[test]
    fn test_pure_write_cycle_is_g0() {
        let edges = [edge(&[DepKind::Ww]), edge(&[DepKind::Ww])];
        assert_eq!(classify_cycle(&edges), AnomalyKind::G0);
    }

    #[test]
    fn test_read_dependency_cycle_is_g1c() {
        let edges = [edge(&[DepKind::Wr]), edge(&[DepKind::Ww])];
        assert_eq!(classify_cycle(&edges), AnomalyKind::G1c);
    }

    #[test]
    fn test_single_pure_antidependency_is_g_single() {
        let edges = [edge(&[DepKind::Ww]), edge(&[DepKind::Rw])];
        assert_eq!(classify_cycle(&edges), AnomalyKind::GSingle);
        let edges = [edge(&[DepKind::Wr]), edge(&[DepKind::Prw])];
        assert_eq!(classify_cycle(&edges), AnomalyKind::GSingle);
    }

    #[test]
    fn test_mixed_label_on_anti_edge_is_not_g_single() {
        // One antidependency edge, but it also carries WW: the broader
        // family applies.
        let edges = [edge(&[DepKind::Ww]), edge(&[DepKind::Rw, DepKind::Ww])];
        assert_eq!(classify_cycle(&edges), AnomalyKind::G2Item);
    }

    #[test]
    fn test_multiple_item_antidependencies_are_g2_item() {
        let edges = [edge(&[DepKind::Rw]), edge(&[DepKind::Rw])];
        assert_eq!(classify_cycle(&edges), AnomalyKind::G2Item);
    }

    #[test]
    fn test_predicate_antidependency_is_g2() {
        let edges = [edge(&[DepKind::Prw]), edge(&[DepKind::Prw])];
        assert_eq!(classify_cycle(&edges), AnomalyKind::G2);
        let edges = [edge(&[DepKind::Rw]), edge(&[DepKind::Prw])];
        assert_eq!(classify_cycle(&edges), AnomalyKind::G2);
    }
}
