use alloc::vec::Vec;
use core::fmt::{self, Display, Formatter};

use crate::anomaly::classify::AnomalyKind;
use crate::anomaly::dsg::{Dsg, EdgeInfo};
use crate::anomaly::error::IntegrityWarning;
use crate::anomaly::IsolationLevel;
use crate::history::types::{OpId, TransactionId};

/// A named finding with its evidence: either a cycle of the serialization
/// graph, or a non-cyclic witness pairing the implicated read with the
/// offending write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Anomaly {
    /// G1a: a committed transaction read an aborted transaction's write.
    AbortedRead { read: OpId, write: OpId },
    /// G1b: a committed transaction read a version its writer overwrote
    /// before committing.
    IntermediateRead { read: OpId, write: OpId },
    /// A cycle of the serialization graph; `edges[i]` labels the edge from
    /// `transactions[i]` to its successor (wrapping at the end).
    Cycle {
        kind: AnomalyKind,
        transactions: Vec<TransactionId>,
        edges: Vec<EdgeInfo>,
    },
}

impl Anomaly {
    #[must_use]
    pub fn kind(&self) -> AnomalyKind {
        match self {
            Self::AbortedRead { .. } => AnomalyKind::G1a,
            Self::IntermediateRead { .. } => AnomalyKind::G1b,
            Self::Cycle { kind, .. } => *kind,
        }
    }
}

impl Display for Anomaly {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            Self::AbortedRead { read, write } => {
                write!(f, "G1a: {read} observed aborted write {write}")
            }
            Self::IntermediateRead { read, write } => {
                write!(f, "G1b: {read} observed intermediate write {write}")
            }
            Self::Cycle {
                kind,
                transactions,
                edges,
            } => {
                write!(f, "{kind}: ")?;
                for (i, txn) in transactions.iter().enumerate() {
                    if i > 0 {
                        write!(f, " -> ")?;
                    }
                    write!(f, "{txn}")?;
                }
                if let Some(first) = transactions.first() {
                    write!(f, " -> {first}")?;
                }
                write!(f, " [")?;
                for (i, edge) in edges.iter().enumerate() {
                    if i > 0 {
                        write!(f, "; ")?;
                    }
                    for (j, kind) in edge.kinds.iter().enumerate() {
                        if j > 0 {
                            write!(f, ",")?;
                        }
                        write!(f, "{kind}")?;
                    }
                }
                write!(f, "]")
            }
        }
    }
}

/// The outcome of an analysis run: every anomaly the requested level
/// forbids, plus any integrity findings raised along the way.
///
/// The report, including the embedded serialization graph, is an immutable
/// snapshot and may be shared freely.
#[derive(Debug, Clone)]
pub struct Report<K> {
    pub level: IsolationLevel,
    pub anomalies: Vec<Anomaly>,
    pub warnings: Vec<IntegrityWarning<K>>,
    pub dsg: Dsg,
}

impl<K> Report<K> {
    #[must_use]
    pub fn empty(level: IsolationLevel) -> Self {
        Self {
            level,
            anomalies: Vec::new(),
            warnings: Vec::new(),
            dsg: Dsg::default(),
        }
    }

    /// `false` when integrity findings forced parts of the history out of
    /// the analysis.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.warnings.is_empty()
    }
}
