//! Anomaly detection: resolution, non-cyclic findings, serialization graph,
//! cycle enumeration, and classification against an isolation level.

use alloc::string::String;
use alloc::vec::Vec;
use core::fmt::{self, Display, Formatter};
use core::hash::Hash;
use core::ops::ControlFlow;
use core::str::FromStr;

pub mod classify;
pub mod cycles;
pub mod dsg;
pub mod error;
pub mod noncyclic;
pub mod report;
pub mod resolve;

pub use classify::AnomalyKind;
pub use dsg::{DepKind, Dsg};
pub use error::{Error, IntegrityWarning};
pub use report::{Anomaly, Report};

use crate::history::History;

/// Isolation levels, ordered from weakest to strongest.
///
/// A level is a set of forbidden anomalies; the checker reports exactly the
/// findings in that set. Absence of findings under this sound-but-incomplete
/// detector does not prove the level holds.
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash)]
pub enum IsolationLevel {
    /// Forbids dirty writes (G0).
    ReadUncommitted,
    /// Additionally forbids aborted, intermediate, and cyclic reads
    /// (G1a, G1b, G1c).
    ReadCommitted,
    /// Additionally forbids item antidependency cycles (G2-item).
    RepeatableRead,
    /// Forbids G0, G1a, G1b, G1c, and single-antidependency cycles
    /// (G-single).
    SnapshotIsolation,
    /// Forbids everything above plus predicate antidependency cycles (G2).
    #[default]
    Serializable,
}

impl IsolationLevel {
    /// The set of anomalies this level forbids.
    #[must_use]
    pub const fn forbidden(self) -> &'static [AnomalyKind] {
        match self {
            Self::ReadUncommitted => &[AnomalyKind::G0],
            Self::ReadCommitted => &[
                AnomalyKind::G0,
                AnomalyKind::G1a,
                AnomalyKind::G1b,
                AnomalyKind::G1c,
            ],
            Self::RepeatableRead => &[
                AnomalyKind::G0,
                AnomalyKind::G1a,
                AnomalyKind::G1b,
                AnomalyKind::G1c,
                AnomalyKind::G2Item,
            ],
            Self::SnapshotIsolation => &[
                AnomalyKind::G0,
                AnomalyKind::G1a,
                AnomalyKind::G1b,
                AnomalyKind::G1c,
                AnomalyKind::GSingle,
            ],
            Self::Serializable => &[
                AnomalyKind::G0,
                AnomalyKind::G1a,
                AnomalyKind::G1b,
                AnomalyKind::G1c,
                AnomalyKind::GSingle,
                AnomalyKind::G2Item,
                AnomalyKind::G2,
            ],
        }
    }

    #[must_use]
    pub fn forbids(self, kind: AnomalyKind) -> bool {
        self.forbidden().contains(&kind)
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::ReadUncommitted => "read-uncommitted",
            Self::ReadCommitted => "read-committed",
            Self::RepeatableRead => "repeatable-read",
            Self::SnapshotIsolation => "snapshot-isolation",
            Self::Serializable => "serializable",
        }
    }
}

impl Display for IsolationLevel {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Unrecognized isolation level name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseLevelError(pub String);

impl Display for ParseLevelError {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "unknown isolation level: {}", self.0)
    }
}

impl FromStr for IsolationLevel {
    type Err = ParseLevelError;

    /// Case-insensitive; `-`, `_`, and spaces are interchangeable.
    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let normalized: String = input
            .chars()
            .filter(|&c| !matches!(c, '-' | '_' | ' '))
            .map(|c| c.to_ascii_lowercase())
            .collect();
        match normalized.as_str() {
            "readuncommitted" => Ok(Self::ReadUncommitted),
            "readcommitted" => Ok(Self::ReadCommitted),
            "repeatableread" => Ok(Self::RepeatableRead),
            "snapshotisolation" | "snapshot" => Ok(Self::SnapshotIsolation),
            "serializable" => Ok(Self::Serializable),
            _ => Err(ParseLevelError(String::from(input))),
        }
    }
}

/// Analyzes a history against an isolation level.
///
/// Returns every anomaly the level forbids, at most `max_anomalies` of them
/// when a cap is given. Finding anomalies is the success path; the analysis
/// fails only on structurally malformed histories. The result is a pure
/// function of its arguments: the same history, level, and cap always
/// produce the same report.
///
/// # Errors
///
/// Returns [`Error::Malformed`] when the history violates its structural
/// invariants (duplicate transaction ids, reserved root id, duplicate
/// initial keys).
pub fn check<K, V>(
    history: &History<K, V>,
    level: IsolationLevel,
    max_anomalies: Option<usize>,
) -> Result<Report<K>, Error<K>>
where
    K: Eq + Hash + Clone + Ord,
    V: Eq + Hash + Clone + Ord,
{
    history.validate()?;

    tracing::debug!(
        transactions = history.transactions.len(),
        %level,
        "checking history"
    );

    // No committed transactions: trivially clean.
    if history.committed().next().is_none() {
        tracing::debug!("no committed transactions");
        return Ok(Report::empty(level));
    }

    let cap = max_anomalies.unwrap_or(usize::MAX);
    let resolution = resolve::resolve(history);

    let mut anomalies: Vec<Anomaly> = noncyclic::detect(&resolution)
        .into_iter()
        .filter(|a| level.forbids(a.kind()))
        .take(cap)
        .collect();

    let build = dsg::build(history, &resolution);

    if anomalies.len() < cap {
        let _ = cycles::for_each_simple_cycle(&build.dsg.graph, &mut |cycle| {
            let edges: Vec<dsg::EdgeInfo> = cycle
                .iter()
                .enumerate()
                .map(|(i, txn)| {
                    let next = cycle[(i + 1) % cycle.len()];
                    build
                        .dsg
                        .edge(*txn, next)
                        .cloned()
                        .expect("enumerated cycle follows graph edges")
                })
                .collect();
            let kind = classify::classify_cycle(&edges);
            if level.forbids(kind) {
                anomalies.push(Anomaly::Cycle {
                    kind,
                    transactions: cycle.to_vec(),
                    edges,
                });
            }
            if anomalies.len() < cap {
                ControlFlow::Continue(())
            } else {
                ControlFlow::Break(())
            }
        });
    }

    let mut warnings = resolution.warnings;
    warnings.extend(build.warnings);

    tracing::debug!(
        anomalies = anomalies.len(),
        warnings = warnings.len(),
        "analysis finished"
    );

    Ok(Report {
        level,
        anomalies,
        warnings,
        dsg: build.dsg,
    })
}
