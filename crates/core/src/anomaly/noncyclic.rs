//! Non-cyclic anomaly detection: aborted reads (G1a) and intermediate
//! reads (G1b).
//!
//! Both fall straight out of the resolution map. They are detected
//! unconditionally; the level filter in the orchestrator decides whether
//! they reach the report.

use alloc::vec::Vec;

use crate::anomaly::report::Anomaly;
use crate::anomaly::resolve::{ResolvedSource, Resolution};
use crate::history::types::OpId;

/// Scans the resolution map, returning findings ordered by reading
/// operation.
#[must_use]
pub fn detect<K>(resolution: &Resolution<K>) -> Vec<Anomaly> {
    let mut found: Vec<(OpId, Anomaly)> = Vec::new();

    for (read, resolved) in &resolution.items {
        if let Some(anomaly) = witness(*read, resolved.source) {
            found.push((*read, anomaly));
        }
    }
    for (read, rows) in &resolution.predicate_rows {
        for (_, source) in rows {
            if let Some(anomaly) = witness(*read, *source) {
                found.push((*read, anomaly));
            }
        }
    }

    found.sort_by_key(|&(read, _)| read);
    found.into_iter().map(|(_, anomaly)| anomaly).collect()
}

const fn witness(read: OpId, source: ResolvedSource) -> Option<Anomaly> {
    match source {
        ResolvedSource::Aborted(write) => Some(Anomaly::AbortedRead { read, write }),
        ResolvedSource::CommittedIntermediate(write) => {
            Some(Anomaly::IntermediateRead { read, write })
        }
        _ => None,
    }
}
