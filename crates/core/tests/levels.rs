//! One history carrying a G1a, a G-single, and a G2 witness at once; each
//! level must surface exactly its own forbidden subset.

mod common;

use adya_core::anomaly::{Anomaly, AnomalyKind};
use adya_core::{check, IsolationLevel};
use adya_core::history::types::Predicate;

use common::{aborted, committed, history, pr, r, w, Hist};

fn mixed_history() -> Hist {
    history(
        &[("x", 0)],
        vec![
            // G1a witness on key a.
            aborted(1, vec![w("a", 7)]),
            committed(2, vec![r("a", 7)]),
            // G-single (lost update) on key x.
            committed(3, vec![r("x", 0), w("x", 1)]),
            committed(4, vec![r("x", 0), w("x", 2)]),
            // G2 (predicate write skew) over keys p and q.
            committed(5, vec![pr(Predicate::Gt(30), &[]), w("p", 1)]),
            committed(6, vec![pr(Predicate::Lt(5), &[]), w("q", 100)]),
        ],
    )
}

fn counts(level: IsolationLevel) -> Vec<AnomalyKind> {
    let report = check(&mixed_history(), level, None).unwrap();
    assert!(report.is_complete());
    let mut kinds: Vec<AnomalyKind> = report.anomalies.iter().map(Anomaly::kind).collect();
    kinds.sort_unstable();
    kinds
}

#[test]
fn read_uncommitted_sees_nothing() {
    assert_eq!(counts(IsolationLevel::ReadUncommitted), vec![]);
}

#[test]
fn read_committed_sees_the_aborted_read() {
    assert_eq!(counts(IsolationLevel::ReadCommitted), vec![AnomalyKind::G1a]);
}

#[test]
fn repeatable_read_sees_the_aborted_read() {
    assert_eq!(counts(IsolationLevel::RepeatableRead), vec![AnomalyKind::G1a]);
}

#[test]
fn snapshot_isolation_adds_the_lost_update() {
    assert_eq!(
        counts(IsolationLevel::SnapshotIsolation),
        vec![AnomalyKind::G1a, AnomalyKind::GSingle]
    );
}

#[test]
fn serializable_sees_everything() {
    assert_eq!(
        counts(IsolationLevel::Serializable),
        vec![AnomalyKind::G1a, AnomalyKind::GSingle, AnomalyKind::G2]
    );
}

#[test]
fn every_reported_kind_is_in_the_forbidden_set() {
    for level in [
        IsolationLevel::ReadUncommitted,
        IsolationLevel::ReadCommitted,
        IsolationLevel::RepeatableRead,
        IsolationLevel::SnapshotIsolation,
        IsolationLevel::Serializable,
    ] {
        let report = check(&mixed_history(), level, None).unwrap();
        for anomaly in &report.anomalies {
            assert!(level.forbids(anomaly.kind()), "{level}: {anomaly}");
        }
    }
}
