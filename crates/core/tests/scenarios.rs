//! Concrete anomaly scenarios, each pinned to the exact classification its
//! cycle structure demands.

mod common;

use adya_core::anomaly::{Anomaly, AnomalyKind};
use adya_core::{check, IsolationLevel};
use adya_core::history::types::Predicate;

use common::{aborted, committed, history, pr, r, tid, w};

fn kinds(report: &adya_core::anomaly::Report<&'static str>) -> Vec<AnomalyKind> {
    report.anomalies.iter().map(Anomaly::kind).collect()
}

#[test]
fn write_only_history_without_conflicting_orders_is_clean() {
    // Three writers over x and y; version orders are consistent, no cycle.
    let h = history(
        &[],
        vec![
            committed(1, vec![w("x", 1)]),
            committed(2, vec![w("y", 1)]),
            committed(3, vec![w("x", 2), w("y", 2)]),
        ],
    );
    let report = check(&h, IsolationLevel::Serializable, None).unwrap();
    assert!(report.anomalies.is_empty());
    assert!(report.is_complete());
}

#[test]
fn g0_write_cycle() {
    // T3 and T4 install x and y in opposite orders. Reader T5 pins
    // x: T1 -> T4 -> T3, reader T6 pins y: T2 -> T3 -> T4, so the two
    // write dependencies between T3 and T4 run in both directions.
    let h = history(
        &[],
        vec![
            committed(1, vec![w("x", 1)]),
            committed(2, vec![w("y", 1)]),
            committed(3, vec![w("x", 2), w("y", 2)]),
            committed(4, vec![w("x", 3), w("y", 3)]),
            committed(5, vec![r("x", 1), r("x", 3), r("x", 2)]),
            committed(6, vec![r("y", 1), r("y", 2), r("y", 3)]),
        ],
    );
    // Read Uncommitted forbids only G0, so the antidependency cycles the
    // pinning readers introduce are filtered out.
    let report = check(&h, IsolationLevel::ReadUncommitted, None).unwrap();
    assert_eq!(kinds(&report), vec![AnomalyKind::G0]);
    let Anomaly::Cycle { transactions, .. } = &report.anomalies[0] else {
        panic!("expected a cycle");
    };
    assert_eq!(transactions, &vec![tid(3), tid(4)]);
}

#[test]
fn g1a_aborted_read() {
    let h = history(
        &[],
        vec![
            aborted(1, vec![w("x", 7)]),
            committed(2, vec![r("x", 7)]),
        ],
    );

    let report = check(&h, IsolationLevel::ReadCommitted, None).unwrap();
    assert_eq!(
        report.anomalies,
        vec![Anomaly::AbortedRead {
            read: adya_core::history::types::OpId::new(tid(2), 0),
            write: adya_core::history::types::OpId::new(tid(1), 0),
        }]
    );

    // Read Uncommitted permits it.
    let report = check(&h, IsolationLevel::ReadUncommitted, None).unwrap();
    assert!(report.anomalies.is_empty());
}

#[test]
fn g1b_intermediate_read() {
    let h = history(
        &[],
        vec![
            committed(1, vec![w("x", 1), w("x", 2)]),
            committed(2, vec![r("x", 1)]),
        ],
    );
    let report = check(&h, IsolationLevel::ReadCommitted, None).unwrap();
    assert_eq!(kinds(&report), vec![AnomalyKind::G1b]);
}

#[test]
fn g1c_dependency_cycle() {
    // WR(T1 -> T2) over x, WR(T2 -> T3) over y, and reader T4 pins the
    // version order x: T3 -> T1, closing the cycle with WW(T3 -> T1).
    let h = history(
        &[],
        vec![
            committed(1, vec![w("x", 1)]),
            committed(2, vec![r("x", 1), w("y", 1)]),
            committed(3, vec![r("y", 1), w("x", 2)]),
            committed(4, vec![r("x", 2), r("x", 1)]),
        ],
    );

    let report = check(&h, IsolationLevel::ReadCommitted, None).unwrap();
    assert_eq!(kinds(&report), vec![AnomalyKind::G1c]);
    let Anomaly::Cycle { transactions, .. } = &report.anomalies[0] else {
        panic!("expected a cycle");
    };
    assert_eq!(transactions, &vec![tid(1), tid(2), tid(3)]);

    // Serializable additionally surfaces the G-single cycle between T4 and
    // T1 that the pinning reader created.
    let report = check(&h, IsolationLevel::Serializable, None).unwrap();
    let found = kinds(&report);
    assert!(found.contains(&AnomalyKind::G1c));
    assert!(found.contains(&AnomalyKind::GSingle));
}

#[test]
fn g_single_lost_update() {
    let h = history(
        &[("x", 0)],
        vec![
            committed(1, vec![r("x", 0), w("x", 1)]),
            committed(2, vec![r("x", 0), w("x", 2)]),
        ],
    );

    for level in [
        IsolationLevel::SnapshotIsolation,
        IsolationLevel::Serializable,
    ] {
        let report = check(&h, level, None).unwrap();
        assert_eq!(kinds(&report), vec![AnomalyKind::GSingle], "{level}");
        let Anomaly::Cycle { transactions, .. } = &report.anomalies[0] else {
            panic!("expected a cycle");
        };
        assert_eq!(transactions, &vec![tid(1), tid(2)]);
    }

    // The cycle carries exactly one antidependency, so its name is G-single
    // and levels that do not forbid G-single let it pass.
    for level in [
        IsolationLevel::ReadCommitted,
        IsolationLevel::RepeatableRead,
    ] {
        let report = check(&h, level, None).unwrap();
        assert!(report.anomalies.is_empty(), "{level}");
    }
}

#[test]
fn predicate_antidependency_alone_is_no_cycle() {
    let h = history(
        &[],
        vec![
            committed(1, vec![pr(Predicate::Gt(30), &[])]),
            committed(2, vec![w("k", 40)]),
        ],
    );
    let report = check(&h, IsolationLevel::Serializable, None).unwrap();
    assert!(report.anomalies.is_empty());
    // The edge itself is present.
    assert!(report.dsg.edge(tid(1), tid(2)).is_some());
}

#[test]
fn g2_predicate_write_skew() {
    // Each transaction evaluates a predicate the other's insert would
    // match: two predicate antidependencies close the cycle.
    let h = history(
        &[],
        vec![
            committed(1, vec![pr(Predicate::Gt(30), &[]), w("a", 1)]),
            committed(2, vec![pr(Predicate::Lt(5), &[]), w("b", 100)]),
        ],
    );

    let report = check(&h, IsolationLevel::Serializable, None).unwrap();
    assert_eq!(kinds(&report), vec![AnomalyKind::G2]);

    // G2 is forbidden only at Serializable.
    for level in [
        IsolationLevel::SnapshotIsolation,
        IsolationLevel::RepeatableRead,
        IsolationLevel::ReadCommitted,
    ] {
        let report = check(&h, level, None).unwrap();
        assert!(report.anomalies.is_empty(), "{level}");
    }
}

#[test]
fn g2_item_write_skew() {
    // Classic item write skew: each transaction reads the key the other
    // writes; both antidependencies are item-level.
    let h = history(
        &[("x", 0), ("y", 0)],
        vec![
            committed(1, vec![r("x", 0), w("y", 1)]),
            committed(2, vec![r("y", 0), w("x", 1)]),
        ],
    );
    let report = check(&h, IsolationLevel::Serializable, None).unwrap();
    assert_eq!(kinds(&report), vec![AnomalyKind::G2Item]);

    let report = check(&h, IsolationLevel::RepeatableRead, None).unwrap();
    assert_eq!(kinds(&report), vec![AnomalyKind::G2Item]);

    // Snapshot isolation permits item write skew.
    let report = check(&h, IsolationLevel::SnapshotIsolation, None).unwrap();
    assert!(report.anomalies.is_empty());
}
