//! In-memory reference driver.
//!
//! Executes sessions on OS threads against a single locked store, holding
//! the lock for a whole transaction. Every execution is therefore serial
//! and serializable regardless of the requested level; the driver exists to
//! exercise the full recording path and to give the checker a known-clean
//! baseline.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::thread;

use chrono::Local;

use adya_core::anomaly::IsolationLevel;
use adya_core::history::types::{Operation, Transaction};
use adya_core::History;
use adya_testgen::generator::{PlannedOp, PlannedTransaction, Workload};

use crate::{ClusterConfig, DbDriver};

/// The in-memory reference driver.
#[derive(Debug, Default)]
pub struct MemDriver;

/// Errors from the in-memory driver.
#[derive(Debug)]
pub enum MemError {
    /// A session thread panicked mid-run.
    SessionFailed,
    /// The recorded history failed validation.
    Recording(String),
}

impl DbDriver for MemDriver {
    type Error = MemError;

    fn connect(_config: &ClusterConfig) -> Result<Self, Self::Error> {
        Ok(Self)
    }

    fn execute(
        &self,
        workload: &Workload,
        _isolation: IsolationLevel,
    ) -> Result<History<u64, u64>, Self::Error> {
        let store: Mutex<BTreeMap<u64, u64>> =
            Mutex::new(workload.init.iter().copied().collect());
        // Logical ticks on a wall-clock base: strictly monotonic even if
        // the system clock is not.
        let clock = AtomicU64::new(u64::try_from(Local::now().timestamp_micros()).unwrap_or(0));
        let store = &store;
        let clock = &clock;

        let mut recorded: Vec<Transaction<u64, u64>> = Vec::new();
        let results: Vec<Result<Vec<Transaction<u64, u64>>, MemError>> =
            thread::scope(|scope| {
                let handles: Vec<_> = workload
                    .sessions
                    .iter()
                    .map(|session| {
                        scope.spawn(move || {
                            session
                                .iter()
                                .map(|planned| run_transaction(store, clock, planned))
                                .collect::<Vec<_>>()
                        })
                    })
                    .collect();
                handles
                    .into_iter()
                    .map(|handle| handle.join().map_err(|_| MemError::SessionFailed))
                    .collect()
            });
        for session in results {
            recorded.extend(session?);
        }

        History::new(workload.init.clone(), recorded)
            .map_err(|e| MemError::Recording(format!("{e:?}")))
    }
}

/// Executes one transaction under the store lock, recording observations.
fn run_transaction(
    store: &Mutex<BTreeMap<u64, u64>>,
    clock: &AtomicU64,
    planned: &PlannedTransaction,
) -> Transaction<u64, u64> {
    let mut data = store.lock().expect("store lock is never poisoned");
    let start = stamp(clock);

    let ops: Vec<Operation<u64, u64>> = planned
        .ops
        .iter()
        .map(|op| match op {
            PlannedOp::Read { key } => match data.get(key) {
                Some(&value) => Operation::read(*key, value),
                None => Operation::read_absent(*key),
            },
            PlannedOp::Write { key, value } => {
                data.insert(*key, *value);
                Operation::write(*key, *value)
            }
            PlannedOp::PredicateRead { predicate } => {
                let observed: Vec<(u64, u64)> = data
                    .iter()
                    .filter(|(_, value)| predicate.matches(value))
                    .map(|(&key, &value)| (key, value))
                    .collect();
                Operation::predicate_read(predicate.clone(), observed)
            }
            PlannedOp::PredicateWrite { predicate, value } => {
                let updated: Vec<u64> = data
                    .iter()
                    .filter(|(_, current)| predicate.matches(current))
                    .map(|(&key, _)| key)
                    .collect();
                for key in &updated {
                    data.insert(*key, *value);
                }
                Operation::predicate_write(predicate.clone(), *value, updated)
            }
        })
        .collect();

    let end = stamp(clock);
    drop(data);

    Transaction::committed(planned.id, ops).with_stamps(start, end)
}

fn stamp(clock: &AtomicU64) -> u64 {
    clock.fetch_add(1, Ordering::SeqCst)
}

#[cfg(test)]
mod tests {
    use adya_core::check;
    use adya_testgen::generator::{generate_workload, WorkloadParams};

    use super::*;

    #[test]
    fn test_reference_driver_is_serializable() {
        let params = WorkloadParams::builder()
            .id(0)
            .n_transaction(40)
            .n_object(8)
            .n_session(4)
            .n_op(5)
            .build();
        let workload = generate_workload(&params);
        let driver = MemDriver::connect(&ClusterConfig::default()).unwrap();
        let history = driver
            .execute(&workload, IsolationLevel::Serializable)
            .unwrap();

        assert_eq!(history.transactions.len(), 40);
        let report = check(&history, IsolationLevel::Serializable, None).unwrap();
        assert!(report.anomalies.is_empty(), "{:?}", report.anomalies);
        assert!(report.is_complete(), "{:?}", report.warnings);
    }

    #[test]
    fn test_stamps_are_recorded() {
        let params = WorkloadParams::builder()
            .id(0)
            .n_transaction(3)
            .n_object(2)
            .n_session(1)
            .n_op(2)
            .build();
        let workload = generate_workload(&params);
        let driver = MemDriver::connect(&ClusterConfig::default()).unwrap();
        let history = driver
            .execute(&workload, IsolationLevel::Serializable)
            .unwrap();
        for transaction in &history.transactions {
            assert!(transaction.start.is_some());
            assert!(transaction.end.is_some());
        }
    }
}
