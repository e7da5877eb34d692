use chrono::{DateTime, Duration, Local};
use rand::distr::{Distribution, Uniform};
use rand::RngExt;
use rayon::iter::{IntoParallelIterator, ParallelIterator};
use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

use adya_core::history::types::{Predicate, TransactionId};
use adya_core::History;

#[derive(Clone, Debug, Default, Deserialize, Serialize, TypedBuilder)]
pub struct WorkloadParams {
    pub id: u64,
    /// Total transactions, distributed round-robin over the sessions.
    pub n_transaction: u64,
    pub n_object: u64,
    pub n_session: u64,
    pub n_op: u64,
    /// Predicate operations per thousand operations.
    #[builder(default = 100)]
    #[serde(default)]
    pub predicate_per_mille: u64,
}

/// One planned client request. Observations are filled in by the driver.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub enum PlannedOp {
    Read { key: u64 },
    Write { key: u64, value: u64 },
    PredicateRead { predicate: Predicate<u64> },
    PredicateWrite { predicate: Predicate<u64>, value: u64 },
}

/// A transaction the driver will issue, carrying the id it must record.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct PlannedTransaction {
    pub id: TransactionId,
    pub ops: Vec<PlannedOp>,
}

/// A full plan: initial writes plus one transaction list per session.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Workload {
    pub params: WorkloadParams,
    pub init: Vec<(u64, u64)>,
    pub sessions: Vec<Vec<PlannedTransaction>>,
}

/// Plans a single workload.
///
/// Every object gets an initial write of `0`; written values are issued
/// from per-object counters, so each `(object, value)` pair identifies one
/// write and the analysis never faces ambiguous resolution. Predicate
/// operations are mixed in at the configured rate, with thresholds sampled
/// from the value range.
///
/// # Panics
///
/// Panics if `n_object` or `n_session` is zero.
#[must_use]
pub fn generate_workload(params: &WorkloadParams) -> Workload {
    assert!(params.n_object > 0, "workload needs at least one object");
    assert!(params.n_session > 0, "workload needs at least one session");

    let mut counters: Vec<u64> = vec![0; params.n_object as usize];
    let mut random_generator = rand::rng();
    let key_range = Uniform::new(0, params.n_object).unwrap();
    let mille_range = Uniform::new(0, 1000).unwrap();

    let mut sessions: Vec<Vec<PlannedTransaction>> =
        (0..params.n_session).map(|_| Vec::new()).collect();

    for index in 0..params.n_transaction {
        let ops = (0..params.n_op)
            .map(|_| {
                let key = key_range.sample(&mut random_generator);
                let predicate =
                    mille_range.sample(&mut random_generator) < params.predicate_per_mille;
                let want_read = random_generator.random::<bool>();
                match (predicate, want_read) {
                    (false, true) => PlannedOp::Read { key },
                    (false, false) => {
                        counters[key as usize] += 1;
                        PlannedOp::Write {
                            key,
                            value: counters[key as usize],
                        }
                    }
                    (true, true) => {
                        let threshold_range =
                            Uniform::new(0, issued_ceiling(&counters)).unwrap();
                        let threshold = threshold_range.sample(&mut random_generator);
                        PlannedOp::PredicateRead {
                            predicate: if random_generator.random::<bool>() {
                                Predicate::Gt(threshold)
                            } else {
                                Predicate::Lt(threshold)
                            },
                        }
                    }
                    (true, false) => {
                        // A fresh value shared by every row the statement
                        // touches; counters stay ahead of all issued values.
                        let value = issued_ceiling(&counters);
                        for counter in &mut counters {
                            *counter = (*counter).max(value);
                        }
                        let threshold_range =
                            Uniform::new(0, issued_ceiling(&counters)).unwrap();
                        let threshold = threshold_range.sample(&mut random_generator);
                        PlannedOp::PredicateWrite {
                            predicate: if random_generator.random::<bool>() {
                                Predicate::Gt(threshold)
                            } else {
                                Predicate::Lt(threshold)
                            },
                            value,
                        }
                    }
                }
            })
            .collect();

        let session = (index % params.n_session) as usize;
        sessions[session].push(PlannedTransaction {
            id: TransactionId(index + 1),
            ops,
        });
    }

    Workload {
        params: params.clone(),
        init: (0..params.n_object).map(|key| (key, 0)).collect(),
        sessions,
    }
}

/// One past the largest value issued so far.
fn issued_ceiling(counters: &[u64]) -> u64 {
    counters.iter().max().copied().unwrap_or(0) + 1
}

/// Plans several workloads in parallel, one per id.
#[must_use]
pub fn generate_workloads(n_workload: u64, params: &WorkloadParams) -> Vec<Workload> {
    (0..n_workload)
        .into_par_iter()
        .map(|id| {
            let mut workload_params = params.clone();
            workload_params.id = id;
            generate_workload(&workload_params)
        })
        .collect()
}

/// A recorded run: the parameters and timing of an execution together with
/// the observed history, as persisted to disk.
#[derive(Debug, Deserialize, Serialize)]
pub struct Run {
    params: WorkloadParams,
    info: String,
    start: DateTime<Local>,
    end: DateTime<Local>,
    history: History<u64, u64>,
}

impl Run {
    #[must_use]
    pub const fn new(
        params: WorkloadParams,
        info: String,
        start: DateTime<Local>,
        end: DateTime<Local>,
        history: History<u64, u64>,
    ) -> Self {
        Self {
            params,
            info,
            start,
            end,
            history,
        }
    }

    #[must_use]
    pub const fn get_id(&self) -> u64 {
        self.params.id
    }

    #[must_use]
    pub const fn get_params(&self) -> &WorkloadParams {
        &self.params
    }

    #[must_use]
    pub const fn get_history(&self) -> &History<u64, u64> {
        &self.history
    }

    #[must_use]
    pub fn get_duration(&self) -> Duration {
        self.end - self.start
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> WorkloadParams {
        WorkloadParams::builder()
            .id(0)
            .n_transaction(20)
            .n_object(5)
            .n_session(3)
            .n_op(4)
            .build()
    }

    #[test]
    fn test_workload_shape() {
        let workload = generate_workload(&params());
        assert_eq!(workload.sessions.len(), 3);
        let total: usize = workload.sessions.iter().map(Vec::len).sum();
        assert_eq!(total, 20);
        assert_eq!(workload.init.len(), 5);
        for transaction in workload.sessions.iter().flatten() {
            assert_eq!(transaction.ops.len(), 4);
        }
    }

    #[test]
    fn test_transaction_ids_are_unique_and_nonzero() {
        let workload = generate_workload(&params());
        let mut ids: Vec<u64> = workload
            .sessions
            .iter()
            .flatten()
            .map(|t| t.id.0)
            .collect();
        ids.sort_unstable();
        assert!(ids.first().is_some_and(|&first| first > 0));
        let mut deduped = ids.clone();
        deduped.dedup();
        assert_eq!(ids, deduped);
    }

    #[test]
    fn test_written_values_are_unique_per_object() {
        let workload = generate_workload(&params());
        let mut seen = std::collections::HashSet::new();
        for transaction in workload.sessions.iter().flatten() {
            for op in &transaction.ops {
                if let PlannedOp::Write { key, value } = op {
                    assert!(seen.insert((*key, *value)), "duplicate write {key}:{value}");
                }
            }
        }
    }

    #[test]
    fn test_multiple_workloads_get_distinct_ids() {
        let workloads = generate_workloads(4, &params());
        let ids: Vec<u64> = workloads.iter().map(|w| w.params.id).collect();
        assert_eq!(ids, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_workload_serde_roundtrip() {
        let workload = generate_workload(&params());
        let json = serde_json::to_string(&workload).unwrap();
        let back: Workload = serde_json::from_str(&json).unwrap();
        assert_eq!(back.sessions, workload.sessions);
        assert_eq!(back.init, workload.init);
    }
}
