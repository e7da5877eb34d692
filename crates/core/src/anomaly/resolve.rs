//! Read-to-write resolution: which write instance produced each observed
//! value.
//!
//! Only committed transactions' observations carry evidentiary weight, so
//! only their reads are resolved. Writes of every transaction participate as
//! candidate producers, partitioned by the writer's outcome; the preference
//! order and tie-breaking below are part of the contract -- the same history
//! always yields the same resolution.

use alloc::collections::BTreeMap;
use alloc::vec::Vec;
use core::hash::Hash;

use hashbrown::HashMap;

use crate::anomaly::error::IntegrityWarning;
use crate::history::types::{OpId, Operation, Outcome, Transaction, TransactionId};
use crate::history::History;

/// The write instance (if any) that produced an observed read value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolvedSource {
    /// The initial transaction's value, or initial absence.
    Initial,
    /// An earlier write of the reading transaction itself.
    SelfWrite(OpId),
    /// The final committed write of the key in another transaction.
    CommittedFinal(OpId),
    /// A committed transaction's write that the same transaction later
    /// overwrote.
    CommittedIntermediate(OpId),
    /// A write belonging to an aborted transaction.
    Aborted(OpId),
    /// No admissible producer exists.
    Unresolved,
}

/// A resolved item read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRead<K> {
    pub key: K,
    pub source: ResolvedSource,
}

/// Output of the resolver: one entry per committed read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution<K> {
    /// Item reads, keyed by the reading operation.
    pub items: BTreeMap<OpId, ResolvedRead<K>>,
    /// Predicate reads: one `(key, source)` per returned row.
    pub predicate_rows: BTreeMap<OpId, Vec<(K, ResolvedSource)>>,
    pub warnings: Vec<IntegrityWarning<K>>,
}

/// Candidate writes partitioned by producer class, keyed by `(key, value)`.
struct WriteCatalog<'h, K, V> {
    committed_final: HashMap<(&'h K, &'h V), Vec<OpId>>,
    committed_intermediate: HashMap<(&'h K, &'h V), Vec<OpId>>,
    aborted: HashMap<(&'h K, &'h V), Vec<OpId>>,
    unknown: HashMap<(&'h K, &'h V), Vec<OpId>>,
    /// Commit stamp per transaction, `None` when the adapter supplied none.
    ends: HashMap<TransactionId, Option<u64>>,
}

impl<'h, K, V> WriteCatalog<'h, K, V>
where
    K: Eq + Hash,
    V: Eq + Hash,
{
    fn build(history: &'h History<K, V>) -> Self {
        let mut catalog = Self {
            committed_final: HashMap::new(),
            committed_intermediate: HashMap::new(),
            aborted: HashMap::new(),
            unknown: HashMap::new(),
            ends: HashMap::new(),
        };

        for transaction in &history.transactions {
            catalog.ends.insert(transaction.id, transaction.end);

            // Last write per key decides final vs intermediate.
            let mut last_write: HashMap<&K, OpId> = HashMap::new();
            for (op_id, key, _) in transaction.writes() {
                last_write.insert(key, op_id);
            }

            for (op_id, key, value) in transaction.writes() {
                let slot = match transaction.outcome {
                    Outcome::Committed => {
                        if last_write.get(key) == Some(&op_id) {
                            &mut catalog.committed_final
                        } else {
                            &mut catalog.committed_intermediate
                        }
                    }
                    Outcome::Aborted => &mut catalog.aborted,
                    Outcome::Unknown => &mut catalog.unknown,
                };
                slot.entry((key, value)).or_default().push(op_id);
            }
        }

        catalog
    }
}

/// Resolves every committed read of the history.
#[must_use]
pub fn resolve<K, V>(history: &History<K, V>) -> Resolution<K>
where
    K: Eq + Hash + Clone,
    V: Eq + Hash + Clone,
{
    let catalog = WriteCatalog::build(history);
    let mut resolution = Resolution {
        items: BTreeMap::new(),
        predicate_rows: BTreeMap::new(),
        warnings: Vec::new(),
    };

    for transaction in history.committed() {
        for (seq, op) in transaction.ops.iter().enumerate() {
            #[allow(clippy::cast_possible_truncation)]
            let op_id = OpId::new(transaction.id, seq as u32);
            match op {
                Operation::Read { key, observed } => {
                    let source = resolve_value(
                        history,
                        &catalog,
                        transaction,
                        op_id,
                        key,
                        observed.as_ref(),
                        &mut resolution.warnings,
                    );
                    resolution.items.insert(
                        op_id,
                        ResolvedRead {
                            key: key.clone(),
                            source,
                        },
                    );
                }
                Operation::PredicateRead { observed, .. } => {
                    let rows = observed
                        .iter()
                        .map(|(key, value)| {
                            let source = resolve_value(
                                history,
                                &catalog,
                                transaction,
                                op_id,
                                key,
                                Some(value),
                                &mut resolution.warnings,
                            );
                            (key.clone(), source)
                        })
                        .collect();
                    resolution.predicate_rows.insert(op_id, rows);
                }
                _ => {}
            }
        }
    }

    resolution
}

#[allow(clippy::too_many_arguments)]
fn resolve_value<'h, K, V>(
    history: &'h History<K, V>,
    catalog: &WriteCatalog<'h, K, V>,
    reader: &'h Transaction<K, V>,
    read: OpId,
    key: &'h K,
    observed: Option<&'h V>,
    warnings: &mut Vec<IntegrityWarning<K>>,
) -> ResolvedSource
where
    K: Eq + Hash + Clone,
    V: Eq + Hash + Clone,
{
    let Some(value) = observed else {
        // Observed absence: explained by the initial state only.
        if history.initial(key).is_none() {
            return ResolvedSource::Initial;
        }
        warnings.push(IntegrityWarning::NoMatchingWrite {
            read,
            key: key.clone(),
        });
        return ResolvedSource::Unresolved;
    };

    if let Some(candidates) = catalog.committed_final.get(&(key, value)) {
        let external: Vec<OpId> = candidates
            .iter()
            .copied()
            .filter(|c| c.txn != reader.id)
            .collect();
        if let Some(write) = choose_committed(&external, reader.end, &catalog.ends) {
            return ResolvedSource::CommittedFinal(write);
        }
    }

    if let Some(write) = prior_self_write(reader, read, key, value) {
        return ResolvedSource::SelfWrite(write);
    }

    if history.initial(key) == Some(value) {
        return ResolvedSource::Initial;
    }

    if let Some(write) = smallest(catalog.aborted.get(&(key, value))) {
        return ResolvedSource::Aborted(write);
    }

    if let Some(write) = smallest(catalog.committed_intermediate.get(&(key, value))) {
        return ResolvedSource::CommittedIntermediate(write);
    }

    if let Some(write) = smallest(catalog.unknown.get(&(key, value))) {
        warnings.push(IntegrityWarning::UnknownSource { read, write });
        return ResolvedSource::Unresolved;
    }

    warnings.push(IntegrityWarning::NoMatchingWrite {
        read,
        key: key.clone(),
    });
    ResolvedSource::Unresolved
}

/// Deterministic choice among equal-valued committed final writes: latest
/// commit stamp preceding the reader's commit when every stamp is present,
/// otherwise the smallest writer id.
fn choose_committed(
    candidates: &[OpId],
    reader_end: Option<u64>,
    ends: &HashMap<TransactionId, Option<u64>>,
) -> Option<OpId> {
    if candidates.len() > 1 {
        let stamped: Option<Vec<(u64, OpId)>> = candidates
            .iter()
            .map(|c| ends.get(&c.txn).copied().flatten().map(|end| (end, *c)))
            .collect();
        if let (Some(reader_end), Some(mut stamped)) = (reader_end, stamped) {
            stamped.retain(|(end, _)| *end <= reader_end);
            stamped.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(&b.1)));
            if let Some((_, write)) = stamped.first() {
                return Some(*write);
            }
        }
    }
    candidates.iter().min().copied()
}

fn prior_self_write<K, V>(
    reader: &Transaction<K, V>,
    read: OpId,
    key: &K,
    value: &V,
) -> Option<OpId>
where
    K: Eq,
    V: Eq,
{
    reader
        .writes()
        .filter(|(op_id, k, v)| op_id.seq < read.seq && *k == key && *v == value)
        .map(|(op_id, _, _)| op_id)
        .last()
}

fn smallest(candidates: Option<&Vec<OpId>>) -> Option<OpId> {
    candidates.and_then(|c| c.iter().min().copied())
}
