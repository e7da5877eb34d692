//! Direct serialization graph construction.
//!
//! Edges run between committed transactions only. Four kinds exist:
//!
//! - **WW** -- write dependency: the source's final write of a key is the
//!   immediate predecessor of the target's in the key's version order.
//! - **WR** -- read dependency: the target read a version the source
//!   installed.
//! - **RW** -- item antidependency: the source read a version whose
//!   immediate successor the target installed.
//! - **PRW** -- predicate antidependency: the target's write changes the
//!   result set of a predicate read the source evaluated.
//!
//! Per-key version orders are inferred from commit stamps when every writer
//! of the key carries one, and from the observed reads otherwise. Inference
//! is deterministic; when the observations admit several total orders the
//! one inducing the fewest antidependencies is chosen, ties broken by
//! transaction id, so a cycle is reported only when the history genuinely
//! pins it.

use alloc::collections::{BTreeMap, BTreeSet};
use alloc::vec::Vec;
use core::fmt::{self, Display, Formatter};
use core::hash::Hash;

use hashbrown::{HashMap, HashSet};

use crate::anomaly::error::IntegrityWarning;
use crate::anomaly::resolve::{ResolvedSource, Resolution};
use crate::graph::digraph::DiGraph;
use crate::history::types::{OpId, Operation, TransactionId};
use crate::history::History;

/// Dependency kinds between committed transactions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DepKind {
    Ww,
    Wr,
    Rw,
    Prw,
}

impl Display for DepKind {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            Self::Ww => write!(f, "WW"),
            Self::Wr => write!(f, "WR"),
            Self::Rw => write!(f, "RW"),
            Self::Prw => write!(f, "PRW"),
        }
    }
}

/// One justifying operation pair for a dependency kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct DepWitness {
    pub kind: DepKind,
    pub source: OpId,
    pub target: OpId,
}

/// Coalesced label of a DSG edge: the union of kinds between one ordered
/// transaction pair, with the operations that justified each kind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EdgeInfo {
    pub kinds: BTreeSet<DepKind>,
    pub witnesses: Vec<DepWitness>,
}

/// The direct serialization graph of a history.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dsg {
    pub graph: DiGraph<TransactionId>,
    pub edges: BTreeMap<(TransactionId, TransactionId), EdgeInfo>,
}

impl Dsg {
    #[must_use]
    pub fn edge(&self, source: TransactionId, target: TransactionId) -> Option<&EdgeInfo> {
        self.edges.get(&(source, target))
    }

    fn add(&mut self, source: TransactionId, target: TransactionId, witness: DepWitness) {
        if source == target || source.is_root() || target.is_root() {
            return;
        }
        self.graph.add_edge(source, target);
        let info = self.edges.entry((source, target)).or_default();
        info.kinds.insert(witness.kind);
        if !info.witnesses.contains(&witness) {
            info.witnesses.push(witness);
        }
    }
}

/// A built DSG plus the version orders it rests on and the integrity
/// findings raised while building it.
#[derive(Debug, Clone)]
pub struct DsgBuild<K> {
    pub dsg: Dsg,
    /// Committed final writes per key, in inferred version order.
    pub orders: BTreeMap<K, Vec<(TransactionId, OpId)>>,
    pub warnings: Vec<IntegrityWarning<K>>,
}

/// Builds the DSG from a history and its read resolution.
#[must_use]
pub fn build<K, V>(history: &History<K, V>, resolution: &Resolution<K>) -> DsgBuild<K>
where
    K: Eq + Hash + Clone + Ord,
    V: Eq + Hash + Clone + Ord,
{
    let mut out = DsgBuild {
        dsg: Dsg::default(),
        orders: BTreeMap::new(),
        warnings: Vec::new(),
    };
    for transaction in history.committed() {
        out.dsg.graph.add_vertex(transaction.id);
    }

    // A key whose read could not be explained at all is withdrawn from the
    // graph entirely; the warning already marks the report incomplete.
    let tainted: HashSet<&K> = resolution
        .warnings
        .iter()
        .filter_map(|warning| match warning {
            IntegrityWarning::NoMatchingWrite { key, .. } => Some(key),
            _ => None,
        })
        .collect();

    // Committed final writes per key, initially in id order.
    let mut finals: BTreeMap<K, Vec<(TransactionId, OpId)>> = BTreeMap::new();
    for transaction in history.committed() {
        let mut last: BTreeMap<&K, OpId> = BTreeMap::new();
        for (op_id, key, _) in transaction.writes() {
            last.insert(key, op_id);
        }
        for (key, op_id) in last {
            finals
                .entry(key.clone())
                .or_default()
                .push((transaction.id, op_id));
        }
    }
    for writers in finals.values_mut() {
        writers.sort_unstable();
    }

    // Committed readers of each version, per key (the initial version reads
    // as the root transaction).
    let mut readers: BTreeMap<K, HashMap<TransactionId, BTreeSet<TransactionId>>> =
        BTreeMap::new();
    for (op_id, resolved) in &resolution.items {
        let version = match resolved.source {
            ResolvedSource::CommittedFinal(w) => w.txn,
            ResolvedSource::Initial => TransactionId::ROOT,
            _ => continue,
        };
        readers
            .entry(resolved.key.clone())
            .or_default()
            .entry(version)
            .or_default()
            .insert(op_id.txn);
    }

    for (key, writers) in finals {
        if tainted.contains(&key) {
            continue;
        }
        let key_readers = readers.get(&key);
        match version_order(history, resolution, &key, &writers, key_readers) {
            Some(order) => {
                out.orders.insert(key, order);
            }
            None => {
                out.warnings
                    .push(IntegrityWarning::VersionOrderConflict { key });
            }
        }
    }

    ww_edges(&mut out);
    wr_edges(&mut out, resolution);
    rw_edges(&mut out, resolution);
    prw_edges(&mut out, history, resolution);

    tracing::debug!(
        transactions = out.dsg.graph.vertex_count(),
        edges = out.dsg.edges.len(),
        conflicts = out.warnings.len(),
        "built serialization graph"
    );

    out
}

/// Infers the version order of one key's committed final writes.
///
/// Returns `None` when the observed reads are inconsistent with every total
/// order.
fn version_order<K, V>(
    history: &History<K, V>,
    resolution: &Resolution<K>,
    key: &K,
    writers: &[(TransactionId, OpId)],
    readers: Option<&HashMap<TransactionId, BTreeSet<TransactionId>>>,
) -> Option<Vec<(TransactionId, OpId)>>
where
    K: Eq + Hash + Clone + Ord,
    V: Eq + Hash + Clone + Ord,
{
    if writers.len() <= 1 {
        return Some(writers.to_vec());
    }

    // Commit-stamp order, when the adapter stamped every writer.
    let stamps: Option<Vec<(u64, TransactionId, OpId)>> = writers
        .iter()
        .map(|&(txn, op)| {
            history
                .transaction(txn)
                .and_then(|t| t.end)
                .map(|end| (end, txn, op))
        })
        .collect();
    if let Some(mut stamped) = stamps {
        stamped.sort_unstable();
        return Some(stamped.into_iter().map(|(_, txn, op)| (txn, op)).collect());
    }

    let writer_ids: HashSet<TransactionId> = writers.iter().map(|&(txn, _)| txn).collect();

    // Constraint graph: the root precedes every writer; a writer that read a
    // version of the key places its source before its own write; consecutive
    // reads of the key within one transaction order their sources.
    let mut constraints: DiGraph<TransactionId> = DiGraph::default();
    for &(txn, _) in writers {
        constraints.add_edge(TransactionId::ROOT, txn);
    }
    for transaction in history.committed() {
        let mut observed: Vec<TransactionId> = Vec::new();
        for (seq, op) in transaction.ops.iter().enumerate() {
            let Operation::Read { key: k, .. } = op else {
                continue;
            };
            if k != key {
                continue;
            }
            #[allow(clippy::cast_possible_truncation)]
            let op_id = OpId::new(transaction.id, seq as u32);
            let source = match resolution.items.get(&op_id).map(|r| r.source) {
                Some(ResolvedSource::CommittedFinal(w)) if writer_ids.contains(&w.txn) => w.txn,
                Some(ResolvedSource::Initial) => TransactionId::ROOT,
                _ => continue,
            };
            observed.push(source);
        }
        for pair in observed.windows(2) {
            if pair[0] != pair[1] {
                constraints.add_edge(pair[0], pair[1]);
            }
        }
        if writer_ids.contains(&transaction.id) {
            for &source in &observed {
                if source != transaction.id {
                    constraints.add_edge(source, transaction.id);
                }
            }
        }
    }

    greedy_linearize(&constraints, readers)
        .map(|order| {
            order
                .into_iter()
                .filter(|txn| !txn.is_root())
                .map(|txn| {
                    let &(_, op) = writers
                        .iter()
                        .find(|(t, _)| *t == txn)
                        .expect("linearized vertex is a writer");
                    (txn, op)
                })
                .collect()
        })
}

/// Kahn's algorithm over the constraint graph, choosing at every step the
/// ready candidate whose placement induces the fewest antidependency edges
/// against the previously placed version, ties broken by transaction id.
fn greedy_linearize(
    constraints: &DiGraph<TransactionId>,
    readers: Option<&HashMap<TransactionId, BTreeSet<TransactionId>>>,
) -> Option<Vec<TransactionId>> {
    let mut indegree: HashMap<TransactionId, usize> = HashMap::new();
    for vertex in constraints.adj_map.keys() {
        indegree.entry(*vertex).or_insert(0);
    }
    for targets in constraints.adj_map.values() {
        for target in targets {
            *indegree.entry(*target).or_insert(0) += 1;
        }
    }

    let mut ready: Vec<TransactionId> = indegree
        .iter()
        .filter(|(_, &degree)| degree == 0)
        .map(|(&vertex, _)| vertex)
        .collect();
    ready.sort_unstable();

    let mut order = Vec::with_capacity(indegree.len());
    let mut previous: Option<TransactionId> = None;

    while !ready.is_empty() {
        let cost = |candidate: TransactionId| -> usize {
            let Some(prev) = previous else { return 0 };
            readers
                .and_then(|r| r.get(&prev))
                .map_or(0, |set| set.iter().filter(|&&r| r != candidate).count())
        };
        let (position, _) = ready
            .iter()
            .enumerate()
            .min_by_key(|&(_, &candidate)| (cost(candidate), candidate))?;
        let chosen = ready.remove(position);
        order.push(chosen);
        previous = Some(chosen);

        for neighbor in constraints.neighbors(&chosen) {
            if let Some(degree) = indegree.get_mut(&neighbor) {
                *degree -= 1;
                if *degree == 0 {
                    let at = ready.binary_search(&neighbor).unwrap_or_else(|i| i);
                    ready.insert(at, neighbor);
                }
            }
        }
    }

    (order.len() == indegree.len()).then_some(order)
}

fn ww_edges<K>(out: &mut DsgBuild<K>)
where
    K: Ord,
{
    let mut witnesses = Vec::new();
    for order in out.orders.values() {
        for pair in order.windows(2) {
            witnesses.push((
                pair[0].0,
                pair[1].0,
                DepWitness {
                    kind: DepKind::Ww,
                    source: pair[0].1,
                    target: pair[1].1,
                },
            ));
        }
    }
    for (source, target, witness) in witnesses {
        out.dsg.add(source, target, witness);
    }
}

fn wr_edges<K>(out: &mut DsgBuild<K>, resolution: &Resolution<K>)
where
    K: Ord + Clone,
{
    let mut witnesses = Vec::new();
    for (op_id, resolved) in &resolution.items {
        if let ResolvedSource::CommittedFinal(write) = resolved.source {
            if out.orders.contains_key(&resolved.key) {
                witnesses.push((write.txn, op_id.txn, write, *op_id));
            }
        }
    }
    for (op_id, rows) in &resolution.predicate_rows {
        for (key, source) in rows {
            if let ResolvedSource::CommittedFinal(write) = source {
                if out.orders.contains_key(key) {
                    witnesses.push((write.txn, op_id.txn, *write, *op_id));
                }
            }
        }
    }
    for (source, target, write, read) in witnesses {
        out.dsg.add(
            source,
            target,
            DepWitness {
                kind: DepKind::Wr,
                source: write,
                target: read,
            },
        );
    }
}

fn rw_edges<K>(out: &mut DsgBuild<K>, resolution: &Resolution<K>)
where
    K: Ord + Clone,
{
    let mut witnesses = Vec::new();
    for (op_id, resolved) in &resolution.items {
        let Some(order) = out.orders.get(&resolved.key) else {
            continue;
        };
        let successor = match resolved.source {
            ResolvedSource::Initial => order.first(),
            ResolvedSource::CommittedFinal(write) => order
                .iter()
                .position(|&(txn, _)| txn == write.txn)
                .and_then(|i| order.get(i + 1)),
            _ => None,
        };
        if let Some(&(txn, write_op)) = successor {
            if txn != op_id.txn {
                witnesses.push((op_id.txn, txn, *op_id, write_op));
            }
        }
    }
    for (source, target, read, write) in witnesses {
        out.dsg.add(
            source,
            target,
            DepWitness {
                kind: DepKind::Rw,
                source: read,
                target: write,
            },
        );
    }
}

fn prw_edges<K, V>(out: &mut DsgBuild<K>, history: &History<K, V>, resolution: &Resolution<K>)
where
    K: Eq + Hash + Clone + Ord,
    V: Eq + Hash + Clone + Ord,
{
    let mut witnesses = Vec::new();
    for transaction in history.committed() {
        for (seq, op) in transaction.ops.iter().enumerate() {
            let Operation::PredicateRead {
                predicate,
                observed,
            } = op
            else {
                continue;
            };
            #[allow(clippy::cast_possible_truncation)]
            let op_id = OpId::new(transaction.id, seq as u32);

            // Returned rows: any overwrite of the observed version changes
            // the result (update or removal of a match).
            if let Some(rows) = resolution.predicate_rows.get(&op_id) {
                for (key, source) in rows {
                    let Some(order) = out.orders.get(key) else {
                        continue;
                    };
                    let successor = match source {
                        ResolvedSource::Initial => order.first(),
                        ResolvedSource::CommittedFinal(write) => order
                            .iter()
                            .position(|&(txn, _)| txn == write.txn)
                            .and_then(|i| order.get(i + 1)),
                        _ => None,
                    };
                    if let Some(&(txn, write_op)) = successor {
                        if txn != transaction.id {
                            witnesses.push((transaction.id, txn, op_id, write_op));
                        }
                    }
                }
            }

            // Unreturned keys: the read observed the latest version of the
            // key that fails the predicate (initial absence included); its
            // successor, if any, matches and would enter the result set.
            let returned: HashSet<&K> = observed.iter().map(|(key, _)| key).collect();
            for (key, order) in &out.orders {
                if returned.contains(key) {
                    continue;
                }
                let last_nonmatch = order.iter().rposition(|&(_, write)| {
                    write_value(history, write).is_some_and(|v| !predicate.matches(v))
                });
                let successor = match last_nonmatch {
                    Some(i) => order.get(i + 1),
                    None => {
                        let initial_matches = history
                            .initial(key)
                            .is_some_and(|v| predicate.matches(v));
                        if initial_matches {
                            // Every reachable version matches, yet the row
                            // was absent: nothing to anchor an edge.
                            None
                        } else {
                            order.first()
                        }
                    }
                };
                if let Some(&(txn, write_op)) = successor {
                    if txn != transaction.id {
                        witnesses.push((transaction.id, txn, op_id, write_op));
                    }
                }
            }
        }
    }
    for (source, target, read, write) in witnesses {
        out.dsg.add(
            source,
            target,
            DepWitness {
                kind: DepKind::Prw,
                source: read,
                target: write,
            },
        );
    }
}

fn write_value<'h, K, V>(history: &'h History<K, V>, write: OpId) -> Option<&'h V>
where
    K: Eq + Hash + Clone,
{
    match history.operation(write) {
        Some(Operation::Write { value, .. } | Operation::PredicateWrite { value, .. }) => {
            Some(value)
        }
        _ => None,
    }
}
