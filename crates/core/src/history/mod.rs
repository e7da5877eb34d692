//! The recorded history: immutable input to every analysis stage.

pub mod error;
pub mod types;

use alloc::vec::Vec;
use core::hash::Hash;

use hashbrown::HashSet;

use self::error::HistoryError;
use self::types::{OpId, Operation, Outcome, Transaction, TransactionId};

/// A recorded run: the initial transaction's write set plus every
/// transaction the workload issued.
///
/// The conventional initial transaction owns `init` -- the value of every
/// object before the workload ran; a key absent from `init` is a row that
/// did not exist. The history is treated as immutable for the lifetime of
/// the analysis, and all derived structures are deterministic functions of
/// it.
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct History<K, V> {
    pub init: Vec<(K, V)>,
    pub transactions: Vec<Transaction<K, V>>,
}

impl<K, V> History<K, V>
where
    K: Eq + Hash + Clone,
{
    /// Builds a history, rejecting structurally malformed input.
    ///
    /// # Errors
    ///
    /// Returns a [`HistoryError`] on duplicate transaction ids, use of the
    /// reserved initial-transaction id, or duplicate initial keys.
    pub fn new(
        init: Vec<(K, V)>,
        transactions: Vec<Transaction<K, V>>,
    ) -> Result<Self, HistoryError<K>> {
        let history = Self { init, transactions };
        history.validate()?;
        Ok(history)
    }

    /// Re-checks the structural invariants, e.g. after deserialization.
    ///
    /// # Errors
    ///
    /// Same conditions as [`History::new`].
    pub fn validate(&self) -> Result<(), HistoryError<K>> {
        let mut ids: HashSet<TransactionId> = HashSet::new();
        for transaction in &self.transactions {
            if transaction.id.is_root() {
                return Err(HistoryError::ReservedRootId);
            }
            if !ids.insert(transaction.id) {
                return Err(HistoryError::DuplicateTransaction { id: transaction.id });
            }
        }
        let mut keys: HashSet<&K> = HashSet::new();
        for (key, _) in &self.init {
            if !keys.insert(key) {
                return Err(HistoryError::DuplicateInitial { key: key.clone() });
            }
        }
        Ok(())
    }

    pub fn committed(&self) -> impl Iterator<Item = &Transaction<K, V>> {
        self.transactions
            .iter()
            .filter(|t| t.outcome == Outcome::Committed)
    }

    pub fn aborted(&self) -> impl Iterator<Item = &Transaction<K, V>> {
        self.transactions
            .iter()
            .filter(|t| t.outcome == Outcome::Aborted)
    }

    #[must_use]
    pub fn transaction(&self, id: TransactionId) -> Option<&Transaction<K, V>> {
        self.transactions.iter().find(|t| t.id == id)
    }

    #[must_use]
    pub fn operation(&self, id: OpId) -> Option<&Operation<K, V>> {
        self.transaction(id.txn).and_then(|t| t.op(id.seq))
    }

    /// The initial value of `key`, or `None` for an initially absent row.
    #[must_use]
    pub fn initial(&self, key: &K) -> Option<&V> {
        self.init
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    /// Every write to `key` across all transactions, in `OpId` order.
    ///
    /// Predicate writes contribute one entry per updated key they touched.
    #[must_use]
    pub fn writes_of(&self, key: &K) -> Vec<(OpId, &V)> {
        let mut writes = Vec::new();
        for transaction in &self.transactions {
            for (seq, op) in transaction.ops.iter().enumerate() {
                #[allow(clippy::cast_possible_truncation)]
                let op_id = OpId::new(transaction.id, seq as u32);
                match op {
                    Operation::Write { key: k, value } if k == key => {
                        writes.push((op_id, value));
                    }
                    Operation::PredicateWrite { value, updated, .. }
                        if updated.iter().any(|k| k == key) =>
                    {
                        writes.push((op_id, value));
                    }
                    _ => {}
                }
            }
        }
        writes.sort_by_key(|(id, _)| *id);
        writes
    }

    /// Every item read of `key` across all transactions, in `OpId` order.
    #[must_use]
    pub fn reads_of(&self, key: &K) -> Vec<(OpId, Option<&V>)> {
        let mut reads = Vec::new();
        for transaction in &self.transactions {
            for (seq, op) in transaction.ops.iter().enumerate() {
                if let Operation::Read { key: k, observed } = op {
                    if k == key {
                        #[allow(clippy::cast_possible_truncation)]
                        reads.push((OpId::new(transaction.id, seq as u32), observed.as_ref()));
                    }
                }
            }
        }
        reads.sort_by_key(|(id, _)| *id);
        reads
    }
}
