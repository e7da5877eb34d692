use crate::history::types::TransactionId;

/// Structural defect in a recorded history.
///
/// These are the only inputs the analysis refuses to process; everything
/// else, including every anomaly, is a finding rather than an error.
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HistoryError<K> {
    /// Two recorded transactions share an id.
    DuplicateTransaction { id: TransactionId },
    /// A recorded transaction uses the id reserved for the initial
    /// transaction.
    ReservedRootId,
    /// The initial write set contains the same key twice.
    DuplicateInitial { key: K },
}
