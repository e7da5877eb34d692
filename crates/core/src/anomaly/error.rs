use ::derive_more::From;

use crate::history::error::HistoryError;
use crate::history::types::OpId;

/// Error aborting an analysis run.
///
/// Anomalies are never errors; the analysis fails only on input that
/// violates the history invariants.
#[derive(Debug, From)]
pub enum Error<K> {
    /// The history is structurally malformed.
    Malformed(HistoryError<K>),
}

/// Non-fatal integrity finding surfaced alongside the report.
///
/// Any of these marks the report incomplete: the analysis continued, but
/// the affected reads or objects were excluded from the serialization graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntegrityWarning<K> {
    /// A read observed a value no write in the history produced.
    NoMatchingWrite { read: OpId, key: K },
    /// A read is explained only by a write whose transaction outcome is
    /// unknown.
    UnknownSource { read: OpId, write: OpId },
    /// The observed reads of `key` admit no total version order.
    VersionOrderConflict { key: K },
}

impl<K> core::fmt::Display for IntegrityWarning<K>
where
    K: core::fmt::Display,
{
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        match self {
            Self::NoMatchingWrite { read, key } => {
                write!(f, "read {read} of {key} matches no write")
            }
            Self::UnknownSource { read, write } => {
                write!(f, "read {read} matches only {write}, whose outcome is unknown")
            }
            Self::VersionOrderConflict { key } => {
                write!(f, "reads of {key} admit no total version order")
            }
        }
    }
}
