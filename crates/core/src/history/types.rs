use alloc::vec::Vec;
use core::fmt::{self, Debug, Display, Formatter};

/// Identifies a transaction within a history.
///
/// Id `0` is reserved for the conventional initial transaction that installed
/// every object's starting value; recorded transactions must use non-zero ids.
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TransactionId(pub u64);

impl TransactionId {
    pub const ROOT: Self = Self(0);

    #[must_use]
    pub const fn is_root(self) -> bool {
        self.0 == 0
    }
}

impl Display for TransactionId {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "T{}", self.0)
    }
}

/// Addresses one operation: transaction id plus the operation's position
/// within that transaction.
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct OpId {
    pub txn: TransactionId,
    pub seq: u32,
}

impl OpId {
    #[must_use]
    pub const fn new(txn: TransactionId, seq: u32) -> Self {
        Self { txn, seq }
    }
}

impl Display for OpId {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "{}.{}", self.txn, self.seq)
    }
}

/// Terminal outcome of a transaction, as reported by the adapter.
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    Committed,
    Aborted,
    /// The adapter could not determine whether the commit took effect.
    Unknown,
}

/// Row filter evaluated by predicate operations.
///
/// Predicates range over values; a row absent from the database matches no
/// predicate.
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Predicate<V> {
    Eq(V),
    Ne(V),
    Gt(V),
    Lt(V),
    Any,
}

impl<V> Predicate<V>
where
    V: Ord,
{
    #[must_use]
    pub fn matches(&self, value: &V) -> bool {
        match self {
            Self::Eq(v) => value == v,
            Self::Ne(v) => value != v,
            Self::Gt(v) => value > v,
            Self::Lt(v) => value < v,
            Self::Any => true,
        }
    }
}

impl<V> Display for Predicate<V>
where
    V: Display,
{
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            Self::Eq(v) => write!(f, "={v}"),
            Self::Ne(v) => write!(f, "!={v}"),
            Self::Gt(v) => write!(f, ">{v}"),
            Self::Lt(v) => write!(f, "<{v}"),
            Self::Any => write!(f, "*"),
        }
    }
}

/// A single operation within a transaction.
///
/// Reads record the observed result; `observed: None` is a row the database
/// reported absent. A predicate write records the keys the statement actually
/// touched, each of which behaves as a write of `value` to that key.
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation<K, V> {
    Read {
        key: K,
        observed: Option<V>,
    },
    Write {
        key: K,
        value: V,
    },
    PredicateRead {
        predicate: Predicate<V>,
        observed: Vec<(K, V)>,
    },
    PredicateWrite {
        predicate: Predicate<V>,
        value: V,
        updated: Vec<K>,
    },
}

impl<K, V> Operation<K, V> {
    pub const fn read(key: K, value: V) -> Self {
        Self::Read {
            key,
            observed: Some(value),
        }
    }

    pub const fn read_absent(key: K) -> Self {
        Self::Read {
            key,
            observed: None,
        }
    }

    pub const fn write(key: K, value: V) -> Self {
        Self::Write { key, value }
    }

    pub const fn predicate_read(predicate: Predicate<V>, observed: Vec<(K, V)>) -> Self {
        Self::PredicateRead {
            predicate,
            observed,
        }
    }

    pub const fn predicate_write(predicate: Predicate<V>, value: V, updated: Vec<K>) -> Self {
        Self::PredicateWrite {
            predicate,
            value,
            updated,
        }
    }
}

impl<K, V> Display for Operation<K, V>
where
    K: Display,
    V: Display,
{
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            Self::Read { key, observed } => {
                if let Some(value) = observed {
                    write!(f, "{key}=={value}")
                } else {
                    write!(f, "{key}==-")
                }
            }
            Self::Write { key, value } => write!(f, "{key}:={value}"),
            Self::PredicateRead {
                predicate,
                observed,
            } => {
                write!(f, "({predicate})==")?;
                write!(f, "{{")?;
                for (i, (key, value)) in observed.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{key}:{value}")?;
                }
                write!(f, "}}")
            }
            Self::PredicateWrite {
                predicate,
                value,
                updated,
            } => {
                write!(f, "({predicate}):={value}@{{")?;
                for (i, key) in updated.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{key}")?;
                }
                write!(f, "}}")
            }
        }
    }
}

/// An ordered operation list with a terminal outcome.
///
/// `start`/`end` are optional adapter-supplied wall-clock stamps
/// (microseconds). They are used for tie-breaking and rendering only, never
/// for correctness.
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction<K, V> {
    pub id: TransactionId,
    pub ops: Vec<Operation<K, V>>,
    pub outcome: Outcome,
    pub start: Option<u64>,
    pub end: Option<u64>,
}

impl<K, V> Transaction<K, V> {
    #[must_use]
    pub const fn new(id: TransactionId, ops: Vec<Operation<K, V>>, outcome: Outcome) -> Self {
        Self {
            id,
            ops,
            outcome,
            start: None,
            end: None,
        }
    }

    #[must_use]
    pub const fn committed(id: TransactionId, ops: Vec<Operation<K, V>>) -> Self {
        Self::new(id, ops, Outcome::Committed)
    }

    #[must_use]
    pub const fn aborted(id: TransactionId, ops: Vec<Operation<K, V>>) -> Self {
        Self::new(id, ops, Outcome::Aborted)
    }

    #[must_use]
    pub const fn with_stamps(mut self, start: u64, end: u64) -> Self {
        self.start = Some(start);
        self.end = Some(end);
        self
    }

    #[must_use]
    pub const fn is_committed(&self) -> bool {
        matches!(self.outcome, Outcome::Committed)
    }

    #[must_use]
    pub fn op(&self, seq: u32) -> Option<&Operation<K, V>> {
        self.ops.get(seq as usize)
    }

    /// All writes of the transaction as `(op, key, value)`, predicate writes
    /// expanded to their updated keys.
    pub fn writes(&self) -> impl Iterator<Item = (OpId, &K, &V)> {
        self.ops.iter().enumerate().flat_map(move |(seq, op)| {
            #[allow(clippy::cast_possible_truncation)]
            let op_id = OpId::new(self.id, seq as u32);
            let expanded: Vec<(OpId, &K, &V)> = match op {
                Operation::Write { key, value } => alloc::vec![(op_id, key, value)],
                Operation::PredicateWrite { value, updated, .. } => {
                    updated.iter().map(|key| (op_id, key, value)).collect()
                }
                _ => Vec::new(),
            };
            expanded
        })
    }
}

impl<K, V> Display for Transaction<K, V>
where
    K: Display,
    V: Display,
{
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "{}[", self.id)?;
        for (i, op) in self.ops.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{op}")?;
        }
        write!(f, "]")?;
        match self.outcome {
            Outcome::Committed => Ok(()),
            Outcome::Aborted => write!(f, "!"),
            Outcome::Unknown => write!(f, "?"),
        }
    }
}
