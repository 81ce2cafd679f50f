//! Typed entries for the generic tied cache.
//!
//! A tied entry is any per-revision value whose validity depends on a set of addresses or
//! storage keys ("ties"): code, storage words, simulated calls, log filters. Keys are a closed
//! enum and values a tagged union, so a lookup can never hand back a value of the wrong shape.

use crate::{Code, EventLog, Storage, TransferLog, VmOutput};
use alloy_primitives::{Address, B256};
use std::fmt;

/// Key of a tied cache entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TiedKey {
    /// Code of an account.
    Code(Address),
    /// One storage word of an account.
    Storage(Address, B256),
    /// A simulated call, keyed by the digest of its arguments.
    Explain(B256),
    /// An event-log filter, keyed by the digest of its criteria.
    EventFilter(B256),
    /// A transfer-log filter, keyed by the digest of its criteria.
    TransferFilter(B256),
}

impl fmt::Display for TiedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Code(addr) => write!(f, "code-{addr:#x}"),
            Self::Storage(addr, key) => write!(f, "storage-{addr:#x}-{key}"),
            Self::Explain(digest) => write!(f, "explain-{digest:x}"),
            Self::EventFilter(digest) => write!(f, "event-{digest:x}"),
            Self::TransferFilter(digest) => write!(f, "transfer-{digest:x}"),
        }
    }
}

/// Value of a tied cache entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TiedValue {
    /// Account code.
    Code(Code),
    /// A storage word.
    Storage(Storage),
    /// Outputs of a simulated call.
    Explain(Vec<VmOutput>),
    /// Events matched by a filter.
    EventLogs(Vec<EventLog>),
    /// Transfers matched by a filter.
    TransferLogs(Vec<TransferLog>),
}

/// A concrete type that can be stored in the tied cache.
pub trait TiedEntry: Sized + Clone {
    /// Wraps `self` into a [`TiedValue`].
    fn into_tied(self) -> TiedValue;

    /// Unwraps a cached [`TiedValue`]; `None` if it holds a different variant.
    fn from_tied(value: &TiedValue) -> Option<Self>;
}

macro_rules! impl_tied_entry {
    ($ty:ty, $variant:ident) => {
        impl TiedEntry for $ty {
            fn into_tied(self) -> TiedValue {
                TiedValue::$variant(self)
            }

            fn from_tied(value: &TiedValue) -> Option<Self> {
                match value {
                    TiedValue::$variant(inner) => Some(inner.clone()),
                    _ => None,
                }
            }
        }
    };
}

impl_tied_entry!(Code, Code);
impl_tied_entry!(Storage, Storage);
impl_tied_entry!(Vec<VmOutput>, Explain);
impl_tied_entry!(Vec<EventLog>, EventLogs);
impl_tied_entry!(Vec<TransferLog>, TransferLogs);
