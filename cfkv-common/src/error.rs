//! # Error Taxonomy
//!
//! Purpose: Define the typed failures shared by the store backend and the
//! client so callers can match on outcomes instead of parsing messages.
//!
//! ## Design Principles
//! 1. **Absence Is Not Failure**: A point lookup miss is `Ok(None)`, never an error.
//! 2. **Typed Admin Failures**: State-machine violations carry the table name.
//! 3. **Cause Preservation**: `Unavailable` keeps the underlying reason text.
//! 4. **Single Result Alias**: `StoreResult<T>` keeps signatures uniform across crates.

use thiserror::Error;

use crate::types::TableName;

/// Result type shared by the store and client crates.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors surfaced by the store backend and the client layers.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store is unreachable or failed its liveness probe.
    #[error("store unavailable: {reason}")]
    Unavailable { reason: String },

    /// Create was issued for a table that already exists.
    #[error("table {0} already exists")]
    AlreadyExists(TableName),

    /// The addressed table does not exist.
    #[error("table {0} does not exist")]
    NoSuchTable(TableName),

    /// The table exists but is not serving reads or writes.
    #[error("table {0} is not enabled")]
    TableNotEnabled(TableName),

    /// An admin operation was attempted out of order, or against an
    /// undeclared column family.
    #[error("precondition failed for table {table}: {reason}")]
    PreconditionFailed { table: TableName, reason: String },

    /// A name failed validation before reaching the store.
    #[error("invalid {kind} name: {reason}")]
    InvalidName {
        kind: &'static str,
        reason: String,
    },

    /// A filter pattern failed to compile.
    #[error("invalid filter pattern: {0}")]
    InvalidPattern(String),

    /// Value encoding or decoding failed.
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// The connection was explicitly closed.
    #[error("connection is closed")]
    ConnectionClosed,

    /// A scanner id is unknown to the store or was already released.
    #[error("scanner {0} expired or was released")]
    ScannerExpired(u64),

    /// A multi-cell put stopped partway through; the first `applied` cells
    /// were written and remain in the table.
    #[error("put aborted after {applied} cell(s): {source}")]
    PutAborted {
        applied: usize,
        #[source]
        source: Box<StoreError>,
    },
}

impl StoreError {
    /// Builds an `Unavailable` error from any displayable cause.
    pub fn unavailable(reason: impl Into<String>) -> Self {
        StoreError::Unavailable {
            reason: reason.into(),
        }
    }
}

/// Codec failures for the scalar encodings.
///
/// Decoding is strict: anything that would not round-trip back to the same
/// byte string is rejected.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// Decode input was empty where a value is required.
    #[error("input is empty")]
    Empty,

    /// Decode input is not valid UTF-8.
    #[error("input is not valid utf-8")]
    InvalidUtf8,

    /// A row id byte is outside `0..=9`.
    #[error("row id contains a non-digit byte")]
    InvalidDigit,

    /// A row id carries a redundant leading zero.
    #[error("row id has a redundant leading zero")]
    LeadingZero,

    /// A row id does not fit in 64 bits.
    #[error("row id exceeds 64 bits")]
    Overflow,
}
