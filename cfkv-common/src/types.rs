//! # Row and Column Type Definitions
//!
//! Core value types for addressing cells in a column-family table, validated
//! at construction so malformed names never reach the store.
//!
//! ## Design Principles
//!
//! 1. **Validated Newtypes**: `TableName`, `FamilyName`, and `Qualifier` wrap
//!    strings that have already passed the store's naming rules, so the rest
//!    of the stack can take them at face value.
//!
//! 2. **Byte-Wise Row Order**: `RowKey` is an opaque byte sequence whose `Ord`
//!    is plain byte comparison, matching the store's native ascending row
//!    order. Sorted containers keyed by `RowKey` iterate in scan order.
//!
//! 3. **Cheap Clones**: Values ride in `bytes::Bytes`, so moving cells between
//!    scanner batches and callers never copies the payload.
//!
//! ## Naming Rules
//!
//! Names must be non-empty printable ASCII and must not contain `:`, which
//! the store reserves as the family/qualifier separator.

use std::fmt;

use bytes::Bytes;

use crate::error::{StoreError, StoreResult};

fn validate_name(kind: &'static str, name: &str) -> StoreResult<()> {
    if name.is_empty() {
        return Err(StoreError::InvalidName {
            kind,
            reason: "name is empty".to_string(),
        });
    }
    for ch in name.chars() {
        if !ch.is_ascii_graphic() {
            return Err(StoreError::InvalidName {
                kind,
                reason: format!("character {ch:?} is not printable ascii"),
            });
        }
        if ch == ':' {
            return Err(StoreError::InvalidName {
                kind,
                reason: "name contains the reserved separator ':'".to_string(),
            });
        }
    }
    Ok(())
}

/// Validated table name.
///
/// Tables are addressed by name for their whole lifetime, so the name is
/// checked once here instead of at every store call.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TableName(String);

impl TableName {
    /// Creates a table name, rejecting empty or non-printable input.
    pub fn new(name: impl Into<String>) -> StoreResult<Self> {
        let name = name.into();
        validate_name("table", &name)?;
        Ok(TableName(name))
    }

    /// Returns the name as a string slice.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for TableName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Validated column-family name.
///
/// Families are declared at table creation and immutable afterwards.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FamilyName(String);

impl FamilyName {
    /// Creates a family name, rejecting empty or non-printable input.
    pub fn new(name: impl Into<String>) -> StoreResult<Self> {
        let name = name.into();
        validate_name("family", &name)?;
        Ok(FamilyName(name))
    }

    /// Returns the name as a string slice.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FamilyName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Validated column qualifier within a family.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Qualifier(String);

impl Qualifier {
    /// Creates a qualifier, rejecting empty or non-printable input.
    pub fn new(name: impl Into<String>) -> StoreResult<Self> {
        let name = name.into();
        validate_name("qualifier", &name)?;
        Ok(Qualifier(name))
    }

    /// Returns the qualifier as a string slice.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Qualifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Row key: a non-empty opaque byte sequence.
///
/// Ordering is byte-wise, which is the order scans return rows in.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RowKey(Bytes);

impl RowKey {
    /// Creates a row key from raw bytes, rejecting empty input.
    pub fn new(key: impl Into<Bytes>) -> StoreResult<Self> {
        let key = key.into();
        if key.is_empty() {
            return Err(StoreError::InvalidName {
                kind: "row key",
                reason: "key is empty".to_string(),
            });
        }
        Ok(RowKey(key))
    }

    /// Creates a row key from a decimal identifier, e.g. `1` -> `b"1"`.
    pub fn from_id(id: u64) -> Self {
        RowKey(crate::codec::encode_row_id(id))
    }

    /// Returns the key bytes.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for RowKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RowKey({:?})", String::from_utf8_lossy(&self.0))
    }
}

impl fmt::Display for RowKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(&self.0))
    }
}

/// One cell write: coordinates plus value.
///
/// This is the unit of `put`; each cell is written independently.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellPut {
    /// Row the cell belongs to (created implicitly when absent).
    pub row: RowKey,
    /// Declared column family the cell is grouped under.
    pub family: FamilyName,
    /// Column qualifier within the family.
    pub qualifier: Qualifier,
    /// Opaque cell value.
    pub value: Bytes,
}

impl CellPut {
    /// Builds a cell write for the provided coordinates.
    pub fn new(
        row: RowKey,
        family: FamilyName,
        qualifier: Qualifier,
        value: impl Into<Bytes>,
    ) -> Self {
        CellPut {
            row,
            family,
            qualifier,
            value: value.into(),
        }
    }
}

/// One cell as returned by reads: coordinates, value, and write timestamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowCell {
    pub family: FamilyName,
    pub qualifier: Qualifier,
    pub value: Bytes,
    /// Logical write timestamp assigned by the store; later writes to the
    /// same coordinates carry larger timestamps.
    pub timestamp: u64,
}

/// A materialized row as returned by scans and filters.
///
/// Cells appear in `(family, qualifier)` order. Projected scans carry only
/// the selected column; filters carry the full row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowResult {
    pub key: RowKey,
    pub cells: Vec<RowCell>,
}

impl RowResult {
    /// Returns the value at `(family, qualifier)`, if the row has that cell.
    pub fn value(&self, family: &FamilyName, qualifier: &Qualifier) -> Option<Bytes> {
        self.cells
            .iter()
            .find(|cell| cell.family == *family && cell.qualifier == *qualifier)
            .map(|cell| cell.value.clone())
    }
}
