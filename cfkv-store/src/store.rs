//! # Row Store Contract
//!
//! Purpose: Define the operations a column-family row store exposes to
//! clients, keeping callers decoupled from any concrete backend.
//!
//! ## Design Principles
//! 1. **Strategy Pattern**: `RowStore` lets backends swap without touching callers.
//! 2. **Cursor-Based Scans**: Results stream through a scanner id; no call ever
//!    returns the full result set.
//! 3. **Typed Transitions**: Admin operations fail with typed errors that name
//!    the table and the violated precondition.
//! 4. **Independent Cell Writes**: `put_cell` writes exactly one cell, so batch
//!    semantics are the caller's to define.

use std::collections::BTreeSet;

use bytes::Bytes;

use cfkv_common::{
    CellPut, FamilyName, Qualifier, RowKey, RowResult, StoreResult, TableName,
};

/// Opaque handle to a server-side scanner.
pub type ScannerId = u64;

/// What a scanner selects and returns.
#[derive(Debug, Clone)]
pub struct ScanSpec {
    /// Family of the column the scan is keyed on.
    pub family: FamilyName,
    /// Qualifier of the column the scan is keyed on.
    pub qualifier: Qualifier,
    /// Optional regular-expression filter applied to the keyed column's
    /// value. The match is unanchored, so the pattern may hit anywhere in
    /// the value.
    pub filter: Option<String>,
    /// When true, matching rows come back in full; otherwise each row is
    /// projected to the keyed column only.
    pub full_rows: bool,
}

impl ScanSpec {
    /// Projected single-column scan with no filter.
    pub fn column(family: FamilyName, qualifier: Qualifier) -> Self {
        ScanSpec {
            family,
            qualifier,
            filter: None,
            full_rows: false,
        }
    }

    /// Full-row scan keeping only rows whose keyed column matches `pattern`.
    pub fn filtered(
        family: FamilyName,
        qualifier: Qualifier,
        pattern: impl Into<String>,
    ) -> Self {
        ScanSpec {
            family,
            qualifier,
            filter: Some(pattern.into()),
            full_rows: true,
        }
    }
}

/// Operations a column-family row store exposes to clients.
///
/// Tables move through `Absent -> Enabled -> Disabled -> Absent`; only an
/// enabled table serves reads, writes, and scans.
pub trait RowStore: Send + Sync {
    /// Liveness probe. Fails with `Unavailable` when the store cannot serve.
    fn ping(&self) -> StoreResult<()>;

    /// Returns whether the table exists in any state.
    fn table_exists(&self, table: &TableName) -> StoreResult<bool>;

    /// Declares a table with the given column families and enables it.
    ///
    /// Families are immutable once the table exists. Fails with
    /// `AlreadyExists` when the table is present and `PreconditionFailed`
    /// when the family set is empty.
    fn create_table(&self, table: &TableName, families: &BTreeSet<FamilyName>)
        -> StoreResult<()>;

    /// Stops serving the table (`Enabled -> Disabled`).
    ///
    /// Fails with `NoSuchTable` when absent and `PreconditionFailed` when
    /// the table is not enabled.
    fn disable_table(&self, table: &TableName) -> StoreResult<()>;

    /// Removes a disabled table (`Disabled -> Absent`).
    ///
    /// Fails with `NoSuchTable` when absent and `PreconditionFailed` while
    /// the table is still enabled; the store never deletes a serving table.
    fn delete_table(&self, table: &TableName) -> StoreResult<()>;

    /// Writes one cell, overwriting any value at the same coordinates and
    /// creating the row when absent.
    ///
    /// Fails with `PreconditionFailed` when the family was not declared at
    /// table creation.
    fn put_cell(&self, table: &TableName, cell: &CellPut) -> StoreResult<()>;

    /// Point lookup. A missing cell is `Ok(None)`, not an error.
    fn get(
        &self,
        table: &TableName,
        row: &RowKey,
        family: &FamilyName,
        qualifier: &Qualifier,
    ) -> StoreResult<Option<Bytes>>;

    /// Opens a scanner over the table and returns its id.
    ///
    /// The scanner is a server-side resource; the caller must release it
    /// with [`close_scanner`](RowStore::close_scanner) once done.
    fn open_scanner(&self, table: &TableName, spec: &ScanSpec) -> StoreResult<ScannerId>;

    /// Fetches at most `max` further rows in ascending row-key order.
    ///
    /// An empty result means the scan is exhausted. The cursor resumes
    /// after the last examined key, so a retried call never replays rows.
    fn scanner_next(&self, id: ScannerId, max: usize) -> StoreResult<Vec<RowResult>>;

    /// Releases a scanner. Fails with `ScannerExpired` for unknown ids.
    fn close_scanner(&self, id: ScannerId) -> StoreResult<()>;
}
