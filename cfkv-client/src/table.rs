//! # Table Client
//!
//! Purpose: Expose a compact API for table administration and row access
//! over an established connection.
//!
//! ## Design Principles
//! 1. **Facade Pattern**: `TableClient` hides the scanner protocol and admin
//!    ordering behind one-call operations.
//! 2. **Absence Is Normal**: `get` returns `Ok(None)` on a missing cell.
//! 3. **Safe Deletion**: `delete` disables before deleting and no-ops on an
//!    absent table.
//! 4. **Independent Writes**: `put` applies cells in order; a failure reports
//!    how many were written.

use std::collections::BTreeSet;
use std::sync::Arc;

use bytes::Bytes;
use serde::Deserialize;
use tracing::info;

use cfkv_common::{
    CellPut, FamilyName, Qualifier, RowKey, StoreError, StoreResult, TableName,
};
use cfkv_store::ScanSpec;

use crate::connection::Connection;
use crate::scanner::{ColumnScanner, FilterScanner};

/// Rows fetched per scanner round trip unless configured otherwise.
pub const DEFAULT_SCAN_BATCH_SIZE: usize = 16;

/// Configuration for the table client.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Rows fetched per scanner round trip.
    pub scan_batch_size: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            scan_batch_size: DEFAULT_SCAN_BATCH_SIZE,
        }
    }
}

/// Client for one named table over an established connection.
///
/// This is a facade over the store trait: each call borrows the connection,
/// issues one logical operation, and maps outcomes to typed results.
pub struct TableClient {
    conn: Arc<Connection>,
    table: TableName,
    config: ClientConfig,
}

impl TableClient {
    /// Creates a client with default configuration.
    pub fn new(conn: Arc<Connection>, table: TableName) -> Self {
        Self::with_config(conn, table, ClientConfig::default())
    }

    /// Creates a client with a custom configuration.
    pub fn with_config(conn: Arc<Connection>, table: TableName, config: ClientConfig) -> Self {
        TableClient {
            conn,
            table,
            config,
        }
    }

    /// Returns the table this client addresses.
    pub fn table(&self) -> &TableName {
        &self.table
    }

    /// Declares the table with the given column families and enables it.
    ///
    /// Fails with `AlreadyExists` when the table is present; see
    /// [`create_if_absent`](TableClient::create_if_absent) for the
    /// idempotent variant.
    pub fn create(&self, families: &[FamilyName]) -> StoreResult<()> {
        let set: BTreeSet<FamilyName> = families.iter().cloned().collect();
        self.conn.store()?.create_table(&self.table, &set)
    }

    /// Idempotent create: no-ops when the table already exists.
    ///
    /// Returns true when this call created the table.
    pub fn create_if_absent(&self, families: &[FamilyName]) -> StoreResult<bool> {
        match self.create(families) {
            Ok(()) => Ok(true),
            Err(StoreError::AlreadyExists(_)) => Ok(false),
            Err(err) => Err(err),
        }
    }

    /// Writes each cell in order, overwriting existing values at the same
    /// coordinates.
    ///
    /// Cell writes are independent, not atomic: when one fails, the cells
    /// before it remain applied and the error carries their count.
    pub fn put<I>(&self, cells: I) -> StoreResult<()>
    where
        I: IntoIterator<Item = CellPut>,
    {
        let store = self.conn.store()?;
        let mut applied = 0usize;
        for cell in cells {
            store
                .put_cell(&self.table, &cell)
                .map_err(|err| StoreError::PutAborted {
                    applied,
                    source: Box::new(err),
                })?;
            applied += 1;
        }
        Ok(())
    }

    /// Point lookup.
    ///
    /// A coordinate with no cell is a normal outcome: `Ok(None)`.
    pub fn get(
        &self,
        row: &RowKey,
        family: &FamilyName,
        qualifier: &Qualifier,
    ) -> StoreResult<Option<Bytes>> {
        self.conn.store()?.get(&self.table, row, family, qualifier)
    }

    /// Opens a lazy scan over one column, ascending by row key.
    pub fn scan(&self, family: &FamilyName, qualifier: &Qualifier) -> StoreResult<ColumnScanner> {
        let spec = ScanSpec::column(family.clone(), qualifier.clone());
        let id = self.conn.store()?.open_scanner(&self.table, &spec)?;
        Ok(ColumnScanner::new(
            self.conn.clone(),
            id,
            self.config.scan_batch_size,
            family.clone(),
            qualifier.clone(),
        ))
    }

    /// Opens a lazy scan yielding the rows whose column value matches the
    /// regular expression `pattern` (unanchored match).
    pub fn filter(
        &self,
        family: &FamilyName,
        qualifier: &Qualifier,
        pattern: &str,
    ) -> StoreResult<FilterScanner> {
        let spec = ScanSpec::filtered(family.clone(), qualifier.clone(), pattern);
        let id = self.conn.store()?.open_scanner(&self.table, &spec)?;
        Ok(FilterScanner::new(
            self.conn.clone(),
            id,
            self.config.scan_batch_size,
        ))
    }

    /// Deletes the table.
    ///
    /// No-op when the table is absent. Otherwise the table is disabled
    /// first; the store rejects deleting a serving table.
    pub fn delete(&self) -> StoreResult<()> {
        let store = self.conn.store()?;
        if !store.table_exists(&self.table)? {
            return Ok(());
        }
        match store.disable_table(&self.table) {
            Ok(()) => {}
            // Already disabled: deletion can proceed.
            Err(StoreError::PreconditionFailed { .. }) => {}
            Err(err) => return Err(err),
        }
        store.delete_table(&self.table)?;
        info!(table = %self.table, "disabled and deleted table");
        Ok(())
    }
}
