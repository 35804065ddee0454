//! # Scan Cursors
//!
//! Purpose: Wrap the store's scanner protocol in iterators that fetch rows
//! in small batches and release the server-side cursor on every exit path.
//!
//! ## Design Principles
//! 1. **RAII Release**: Dropping a scanner closes the cursor, covering early
//!    termination and mid-iteration errors.
//! 2. **Batched Laziness**: Rows arrive `batch_size` at a time; the full
//!    result set never sits in memory.
//! 3. **Fail Once**: After a fetch error the cursor is finished; iteration
//!    yields the error and then ends.

use std::collections::VecDeque;
use std::sync::Arc;

use bytes::Bytes;
use tracing::debug;

use cfkv_common::{FamilyName, Qualifier, RowKey, RowResult, StoreResult};
use cfkv_store::ScannerId;

use crate::connection::Connection;

/// Shared cursor plumbing for both scanner flavors.
struct ScanCursor {
    conn: Arc<Connection>,
    id: ScannerId,
    batch_size: usize,
    buffer: VecDeque<RowResult>,
    finished: bool,
    released: bool,
}

impl ScanCursor {
    fn new(conn: Arc<Connection>, id: ScannerId, batch_size: usize) -> Self {
        ScanCursor {
            conn,
            id,
            batch_size: batch_size.max(1),
            buffer: VecDeque::new(),
            finished: false,
            released: false,
        }
    }

    fn next_row(&mut self) -> Option<StoreResult<RowResult>> {
        if let Some(row) = self.buffer.pop_front() {
            return Some(Ok(row));
        }
        if self.finished {
            return None;
        }

        let fetch = self
            .conn
            .store()
            .and_then(|store| store.scanner_next(self.id, self.batch_size));
        match fetch {
            Ok(rows) if rows.is_empty() => {
                self.finished = true;
                self.release();
                None
            }
            Ok(rows) => {
                self.buffer.extend(rows);
                self.buffer.pop_front().map(Ok)
            }
            Err(err) => {
                self.finished = true;
                self.release();
                Some(Err(err))
            }
        }
    }

    fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        match self.conn.store() {
            Ok(store) => {
                if let Err(err) = store.close_scanner(self.id) {
                    debug!(scanner = self.id, error = %err, "scanner release failed");
                }
            }
            Err(_) => debug!(scanner = self.id, "connection closed before scanner release"),
        }
    }
}

impl Drop for ScanCursor {
    fn drop(&mut self) {
        self.release();
    }
}

/// Lazy single-column scan yielding `(row key, value)` in ascending key order.
///
/// The underlying cursor is released once the scan is exhausted, hits an
/// error, or the scanner is dropped.
pub struct ColumnScanner {
    cursor: ScanCursor,
    family: FamilyName,
    qualifier: Qualifier,
}

impl ColumnScanner {
    pub(crate) fn new(
        conn: Arc<Connection>,
        id: ScannerId,
        batch_size: usize,
        family: FamilyName,
        qualifier: Qualifier,
    ) -> Self {
        ColumnScanner {
            cursor: ScanCursor::new(conn, id, batch_size),
            family,
            qualifier,
        }
    }
}

impl Iterator for ColumnScanner {
    type Item = StoreResult<(RowKey, Bytes)>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.cursor.next_row()? {
                Ok(row) => {
                    // The store projects each row to the keyed column; a row
                    // that somehow lacks it has nothing to yield here.
                    if let Some(value) = row.value(&self.family, &self.qualifier) {
                        return Some(Ok((row.key, value)));
                    }
                }
                Err(err) => return Some(Err(err)),
            }
        }
    }
}

/// Lazy filtered scan yielding matching rows in full.
pub struct FilterScanner {
    cursor: ScanCursor,
}

impl FilterScanner {
    pub(crate) fn new(conn: Arc<Connection>, id: ScannerId, batch_size: usize) -> Self {
        FilterScanner {
            cursor: ScanCursor::new(conn, id, batch_size),
        }
    }
}

impl Iterator for FilterScanner {
    type Item = StoreResult<(RowKey, RowResult)>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.cursor.next_row()? {
            Ok(row) => Some(Ok((row.key.clone(), row))),
            Err(err) => Some(Err(err)),
        }
    }
}
