//! # In-Memory Row Store
//!
//! Provide the reference in-process backend with the full table state
//! machine, byte-ordered rows, and resumable server-side scanners.
//!
//! ## Usage
//!
//! - Use `MemoryStore::new()` for an empty store.
//! - Use `poison`/`heal` to simulate an unreachable store; every operation
//!   except scanner release then reports `Unavailable`.
//!
//! ## Design Principles
//!
//! 1. **Ordered Rows**: Rows live in a `BTreeMap` keyed by `RowKey`, so scans
//!    walk the store's native ascending order for free.
//! 2. **Resumable Scanners**: A scanner records only the last examined key and
//!    re-reads the live table from there; no result set is ever materialized.
//! 3. **Latest Write Wins**: A store-wide logical clock stamps each cell write;
//!    overwriting a coordinate replaces value and timestamp.
//! 4. **Strategy Pattern**: Implements `RowStore` to keep callers decoupled.
//!
//! ## Structure Overview
//!
//! ```text
//! MemoryStore
//!   ├── tables: RwLock<HashMap<TableName, TableData>>
//!   │     └── TableData { families, state, rows }
//!   │           └── rows: BTreeMap<RowKey, RowCells>
//!   │                 └── RowCells: BTreeMap<(FamilyName, Qualifier), CellData>
//!   ├── scanners: Mutex<HashMap<ScannerId, ScannerState>>
//!   ├── next_scanner_id: AtomicU64
//!   ├── clock: AtomicU64
//!   └── poisoned: AtomicBool
//! ```

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::ops::Bound;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use bytes::Bytes;
use parking_lot::{Mutex, RwLock};
use regex::bytes::Regex;
use tracing::{debug, info};

use cfkv_common::{
    CellPut, FamilyName, Qualifier, RowCell, RowKey, RowResult, StoreError, StoreResult,
    TableName,
};

use crate::store::{RowStore, ScanSpec, ScannerId};

/// Table serving state; only `Enabled` accepts reads and writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TableState {
    Enabled,
    Disabled,
}

/// One stored cell: value plus the logical timestamp of its write.
#[derive(Debug, Clone)]
struct CellData {
    value: Bytes,
    timestamp: u64,
}

type RowCells = BTreeMap<(FamilyName, Qualifier), CellData>;

#[derive(Debug)]
struct TableData {
    families: BTreeSet<FamilyName>,
    state: TableState,
    rows: BTreeMap<RowKey, RowCells>,
}

/// Server-side cursor state.
///
/// `resume_after` is the last examined row key; the next fetch re-reads the
/// live table strictly after it, which keeps the cursor restartable under
/// retry and the memory footprint independent of table size.
struct ScannerState {
    table: TableName,
    family: FamilyName,
    qualifier: Qualifier,
    filter: Option<Regex>,
    full_rows: bool,
    resume_after: Option<RowKey>,
}

/// In-memory reference implementation of [`RowStore`].
pub struct MemoryStore {
    tables: RwLock<HashMap<TableName, TableData>>,
    scanners: Mutex<HashMap<ScannerId, ScannerState>>,
    next_scanner_id: AtomicU64,
    clock: AtomicU64,
    poisoned: AtomicBool,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        MemoryStore {
            tables: RwLock::new(HashMap::new()),
            scanners: Mutex::new(HashMap::new()),
            next_scanner_id: AtomicU64::new(0),
            clock: AtomicU64::new(0),
            poisoned: AtomicBool::new(false),
        }
    }

    /// Marks the store unreachable; operations report `Unavailable` until
    /// [`heal`](MemoryStore::heal) is called.
    pub fn poison(&self) {
        self.poisoned.store(true, Ordering::SeqCst);
    }

    /// Clears the unreachable mark set by [`poison`](MemoryStore::poison).
    pub fn heal(&self) {
        self.poisoned.store(false, Ordering::SeqCst);
    }

    /// Number of scanners that have been opened and not yet released.
    ///
    /// A non-zero count after all scans completed means a caller leaked a
    /// cursor.
    pub fn active_scanner_count(&self) -> usize {
        self.scanners.lock().len()
    }

    fn check_available(&self) -> StoreResult<()> {
        if self.poisoned.load(Ordering::SeqCst) {
            return Err(StoreError::unavailable("store is not reachable"));
        }
        Ok(())
    }

    fn next_timestamp(&self) -> u64 {
        self.clock.fetch_add(1, Ordering::SeqCst) + 1
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        MemoryStore::new()
    }
}

/// Builds the outgoing row for a scanner hit.
fn materialize_row(
    key: &RowKey,
    cells: &RowCells,
    family: &FamilyName,
    qualifier: &Qualifier,
    full_rows: bool,
) -> RowResult {
    let selected: Vec<RowCell> = cells
        .iter()
        .filter(|((f, q), _)| full_rows || (f == family && q == qualifier))
        .map(|((f, q), data)| RowCell {
            family: f.clone(),
            qualifier: q.clone(),
            value: data.value.clone(),
            timestamp: data.timestamp,
        })
        .collect();

    RowResult {
        key: key.clone(),
        cells: selected,
    }
}

impl RowStore for MemoryStore {
    fn ping(&self) -> StoreResult<()> {
        self.check_available()
    }

    fn table_exists(&self, table: &TableName) -> StoreResult<bool> {
        self.check_available()?;
        Ok(self.tables.read().contains_key(table))
    }

    fn create_table(
        &self,
        table: &TableName,
        families: &BTreeSet<FamilyName>,
    ) -> StoreResult<()> {
        self.check_available()?;
        if families.is_empty() {
            return Err(StoreError::PreconditionFailed {
                table: table.clone(),
                reason: "at least one column family is required".to_string(),
            });
        }

        let mut tables = self.tables.write();
        if tables.contains_key(table) {
            return Err(StoreError::AlreadyExists(table.clone()));
        }
        tables.insert(
            table.clone(),
            TableData {
                families: families.clone(),
                state: TableState::Enabled,
                rows: BTreeMap::new(),
            },
        );
        info!(table = %table, families = families.len(), "created table");
        Ok(())
    }

    fn disable_table(&self, table: &TableName) -> StoreResult<()> {
        self.check_available()?;
        let mut tables = self.tables.write();
        let data = tables
            .get_mut(table)
            .ok_or_else(|| StoreError::NoSuchTable(table.clone()))?;
        if data.state != TableState::Enabled {
            return Err(StoreError::PreconditionFailed {
                table: table.clone(),
                reason: "table is not enabled".to_string(),
            });
        }
        data.state = TableState::Disabled;
        info!(table = %table, "disabled table");
        Ok(())
    }

    fn delete_table(&self, table: &TableName) -> StoreResult<()> {
        self.check_available()?;
        let mut tables = self.tables.write();
        let data = tables
            .get(table)
            .ok_or_else(|| StoreError::NoSuchTable(table.clone()))?;
        if data.state == TableState::Enabled {
            return Err(StoreError::PreconditionFailed {
                table: table.clone(),
                reason: "table must be disabled before delete".to_string(),
            });
        }
        tables.remove(table);
        info!(table = %table, "deleted table");
        Ok(())
    }

    fn put_cell(&self, table: &TableName, cell: &CellPut) -> StoreResult<()> {
        self.check_available()?;
        let mut tables = self.tables.write();
        let data = tables
            .get_mut(table)
            .ok_or_else(|| StoreError::NoSuchTable(table.clone()))?;
        if data.state != TableState::Enabled {
            return Err(StoreError::TableNotEnabled(table.clone()));
        }
        if !data.families.contains(&cell.family) {
            return Err(StoreError::PreconditionFailed {
                table: table.clone(),
                reason: format!("column family {} is not declared", cell.family),
            });
        }

        let timestamp = self.next_timestamp();
        data.rows.entry(cell.row.clone()).or_default().insert(
            (cell.family.clone(), cell.qualifier.clone()),
            CellData {
                value: cell.value.clone(),
                timestamp,
            },
        );
        debug!(table = %table, row = %cell.row, column = %cell.family, "wrote cell");
        Ok(())
    }

    fn get(
        &self,
        table: &TableName,
        row: &RowKey,
        family: &FamilyName,
        qualifier: &Qualifier,
    ) -> StoreResult<Option<Bytes>> {
        self.check_available()?;
        let tables = self.tables.read();
        let data = tables
            .get(table)
            .ok_or_else(|| StoreError::NoSuchTable(table.clone()))?;
        if data.state != TableState::Enabled {
            return Err(StoreError::TableNotEnabled(table.clone()));
        }
        Ok(data
            .rows
            .get(row)
            .and_then(|cells| cells.get(&(family.clone(), qualifier.clone())))
            .map(|cell| cell.value.clone()))
    }

    fn open_scanner(&self, table: &TableName, spec: &ScanSpec) -> StoreResult<ScannerId> {
        self.check_available()?;
        {
            let tables = self.tables.read();
            let data = tables
                .get(table)
                .ok_or_else(|| StoreError::NoSuchTable(table.clone()))?;
            if data.state != TableState::Enabled {
                return Err(StoreError::TableNotEnabled(table.clone()));
            }
        }

        let filter = match &spec.filter {
            Some(pattern) => Some(
                Regex::new(pattern)
                    .map_err(|err| StoreError::InvalidPattern(err.to_string()))?,
            ),
            None => None,
        };

        let id = self.next_scanner_id.fetch_add(1, Ordering::SeqCst) + 1;
        self.scanners.lock().insert(
            id,
            ScannerState {
                table: table.clone(),
                family: spec.family.clone(),
                qualifier: spec.qualifier.clone(),
                filter,
                full_rows: spec.full_rows,
                resume_after: None,
            },
        );
        debug!(scanner = id, table = %table, "opened scanner");
        Ok(id)
    }

    fn scanner_next(&self, id: ScannerId, max: usize) -> StoreResult<Vec<RowResult>> {
        self.check_available()?;
        let mut scanners = self.scanners.lock();
        let state = scanners
            .get_mut(&id)
            .ok_or(StoreError::ScannerExpired(id))?;
        if max == 0 {
            return Ok(Vec::new());
        }

        let tables = self.tables.read();
        let data = tables
            .get(&state.table)
            .ok_or_else(|| StoreError::NoSuchTable(state.table.clone()))?;
        if data.state != TableState::Enabled {
            return Err(StoreError::TableNotEnabled(state.table.clone()));
        }

        let lower = match &state.resume_after {
            Some(key) => Bound::Excluded(key),
            None => Bound::Unbounded,
        };

        let column = (state.family.clone(), state.qualifier.clone());
        let mut out = Vec::new();
        let mut last_examined: Option<RowKey> = None;
        for (key, cells) in data.rows.range((lower, Bound::Unbounded)) {
            last_examined = Some(key.clone());
            // Rows without the keyed column never match; the filter compares
            // against a value that must be present.
            if let Some(cell) = cells.get(&column) {
                let matches = match &state.filter {
                    Some(regex) => regex.is_match(&cell.value),
                    None => true,
                };
                if matches {
                    out.push(materialize_row(
                        key,
                        cells,
                        &state.family,
                        &state.qualifier,
                        state.full_rows,
                    ));
                    if out.len() == max {
                        break;
                    }
                }
            }
        }

        if last_examined.is_some() {
            state.resume_after = last_examined;
        }
        Ok(out)
    }

    fn close_scanner(&self, id: ScannerId) -> StoreResult<()> {
        // Releasing a cursor is bookkeeping; it works even on a poisoned store.
        self.scanners
            .lock()
            .remove(&id)
            .ok_or(StoreError::ScannerExpired(id))?;
        debug!(scanner = id, "released scanner");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> TableName {
        TableName::new("user").unwrap()
    }

    fn families() -> BTreeSet<FamilyName> {
        let mut set = BTreeSet::new();
        set.insert(FamilyName::new("name").unwrap());
        set.insert(FamilyName::new("contactInfo").unwrap());
        set
    }

    fn cell(row: &str, family: &str, qualifier: &str, value: &str) -> CellPut {
        CellPut::new(
            RowKey::new(row.to_string()).unwrap(),
            FamilyName::new(family).unwrap(),
            Qualifier::new(qualifier).unwrap(),
            value.to_string(),
        )
    }

    fn seeded_store() -> MemoryStore {
        let store = MemoryStore::new();
        store.create_table(&table(), &families()).unwrap();
        for (row, first, last, email) in [
            ("1", "Marcel", "Haddad", "marcel@fabrikam.com"),
            ("2", "Franklin", "Holtz", "franklin@contoso.com"),
            ("3", "Dwayne", "McKeeleen", "dwayne@fabrikam.com"),
        ] {
            store.put_cell(&table(), &cell(row, "name", "first", first)).unwrap();
            store.put_cell(&table(), &cell(row, "name", "last", last)).unwrap();
            store
                .put_cell(&table(), &cell(row, "contactInfo", "email", email))
                .unwrap();
        }
        store
    }

    #[test]
    fn test_create_requires_families() {
        let store = MemoryStore::new();
        let err = store.create_table(&table(), &BTreeSet::new()).unwrap_err();
        assert!(matches!(err, StoreError::PreconditionFailed { .. }));
    }

    #[test]
    fn test_create_twice_is_already_exists() {
        let store = MemoryStore::new();
        store.create_table(&table(), &families()).unwrap();
        let err = store.create_table(&table(), &families()).unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists(_)));
    }

    #[test]
    fn test_delete_requires_disable_first() {
        let store = MemoryStore::new();
        store.create_table(&table(), &families()).unwrap();

        let err = store.delete_table(&table()).unwrap_err();
        assert!(matches!(err, StoreError::PreconditionFailed { .. }));

        store.disable_table(&table()).unwrap();
        store.delete_table(&table()).unwrap();
        assert!(!store.table_exists(&table()).unwrap());
    }

    #[test]
    fn test_disable_twice_is_precondition_failure() {
        let store = MemoryStore::new();
        store.create_table(&table(), &families()).unwrap();
        store.disable_table(&table()).unwrap();
        let err = store.disable_table(&table()).unwrap_err();
        assert!(matches!(err, StoreError::PreconditionFailed { .. }));
    }

    #[test]
    fn test_disabled_table_rejects_reads_and_writes() {
        let store = seeded_store();
        store.disable_table(&table()).unwrap();

        let row = RowKey::new("1").unwrap();
        let family = FamilyName::new("name").unwrap();
        let qualifier = Qualifier::new("first").unwrap();
        assert!(matches!(
            store.get(&table(), &row, &family, &qualifier),
            Err(StoreError::TableNotEnabled(_))
        ));
        assert!(matches!(
            store.put_cell(&table(), &cell("9", "name", "first", "x")),
            Err(StoreError::TableNotEnabled(_))
        ));
    }

    #[test]
    fn test_put_rejects_undeclared_family() {
        let store = MemoryStore::new();
        store.create_table(&table(), &families()).unwrap();
        let err = store
            .put_cell(&table(), &cell("1", "address", "street", "x"))
            .unwrap_err();
        assert!(matches!(err, StoreError::PreconditionFailed { .. }));
    }

    #[test]
    fn test_get_miss_is_none() {
        let store = seeded_store();
        let row = RowKey::new("99").unwrap();
        let family = FamilyName::new("name").unwrap();
        let qualifier = Qualifier::new("first").unwrap();
        assert_eq!(store.get(&table(), &row, &family, &qualifier).unwrap(), None);
    }

    #[test]
    fn test_overwrite_bumps_timestamp() {
        let store = MemoryStore::new();
        store.create_table(&table(), &families()).unwrap();
        store.put_cell(&table(), &cell("1", "name", "first", "Marcel")).unwrap();
        store.put_cell(&table(), &cell("1", "name", "first", "Marc")).unwrap();

        let spec = ScanSpec::column(
            FamilyName::new("name").unwrap(),
            Qualifier::new("first").unwrap(),
        );
        let id = store.open_scanner(&table(), &spec).unwrap();
        let rows = store.scanner_next(id, 10).unwrap();
        store.close_scanner(id).unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].cells.len(), 1);
        assert_eq!(&rows[0].cells[0].value[..], b"Marc");
        assert_eq!(rows[0].cells[0].timestamp, 2);
    }

    #[test]
    fn test_scanner_resumes_in_order() {
        let store = seeded_store();
        let spec = ScanSpec::column(
            FamilyName::new("name").unwrap(),
            Qualifier::new("last").unwrap(),
        );
        let id = store.open_scanner(&table(), &spec).unwrap();

        let first = store.scanner_next(id, 2).unwrap();
        assert_eq!(first.len(), 2);
        assert_eq!(first[0].key.as_bytes(), b"1");
        assert_eq!(first[1].key.as_bytes(), b"2");

        let second = store.scanner_next(id, 2).unwrap();
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].key.as_bytes(), b"3");

        assert!(store.scanner_next(id, 2).unwrap().is_empty());
        store.close_scanner(id).unwrap();
    }

    #[test]
    fn test_filter_scanner_returns_full_rows() {
        let store = seeded_store();
        let spec = ScanSpec::filtered(
            FamilyName::new("contactInfo").unwrap(),
            Qualifier::new("email").unwrap(),
            "dwayne@fabrikam.com",
        );
        let id = store.open_scanner(&table(), &spec).unwrap();
        let rows = store.scanner_next(id, 10).unwrap();
        store.close_scanner(id).unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].key.as_bytes(), b"3");
        // Full row: both families come back, not just the filtered column.
        assert_eq!(rows[0].cells.len(), 3);
    }

    #[test]
    fn test_filter_skips_rows_without_the_column() {
        let store = seeded_store();
        // Row 4 has a name but no email.
        store.put_cell(&table(), &cell("4", "name", "first", "Raynaldi")).unwrap();

        let spec = ScanSpec::filtered(
            FamilyName::new("contactInfo").unwrap(),
            Qualifier::new("email").unwrap(),
            "contoso",
        );
        let id = store.open_scanner(&table(), &spec).unwrap();
        let rows = store.scanner_next(id, 10).unwrap();
        store.close_scanner(id).unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].key.as_bytes(), b"2");
    }

    #[test]
    fn test_invalid_filter_pattern_fails_open() {
        let store = seeded_store();
        let spec = ScanSpec::filtered(
            FamilyName::new("contactInfo").unwrap(),
            Qualifier::new("email").unwrap(),
            "(unclosed",
        );
        assert!(matches!(
            store.open_scanner(&table(), &spec),
            Err(StoreError::InvalidPattern(_))
        ));
    }

    #[test]
    fn test_released_scanner_expires() {
        let store = seeded_store();
        let spec = ScanSpec::column(
            FamilyName::new("name").unwrap(),
            Qualifier::new("first").unwrap(),
        );
        let id = store.open_scanner(&table(), &spec).unwrap();
        store.close_scanner(id).unwrap();

        assert!(matches!(
            store.scanner_next(id, 1),
            Err(StoreError::ScannerExpired(_))
        ));
        assert!(matches!(
            store.close_scanner(id),
            Err(StoreError::ScannerExpired(_))
        ));
    }

    #[test]
    fn test_poisoned_store_is_unavailable() {
        let store = seeded_store();
        store.poison();
        assert!(matches!(store.ping(), Err(StoreError::Unavailable { .. })));
        assert!(matches!(
            store.table_exists(&table()),
            Err(StoreError::Unavailable { .. })
        ));

        store.heal();
        assert!(store.ping().is_ok());
    }
}
