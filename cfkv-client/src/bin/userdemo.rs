//! # User Table Demo
//!
//! Purpose: Run the seeded end-to-end scenario against the in-memory store:
//! create the `user` table, load six rows, read them back three ways, and
//! tear the table down.
//!
//! ## Design Principles
//! 1. **Explicit Lifecycle**: The connection comes from a `ConnectionManager`
//!    and is closed at the end of the run.
//! 2. **Context-Rich Failures**: Operation errors name the operation, table,
//!    and row involved.
//! 3. **Degrade, Don't Abort**: A failed scan or filter is reported and the
//!    run still reaches table cleanup.

use std::env;
use std::fs;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use cfkv_client::{ClientConfig, ConnectionManager, TableClient, DEFAULT_SCAN_BATCH_SIZE};
use cfkv_common::{CellPut, FamilyName, Qualifier, RowKey, TableName};
use cfkv_store::{MemoryStore, RowStore};

const TABLE: &str = "user";
const FAMILY_NAME: &str = "name";
const FAMILY_CONTACT: &str = "contactInfo";
const QUALIFIER_FIRST: &str = "first";
const QUALIFIER_LAST: &str = "last";
const QUALIFIER_EMAIL: &str = "email";

const FILTER_PATTERN: &str = "dwayne@fabrikam.com";

/// Seed rows: key, first name, last name, email.
const USERS: [[&str; 4]; 6] = [
    ["1", "Marcel", "Haddad", "marcel@fabrikam.com"],
    ["2", "Franklin", "Holtz", "franklin@contoso.com"],
    ["3", "Dwayne", "McKeeleen", "dwayne@fabrikam.com"],
    ["4", "Raynaldi", "Schroeder", "raynaldi@contoso.com"],
    ["5", "Rosalie", "Burton", "rosalie@fabrikam.com"],
    ["6", "Gabriela", "Ingram", "gabriela@contoso.com"],
];

/// Demo configuration, optionally loaded from a JSON file passed as the
/// first argument.
#[derive(Debug, Deserialize)]
#[serde(default)]
struct DemoConfig {
    /// Rows fetched per scanner round trip.
    scan_batch_size: usize,
    /// Reload the seed rows even when the table already exists.
    reseed: bool,
}

impl Default for DemoConfig {
    fn default() -> Self {
        DemoConfig {
            scan_batch_size: DEFAULT_SCAN_BATCH_SIZE,
            reseed: false,
        }
    }
}

fn load_config() -> Result<DemoConfig> {
    match env::args().nth(1) {
        Some(path) => {
            let raw = fs::read_to_string(&path)
                .with_context(|| format!("read config file {path}"))?;
            serde_json::from_str(&raw).with_context(|| format!("parse config file {path}"))
        }
        None => Ok(DemoConfig::default()),
    }
}

fn seed_cells(
    name: &FamilyName,
    contact: &FamilyName,
    first: &Qualifier,
    last: &Qualifier,
    email: &Qualifier,
) -> Result<Vec<CellPut>> {
    let mut cells = Vec::with_capacity(USERS.len() * 3);
    for user in USERS {
        let row = RowKey::new(user[0])?;
        cells.push(CellPut::new(row.clone(), name.clone(), first.clone(), user[1]));
        cells.push(CellPut::new(row.clone(), name.clone(), last.clone(), user[2]));
        cells.push(CellPut::new(row, contact.clone(), email.clone(), user[3]));
    }
    Ok(cells)
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = load_config()?;
    let store = Arc::new(MemoryStore::new());
    let manager = ConnectionManager::new(move || {
        let handle: Arc<dyn RowStore> = store.clone();
        Ok(handle)
    });

    let conn = manager.get().context("establish store connection")?;
    let client = TableClient::with_config(
        conn,
        TableName::new(TABLE)?,
        ClientConfig {
            scan_batch_size: config.scan_batch_size,
        },
    );

    let name = FamilyName::new(FAMILY_NAME)?;
    let contact = FamilyName::new(FAMILY_CONTACT)?;
    let first = Qualifier::new(QUALIFIER_FIRST)?;
    let last = Qualifier::new(QUALIFIER_LAST)?;
    let email = Qualifier::new(QUALIFIER_EMAIL)?;

    let created = client
        .create_if_absent(&[name.clone(), contact.clone()])
        .with_context(|| format!("create table {TABLE}"))?;
    if created || config.reseed {
        let cells = seed_cells(&name, &contact, &first, &last, &email)?;
        client
            .put(cells)
            .with_context(|| format!("seed table {TABLE}"))?;
        info!(table = TABLE, rows = USERS.len(), "seeded table");
    }

    let row = RowKey::new("1")?;
    let value = client
        .get(&row, &name, &first)
        .with_context(|| format!("get row 1 from {TABLE} {FAMILY_NAME}:{QUALIFIER_FIRST}"))?;
    match value {
        Some(value) => {
            info!(row = %row, value = %String::from_utf8_lossy(&value), "point lookup")
        }
        None => info!(row = %row, "point lookup found no cell"),
    }

    // A scan or filter failure is logged so the run still reaches cleanup.
    match client.scan(&name, &last) {
        Ok(scanner) => {
            for entry in scanner {
                match entry {
                    Ok((key, value)) => {
                        info!(row = %key, value = %String::from_utf8_lossy(&value), "scanned row")
                    }
                    Err(err) => warn!(table = TABLE, error = %err, "scan stopped early"),
                }
            }
        }
        Err(err) => warn!(table = TABLE, error = %err, "scan could not start"),
    }

    match client.filter(&contact, &email, FILTER_PATTERN) {
        Ok(scanner) => {
            for entry in scanner {
                match entry {
                    Ok((key, matched)) => {
                        info!(
                            row = %key,
                            cells = matched.cells.len(),
                            pattern = FILTER_PATTERN,
                            "filter matched row"
                        )
                    }
                    Err(err) => warn!(table = TABLE, error = %err, "filter stopped early"),
                }
            }
        }
        Err(err) => warn!(table = TABLE, error = %err, "filter could not start"),
    }

    client
        .delete()
        .with_context(|| format!("delete table {TABLE}"))?;
    manager.close();
    info!("run complete");
    Ok(())
}
