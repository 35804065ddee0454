use std::sync::Arc;

use cfkv_client::{ClientConfig, Connection, ConnectionManager, TableClient};
use cfkv_common::{CellPut, FamilyName, Qualifier, RowKey, StoreError, TableName};
use cfkv_store::{MemoryStore, RowStore};

const USERS: [[&str; 4]; 6] = [
    ["1", "Marcel", "Haddad", "marcel@fabrikam.com"],
    ["2", "Franklin", "Holtz", "franklin@contoso.com"],
    ["3", "Dwayne", "McKeeleen", "dwayne@fabrikam.com"],
    ["4", "Raynaldi", "Schroeder", "raynaldi@contoso.com"],
    ["5", "Rosalie", "Burton", "rosalie@fabrikam.com"],
    ["6", "Gabriela", "Ingram", "gabriela@contoso.com"],
];

fn name_family() -> FamilyName {
    FamilyName::new("name").expect("family")
}

fn contact_family() -> FamilyName {
    FamilyName::new("contactInfo").expect("family")
}

fn qualifier(name: &str) -> Qualifier {
    Qualifier::new(name).expect("qualifier")
}

fn store_handle(store: &Arc<MemoryStore>) -> Arc<dyn RowStore> {
    store.clone()
}

fn client_over(store: Arc<MemoryStore>, batch: usize) -> TableClient {
    let conn = Connection::open(store_handle(&store)).expect("connect");
    TableClient::with_config(
        Arc::new(conn),
        TableName::new("user").expect("table"),
        ClientConfig {
            scan_batch_size: batch,
        },
    )
}

fn seed(client: &TableClient) {
    client
        .create(&[name_family(), contact_family()])
        .expect("create");

    let mut cells = Vec::new();
    for user in USERS {
        let row = RowKey::new(user[0]).expect("row key");
        cells.push(CellPut::new(row.clone(), name_family(), qualifier("first"), user[1]));
        cells.push(CellPut::new(row.clone(), name_family(), qualifier("last"), user[2]));
        cells.push(CellPut::new(row, contact_family(), qualifier("email"), user[3]));
    }
    client.put(cells).expect("seed");
}

#[test]
fn end_to_end_seeded_scenario() {
    let store = Arc::new(MemoryStore::new());
    let client = client_over(store.clone(), 2);
    seed(&client);

    // Point lookup.
    let row = RowKey::new("1").expect("row key");
    let value = client
        .get(&row, &name_family(), &qualifier("first"))
        .expect("get");
    assert_eq!(value.as_deref(), Some(&b"Marcel"[..]));

    // Column scan: six rows, ascending, ending at ("6", "Ingram").
    let entries: Vec<_> = client
        .scan(&name_family(), &qualifier("last"))
        .expect("scan")
        .collect::<Result<Vec<_>, _>>()
        .expect("scan entries");
    assert_eq!(entries.len(), 6);
    let keys: Vec<&[u8]> = entries.iter().map(|(key, _)| key.as_bytes()).collect();
    assert_eq!(keys, [b"1", b"2", b"3", b"4", b"5", b"6"]);
    assert_eq!(&entries[5].1[..], b"Ingram");

    // Filter: exactly the row keyed "3".
    let matched: Vec<_> = client
        .filter(&contact_family(), &qualifier("email"), "dwayne@fabrikam.com")
        .expect("filter")
        .collect::<Result<Vec<_>, _>>()
        .expect("filter entries");
    assert_eq!(matched.len(), 1);
    let (key, row_result) = &matched[0];
    assert_eq!(key.as_bytes(), b"3");
    assert_eq!(
        row_result
            .value(&name_family(), &qualifier("first"))
            .as_deref(),
        Some(&b"Dwayne"[..])
    );

    // Teardown: the table leaves the enabled state and disappears.
    client.delete().expect("delete");
    let err = client
        .get(&row, &name_family(), &qualifier("first"))
        .unwrap_err();
    assert!(matches!(err, StoreError::NoSuchTable(_)));

    // No scanner leaked across the run.
    assert_eq!(store.active_scanner_count(), 0);
}

#[test]
fn delete_twice_is_a_noop() {
    let store = Arc::new(MemoryStore::new());
    let client = client_over(store, 4);
    seed(&client);

    client.delete().expect("first delete");
    client.delete().expect("second delete is a no-op");
}

#[test]
fn get_miss_is_not_an_error() {
    let store = Arc::new(MemoryStore::new());
    let client = client_over(store, 4);
    seed(&client);

    let row = RowKey::new("99").expect("row key");
    let value = client
        .get(&row, &name_family(), &qualifier("first"))
        .expect("get");
    assert_eq!(value, None);
}

#[test]
fn create_is_not_idempotent_but_create_if_absent_is() {
    let store = Arc::new(MemoryStore::new());
    let client = client_over(store, 4);
    let families = [name_family(), contact_family()];

    assert!(client.create_if_absent(&families).expect("first create"));
    let err = client.create(&families).unwrap_err();
    assert!(matches!(err, StoreError::AlreadyExists(_)));
    assert!(!client.create_if_absent(&families).expect("second create"));
}

#[test]
fn put_failure_reports_applied_prefix() {
    let store = Arc::new(MemoryStore::new());
    let client = client_over(store, 4);
    client.create(&[name_family()]).expect("create");

    let row = RowKey::new("1").expect("row key");
    let cells = vec![
        CellPut::new(row.clone(), name_family(), qualifier("first"), "Marcel"),
        CellPut::new(row.clone(), name_family(), qualifier("last"), "Haddad"),
        // Undeclared family: this write is rejected by the store.
        CellPut::new(row.clone(), contact_family(), qualifier("email"), "m@x.com"),
    ];
    let err = client.put(cells).unwrap_err();
    match err {
        StoreError::PutAborted { applied, source } => {
            assert_eq!(applied, 2);
            assert!(matches!(*source, StoreError::PreconditionFailed { .. }));
        }
        other => panic!("unexpected error: {other}"),
    }

    // The prefix stays applied.
    let value = client
        .get(&row, &name_family(), &qualifier("last"))
        .expect("get");
    assert_eq!(value.as_deref(), Some(&b"Haddad"[..]));
}

#[test]
fn dropping_a_scanner_releases_the_cursor() {
    let store = Arc::new(MemoryStore::new());
    let client = client_over(store.clone(), 2);
    seed(&client);

    let mut scanner = client
        .scan(&name_family(), &qualifier("last"))
        .expect("scan");
    assert_eq!(store.active_scanner_count(), 1);

    // Consume one entry, then abandon the scan.
    scanner.next().expect("first entry").expect("entry");
    drop(scanner);
    assert_eq!(store.active_scanner_count(), 0);

    client.delete().expect("delete");
}

#[test]
fn exhausted_scanner_releases_the_cursor_before_drop() {
    let store = Arc::new(MemoryStore::new());
    let client = client_over(store.clone(), 2);
    seed(&client);

    let mut scanner = client
        .scan(&name_family(), &qualifier("first"))
        .expect("scan");
    while let Some(entry) = scanner.next() {
        entry.expect("entry");
    }
    assert_eq!(store.active_scanner_count(), 0);
    drop(scanner);
}

#[test]
fn scan_error_ends_iteration_and_spares_cleanup() {
    let store = Arc::new(MemoryStore::new());
    let client = client_over(store.clone(), 2);
    seed(&client);

    let mut scanner = client
        .scan(&name_family(), &qualifier("last"))
        .expect("scan");
    store.poison();

    let entry = scanner.next().expect("an error entry");
    assert!(matches!(entry, Err(StoreError::Unavailable { .. })));
    assert!(scanner.next().is_none());
    drop(scanner);

    // The store recovers and cleanup still succeeds.
    store.heal();
    client.delete().expect("delete");
    assert_eq!(store.active_scanner_count(), 0);
}

#[test]
fn operations_after_close_fail_with_connection_closed() {
    let store = Arc::new(MemoryStore::new());
    let conn = Arc::new(Connection::open(store_handle(&store)).expect("connect"));
    let client = TableClient::new(conn.clone(), TableName::new("user").expect("table"));
    client.create(&[name_family()]).expect("create");

    conn.close();
    let row = RowKey::new("1").expect("row key");
    let err = client
        .get(&row, &name_family(), &qualifier("first"))
        .unwrap_err();
    assert!(matches!(err, StoreError::ConnectionClosed));
}

#[test]
fn manager_survives_a_store_outage_between_runs() {
    let store = Arc::new(MemoryStore::new());
    let factory_store = store.clone();
    let manager = ConnectionManager::new(move || Ok(store_handle(&factory_store)));

    let conn = manager.get().expect("connect");
    let client = TableClient::new(conn, TableName::new("user").expect("table"));
    client.create(&[name_family()]).expect("create");

    store.poison();
    assert!(matches!(
        manager.get(),
        Err(StoreError::Unavailable { .. })
    ));

    store.heal();
    let conn = manager.get().expect("reconnect");
    let client = TableClient::new(conn, TableName::new("user").expect("table"));
    client.delete().expect("delete after recovery");
}
