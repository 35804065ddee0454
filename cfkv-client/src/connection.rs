//! # Connection Lifecycle
//!
//! Purpose: Manage the shared handle to the row store: probed on open,
//! validated before reuse, re-established when lost, and explicitly closed.
//!
//! ## Design Principles
//! 1. **Probe Before Use**: Opening and reusing a connection both run the
//!    store's liveness probe; a dead handle is never handed out.
//! 2. **Explicit Ownership**: The connection is an owned object passed to
//!    clients, not hidden process-wide state.
//! 3. **Serialized Establishment**: The manager holds its slot lock across
//!    the whole create-or-validate sequence, so concurrent callers cannot
//!    double-create.
//! 4. **Typed Failure**: An unreachable store surfaces `Unavailable` with
//!    its cause, never a dead handle.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tracing::{debug, warn};

use cfkv_common::{StoreError, StoreResult};
use cfkv_store::RowStore;

/// An established, probed handle to the row store.
///
/// The handle stays valid until [`close`](Connection::close); operations
/// through a closed connection fail with `ConnectionClosed`.
pub struct Connection {
    store: Arc<dyn RowStore>,
    closed: AtomicBool,
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("closed", &self.closed.load(Ordering::SeqCst))
            .finish()
    }
}

impl Connection {
    /// Opens a connection, running the liveness probe first.
    ///
    /// An unreachable store fails the open with `Unavailable`.
    pub fn open(store: Arc<dyn RowStore>) -> StoreResult<Self> {
        store.ping()?;
        debug!("store connection established");
        Ok(Connection {
            store,
            closed: AtomicBool::new(false),
        })
    }

    /// Returns true once the connection has been closed.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Closes the connection. Idempotent.
    pub fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            debug!("store connection closed");
        }
    }

    /// Re-runs the liveness probe over the open connection.
    pub fn probe(&self) -> StoreResult<()> {
        self.store()?.ping()
    }

    /// Returns the store handle while the connection is open.
    pub(crate) fn store(&self) -> StoreResult<&Arc<dyn RowStore>> {
        if self.is_closed() {
            return Err(StoreError::ConnectionClosed);
        }
        Ok(&self.store)
    }
}

/// Factory invoked by the manager whenever a connection must be established.
pub type StoreFactory = dyn Fn() -> StoreResult<Arc<dyn RowStore>> + Send + Sync;

/// Validated-reuse accessor for a single shared connection.
///
/// `get` returns the existing connection while it stays live, and otherwise
/// establishes a fresh one through the factory. The slot mutex serializes
/// the create-or-validate sequence.
pub struct ConnectionManager {
    factory: Box<StoreFactory>,
    current: Mutex<Option<Arc<Connection>>>,
}

impl ConnectionManager {
    /// Creates a manager around a store factory.
    pub fn new<F>(factory: F) -> Self
    where
        F: Fn() -> StoreResult<Arc<dyn RowStore>> + Send + Sync + 'static,
    {
        ConnectionManager {
            factory: Box::new(factory),
            current: Mutex::new(None),
        }
    }

    /// Returns the live connection, establishing or replacing it as needed.
    ///
    /// A connection that fails its probe is closed and replaced in the same
    /// call; when the store cannot be reached at all, the caller gets
    /// `Unavailable` and decides retry policy.
    pub fn get(&self) -> StoreResult<Arc<Connection>> {
        let mut slot = self.current.lock().expect("connection slot mutex poisoned");

        if let Some(conn) = slot.as_ref() {
            if !conn.is_closed() {
                match conn.probe() {
                    Ok(()) => return Ok(conn.clone()),
                    Err(err) => {
                        warn!(error = %err, "existing connection failed liveness probe");
                        conn.close();
                    }
                }
            }
        }

        let store = (self.factory)()?;
        let conn = Arc::new(Connection::open(store)?);
        *slot = Some(conn.clone());
        Ok(conn)
    }

    /// Closes the currently held connection, if any.
    pub fn close(&self) {
        let slot = self.current.lock().expect("connection slot mutex poisoned");
        if let Some(conn) = slot.as_ref() {
            conn.close();
        }
    }
}
