//! # Column-Family Store Client
//!
//! Purpose: Provide a small, synchronous client for a column-family row
//! store: explicit connection lifecycle, one-call table operations, and
//! lazily streamed scans.
//!
//! ## Design Principles
//! 1. **Explicit Lifecycle**: Connections are owned objects, probed on open
//!    and explicitly closed; nothing hides in process-wide state.
//! 2. **Facade Pattern**: `TableClient` hides the scanner protocol and admin
//!    ordering behind one-call operations.
//! 3. **Lazy Results**: Scans and filters stream rows in small batches with
//!    guaranteed cursor release.
//! 4. **Typed Errors**: Failures surface as `StoreError`; lookup misses are
//!    `Ok(None)`.

mod connection;
mod scanner;
mod table;

pub use connection::{Connection, ConnectionManager, StoreFactory};
pub use scanner::{ColumnScanner, FilterScanner};
pub use table::{ClientConfig, TableClient, DEFAULT_SCAN_BATCH_SIZE};
