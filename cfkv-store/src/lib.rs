// cfkv-store - Row store contract and the in-memory reference backend
//
// This crate defines the trait clients program against and one concrete
// implementation of it.

pub mod memory;
pub mod store;

// Re-export for convenience
pub use memory::MemoryStore;
pub use store::{RowStore, ScanSpec, ScannerId};
