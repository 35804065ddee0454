// cfkv-common - Shared types, errors, and codec for the cfkv client stack
//
// This crate defines the value types and error taxonomy used on both sides
// of the store boundary.

pub mod codec;
pub mod error;
pub mod types;

// Re-export for convenience
pub use codec::*;
pub use error::*;
pub use types::*;
