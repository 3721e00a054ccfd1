//! Engines Module
//!
//! Reference engines implementing the contract: an in-memory map and a JSON
//! snapshot on disk.

mod entry;
mod file;
mod memory;

// Re-export public types
pub use entry::{expiry_from_ttl, StoredEntry};
pub use file::FileEngine;
pub use memory::{MemoryEngine, MemoryStore};
