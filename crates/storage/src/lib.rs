//! On-ramp Storage
//!
//! Catalog storage implementations for the on-ramp aggregator.

pub mod memory_store;
pub mod traits;

pub use memory_store::MemoryStore;
pub use traits::Storage;
