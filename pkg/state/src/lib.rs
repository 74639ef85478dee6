//! Key/value storage behind the cluster registry.

pub mod client;
pub mod memory;
pub mod store;

pub use client::StateStore;
pub use memory::MemoryStore;
pub use store::Store;
