//! In-process adapters for the outbound ports

pub mod memory_store;
pub mod sha256_hasher;

pub use memory_store::InMemoryTransactionStore;
pub use sha256_hasher::Sha256TxHasher;
