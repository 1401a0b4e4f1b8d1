//! SHA-256 transaction naming.

use crate::ports::TxHasher;
use sha2::{Digest, Sha256};
use shared_types::{Transaction, TxHash};

/// Lowercase hex SHA-256 of the payload.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sha256TxHasher;

impl TxHasher for Sha256TxHasher {
    fn hash(&self, tx: &Transaction) -> TxHash {
        let mut hasher = Sha256::new();
        hasher.update(&tx.payload);
        TxHash::new(hex::encode(hasher.finalize()))
    }
}
