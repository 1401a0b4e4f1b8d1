//! Hash-keyed transaction container.

use crate::domain::errors::SequencingError;
use crate::ports::{TransactionStore, TxHasher};
use parking_lot::RwLock;
use shared_types::{Transaction, TxHash};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

pub struct InMemoryTransactionStore {
    hasher: Arc<dyn TxHasher>,
    txs: RwLock<HashMap<TxHash, Transaction>>,
}

impl InMemoryTransactionStore {
    pub fn new(hasher: Arc<dyn TxHasher>) -> Self {
        Self {
            hasher,
            txs: RwLock::new(HashMap::new()),
        }
    }
}

impl TransactionStore for InMemoryTransactionStore {
    fn add(&self, tx: Transaction) -> TxHash {
        let hash = self.hasher.hash(&tx);
        let mut txs = self.txs.write();
        if txs.contains_key(&hash) {
            debug!(hash = %hash.short(), "[qr-01] transaction already stored");
        } else {
            txs.insert(hash.clone(), tx);
        }
        hash
    }

    fn get(&self, hash: &TxHash) -> Option<Transaction> {
        self.txs.read().get(hash).cloned()
    }

    fn remove(&self, hash: &TxHash) -> Result<Transaction, SequencingError> {
        self.txs
            .write()
            .remove(hash)
            .ok_or_else(|| SequencingError::TransactionNotFound(hash.to_string()))
    }

    fn len(&self) -> usize {
        self.txs.read().len()
    }
}
