//! Thread-safe handle around a [`BlockTree`]
//!
//! Mutations take the write lock, so at most one admission is in flight and
//! each sees its parent's snapshot as committed. Queries take the read lock
//! and hand back owned values.

use crate::blockchain::{Block, BlockAdmission, BlockTree, Sha256Hash, UtxoSnapshot};
use crate::error::ChainError;
use crate::transaction::{Transaction, TxValidator, UtxoTxValidator};
use parking_lot::RwLock;
use std::sync::Arc;

pub struct SharedBlockTree<V = UtxoTxValidator> {
    inner: Arc<RwLock<BlockTree<V>>>,
}

impl<V> Clone for SharedBlockTree<V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<V: TxValidator> SharedBlockTree<V> {
    pub fn new(tree: BlockTree<V>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(tree)),
        }
    }

    pub fn add_block(&self, block: Block) -> bool {
        self.inner.write().add_block(block)
    }

    pub fn try_add_block(&self, block: Block) -> Result<BlockAdmission, ChainError> {
        self.inner.write().try_add_block(block)
    }

    pub fn add_transaction(&self, tx: Transaction) {
        self.inner.write().add_transaction(tx);
    }

    pub fn tip(&self) -> Block {
        self.inner.read().tip().clone()
    }

    pub fn tip_hash(&self) -> Sha256Hash {
        self.inner.read().tip_hash()
    }

    pub fn max_height(&self) -> u64 {
        self.inner.read().max_height()
    }

    pub fn tip_utxo_snapshot(&self) -> UtxoSnapshot {
        self.inner.read().tip_utxo_snapshot()
    }

    pub fn pending_transactions(&self) -> Vec<Transaction> {
        self.inner.read().transaction_pool().transactions()
    }

    /// Runs `f` under the read lock.
    pub fn read<R>(&self, f: impl FnOnce(&BlockTree<V>) -> R) -> R {
        f(&self.inner.read())
    }
}
