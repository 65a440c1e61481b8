//! Pending transaction pool
//!
//! Holds transactions that are not yet in a block, keyed by transaction hash.
//! Nothing here validates; the pool is only changed through [`TransactionPool::add`]
//! and [`TransactionPool::remove`].

use crate::blockchain::Sha256Hash;
use crate::transaction::Transaction;
use std::collections::HashMap;

#[derive(Debug, Clone, Default)]
pub struct TransactionPool {
    transactions: HashMap<Sha256Hash, Transaction>,
}

impl TransactionPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `tx`, replacing any transaction with the same hash.
    pub fn add(&mut self, tx: Transaction) {
        self.transactions.insert(tx.hash(), tx);
    }

    pub fn remove(&mut self, hash: &Sha256Hash) -> Option<Transaction> {
        self.transactions.remove(hash)
    }

    pub fn get(&self, hash: &Sha256Hash) -> Option<&Transaction> {
        self.transactions.get(hash)
    }

    pub fn contains(&self, hash: &Sha256Hash) -> bool {
        self.transactions.contains_key(hash)
    }

    pub fn all(&self) -> impl Iterator<Item = &Transaction> {
        self.transactions.values()
    }

    /// Owned copies of every pending transaction, ordered by hash.
    pub fn transactions(&self) -> Vec<Transaction> {
        let mut entries: Vec<(&Sha256Hash, &Transaction)> = self.transactions.iter().collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));
        entries.into_iter().map(|(_, tx)| tx.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }
}
