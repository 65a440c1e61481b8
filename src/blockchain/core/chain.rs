use crate::crypto::Address;
use crate::transaction::Transaction;
use sha2::{Digest, Sha256};

pub type Sha256Hash = [u8; 32];

/// Reward minted by the coinbase of blocks built with [`Block::new`].
pub const COINBASE_VALUE: u64 = 25;

/// Anchor used by the genesis coinbase, which has no parent to commit to.
pub const GENESIS_ANCHOR: Sha256Hash = [0u8; 32];

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct BlockHeader {
    pub parent_hash: Option<Sha256Hash>,
    pub merkle_root: Sha256Hash,
    pub timestamp: u64,
    pub nonce: u64,
}

impl BlockHeader {
    pub fn hash(&self) -> Sha256Hash {
        let mut hasher = Sha256::new();
        match &self.parent_hash {
            Some(parent) => {
                hasher.update([1u8]);
                hasher.update(parent);
            }
            None => hasher.update([0u8]),
        }
        hasher.update(self.merkle_root);
        hasher.update(self.timestamp.to_le_bytes());
        hasher.update(self.nonce.to_le_bytes());
        hasher.finalize().into()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Block {
    pub header: BlockHeader,
    pub coinbase: Transaction,
    pub transactions: Vec<Transaction>,
}

impl Block {
    /// Builds a block on `parent_hash` paying [`COINBASE_VALUE`] to `recipient`.
    pub fn new(
        parent_hash: Option<Sha256Hash>,
        recipient: Address,
        transactions: Vec<Transaction>,
    ) -> Self {
        let coinbase = Transaction::coinbase(
            COINBASE_VALUE,
            recipient,
            parent_hash.unwrap_or(GENESIS_ANCHOR),
        );
        Self::from_parts(parent_hash, coinbase, transactions)
    }

    pub fn genesis(recipient: Address) -> Self {
        Self::new(None, recipient, Vec::new())
    }

    pub fn from_parts(
        parent_hash: Option<Sha256Hash>,
        coinbase: Transaction,
        transactions: Vec<Transaction>,
    ) -> Self {
        let merkle_root = Block::calculate_merkle_root(&coinbase, &transactions);
        Block {
            header: BlockHeader {
                parent_hash,
                merkle_root,
                timestamp: chrono::Utc::now().timestamp_millis() as u64,
                nonce: 0,
            },
            coinbase,
            transactions,
        }
    }

    /// Distinguishes otherwise identical blocks built on the same parent.
    pub fn with_nonce(mut self, nonce: u64) -> Self {
        self.header.nonce = nonce;
        self
    }

    pub fn hash(&self) -> Sha256Hash {
        self.header.hash()
    }

    pub fn hash_str(&self) -> String {
        hex::encode(self.hash())
    }

    pub fn parent_hash(&self) -> Option<Sha256Hash> {
        self.header.parent_hash
    }

    pub fn coinbase(&self) -> &Transaction {
        &self.coinbase
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    pub fn calculate_merkle_root(coinbase: &Transaction, transactions: &[Transaction]) -> Sha256Hash {
        let mut hasher = Sha256::new();
        hasher.update(coinbase.hash());
        for tx in transactions {
            hasher.update(tx.hash());
        }
        hasher.finalize().into()
    }
}
