//! Error types for ledgertree

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChainError {
    /// Only genesis may omit a parent, and genesis is never re-submitted.
    #[error("Block has no parent hash")]
    MissingParentHash,
    #[error("Orphan block: parent {0} is unknown or already pruned")]
    UnknownParent(String),
    #[error("Block already exists")]
    BlockAlreadyExists,
    #[error("Block at height {height} is at or below finality horizon {horizon}")]
    BelowFinalityHorizon { height: u64, horizon: u64 },
    #[error("Incomplete transaction set: {accepted} of {submitted} transactions accepted")]
    IncompleteTransactionSet { accepted: usize, submitted: usize },
    #[error("Invalid block: {0}")]
    InvalidBlock(String),
    #[error("Invalid transaction: {0}")]
    InvalidTransaction(String),
    #[error("UTXO not found: {0}")]
    UtxoNotFound(String),
    #[error("Double spend detected: {0}")]
    DoubleSpendDetected(String),
    #[error("Cryptographic error: {0}")]
    CryptoError(String),
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("IO error: {0}")]
    IoError(String),
    #[error("Bincode error: {0}")]
    BincodeError(String),
}

impl ChainError {
    /// Whether this error is one of the block admission rejections
    /// reported by [`crate::blockchain::BlockTree::try_add_block`].
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            ChainError::MissingParentHash
                | ChainError::UnknownParent(_)
                | ChainError::BlockAlreadyExists
                | ChainError::BelowFinalityHorizon { .. }
                | ChainError::IncompleteTransactionSet { .. }
                | ChainError::InvalidBlock(_)
        )
    }
}

impl From<std::io::Error> for ChainError {
    fn from(err: std::io::Error) -> Self {
        ChainError::IoError(err.to_string())
    }
}

impl From<Box<bincode::ErrorKind>> for ChainError {
    fn from(err: Box<bincode::ErrorKind>) -> Self {
        ChainError::BincodeError(err.to_string())
    }
}

/// Convenience alias used across the crate
pub type Result<T> = std::result::Result<T, ChainError>;
