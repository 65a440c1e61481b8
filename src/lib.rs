//! ledgertree - the in-memory ledger core of a single-node validator
//!
//! # Architecture
//!
//! The crate is organized into logical modules:
//!
//! ## Ledger Core
//! - [`blockchain`] - Block model, UTXO snapshots, the block tree and pruning
//! - [`transaction`] - Transaction types and the transaction validator
//! - [`mempool`] - Pending transaction pool
//!
//! ## Caller Surfaces
//! - [`handler`] - Block processing and assembly on the current tip
//! - [`shared`] - Lock-guarded handle for multi-threaded callers
//!
//! ## Cryptography
//! - [`crypto`] - Signatures and verification (secp256k1)
//!
//! ## Configuration & Utilities
//! - [`config`] - Configuration management
//! - [`error`] - Error types
//!
//! A [`blockchain::BlockTree`] starts from a trusted genesis block and admits
//! candidate blocks whose parent is resident and whose transactions are all
//! valid on the parent's state. The tallest block is the tip, first seen
//! wins ties, and branches that fall `cut_off_age` blocks behind the tip
//! are discarded.

#![forbid(unsafe_code)]

// ============================================================================
// Ledger Core
// ============================================================================
pub mod blockchain;
pub mod mempool;
pub mod transaction;

// ============================================================================
// Caller Surfaces
// ============================================================================
pub mod handler;
pub mod shared;

// ============================================================================
// Cryptography
// ============================================================================
pub mod crypto;

// ============================================================================
// Configuration & Utilities
// ============================================================================
pub mod config;
pub mod error;

pub use blockchain::{Block, BlockAdmission, BlockNode, BlockTree, Sha256Hash, UtxoSnapshot};
pub use error::{ChainError, Result};
