//! Caller-side helpers on top of the block tree: processing incoming blocks
//! and transactions, and assembling a new block on the current tip from the
//! pending pool.

use crate::blockchain::{Block, BlockAdmission, BlockTree};
use crate::crypto::Address;
use crate::error::ChainError;
use crate::transaction::{Transaction, TxValidator, UtxoTxValidator};
use tracing::{debug, warn};

pub struct BlockHandler<V = UtxoTxValidator> {
    tree: BlockTree<V>,
}

impl<V: TxValidator> BlockHandler<V> {
    pub fn new(tree: BlockTree<V>) -> Self {
        Self { tree }
    }

    pub fn tree(&self) -> &BlockTree<V> {
        &self.tree
    }

    pub fn into_tree(self) -> BlockTree<V> {
        self.tree
    }

    pub fn process_block(&mut self, block: Block) -> bool {
        self.tree.add_block(block)
    }

    pub fn try_process_block(&mut self, block: Block) -> Result<BlockAdmission, ChainError> {
        self.tree.try_add_block(block)
    }

    pub fn process_transaction(&mut self, tx: Transaction) {
        self.tree.add_transaction(tx);
    }

    /// Builds a block on the tip paying the coinbase to `recipient`, using the
    /// pending transactions that are valid on the tip's state. Included
    /// transactions leave the pool once the block is admitted.
    pub fn create_block(&mut self, recipient: Address) -> Option<Block> {
        let parent = self.tree.tip_hash();
        let mut snapshot = self.tree.tip_utxo_snapshot();
        let candidates = self.tree.transaction_pool().transactions();
        let outcome = self
            .tree
            .validator()
            .validate_and_apply(&mut snapshot, &candidates);
        debug!(
            "Assembling block on {}: {} of {} pending transactions valid",
            hex::encode(parent),
            outcome.accepted.len(),
            candidates.len()
        );

        let block = Block::new(Some(parent), recipient, outcome.accepted);
        match self.tree.try_add_block(block.clone()) {
            Ok(_) => {
                for tx in block.transactions() {
                    self.tree.remove_transaction(&tx.hash());
                }
                Some(block)
            }
            Err(e) => {
                warn!("Failed to add created block: {}", e);
                None
            }
        }
    }
}
