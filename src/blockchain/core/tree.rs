use crate::config::ChainConfig;
use crate::error::ChainError;
use crate::mempool::TransactionPool;
use crate::transaction::{Transaction, TxValidator, UtxoTxValidator};
use std::collections::{HashMap, HashSet};
use tracing::{debug, info};

use super::chain::{Block, Sha256Hash};
use super::state::UtxoSnapshot;
use super::validation::validate_block_structure;

/// One admitted block and its place in the tree.
///
/// Parent and children are stored as block hashes into the tree's node map,
/// so nodes never own each other.
#[derive(Debug, Clone)]
pub struct BlockNode {
    pub(super) block: Block,
    pub(super) parent: Option<Sha256Hash>,
    pub(super) children: HashSet<Sha256Hash>,
    pub(super) height: u64,
    /// State after this block, coinbase included.
    pub(super) utxo_snapshot: UtxoSnapshot,
}

impl BlockNode {
    pub fn block(&self) -> &Block {
        &self.block
    }

    pub fn hash(&self) -> Sha256Hash {
        self.block.hash()
    }

    pub fn parent(&self) -> Option<Sha256Hash> {
        self.parent
    }

    pub fn children(&self) -> impl Iterator<Item = &Sha256Hash> {
        self.children.iter()
    }

    pub fn height(&self) -> u64 {
        self.height
    }

    pub fn utxo_snapshot(&self) -> &UtxoSnapshot {
        &self.utxo_snapshot
    }
}

/// Summary of a successful [`BlockTree::try_add_block`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockAdmission {
    pub hash: Sha256Hash,
    pub height: u64,
    pub became_tip: bool,
    /// Nodes evicted by the pruning pass this admission triggered.
    pub pruned: usize,
}

/// All un-pruned blocks, the best tip and the pending transaction pool.
#[derive(Debug, Clone)]
pub struct BlockTree<V = UtxoTxValidator> {
    pub(super) nodes: HashMap<Sha256Hash, BlockNode>,
    /// Oldest resident block: genesis until the first pruning pass, then the
    /// tip's ancestor at the last applied horizon. Its parent link is cleared.
    pub(super) root: Sha256Hash,
    pub(super) tip: Sha256Hash,
    pub(super) max_height: u64,
    /// Horizon applied by the last pruning pass.
    pub(super) pruned_horizon: u64,
    pub(super) cut_off_age: u64,
    tx_pool: TransactionPool,
    validator: V,
}

impl BlockTree<UtxoTxValidator> {
    /// Tree over a trusted genesis block with the default configuration.
    pub fn new(genesis: Block) -> Self {
        Self::with_config(genesis, &ChainConfig::default())
    }

    pub fn with_config(genesis: Block, config: &ChainConfig) -> Self {
        let validator = UtxoTxValidator::new(config.max_transaction_size);
        Self::with_validator(genesis, config, validator)
    }
}

impl<V: TxValidator> BlockTree<V> {
    /// Genesis is not validated: its coinbase outputs seed the first snapshot.
    pub fn with_validator(genesis: Block, config: &ChainConfig, validator: V) -> Self {
        let hash = genesis.hash();
        let snapshot = UtxoSnapshot::from_coinbase(genesis.coinbase());
        let node = BlockNode {
            block: genesis,
            parent: None,
            children: HashSet::new(),
            height: 0,
            utxo_snapshot: snapshot,
        };

        let mut nodes = HashMap::new();
        nodes.insert(hash, node);

        info!("Block tree initialized at genesis {}", hex::encode(hash));
        Self {
            nodes,
            root: hash,
            tip: hash,
            max_height: 0,
            pruned_horizon: 0,
            cut_off_age: config.cut_off_age,
            tx_pool: TransactionPool::new(),
            validator,
        }
    }

    fn tip_node(&self) -> &BlockNode {
        // The tip is never pruned.
        &self.nodes[&self.tip]
    }

    /// The block at the greatest height, first seen wins ties.
    pub fn tip(&self) -> &Block {
        &self.tip_node().block
    }

    pub fn tip_hash(&self) -> Sha256Hash {
        self.tip
    }

    pub fn max_height(&self) -> u64 {
        self.max_height
    }

    /// Owned copy of the state to build the next block on. Cheap: the copy
    /// shares structure with the stored snapshot.
    pub fn tip_utxo_snapshot(&self) -> UtxoSnapshot {
        self.tip_node().utxo_snapshot.copy()
    }

    pub fn transaction_pool(&self) -> &TransactionPool {
        &self.tx_pool
    }

    /// Unconditional insert into the pending pool.
    pub fn add_transaction(&mut self, tx: Transaction) {
        self.tx_pool.add(tx);
    }

    pub fn remove_transaction(&mut self, hash: &Sha256Hash) -> Option<Transaction> {
        self.tx_pool.remove(hash)
    }

    pub fn validator(&self) -> &V {
        &self.validator
    }

    /// Every resident node reaches this block through resident parents.
    pub fn root_hash(&self) -> Sha256Hash {
        self.root
    }

    pub fn cut_off_age(&self) -> u64 {
        self.cut_off_age
    }

    /// Greatest height at which new blocks are refused, if any.
    pub fn finality_horizon(&self) -> Option<u64> {
        self.max_height.checked_sub(self.cut_off_age)
    }

    pub fn node(&self, hash: &Sha256Hash) -> Option<&BlockNode> {
        self.nodes.get(hash)
    }

    pub fn block(&self, hash: &Sha256Hash) -> Option<&Block> {
        self.nodes.get(hash).map(|node| &node.block)
    }

    pub fn contains_block(&self, hash: &Sha256Hash) -> bool {
        self.nodes.contains_key(hash)
    }

    pub fn height_of(&self, hash: &Sha256Hash) -> Option<u64> {
        self.nodes.get(hash).map(|node| node.height)
    }

    /// Number of resident nodes.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn nodes(&self) -> impl Iterator<Item = &BlockNode> {
        self.nodes.values()
    }

    /// Hashes from the tip back to the root.
    pub fn main_chain(&self) -> Vec<Sha256Hash> {
        let mut chain = Vec::with_capacity(self.max_height as usize + 1);
        let mut cursor = Some(self.tip);
        while let Some(hash) = cursor {
            chain.push(hash);
            cursor = self.nodes.get(&hash).and_then(|node| node.parent);
        }
        chain
    }

    pub fn is_ancestor_of_tip(&self, hash: &Sha256Hash) -> bool {
        let Some(target) = self.nodes.get(hash) else {
            return false;
        };
        let mut cursor = self.tip_node();
        while cursor.height > target.height {
            match cursor.parent.and_then(|parent| self.nodes.get(&parent)) {
                Some(parent) => cursor = parent,
                None => return false,
            }
        }
        cursor.hash() == *hash
    }

    /// Offers a candidate block. Returns `true` when it was admitted; a
    /// rejected block leaves the tree untouched.
    pub fn add_block(&mut self, block: Block) -> bool {
        let hash = block.hash();
        match self.try_add_block(block) {
            Ok(_) => true,
            Err(e) => {
                debug!("Rejected block {}: {}", hex::encode(hash), e);
                false
            }
        }
    }

    /// Like [`BlockTree::add_block`], reporting why a block was refused.
    pub fn try_add_block(&mut self, block: Block) -> Result<BlockAdmission, ChainError> {
        let parent_hash = block.parent_hash().ok_or(ChainError::MissingParentHash)?;
        let hash = block.hash();
        if self.nodes.contains_key(&hash) {
            return Err(ChainError::BlockAlreadyExists);
        }

        let parent = self
            .nodes
            .get(&parent_hash)
            .ok_or_else(|| ChainError::UnknownParent(hex::encode(parent_hash)))?;
        let height = parent.height + 1;

        if let Some(horizon) = self.finality_horizon() {
            if height <= horizon {
                return Err(ChainError::BelowFinalityHorizon { height, horizon });
            }
        }

        validate_block_structure(&block)?;

        // Work on a private copy; the parent's snapshot stays as committed.
        let mut snapshot = parent.utxo_snapshot.copy();

        let submitted = block.transactions().len();
        let outcome = self
            .validator
            .validate_and_apply(&mut snapshot, block.transactions());
        if !outcome.is_complete(submitted) {
            if let Some((tx_hash, reason)) = outcome.rejected.first() {
                debug!("Transaction {} rejected: {}", hex::encode(tx_hash), reason);
            }
            return Err(ChainError::IncompleteTransactionSet {
                accepted: outcome.accepted.len(),
                submitted,
            });
        }

        snapshot.apply_transaction(block.coinbase());

        self.nodes.insert(
            hash,
            BlockNode {
                block,
                parent: Some(parent_hash),
                children: HashSet::new(),
                height,
                utxo_snapshot: snapshot,
            },
        );
        if let Some(parent) = self.nodes.get_mut(&parent_hash) {
            parent.children.insert(hash);
        }

        let became_tip = height > self.max_height;
        let mut pruned = 0;
        if became_tip {
            self.tip = hash;
            self.max_height = height;
            info!("New tip {} at height {}", hex::encode(hash), height);
            pruned = self.prune();
        } else {
            debug!(
                "Stored fork block {} at height {} (tip height {})",
                hex::encode(hash),
                height,
                self.max_height
            );
        }

        Ok(BlockAdmission {
            hash,
            height,
            became_tip,
            pruned,
        })
    }
}
