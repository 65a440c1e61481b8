use crate::error::ChainError;
use std::collections::HashMap;

use super::chain::Block;

/// Context-free checks run before a block's transactions reach the validator.
pub fn validate_block_structure(block: &Block) -> Result<(), ChainError> {
    validate_coinbase(block)?;
    validate_merkle_root(block)?;
    validate_no_double_spend(block)
}

fn validate_coinbase(block: &Block) -> Result<(), ChainError> {
    if !block.coinbase.is_coinbase() {
        return Err(ChainError::InvalidBlock(
            "Coinbase transaction must not spend inputs".to_string(),
        ));
    }
    Ok(())
}

fn validate_merkle_root(block: &Block) -> Result<(), ChainError> {
    let expected = Block::calculate_merkle_root(&block.coinbase, &block.transactions);
    if expected != block.header.merkle_root {
        return Err(ChainError::InvalidBlock(format!(
            "Merkle root mismatch. Expected {}, but got {}.",
            hex::encode(expected),
            hex::encode(block.header.merkle_root)
        )));
    }
    Ok(())
}

pub fn validate_no_double_spend(block: &Block) -> Result<(), ChainError> {
    let mut seen_inputs = HashMap::new();
    for tx in &block.transactions {
        let tx_hash = tx.hash();
        for input in &tx.inputs {
            let outpoint = input.outpoint();
            if let Some(conflicting_tx_hash) = seen_inputs.insert(outpoint, tx_hash) {
                return Err(ChainError::InvalidBlock(format!(
                    "Double spend detected in block. UTXO {} is spent by both {} and {}",
                    outpoint,
                    hex::encode(conflicting_tx_hash),
                    hex::encode(tx_hash)
                )));
            }
        }
    }
    Ok(())
}
