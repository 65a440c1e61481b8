/// Validation of transactions against a UTXO snapshot
use crate::blockchain::{Sha256Hash, UtxoSnapshot};
use crate::config::MAX_TRANSACTION_SIZE;
use crate::crypto::{address_from_public_key, verify_signature};
use crate::error::ChainError;
use crate::transaction::types::Transaction;
use std::collections::HashSet;

/// Result of validating a batch of transactions.
#[derive(Debug, Clone, Default)]
pub struct ValidationOutcome {
    /// Accepted transactions, in the order they were applied.
    pub accepted: Vec<Transaction>,
    /// Rejected transactions with the reason from their last check.
    pub rejected: Vec<(Sha256Hash, ChainError)>,
}

impl ValidationOutcome {
    /// True when every one of `submitted` transactions was accepted.
    pub fn is_complete(&self, submitted: usize) -> bool {
        self.accepted.len() == submitted
    }
}

/// Decides which transactions of a batch are valid against a snapshot.
///
/// Implementations mutate `snapshot` in place to reflect exactly the
/// accepted transactions.
pub trait TxValidator {
    fn validate_and_apply(
        &self,
        snapshot: &mut UtxoSnapshot,
        transactions: &[Transaction],
    ) -> ValidationOutcome;
}

/// Default validator: signatures, ownership, double spends and value
/// conservation.
#[derive(Debug, Clone)]
pub struct UtxoTxValidator {
    pub max_transaction_size: usize,
}

impl Default for UtxoTxValidator {
    fn default() -> Self {
        Self {
            max_transaction_size: MAX_TRANSACTION_SIZE,
        }
    }
}

impl UtxoTxValidator {
    pub fn new(max_transaction_size: usize) -> Self {
        Self {
            max_transaction_size,
        }
    }

    /// Checks a single transaction against `snapshot` without applying it.
    pub fn check_transaction(
        &self,
        snapshot: &UtxoSnapshot,
        tx: &Transaction,
    ) -> Result<(), ChainError> {
        tx.validate_size(self.max_transaction_size)?;

        if tx.is_coinbase() {
            return Err(ChainError::InvalidTransaction(
                "Transaction without inputs is only valid as a block coinbase".to_string(),
            ));
        }

        let mut claimed = HashSet::with_capacity(tx.inputs.len());
        let mut input_sum: u64 = 0;

        for (index, input) in tx.inputs.iter().enumerate() {
            let outpoint = input.outpoint();
            let spent = snapshot
                .get(&outpoint)
                .ok_or_else(|| ChainError::UtxoNotFound(outpoint.to_string()))?;

            if !claimed.insert(outpoint) {
                return Err(ChainError::DoubleSpendDetected(format!(
                    "UTXO {} claimed twice by {}",
                    outpoint,
                    tx.hash_str()
                )));
            }

            let (signature, public_key) = match (&input.signature, &input.public_key) {
                (Some(sig), Some(pk)) => (sig, pk),
                _ => {
                    return Err(ChainError::InvalidTransaction(format!(
                        "Input {} is not signed",
                        index
                    )))
                }
            };

            if address_from_public_key(public_key) != spent.recipient {
                return Err(ChainError::InvalidTransaction(format!(
                    "Input {} public key does not own UTXO {} (owned by {})",
                    index,
                    outpoint,
                    hex::encode(spent.recipient)
                )));
            }

            // Index comes from enumerate(), so the message always exists.
            let message = tx.signable_message(index).unwrap_or_default();
            verify_signature(public_key, &message, signature)?;

            input_sum = input_sum.checked_add(spent.value).ok_or_else(|| {
                ChainError::InvalidTransaction("Input value overflow".to_string())
            })?;
        }

        let output_sum = tx.output_sum().ok_or_else(|| {
            ChainError::InvalidTransaction("Output value overflow".to_string())
        })?;

        if output_sum > input_sum {
            return Err(ChainError::InvalidTransaction(format!(
                "Insufficient input value: inputs {} < outputs {}",
                input_sum, output_sum
            )));
        }

        Ok(())
    }
}

impl TxValidator for UtxoTxValidator {
    /// Accepts the maximal mutually valid subset. Passes repeat until no
    /// further transaction becomes valid, so a spend listed before the
    /// transaction that funds it is still accepted.
    fn validate_and_apply(
        &self,
        snapshot: &mut UtxoSnapshot,
        transactions: &[Transaction],
    ) -> ValidationOutcome {
        let mut outcome = ValidationOutcome::default();
        let mut pending: Vec<&Transaction> = transactions.iter().collect();

        loop {
            let mut progressed = false;
            let mut deferred = Vec::new();
            outcome.rejected.clear();

            for tx in pending {
                match self.check_transaction(snapshot, tx) {
                    Ok(()) => {
                        snapshot.apply_transaction(tx);
                        outcome.accepted.push(tx.clone());
                        progressed = true;
                    }
                    Err(err) => {
                        outcome.rejected.push((tx.hash(), err));
                        deferred.push(tx);
                    }
                }
            }

            pending = deferred;
            if !progressed || pending.is_empty() {
                break;
            }
        }

        outcome
    }
}
