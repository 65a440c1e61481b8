/// Transaction types for ledgertree
use crate::blockchain::Sha256Hash;
use crate::crypto::{Address, KeyPair};
use crate::error::ChainError;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Identifies one output of one transaction: the key of a UTXO.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OutPoint {
    pub tx_hash: Sha256Hash,
    pub index: u32,
}

impl OutPoint {
    pub fn new(tx_hash: Sha256Hash, index: u32) -> Self {
        Self { tx_hash, index }
    }
}

impl fmt::Display for OutPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", hex::encode(self.tx_hash), self.index)
    }
}

/// Claims a previous output. `signature` and `public_key` are filled in by
/// [`Transaction::sign_input`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxInput {
    pub prev_tx_hash: Sha256Hash,
    pub output_index: u32,
    pub signature: Option<Vec<u8>>,
    pub public_key: Option<Vec<u8>>,
}

impl TxInput {
    pub fn outpoint(&self) -> OutPoint {
        OutPoint::new(self.prev_tx_hash, self.output_index)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TxOutput {
    pub value: u64,
    pub recipient: Address,
}

/// A value transfer. A transaction without inputs is a coinbase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub inputs: Vec<TxInput>,
    pub outputs: Vec<TxOutput>,
    /// Coinbases carry the parent block hash here so that two blocks paying
    /// the same recipient never mint outputs under the same outpoint.
    #[serde(default)]
    pub anchor: Option<Sha256Hash>,
}

impl Transaction {
    pub fn new() -> Self {
        Self {
            inputs: Vec::new(),
            outputs: Vec::new(),
            anchor: None,
        }
    }

    pub fn coinbase(value: u64, recipient: Address, anchor: Sha256Hash) -> Self {
        Self {
            inputs: Vec::new(),
            outputs: vec![TxOutput { value, recipient }],
            anchor: Some(anchor),
        }
    }

    pub fn is_coinbase(&self) -> bool {
        self.inputs.is_empty()
    }

    pub fn add_input(&mut self, prev_tx_hash: Sha256Hash, output_index: u32) -> &mut Self {
        self.inputs.push(TxInput {
            prev_tx_hash,
            output_index,
            signature: None,
            public_key: None,
        });
        self
    }

    pub fn add_output(&mut self, value: u64, recipient: Address) -> &mut Self {
        self.outputs.push(TxOutput { value, recipient });
        self
    }

    /// Bytes committed to by the signature on input `index`: the claimed
    /// outpoint plus every output.
    pub fn signable_message(&self, index: usize) -> Option<Vec<u8>> {
        let input = self.inputs.get(index)?;
        let mut message = Vec::with_capacity(36 + self.outputs.len() * 40);
        message.extend_from_slice(&input.prev_tx_hash);
        message.extend_from_slice(&input.output_index.to_le_bytes());
        for output in &self.outputs {
            message.extend_from_slice(&output.value.to_le_bytes());
            message.extend_from_slice(&output.recipient);
        }
        Some(message)
    }

    pub fn sign_input(&mut self, index: usize, keypair: &KeyPair) -> Result<(), ChainError> {
        let message = self.signable_message(index).ok_or_else(|| {
            ChainError::InvalidTransaction(format!(
                "Input index {} out of range ({} inputs)",
                index,
                self.inputs.len()
            ))
        })?;
        let signature = keypair.sign(&message)?;
        let input = &mut self.inputs[index];
        input.signature = Some(signature.to_vec());
        input.public_key = Some(keypair.public_key_bytes().to_vec());
        Ok(())
    }

    /// Signs every input with the same key.
    pub fn sign_all(&mut self, keypair: &KeyPair) -> Result<(), ChainError> {
        for index in 0..self.inputs.len() {
            self.sign_input(index, keypair)?;
        }
        Ok(())
    }

    pub fn output_sum(&self) -> Option<u64> {
        self.outputs
            .iter()
            .try_fold(0u64, |acc, output| acc.checked_add(output.value))
    }

    /// Signatures are excluded so the hash is fixed before signing.
    pub fn hash(&self) -> Sha256Hash {
        let mut hasher = Sha256::new();
        hasher.update((self.inputs.len() as u64).to_le_bytes());
        for input in &self.inputs {
            hasher.update(input.prev_tx_hash);
            hasher.update(input.output_index.to_le_bytes());
        }
        hasher.update((self.outputs.len() as u64).to_le_bytes());
        for output in &self.outputs {
            hasher.update(output.value.to_le_bytes());
            hasher.update(output.recipient);
        }
        match &self.anchor {
            Some(anchor) => {
                hasher.update([1u8]);
                hasher.update(anchor);
            }
            None => hasher.update([0u8]),
        }
        hasher.finalize().into()
    }

    pub fn hash_str(&self) -> String {
        hex::encode(self.hash())
    }

    /// Validate transaction size to prevent DoS attacks
    pub fn validate_size(&self, max_size: usize) -> Result<(), ChainError> {
        let serialized = bincode::serialize(self)?;
        if serialized.len() > max_size {
            return Err(ChainError::InvalidTransaction(format!(
                "Transaction too large: {} bytes (max: {})",
                serialized.len(),
                max_size
            )));
        }
        Ok(())
    }
}

impl Default for Transaction {
    fn default() -> Self {
        Self::new()
    }
}
