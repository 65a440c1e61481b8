use crate::crypto::Address;
use crate::transaction::{OutPoint, Transaction, TxOutput};
use imbl::HashMap;
use serde::{Deserialize, Serialize};

/// Unspent outputs at one point of one branch.
///
/// Backed by a persistent map: [`UtxoSnapshot::copy`] is O(1) and shares
/// structure with the original, and writes to either side never show up in
/// the other.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UtxoSnapshot {
    utxos: HashMap<OutPoint, TxOutput>,
}

impl UtxoSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// A fresh snapshot holding exactly the outputs of `coinbase`.
    pub fn from_coinbase(coinbase: &Transaction) -> Self {
        let mut snapshot = Self::new();
        snapshot.apply_transaction(coinbase);
        snapshot
    }

    pub fn copy(&self) -> Self {
        self.clone()
    }

    pub fn add_entry(&mut self, outpoint: OutPoint, output: TxOutput) {
        self.utxos.insert(outpoint, output);
    }

    pub fn remove_entry(&mut self, outpoint: &OutPoint) -> Option<TxOutput> {
        self.utxos.remove(outpoint)
    }

    pub fn get(&self, outpoint: &OutPoint) -> Option<&TxOutput> {
        self.utxos.get(outpoint)
    }

    pub fn contains(&self, outpoint: &OutPoint) -> bool {
        self.utxos.contains_key(outpoint)
    }

    pub fn len(&self) -> usize {
        self.utxos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.utxos.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&OutPoint, &TxOutput)> {
        self.utxos.iter()
    }

    /// Outpoints currently spendable by `address`.
    pub fn outpoints_of(&self, address: &Address) -> Vec<OutPoint> {
        let mut outpoints: Vec<OutPoint> = self
            .utxos
            .iter()
            .filter(|(_, output)| &output.recipient == address)
            .map(|(outpoint, _)| *outpoint)
            .collect();
        outpoints.sort();
        outpoints
    }

    pub fn balance_of(&self, address: &Address) -> u64 {
        self.utxos
            .values()
            .filter(|output| &output.recipient == address)
            .fold(0u64, |acc, output| acc.saturating_add(output.value))
    }

    pub fn total_value(&self) -> u64 {
        self.utxos
            .values()
            .fold(0u64, |acc, output| acc.saturating_add(output.value))
    }

    /// Spends the transaction's inputs and credits its outputs under
    /// `(tx_hash, index)`. Callers validate first; missing inputs are ignored.
    pub fn apply_transaction(&mut self, tx: &Transaction) {
        for input in &tx.inputs {
            self.utxos.remove(&input.outpoint());
        }
        let tx_hash = tx.hash();
        for (index, output) in tx.outputs.iter().enumerate() {
            self.utxos
                .insert(OutPoint::new(tx_hash, index as u32), output.clone());
        }
    }
}
