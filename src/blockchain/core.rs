// core.rs splits the ledger into the block model, UTXO state, structural
// checks, the block tree itself and its pruning pass.
pub mod chain;
mod prune;
pub mod state;
pub mod tree;
pub mod validation;

pub use chain::*;
pub use state::*;
pub use tree::*;
pub use validation::*;
