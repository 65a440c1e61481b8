// Thin re-export module: implementation is in `blockchain/core.rs`, split by
// responsibility (block model, UTXO state, structural checks, tree, pruning).

pub mod core;
pub use core::*;
