#![forbid(unsafe_code)]

use clap::Parser;
use colored::*;
use ledgertree::blockchain::{Block, BlockTree};
use ledgertree::config::load_config;
use ledgertree::crypto::{address_from_string, KeyPair};
use ledgertree::error::ChainError;
use ledgertree::handler::BlockHandler;
use ledgertree::transaction::Transaction;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::{BTreeMap, VecDeque};
use std::path::PathBuf;
use tracing::info;

/// Feeds a synthetic block stream, with forks and payments, into a block tree.
#[derive(Parser, Debug)]
#[command(name = "ledgertree-sim", version)]
struct Args {
    /// Path to a TOML config file; defaults apply when it does not exist
    #[arg(long, default_value = "ledgertree.toml")]
    config: PathBuf,
    /// Number of blocks to offer
    #[arg(long, default_value_t = 200)]
    blocks: u64,
    /// Offer a fork off a random recent block every N blocks (0 disables)
    #[arg(long, default_value_t = 5)]
    fork_every: u64,
    /// Overrides chain.cut_off_age from the config
    #[arg(long)]
    cut_off_age: Option<u64>,
    #[arg(long, default_value_t = 42)]
    seed: u64,
    /// Print the summary as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Default, serde::Serialize)]
struct Summary {
    offered: u64,
    admitted: u64,
    rejected: BTreeMap<&'static str, u64>,
    payments: u64,
    tip_height: u64,
    tip_hash: String,
    resident_nodes: usize,
    miner_balance: u64,
}

fn reason_label(err: &ChainError) -> &'static str {
    match err {
        ChainError::MissingParentHash => "missing_parent_hash",
        ChainError::UnknownParent(_) => "unknown_parent",
        ChainError::BlockAlreadyExists => "duplicate",
        ChainError::BelowFinalityHorizon { .. } => "below_horizon",
        ChainError::IncompleteTransactionSet { .. } => "incomplete_transactions",
        ChainError::InvalidBlock(_) => "invalid_block",
        _ => "other",
    }
}

/// Spends one miner-owned output from the tip state: half to bob, change back.
fn payment_from_tip<V: ledgertree::transaction::TxValidator>(
    tree: &BlockTree<V>,
    miner: &KeyPair,
) -> Option<Transaction> {
    let snapshot = tree.tip_utxo_snapshot();
    let outpoint = snapshot.outpoints_of(&miner.address()).into_iter().next()?;
    let value = snapshot.get(&outpoint)?.value;

    let mut tx = Transaction::new();
    tx.add_input(outpoint.tx_hash, outpoint.index)
        .add_output(value / 2, address_from_string("bob"))
        .add_output(value - value / 2, miner.address());
    tx.sign_all(miner).ok()?;
    Some(tx)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut config = load_config(&args.config)?;
    if let Some(cut_off_age) = args.cut_off_age {
        config.chain.cut_off_age = cut_off_age;
        config.validate()?;
    }
    tracing_subscriber::fmt()
        .with_max_level(config.logging.tracing_level()?)
        .init();

    let miner = KeyPair::generate();
    let genesis = Block::genesis(miner.address());
    let mut handler = BlockHandler::new(BlockTree::with_config(genesis.clone(), &config.chain));
    let mut rng = StdRng::seed_from_u64(args.seed);

    // Parents for forks; deep enough that some forks land behind the horizon.
    let window = (config.chain.cut_off_age + 3) as usize;
    let mut recent: VecDeque<Block> = VecDeque::from([genesis]);
    let mut summary = Summary::default();

    info!(
        "Simulating {} blocks (cut_off_age = {}, fork_every = {})",
        args.blocks, config.chain.cut_off_age, args.fork_every
    );

    for i in 1..=args.blocks {
        summary.offered += 1;

        let admitted = if args.fork_every > 0 && i % args.fork_every == 0 {
            let parent = &recent[rng.gen_range(0..recent.len())];
            let block = Block::new(Some(parent.hash()), address_from_string("forker"), vec![])
                .with_nonce(i);
            match handler.try_process_block(block.clone()) {
                Ok(_) => Some(block),
                Err(e) => {
                    *summary.rejected.entry(reason_label(&e)).or_default() += 1;
                    None
                }
            }
        } else {
            if rng.gen_bool(0.5) {
                if let Some(tx) = payment_from_tip(handler.tree(), &miner) {
                    handler.process_transaction(tx);
                    summary.payments += 1;
                }
            }
            let created = handler.create_block(miner.address());
            if created.is_none() {
                *summary.rejected.entry("create_failed").or_default() += 1;
            }
            created
        };

        if let Some(block) = admitted {
            summary.admitted += 1;
            recent.push_back(block);
            if recent.len() > window {
                recent.pop_front();
            }
        }
    }

    let tree = handler.tree();
    summary.tip_height = tree.max_height();
    summary.tip_hash = hex::encode(tree.tip_hash());
    summary.resident_nodes = tree.node_count();
    summary.miner_balance = tree.tip_utxo_snapshot().balance_of(&miner.address());

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    println!("{}", "ledgertree simulation".bright_cyan().bold());
    println!("{}", "---------------------".bright_cyan());
    println!("  Offered:        {}", summary.offered);
    println!("  Admitted:       {}", summary.admitted.to_string().bright_green());
    for (reason, count) in &summary.rejected {
        println!("  Rejected ({}): {}", reason, count.to_string().yellow());
    }
    println!("  Payments:       {}", summary.payments);
    println!("  Tip height:     {}", summary.tip_height);
    println!("  Tip hash:       {}", summary.tip_hash.bright_white());
    println!("  Resident nodes: {}", summary.resident_nodes);
    println!("  Miner balance:  {}", summary.miner_balance);
    Ok(())
}
