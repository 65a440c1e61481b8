//! Integration tests for block admission, fork choice and the finality horizon

use ledgertree::blockchain::{Block, BlockTree, UtxoSnapshot};
use ledgertree::config::ChainConfig;
use ledgertree::crypto::{address_from_string, KeyPair};
use ledgertree::error::ChainError;
use ledgertree::transaction::{Transaction, TxValidator, UtxoTxValidator};

fn child_of(parent: &Block, nonce: u64) -> Block {
    Block::new(Some(parent.hash()), address_from_string("miner"), vec![]).with_nonce(nonce)
}

/// Extends `parent` with `count` empty blocks, returning them in order.
fn extend(tree: &mut BlockTree, parent: &Block, count: u64, nonce_base: u64) -> Vec<Block> {
    let mut blocks = Vec::new();
    let mut parent = parent.clone();
    for i in 0..count {
        let block = child_of(&parent, nonce_base + i);
        assert!(tree.add_block(block.clone()), "block {} rejected", i);
        blocks.push(block.clone());
        parent = block;
    }
    blocks
}

/// Snapshot of the observable tree state, to check rejected blocks change nothing.
fn fingerprint(tree: &BlockTree) -> (usize, [u8; 32], u64, UtxoSnapshot) {
    (
        tree.node_count(),
        tree.tip_hash(),
        tree.max_height(),
        tree.tip_utxo_snapshot(),
    )
}

#[test]
fn test_fork_choice_scenario() {
    let genesis = Block::genesis(address_from_string("miner"));
    let mut tree = BlockTree::new(genesis.clone());

    let a = child_of(&genesis, 1);
    assert!(tree.add_block(a.clone()));
    assert_eq!(tree.height_of(&a.hash()), Some(1));
    assert_eq!(tree.tip(), &a);

    let b = child_of(&genesis, 2);
    assert!(tree.add_block(b.clone()));
    assert_eq!(tree.height_of(&b.hash()), Some(1));
    assert!(tree.contains_block(&b.hash()));
    assert_eq!(tree.tip(), &a);

    let c = child_of(&a, 3);
    assert!(tree.add_block(c.clone()));
    assert_eq!(tree.height_of(&c.hash()), Some(2));
    assert_eq!(tree.tip(), &c);
    assert_eq!(tree.max_height(), 2);
}

#[test]
fn test_first_seen_wins_equal_height() {
    let genesis = Block::genesis(address_from_string("miner"));
    let mut tree = BlockTree::new(genesis.clone());
    let a = child_of(&genesis, 1);
    let b = child_of(&genesis, 2);
    let a2 = child_of(&a, 3);
    let b2 = child_of(&b, 4);

    for block in [&a, &b, &b2, &a2] {
        assert!(tree.add_block(block.clone()));
    }
    // b2 reached height 2 first; a2 arrives later on another parent.
    assert_eq!(tree.tip(), &b2);
    let admission = tree.try_add_block(child_of(&a2, 5)).unwrap();
    assert!(admission.became_tip);
    assert_eq!(admission.height, 3);
}

#[test]
fn test_heights_follow_parents() {
    let genesis = Block::genesis(address_from_string("miner"));
    let mut tree = BlockTree::new(genesis.clone());
    let main = extend(&mut tree, &genesis, 4, 0);
    extend(&mut tree, &main[1], 2, 100);

    for node in tree.nodes() {
        match node.parent() {
            None => assert_eq!(node.height(), 0),
            Some(parent) => assert_eq!(node.height(), tree.height_of(&parent).unwrap() + 1),
        }
    }
}

#[test]
fn test_genesis_resubmission_has_no_parent() {
    let genesis = Block::genesis(address_from_string("miner"));
    let mut tree = BlockTree::new(genesis.clone());
    let other_genesis = Block::genesis(address_from_string("someone")).with_nonce(9);

    assert_eq!(tree.try_add_block(other_genesis), Err(ChainError::MissingParentHash));
    assert!(!tree.add_block(genesis));
}

#[test]
fn test_unknown_parent_rejected_without_side_effects() {
    let genesis = Block::genesis(address_from_string("miner"));
    let mut tree = BlockTree::new(genesis.clone());
    extend(&mut tree, &genesis, 2, 0);
    let before = fingerprint(&tree);

    let orphan = Block::new(Some([0xEE; 32]), address_from_string("miner"), vec![]);
    assert!(matches!(tree.try_add_block(orphan), Err(ChainError::UnknownParent(_))));
    assert_eq!(fingerprint(&tree), before);
}

#[test]
fn test_duplicate_block_rejected() {
    let genesis = Block::genesis(address_from_string("miner"));
    let mut tree = BlockTree::new(genesis.clone());
    let a = child_of(&genesis, 1);
    assert!(tree.add_block(a.clone()));
    let before = fingerprint(&tree);

    assert_eq!(tree.try_add_block(a), Err(ChainError::BlockAlreadyExists));
    assert_eq!(fingerprint(&tree), before);
}

#[test]
fn test_partially_valid_block_is_atomic() {
    let miner = KeyPair::generate();
    let genesis = Block::genesis(miner.address());
    let mut tree = BlockTree::new(genesis.clone());

    let mut good = Transaction::new();
    good.add_input(genesis.coinbase().hash(), 0)
        .add_output(25, address_from_string("bob"));
    good.sign_all(&miner).unwrap();

    let mut unsigned = Transaction::new();
    unsigned
        .add_input(good.hash(), 0)
        .add_output(25, address_from_string("carol"));

    let before = fingerprint(&tree);
    let block = Block::new(Some(genesis.hash()), miner.address(), vec![good.clone(), unsigned]);
    assert_eq!(
        tree.try_add_block(block.clone()),
        Err(ChainError::IncompleteTransactionSet { accepted: 1, submitted: 2 })
    );
    assert_eq!(fingerprint(&tree), before);
    assert!(!tree.contains_block(&block.hash()));

    // The genesis output is still spendable on the genesis branch.
    let ok = Block::new(Some(genesis.hash()), miner.address(), vec![good]);
    assert!(tree.add_block(ok));
}

#[test]
fn test_malformed_block_rejected() {
    let genesis = Block::genesis(address_from_string("miner"));
    let mut tree = BlockTree::new(genesis.clone());
    let mut block = child_of(&genesis, 1);
    block.coinbase.outputs[0].value = 1_000_000;

    assert!(matches!(tree.try_add_block(block), Err(ChainError::InvalidBlock(_))));
    assert_eq!(tree.node_count(), 1);
}

#[test]
fn test_coinbase_without_outputs_admitted() {
    let genesis = Block::genesis(address_from_string("miner"));
    let mut tree = BlockTree::new(genesis.clone());
    let mut coinbase = Transaction::coinbase(25, address_from_string("miner"), genesis.hash());
    coinbase.outputs.clear();
    let block = Block::from_parts(Some(genesis.hash()), coinbase, vec![]);

    let admission = tree.try_add_block(block).unwrap();
    assert!(admission.became_tip);
    assert_eq!(tree.tip_utxo_snapshot().len(), 1);
}

#[test]
fn test_cut_off_scenario_rejects_height_one_after_tip_reaches_eleven() {
    let genesis = Block::genesis(address_from_string("miner"));
    let mut tree = BlockTree::new(genesis.clone());
    assert_eq!(tree.cut_off_age(), 10);

    extend(&mut tree, &genesis, 10, 0);
    // Tip at 10: horizon 0, a new height-1 block is still admissible.
    assert!(tree.add_block(child_of(&genesis, 500)));

    let main = tree.main_chain();
    let tip = tree.block(&main[0]).unwrap().clone();
    extend(&mut tree, &tip, 1, 1000);
    assert_eq!(tree.max_height(), 11);

    // Horizon 1: genesis is gone and its former child is the root.
    assert!(!tree.contains_block(&genesis.hash()));
    assert_eq!(tree.root_hash(), main[main.len() - 2]);

    let before = fingerprint(&tree);
    assert!(!tree.add_block(child_of(&genesis, 501)));
    assert_eq!(fingerprint(&tree), before);
}

#[test]
fn test_horizon_rejects_otherwise_valid_block() {
    let genesis = Block::genesis(address_from_string("miner"));
    let config = ChainConfig {
        cut_off_age: 3,
        ..ChainConfig::default()
    };
    let mut tree = BlockTree::with_config(genesis.clone(), &config);
    let main = extend(&mut tree, &genesis, 6, 0);

    // Horizon is 3: a child of main[1] (height 2) would sit at 3.
    assert!(!tree.add_block(child_of(&main[1], 77)));
    assert_eq!(tree.root_hash(), main[2].hash());
    // A child of main[2] lands at 4 and is admitted as a fork.
    let fork = child_of(&main[2], 78);
    let admission = tree.try_add_block(fork).unwrap();
    assert!(!admission.became_tip);
    assert_eq!(admission.height, 4);
}

#[test]
fn test_pruned_parent_rejected() {
    let genesis = Block::genesis(address_from_string("miner"));
    let config = ChainConfig {
        cut_off_age: 2,
        ..ChainConfig::default()
    };
    let mut tree = BlockTree::with_config(genesis.clone(), &config);
    let stale = child_of(&genesis, 99);
    assert!(tree.add_block(stale.clone()));
    extend(&mut tree, &genesis, 4, 0);
    assert!(!tree.contains_block(&stale.hash()));

    let before = fingerprint(&tree);
    let late = child_of(&stale, 100);
    assert!(matches!(tree.try_add_block(late), Err(ChainError::UnknownParent(_))));
    assert_eq!(fingerprint(&tree), before);
}

#[test]
fn test_survivors_are_recent_or_on_spine() {
    let genesis = Block::genesis(address_from_string("miner"));
    let config = ChainConfig {
        cut_off_age: 3,
        ..ChainConfig::default()
    };
    let mut tree = BlockTree::with_config(genesis.clone(), &config);

    let mut tip = genesis.clone();
    for round in 0..12u64 {
        // A short fork off the block just behind the tip, then extend the main line.
        if let Some(parent) = tree.node(&tip.hash()).and_then(|n| n.parent()) {
            let parent = tree.block(&parent).unwrap().clone();
            tree.add_block(child_of(&parent, 10_000 + round));
        }
        tip = extend(&mut tree, &tip, 1, round * 10)[0].clone();

        let horizon = tree.max_height().saturating_sub(tree.cut_off_age());
        for node in tree.nodes() {
            assert!(
                node.height() > horizon || tree.is_ancestor_of_tip(&node.hash()),
                "node at height {} survived horizon {}",
                node.height(),
                horizon
            );
        }
        // Every resident node reaches the root through resident parents.
        for node in tree.nodes() {
            let mut cursor = node;
            while let Some(parent) = cursor.parent() {
                cursor = tree.node(&parent).expect("parent must be resident");
            }
            assert_eq!(cursor.hash(), tree.root_hash());
        }
    }

    // Spine from the root (4 nodes) plus at most one fork per height above it.
    let cut_off_age = tree.cut_off_age() as usize;
    assert!(tree.node_count() <= (cut_off_age + 1) + cut_off_age);
}

#[test]
fn test_residency_independent_of_chain_length() {
    let genesis = Block::genesis(address_from_string("miner"));
    let mut tree = BlockTree::new(genesis.clone());
    let cut_off_age = tree.cut_off_age();

    let main = extend(&mut tree, &genesis, 2000, 0);
    assert_eq!(tree.max_height(), 2000);
    assert_eq!(tree.node_count() as u64, cut_off_age + 1);

    // A fork at every height inside the window adds one node each.
    let mut forks = 0;
    for (i, parent) in main[main.len() - cut_off_age as usize..main.len() - 1]
        .iter()
        .enumerate()
    {
        assert!(tree.add_block(child_of(parent, 50_000 + i as u64)));
        forks += 1;
    }
    assert_eq!(tree.node_count() as u64, cut_off_age + 1 + forks);

    // Extending the tip past the window drops the forks again.
    extend(&mut tree, &main[main.len() - 1], cut_off_age, 60_000);
    assert_eq!(tree.node_count() as u64, cut_off_age + 1);
}

#[test]
fn test_tip_snapshot_is_a_private_copy() {
    let miner = KeyPair::generate();
    let genesis = Block::genesis(miner.address());
    let tree = BlockTree::new(genesis.clone());

    let mut copy = tree.tip_utxo_snapshot();
    let outpoints = copy.outpoints_of(&miner.address());
    copy.remove_entry(&outpoints[0]);
    assert!(copy.is_empty());

    assert_eq!(tree.tip_utxo_snapshot().len(), 1);
}

#[test]
fn test_siblings_do_not_see_each_other_spends() {
    let miner = KeyPair::generate();
    let genesis = Block::genesis(miner.address());
    let mut tree = BlockTree::new(genesis.clone());

    let spend = |to: &str| {
        let mut tx = Transaction::new();
        tx.add_input(genesis.coinbase().hash(), 0)
            .add_output(25, address_from_string(to));
        tx.sign_all(&miner).unwrap();
        tx
    };

    // Both siblings spend the same genesis output; each is valid on its own branch.
    let a = Block::new(Some(genesis.hash()), miner.address(), vec![spend("bob")]);
    let b = Block::new(Some(genesis.hash()), miner.address(), vec![spend("carol")]);
    assert!(tree.add_block(a.clone()));
    assert!(tree.add_block(b.clone()));

    let a_state = tree.node(&a.hash()).unwrap().utxo_snapshot();
    let b_state = tree.node(&b.hash()).unwrap().utxo_snapshot();
    assert_eq!(a_state.balance_of(&address_from_string("bob")), 25);
    assert_eq!(a_state.balance_of(&address_from_string("carol")), 0);
    assert_eq!(b_state.balance_of(&address_from_string("carol")), 25);
    assert_eq!(
        tree.node(&genesis.hash()).unwrap().utxo_snapshot().len(),
        1
    );
}

#[test]
fn test_block_cannot_spend_its_own_coinbase() {
    let miner = KeyPair::generate();
    let genesis = Block::genesis(miner.address());
    let mut tree = BlockTree::new(genesis.clone());

    let template = Block::new(Some(genesis.hash()), miner.address(), vec![]);
    let mut spend = Transaction::new();
    spend
        .add_input(template.coinbase().hash(), 0)
        .add_output(25, address_from_string("bob"));
    spend.sign_all(&miner).unwrap();

    let block = Block::from_parts(Some(genesis.hash()), template.coinbase().clone(), vec![spend]);
    assert!(!tree.add_block(block));
}

#[test]
fn test_tip_snapshot_replays_from_parent() {
    let miner = KeyPair::generate();
    let bob = KeyPair::generate();
    let genesis = Block::genesis(miner.address());
    let mut tree = BlockTree::new(genesis.clone());

    let mut to_bob = Transaction::new();
    to_bob
        .add_input(genesis.coinbase().hash(), 0)
        .add_output(15, bob.address())
        .add_output(10, miner.address());
    to_bob.sign_all(&miner).unwrap();
    let a = Block::new(Some(genesis.hash()), miner.address(), vec![to_bob.clone()]);
    assert!(tree.add_block(a.clone()));

    let mut from_bob = Transaction::new();
    from_bob
        .add_input(to_bob.hash(), 0)
        .add_output(15, address_from_string("carol"));
    from_bob.sign_all(&bob).unwrap();
    let b = Block::new(Some(a.hash()), miner.address(), vec![from_bob]);
    assert!(tree.add_block(b.clone()));
    assert_eq!(tree.tip(), &b);

    let mut replay = tree.node(&a.hash()).unwrap().utxo_snapshot().copy();
    let outcome = UtxoTxValidator::default().validate_and_apply(&mut replay, b.transactions());
    assert!(outcome.is_complete(b.transactions().len()));
    replay.apply_transaction(b.coinbase());

    assert_eq!(replay, tree.tip_utxo_snapshot());
    assert_eq!(replay.total_value(), 25 * 3);
}

#[test]
fn test_pool_is_independent_of_chain_state() {
    let genesis = Block::genesis(address_from_string("miner"));
    let mut tree = BlockTree::new(genesis.clone());

    let mut tx = Transaction::new();
    tx.add_input([1u8; 32], 7).add_output(5, address_from_string("bob"));
    tree.add_transaction(tx.clone());
    extend(&mut tree, &genesis, 3, 0);

    assert_eq!(tree.transaction_pool().len(), 1);
    assert!(tree.transaction_pool().contains(&tx.hash()));
}
