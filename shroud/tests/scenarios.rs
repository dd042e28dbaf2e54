// Copyright (c) 2024 Shroud Foundation

mod common;

use common::TestChain;
use ed25519_dalek::SigningKey;
use shroud::mempool::{Admission, MempoolError};
use shroud::transaction::builder::{address_of, OwnedOutput, RingInput, TransactionBuilder};
use shroud::transaction::{DoubleSpendFault, StructuralError, TxKind, ValidationError};
use shroud_crypto_primitives::{MockProofVerifier, StandardVerifier};
use std::sync::Arc;

#[test]
fn test_private_spend_admit_commit_and_reuse() {
    let mut chain = TestChain::new(Arc::new(StandardVerifier));
    let owned = OwnedOutput::random(1_000, &mut chain.rng);
    let real_index = 777_777;
    chain.seed_outputs(1_000_000, 9, &[(real_index, &owned)]);

    let (ring, position) = chain.ledger().select_mixins(real_index).unwrap();
    assert_eq!(ring[position].global_index, real_index);
    let input = RingInput {
        ring,
        real_index: position,
        owned: owned.clone(),
    };

    let tx = TransactionBuilder::new()
        .ring_input(input.clone())
        .private_output(600)
        .private_output(390)
        .fee(10)
        .build(&mut chain.rng)
        .unwrap()
        .tx;
    assert_eq!(tx.kind(), TxKind::Private);

    assert_eq!(
        chain.cache.submit_transaction(tx.clone()).unwrap(),
        Admission::Admitted
    );
    assert!(matches!(
        chain.cache.submit_transaction(tx.clone()),
        Err(MempoolError::AlreadyPooled)
    ));

    // Same key image, different outputs
    let rival = TransactionBuilder::new()
        .ring_input(input.clone())
        .private_output(990)
        .fee(10)
        .build(&mut chain.rng)
        .unwrap()
        .tx;
    assert!(matches!(
        chain.cache.submit_transaction(rival.clone()),
        Err(MempoolError::Rejected(ValidationError::DoubleSpend(
            DoubleSpendFault::KeyImageInPool(_)
        )))
    ));

    let selected = chain.cache.select_transactions_for_block(1_048_576);
    assert_eq!(selected, vec![tx.clone()]);
    let block = chain.next_block(selected);
    chain.cache.validate_and_commit_block(&block).unwrap();

    let counters = chain.ledger().counters();
    assert_eq!(counters.height, 10);
    assert_eq!(counters.output_index, 1_000_003);
    assert!(!chain.ledger().check_spent_key(&owned.key_image()).unwrap());
    assert!(chain.cache.mempool().read().is_empty());

    let stored = chain.ledger().get_transaction(&tx.hash()).unwrap().unwrap();
    assert_eq!(stored.hash(), tx.hash());
    assert_eq!(stored.private_outputs()[0].global_index, 1_000_001);

    assert!(matches!(
        chain.cache.submit_transaction(tx),
        Err(MempoolError::AlreadyCommitted)
    ));
    assert!(matches!(
        chain.cache.submit_transaction(rival),
        Err(MempoolError::Rejected(ValidationError::DoubleSpend(
            DoubleSpendFault::KeyImageSpent(_)
        )))
    ));
}

#[test]
fn test_bad_transaction_count_fails_before_crypto() {
    let mut verifier = MockProofVerifier::new();
    verifier.expect_verify_signature().times(0);
    verifier.expect_verify_range_proof().times(0);
    verifier.expect_verify_ring_signature().times(0);
    let mut chain = TestChain::new(Arc::new(verifier));

    let owner = SigningKey::from_bytes(&[5u8; 32]);
    let funding = chain.fund_transparent(&owner, 1, 100);
    let spend = TransactionBuilder::new()
        .transparent_input(funding, owner.clone())
        .transparent_output(address_of(&owner), 99)
        .fee(1)
        .build(&mut chain.rng)
        .unwrap()
        .tx;

    let mut block = chain.next_block(vec![spend]);
    assert_eq!(block.transactions.len(), 2);
    block.header.num_txs = 3;
    block.header.block_hash = block.header.compute_hash();

    let err = chain.cache.validate_and_commit_block(&block).unwrap_err();
    assert_eq!(err.height, 0);
    assert_eq!(err.tx_position, None);
    assert!(matches!(
        err.source,
        ValidationError::Structural(StructuralError::CountMismatch {
            field: "num_txs",
            declared: 3,
            actual: 2
        })
    ));
    assert_eq!(chain.ledger().counters().height, -1);
    assert_eq!(chain.ledger().counters().tx_index, 0);
}

#[test]
fn test_orphan_is_admitted_once_its_dependency_arrives() {
    let mut chain = TestChain::new(Arc::new(StandardVerifier));
    let owner = SigningKey::from_bytes(&[6u8; 32]);
    let funding = chain.fund_transparent(&owner, 1, 1_000);

    let parent = TransactionBuilder::new()
        .transparent_input(funding, owner.clone())
        .transparent_output(address_of(&owner), 990)
        .fee(10)
        .build(&mut chain.rng)
        .unwrap()
        .tx;
    let produced = parent.located_transparent_outputs().remove(0);
    let child = TransactionBuilder::new()
        .transparent_input(produced, owner.clone())
        .transparent_output(address_of(&owner), 980)
        .fee(10)
        .build(&mut chain.rng)
        .unwrap()
        .tx;

    assert_eq!(
        chain.cache.submit_transaction(child.clone()).unwrap(),
        Admission::Orphaned {
            missing: parent.hash()
        }
    );
    assert_eq!(chain.cache.mempool().read().orphan_count(), 1);

    assert_eq!(
        chain.cache.submit_transaction(parent.clone()).unwrap(),
        Admission::Admitted
    );
    {
        let pool = chain.cache.mempool().read();
        assert!(pool.contains(&parent.hash()));
        assert!(pool.contains(&child.hash()));
        assert_eq!(pool.orphan_count(), 0);
    }

    // Both fit in one block, parent first.
    let selected = chain.cache.select_block_template();
    assert_eq!(selected, vec![parent.clone(), child.clone()]);
    let block = chain.next_block(selected);
    chain.cache.validate_and_commit_block(&block).unwrap();

    assert!(chain.ledger().contains_transaction(&child.hash()).unwrap());
    assert!(chain
        .ledger()
        .get_pub_output(&parent.located_transparent_outputs()[0].location())
        .unwrap()
        .is_none());
    assert!(chain
        .ledger()
        .get_pub_output(&child.located_transparent_outputs()[0].location())
        .unwrap()
        .is_some());
    assert!(chain.cache.mempool().read().is_empty());
}

#[test]
fn test_fee_is_not_part_of_the_block_hash() {
    let mut chain = TestChain::new(Arc::new(StandardVerifier));
    let block = chain.next_block(Vec::new());

    let mut altered = block.clone();
    altered.header.fee += 1;
    assert_eq!(altered.header.compute_hash(), block.hash());

    // The header total no longer matches, so the block is still refused.
    let err = chain.cache.validate_block(&altered).unwrap_err();
    assert!(matches!(err.source, ValidationError::ChainConsistency(_)));
    chain.cache.validate_and_commit_block(&block).unwrap();
}

#[test]
fn test_block_spending_a_pooled_output_evicts_it_and_its_descendants() {
    let mut chain = TestChain::new(Arc::new(StandardVerifier));
    let owner = SigningKey::from_bytes(&[8u8; 32]);
    let funding = chain.fund_transparent(&owner, 3, 500);

    let pooled = TransactionBuilder::new()
        .transparent_input(funding.clone(), owner.clone())
        .transparent_output(address_of(&owner), 490)
        .fee(10)
        .build(&mut chain.rng)
        .unwrap()
        .tx;
    let mined = TransactionBuilder::new()
        .transparent_input(funding, owner.clone())
        .transparent_output(address_of(&owner), 480)
        .fee(20)
        .build(&mut chain.rng)
        .unwrap()
        .tx;

    let child = TransactionBuilder::new()
        .transparent_input(pooled.located_transparent_outputs().remove(0), owner.clone())
        .transparent_output(address_of(&owner), 480)
        .fee(10)
        .build(&mut chain.rng)
        .unwrap()
        .tx;

    chain.cache.submit_transaction(pooled.clone()).unwrap();
    assert_eq!(
        chain.cache.submit_transaction(child.clone()).unwrap(),
        Admission::Admitted
    );
    let block = chain.next_block(vec![mined]);
    chain.cache.validate_and_commit_block(&block).unwrap();

    {
        let pool = chain.cache.mempool().read();
        assert!(!pool.contains(&pooled.hash()));
        assert!(!pool.contains(&child.hash()));
    }
    assert!(chain.cache.select_block_template().is_empty());
    assert!(matches!(
        chain.cache.submit_transaction(pooled),
        Err(MempoolError::Rejected(ValidationError::DoubleSpend(
            DoubleSpendFault::TransparentOutputSpent(_)
        )))
    ));
}
