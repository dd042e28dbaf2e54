// Copyright (c) 2024 Shroud Foundation

//! Benchmarks for block validation.
//!
//! Run with: cargo bench -p shroud --bench validation_benchmarks
//!
//! These benchmarks measure the performance of:
//! - Merkle root computation
//! - Block header hashing
//! - Dry-run validation of blocks of transparent spends

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use ed25519_dalek::SigningKey;
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use shroud::block::{merkle_root, Block};
use shroud::consensus::{ValidationCache, ValidationConfig};
use shroud::ledger::{Ledger, Table, UpdateEntry};
use shroud::mempool::{new_shared_mempool, MempoolConfig};
use shroud::transaction::builder::{address_of, build_coinbase, TransactionBuilder};
use shroud::transaction::{Transaction, TransparentOutput};
use shroud_crypto_primitives::{RangeProofKind, StandardVerifier};
use std::sync::Arc;

/// Benchmark Merkle root computation
fn bench_merkle_root(c: &mut Criterion) {
    let mut group = c.benchmark_group("merkle_root");

    for count in [1usize, 16, 256, 4096] {
        let leaves: Vec<[u8; 32]> = (0..count).map(|i| [(i % 251) as u8; 32]).collect();
        group.bench_with_input(BenchmarkId::from_parameter(count), &leaves, |b, leaves| {
            b.iter(|| black_box(merkle_root(leaves)))
        });
    }

    group.finish();
}

/// Benchmark block header hash computation
fn bench_block_hash(c: &mut Criterion) {
    let mut rng = ChaCha20Rng::seed_from_u64(1);
    let coinbase = build_coinbase(&[50], RangeProofKind::Standard, Vec::new(), &mut rng)
        .expect("coinbase")
        .tx;
    let block = Block::new(None, vec![coinbase], 1_000);

    c.bench_function("BlockHeader compute_hash", |b| {
        b.iter(|| black_box(block.header.compute_hash()))
    });
}

/// A ledger with `count` funded transparent outputs and a block spending them.
fn transparent_block(dir: &std::path::Path, count: u8) -> (ValidationCache, Block) {
    let mut rng = ChaCha20Rng::seed_from_u64(2);
    let ledger = Arc::new(Ledger::open(dir).expect("ledger"));
    let authority = SigningKey::from_bytes(&[42u8; 32]);
    let owner = SigningKey::from_bytes(&[3u8; 32]);

    let mut spends: Vec<Transaction> = vec![
        build_coinbase(&[50], RangeProofKind::Plus, Vec::new(), &mut rng)
            .expect("coinbase")
            .tx,
    ];
    let mut funding = Vec::new();
    for tag in 0..count {
        let mut output = TransparentOutput::new(address_of(&owner), 1_000);
        output.tx_id = [tag; 32];
        funding.push(UpdateEntry::add(
            Table::TransparentOutputs,
            output.location().to_bytes(),
            bincode::serialize(&output).expect("serialize"),
        ));
        spends.push(
            TransactionBuilder::new()
                .transparent_input(output, owner.clone())
                .transparent_output(address_of(&owner), 990)
                .fee(10)
                .build(&mut rng)
                .expect("spend")
                .tx,
        );
    }
    ledger.flush(&funding).expect("fund");

    let mut block = Block::new(None, spends, 1_000);
    block.sign(&authority);

    let config = ValidationConfig {
        authorities: vec![authority.verifying_key().to_bytes()],
        ..ValidationConfig::default()
    };
    let mempool = new_shared_mempool(MempoolConfig::default(), config.limits);
    let cache = ValidationCache::new(ledger, mempool, Arc::new(StandardVerifier), config);
    (cache, block)
}

/// Benchmark dry-run validation by block size
fn bench_validate_block(c: &mut Criterion) {
    let mut group = c.benchmark_group("validate_block");
    group.sample_size(20);

    for count in [1u8, 16, 128] {
        let dir = tempfile::tempdir().expect("tempdir");
        let (cache, block) = transparent_block(dir.path(), count);
        group.bench_with_input(BenchmarkId::from_parameter(count), &block, |b, block| {
            b.iter(|| cache.validate_block(black_box(block)).expect("valid"))
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_merkle_root,
    bench_block_hash,
    bench_validate_block,
);
criterion_main!(benches);
