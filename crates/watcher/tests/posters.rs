//! Integration test of the poster filtering of the batch monitor.
#![cfg(feature = "test-utils")]

use alloy_primitives::{Address, TxHash};
use rand::Rng;
use settlement_primitives::{known_networks::BASE_SEPOLIA, RollupRegistry, SessionId};
use settlement_providers::{
    random,
    test_utils::{init_test_tracing, MockChainClient},
};
use settlement_watcher::{test_utils::RecordingBatchHandler, BatchMonitor, MonitorConfig};
use std::{collections::HashSet, sync::Arc};

const GENESIS: u64 = 1_000;

// Fills `len` L1 blocks after genesis with transactions from random senders. About one block in
// four also carries a transaction from one of the posters. Returns the poster transactions.
fn generate_chain(l1: &MockChainClient, posters: &[Address], len: u64) -> Vec<TxHash> {
    let mut rng = rand::rng();
    let mut batches = Vec::new();
    for number in GENESIS + 1..=GENESIS + len {
        for _ in 0..rng.random_range(0..4) {
            l1.insert_transaction(number, random!(Address), true, &[]);
        }
        if rng.random_bool(0.25) {
            let poster = posters[rng.random_range(0..posters.len())];
            batches.push(l1.insert_transaction(number, poster, true, &[]));
        }
    }
    batches
}

#[tokio::test]
async fn test_monitor_emits_each_poster_transaction_once() -> eyre::Result<()> {
    // Given
    init_test_tracing();
    let posters: Vec<Address> = (0..3).map(|_| random!(Address)).collect();
    let l1 = MockChainClient::new(GENESIS);
    let batches = generate_chain(&l1, &posters, 200);

    let profile = RollupRegistry::builtin()
        .get(&BASE_SEPOLIA.into())
        .ok_or_else(|| eyre::eyre!("missing base sepolia profile"))?;
    let handler = RecordingBatchHandler::default();
    let mut monitor = BatchMonitor::new(
        SessionId(1),
        Arc::new(profile.with_batch_posters(posters.iter().copied())),
        Arc::new(l1.clone()),
        Arc::new(MockChainClient::new(50_000)),
        handler.clone(),
        MonitorConfig::default(),
    );

    // When the L1 grows one block per tick, scan windows overlap.
    for head in GENESIS + 1..=GENESIS + 200 {
        l1.set_head(head);
        monitor.step().await?;
    }

    // Then
    let detected: Vec<TxHash> = handler.batches().iter().map(|batch| batch.l1_tx_hash).collect();
    assert_eq!(detected, batches);
    assert_eq!(detected.iter().collect::<HashSet<_>>().len(), detected.len());
    assert!(handler.batches().iter().all(|batch| posters.contains(&batch.poster_address)));
    Ok(())
}
