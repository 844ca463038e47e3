//! The settlement tracker: follows the L1 settlement of the transactions of an L2 and prints the
//! session events as JSON lines.

mod args;
pub use args::{MonitorArgs, PriceArgs, RpcArgs, SessionArgs, TrackerArgs};

pub mod constants;

use futures::StreamExt;
use settlement_coordinator::SessionCoordinator;
use settlement_db::InMemoryDatabase;
use settlement_primitives::{L2BlockMeta, NetworkId, RollupRegistry, SessionId};
use settlement_providers::ChainConnector;
use std::sync::Arc;

/// Runs a tracking session until it ends or the process is interrupted, then prints the session
/// statistics.
pub async fn run(args: TrackerArgs) -> eyre::Result<()> {
    let connector = Arc::new(args.connector());
    let coordinator = SessionCoordinator::builder(
        Arc::new(RollupRegistry::builtin()),
        connector.clone(),
        Arc::new(InMemoryDatabase::new()),
    )
    .with_config(args.coordinator_config())
    .with_price_oracle(args.price_oracle())
    .build();

    let (session_id, mut events) = coordinator.start_and_subscribe(args.session_config()).await?;
    let sweeper = coordinator.spawn_sweeper();
    track_transactions(&coordinator, &*connector, session_id, &args).await?;

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    loop {
        tokio::select! {
            event = events.next() => match event {
                Some(event) => println!("{}", serde_json::to_string(&event)?),
                None => break,
            },
            _ = &mut ctrl_c => {
                tracing::info!(target: "settlement::tracker", session = %session_id, "received interrupt, stopping session");
                break
            }
        }
    }

    coordinator.stop_session(session_id).await?;
    let statistics = coordinator.statistics(session_id).await?;
    println!("{}", serde_json::to_string(&statistics)?);

    coordinator.shutdown().await;
    sweeper.await?;
    Ok(())
}

/// Registers the L2 transactions passed on the command line with the session.
async fn track_transactions(
    coordinator: &SessionCoordinator,
    connector: &dyn ChainConnector,
    session_id: SessionId,
    args: &TrackerArgs,
) -> eyre::Result<()> {
    if args.session.tracked_transactions.is_empty() {
        return Ok(())
    }

    let l2 = connector.connect(&NetworkId::new(&args.session.l2_network)).await?;
    for tx_hash in &args.session.tracked_transactions {
        let Some(receipt) = l2.transaction_receipt(*tx_hash).await? else {
            tracing::warn!(target: "settlement::tracker", ?tx_hash, "transaction not found on L2, skipping");
            continue
        };
        let block = l2
            .block_by_number(receipt.block_number, false)
            .await?
            .ok_or_else(|| eyre::eyre!("missing L2 block {}", receipt.block_number))?;

        let meta = L2BlockMeta { block_number: block.number, confirmation_time: block.timestamp };
        let record = coordinator.register_pending_transaction(session_id, *tx_hash, meta).await?;
        tracing::info!(target: "settlement::tracker", %record, ?tx_hash, l2_block = block.number, "tracking transaction");
    }
    Ok(())
}
