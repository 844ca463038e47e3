use settlement_primitives::DetectedBatch;
use std::fmt::Debug;

/// Consumes the batches detected by a [`crate::BatchMonitor`].
///
/// The monitor awaits the handler inside its poll tick: the next tick only starts once every
/// batch of the previous one was handled.
#[async_trait::async_trait]
#[auto_impl::auto_impl(&, Arc, Box)]
pub trait BatchHandler: Send + Sync + Debug {
    /// Handles a detected batch.
    async fn handle_batch(&self, batch: DetectedBatch);
}
