use crate::BatchHandler;

use parking_lot::Mutex;
use settlement_primitives::DetectedBatch;
use std::sync::Arc;
use tokio::sync::Notify;

/// A [`BatchHandler`] recording every batch it receives. Clones share the record.
#[derive(Debug, Clone, Default)]
pub struct RecordingBatchHandler {
    batches: Arc<Mutex<Vec<DetectedBatch>>>,
    notify: Arc<Notify>,
}

impl RecordingBatchHandler {
    /// Returns the batches received so far.
    pub fn batches(&self) -> Vec<DetectedBatch> {
        self.batches.lock().clone()
    }

    /// Waits until at least `count` batches were received.
    pub async fn wait_for_batches(&self, count: usize) {
        loop {
            let notified = self.notify.notified();
            if self.batches.lock().len() >= count {
                return
            }
            notified.await;
        }
    }
}

#[async_trait::async_trait]
impl BatchHandler for RecordingBatchHandler {
    async fn handle_batch(&self, batch: DetectedBatch) {
        self.batches.lock().push(batch);
        self.notify.notify_waiters();
    }
}
