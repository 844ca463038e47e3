use alloy_primitives::TxHash;
use lru::LruCache;
use std::num::NonZeroUsize;

/// The batch transactions already emitted by a monitor.
///
/// Consecutive scan windows overlap, the cache keeps a batch from being emitted twice.
#[derive(Debug)]
pub(crate) struct SeenBatches {
    transactions: LruCache<TxHash, ()>,
}

impl SeenBatches {
    /// Creates a new [`SeenBatches`] remembering up to `capacity` transactions.
    pub(crate) fn new(capacity: NonZeroUsize) -> Self {
        Self { transactions: LruCache::new(capacity) }
    }

    /// Returns true if the transaction was already emitted.
    pub(crate) fn contains(&self, hash: &TxHash) -> bool {
        self.transactions.contains(hash)
    }

    /// Records the transaction as emitted.
    pub(crate) fn insert(&mut self, hash: TxHash) {
        self.transactions.put(hash, ());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_oldest_transactions_are_evicted() {
        let mut seen = SeenBatches::new(NonZeroUsize::new(2).unwrap());
        let [a, b, c] = [TxHash::repeat_byte(1), TxHash::repeat_byte(2), TxHash::repeat_byte(3)];

        seen.insert(a);
        seen.insert(b);
        seen.insert(c);

        assert!(!seen.contains(&a));
        assert!(seen.contains(&b));
        assert!(seen.contains(&c));
    }
}
