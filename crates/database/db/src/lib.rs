//! A library responsible for persisting tracking sessions and pending records.

mod error;
pub use error::DatabaseError;

mod memory;
pub use memory::InMemoryDatabase;

mod operations;
pub use operations::Storage;

/// Test utilities for storage.
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
