//! Test utils for the batch monitor.

pub use handler::RecordingBatchHandler;
mod handler;
