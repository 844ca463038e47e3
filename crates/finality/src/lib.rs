//! Finality and cost estimation of L2 batches settled on L1.

pub use amortizer::{amortize_with_price, CostAmortizer};
mod amortizer;

pub use calculator::{evaluate, FinalityCalculator, FinalityInputs, ProofEvidence};
mod calculator;

pub use clock::{Clock, FixedClock, SystemClock};
mod clock;

pub use error::FinalityError;
mod error;
