//! The settlement tracker binary.

use clap::Parser;
use settlement_tracker::TrackerArgs;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() {
    let args = TrackerArgs::parse();
    init_tracing_subscriber();

    if let Err(err) = settlement_tracker::run(args).await {
        eprintln!("Error: {err:?}");
        std::process::exit(1);
    }
}

/// Logs to stderr, leaving stdout to the events. Filtered by `RUST_LOG`, `info` by default.
fn init_tracing_subscriber() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}
