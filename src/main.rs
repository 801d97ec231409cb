//! Main binary entry point for audit-replay.

use anyhow::Result;
use audit_replay::args::get_args;
use audit_replay::{ReplayOrchestrator, WriteSink};
use postgres::{Client, NoTls};
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let args = get_args().unwrap_or_else(|e| e.exit());

    // Statements own stdout; every diagnostic goes to stderr.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("audit_replay=info,warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = args.config()?;
    let mut client = Client::connect(&args.connection, NoTls)?;

    let stop = Arc::new(AtomicBool::new(false));
    let stop_clone = stop.clone();
    ctrlc::set_handler(move || {
        stop_clone.store(true, Ordering::Relaxed);
    })?;

    let sink = WriteSink::new(std::io::stdout().lock());
    let checkpoint = ReplayOrchestrator::new(config).run(&mut client, sink, stop)?;
    info!(last_event_id = %checkpoint.last(), "resume with --start-event-id {}", checkpoint.last());
    Ok(())
}
