//! Runs one bot-only settlers game and logs the result.

use settlers_server::{run_simulation, LogArchive, RoomManager, ServerConfig};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ServerConfig::from_env()?;
    info!(?config, "Starting settlers simulation");

    let manager = RoomManager::new(Arc::new(LogArchive)).with_queue_depth(config.queue_depth);
    let report = run_simulation(&manager, &config).await?;

    match report.winner {
        Some(winner) => info!(winner, turns = report.turns, actions = report.actions, "Winner decided"),
        None => info!(turns = report.turns, "No winner before the turn limit"),
    }
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
