//! tracechain server entry point.

use anyhow::{Context, Result};
use clap::Parser;
use tokio::sync::broadcast::error::RecvError;
use tracechain_chain::{Ledger, ProductRegistry};
use tracechain_network::demo_network;
use tracechain_server::{init_tracing, router, ChainEvent, ServerConfig, SupplyChain};

#[tokio::main]
async fn main() -> Result<()> {
    let config = ServerConfig::parse();
    init_tracing(&config.log_filter, config.json_logs)?;

    let ledger = Ledger::new(config.ledger_config()).context("invalid ledger configuration")?;
    let service = SupplyChain::new(ledger, demo_network(), ProductRegistry::new());

    let mut events = service.subscribe();
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(ChainEvent::BlockMined(block)) => {
                    tracing::info!(block_index = block.index(), hash = %block.hash(), "new block");
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "block event listener lagged");
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    if config.seed_demo {
        let seeded = service.seed_sample_products()?;
        let block = service.mine().await?;
        tracing::info!(
            products = seeded.len(),
            block_index = ?block.map(|b| b.index()),
            "demo data seeded"
        );
    }

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("failed to bind {}", config.bind))?;
    tracing::info!(addr = %config.bind, difficulty = config.difficulty, "tracechain listening");

    axum::serve(listener, router(service))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
    }
    tracing::info!("shutting down");
}
