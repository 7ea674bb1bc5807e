//! End-to-end simulation command.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use std::time::Instant;
use tracechain_chain::{Ledger, LedgerConfig, NewProduct, ProductRegistry};
use tracechain_core::{Payload, TransactionRecord};
use tracechain_network::{demo_network, WeightKey};

/// Retailers the simulated products are routed to, in turn.
const DESTINATIONS: [&str; 2] = ["retail1", "retail2"];

#[derive(Args)]
pub struct SimulateArgs {
    /// Number of products to create (cycles through the sample catalogue)
    #[arg(short, long, default_value = "3")]
    products: usize,

    /// Maximum hops each product travels along its planned route
    #[arg(short, long, default_value = "4")]
    transfers: usize,

    /// Leading zero hex digits required in block hashes
    #[arg(short, long, default_value = "2")]
    difficulty: u32,

    /// Maximum transactions per block
    #[arg(short, long, default_value = "10")]
    batch: usize,

    /// Seed for product quality, for repeatable runs
    #[arg(long)]
    seed: Option<u64>,
}

pub fn run(args: SimulateArgs) -> Result<()> {
    let network = demo_network();
    let mut ledger = Ledger::new(LedgerConfig {
        difficulty: args.difficulty,
        max_block_transactions: args.batch,
        ..LedgerConfig::default()
    })
    .context("invalid ledger settings")?;
    let mut registry = match args.seed {
        Some(seed) => ProductRegistry::with_seed(seed),
        None => ProductRegistry::new(),
    };

    println!();
    println!("{}", "Creating products...".bold().cyan());
    println!();

    let samples = NewProduct::samples();
    let mut product_ids = Vec::with_capacity(args.products);
    for i in 0..args.products {
        let request = samples[i % samples.len()].clone();
        let (product, create) = registry.create(request)?;
        ledger.add_transaction(create)?;

        let destination = DESTINATIONS[i % DESTINATIONS.len()];
        let route = registry.plan_route(&product.id, destination, WeightKey::Cost, &network)?;

        println!(
            "  {} {} {} quality {}",
            "+".green(),
            product.name.bold(),
            format!("[{}]", product.batch_number).bright_black(),
            product.quality_score.to_string().bright_cyan()
        );

        match route {
            Some(route) => {
                println!(
                    "    route to {}: {} {}",
                    destination.bright_yellow(),
                    route.path.join(" -> "),
                    format!("(cost {})", route.total).bright_black()
                );
                for tx in travel(&mut registry, &product.id, &route.path, args.transfers)? {
                    ledger.add_transaction(tx)?;
                }
            }
            None => println!(
                "    {} no route from {} to {}",
                "✗".red(),
                product.origin,
                destination
            ),
        }
        product_ids.push(product.id);
    }

    println!();
    println!(
        "{} {}",
        "Mining...".bold().cyan(),
        format!("({} pending)", ledger.pending_count()).bright_black()
    );
    println!();

    let started = Instant::now();
    while let Some(block) = ledger.mine_pending_transactions()? {
        println!(
            "  {} {} {} {}",
            format!("#{}", block.index()).bright_black(),
            block.hash().to_hex()[..16].bright_yellow(),
            format!("({} txs)", block.tx_count()).bright_black(),
            format!("nonce {}", block.nonce()).bright_black()
        );
    }
    println!(
        "  mined in {:.2?}, chain height {}",
        started.elapsed(),
        ledger.height().to_string().bright_cyan()
    );

    println!();
    println!("{}", "Product history:".bold().cyan());
    for id in &product_ids {
        let product = registry.get(id)?;
        println!();
        println!(
            "  {} at {} quality {}",
            product.name.bold(),
            product.current_location.bright_yellow(),
            product.quality_score.to_string().bright_cyan()
        );
        for entry in ledger.trace_product(id) {
            println!(
                "    {} {}",
                format!("block {}", entry.block_index).bright_black(),
                describe(&entry.transaction)
            );
        }
    }

    println!();
    match ledger.validate_chain() {
        Ok(()) => println!("  {} chain valid ({} blocks)", "✓".green(), ledger.chain().len()),
        Err(e) => println!("  {} {}", "✗".red(), e),
    }
    println!();
    Ok(())
}

/// Move a product along `path`, at most `max_hops` hops.
///
/// Reaching the end of the path is a delivery. The product is inspected
/// wherever it stops.
fn travel(
    registry: &mut ProductRegistry,
    product_id: &str,
    path: &[String],
    max_hops: usize,
) -> Result<Vec<TransactionRecord>> {
    let mut records = Vec::new();
    let hops = path.len().saturating_sub(1);

    for (n, hop) in path.windows(2).take(max_hops).enumerate() {
        let tx = if n + 1 == hops {
            registry.deliver(product_id, &hop[1])?
        } else {
            registry.transfer(product_id, &hop[0], &hop[1])?
        };
        records.push(tx);
    }

    let product = registry.get(product_id)?;
    let (inspector, score) = (product.current_location.clone(), product.quality_score);
    records.push(registry.record_quality_check(product_id, &inspector, score)?);
    Ok(records)
}

fn describe(tx: &TransactionRecord) -> String {
    match tx.payload() {
        Payload::Create { origin, quality_score, .. } => {
            format!("created at {} (quality {})", origin, quality_score)
        }
        Payload::Transfer { quality_score } => {
            format!("{} -> {} (quality {})", tx.from(), tx.to(), quality_score)
        }
        Payload::QualityCheck { quality_score, passed } => format!(
            "inspected by {}: {} ({})",
            tx.from(),
            quality_score,
            if *passed { "passed" } else { "failed" }
        ),
        Payload::Deliver { recipient } => format!("{} -> {} (delivered)", tx.from(), recipient),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracechain_core::Action;

    fn route(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_travel_full_route_ends_in_delivery() {
        let mut registry = ProductRegistry::with_seed(4);
        let (product, _) = registry
            .create(NewProduct::new("Packaged Milk", "PM001", "farm1"))
            .unwrap();
        let path = route(&["farm1", "factory1", "factory2"]);

        let records = travel(&mut registry, &product.id, &path, 10).unwrap();

        let actions: Vec<Action> = records.iter().map(TransactionRecord::action).collect();
        assert_eq!(
            actions,
            vec![Action::Transfer, Action::Deliver, Action::QualityCheck]
        );
        assert_eq!(registry.get(&product.id).unwrap().current_location, "factory2");
        assert_eq!(records[2].from(), "factory2");
    }

    #[test]
    fn test_travel_stops_after_max_hops() {
        let mut registry = ProductRegistry::with_seed(4);
        let (product, _) = registry
            .create(NewProduct::new("Packaged Milk", "PM001", "farm1"))
            .unwrap();
        let path = route(&["farm1", "factory1", "factory2", "dist1"]);

        let records = travel(&mut registry, &product.id, &path, 1).unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].action(), Action::Transfer);
        assert_eq!(registry.get(&product.id).unwrap().current_location, "factory1");
    }
}
