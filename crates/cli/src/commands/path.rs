//! Path query commands.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use tracechain_network::{demo_network, NetworkGraph, PathFinder, WeightKey};

#[derive(Args)]
pub struct PathArgs {
    /// Starting company id
    #[arg(long)]
    from: String,

    /// Destination company id
    #[arg(long)]
    to: String,

    /// Route attribute to minimise: cost, time or distance
    #[arg(short, long, default_value = "cost")]
    weight: String,
}

#[derive(Args)]
pub struct PathsArgs {
    /// Starting company id
    #[arg(long)]
    from: String,

    /// Destination company id
    #[arg(long)]
    to: String,
}

pub fn run_shortest(args: PathArgs) -> Result<()> {
    let network = demo_network();
    let weight: WeightKey = args.weight.parse()?;

    let result = PathFinder::new(&network)
        .shortest_path(&args.from, &args.to, weight)
        .with_context(|| format!("cannot route {} -> {}", args.from, args.to))?;

    println!();
    if !result.is_found() {
        println!(
            "  {} no path from {} to {}",
            "✗".red(),
            args.from.bright_yellow(),
            args.to.bright_yellow()
        );
        println!();
        return Ok(());
    }

    println!("{}", format!("Shortest path by {}:", weight).bold().cyan());
    println!();
    print_path(&network, &result.path);
    println!();
    println!("  Total {}: {}", weight, result.total.to_string().bright_cyan());
    println!();
    Ok(())
}

pub fn run_all(args: PathsArgs) -> Result<()> {
    let network = demo_network();
    let paths = PathFinder::new(&network)
        .all_simple_paths(&args.from, &args.to)
        .with_context(|| format!("cannot route {} -> {}", args.from, args.to))?;

    println!();
    println!(
        "{}",
        format!("{} path(s) from {} to {}:", paths.len(), args.from, args.to)
            .bold()
            .cyan()
    );
    println!();
    for (i, path) in paths.iter().enumerate() {
        println!("  {} {}", format!("{}.", i + 1).bright_black(), path.join(" -> "));
    }
    println!();
    Ok(())
}

fn print_path(network: &NetworkGraph, path: &[String]) {
    for (hop, id) in path.iter().enumerate() {
        let name = network.company(id).map(|c| c.name.as_str()).unwrap_or("?");
        println!(
            "  {} {} {}",
            format!("{}.", hop + 1).bright_black(),
            format!("{:<10}", id).bright_yellow(),
            name
        );
    }
}
