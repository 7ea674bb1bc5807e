//! Network overview command.

use anyhow::Result;
use colored::Colorize;
use tracechain_network::demo_network;

pub fn run() -> Result<()> {
    let network = demo_network();
    let stats = network.stats();

    println!();
    println!("{}", "Companies:".bold().cyan());
    println!();
    for company in network.companies() {
        println!(
            "  {} {:<22} {}",
            format!("{:<10}", company.id).bright_yellow(),
            company.name,
            format!("({})", company.category).bright_black()
        );
    }

    println!();
    println!("{}", "Routes:".bold().cyan());
    println!();
    for route in network.routes() {
        println!(
            "  {} -> {} {}",
            format!("{:<10}", route.from).bright_yellow(),
            format!("{:<10}", route.to).bright_yellow(),
            format!(
                "cost {:>5.1}  time {:>4.1}  distance {:>5.1}",
                route.cost, route.time, route.distance
            )
            .bright_black()
        );
    }

    println!();
    println!(
        "  {} companies, {} routes, average cost {}, time {}, distance {}",
        stats.node_count.to_string().bright_cyan(),
        stats.edge_count.to_string().bright_cyan(),
        stats.avg_cost,
        stats.avg_time,
        stats.avg_distance
    );
    println!();
    Ok(())
}
