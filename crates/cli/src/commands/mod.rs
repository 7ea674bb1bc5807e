//! CLI commands module.
//!
//! Every command runs against the in-memory demo network.

use anyhow::Result;
use clap::Subcommand;

mod network;
mod path;
mod simulate;
mod vulns;

#[derive(Subcommand)]
pub enum Commands {
    /// Show the companies and routes of the network
    Network,
    /// Find the shortest path between two companies
    Path(path::PathArgs),
    /// List every simple path between two companies
    Paths(path::PathsArgs),
    /// Report single points of failure
    Vulns,
    /// Create products, move them along planned routes and mine the results
    Simulate(simulate::SimulateArgs),
}

pub fn run(cmd: Commands) -> Result<()> {
    match cmd {
        Commands::Network => network::run(),
        Commands::Path(args) => path::run_shortest(args),
        Commands::Paths(args) => path::run_all(args),
        Commands::Vulns => vulns::run(),
        Commands::Simulate(args) => simulate::run(args),
    }
}
