//! Vulnerability report command.

use anyhow::Result;
use colored::Colorize;
use tracechain_network::{demo_network, VulnerabilityAnalyzer};

pub fn run() -> Result<()> {
    let network = demo_network();
    let findings = VulnerabilityAnalyzer::new(&network).detect_vulnerabilities();

    println!();
    if findings.is_empty() {
        println!("  {} no single points of failure", "✓".green());
        println!();
        return Ok(());
    }

    println!("{}", "Single points of failure:".bold().cyan());
    println!();
    for finding in &findings {
        println!(
            "  {} {} {}",
            "!".red().bold(),
            format!("{:<10}", finding.node).bright_yellow(),
            finding.description
        );
    }
    println!();
    Ok(())
}
