//! poi-sim - run the points-of-interest gossip protocol on a generated map.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

use poi_sim::{SimConfig, SimReport, Simulation};

#[derive(Parser)]
#[command(name = "poi-sim")]
#[command(about = "Headless points-of-interest gossip simulator", version)]
struct Cli {
    /// YAML config file (defaults apply to missing keys)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the number of rounds
    #[arg(short, long)]
    rounds: Option<u32>,

    /// Override the map seed
    #[arg(short, long)]
    seed: Option<u64>,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let mut config = match &cli.config {
        Some(path) => SimConfig::load(path)?,
        None => SimConfig::default(),
    };
    if let Some(rounds) = cli.rounds {
        config.rounds = rounds;
    }
    if let Some(seed) = cli.seed {
        config.seed = seed;
    }

    let mut sim = Simulation::new(config).context("Failed to set up simulation")?;
    let report = sim.run();

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_summary(&report);
    }
    Ok(())
}

fn print_summary(report: &SimReport) {
    println!(
        "{} rounds on a {}x{} {:?} map (seed {}), {} structures",
        report.rounds, report.width, report.height, report.symmetry, report.seed, report.structures
    );
    println!();
    for team in &report.teams {
        let full = team
            .full_coverage_round
            .map(|r| format!("round {r}"))
            .unwrap_or_else(|| "never".to_string());
        println!("Side {:?} ({} agents)", team.side, team.agents);
        println!("  coverage:        {:.1}%", team.mean_coverage * 100.0);
        println!("  full coverage:   {full}");
        println!(
            "  symmetry solved: {}/{}",
            team.agents_resolved, team.agents
        );
        if team.agents_disproving_truth > 0 {
            println!(
                "  WARNING: {} agents ruled out the true symmetry",
                team.agents_disproving_truth
            );
        }
    }
    let m = &report.messages;
    println!();
    println!(
        "Messages: {} direct, {} broadcasts, {} units sent, {} relayed, {} refused",
        m.direct, m.broadcasts, m.units_sent, m.relayed_units, m.refused
    );
    println!(
        "Ticks: {} truncated, {} failed",
        m.truncated_ticks, m.tick_failures
    );
}
