//! sr-simulate - Selective Repeat protocol simulator
//!
//! Runs a full sender/receiver session over the simulated unreliable
//! channel and prints a summary of what the protocol had to do to get
//! every message across.

use clap::Parser;
use std::path::PathBuf;

use sr_cli::config::SimulationConfig;
use sr_cli::stats::display_report;
use sr_sim::Simulation;

#[derive(Parser, Debug)]
#[command(name = "sr-simulate")]
#[command(about = "Selective Repeat ARQ simulator", long_about = None)]
struct Args {
    /// Configuration file (TOML); flags below override its values
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Number of messages to send
    #[arg(short, long)]
    messages: Option<usize>,

    /// Packet loss probability (0.0 to 1.0)
    #[arg(short, long)]
    loss: Option<f64>,

    /// Packet corruption probability (0.0 to 1.0)
    #[arg(short = 'r', long)]
    corruption: Option<f64>,

    /// RNG seed for reproducible runs
    #[arg(short, long)]
    seed: Option<u64>,

    /// Write an example configuration file and exit
    #[arg(long)]
    write_example_config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    if args.verbose {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .init();
    } else {
        tracing_subscriber::fmt::init();
    }

    if let Some(path) = &args.write_example_config {
        SimulationConfig::example().to_file(path)?;
        tracing::info!("Wrote example configuration to {}", path.display());
        return Ok(());
    }

    let mut config = match &args.config {
        Some(path) => SimulationConfig::from_file(path)?,
        None => SimulationConfig::default(),
    };
    if let Some(messages) = args.messages {
        config.message_count = messages;
    }
    if let Some(loss) = args.loss {
        config.loss_rate = loss;
    }
    if let Some(corruption) = args.corruption {
        config.corruption_rate = corruption;
    }
    if let Some(seed) = args.seed {
        config.seed = seed;
    }
    config.validate()?;

    tracing::info!(
        "Simulating {} messages (loss {:.2}, corruption {:.2}, seed {})",
        config.message_count,
        config.loss_rate,
        config.corruption_rate,
        config.seed
    );

    let report = Simulation::new(config.to_sim_config())?.run()?;
    display_report(&report);

    Ok(())
}
