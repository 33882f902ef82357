use clap::Parser;
use std::fs;
use std::process::ExitCode;

use hospital_da_sim::domain::simulator::config::SimulationConfig;
use hospital_da_sim::domain::statistics::statistics::SimulationSummary;
use hospital_da_sim::error::Result;
use hospital_da_sim::{load_config, logger, run_simulations};

#[derive(Parser, Debug)]
#[command(name = "hospital-da-sim")]
#[command(about = "Simulate deferred-acceptance admission of surgery requests to three hospitals", long_about = None)]
struct Args {
    /// JSON config file; missing keys use the built-in defaults
    #[arg(short, long)]
    config: Option<String>,

    /// Number of slots to simulate (repeat for several horizons)
    #[arg(short, long)]
    slots: Vec<u64>,

    /// Number of slots a request may be deferred
    #[arg(short, long)]
    pass_slot: Option<u32>,

    /// Seed for reproducible runs
    #[arg(long)]
    seed: Option<u64>,

    /// Independent replications per horizon
    #[arg(short, long)]
    replications: Option<usize>,

    /// CSV file for the queue length and average waiting time series
    #[arg(short, long)]
    output: Option<String>,

    /// JSON file for the run summaries
    #[arg(long)]
    summary: Option<String>,
}

fn build_config(args: &Args) -> Result<SimulationConfig> {
    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => SimulationConfig::default(),
    };

    if !args.slots.is_empty() {
        config.horizons = args.slots.clone();
    }
    if let Some(pass_slot) = args.pass_slot {
        config.pass_slot = pass_slot;
    }
    if let Some(seed) = args.seed {
        config.seed = Some(seed);
    }
    if let Some(replications) = args.replications {
        config.replications = replications;
    }
    if let Some(output) = &args.output {
        config.statistics_file = Some(output.clone());
    }

    config.validate()?;
    Ok(config)
}

fn run(args: &Args) -> Result<()> {
    let config = build_config(args)?;
    log::info!(
        "Horizons: {:?}, pass slot: {}, replications: {}, seed: {:?}.",
        config.horizons,
        config.pass_slot,
        config.replications,
        config.seed
    );

    let results = run_simulations(&config)?;

    let summaries: Vec<SimulationSummary> = results.iter().map(|r| r.statistics.summary(&r.name.id)).collect();
    for summary in &summaries {
        log::info!(
            "{}: admitted {}/{} requests, final queue {}, max queue {}, average waiting time {:.4} slots, {} deferrals.",
            summary.name,
            summary.admitted,
            summary.arrivals,
            summary.final_queue_length,
            summary.max_queue_length,
            summary.average_waiting_time,
            summary.deferrals
        );
    }

    if let Some(path) = &args.summary {
        fs::write(path, serde_json::to_string_pretty(&summaries)?)?;
        log::info!("Summaries written to '{}'.", path);
    }

    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();
    logger::init();

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
