//! Bank counter simulation CLI
//!
//! # Example
//!
//! ```bash
//! # One day with the default three tellers
//! bank-sim
//!
//! # Reproducible day with four tellers, printed as JSON
//! bank-sim --seed 42 --tellers 4 --json
//!
//! # Twenty independent days on four pool threads
//! RUST_LOG=warn bank-sim --config bank.toml --days 20 --threads 4
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use bank_queue::{BankConfig, MetricsReport, SimError, run_day, run_days};
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Simulate tellers serving a queue of bank customers for a day
#[derive(Parser, Debug)]
#[command(name = "bank-sim")]
#[command(version, about, long_about = None)]
struct Args {
    /// TOML file overriding the default configuration
    #[arg(short = 'c', long)]
    config: Option<PathBuf>,

    /// Number of tellers
    #[arg(short = 't', long)]
    tellers: Option<usize>,

    /// Base seed for reproducible draws. Entropy is used when omitted.
    #[arg(long)]
    seed: Option<u64>,

    /// Real microseconds slept per simulated second
    #[arg(long)]
    scale_micros: Option<u64>,

    /// Number of independent days to simulate
    #[arg(short = 'd', long, default_value = "1")]
    days: usize,

    /// Pool threads used when simulating several days
    #[arg(long)]
    threads: Option<usize>,

    /// Print reports as JSON instead of text
    #[arg(long)]
    json: bool,
}

impl Args {
    fn bank_config(&self) -> Result<BankConfig, SimError> {
        let mut config = match &self.config {
            Some(path) => BankConfig::from_file(path)?,
            None => BankConfig::default(),
        };
        if let Some(tellers) = self.tellers {
            config.num_tellers = tellers;
        }
        if let Some(seed) = self.seed {
            config.seed = Some(seed);
        }
        if let Some(micros) = self.scale_micros {
            config.micros_per_sim_sec = micros;
        }
        config.validate()?;
        Ok(config)
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "simulation failed");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<(), SimError> {
    let config = args.bank_config()?;

    if args.days <= 1 {
        let outcome = run_day(&config)?;
        print_reports(&[outcome.report], args.json)?;
        return Ok(());
    }

    info!(days = args.days, threads = ?args.threads, "simulating days in parallel");
    let mut reports = Vec::with_capacity(args.days);
    let mut first_error = None;
    for (day, result) in run_days(&config, args.days, args.threads)
        .into_iter()
        .enumerate()
    {
        match result {
            Ok(outcome) => reports.push(outcome.report),
            Err(e) => {
                error!(day, error = %e, "day failed");
                first_error.get_or_insert(e);
            }
        }
    }

    print_reports(&reports, args.json)?;
    match first_error {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

fn print_reports(reports: &[MetricsReport], json: bool) -> Result<(), SimError> {
    if json {
        let encoded = match reports {
            [report] => serde_json::to_string_pretty(report)?,
            _ => serde_json::to_string_pretty(reports)?,
        };
        println!("{encoded}");
        return Ok(());
    }

    for (day, report) in reports.iter().enumerate() {
        if reports.len() > 1 {
            println!("Day {}", day + 1);
        }
        println!("{report}");
        if day + 1 < reports.len() {
            println!();
        }
    }
    Ok(())
}
