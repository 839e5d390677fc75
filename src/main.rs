//! Batch runner: routes observed area pairs over the street graph (`paths`)
//! and fits per-area traffic-density coefficients (`fit`).

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

mod commands;
mod config;
mod error;
mod input;
mod output;

use config::RunConfig;
use error::AppError;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Worker threads for routing and fitting, all cores when absent
    #[arg(long, global = true)]
    threads: Option<usize>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Route every observed area pair and write the pair summaries
    Paths {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Fit coefficients from previously written pair summaries
    Fit {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Both phases in sequence
    Run {
        #[arg(short, long)]
        config: PathBuf,
    },
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn run(cli: Cli) -> Result<(), AppError> {
    if let Some(threads) = cli.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .map_err(|err| AppError::Config(format!("cannot start {threads} threads: {err}")))?;
    }

    match cli.command {
        Command::Paths { config } => {
            let config = RunConfig::load(&config)?;
            commands::run_paths(&config)?;
        }
        Command::Fit { config } => {
            let config = RunConfig::load(&config)?;
            commands::run_fit_from_file(&config)?;
        }
        Command::Run { config } => {
            let config = RunConfig::load(&config)?;
            let routed = commands::run_paths(&config)?;
            commands::run_fit(&config, &routed.trips, &routed.areas, &routed.table)?;
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging();
    info!("roadfit {}", env!("CARGO_PKG_VERSION"));

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err}");
            ExitCode::FAILURE
        }
    }
}
