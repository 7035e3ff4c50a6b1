//! Headless battle runner.
//!
//! This binary runs battles without graphics, controlled via JSON on
//! stdin/stdout or scripted by a RON scenario file.
//!
//! # Usage
//!
//! ```bash
//! # Interactive mode - read commands from stdin
//! cargo run -p legion_headless
//!
//! # Serve a scenario's opening position
//! cargo run -p legion_headless -- serve --scenario scenarios/opening.ron
//!
//! # Run a scenario to completion and print its report
//! cargo run -p legion_headless -- run --scenario scenarios/opening.ron
//!
//! # Verify a scenario replays identically
//! cargo run -p legion_headless -- verify --scenario scenarios/opening.ron --runs 5
//! ```
//!
//! # Protocol
//!
//! Input (stdin): JSON commands, one per line
//! Output (stdout): JSON responses, one per line
//! Logs (stderr): Debug information, filtered by `RUST_LOG`
//!
//! See the protocol module for command/response format.

use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use legion_headless::{
    runner::{HeadlessConfig, HeadlessRunner},
    scenario::{Scenario, ScenarioError},
};

#[derive(Parser)]
#[command(name = "legion_headless")]
#[command(about = "Headless Azuki vs Edamame battle runner")]
#[command(version)]
struct Cli {
    /// Enable verbose logging to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve JSON commands on stdin
    Serve {
        /// Scenario whose opening to start from
        #[arg(short, long)]
        scenario: Option<PathBuf>,

        /// Output state after every tick command
        #[arg(long)]
        auto_state: bool,
    },

    /// Run a scenario to completion and print its report as JSON
    Run {
        /// Scenario file to run
        #[arg(short, long)]
        scenario: PathBuf,
    },

    /// Verify determinism by running a scenario several times
    Verify {
        /// Scenario to test
        #[arg(short, long)]
        scenario: PathBuf,

        /// Number of verification runs
        #[arg(short, long, default_value = "3")]
        runs: u32,
    },

    /// Run N ticks of the standard opening for benchmarking
    Benchmark {
        /// Number of ticks to run
        #[arg(short, long, default_value = "6000")]
        ticks: u64,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Logs go to stderr; stdout is for the protocol
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(true),
        )
        .with(filter)
        .init();

    let result = match cli.command {
        Some(Commands::Serve {
            scenario,
            auto_state,
        }) => cmd_serve(scenario, auto_state),
        Some(Commands::Run { scenario }) => cmd_run(scenario),
        Some(Commands::Verify { scenario, runs }) => cmd_verify(scenario, runs),
        Some(Commands::Benchmark { ticks }) => {
            cmd_benchmark(ticks);
            Ok(true)
        }
        // Default: interactive mode
        None => cmd_serve(None, false),
    };

    match result {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            tracing::error!("{e}");
            ExitCode::FAILURE
        }
    }
}

/// Errors that end a CLI command.
#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Scenario(#[from] ScenarioError),
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Failed to encode report: {0}")]
    Json(#[from] serde_json::Error),
}

/// Serve an interactive session on stdin/stdout
fn cmd_serve(scenario: Option<PathBuf>, auto_state: bool) -> Result<bool, CliError> {
    tracing::info!("Starting interactive session");

    let scenario = match scenario {
        Some(path) => Scenario::load(path)?,
        None => Scenario::default(),
    };
    let config = HeadlessConfig {
        auto_state_output: auto_state,
    };

    let mut runner = HeadlessRunner::with_config(scenario.battle(), config);
    runner.serve(io::stdin().lock(), io::stdout().lock())?;
    Ok(true)
}

/// Run a scenario and print its report
fn cmd_run(path: PathBuf) -> Result<bool, CliError> {
    let scenario = Scenario::load(path)?;
    let start = Instant::now();
    let report = scenario.run();

    tracing::info!(
        scenario = %report.name,
        ticks = report.ticks,
        outcome = ?report.outcome,
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Scenario finished"
    );
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(true)
}

/// Run a scenario several times and compare final hashes
fn cmd_verify(path: PathBuf, runs: u32) -> Result<bool, CliError> {
    let scenario = Scenario::load(path)?;
    tracing::info!(scenario = %scenario.name, runs, "Verifying determinism");

    let hashes: Vec<u64> = (0..runs).map(|_| scenario.run().state_hash).collect();
    let is_deterministic = hashes.windows(2).all(|w| w[0] == w[1]);

    if is_deterministic {
        tracing::info!(hash = hashes.first().copied().unwrap_or_default(), "Deterministic");
    } else {
        tracing::error!(?hashes, "Scenario diverged between runs");
    }
    Ok(is_deterministic)
}

/// Tick the standard opening and report throughput
fn cmd_benchmark(ticks: u64) {
    let scenario = Scenario {
        max_ticks: ticks,
        stop_on_outcome: false,
        ..Scenario::default()
    };

    let start = Instant::now();
    let report = scenario.run();
    let elapsed = start.elapsed();
    let ticks_per_sec = report.ticks as f64 / elapsed.as_secs_f64().max(f64::EPSILON);

    tracing::info!(
        ticks = report.ticks,
        elapsed_ms = elapsed.as_millis() as u64,
        ticks_per_sec = ticks_per_sec as u64,
        hash = report.state_hash,
        "Benchmark complete"
    );
}
