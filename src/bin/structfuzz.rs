//! structfuzz: run the structural fuzzing engine against demo targets
//!
//! ## Example Usage
//!
//! ```bash
//! # List the demo targets
//! structfuzz list
//!
//! # Fuzz a target for 5000 runs with a fixed seed
//! structfuzz run abc -n 5000 --seed 7
//!
//! # Load engine settings from JSON and print the report as JSON
//! structfuzz run tree --config fuzz.json --json
//! ```

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use structfuzz::core::{FuzzConfig, FuzzReport};
use structfuzz::targets::{self, TARGETS};
use tracing::warn;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "structfuzz",
    author,
    version,
    about = "Feedback-directed structural fuzzing",
    long_about = "Generates structurally valid inputs for demo targets, runs them and steers \
                  generation by the coverage each run reports."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output as JSON instead of human-readable format
    #[arg(long, global = true)]
    json: bool,

    /// Verbose output (session logging at info level)
    #[arg(long, short, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// List the demo targets
    List,

    /// Fuzz one demo target
    Run(RunCmd),
}

#[derive(Parser, Debug)]
struct RunCmd {
    /// Target name (see `structfuzz list`)
    target: String,

    /// Number of target executions
    #[arg(long, short = 'n', default_value = "1000")]
    iterations: u64,

    /// Random seed for reproducibility (overrides the config file)
    #[arg(long)]
    seed: Option<u64>,

    /// JSON file with engine settings; missing fields keep their defaults
    #[arg(long)]
    config: Option<PathBuf>,
}

impl RunCmd {
    fn execute(&self, json_output: bool) -> Result<()> {
        let target = targets::find(&self.target).ok_or_else(|| {
            anyhow!(
                "Unknown target '{}'. Run `structfuzz list` to see the available targets",
                self.target
            )
        })?;

        let mut config = match &self.config {
            Some(path) => load_config(path)?,
            None => FuzzConfig::default(),
        };
        config.max_runs = Some(self.iterations);
        if let Some(seed) = self.seed {
            config.seed = seed;
        }

        let report = targets::fuzz(target, config)?;
        if let Some(error) = report.stop_reason.as_error() {
            warn!(target_name = target.name, %error, "Target could not be fuzzed");
        }
        if json_output {
            println!("{}", serde_json::to_string_pretty(&report)?);
        } else {
            print_report(target.name, &report);
        }
        Ok(())
    }
}

fn load_config(path: &Path) -> Result<FuzzConfig> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    let config: FuzzConfig = serde_json::from_str(&text)
        .with_context(|| format!("Invalid config file {}", path.display()))?;
    config
        .validate()
        .with_context(|| format!("Invalid config file {}", path.display()))?;
    Ok(config)
}

fn list_targets(json_output: bool) -> Result<()> {
    if json_output {
        let targets: Vec<_> = TARGETS
            .iter()
            .map(|t| {
                serde_json::json!({
                    "name": t.name,
                    "about": t.about,
                    "parameters": t.signature(),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&targets)?);
    } else {
        for target in TARGETS {
            println!("{:12} ({}) {}", target.name, target.signature().join(", "), target.about);
        }
    }
    Ok(())
}

fn print_report(target: &str, report: &FuzzReport) {
    println!("Fuzz target: {}", target);
    println!();
    println!(
        "Results ({} runs, {} iterations, seed: {}, {}ms):",
        report.executions, report.iterations, report.seed, report.elapsed_ms
    );
    println!("  New paths:      {:>6}", report.new_paths);
    println!("  Trie nodes:     {:>6}", report.trie_nodes);
    if report.abandoned > 0 {
        println!("  Abandoned:      {:>6}", report.abandoned);
    }
    if report.timeouts > 0 {
        println!("  Timeouts:       {:>6}", report.timeouts);
    }
    if report.passes > 0 {
        println!("  Passed:         {:>6}", report.passes);
    }
    println!("  Stop reason:    {:?}", report.stop_reason);
    if !report.missed_types.is_empty() {
        println!("  Missed types:   {}", report.missed_types.join(", "));
    }

    println!();
    println!("Trace profile:");
    let profile = &report.trace_profile;
    println!(
        "  min: {}  max: {}  avg: {}  p50: {}  p99: {}",
        profile.min, profile.max, profile.avg, profile.p50, profile.p99
    );
    if !profile.max_input.is_empty() {
        println!("  longest trace input: [{}]", profile.max_input.join(", "));
    }

    if !report.interesting_cases.is_empty() {
        println!();
        println!("Interesting cases:");
        for case in &report.interesting_cases {
            println!(
                "  #{:<5} trace {:>3}  [{}]",
                case.run,
                case.trace_len,
                case.inputs_human.join(", ")
            );
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "info" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let Cli {
        command,
        json,
        verbose,
    } = Cli::parse();
    init_tracing(verbose);

    match command {
        Commands::List => list_targets(json),
        Commands::Run(cmd) => cmd.execute(json),
    }
}
