use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use trainkit::checkpoint::{list_checkpoints, Checkpoint, StateValue};
use trainkit::config::AppConfig;

/// Inspect checkpoint directories written by the checkpoint manager.
#[derive(Parser)]
#[command(name = "trainkit", about = "Inspect training checkpoints")]
struct Cli {
    /// Path to TOML configuration file
    #[arg(long, default_value = "trainkit.toml", global = true)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List retained per-iteration checkpoints, oldest first
    List {
        /// Checkpoint directory (defaults to the configured one)
        #[arg(long)]
        dir: Option<PathBuf>,
    },
    /// Show iteration, metric and stored entries of a checkpoint file
    Inspect {
        /// Checkpoint file (.json or .bin)
        path: PathBuf,
    },
    /// Print the default configuration as TOML
    Config,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::List { dir } => {
            let dir = match dir {
                Some(dir) => dir,
                None => {
                    AppConfig::load_or_default(&cli.config)
                        .with_context(|| format!("loading config from {}", cli.config.display()))?
                        .checkpoint
                        .checkpoint_dir
                }
            };
            let checkpoints = list_checkpoints(&dir, None)
                .with_context(|| format!("listing checkpoints in {}", dir.display()))?;
            if checkpoints.is_empty() {
                println!("No checkpoints in {}", dir.display());
            }
            for (iteration, path) in checkpoints {
                println!("{iteration:>10}  {}", path.display());
            }
        }
        Command::Inspect { path } => {
            let checkpoint = Checkpoint::read(&path)
                .with_context(|| format!("reading checkpoint {}", path.display()))?;
            print_checkpoint(&checkpoint);
        }
        Command::Config => {
            print!("{}", AppConfig::default_toml());
        }
    }
    Ok(())
}

fn print_checkpoint(checkpoint: &Checkpoint) {
    match checkpoint.iteration {
        Some(it) => println!("iteration: {it}"),
        None => println!("iteration: -"),
    }
    match checkpoint.metric {
        Some(m) => println!("metric:    {m:.6}"),
        None => println!("metric:    -"),
    }
    for (name, state) in &checkpoint.entries {
        println!("{name}:");
        for key in state.keys() {
            let summary = state.get(key).map(describe).unwrap_or_default();
            println!("  {key:<24} {summary}");
        }
    }
}

fn describe(value: &StateValue) -> String {
    match value {
        StateValue::Bool(v) => v.to_string(),
        StateValue::Int(v) => v.to_string(),
        StateValue::Float(v) => format!("{v:.6}"),
        StateValue::Text(v) => format!("{v:?}"),
        StateValue::Tensor(t) => format!("tensor {:?}", t.shape),
        StateValue::Bytes(b) => format!("{} bytes", b.len()),
        StateValue::List(items) => format!("list of {}", items.len()),
        StateValue::Dict(d) => format!("dict of {}", d.len()),
    }
}
