//! Command-line runner for one disjoint-domain training session.
//!
//! Usage:
//!   ddnet [OPTIONS]
//!
//! Examples:
//!   # Defaults, fixed seed, results written to run.json
//!   ddnet --seed 1 --output run.json
//!
//!   # Settings from a file, with domain holdout testing
//!   ddnet --config run_config.json --holdout domain

use std::path::PathBuf;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use ddnet::{DisjointDomainNet, HoldoutMode, RunConfig};

#[derive(Parser)]
#[command(name = "ddnet")]
#[command(about = "Train a disjoint-domain network and record reports and snapshots")]
#[command(version)]
struct Args {
    /// JSON run configuration with optional `net` and `train` sections
    #[arg(short = 'c', long)]
    config: Option<PathBuf>,

    /// Where to write the training results as JSON
    #[arg(short = 'o', long)]
    output: Option<PathBuf>,

    /// RNG seed (overrides the config file)
    #[arg(long)]
    seed: Option<u64>,

    /// Number of training epochs (overrides the config file)
    #[arg(short = 'e', long)]
    epochs: Option<usize>,

    /// Holdout testing mode: none, full, item, context (ctx), domain
    #[arg(long)]
    holdout: Option<String>,

    /// Hold out one item/context combination per domain
    #[arg(long)]
    combo: bool,

    /// Print the resolved configuration as JSON and exit
    #[arg(long)]
    print_config: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("info".parse()?),
        )
        .init();

    let mut config = match &args.config {
        Some(path) => RunConfig::load_json(&path.to_string_lossy())?,
        None => RunConfig::default(),
    };

    if let Some(seed) = args.seed {
        config.net.rng_seed = Some(seed);
    }
    if let Some(epochs) = args.epochs {
        config.train.num_epochs = epochs;
    }
    if let Some(mode) = &args.holdout {
        config.train.holdout_testing = mode.parse::<HoldoutMode>()?;
    }
    if args.combo {
        config.train.do_combo_testing = true;
    }
    config.validate()?;

    if args.print_config {
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(());
    }

    let mut net = DisjointDomainNet::new(config.net.clone())?;
    info!(
        items = net.n_items,
        contexts = net.n_contexts,
        attributes = net.n_attributes,
        examples = net.n_inputs,
        "network ready"
    );

    let run = net.do_training(&config.train)?;

    if let Some(path) = &args.output {
        run.save_json(&path.to_string_lossy())?;
        info!("Results written to {}", path.display());
    }

    Ok(())
}
