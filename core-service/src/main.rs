//! FlowGuard CLI - Main Entry Point
//!
//! `flowguard classify <csv>` prints the prediction summary as JSON.
//! `flowguard schema` prints the feature layout the bundle expects.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use flowguard_core::constants::{APP_NAME, APP_VERSION};
use flowguard_core::{
    classify, write_predictions_csv, EngineConfig, ModelArtifactBundle, PredictOptions,
    PredictionSummary, RawTable,
};

#[derive(Parser)]
#[command(name = "flowguard")]
#[command(author, version, about = "Network flow attack classifier")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Model bundle directory (default: $FLOWGUARD_MODEL_DIR or ./models)
    #[arg(short, long, global = true)]
    pub models: Option<PathBuf>,

    /// JSON file overriding the built-in column rules
    #[arg(short, long, global = true)]
    pub rules: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Classify every flow in a CSV file
    Classify {
        /// Flow table (CSV with header row)
        csv: PathBuf,

        /// Report the dominant ground-truth label instead of running the model
        #[arg(long)]
        diagnostic_override: bool,

        /// Also write the input rows with Prediction/Confidence columns here
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show the feature layout of the loaded bundle
    Schema,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.debug { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    log::info!("Starting {} v{}...", APP_NAME, APP_VERSION);

    let mut config = EngineConfig::from_env();
    if let Some(models) = cli.models {
        config.model_dir = models;
    }
    if let Some(rules) = cli.rules {
        config.rules_path = Some(rules);
    }

    let bundle = ModelArtifactBundle::load(&config.bundle_paths()?)
        .with_context(|| format!("Failed to load model bundle from {}", config.model_dir.display()))?;

    match cli.command {
        Commands::Classify {
            csv,
            diagnostic_override,
            output,
        } => {
            let rules = config.load_rules().context("Failed to load schema rules")?;
            let raw = RawTable::from_csv_path(&csv)
                .with_context(|| format!("Failed to read {}", csv.display()))?;

            let options = PredictOptions { diagnostic_override };
            let result = classify(&bundle, &raw, &rules, &options)?;

            if let Some(path) = output {
                let file = File::create(&path)
                    .with_context(|| format!("Failed to create {}", path.display()))?;
                write_predictions_csv(&raw, &result.records, BufWriter::new(file))?;
                log::info!("Predictions written to {}", path.display());
            }

            let summary = PredictionSummary::from_records(result.records);
            if let Some((label, count)) = summary.top_label() {
                log::info!(
                    "{} flows classified, most frequent: {} ({})",
                    summary.total_flows,
                    label,
                    count
                );
            }
            print_json(&summary)?;
        }
        Commands::Schema => {
            print_json(&bundle.schema().info())?;
        }
    }

    Ok(())
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    serde_json::to_writer_pretty(&mut out, value)?;
    writeln!(out)?;
    Ok(())
}
