use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{error, info};

use roster_cleaner::config::{CliOverrides, Config};
use roster_cleaner::{logging, metrics, Pipeline};

#[derive(Parser)]
#[command(name = "roster-cleaner")]
#[command(about = "Cleans student enrollment CSV data")]
#[command(version)]
struct Cli {
    /// Path to a TOML config file (defaults to ./cleaner.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// CSV source: local path or http(s) URL
    #[arg(long, global = true)]
    input: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full cleaning pipeline and write the cleaned CSV
    Clean {
        /// Where to write the cleaned CSV
        #[arg(long)]
        output: Option<PathBuf>,
        /// Inclusive lower age bound
        #[arg(long)]
        min_age: Option<i64>,
        /// Inclusive upper age bound
        #[arg(long)]
        max_age: Option<i64>,
        /// Write a JSON run report to this path
        #[arg(long)]
        report: Option<PathBuf>,
        /// Write a Prometheus metrics snapshot to this path
        #[arg(long)]
        metrics_file: Option<PathBuf>,
    },
    /// Load the dataset and report its shape, types and missing values
    Inspect,
}

/// File, then environment, then command-line flags; validated once at the end.
fn load_config(cli: &Cli, overrides: CliOverrides) -> Result<Config> {
    let mut config = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;
    config.apply_cli(CliOverrides { input: cli.input.clone(), ..overrides });
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let _log_guard = logging::init_logging();

    let cli = Cli::parse();

    match &cli.command {
        Commands::Clean { output, min_age, max_age, report, metrics_file } => {
            let overrides = CliOverrides {
                output: output.clone(),
                min_age: *min_age,
                max_age: *max_age,
                report: report.clone(),
                ..CliOverrides::default()
            };
            let config = load_config(&cli, overrides)?;

            let prometheus = metrics_file.as_ref().and_then(|_| metrics::init_metrics());
            let pipeline = Pipeline::from_config(config).context("Failed to build pipeline")?;

            let outcome = pipeline.run();
            if let (Some(handle), Some(path)) = (&prometheus, metrics_file) {
                if let Err(e) = metrics::write_snapshot(handle, path) {
                    error!("Failed to write metrics snapshot: {}", e);
                }
            }

            match outcome {
                Ok(result) => {
                    info!(run_id = %result.run_id, "Cleaning run completed");
                    if !result.warnings.is_empty() {
                        println!("\nWarnings:");
                        for warning in &result.warnings {
                            println!("   - {}", warning);
                        }
                    }
                }
                Err(e) => {
                    error!("Cleaning run failed: {}", e);
                    return Err(e).context("Cleaning run failed");
                }
            }
        }
        Commands::Inspect => {
            let config = load_config(&cli, CliOverrides::default())?;
            let pipeline = Pipeline::from_config(config).context("Failed to build pipeline")?;
            let loaded = pipeline.load().context("Failed to load dataset")?;

            println!("\nColumn types:\n{}", loaded.table.dtype_listing());
            println!("\nMissing values per column:");
            for (column, nulls) in loaded.table.null_counts() {
                println!("   {column}: {nulls}");
            }
            println!("\nSource: {} bytes, sha256 {}", loaded.byte_len, loaded.sha256);
        }
    }
    Ok(())
}
