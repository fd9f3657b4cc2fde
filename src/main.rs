//! `model-harvest` command line

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use model_harvest::{Config, Harvester, SliceBatch, generate_report};
use std::path::PathBuf;
use tracing::Level;

/// Environment variable consulted when the config file carries no API token
const TOKEN_ENV_VAR: &str = "THINGIVERSE_API_TOKEN";

#[derive(Debug, Parser)]
#[command(name = "model-harvest", version, about, long_about = None)]
struct Cli {
    /// JSON configuration file
    #[arg(long, short)]
    config: PathBuf,

    /// Enable debug logging
    #[arg(long, short, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Download meshes and G-code for a range of model ids
    Acquire {
        /// First id to visit (overrides scan.start_id)
        #[arg(long)]
        start: Option<u64>,

        /// Number of ids to visit (overrides scan.max_items)
        #[arg(long)]
        count: Option<u64>,
    },

    /// Slice downloaded meshes with the configured slicers
    Slice {
        /// Run a single pass instead of draining the input directory
        #[arg(long, default_value_t = false)]
        once: bool,
    },

    /// Write the G-code command CSV report
    Report,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut config = Config::from_json_file(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;

    match cli.command {
        Command::Acquire { start, count } => {
            if config.api.token.is_empty() {
                if let Ok(token) = std::env::var(TOKEN_ENV_VAR) {
                    config.api.token = token;
                }
            }
            if let Some(start) = start {
                config.scan.start_id = start;
            }
            if let Some(count) = count {
                config.scan.max_items = count;
            }

            let harvester = Harvester::new(config).await?;
            let summary = harvester.run().await?;

            println!(
                "Scanned ids {}..{}: {} files written, {} unresolved",
                summary.start,
                summary.end,
                summary.files_written(),
                summary.unresolved().count()
            );
            for (label, count) in summary.counts() {
                println!("  {label}: {count}");
            }
        }
        Command::Slice { once } => {
            let batch = SliceBatch::new(config.slicing)?;
            let summary = if once {
                batch.run_once().await?
            } else {
                batch.run_until_empty().await?
            };

            println!("Completed models:");
            for model in &summary.completed_models {
                println!("  {model}");
            }
            println!(
                "Total G-code files generated: {} ({} skipped, {} failed)",
                summary.generated, summary.skipped, summary.failed
            );
        }
        Command::Report => {
            let files = generate_report(&config.report).await?;
            println!(
                "Tallied {} files into {}",
                files,
                config.report.output.display()
            );
        }
    }

    Ok(())
}

fn init_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .init();
}
