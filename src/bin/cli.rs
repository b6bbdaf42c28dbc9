//! estados CLI
//!
//! Aggregates the configured court sources and writes exports.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use estados::{
    error::{AppError, Result},
    models::{AggregateOutcome, Config},
    pipeline::{self, CancelToken, ExportGenerator, QueryFilter, SearchField},
};

/// estados - Pending court status monitor
#[derive(Parser, Debug)]
#[command(
    name = "estados",
    version,
    about = "Collects pending statuses published by municipal civil courts"
)]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "data/config.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Per-source budget in seconds (overrides config)
    #[arg(long, global = true)]
    timeout: Option<u64>,

    /// Sources processed at once (overrides config)
    #[arg(long, global = true)]
    concurrency: Option<usize>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Aggregate every configured source and print a summary
    Fetch {
        /// Recency window in business days
        #[arg(short, long, default_value_t = 5)]
        days: u32,

        /// Also write the aggregation outcome as JSON
        #[arg(long)]
        json: Option<PathBuf>,
    },

    /// Aggregate, filter and write a batch export
    Export {
        #[arg(short, long, default_value_t = 5)]
        days: u32,

        /// Only this court
        #[arg(long)]
        court: Option<u32>,

        /// Case-insensitive search term
        #[arg(short, long)]
        search: Option<String>,

        /// Field searched: expediente or descripcion
        #[arg(long, default_value = "descripcion")]
        field: SearchField,

        /// Output directory
        #[arg(short, long, default_value = ".")]
        output: PathBuf,
    },

    /// Write the export for a single case
    ExportCase {
        /// Case number ("expediente")
        #[arg(long = "case")]
        case_number: String,

        #[arg(long)]
        court: Option<u32>,

        #[arg(short, long, default_value_t = 5)]
        days: u32,

        #[arg(short, long, default_value = ".")]
        output: PathBuf,
    },

    /// Validate the configuration file
    Validate,
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Cancel the returned token on Ctrl-C.
fn cancel_on_ctrl_c() -> CancelToken {
    let (handle, token) = pipeline::cancellation();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::warn!("Interrupted, cancelling aggregation...");
            handle.cancel();
        }
    });
    token
}

async fn aggregate(config: &Config, days: u32) -> Result<AggregateOutcome> {
    let cancel = cancel_on_ctrl_c();
    let outcome = pipeline::run_aggregator(config, days, &cancel).await?;
    for failure in &outcome.failures {
        log::warn!(
            "  ✗ Court {} {} [{}] {}",
            failure.court_id,
            failure.source_url,
            failure.kind,
            failure.message
        );
    }
    Ok(outcome)
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut config = Config::load_or_default(&cli.config);
    if let Some(timeout) = cli.timeout {
        config.fetch.timeout_secs = timeout;
    }
    if let Some(concurrency) = cli.concurrency {
        config.fetch.max_concurrent = concurrency;
    }

    if let Err(e) = config.validate() {
        log::error!("Config validation failed: {}", e);
        return Err(e);
    }

    match cli.command {
        Command::Fetch { days, json } => {
            let outcome = aggregate(&config, days).await?;

            for record in &outcome.records {
                log::info!(
                    "  {} | Juzgado {} | {} | {} | {}{}",
                    record.date,
                    record.court_id,
                    record.case_number,
                    record.status_type,
                    record.description,
                    if record.needs_review() { " (revisar)" } else { "" }
                );
            }

            if let Some(path) = json {
                pipeline::write_json(&path, &outcome).await?;
                log::info!("Outcome saved to {}", path.display());
            }
        }

        Command::Export {
            days,
            court,
            search,
            field,
            output,
        } => {
            let outcome = aggregate(&config, days).await?;
            let filter = QueryFilter {
                court_id: court,
                search_term: search,
                search_field: field,
                since: None,
            };
            let records = pipeline::query(&outcome.records, &filter);
            log::info!("{} of {} records match", records.len(), outcome.records.len());

            let document = ExportGenerator::from_config(&config).export_batch(&records, days);
            let path = document.save(&output).await?;
            log::info!("Export saved to {}", path.display());
        }

        Command::ExportCase {
            case_number,
            court,
            days,
            output,
        } => {
            let outcome = aggregate(&config, days).await?;
            let filter = QueryFilter {
                court_id: court,
                search_term: Some(case_number.clone()),
                search_field: SearchField::CaseNumber,
                since: None,
            };

            // Substring matches are candidates; an exact case number wins
            let matches = pipeline::query(&outcome.records, &filter);
            let record = matches
                .iter()
                .find(|r| r.case_number.eq_ignore_ascii_case(case_number.trim()))
                .or_else(|| matches.first())
                .ok_or_else(|| {
                    AppError::validation(format!(
                        "No record for case {} in the last {} business days",
                        case_number, days
                    ))
                })?;

            let document = ExportGenerator::from_config(&config).export_single(record);
            let path = document.save(&output).await?;
            log::info!("Export saved to {}", path.display());
        }

        Command::Validate => {
            log::info!("✓ Config OK");
            log::info!("  Courts: {}", config.courts.len());
            log::info!("  Sources: {}", config.sources().len());
            log::info!("  Timeout: {}s", config.fetch.timeout_secs);
            log::info!("  Max concurrent: {}", config.fetch.max_concurrent);
            log::info!(
                "  PDF OCR fallback: {}",
                if config.extraction.pdf_ocr_fallback { "on" } else { "off" }
            );
        }
    }

    Ok(())
}
