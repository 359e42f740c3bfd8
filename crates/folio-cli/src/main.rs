//! Folio CLI - Command Line Interface
//!
//! Command-line tool for the Folio library and commerce store. Each run
//! connects, applies the declared indexes, loads the sample dataset when the
//! store is empty and executes one command.
//!
//! Key Features:
//! - TOML configuration with environment and flag overrides
//! - Book queries by year, genre and title words
//! - Catalogue and sales reports
//! - Index inspection
//!
//! @version 0.1.0
//! @author Folio Development Team

use clap::{Parser, Subcommand, ValueEnum};
use folio_common::{FolioConfig, Result};
use folio_client::DocumentStore;
use folio_document::{Query, QueryBuilder};
use folio_library::{samples, Folio, Record};
use serde::Serialize;
use serde_json::{json, Value};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

// =============================================================================
// CLI Arguments
// =============================================================================

#[derive(Parser, Debug)]
#[command(name = "folio")]
#[command(author = "Folio Development Team")]
#[command(version = "0.1.0")]
#[command(about = "Folio library and commerce store", long_about = None)]
struct Cli {
    /// Configuration file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Store URI, overrides the configuration and FOLIO_URI
    #[arg(long)]
    uri: Option<String>,

    /// Log filter directive, overrides the configuration and FOLIO_LOG
    #[arg(long)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
enum Command {
    /// Load the sample dataset
    Seed,
    /// List books
    Books {
        /// Only books published after this year
        #[arg(long)]
        after: Option<i32>,
        #[arg(long)]
        genre: Option<String>,
        /// Words that must all appear in the title
        #[arg(long)]
        search: Option<String>,
        #[arg(short, long, default_value_t = 20)]
        limit: usize,
    },
    /// Run a report
    Report {
        #[arg(value_enum)]
        kind: ReportKind,
        /// Stock threshold for the low-stock report
        #[arg(long, default_value_t = 5)]
        threshold: i64,
    },
    /// List indexes per collection
    Indexes,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
enum ReportKind {
    Genres,
    AverageYear,
    TopRated,
    Revenue,
    LowStock,
    Units,
}

// =============================================================================
// Configuration
// =============================================================================

fn load_config(cli: &Cli) -> Result<FolioConfig> {
    let config = match cli.config {
        Some(ref path) => FolioConfig::from_file(path)?,
        None => FolioConfig::default(),
    };
    let mut config = config.apply_env();

    if let Some(ref uri) = cli.uri {
        config.store.uri = uri.clone();
    }
    if let Some(ref level) = cli.log_level {
        config.logging.level = level.clone();
    }
    Ok(config)
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

// =============================================================================
// Commands
// =============================================================================

fn record_json<E: Serialize>(record: &Record<E>) -> Result<Value> {
    let mut value = serde_json::to_value(&record.entity)?;
    if let Value::Object(ref mut map) = value {
        map.insert("_id".to_string(), json!(record.id.as_str()));
    }
    Ok(value)
}

fn records_json<E: Serialize>(records: &[Record<E>]) -> Result<Value> {
    records.iter().map(record_json).collect::<Result<Vec<_>>>().map(Value::Array)
}

async fn run(folio: &Folio, command: Command) -> Result<Value> {
    match command {
        Command::Seed => Ok(serde_json::to_value(samples::seed(folio).await?)?),
        Command::Books {
            after,
            genre,
            search,
            limit,
        } => {
            let mut query = QueryBuilder::new();
            if let Some(year) = after {
                query = query.gt("publishedYear", year);
            }
            if let Some(genre) = genre {
                query = query.eq("genre", genre);
            }
            if let Some(words) = search {
                query = query.text("title", words);
            }
            let query = query.sort("publishedYear", false).limit(limit).build();
            records_json(&folio.books.find(&query).await?)
        }
        Command::Report { kind, threshold } => report(folio, kind, threshold).await,
        Command::Indexes => {
            let mut out = serde_json::Map::new();
            for db in [folio.library(), folio.commerce()] {
                for collection in db.list_collections().await? {
                    let specs: Vec<String> = db
                        .list_indexes(&collection)
                        .await?
                        .iter()
                        .map(ToString::to_string)
                        .collect();
                    out.insert(format!("{}.{}", db.name(), collection), json!(specs));
                }
            }
            Ok(Value::Object(out))
        }
    }
}

async fn report(folio: &Folio, kind: ReportKind, threshold: i64) -> Result<Value> {
    let reports = &folio.reports;
    let value = match kind {
        ReportKind::Genres => serde_json::to_value(reports.count_by_genre().await?)?,
        ReportKind::AverageYear => {
            let average = reports.average_published_year().await?;
            json!({ "averagePublishedYear": average })
        }
        ReportKind::TopRated => match reports.top_rated_book().await? {
            Some(record) => record_json(&record)?,
            None => Value::Null,
        },
        ReportKind::Revenue => {
            let revenue: serde_json::Map<String, Value> = reports
                .revenue_by_status()
                .await?
                .into_iter()
                .map(|(status, total)| (status.to_string(), json!(total)))
                .collect();
            Value::Object(revenue)
        }
        ReportKind::LowStock => records_json(&reports.low_stock_products(threshold).await?)?,
        ReportKind::Units => serde_json::to_value(reports.units_sold_by_product().await?)?,
    };
    Ok(value)
}

/// Connect, prepare the store and run one command.
async fn execute(config: &FolioConfig, command: Command) -> Result<Value> {
    let folio = Folio::connect(config).await?;
    folio.init().await?;
    if command != Command::Seed && folio.books.count(&Query::all()).await? == 0 {
        samples::seed(&folio).await?;
    }

    let result = run(&folio, command).await;
    folio.close().await;
    result
}

// =============================================================================
// Main Entry Point
// =============================================================================

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("folio: {}", e);
            return ExitCode::FAILURE;
        }
    };
    init_logging(&config.logging.level);
    info!(uri = %config.store.uri, "Starting Folio");

    match execute(&config, cli.command).await {
        Ok(output) => {
            match serde_json::to_string_pretty(&output) {
                Ok(text) => println!("{}", text),
                Err(e) => {
                    error!(error = %e, "Failed to render output");
                    return ExitCode::FAILURE;
                }
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(kind = ?e.kind(), "Command failed");
            eprintln!("folio: {}", e);
            ExitCode::FAILURE
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
