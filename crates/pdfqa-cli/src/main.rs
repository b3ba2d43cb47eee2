#![deny(unsafe_code)]

//! pdfqa CLI: ask questions about the text extracted from a PDF.

mod session;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use pdfqa_config::AppConfig;
use pdfqa_core::pages::{self, PageFilter};
use pdfqa_core::{ContextPlanner, LogCollector, LogReader};
use tracing::info;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// pdfqa: question answering over extracted PDF text.
#[derive(Parser)]
#[command(name = "pdfqa", version, about, long_about = None)]
struct Cli {
    /// Path to configuration file.
    #[arg(short, long, default_value = "pdfqa.toml")]
    config: PathBuf,

    /// Increase log verbosity (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ask one question and stream the answer.
    Ask {
        /// Extracted document text (with page markers).
        document: PathBuf,
        question: String,
    },

    /// Interactive session with conversation history.
    Chat {
        /// Extracted document text (with page markers).
        document: PathBuf,
    },

    /// Show what would be sent for a question without contacting a provider.
    Plan {
        document: PathBuf,
        #[arg(default_value = "")]
        question: String,

        /// Also print the selected document content.
        #[arg(long)]
        show_content: bool,
    },

    /// Check a page-range expression, optionally against a document.
    Pages {
        /// e.g. "1-5,8,10-15"
        spec: String,

        #[arg(long)]
        document: Option<PathBuf>,
    },

    /// Validate and display configuration.
    Config {
        /// Show the resolved configuration (API keys redacted).
        #[arg(long)]
        show: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let (config, found) = load_config(&cli.config).await?;
    let logs = init_tracing(cli.verbose, &config);
    if !found {
        info!(path = %cli.config.display(), "Config file not found, using defaults");
    }

    match cli.command {
        Commands::Ask { document, question } => {
            let document = read_document(&document).await?;
            session::ask(&config, document, &question, &logs).await?
        }
        Commands::Chat { document } => {
            let document = read_document(&document).await?;
            session::chat(&config, document, &logs).await?
        }
        Commands::Plan {
            document,
            question,
            show_content,
        } => {
            let document = read_document(&document).await?;
            cmd_plan(&config, &document, &question, show_content)
        }
        Commands::Pages { spec, document } => {
            let document = match document {
                Some(path) => Some(read_document(&path).await?),
                None => None,
            };
            cmd_pages(&config, &spec, document.as_deref())?
        }
        Commands::Config { show } => cmd_config(&cli.config, &config, show)?,
    }

    Ok(())
}

/// Install the stderr formatter and the in-memory collector.
fn init_tracing(verbose: u8, config: &AppConfig) -> LogReader {
    let level = match verbose {
        0 => config.logging.level.as_str(),
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let collector = LogCollector::new(config.logging.capacity);
    let reader = collector.reader();
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(collector)
        .init();
    reader
}

fn cmd_plan(config: &AppConfig, document: &str, question: &str, show_content: bool) {
    let planner = ContextPlanner::from_config(config);
    let plan = planner.plan(document, &[], question);
    println!("{}", plan.report);
    if show_content {
        println!();
        println!("{}", plan.content);
    }
}

fn cmd_pages(config: &AppConfig, spec: &str, document: Option<&str>) -> Result<()> {
    let selected = pages::parse(spec).with_context(|| format!("invalid page range {spec:?}"))?;
    if selected.is_empty() {
        println!("Empty range: all pages are used.");
    } else {
        let numbers: Vec<String> = selected.iter().map(|i| (i + 1).to_string()).collect();
        println!("Pages: {}", numbers.join(", "));
    }

    let Some(document) = document else {
        return Ok(());
    };
    let filtered = PageFilter::new(&config.filter).filter(document, &selected);
    let report = &filtered.report;
    println!("Markers found: {}", report.markers_found);
    println!("Outcome: {:?}", report.outcome);
    if !report.pages_kept.is_empty() {
        let kept: Vec<String> = report.pages_kept.iter().map(u32::to_string).collect();
        println!("Kept: {}", kept.join(", "));
    }
    for anomaly in &report.anomalies {
        println!("Warning: {anomaly}");
    }
    Ok(())
}

fn cmd_config(path: &Path, config: &AppConfig, show: bool) -> Result<()> {
    if let Err(err) = pages::validate(&config.qa.pages) {
        eprintln!("Warning: qa.pages is invalid and will be ignored: {err}");
    }

    if show {
        let toml_str = toml::to_string_pretty(&redacted(config))
            .map_err(|e| anyhow::anyhow!("TOML error: {e}"))?;
        println!("{toml_str}");
    } else {
        println!("Configuration at '{}' is valid.", path.display());
    }

    match (config.qa.model(), config.qa.endpoint()) {
        (Some(model), Some(endpoint)) => {
            println!("Service: {} ({model} at {endpoint})", config.qa.service.as_str())
        }
        _ => println!("Service: disabled"),
    }
    Ok(())
}

/// A copy of `config` safe to print.
fn redacted(config: &AppConfig) -> AppConfig {
    const MASK: &str = "[REDACTED]";
    let mut config = config.clone();
    if !config.qa.silicon.api_key.is_empty() {
        config.qa.silicon.api_key = MASK.to_string();
    }
    if let Some(key) = config.qa.custom.api_key.as_mut().filter(|k| !k.is_empty()) {
        *key = MASK.to_string();
    }
    config
}

async fn load_config(path: &Path) -> Result<(AppConfig, bool)> {
    if tokio::fs::try_exists(path).await.unwrap_or(false) {
        let config = AppConfig::load(path).await.map_err(|e| anyhow::anyhow!(e))?;
        Ok((config, true))
    } else {
        Ok((AppConfig::default(), false))
    }
}

async fn read_document(path: &Path) -> Result<String> {
    tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read document '{}'", path.display()))
}
