use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};

mod config;
mod db;
mod error;
mod extract;
mod identify;
mod ingest;
mod models;
mod ranking;
mod report;

use crate::config::Config;
use crate::db::{PgReportStore, ReportStore};
use crate::error::IngestError;
use crate::models::UploadOutcome;

#[derive(Parser)]
#[command(name = "attendance-leaderboard")]
#[command(about = "Class attendance averages and best-attendance leaderboard", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Extract a class roster from a PDF attendance report and re-rank
    Ingest {
        #[arg(long)]
        pdf: PathBuf,
        /// Class label; detected from the report when omitted
        #[arg(long)]
        class: Option<String>,
    },
    /// Same as ingest, from text already extracted from a report
    IngestText {
        #[arg(long)]
        text: PathBuf,
        #[arg(long)]
        class: Option<String>,
    },
    /// Rebuild the best-attendance ranking from every stored class
    Ranking {
        #[arg(long, default_value_t = 20)]
        limit: usize,
        /// Write the full ranking as JSON
        #[arg(long)]
        out: Option<PathBuf>,
        /// Write the full ranking as CSV
        #[arg(long)]
        csv: Option<PathBuf>,
    },
    /// List stored classes, highest average first
    Classes,
    /// Generate a markdown report
    Report {
        #[arg(long, default_value_t = 20)]
        limit: usize,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    pretty_env_logger::init_custom_env("RUST_LOG");

    let cli = Cli::parse();
    let config = Config::from_env()?;
    let pool = db::connect(&config).await?;
    let store = PgReportStore::new(pool.clone());

    match cli.command {
        Commands::InitDb => {
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Ingest { pdf, class } => {
            let text = extract::pdf_text_from_path(&pdf).map_err(|e| rejected(e, &pdf))?;
            let outcome = run_upload(&config, &store, &text, &pdf, class.as_deref()).await?;
            print_outcome(&outcome);
        }
        Commands::IngestText { text, class } => {
            let raw = std::fs::read_to_string(&text)
                .with_context(|| format!("failed to read {}", text.display()))?;
            if raw.trim().is_empty() {
                return Err(rejected(IngestError::EmptyUpload, &text));
            }
            let outcome = run_upload(&config, &store, &raw, &text, class.as_deref()).await?;
            print_outcome(&outcome);
        }
        Commands::Ranking { limit, out, csv } => {
            let ranking = ingest::current_ranking(&store).await?;

            if ranking.ranking.is_empty() {
                println!("No classes have been uploaded yet.");
            } else {
                println!("Best attendance across all classes:");
                for (position, entry) in ranking.ranking.iter().take(limit).enumerate() {
                    println!(
                        "{:>3}. {} {:.2}%",
                        position + 1,
                        entry.name,
                        entry.best_attendance_percent
                    );
                }
            }

            if let Some(path) = out {
                report::write_ranking_json(&path, &ranking)?;
                println!("Ranking written to {}.", path.display());
            }
            if let Some(path) = csv {
                report::write_ranking_csv(&path, &ranking)?;
                println!("Ranking written to {}.", path.display());
            }
        }
        Commands::Classes => {
            let reports = store.list_all().await?;
            let classes = ranking::rank_classes(&reports);

            if classes.is_empty() {
                println!("No classes have been uploaded yet.");
                return Ok(());
            }

            for class in &classes {
                println!(
                    "- {} ({}) average {:.2}% across {} students",
                    class.class_label, class.slug, class.average, class.student_count
                );
            }
        }
        Commands::Report { limit, out } => {
            let reports = store.list_all().await?;
            let ranking = ranking::build_ranking(&reports, chrono::Utc::now());
            let report = report::build_report(&reports, &ranking, limit);
            std::fs::write(&out, report)?;
            println!("Report written to {}.", out.display());
        }
    }

    Ok(())
}

async fn run_upload(
    config: &Config,
    store: &PgReportStore,
    raw_text: &str,
    source: &Path,
    class: Option<&str>,
) -> anyhow::Result<UploadOutcome> {
    let extractor = config.extractor()?;
    let fallback = source
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();

    let upload = ingest::process_upload(&extractor, raw_text, &fallback, class)
        .map_err(|e| rejected(e, source))?;
    let outcome = ingest::ingest_and_rank(store, upload).await?;
    Ok(outcome)
}

fn rejected(err: IngestError, source: &Path) -> anyhow::Error {
    if err.is_client_error() {
        log::warn!("Rejected {}: {err}", source.display());
        anyhow::Error::new(err).context(format!("{} was not accepted", source.display()))
    } else {
        anyhow::Error::new(err).context(format!("failed to process {}", source.display()))
    }
}

fn print_outcome(outcome: &UploadOutcome) {
    println!(
        "Class {} ({}) stored with {} students, average {:.2}%.",
        outcome.class_label,
        outcome.slug,
        outcome.records.len(),
        outcome.average
    );
    println!("Top of the ranking:");
    for entry in outcome.ranking.ranking.iter().take(10) {
        println!("- {} {:.2}%", entry.name, entry.best_attendance_percent);
    }
}
