use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

mod db;
mod engine;
mod error;
mod estimator;
mod geo;
mod keywords;
mod models;
mod report;
mod scoring;
mod store;

use crate::engine::PriorityEngine;
use crate::keywords::KeywordTaxonomy;
use crate::models::TriggerReason;
use crate::store::IssueStore;

#[derive(Parser)]
#[command(name = "issue-priority")]
#[command(about = "Priority scoring engine for reported civic infrastructure issues", long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Path to a JSON keyword taxonomy overriding the built-in lists.
    #[arg(long, global = true)]
    keywords: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load realistic seed data
    Seed,
    /// Import issues from a CSV file
    Import {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Recalculate and print the priority breakdown for one issue
    Calc {
        #[arg(long)]
        issue: Uuid,
    },
    /// Submit a citizen severity vote (1-10)
    Vote {
        #[arg(long)]
        issue: Uuid,
        #[arg(long)]
        user: Uuid,
        #[arg(long)]
        rating: i32,
    },
    /// Mark one issue as a duplicate of another
    MarkDuplicate {
        #[arg(long)]
        issue: Uuid,
        #[arg(long)]
        duplicate: Uuid,
        #[arg(long)]
        user: Uuid,
    },
    /// Recalculate priorities for all unresolved issues
    RecalcAll {
        #[arg(long, default_value_t = 8)]
        concurrency: usize,
    },
    /// Run the image severity estimator for an issue and refresh its priority
    AnalyzeImage {
        #[arg(long)]
        issue: Uuid,
        #[arg(long)]
        image: String,
    },
    /// Generate a markdown priority report
    Report {
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        _ => EnvFilter::new("debug"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let database_url = std::env::var("DATABASE_URL")
        .context("DATABASE_URL must be set to a Postgres instance")?;

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .context("failed to connect to Postgres")?;

    let taxonomy = match &cli.keywords {
        Some(path) => KeywordTaxonomy::from_file(path)?,
        None => KeywordTaxonomy::default(),
    };

    let store = Arc::new(db::PgStore::new(pool.clone()));
    let engine = Arc::new(PriorityEngine::new(
        Arc::clone(&store) as Arc<dyn IssueStore>,
        taxonomy,
    ));

    match cli.command {
        Commands::InitDb => {
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            db::seed(&store).await?;
            println!("Seed data inserted.");
        }
        Commands::Import { csv } => {
            let inserted = db::import_csv(&store, &csv).await?;
            println!("Inserted {inserted} issues from {}.", csv.display());
        }
        Commands::Calc { issue } => {
            let breakdown = engine
                .recalculate(issue, TriggerReason::AutomaticRecalculation)
                .await?;
            println!("{}", serde_json::to_string_pretty(&breakdown)?);
        }
        Commands::Vote { issue, user, rating } => {
            engine.submit_severity_vote(issue, user, rating).await?;
            println!("Vote recorded for issue {issue}.");
        }
        Commands::MarkDuplicate {
            issue,
            duplicate,
            user,
        } => {
            engine.mark_duplicate(issue, duplicate, user).await?;
            println!("Marked {duplicate} as a duplicate of {issue}.");
        }
        Commands::RecalcAll { concurrency } => {
            let started = Utc::now();
            let updated = engine.recalculate_all(concurrency).await?;
            println!(
                "Recalculated {updated} issues in {} ms.",
                (Utc::now() - started).num_milliseconds()
            );
        }
        Commands::AnalyzeImage { issue, image } => {
            let estimate = engine
                .apply_image_severity(issue, &image, &estimator::CategoryBaselineEstimator)
                .await?;
            match estimate {
                Some(score) => println!("Estimated severity {score:.2}; priority refreshed."),
                None => println!("No severity estimate available for this image."),
            }
        }
        Commands::Report { out, limit } => {
            let issues = store.list_unresolved().await?;
            let logs = store.recent_priority_logs(limit as i64).await?;
            let report = report::build_report(&issues, &logs, limit);
            std::fs::write(&out, report)?;
            println!("Report written to {}.", out.display());
        }
    }

    Ok(())
}
