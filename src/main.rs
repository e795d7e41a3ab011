use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::fs::File;
use tracing::info;
use tracing_subscriber::EnvFilter;

use feedback_triage::TriageService;
use feedback_triage::config::Config;

#[derive(Parser)]
#[command(name = "feedback-triage")]
#[command(about = "Customer feedback triage: sentiment, urgency, and dashboard metrics")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze one feedback text and print the record (not stored)
    Analyze {
        /// Feedback text
        #[arg(long)]
        text: String,
        /// Domain tag (banking, healthcare, ecommerce, ...)
        #[arg(long, default_value = "general")]
        domain: String,
        /// Owner id stamped on the record
        #[arg(long, default_value = "cli")]
        owner: String,
    },
    /// Ingest a feedback CSV into the store
    Ingest {
        /// CSV file path
        #[arg(long)]
        file: String,
        /// Domain tag applied to every row
        #[arg(long, default_value = "general")]
        domain: String,
        /// Owner of the ingested records
        #[arg(long)]
        owner: String,
    },
    /// Print the dashboard metrics for one owner
    Metrics {
        /// Owner id
        #[arg(long)]
        owner: String,
    },
    /// Print the recommendation for one stored record
    Insight {
        /// Record id
        #[arg(long)]
        id: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("feedback_triage=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::load()?;
    let service = TriageService::from_config(&config)?;

    match cli.command {
        Commands::Analyze {
            text,
            domain,
            owner,
        } => {
            let record = service.analyze(&text, &domain, &owner)?;
            println!("{}", serde_json::to_string_pretty(&record)?);
        }
        Commands::Ingest {
            file,
            domain,
            owner,
        } => {
            let f = File::open(&file).with_context(|| format!("failed to open {}", file))?;
            let summary = service.ingest_csv(f, &domain, &owner).await?;
            info!(
                processed = summary.processed,
                skipped = summary.skipped,
                "ingestion complete"
            );
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        Commands::Metrics { owner } => {
            let snapshot = service.dashboard(&owner).await?;
            println!("{}", serde_json::to_string_pretty(&snapshot)?);
        }
        Commands::Insight { id } => {
            let insight = service.insight(&id).await?;
            println!("{}", serde_json::to_string_pretty(&insight)?);
        }
    }

    Ok(())
}
