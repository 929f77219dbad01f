use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use moe_api::{FileApiClient, QaApiClient};
use moe_core::context::SessionContext;
use moe_core::plan::PlanTier;
use moe_core::session::ConversationController;
use moe_core::upload::FileBatchUploader;

mod commands;

#[derive(Parser)]
#[command(name = "moe")]
#[command(about = "Moe - millwork Q&A assistant for Mozaik users", long_about = None)]
struct Cli {
    /// Base URL of the Moe API; falls back to MOE_API_BASE_URL
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Bearer token for the Moe API; falls back to MOE_API_TOKEN
    #[arg(long, global = true)]
    token: Option<String>,

    /// Subscription plan tier for this session (free, pro, enterprise)
    #[arg(long, global = true, default_value = "free")]
    plan: PlanTier,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ask a single question and print the answer
    Ask { question: String },
    /// Start an interactive chat session
    Chat,
    /// Upload files for asynchronous analysis
    Upload { files: Vec<PathBuf> },
}

fn qa_client(cli: &Cli) -> Result<QaApiClient> {
    let client = match &cli.base_url {
        Some(url) => QaApiClient::new(url),
        None => QaApiClient::try_from_env()?,
    };
    Ok(match &cli.token {
        Some(token) => client.with_token(token),
        None => client,
    })
}

fn file_client(cli: &Cli) -> Result<FileApiClient> {
    let client = match &cli.base_url {
        Some(url) => FileApiClient::new(url),
        None => FileApiClient::try_from_env()?,
    };
    Ok(match &cli.token {
        Some(token) => client.with_token(token),
        None => client,
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let context = SessionContext::new(cli.plan);

    match &cli.command {
        Commands::Ask { question } => {
            let controller = ConversationController::new(Arc::new(qa_client(&cli)?), context);
            commands::ask::run(&controller, question).await
        }
        Commands::Chat => {
            let controller = ConversationController::new(Arc::new(qa_client(&cli)?), context);
            commands::chat::run(&controller).await
        }
        Commands::Upload { files } => {
            let uploader = FileBatchUploader::new(Arc::new(file_client(&cli)?), context);
            commands::upload::run(&uploader, files).await
        }
    }
}
