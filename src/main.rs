mod accounts;
mod cli;
mod config;
mod consult;
mod db;
mod embedding;
mod error;
mod responder;
mod server;
mod vector;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "healthchat", version, about = "Health-advice chatbot with doctor review")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the chat service (advisories, consultations, review)
    Serve,
    /// Start the vector-database service (knowledge, conversations, profiles)
    VectorServe,
    /// Interactive symptom prompt against the configured responder
    Chat,
    /// Manage the embedding model
    Model {
        #[command(subcommand)]
        action: ModelAction,
    },
}

#[derive(Subcommand)]
enum ModelAction {
    /// Download the embedding model to ~/.healthchat/models/
    Download,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load config (for log level)
    let config = config::HealthchatConfig::load()?;

    // Initialize tracing with the configured log level, writing to stderr so
    // the interactive prompt stays clean on stdout.
    let filter = EnvFilter::try_new(&config.server.log_level)
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Serve => {
            server::serve_chat(config).await?;
        }
        Command::VectorServe => {
            server::serve_vector(config).await?;
        }
        Command::Chat => {
            cli::chat_loop(&config).await?;
        }
        Command::Model { action } => match action {
            ModelAction::Download => {
                cli::model_download(&config.embedding).await?;
            }
        },
    }

    Ok(())
}
