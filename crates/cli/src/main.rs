//! Text Detector CLI
//!
//! A command-line client for scoring texts and checking the health of a
//! running Text Detector service.

mod client;
mod commands;
mod config;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{predict, status};
use std::path::PathBuf;

/// Text Detector CLI
#[derive(Parser)]
#[command(name = "detect")]
#[command(author, version, about = "CLI for the Text Detector service", long_about = None)]
pub struct Cli {
    /// API endpoint URL (can also be set via DETECT_API_URL env var)
    #[arg(long, env = "DETECT_API_URL")]
    pub api_url: Option<String>,

    /// Output format
    #[arg(long, short)]
    pub format: Option<output::OutputFormat>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Classify a text as AI-generated or human-written
    Predict {
        /// Text to classify
        #[arg(long, short, conflicts_with = "file")]
        text: Option<String>,

        /// Read the text from a file (stdin is used when neither is given)
        #[arg(long)]
        file: Option<PathBuf>,
    },

    /// Show service health and per-component status
    Health,

    /// List the configured classifiers
    Models,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = config::Config::load()?;
    let api_url = config.resolve_api_url(cli.api_url);
    let format = config.resolve_format(cli.format)?;

    // Initialize client
    let client = client::ApiClient::new(&api_url)?;

    // Execute command
    let result = match cli.command {
        Commands::Predict { text, file } => {
            let text = predict::read_input(text, file.as_deref(), std::io::stdin())?;
            predict::predict(&client, text, format).await
        }
        Commands::Health => status::health(&client, format).await,
        Commands::Models => status::models(&client, format).await,
    };

    if let Err(e) = &result {
        output::print_error(&format!("{:#}", e));
        std::process::exit(1);
    }

    Ok(())
}
