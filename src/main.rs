mod api;
mod commands;
mod config;
mod controller;
mod events;
mod logging;
mod ui;

use anyhow::Result;
use api::ChatClient;
use clap::{Parser, Subcommand};
use config::Config;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "sema")]
#[command(version)]
#[command(about = "AI-driven transparency for African public records", long_about = None)]
struct Cli {
    /// Base URL of the Sema-Data API (overrides config and SEMA_API_URL)
    #[arg(long, global = true, value_name = "URL")]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Ask a single question and print the cited answer
    Ask {
        /// The question to ask
        #[arg(required = true, num_args = 1..)]
        question: Vec<String>,
    },
    /// Check whether the API is reachable
    Health,
    /// Write the config file if missing and print it
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load()?;
    if let Some(url) = cli.api_url {
        config.set_base_url(url);
    }

    match cli.command {
        None => {
            logging::init_file_tracing(&config.log_path())?;
            let client = ChatClient::new(&config)?;
            ui::run(config, Arc::new(client)).await
        }
        Some(Commands::Ask { question }) => {
            logging::init_stderr_tracing();
            let client = ChatClient::new(&config)?;
            commands::ask(&client, &question.join(" "), config.api.send_history).await
        }
        Some(Commands::Health) => {
            logging::init_stderr_tracing();
            let client = ChatClient::new(&config)?;
            commands::health(&client, &config.health_url()).await
        }
        Some(Commands::Config) => commands::show_config(&config),
    }
}
