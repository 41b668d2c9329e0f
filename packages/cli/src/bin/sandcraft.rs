use clap::{Parser, Subcommand};
use colored::*;
use sandcraft_cli::{init_logging, AppContext};
use sandcraft_config::Config;
use std::process;

mod cli;

use cli::chat::ChatArgs;
use cli::sandbox::SandboxCommands;

#[derive(Parser)]
#[command(name = "sandcraft")]
#[command(about = "Sandcraft - AI coding agent with disposable Docker sandboxes")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one agent turn, streaming NDJSON events to stdout
    Chat(ChatArgs),
    /// Manage sandboxes directly
    #[command(subcommand)]
    Sandbox(SandboxCommands),
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    init_logging();

    let cli = Cli::parse();

    if let Err(e) = handle_command(cli.command).await {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        process::exit(1);
    }
}

async fn handle_command(command: Commands) -> anyhow::Result<()> {
    let config = Config::from_env()?;
    let context = AppContext::from_config(config)?;

    match command {
        Commands::Chat(args) => cli::chat::run(&context, args).await,
        Commands::Sandbox(command) => command.execute(&context).await,
    }
}
