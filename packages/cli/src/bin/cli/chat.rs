// ABOUTME: `sandcraft chat`: one agent turn from the command line
// ABOUTME: Streams NDJSON events to stdout, or prints the final answer with --sync

use anyhow::{Context, Result};
use clap::Args;
use colored::*;
use futures::StreamExt;
use sandcraft_ai::ChatMessage;
use sandcraft_cli::AppContext;
use std::io::Write;
use std::path::PathBuf;
use tracing::{info, warn};

#[derive(Args)]
pub struct ChatArgs {
    /// The request for the agent
    pub message: String,

    /// Owner id that sandboxes and credentials are scoped to
    #[arg(long, default_value = "local")]
    pub owner: String,

    /// JSON file with earlier conversation turns to continue from
    #[arg(long)]
    pub history: Option<PathBuf>,

    /// Wait for the final answer instead of streaming events
    #[arg(long)]
    pub sync: bool,
}

pub async fn run(context: &AppContext, args: ChatArgs) -> Result<()> {
    let agent = context.agent()?;

    let mut messages = match &args.history {
        Some(path) => load_history(path)?,
        None => Vec::new(),
    };
    messages.push(ChatMessage::user(args.message));

    if args.sync {
        let answer = agent.chat(&args.owner, messages).await?;
        println!("{}", answer);
        return Ok(());
    }

    let mut events = agent.chat_stream(&args.owner, messages);
    let mut stdout = std::io::stdout().lock();
    loop {
        tokio::select! {
            event = events.next() => {
                let Some(event) = event else { break };
                stdout.write_all(event.to_ndjson()?.as_bytes())?;
                stdout.flush()?;
                if event.is_error() {
                    anyhow::bail!("Agent turn failed");
                }
            }
            _ = tokio::signal::ctrl_c() => {
                warn!("Interrupted; abandoning the turn");
                break;
            }
        }
    }

    info!("Turn complete for {}", args.owner);
    eprintln!(
        "{} Sandboxes stay up until their timeout; run {} to remove them now.",
        "ℹ".cyan(),
        format!("sandcraft sandbox cleanup --owner {}", args.owner).bold()
    );
    Ok(())
}

fn load_history(path: &PathBuf) -> Result<Vec<ChatMessage>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read history from {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("Invalid conversation history in {}", path.display()))
}
