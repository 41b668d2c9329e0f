// ABOUTME: CLI commands for sandbox maintenance (create, list, exec, destroy, cleanup)
// ABOUTME: Operates the orchestrator directly without going through the agent

use anyhow::Result;
use clap::Subcommand;
use colored::*;
use comfy_table::Table;
use sandcraft_cli::AppContext;
use sandcraft_sandbox::{DestroyOutcome, ExecuteCommandRequest};

#[derive(Subcommand)]
pub enum SandboxCommands {
    /// Create a sandbox
    Create {
        /// Image to run (node:18 or python:3.11)
        #[arg(long, default_value = "python:3.11")]
        image: String,

        #[arg(long, default_value = "local")]
        owner: String,
    },

    /// List an owner's sandboxes
    List {
        #[arg(long, default_value = "local")]
        owner: String,
    },

    /// Run a shell command in a sandbox
    Exec {
        /// Sandbox container id
        id: String,

        /// Command line, run under `sh -c`
        command: String,

        /// Start the command and return without waiting
        #[arg(long)]
        background: bool,
    },

    /// Destroy one sandbox
    Destroy {
        /// Sandbox container id
        id: String,
    },

    /// Destroy every sandbox of an owner
    Cleanup {
        #[arg(long, default_value = "local")]
        owner: String,
    },
}

impl SandboxCommands {
    pub async fn execute(&self, context: &AppContext) -> Result<()> {
        let orchestrator = &context.orchestrator;

        match self {
            SandboxCommands::Create { image, owner } => {
                let sandbox = orchestrator.create_sandbox(owner, image).await?;
                println!("{} Created sandbox {}", "✅".green(), sandbox.id.bold());
                println!("   Image:    {}", sandbox.image);
                if let Some(port) = sandbox.exposed_port {
                    println!("   Port:     http://localhost:{}", port);
                }
                println!("   Files:    {}", sandbox.host_mount_path.display());
                println!(
                    "   Expires:  {} (only while this process runs; use `destroy` afterwards)",
                    sandbox.cleanup_deadline.format("%Y-%m-%d %H:%M:%S UTC")
                );
            }
            SandboxCommands::List { owner } => {
                let sandboxes = orchestrator.list(owner).await?;
                if sandboxes.is_empty() {
                    println!("No sandboxes for {}", owner);
                    return Ok(());
                }

                let mut table = Table::new();
                table.set_header(vec!["Container", "Image", "Status", "Port", "Created"]);
                for sandbox in sandboxes {
                    table.add_row(vec![
                        sandbox.container_id,
                        sandbox.image,
                        sandbox.status,
                        sandbox
                            .host_port
                            .map(|p| p.to_string())
                            .unwrap_or_else(|| "-".to_string()),
                        sandbox.created_at,
                    ]);
                }
                println!("{table}");
            }
            SandboxCommands::Exec {
                id,
                command,
                background,
            } => {
                let request = ExecuteCommandRequest::new(id, command).background(*background);
                let result = orchestrator.execute(request).await?;
                print!("{}", result.output);
                if result.exit_code != 0 {
                    eprintln!("{} exit code {}", "⚠️".yellow(), result.exit_code);
                    std::process::exit(i32::try_from(result.exit_code).unwrap_or(1));
                }
            }
            SandboxCommands::Destroy { id } => match orchestrator.destroy(id).await? {
                DestroyOutcome::Destroyed => println!("{} Destroyed {}", "✅".green(), id),
                DestroyOutcome::AlreadyDestroyed => println!("{} was already gone", id),
            },
            SandboxCommands::Cleanup { owner } => {
                let report = orchestrator.cleanup_all(owner).await?;
                println!(
                    "{} Destroyed {} sandbox(es) for {}",
                    "✅".green(),
                    report.destroyed_count,
                    owner
                );
                for failure in &report.errors {
                    eprintln!(
                        "{} {}: {}",
                        "❌".red(),
                        failure.container_id,
                        failure.error
                    );
                }
                if !report.errors.is_empty() {
                    anyhow::bail!("{} sandbox(es) could not be destroyed", report.errors.len());
                }
            }
        }

        Ok(())
    }
}
