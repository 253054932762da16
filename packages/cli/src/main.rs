mod commands;
mod config;

use clap::{Parser, Subcommand};
use colored::Colorize;
use commands::{clean, init, replay, CleanArgs, InitArgs, ReplayArgs};
use tracing_subscriber::EnvFilter;

/// Paperclip CLI - write visual edits back to source code
#[derive(Parser, Debug)]
#[command(name = "paperclip")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create a paperclip.config.json
    Init(InitArgs),

    /// Write a recorded action log to source
    Replay(ReplayArgs),

    /// Remove generation keys from files
    Clean(CleanArgs),
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();

    let cwd = match std::env::current_dir() {
        Ok(dir) => dir.display().to_string(),
        Err(err) => {
            eprintln!("{} Cannot get current directory: {}", "Error:".red().bold(), err);
            std::process::exit(1);
        }
    };

    let result = match cli.command {
        Command::Init(args) => init(args, &cwd),
        Command::Replay(args) => replay(args, &cwd).await.and_then(|summary| {
            if summary.failed > 0 {
                Err(anyhow::anyhow!("{} write(s) failed", summary.failed))
            } else {
                Ok(())
            }
        }),
        Command::Clean(args) => clean(args, &cwd).await,
    };

    if let Err(err) = result {
        eprintln!();
        eprintln!("{} {}", "Error:".red().bold(), err);
        eprintln!();
        std::process::exit(1);
    }
}
