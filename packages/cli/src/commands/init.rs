use crate::config::{Config, DEFAULT_CONFIG_NAME};
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Args)]
pub struct InitArgs {
    /// Project root relative to the config file
    #[arg(short, long, default_value = ".")]
    pub root: String,

    /// Diff command, e.g. "node scripts/diff.js"
    #[arg(short, long)]
    pub diff_command: Option<String>,

    /// Anchor manifest path
    #[arg(short, long)]
    pub anchors: Option<String>,

    /// Force overwrite existing config
    #[arg(short, long)]
    pub force: bool,
}

pub fn init(args: InitArgs, cwd: &str) -> Result<()> {
    let config_path = PathBuf::from(cwd).join(DEFAULT_CONFIG_NAME);

    // Check if config already exists
    if config_path.exists() && !args.force {
        println!(
            "{} {} already exists",
            "⚠️".yellow(),
            DEFAULT_CONFIG_NAME.bright_white()
        );
        println!("Use --force to overwrite");
        return Ok(());
    }

    println!(
        "{}",
        "📝 Initializing Paperclip code writer...".bright_blue().bold()
    );

    let config = Config {
        root: args.root,
        anchors: args.anchors,
        diff_command: args
            .diff_command
            .map(|command| command.split_whitespace().map(str::to_string).collect())
            .unwrap_or_default(),
        ..Config::default()
    };

    let config_json = serde_json::to_string_pretty(&config)?;
    fs::write(&config_path, config_json)?;
    println!("  {} Created {}", "✓".green(), DEFAULT_CONFIG_NAME);

    if config.diff_command.is_empty() {
        println!(
            "  {} No diff command set; add \"diffCommand\" before running replay",
            "!".yellow()
        );
    }

    println!();
    println!("{}", "✨ Done!".green().bold());

    Ok(())
}
