use crate::config::Config;
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use paperclip_common::RealFileSystem;
use paperclip_editor::KeyCleaner;
use paperclip_workspace::FsKeyCleaner;
use std::sync::Arc;

#[derive(Debug, Args)]
pub struct CleanArgs {
    /// Files to clean, relative to the project root
    #[arg(required = true)]
    pub files: Vec<String>,

    /// Generation-key attribute (overrides config)
    #[arg(short, long)]
    pub attribute: Option<String>,
}

pub async fn clean(args: CleanArgs, cwd: &str) -> Result<()> {
    let config = Config::load(cwd)?;
    let root = config.get_root_dir(cwd);
    let attribute = args.attribute.unwrap_or(config.key_attribute);

    let cleaner = FsKeyCleaner::with_attribute(&root, Arc::new(RealFileSystem), &attribute)?;
    cleaner.clean_keys(&args.files).await?;

    println!(
        "{} Removed {} from {} file(s)",
        "✓".green(),
        attribute.bright_white(),
        args.files.len()
    );
    Ok(())
}
