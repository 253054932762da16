use crate::config::Config;
use anyhow::{anyhow, Context, Result};
use clap::Args;
use colored::Colorize;
use paperclip_common::{FileSystem, RealFileSystem};
use paperclip_editor::{
    Action, AnchorArena, CodeWriter, CodeWriterServices, CycleOutcome, CycleReport, WriteEvent,
};
use paperclip_workspace::{CommandDiffRequester, FsKeyCleaner, FsSourceNavigator, FsWriteApplier};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;

#[derive(Debug, Args)]
pub struct ReplayArgs {
    /// JSON file containing an array of actions
    pub actions: PathBuf,

    /// Anchor manifest (overrides config)
    #[arg(short, long)]
    pub anchors: Option<PathBuf>,

    /// Diff command (overrides config), e.g. "node scripts/diff.js"
    #[arg(short, long)]
    pub diff_command: Option<String>,

    /// Cooldown between write cycles in milliseconds (overrides config)
    #[arg(long)]
    pub cooldown_ms: Option<u64>,
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct ReplaySummary {
    pub written: usize,
    pub skipped: usize,
    pub failed: usize,
    pub cleaned: usize,
}

impl ReplaySummary {
    fn record(&mut self, event: &WriteEvent) {
        match event {
            WriteEvent::CycleFinished(report) => {
                print_report(report);
                match report.outcome {
                    CycleOutcome::Written { .. } => self.written += 1,
                    CycleOutcome::Skipped { .. } => self.skipped += 1,
                    CycleOutcome::Failed { .. } => self.failed += 1,
                }
            }
            WriteEvent::Settled(settled) => {
                println!("    {} settled #{}", "↻".bright_black(), settled.seq);
            }
            WriteEvent::CleanupFlushed { files } => {
                println!("  {} cleaned keys in {} file(s)", "✓".green(), files.len());
                self.cleaned += files.len();
            }
        }
    }
}

fn print_report(report: &CycleReport) {
    match &report.outcome {
        CycleOutcome::Written { files } => println!(
            "  {} #{} {} → {}",
            "✓".green(),
            report.seq,
            report.kind,
            files.join(", ")
        ),
        CycleOutcome::Skipped { reason } => println!(
            "  {} #{} {} skipped: {}",
            "-".yellow(),
            report.seq,
            report.kind,
            reason
        ),
        CycleOutcome::Failed { error } => println!(
            "  {} #{} {} failed: {}",
            "✗".red(),
            report.seq,
            report.kind,
            error
        ),
    }
}

pub fn load_actions(path: &Path) -> Result<Vec<Action>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read actions from {}", path.display()))?;
    let actions: Vec<Action> = serde_json::from_str(&content)
        .with_context(|| format!("Invalid action log {}", path.display()))?;
    Ok(actions)
}

pub async fn replay(args: ReplayArgs, cwd: &str) -> Result<ReplaySummary> {
    let mut config = Config::load(cwd)?;
    if let Some(cooldown_ms) = args.cooldown_ms {
        config.code_writer.cooldown_ms = cooldown_ms;
    }
    let root = config.get_root_dir(cwd);

    let anchors_path = args
        .anchors
        .or_else(|| config.get_anchors_path(cwd))
        .ok_or_else(|| anyhow!("No anchor manifest given; pass --anchors or set \"anchors\""))?;
    let manifest = fs::read_to_string(&anchors_path)
        .with_context(|| format!("Failed to read anchors from {}", anchors_path.display()))?;
    let arena = AnchorArena::from_json(&manifest)?;

    let argv: Vec<String> = match args.diff_command {
        Some(command) => command.split_whitespace().map(str::to_string).collect(),
        None => config.diff_command.clone(),
    };
    let differ = CommandDiffRequester::from_argv(&argv)
        .ok_or_else(|| anyhow!("No diff command configured"))?
        .current_dir(&root);

    let actions = load_actions(&args.actions)?;

    println!(
        "{}",
        format!("🔁 Replaying {} action(s)...", actions.len())
            .bright_blue()
            .bold()
    );

    let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);
    let services = CodeWriterServices {
        anchors: Arc::new(arena),
        differ: Arc::new(differ),
        writer: Arc::new(FsWriteApplier::new(&root, fs.clone())),
        cleaner: Arc::new(FsKeyCleaner::with_attribute(
            &root,
            fs.clone(),
            &config.key_attribute,
        )?),
        navigator: Some(Arc::new(FsSourceNavigator::new(&root, fs))),
    };

    let writer = CodeWriter::spawn(&config.code_writer, services);
    let mut events = writer.subscribe();
    let printer = tokio::spawn(async move {
        let mut summary = ReplaySummary::default();
        loop {
            match events.recv().await {
                Ok(event) => summary.record(&event),
                Err(RecvError::Lagged(missed)) => {
                    tracing::warn!(missed, "replay output fell behind");
                }
                Err(RecvError::Closed) => break,
            }
        }
        summary
    });

    for action in actions {
        writer.write(action)?;
    }
    writer.wait_idle().await?;
    writer.shutdown().await;

    let summary = printer.await?;
    println!();
    println!(
        "✨ {} {} written, {} skipped, {} failed",
        "Done".green().bold(),
        summary.written,
        summary.skipped,
        summary.failed
    );
    Ok(summary)
}
