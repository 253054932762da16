//! Diff computation delegated to an external process.
//!
//! The request list is written to the command's stdin as JSON; the command
//! answers with a JSON array of `CodeDiff`s on stdout.

use crate::errors::{AdapterError, AdapterResult};
use async_trait::async_trait;
use paperclip_editor::{CodeDiff, CodeDiffRequest, CodeWriteError, CodeWriteResult, DiffRequester};
use std::io;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct CommandDiffRequester {
    program: String,
    args: Vec<String>,
    current_dir: Option<PathBuf>,
}

impl CommandDiffRequester {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            current_dir: None,
        }
    }

    /// Build from `[program, arg, ...]`; `None` when the list is empty
    pub fn from_argv(argv: &[String]) -> Option<Self> {
        let (program, args) = argv.split_first()?;
        Some(Self::new(program.clone()).args(args.iter().cloned()))
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.current_dir = Some(dir.into());
        self
    }

    async fn run(&self, requests: &[CodeDiffRequest]) -> AdapterResult<Vec<CodeDiff>> {
        let input = serde_json::to_vec(requests)?;

        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &self.current_dir {
            command.current_dir(dir);
        }

        let mut child = command
            .spawn()
            .map_err(|e| AdapterError::io(&self.program, e))?;

        // Feed stdin while stdout drains so neither pipe can fill up and stall
        let stdin = child.stdin.take();
        let feed = async move {
            match stdin {
                // Dropping stdin after the write closes the pipe so the command sees EOF
                Some(mut stdin) => stdin.write_all(&input).await,
                None => Ok(()),
            }
        };
        let (fed, output) = tokio::join!(feed, child.wait_with_output());

        let output = output.map_err(|e| AdapterError::io(&self.program, e))?;
        if !output.status.success() {
            return Err(AdapterError::CommandFailed {
                program: self.program.clone(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        if let Err(e) = fed {
            // A command may answer without reading all of its input
            if e.kind() != io::ErrorKind::BrokenPipe {
                return Err(AdapterError::io(&self.program, e));
            }
        }

        let diffs: Vec<CodeDiff> = serde_json::from_slice(&output.stdout)?;
        debug!(requests = requests.len(), diffs = diffs.len(), "diff command finished");
        Ok(diffs)
    }
}

#[async_trait]
impl DiffRequester for CommandDiffRequester {
    async fn request_diffs(&self, requests: &[CodeDiffRequest]) -> CodeWriteResult<Vec<CodeDiff>> {
        if requests.is_empty() {
            return Ok(Vec::new());
        }
        self.run(requests)
            .await
            .map_err(|e| CodeWriteError::DiffService(e.to_string()))
    }
}
