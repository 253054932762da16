//! # Key Cleanup Scheduling
//!
//! Structural writes leave per-element generation keys in the files they
//! touch. Those files are collected here and, once no new file has been
//! marked for a full debounce period, handed to the [`KeyCleaner`] as one
//! batch.
//!
//! The debounce resets on every `mark_dirty`; it is not a throttle.

use crate::boundary::KeyCleaner;
use crate::events::{EventHub, WriteEvent};
use std::collections::BTreeSet;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info};

/// Single re-armable timer
#[derive(Debug)]
pub struct DebounceTimer {
    delay: Duration,
    deadline: Option<Instant>,
}

impl DebounceTimer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            deadline: None,
        }
    }

    /// Start the timer, or push an armed timer's deadline out
    pub fn arm(&mut self) {
        self.deadline = Some(Instant::now() + self.delay);
    }

    pub fn disarm(&mut self) {
        self.deadline = None;
    }

    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    /// Resolves at the current deadline; never resolves while disarmed
    pub fn expiry(&self) -> impl Future<Output = ()> + Send + 'static {
        let deadline = self.deadline;
        async move {
            match deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => std::future::pending::<()>().await,
            }
        }
    }
}

/// Sender side used to mark files dirty
#[derive(Debug, Clone)]
pub struct CleanupHandle {
    tx: mpsc::UnboundedSender<Vec<String>>,
}

impl CleanupHandle {
    pub fn mark_dirty<I, S>(&self, files: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let files: Vec<String> = files.into_iter().map(Into::into).collect();
        if self.tx.send(files).is_err() {
            error!("cleanup scheduler has stopped, dirty files dropped");
        }
    }
}

/// Owns the cleanup worker task
pub struct CleanupScheduler {
    handle: CleanupHandle,
    task: JoinHandle<()>,
}

impl CleanupScheduler {
    pub fn spawn(debounce: Duration, cleaner: Arc<dyn KeyCleaner>, events: EventHub) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let worker = CleanupWorker {
            pending: BTreeSet::new(),
            timer: DebounceTimer::new(debounce),
            cleaner,
            events,
        };
        Self {
            handle: CleanupHandle { tx },
            task: tokio::spawn(worker.run(rx)),
        }
    }

    pub fn handle(&self) -> CleanupHandle {
        self.handle.clone()
    }

    /// Stop accepting files and flush whatever is pending.
    ///
    /// Waits for every outstanding [`CleanupHandle`] to be dropped.
    pub async fn shutdown(self) {
        drop(self.handle);
        if let Err(e) = self.task.await {
            error!("cleanup worker panicked: {}", e);
        }
    }
}

struct CleanupWorker {
    pending: BTreeSet<String>,
    timer: DebounceTimer,
    cleaner: Arc<dyn KeyCleaner>,
    events: EventHub,
}

impl CleanupWorker {
    async fn run(mut self, mut rx: mpsc::UnboundedReceiver<Vec<String>>) {
        loop {
            tokio::select! {
                msg = rx.recv() => match msg {
                    Some(files) => {
                        debug!(count = files.len(), "files marked dirty");
                        self.pending.extend(files);
                        self.timer.arm();
                    }
                    None => {
                        self.timer.disarm();
                        self.flush().await;
                        break;
                    }
                },
                _ = self.timer.expiry() => {
                    self.timer.disarm();
                    self.flush().await;
                }
            }
        }
    }

    async fn flush(&mut self) {
        if self.pending.is_empty() {
            return;
        }
        let files: Vec<String> = std::mem::take(&mut self.pending).into_iter().collect();
        info!(count = files.len(), "cleaning generation keys");

        if let Err(e) = self.cleaner.clean_keys(&files).await {
            error!("key cleanup failed: {}", e);
        }
        self.events.emit(WriteEvent::CleanupFlushed { files });
    }
}
