//! # Write Scheduling
//!
//! Serializes actions into write cycles.
//!
//! ```text
//!            submit ──► channel ──► WriteQueue (FIFO)
//!                                      │ pop one
//!   Idle ──(queue non-empty)──► Running ──(cycle done)──► Cooldown
//!    ▲                                                       │
//!    └──────────────(queue empty after cooldown)─────────────┤
//!                   Running ◄──(queue non-empty)─────────────┘
//! ```
//!
//! A single worker task owns the queue and runs cycles one after another,
//! so two cycles can never overlap. Submitting only enqueues, including
//! from inside a cycle. Every cycle is followed by the cooldown whether or
//! not it wrote anything.

use crate::actions::Action;
use crate::aggregator::RequestAggregator;
use crate::anchor::AnchorIndex;
use crate::boundary::{DiffRequester, WriteApplier};
use crate::cleanup::CleanupHandle;
use crate::code::CodeDiffRequest;
use crate::errors::{CodeWriteError, CodeWriteResult};
use crate::events::{CycleOutcome, CycleReport, EventHub, WriteEvent};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchedulerState {
    Idle,
    Running,
    Cooldown,
}

/// Everything a write cycle talks to
#[derive(Clone)]
pub struct WritePipeline {
    pub anchors: Arc<dyn AnchorIndex>,
    pub differ: Arc<dyn DiffRequester>,
    pub writer: Arc<dyn WriteApplier>,
    pub cleanup: CleanupHandle,
    pub events: EventHub,
    pub settle_delay: Duration,
}

impl WritePipeline {
    /// Run one action through aggregate → request diffs → apply.
    ///
    /// Never fails: every error becomes a logged [`CycleOutcome::Failed`].
    pub async fn execute(&self, seq: u64, action: &Action) -> CycleOutcome {
        let kind = action.kind();

        let aggregator = RequestAggregator::new(self.anchors.as_ref());
        let requests = match aggregator.aggregate(action).await {
            Ok(requests) => requests,
            Err(e) => {
                error!(seq, %kind, "{}", e);
                return CycleOutcome::Skipped {
                    reason: e.to_string(),
                };
            }
        };

        if requests.is_empty() {
            warn!(seq, %kind, "no anchors resolved, nothing to write");
            return CycleOutcome::Skipped {
                reason: "no anchors resolved".to_string(),
            };
        }

        let files = match self.write_requests(&requests).await {
            Ok(files) => files,
            Err(e) => {
                error!(seq, %kind, "write failed: {}", e);
                return CycleOutcome::Failed {
                    error: e.to_string(),
                };
            }
        };

        if action.marks_dirty() {
            self.cleanup
                .mark_dirty(requests.iter().map(|request| request.anchor.path.clone()));
        }
        self.events
            .notify_settled_after(self.settle_delay, seq, files.clone());

        info!(seq, %kind, files = files.len(), "write code");
        CycleOutcome::Written { files }
    }

    async fn write_requests(&self, requests: &[CodeDiffRequest]) -> CodeWriteResult<Vec<String>> {
        let diffs = self.differ.request_diffs(requests).await?;
        if diffs.is_empty() {
            return Err(CodeWriteError::EmptyDiff {
                requests: requests.len(),
            });
        }

        if !self.writer.apply_diffs(&diffs).await? {
            return Err(CodeWriteError::ApplyRejected);
        }

        let files: BTreeSet<String> = diffs.into_iter().map(|diff| diff.path).collect();
        Ok(files.into_iter().collect())
    }
}

/// Handle to the write worker
pub struct WriteScheduler {
    tx: mpsc::UnboundedSender<Action>,
    state: watch::Receiver<SchedulerState>,
    pending: Arc<AtomicUsize>,
    task: JoinHandle<()>,
}

impl WriteScheduler {
    pub fn spawn(pipeline: WritePipeline, cooldown: Duration) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let (state_tx, state) = watch::channel(SchedulerState::Idle);
        let pending = Arc::new(AtomicUsize::new(0));

        let worker = WriteWorker {
            queue: VecDeque::new(),
            next_seq: 0,
            state: state_tx,
            pending: pending.clone(),
            pipeline,
            cooldown,
        };

        Self {
            tx,
            state,
            pending,
            task: tokio::spawn(worker.run(rx)),
        }
    }

    /// Append an action to the write queue
    pub fn submit(&self, action: Action) -> CodeWriteResult<()> {
        self.pending.fetch_add(1, Ordering::SeqCst);
        if self.tx.send(action).is_err() {
            self.pending.fetch_sub(1, Ordering::SeqCst);
            return Err(CodeWriteError::Closed);
        }
        Ok(())
    }

    pub fn state(&self) -> SchedulerState {
        *self.state.borrow()
    }

    /// Actions submitted but not yet through their cycle
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }

    /// Resolve once every submitted action has run and the worker is idle
    pub async fn wait_idle(&self) -> CodeWriteResult<()> {
        let mut state = self.state.clone();
        loop {
            // Read the state before the counter: the worker decrements
            // before it publishes the next state.
            let current = *state.borrow_and_update();
            let pending = self.pending.load(Ordering::SeqCst);
            if current == SchedulerState::Idle && pending == 0 {
                return Ok(());
            }
            if state.changed().await.is_err() {
                return if self.pending.load(Ordering::SeqCst) == 0 {
                    Ok(())
                } else {
                    Err(CodeWriteError::Closed)
                };
            }
        }
    }

    /// Stop accepting actions, run the queued ones, then stop the worker
    pub async fn shutdown(self) {
        drop(self.tx);
        if let Err(e) = self.task.await {
            error!("write worker panicked: {}", e);
        }
    }
}

struct QueuedAction {
    seq: u64,
    action: Action,
}

struct WriteWorker {
    queue: VecDeque<QueuedAction>,
    next_seq: u64,
    state: watch::Sender<SchedulerState>,
    pending: Arc<AtomicUsize>,
    pipeline: WritePipeline,
    cooldown: Duration,
}

impl WriteWorker {
    async fn run(mut self, mut rx: mpsc::UnboundedReceiver<Action>) {
        loop {
            self.drain(&mut rx);

            let Some(next) = self.queue.pop_front() else {
                self.state.send_replace(SchedulerState::Idle);
                match rx.recv().await {
                    Some(action) => self.enqueue(action),
                    None => break,
                }
                continue;
            };

            self.state.send_replace(SchedulerState::Running);
            let (seq, kind) = (next.seq, next.action.kind());
            let outcome = self.run_cycle(next).await;
            self.pending.fetch_sub(1, Ordering::SeqCst);
            self.pipeline.events.emit(WriteEvent::CycleFinished(CycleReport {
                seq,
                kind,
                outcome,
            }));

            self.state.send_replace(SchedulerState::Cooldown);
            tokio::time::sleep(self.cooldown).await;
        }
        self.state.send_replace(SchedulerState::Idle);
    }

    /// Run one cycle on its own task so a panicking boundary only fails that cycle
    async fn run_cycle(&self, next: QueuedAction) -> CycleOutcome {
        let pipeline = self.pipeline.clone();
        let QueuedAction { seq, action } = next;
        match tokio::spawn(async move { pipeline.execute(seq, &action).await }).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(seq, "write cycle panicked: {}", e);
                CycleOutcome::Failed {
                    error: format!("write cycle panicked: {}", e),
                }
            }
        }
    }

    fn drain(&mut self, rx: &mut mpsc::UnboundedReceiver<Action>) {
        while let Ok(action) = rx.try_recv() {
            self.enqueue(action);
        }
    }

    fn enqueue(&mut self, action: Action) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.queue.push_back(QueuedAction { seq, action });
    }
}
