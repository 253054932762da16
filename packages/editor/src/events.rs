//! # Write Events
//!
//! Observing surfaces subscribe to a broadcast of what the code writer did.
//! A `Settled` event tells them the source changed on disk and they may
//! resynchronize their view from it.

use crate::actions::ActionKind;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum CycleOutcome {
    /// Diffs were applied to these files
    Written { files: Vec<String> },
    /// Nothing to write (no anchor resolved, unsupported action)
    Skipped { reason: String },
    Failed { error: String },
}

impl CycleOutcome {
    pub fn is_written(&self) -> bool {
        matches!(self, CycleOutcome::Written { .. })
    }
}

/// Result of one write cycle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleReport {
    /// Submission sequence number of the action, starting at 0
    pub seq: u64,
    pub kind: ActionKind,
    pub outcome: CycleOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettledEvent {
    pub seq: u64,
    pub files: Vec<String>,
    pub timestamp_ms: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum WriteEvent {
    CycleFinished(CycleReport),
    Settled(SettledEvent),
    CleanupFlushed { files: Vec<String> },
}

/// Broadcast hub for write events
#[derive(Debug, Clone)]
pub struct EventHub {
    tx: broadcast::Sender<WriteEvent>,
}

impl EventHub {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<WriteEvent> {
        self.tx.subscribe()
    }

    pub fn emit(&self, event: WriteEvent) {
        // No subscribers is not an error
        if self.tx.send(event).is_err() {
            debug!("write event dropped, no subscribers");
        }
    }

    /// Notify observers after `delay` so the write has landed before they re-read
    pub fn notify_settled_after(&self, delay: Duration, seq: u64, files: Vec<String>) {
        let hub = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            hub.emit(WriteEvent::Settled(SettledEvent {
                seq,
                files,
                timestamp_ms: chrono::Utc::now().timestamp_millis(),
            }));
        });
    }
}
