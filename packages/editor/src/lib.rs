//! # Paperclip Editor
//!
//! Turns edits made on the visual surface into source code writes.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ surface: Action (style, insert, move, ...)  │
//! └─────────────────────────────────────────────┘
//!                     ↓ write()
//! ┌─────────────────────────────────────────────┐
//! │ write queue: one cycle at a time + cooldown │
//! │  - aggregate: one request per anchor        │
//! │  - request diffs (DiffRequester)            │
//! │  - apply diffs (WriteApplier)               │
//! └─────────────────────────────────────────────┘
//!          ↓ dirty files          ↓ settled
//! ┌──────────────────────┐  ┌─────────────────────┐
//! │ cleanup (debounced)  │  │ observers resync    │
//! └──────────────────────┘  └─────────────────────┘
//! ```
//!
//! ## Core Principles
//!
//! 1. **Source is the truth**: the surface resyncs from disk after a write
//! 2. **Submission order**: actions are written strictly FIFO
//! 3. **Single flight**: one worker task owns the queue
//! 4. **Failures stay local**: a failed cycle never blocks the next one
//!
//! ## Usage
//!
//! ```rust,ignore
//! use paperclip_editor::{CodeWriter, CodeWriterConfig, CodeWriterServices};
//!
//! let writer = CodeWriter::spawn(&CodeWriterConfig::default(), services);
//! let mut events = writer.subscribe();
//!
//! writer.write(action)?;
//! writer.wait_idle().await?;
//! writer.shutdown().await;
//! ```

mod actions;
mod aggregator;
mod anchor;
mod boundary;
mod cleanup;
mod code;
mod code_writer;
mod config;
mod errors;
mod events;
mod write_queue;

pub use actions::{
    Action, ActionElement, ActionElementLocation, ActionKind, ActionTarget, Change,
    EditTextAction, GroupActionTarget, GroupElementsAction, InsertElementAction, InsertPos,
    MoveActionLocation, MoveElementAction, RemoveElementAction, StyleActionTarget,
    UngroupElementsAction, UpdateStyleAction,
};
pub use aggregator::{PendingChanges, PendingMove, RequestAggregator};
pub use anchor::{Anchor, AnchorArena, AnchorEntry, AnchorId, AnchorIndex, AnchorManifest, Position};
pub use boundary::{DiffRequester, KeyCleaner, SourceNavigator, WriteApplier};
pub use cleanup::{CleanupHandle, CleanupScheduler, DebounceTimer};
pub use code::{
    CodeDiff, CodeDiffRequest, CodeEditText, CodeGroup, CodeInsert, CodeMove, CodeRemove,
    CodeStyle,
};
pub use code_writer::{CodeWriter, CodeWriterServices};
pub use config::CodeWriterConfig;
pub use errors::{CodeWriteError, CodeWriteResult};
pub use events::{CycleOutcome, CycleReport, EventHub, SettledEvent, WriteEvent};
pub use write_queue::{SchedulerState, WritePipeline, WriteScheduler};
