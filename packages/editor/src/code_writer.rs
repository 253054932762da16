//! # Code Writer
//!
//! Entry point tying the schedulers together. Callers fire actions with
//! [`CodeWriter::write`] and observe results through [`CodeWriter::subscribe`].

use crate::actions::Action;
use crate::anchor::AnchorIndex;
use crate::boundary::{DiffRequester, KeyCleaner, SourceNavigator, WriteApplier};
use crate::cleanup::CleanupScheduler;
use crate::config::CodeWriterConfig;
use crate::errors::{CodeWriteError, CodeWriteResult};
use crate::events::{EventHub, WriteEvent};
use crate::write_queue::{SchedulerState, WritePipeline, WriteScheduler};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::error;

/// External collaborators of the code writer
#[derive(Clone)]
pub struct CodeWriterServices {
    pub anchors: Arc<dyn AnchorIndex>,
    pub differ: Arc<dyn DiffRequester>,
    pub writer: Arc<dyn WriteApplier>,
    pub cleaner: Arc<dyn KeyCleaner>,
    pub navigator: Option<Arc<dyn SourceNavigator>>,
}

pub struct CodeWriter {
    anchors: Arc<dyn AnchorIndex>,
    navigator: Option<Arc<dyn SourceNavigator>>,
    events: EventHub,
    writes: WriteScheduler,
    cleanup: CleanupScheduler,
}

impl CodeWriter {
    /// Start the write and cleanup workers on the current tokio runtime
    pub fn spawn(config: &CodeWriterConfig, services: CodeWriterServices) -> Self {
        let events = EventHub::new(config.event_capacity);
        let cleanup =
            CleanupScheduler::spawn(config.cleanup_debounce(), services.cleaner, events.clone());

        let pipeline = WritePipeline {
            anchors: services.anchors.clone(),
            differ: services.differ,
            writer: services.writer,
            cleanup: cleanup.handle(),
            events: events.clone(),
            settle_delay: config.settle_delay(),
        };
        let writes = WriteScheduler::spawn(pipeline, config.cooldown());

        Self {
            anchors: services.anchors,
            navigator: services.navigator,
            events,
            writes,
            cleanup,
        }
    }

    /// Queue an action to be written to source
    pub fn write(&self, action: Action) -> CodeWriteResult<()> {
        self.writes.submit(action)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<WriteEvent> {
        self.events.subscribe()
    }

    pub fn state(&self) -> SchedulerState {
        self.writes.state()
    }

    pub fn pending(&self) -> usize {
        self.writes.pending()
    }

    pub async fn wait_idle(&self) -> CodeWriteResult<()> {
        self.writes.wait_idle().await
    }

    /// Reveal the source behind `selector` in the host's editor
    pub async fn view_source(&self, selector: &str) -> CodeWriteResult<()> {
        let navigator = self.navigator()?;
        let Some(anchor) = self.anchors.resolve(selector).await else {
            error!(selector, "No anchor found.");
            return Ok(());
        };
        navigator.open_source(&anchor).await
    }

    /// Source text behind `selector`, if it resolves
    pub async fn code_block(&self, selector: &str) -> CodeWriteResult<Option<String>> {
        let navigator = self.navigator()?;
        let Some(anchor) = self.anchors.resolve(selector).await else {
            error!(selector, "No anchor found.");
            return Ok(None);
        };
        navigator.code_block(&anchor).await
    }

    fn navigator(&self) -> CodeWriteResult<&Arc<dyn SourceNavigator>> {
        self.navigator
            .as_ref()
            .ok_or_else(|| CodeWriteError::Navigation("no source navigator configured".to_string()))
    }

    /// Finish queued writes, flush pending cleanup, and stop both workers
    pub async fn shutdown(self) {
        self.writes.shutdown().await;
        self.cleanup.shutdown().await;
    }
}
