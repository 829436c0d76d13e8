//! Destinations for execution progress events.

use std::sync::Mutex;

use tracing::{debug, error, info, warn};

use crate::remote::{EventLevel, ExecutionEvent};

pub trait ProgressSink: Send + Sync {
    fn emit(&self, execution_id: &str, event: &ExecutionEvent);
}

/// Forwards events to `tracing` at the event's level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl ProgressSink for TracingSink {
    fn emit(&self, execution_id: &str, event: &ExecutionEvent) {
        match event.level {
            EventLevel::Debug => debug!(execution_id, cursor = event.cursor, "{event}"),
            EventLevel::Info => info!(execution_id, cursor = event.cursor, "{event}"),
            EventLevel::Warning => warn!(execution_id, cursor = event.cursor, "{event}"),
            EventLevel::Error => error!(execution_id, cursor = event.cursor, "{event}"),
        }
    }
}

/// Keeps every emitted event in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<ExecutionEvent>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ExecutionEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    pub fn cursors(&self) -> Vec<u64> {
        self.events().iter().map(|e| e.cursor).collect()
    }
}

impl ProgressSink for MemorySink {
    fn emit(&self, _execution_id: &str, event: &ExecutionEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}
