//! Execution event system.
//!
//! Emits [`ExecutionEvent`]s via a [`tokio::sync::broadcast`] channel so that
//! a UI or CLI can render run progress without reaching into the executor.

use serde::{Deserialize, Serialize};

use stagecraft_types::LogEntry;

use crate::executor::RunOutcome;

/// Events emitted during a mock pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ExecutionEvent {
    RunStarted {
        run_id: String,
        pipeline_name: String,
        block_count: usize,
    },
    LogAppended {
        run_id: String,
        block_id: String,
        entry: LogEntry,
    },
    StageFinished {
        run_id: String,
        block_id: String,
        index: usize,
        success: bool,
        duration_ms: u64,
    },
    RunFinished {
        run_id: String,
        outcome: RunOutcome,
        duration_ms: u64,
    },
}

/// Event emitter wrapping a broadcast sender.
#[derive(Clone)]
pub struct EventEmitter {
    sender: tokio::sync::broadcast::Sender<ExecutionEvent>,
}

impl EventEmitter {
    /// Create a new emitter with the given channel capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = tokio::sync::broadcast::channel(capacity);
        Self { sender }
    }

    /// Emit an event to all current subscribers.
    ///
    /// If there are no active receivers the event is silently dropped.
    pub fn emit(&self, event: ExecutionEvent) {
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<ExecutionEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventEmitter {
    fn default() -> Self {
        Self::new(256)
    }
}
