//! Cursor-based execution follower.
//!
//! One [`ExecutionFollower::poll`] call reads the execution state, emits the
//! events recorded since the last seen cursor and advances that cursor. No
//! timing lives here; the runner decides when to poll again.

use crate::error::{OrchestrationError, Result};
use crate::execution::ExecutionRecord;
use crate::execution::sink::ProgressSink;
use crate::remote::{EventLevel, ManagerClient};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollStatus {
    Running,
    Terminal,
}

#[derive(Debug)]
pub struct ExecutionFollower {
    record: ExecutionRecord,
    emit_logs: bool,
    min_level: EventLevel,
}

impl ExecutionFollower {
    pub fn new(record: ExecutionRecord, emit_logs: bool, debug_output: bool) -> Self {
        Self {
            record,
            emit_logs,
            min_level: if debug_output {
                EventLevel::Debug
            } else {
                EventLevel::Info
            },
        }
    }

    pub fn record(&self) -> &ExecutionRecord {
        &self.record
    }

    pub fn into_record(self) -> ExecutionRecord {
        self.record
    }

    pub fn poll(&mut self, client: &dyn ManagerClient, sink: &dyn ProgressSink) -> Result<PollStatus> {
        // Already terminal: only the events recorded after the last seen
        // cursor are left to report.
        if self.record.state.is_terminal() {
            if self.emit_logs {
                self.drain_events(client, sink)?;
            }
            return Ok(PollStatus::Terminal);
        }

        let execution = client.get_execution(&self.record.id).map_err(|err| {
            OrchestrationError::remote(format!("get execution {}", self.record.id), err)
        })?;

        // Events are drained after reading the state so that everything the
        // manager recorded before a terminal state is emitted before returning.
        if self.emit_logs {
            self.drain_events(client, sink)?;
        }

        self.record.state = execution.state;
        self.record.error = execution.error;

        Ok(if self.record.state.is_terminal() {
            PollStatus::Terminal
        } else {
            PollStatus::Running
        })
    }

    fn drain_events(&mut self, client: &dyn ManagerClient, sink: &dyn ProgressSink) -> Result<()> {
        let mut events = client
            .list_execution_events(&self.record.id, self.record.cursor)
            .map_err(|err| {
                OrchestrationError::remote(
                    format!("list events of execution {}", self.record.id),
                    err,
                )
            })?;
        events.sort_by_key(|e| e.cursor);

        for event in events {
            if self.record.cursor.is_some_and(|seen| event.cursor <= seen) {
                continue;
            }
            if event.level >= self.min_level {
                sink.emit(&self.record.id, &event);
            }
            self.record.cursor = Some(event.cursor);
        }
        Ok(())
    }
}
