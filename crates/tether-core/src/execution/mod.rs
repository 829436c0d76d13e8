//! Workflow execution: start, follow to completion, validate.

pub mod follower;
pub mod poll;
pub mod sink;

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::ExecutionSettings;
use crate::error::{OrchestrationError, Result};
use crate::remote::{Execution, ExecutionState, ManagerClient, ValueMap};

pub use follower::{ExecutionFollower, PollStatus};
pub use poll::{CancelToken, DEFAULT_POLL_INTERVAL, ImmediateTrigger, PollTrigger, SleepTrigger};
pub use sink::{MemorySink, ProgressSink, TracingSink};

pub const INSTALL_WORKFLOW: &str = "install";
pub const UNINSTALL_WORKFLOW: &str = "uninstall";

/// Local view of a remote workflow execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionRecord {
    pub id: String,
    pub workflow_id: String,
    pub deployment_id: String,
    pub state: ExecutionState,
    /// Cursor of the last progress event already seen.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cursor: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<Execution> for ExecutionRecord {
    fn from(execution: Execution) -> Self {
        Self {
            id: execution.id,
            workflow_id: execution.workflow_id,
            deployment_id: execution.deployment_id,
            state: execution.state,
            cursor: None,
            error: execution.error,
        }
    }
}

impl ExecutionRecord {
    pub fn succeeded(&self) -> bool {
        self.state == ExecutionState::Succeeded
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FollowOptions {
    pub emit_logs: bool,
    pub debug_output: bool,
}

impl Default for FollowOptions {
    fn default() -> Self {
        Self {
            emit_logs: true,
            debug_output: false,
        }
    }
}

/// Starts workflow executions and blocks on them in a bounded poll loop.
#[derive(Clone)]
pub struct ExecutionRunner<'a> {
    client: &'a dyn ManagerClient,
    poll_interval: Duration,
    trigger: Arc<dyn PollTrigger>,
    sink: Arc<dyn ProgressSink>,
    cancel: CancelToken,
}

impl<'a> ExecutionRunner<'a> {
    pub fn new(client: &'a dyn ManagerClient) -> Self {
        Self {
            client,
            poll_interval: DEFAULT_POLL_INTERVAL,
            trigger: Arc::new(SleepTrigger),
            sink: Arc::new(TracingSink),
            cancel: CancelToken::new(),
        }
    }

    /// Use the `[execution]` poll interval.
    pub fn with_settings(self, settings: &ExecutionSettings) -> Self {
        self.with_poll_interval(settings.poll_interval())
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_trigger(mut self, trigger: Arc<dyn PollTrigger>) -> Self {
        self.trigger = trigger;
        self
    }

    pub fn with_sink(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn client(&self) -> &'a dyn ManagerClient {
        self.client
    }

    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    /// A copy of this runner with its own, fresh cancellation token.
    ///
    /// Teardown uses it so that cancelling the wrapped unit of work does not
    /// also interrupt the uninstall that cleans up after it.
    pub fn detached(&self) -> Self {
        Self {
            cancel: CancelToken::new(),
            ..self.clone()
        }
    }

    pub fn start(
        &self,
        deployment_id: &str,
        workflow_id: &str,
        parameters: &ValueMap,
    ) -> Result<ExecutionRecord> {
        let execution = self
            .client
            .start_execution(deployment_id, workflow_id, parameters)
            .map_err(|err| {
                OrchestrationError::remote(
                    format!("start workflow '{workflow_id}' on deployment '{deployment_id}'"),
                    err,
                )
            })?;
        info!(
            deployment_id,
            workflow_id,
            execution_id = %execution.id,
            "execution started"
        );
        Ok(execution.into())
    }

    /// Poll until the execution reaches a terminal state.
    ///
    /// Returns [`OrchestrationError::Interrupted`] as soon as the cancel token
    /// fires, checked before every poll and while waiting.
    pub fn follow(&self, record: ExecutionRecord, options: FollowOptions) -> Result<ExecutionRecord> {
        let execution_id = record.id.clone();
        let mut follower = ExecutionFollower::new(record, options.emit_logs, options.debug_output);

        loop {
            if self.cancel.is_cancelled() {
                return Err(OrchestrationError::Interrupted { execution_id });
            }
            if follower.poll(self.client, self.sink.as_ref())? == PollStatus::Terminal {
                let record = follower.into_record();
                info!(execution_id = %record.id, state = %record.state, "execution ended");
                return Ok(record);
            }
            debug!(execution_id = %execution_id, state = %follower.record().state, "execution still running");
            if !self.trigger.wait(self.poll_interval, &self.cancel) {
                return Err(OrchestrationError::Interrupted { execution_id });
            }
        }
    }

    /// Fail unless the execution ended successfully.
    pub fn validate(record: &ExecutionRecord, failure_message: &str) -> Result<()> {
        if record.succeeded() {
            return Ok(());
        }
        Err(OrchestrationError::WorkflowExecutionFailed {
            message: failure_message.to_string(),
            record: Box::new(record.clone()),
        })
    }

    /// Start, follow and validate in one go.
    pub fn run(
        &self,
        deployment_id: &str,
        workflow_id: &str,
        parameters: &ValueMap,
        options: FollowOptions,
    ) -> Result<ExecutionRecord> {
        let record = self.start(deployment_id, workflow_id, parameters)?;
        let record = self.follow(record, options)?;
        Self::validate(
            &record,
            &format!("workflow '{workflow_id}' did not end successfully"),
        )?;
        Ok(record)
    }
}

impl std::fmt::Debug for ExecutionRunner<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionRunner")
            .field("poll_interval", &self.poll_interval)
            .field("cancelled", &self.cancel.is_cancelled())
            .finish_non_exhaustive()
    }
}
