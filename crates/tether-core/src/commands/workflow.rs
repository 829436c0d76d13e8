//! Execute a workflow on an existing deployment.

use tracing::info;

use crate::error::Result;
use crate::execution::{ExecutionRecord, ExecutionRunner, FollowOptions};
use crate::inputs::parse_map_str;

#[derive(Debug, Clone)]
pub struct ExecuteWorkflowOptions {
    pub deployment_id: String,
    pub workflow_id: String,
    /// Workflow parameters as YAML or JSON text
    pub parameters: Option<String>,
    pub wait_for_completion: bool,
    pub print_logs: bool,
    pub debug_output: bool,
}

impl ExecuteWorkflowOptions {
    pub fn new(deployment_id: impl Into<String>, workflow_id: impl Into<String>) -> Self {
        Self {
            deployment_id: deployment_id.into(),
            workflow_id: workflow_id.into(),
            parameters: None,
            wait_for_completion: true,
            print_logs: true,
            debug_output: false,
        }
    }

    pub fn with_parameters(mut self, parameters: impl Into<String>) -> Self {
        self.parameters = Some(parameters.into());
        self
    }

    pub fn with_wait(mut self, wait: bool) -> Self {
        self.wait_for_completion = wait;
        self
    }

    pub fn with_print_logs(mut self, print_logs: bool) -> Self {
        self.print_logs = print_logs;
        self
    }

    pub fn with_debug_output(mut self, debug: bool) -> Self {
        self.debug_output = debug;
        self
    }
}

/// Start the workflow. Printing logs implies waiting; when waiting, a
/// non-successful end is an error.
pub fn execute_workflow(
    runner: &ExecutionRunner<'_>,
    options: &ExecuteWorkflowOptions,
) -> Result<ExecutionRecord> {
    let parameters = parse_map_str(options.parameters.as_deref().unwrap_or_default())?;
    let record = runner.start(&options.deployment_id, &options.workflow_id, &parameters)?;

    if !(options.wait_for_completion || options.print_logs) {
        return Ok(record);
    }

    info!(execution_id = %record.id, "waiting for execution to end");
    let record = runner.follow(
        record,
        FollowOptions {
            emit_logs: options.print_logs,
            debug_output: options.debug_output,
        },
    )?;
    ExecutionRunner::validate(&record, "Execution did not end successfully")?;
    info!(execution_id = %record.id, "execution ended successfully");
    Ok(record)
}
