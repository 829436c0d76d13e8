//! Symmetric teardown of what a provisioning call created.

use serde_json::Value;
use tracing::{error, info, warn};

use crate::environment::TeardownPlan;
use crate::error::{OrchestrationError, Result, TeardownStep, TeardownStepFailure};
use crate::execution::{ExecutionRunner, FollowOptions, UNINSTALL_WORKFLOW};
use crate::remote::ValueMap;

/// What a disposal actually did.
#[derive(Debug, Default)]
pub struct DisposalReport {
    pub uninstalled: bool,
    pub deployment_deleted: bool,
    pub blueprint_deleted: bool,
    /// Failures logged and ignored because the plan allowed it.
    pub tolerated: Vec<TeardownStepFailure>,
}

#[derive(Debug, Clone)]
pub struct EnvironmentDisposer<'a> {
    runner: ExecutionRunner<'a>,
    debug_output: bool,
}

impl<'a> EnvironmentDisposer<'a> {
    /// The disposer polls with a detached copy of `runner`, so cancelling the
    /// caller's token does not cut the uninstall short.
    pub fn new(runner: &ExecutionRunner<'a>) -> Self {
        Self {
            runner: runner.detached(),
            debug_output: false,
        }
    }

    pub fn with_debug_output(mut self, debug: bool) -> Self {
        self.debug_output = debug;
        self
    }

    /// Uninstall and delete the deployment, then delete the owned blueprint.
    ///
    /// Every step is attempted regardless of earlier failures. With
    /// `ignore_failure` the failures are logged and returned in the report;
    /// otherwise they are returned together as
    /// [`OrchestrationError::TeardownFailed`].
    pub fn dispose(&self, plan: TeardownPlan) -> Result<DisposalReport> {
        let mut report = DisposalReport::default();
        let mut failures = Vec::new();
        let client = self.runner.client();

        if let Some(deployment_id) = plan.deployment_id() {
            if let Some(handle) = plan.deployment() {
                info!(
                    deployment_id,
                    blueprint_id = %handle.blueprint.id,
                    created_at = %handle.created_at,
                    "tearing down deployment created by this run"
                );
            }

            match self.uninstall(deployment_id, plan.ignore_failure()) {
                Ok(true) => report.uninstalled = true,
                Ok(false) => {
                    info!(deployment_id, "deployment already gone, nothing to uninstall");
                }
                Err(err) => failures.push(TeardownStepFailure {
                    step: TeardownStep::Uninstall,
                    error: err,
                }),
            }

            info!(deployment_id, "deleting deployment");
            match client.delete_deployment(deployment_id) {
                Ok(()) => report.deployment_deleted = true,
                Err(err) if err.is_not_found() => {
                    info!(deployment_id, "deployment already deleted");
                    report.deployment_deleted = true;
                }
                Err(err) => failures.push(TeardownStepFailure {
                    step: TeardownStep::DeleteDeployment,
                    error: OrchestrationError::remote(
                        format!("delete deployment '{deployment_id}'"),
                        err,
                    ),
                }),
            }
        }

        if let Some(blueprint) = plan.blueprint().filter(|b| b.owned) {
            let blueprint_id = blueprint.id.as_str();
            info!(blueprint_id, "deleting blueprint");
            match client.delete_blueprint(blueprint_id) {
                Ok(()) => report.blueprint_deleted = true,
                Err(err) if err.is_not_found() => {
                    info!(blueprint_id, "blueprint already deleted");
                    report.blueprint_deleted = true;
                }
                Err(err) => failures.push(TeardownStepFailure {
                    step: TeardownStep::DeleteBlueprint,
                    error: OrchestrationError::remote(
                        format!("delete blueprint '{blueprint_id}'"),
                        err,
                    ),
                }),
            }
        }

        if failures.is_empty() {
            return Ok(report);
        }

        if plan.ignore_failure() {
            for failure in &failures {
                warn!(step = %failure.step, error = %failure.error, "ignoring teardown failure");
            }
            report.tolerated = failures;
            return Ok(report);
        }

        for failure in &failures {
            error!(step = %failure.step, error = %failure.error, "teardown step failed");
        }
        Err(OrchestrationError::TeardownFailed { failures })
    }

    /// Run the uninstall workflow. `Ok(false)` means the manager no longer
    /// knows the deployment; a missing execution while following is a failure.
    fn uninstall(&self, deployment_id: &str, ignore_failure: bool) -> Result<bool> {
        info!(deployment_id, "executing the '{UNINSTALL_WORKFLOW}' workflow");
        let mut parameters = ValueMap::new();
        parameters.insert("ignore_failure".to_string(), Value::Bool(ignore_failure));

        let record = match self.runner.start(deployment_id, UNINSTALL_WORKFLOW, &parameters) {
            Ok(record) => record,
            Err(OrchestrationError::Remote { source, .. }) if source.is_not_found() => {
                return Ok(false);
            }
            Err(err) => return Err(err),
        };
        let record = self.runner.follow(
            record,
            FollowOptions {
                emit_logs: true,
                debug_output: self.debug_output,
            },
        )?;
        ExecutionRunner::validate(
            &record,
            &format!("workflow '{UNINSTALL_WORKFLOW}' did not end successfully"),
        )?;
        Ok(true)
    }
}
