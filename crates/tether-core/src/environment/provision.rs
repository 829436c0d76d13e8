//! Standing up an environment: blueprint, inputs, deployment, install.

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use tracing::info;

use crate::blueprint::{BlueprintRef, BlueprintResolver, BlueprintSource};
use crate::environment::{DeploymentHandle, EnvironmentResult, TeardownPlan};
use crate::error::{OrchestrationError, Result};
use crate::execution::{ExecutionRunner, FollowOptions, INSTALL_WORKFLOW};
use crate::inputs::{self, InputSources};
use crate::remote::ValueMap;

/// Predicate deciding whether an input key's value must not be printed.
pub type MaskFn = Arc<dyn Fn(&str) -> bool + Send + Sync>;

/// What the provisioner echoes to the build log.
#[derive(Clone, Default)]
pub struct EchoOptions {
    pub echo_inputs: bool,
    pub echo_env_data: bool,
    pub debug_output: bool,
    pub mask: Option<MaskFn>,
}

impl EchoOptions {
    pub fn with_echo_inputs(mut self, echo: bool) -> Self {
        self.echo_inputs = echo;
        self
    }

    pub fn with_echo_env_data(mut self, echo: bool) -> Self {
        self.echo_env_data = echo;
        self
    }

    pub fn with_debug_output(mut self, debug: bool) -> Self {
        self.debug_output = debug;
        self
    }

    pub fn with_mask(mut self, mask: MaskFn) -> Self {
        self.mask = Some(mask);
        self
    }

    /// Mask the given keys exactly.
    pub fn with_masked_keys<I, S>(self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let keys: BTreeSet<String> = keys.into_iter().map(|k| k.into()).collect();
        if keys.is_empty() {
            return self;
        }
        self.with_mask(Arc::new(move |key: &str| keys.contains(key)))
    }

    fn is_masked(&self, key: &str) -> bool {
        self.mask.as_ref().is_some_and(|mask| mask(key))
    }
}

impl std::fmt::Debug for EchoOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EchoOptions")
            .field("echo_inputs", &self.echo_inputs)
            .field("echo_env_data", &self.echo_env_data)
            .field("debug_output", &self.debug_output)
            .field("mask", &self.mask.is_some())
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct ProvisionRequest {
    pub blueprint_id: String,
    /// Upload source used when the blueprint does not exist yet. Without one
    /// the blueprint must already exist on the manager.
    pub blueprint_source: Option<BlueprintSource>,
    pub deployment_id: String,
    pub inputs: InputSources,
    /// Where to persist the `{outputs, capabilities}` document.
    pub outputs_path: Option<PathBuf>,
    pub echo: EchoOptions,
}

impl ProvisionRequest {
    pub fn new(blueprint_id: impl Into<String>, deployment_id: impl Into<String>) -> Self {
        Self {
            blueprint_id: blueprint_id.into(),
            blueprint_source: None,
            deployment_id: deployment_id.into(),
            inputs: InputSources::default(),
            outputs_path: None,
            echo: EchoOptions::default(),
        }
    }

    pub fn with_source(mut self, source: BlueprintSource) -> Self {
        self.blueprint_source = Some(source);
        self
    }

    pub fn with_inputs(mut self, inputs: InputSources) -> Self {
        self.inputs = inputs;
        self
    }

    pub fn with_outputs_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.outputs_path = Some(path.into());
        self
    }

    pub fn with_echo(mut self, echo: EchoOptions) -> Self {
        self.echo = echo;
        self
    }
}

#[derive(Debug, Clone)]
pub struct EnvironmentProvisioner<'a> {
    runner: ExecutionRunner<'a>,
    required_packages: BTreeSet<String>,
}

impl<'a> EnvironmentProvisioner<'a> {
    pub fn new(runner: ExecutionRunner<'a>) -> Self {
        Self {
            runner,
            required_packages: BTreeSet::new(),
        }
    }

    pub fn with_required_packages<I, S>(mut self, packages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for package in packages {
            self.required_packages.insert(package.into());
        }
        self
    }

    pub fn runner(&self) -> &ExecutionRunner<'a> {
        &self.runner
    }

    /// Provision an environment, recording every created resource in `plan`.
    ///
    /// `plan` is filled even when this returns an error; hand it to
    /// [`EnvironmentDisposer::dispose`](crate::environment::EnvironmentDisposer::dispose)
    /// either way.
    pub fn provision(
        &self,
        request: &ProvisionRequest,
        plan: &mut TeardownPlan,
    ) -> Result<EnvironmentResult> {
        let blueprint = self.resolve_blueprint(request)?;
        plan.track_blueprint(blueprint.clone());

        let inputs = request.inputs.aggregate()?;
        if request.echo.echo_inputs {
            let shown = inputs::masked(&inputs, &|key| request.echo.is_masked(key));
            info!(
                deployment_id = %request.deployment_id,
                "deployment inputs: {}",
                serde_json::Value::Object(shown)
            );
        }

        self.create_and_install(request, &blueprint, inputs.clone(), plan)
            .map_err(|source| OrchestrationError::EnvironmentCreationFailed {
                deployment_id: request.deployment_id.clone(),
                source: Box::new(source),
            })?;

        info!(deployment_id = %request.deployment_id, "retrieving outputs and capabilities");
        let client = self.runner.client();
        let outputs = client.get_outputs(&request.deployment_id).map_err(|err| {
            OrchestrationError::remote(
                format!("get outputs of deployment '{}'", request.deployment_id),
                err,
            )
        })?;
        let capabilities = client
            .get_capabilities(&request.deployment_id)
            .map_err(|err| {
                OrchestrationError::remote(
                    format!("get capabilities of deployment '{}'", request.deployment_id),
                    err,
                )
            })?;

        let result = EnvironmentResult {
            blueprint_id: blueprint.id,
            deployment_id: request.deployment_id.clone(),
            inputs,
            outputs,
            capabilities,
        };

        if request.echo.echo_env_data {
            let document = serde_json::to_value(result.outputs_document()).unwrap_or_default();
            info!(deployment_id = %result.deployment_id, "environment data: {document}");
        }

        if let Some(path) = &request.outputs_path {
            result.outputs_document().save(path)?;
        }

        Ok(result)
    }

    fn resolve_blueprint(&self, request: &ProvisionRequest) -> Result<BlueprintRef> {
        let client = self.runner.client();
        match &request.blueprint_source {
            Some(source) => {
                let resolution = BlueprintResolver::new(client)
                    .with_required_packages(self.required_packages.iter().cloned())
                    .resolve(&request.blueprint_id, source)?;
                Ok(resolution.blueprint)
            }
            None => {
                info!(blueprint_id = %request.blueprint_id, "retrieving blueprint");
                let existing = client.get_blueprint(&request.blueprint_id).map_err(|err| {
                    OrchestrationError::remote(
                        format!("retrieve blueprint '{}'", request.blueprint_id),
                        err,
                    )
                })?;
                Ok(BlueprintRef {
                    id: existing.id,
                    owned: false,
                })
            }
        }
    }

    fn create_and_install(
        &self,
        request: &ProvisionRequest,
        blueprint: &BlueprintRef,
        inputs: ValueMap,
        plan: &mut TeardownPlan,
    ) -> Result<()> {
        info!(
            deployment_id = %request.deployment_id,
            blueprint_id = %blueprint.id,
            "creating deployment"
        );
        let deployment = self
            .runner
            .client()
            .create_deployment(&blueprint.id, &request.deployment_id, &inputs)
            .map_err(|err| {
                OrchestrationError::remote(
                    format!("create deployment '{}'", request.deployment_id),
                    err,
                )
            })?;

        plan.track_deployment(DeploymentHandle {
            id: deployment.id.clone(),
            blueprint: blueprint.clone(),
            inputs,
            created_at: Utc::now(),
        });

        info!(deployment_id = %deployment.id, "executing the '{INSTALL_WORKFLOW}' workflow");
        self.runner.run(
            &deployment.id,
            INSTALL_WORKFLOW,
            &ValueMap::new(),
            FollowOptions {
                emit_logs: true,
                debug_output: request.echo.debug_output,
            },
        )?;
        Ok(())
    }
}
