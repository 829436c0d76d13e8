//! Create and delete environments as individual build steps.

use std::collections::BTreeSet;
use std::path::PathBuf;

use tracing::info;

use crate::blueprint::{BlueprintSource, BlueprintUploadConfig};
use crate::config::TetherConfig;
use crate::document::{read_json, write_json};
use crate::environment::{
    DisposalReport, EchoOptions, EnvironmentDisposer, EnvironmentProvisioner, EnvironmentResult,
    ProvisionRequest, TeardownPlan,
};
use crate::error::Result;
use crate::execution::ExecutionRunner;
use crate::inputs::InputSources;

#[derive(Debug, Clone)]
pub struct CreateEnvironmentOptions {
    pub blueprint_id: String,
    /// Deployment id; the blueprint id is used when blank
    pub deployment_id: Option<String>,
    /// Upload location used if the blueprint does not exist yet
    pub location: Option<BlueprintUploadConfig>,
    pub workspace: Option<PathBuf>,
    pub inputs: InputSources,
    pub required_packages: BTreeSet<String>,
    /// `{outputs, capabilities}` document destination
    pub outputs_path: Option<PathBuf>,
    /// Full environment description destination, readable by `delete_environment`
    pub env_data_path: Option<PathBuf>,
    pub echo: EchoOptions,
    pub ignore_failure_on_teardown: bool,
}

impl CreateEnvironmentOptions {
    pub fn new(blueprint_id: impl Into<String>) -> Self {
        Self {
            blueprint_id: blueprint_id.into(),
            deployment_id: None,
            location: None,
            workspace: None,
            inputs: InputSources::default(),
            required_packages: BTreeSet::new(),
            outputs_path: None,
            env_data_path: None,
            echo: EchoOptions::default(),
            ignore_failure_on_teardown: false,
        }
    }

    pub fn with_deployment_id(mut self, deployment_id: impl Into<String>) -> Self {
        self.deployment_id = Some(deployment_id.into());
        self
    }

    pub fn with_location(mut self, location: BlueprintUploadConfig) -> Self {
        self.location = Some(location);
        self
    }

    pub fn with_workspace(mut self, workspace: impl Into<PathBuf>) -> Self {
        self.workspace = Some(workspace.into());
        self
    }

    pub fn with_inputs(mut self, inputs: InputSources) -> Self {
        self.inputs = inputs;
        self
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

    pub fn with_outputs_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.outputs_path = Some(path.into());
        self
    }

    pub fn with_env_data_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.env_data_path = Some(path.into());
        self
    }

    pub fn with_echo(mut self, echo: EchoOptions) -> Self {
        self.echo = echo;
        self
    }

    pub fn with_ignore_failure_on_teardown(mut self, ignore: bool) -> Self {
        self.ignore_failure_on_teardown = ignore;
        self
    }

    /// Apply the `[inputs]`, `[teardown]` and `[blueprint]` settings.
    pub fn with_config(self, config: &TetherConfig) -> Self {
        self.with_echo(config.echo_options())
            .with_ignore_failure_on_teardown(config.teardown.ignore_failure)
            .with_required_packages(config.blueprint.required_packages.iter().cloned())
    }

    fn effective_deployment_id(&self) -> String {
        self.deployment_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .unwrap_or(self.blueprint_id.as_str())
            .to_string()
    }

    fn to_request(&self) -> Result<ProvisionRequest> {
        let mut request = ProvisionRequest::new(&self.blueprint_id, self.effective_deployment_id())
            .with_inputs(self.inputs.clone())
            .with_echo(self.echo.clone());

        if let Some(location) = &self.location {
            let mut source = BlueprintSource::from_config(location)?;
            if let Some(workspace) = &self.workspace {
                source = source.rooted_at(workspace);
            }
            request = request.with_source(source);
        }
        if let Some(path) = &self.outputs_path {
            request = request.with_outputs_path(path);
        }
        Ok(request)
    }
}

/// Provision an environment and hand back its teardown plan.
///
/// The plan is returned on failure too (second tuple element), describing
/// whatever was created before the failure.
pub fn create_environment(
    runner: &ExecutionRunner<'_>,
    options: &CreateEnvironmentOptions,
) -> (Result<EnvironmentResult>, TeardownPlan) {
    let mut plan = TeardownPlan::new(options.ignore_failure_on_teardown);

    let request = match options.to_request() {
        Ok(request) => request,
        Err(err) => return (Err(err), plan),
    };

    let provisioner = EnvironmentProvisioner::new(runner.clone())
        .with_required_packages(options.required_packages.iter().cloned());
    let result = provisioner.provision(&request, &mut plan).and_then(|env| {
        if let Some(path) = &options.env_data_path {
            info!(path = %path.display(), "writing environment description");
            write_json(&env, path)?;
        }
        Ok(env)
    });

    (result, plan)
}

#[derive(Debug, Clone)]
pub struct DeleteEnvironmentOptions {
    /// Environment description written by `create_environment`
    pub env_data_path: PathBuf,
    pub ignore_failure: bool,
    pub debug_output: bool,
}

impl DeleteEnvironmentOptions {
    pub fn new(env_data_path: impl Into<PathBuf>) -> Self {
        Self {
            env_data_path: env_data_path.into(),
            ignore_failure: false,
            debug_output: false,
        }
    }

    pub fn with_ignore_failure(mut self, ignore: bool) -> Self {
        self.ignore_failure = ignore;
        self
    }

    pub fn with_debug_output(mut self, debug: bool) -> Self {
        self.debug_output = debug;
        self
    }
}

/// Uninstall and delete a deployment described by an environment file. The
/// blueprint is left alone; it may be shared with other environments.
pub fn delete_environment(
    runner: &ExecutionRunner<'_>,
    options: &DeleteEnvironmentOptions,
) -> Result<DisposalReport> {
    let env: EnvironmentResult = read_json(&options.env_data_path)?;
    info!(deployment_id = %env.deployment_id, "deleting environment");

    let plan = TeardownPlan::for_deployment(env.deployment_id, options.ignore_failure);
    EnvironmentDisposer::new(runner)
        .with_debug_output(options.debug_output)
        .dispose(plan)
}
