//! Environment lifecycle: provision, dispose, and the scope that ties them.

pub mod dispose;
pub mod provision;
pub mod scope;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::blueprint::BlueprintRef;
use crate::document::OutputsDocument;
use crate::remote::ValueMap;

pub use dispose::{DisposalReport, EnvironmentDisposer};
pub use provision::{EchoOptions, EnvironmentProvisioner, ProvisionRequest};
pub use scope::with_environment;

/// A deployment created by this run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeploymentHandle {
    pub id: String,
    pub blueprint: BlueprintRef,
    pub inputs: ValueMap,
    pub created_at: DateTime<Utc>,
}

/// Everything a provisioning call produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentResult {
    pub blueprint_id: String,
    pub deployment_id: String,
    pub inputs: ValueMap,
    pub outputs: ValueMap,
    pub capabilities: ValueMap,
}

impl EnvironmentResult {
    pub fn outputs_document(&self) -> OutputsDocument {
        OutputsDocument::new(self.outputs.clone(), self.capabilities.clone())
    }
}

/// Deferred cleanup for one provisioning call.
///
/// The provisioner records each remote resource as soon as it exists, so a
/// plan filled by a failed call still describes what must be removed. The
/// disposer consumes the plan by value, and a plan cannot be copied, so each
/// plan is disposed at most once:
///
/// ```compile_fail
/// use tether_core::environment::TeardownPlan;
///
/// let plan = TeardownPlan::for_deployment("dep1", false);
/// let second = plan.clone();
/// ```
#[derive(Debug, Default)]
#[must_use = "a teardown plan must be handed to EnvironmentDisposer::dispose"]
pub struct TeardownPlan {
    deployment: Option<DeploymentHandle>,
    deployment_id: Option<String>,
    blueprint: Option<BlueprintRef>,
    ignore_failure: bool,
}

impl TeardownPlan {
    pub fn new(ignore_failure: bool) -> Self {
        Self {
            ignore_failure,
            ..Self::default()
        }
    }

    /// Plan for a deployment created elsewhere (e.g. by an earlier build step).
    pub fn for_deployment(deployment_id: impl Into<String>, ignore_failure: bool) -> Self {
        Self {
            deployment_id: Some(deployment_id.into()),
            ignore_failure,
            ..Self::default()
        }
    }

    /// Remember a blueprint. Only owned blueprints are ever deleted.
    pub fn track_blueprint(&mut self, blueprint: BlueprintRef) {
        if blueprint.owned {
            self.blueprint = Some(blueprint);
        }
    }

    pub fn track_deployment(&mut self, handle: DeploymentHandle) {
        self.deployment_id = Some(handle.id.clone());
        self.deployment = Some(handle);
    }

    pub fn with_blueprint(mut self, blueprint: BlueprintRef) -> Self {
        self.track_blueprint(blueprint);
        self
    }

    pub fn deployment_id(&self) -> Option<&str> {
        self.deployment_id.as_deref()
    }

    pub fn deployment(&self) -> Option<&DeploymentHandle> {
        self.deployment.as_ref()
    }

    pub fn blueprint(&self) -> Option<&BlueprintRef> {
        self.blueprint.as_ref()
    }

    pub fn ignore_failure(&self) -> bool {
        self.ignore_failure
    }

    pub fn is_empty(&self) -> bool {
        self.deployment_id.is_none() && self.blueprint.is_none()
    }
}
