//! Tether Core Library
//!
//! Drives a remote orchestration manager's environment lifecycle from a build
//! pipeline: blueprint resolution and upload, input aggregation, deployment
//! creation, workflow execution and symmetric teardown.

pub mod blueprint;
pub mod commands;
pub mod config;
pub mod document;
pub mod environment;
pub mod error;
pub mod execution;
pub mod inputs;
pub mod remote;

/// Re-exports of commonly used types
pub mod prelude {
    // Errors
    pub use crate::error::{OrchestrationError, RemoteError, Result};

    // Remote manager
    pub use crate::remote::{
        Blueprint, Deployment, Execution, ExecutionEvent, ExecutionState, ManagerClient, Package,
        ValueMap,
    };

    // Blueprints
    pub use crate::blueprint::{BlueprintRef, BlueprintResolver, BlueprintSource};

    // Inputs
    pub use crate::document::OutputsDocument;
    pub use crate::inputs::{InputSources, Mapping, aggregate, transform};

    // Execution
    pub use crate::execution::{CancelToken, ExecutionRecord, ExecutionRunner, FollowOptions};

    // Environments
    pub use crate::environment::{
        EchoOptions, EnvironmentDisposer, EnvironmentProvisioner, EnvironmentResult,
        ProvisionRequest, TeardownPlan, with_environment,
    };

    // Configuration
    pub use crate::config::{ConfigStore, TetherConfig};
}
