//! Pipeline build steps.
//!
//! Each step takes an options struct built with `with_*` setters and runs one
//! self-contained operation against the manager. These are what a pipeline
//! front-end calls.

pub mod blueprint;
pub mod environment;
pub mod plugin;
pub mod transform;
pub mod workflow;

pub use blueprint::{DeleteBlueprintOptions, UploadBlueprintOptions, delete_blueprint, upload_blueprint};
pub use environment::{
    CreateEnvironmentOptions, DeleteEnvironmentOptions, create_environment, delete_environment,
};
pub use plugin::{UploadPluginOptions, upload_plugin};
pub use transform::{OutputsToInputsOptions, outputs_to_inputs};
pub use workflow::{ExecuteWorkflowOptions, execute_workflow};
