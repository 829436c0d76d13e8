//! Standalone blueprint upload and deletion.

use std::path::PathBuf;

use tracing::info;

use crate::blueprint::{BlueprintSource, BlueprintUploadConfig};
use crate::error::{OrchestrationError, Result};
use crate::remote::{Blueprint, ManagerClient};

#[derive(Debug, Clone)]
pub struct UploadBlueprintOptions {
    pub blueprint_id: String,
    pub location: BlueprintUploadConfig,
    /// Base directory for relative archive/directory paths
    pub workspace: Option<PathBuf>,
}

impl UploadBlueprintOptions {
    pub fn new(blueprint_id: impl Into<String>, location: BlueprintUploadConfig) -> Self {
        Self {
            blueprint_id: blueprint_id.into(),
            location,
            workspace: None,
        }
    }

    pub fn with_workspace(mut self, workspace: impl Into<PathBuf>) -> Self {
        self.workspace = Some(workspace.into());
        self
    }
}

/// Upload unconditionally, exactly once, from the single configured location.
pub fn upload_blueprint(
    client: &dyn ManagerClient,
    options: &UploadBlueprintOptions,
) -> Result<Blueprint> {
    let mut source = BlueprintSource::from_config(&options.location)?;
    if let Some(workspace) = &options.workspace {
        source = source.rooted_at(workspace);
    }

    info!(blueprint_id = %options.blueprint_id, source = %source, "uploading blueprint");
    let blueprint = client
        .upload_blueprint(&options.blueprint_id, &source)
        .map_err(|source| OrchestrationError::BlueprintUploadFailed {
            blueprint_id: options.blueprint_id.clone(),
            source,
        })?;
    info!(blueprint_id = %blueprint.id, "blueprint uploaded successfully");
    Ok(blueprint)
}

#[derive(Debug, Clone)]
pub struct DeleteBlueprintOptions {
    pub blueprint_id: String,
}

impl DeleteBlueprintOptions {
    pub fn new(blueprint_id: impl Into<String>) -> Self {
        Self {
            blueprint_id: blueprint_id.into(),
        }
    }
}

pub fn delete_blueprint(client: &dyn ManagerClient, options: &DeleteBlueprintOptions) -> Result<()> {
    info!(blueprint_id = %options.blueprint_id, "deleting blueprint");
    client.delete_blueprint(&options.blueprint_id).map_err(|err| {
        OrchestrationError::remote(format!("delete blueprint '{}'", options.blueprint_id), err)
    })
}
