//! Plugin (package) upload.

use std::path::{Path, PathBuf};

use tracing::info;

use crate::document::write_json;
use crate::error::{OrchestrationError, Result};
use crate::remote::{ManagerClient, Package};

#[derive(Debug, Clone)]
pub struct UploadPluginOptions {
    /// Wagon archive holding the plugin code
    pub wagon_path: PathBuf,
    /// Plugin YAML describing the package
    pub yaml_path: PathBuf,
    /// Base directory for relative paths
    pub workspace: Option<PathBuf>,
    /// Where to save the uploaded package's details
    pub output_path: Option<PathBuf>,
}

impl UploadPluginOptions {
    pub fn new(wagon_path: impl Into<PathBuf>, yaml_path: impl Into<PathBuf>) -> Self {
        Self {
            wagon_path: wagon_path.into(),
            yaml_path: yaml_path.into(),
            workspace: None,
            output_path: None,
        }
    }

    pub fn with_workspace(mut self, workspace: impl Into<PathBuf>) -> Self {
        self.workspace = Some(workspace.into());
        self
    }

    pub fn with_output_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_path = Some(path.into());
        self
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        match &self.workspace {
            Some(workspace) if path.is_relative() => workspace.join(path),
            _ => path.to_path_buf(),
        }
    }
}

/// Upload a plugin package and optionally write its details as JSON.
pub fn upload_plugin(client: &dyn ManagerClient, options: &UploadPluginOptions) -> Result<Package> {
    for (name, path) in [("wagon", &options.wagon_path), ("plugin YAML", &options.yaml_path)] {
        if path.as_os_str().is_empty() {
            return Err(OrchestrationError::InvalidInputFormat {
                message: format!("{name} location is required"),
            });
        }
    }

    let wagon = options.resolve(&options.wagon_path);
    let yaml = options.resolve(&options.yaml_path);
    info!(wagon = %wagon.display(), yaml = %yaml.display(), "uploading plugin");

    let package = client.upload_package(&wagon, &yaml).map_err(|err| {
        OrchestrationError::remote(format!("upload plugin '{}'", wagon.display()), err)
    })?;

    if let Some(output_path) = &options.output_path {
        let output_path = options.resolve(output_path);
        info!(path = %output_path.display(), "saving plugin information");
        write_json(&package, &output_path)?;
    }

    info!(
        package_id = %package.id,
        package_name = %package.package_name,
        package_version = %package.package_version,
        "plugin uploaded successfully"
    );
    Ok(package)
}
