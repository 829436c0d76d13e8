//! Blueprint resolution and idempotent upload.

use std::collections::BTreeSet;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use url::Url;

use crate::error::{OrchestrationError, Result};
use crate::remote::ManagerClient;

/// Main file name used when the configuration leaves it blank.
pub const DEFAULT_MAIN_FILE: &str = "blueprint.yaml";

/// Where a blueprint is uploaded from. Exactly one location kind per upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlueprintSource {
    Url { url: Url, main_file: String },
    LocalArchive { path: PathBuf, main_file: String },
    LocalDirectory { path: PathBuf, main_file: String },
}

impl BlueprintSource {
    /// Decide the upload strategy from the raw configuration fields.
    pub fn from_config(config: &BlueprintUploadConfig) -> Result<Self> {
        let url = non_blank(config.archive_url.as_deref());
        let archive = non_blank(config.archive_path.as_deref());
        let directory = non_blank(config.root_directory.as_deref());

        let provided = [url, archive, directory].iter().flatten().count();
        if provided != 1 {
            return Err(OrchestrationError::InvalidBlueprintSource {
                message: format!(
                    "exactly one of archive URL, archive path or root directory must be provided ({provided} given)"
                ),
            });
        }

        let main_file = non_blank(config.main_file.as_deref())
            .unwrap_or(DEFAULT_MAIN_FILE)
            .to_string();

        if let Some(raw) = url {
            let url = Url::parse(raw).map_err(|e| OrchestrationError::InvalidBlueprintSource {
                message: format!("invalid archive URL '{raw}': {e}"),
            })?;
            return Ok(Self::Url { url, main_file });
        }
        if let Some(path) = archive {
            return Ok(Self::LocalArchive {
                path: PathBuf::from(path),
                main_file,
            });
        }
        let path = directory.map(PathBuf::from).unwrap_or_default();
        Ok(Self::LocalDirectory { path, main_file })
    }

    pub fn main_file(&self) -> &str {
        match self {
            Self::Url { main_file, .. }
            | Self::LocalArchive { main_file, .. }
            | Self::LocalDirectory { main_file, .. } => main_file,
        }
    }

    /// Resolve relative local paths against a workspace directory.
    pub fn rooted_at(self, workspace: &std::path::Path) -> Self {
        match self {
            Self::LocalArchive { path, main_file } if path.is_relative() => Self::LocalArchive {
                path: workspace.join(path),
                main_file,
            },
            Self::LocalDirectory { path, main_file } if path.is_relative() => {
                Self::LocalDirectory {
                    path: workspace.join(path),
                    main_file,
                }
            }
            other => other,
        }
    }
}

impl std::fmt::Display for BlueprintSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Url { url, main_file } => write!(f, "{url} (main file {main_file})"),
            Self::LocalArchive { path, main_file } => {
                write!(f, "archive {} (main file {main_file})", path.display())
            }
            Self::LocalDirectory { path, main_file } => {
                write!(f, "directory {} (main file {main_file})", path.display())
            }
        }
    }
}

/// Raw, possibly-blank location fields as they appear in step configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlueprintUploadConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub archive_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub archive_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root_directory: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub main_file: Option<String>,
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// A resolved blueprint. `owned` means this run uploaded it and must delete it
/// on teardown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlueprintRef {
    pub id: String,
    pub owned: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub blueprint: BlueprintRef,
    pub already_existed: bool,
}

/// Resolves a blueprint id, uploading it at most once when it is absent.
pub struct BlueprintResolver<'a> {
    client: &'a dyn ManagerClient,
    required_packages: BTreeSet<String>,
}

impl<'a> BlueprintResolver<'a> {
    pub fn new(client: &'a dyn ManagerClient) -> Self {
        Self {
            client,
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

    pub fn resolve(&self, id: &str, source: &BlueprintSource) -> Result<Resolution> {
        match self.client.get_blueprint(id) {
            Ok(existing) => {
                info!(blueprint_id = %existing.id, "blueprint already exists");
                return Ok(Resolution {
                    blueprint: BlueprintRef {
                        id: existing.id,
                        owned: false,
                    },
                    already_existed: true,
                });
            }
            Err(err) if err.is_not_found() => {
                debug!(blueprint_id = %id, "blueprint not found, uploading");
            }
            Err(err) => {
                return Err(OrchestrationError::remote(
                    format!("look up blueprint '{id}'"),
                    err,
                ));
            }
        }

        self.check_prerequisites(id)?;

        info!(blueprint_id = %id, source = %source, "uploading blueprint");
        let uploaded = self.client.upload_blueprint(id, source).map_err(|source| {
            OrchestrationError::BlueprintUploadFailed {
                blueprint_id: id.to_string(),
                source,
            }
        })?;
        info!(blueprint_id = %uploaded.id, "blueprint uploaded");

        Ok(Resolution {
            blueprint: BlueprintRef {
                id: uploaded.id,
                owned: true,
            },
            already_existed: false,
        })
    }

    fn check_prerequisites(&self, id: &str) -> Result<()> {
        if self.required_packages.is_empty() {
            return Ok(());
        }

        let installed = self.client.list_installed_packages().map_err(|err| {
            OrchestrationError::remote("list installed packages", err)
        })?;
        let missing: Vec<String> = self
            .required_packages
            .difference(&installed)
            .cloned()
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(OrchestrationError::MissingPrerequisites {
                blueprint_id: id.to_string(),
                missing,
            })
        }
    }
}
