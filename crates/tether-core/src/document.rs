//! Persisted environment data documents.
//!
//! The outputs document has exactly two top-level fields, `outputs` and
//! `capabilities`. Later pipeline stages read it back either as an inputs file
//! or through the outputs-to-inputs transform, so the shape is fixed.

use std::path::Path;

use serde::{Deserialize, Serialize, de::DeserializeOwned};
use tracing::info;

use crate::error::{OrchestrationError, Result};
use crate::inputs::{self, Mapping};
use crate::remote::ValueMap;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OutputsDocument {
    pub outputs: ValueMap,
    pub capabilities: ValueMap,
}

impl OutputsDocument {
    pub fn new(outputs: ValueMap, capabilities: ValueMap) -> Self {
        Self {
            outputs,
            capabilities,
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        read_json(path)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        info!(path = %path.display(), "writing outputs and capabilities");
        write_json(self, path)
    }

    /// Apply a mapping to this document's outputs and capabilities.
    pub fn transform(&self, mapping: &Mapping) -> ValueMap {
        inputs::transform(mapping, &self.outputs, &self.capabilities)
    }
}

/// Write `value` as pretty-printed JSON, creating parent directories.
pub fn write_json<T: Serialize + ?Sized>(value: &T, path: &Path) -> Result<()> {
    let document_err = |source: Box<dyn std::error::Error + Send + Sync>| {
        OrchestrationError::Document {
            action: "write",
            path: path.to_path_buf(),
            source,
        }
    };

    let content = serde_json::to_string_pretty(value).map_err(|e| document_err(e.into()))?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| document_err(e.into()))?;
    }
    std::fs::write(path, content).map_err(|e| document_err(e.into()))
}

/// Read a JSON document.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let document_err = |source: Box<dyn std::error::Error + Send + Sync>| {
        OrchestrationError::Document {
            action: "read",
            path: path.to_path_buf(),
            source,
        }
    };

    let content = std::fs::read_to_string(path).map_err(|e| document_err(e.into()))?;
    serde_json::from_str(&content).map_err(|e| document_err(e.into()))
}
