//! Deployment input aggregation.
//!
//! Inputs can come from three places. They are merged in a fixed order, later
//! sources overwriting earlier ones key by key:
//!
//! 1. inline text (YAML, falling back to JSON)
//! 2. an inputs file, when it exists
//! 3. an inline, already structured map

pub mod mapping;

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, info};

use crate::error::{OrchestrationError, Result};
use crate::remote::ValueMap;

pub use mapping::{Mapping, transform};

/// Placeholder printed instead of masked input values.
pub const MASKED_VALUE: &str = "********";

/// The three input sources of a provisioning call. Any of them may be absent.
#[derive(Debug, Clone, Default)]
pub struct InputSources {
    pub inline_value: Option<ValueMap>,
    pub inline_text: Option<String>,
    pub file: Option<PathBuf>,
}

impl InputSources {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_value(mut self, value: ValueMap) -> Self {
        self.inline_value = Some(value);
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.inline_text = Some(text.into());
        self
    }

    pub fn with_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.file = Some(path.into());
        self
    }

    pub fn aggregate(&self) -> Result<ValueMap> {
        aggregate(
            self.inline_value.as_ref(),
            self.inline_text.as_deref(),
            self.file.as_deref(),
        )
    }
}

/// Merge the input sources with text < file < inline value precedence.
pub fn aggregate(
    inline_value: Option<&ValueMap>,
    inline_text: Option<&str>,
    file: Option<&Path>,
) -> Result<ValueMap> {
    let mut merged = ValueMap::new();

    if let Some(text) = inline_text {
        merged.extend(parse_map_str(text)?);
    }

    if let Some(path) = file {
        merged.extend(read_map_file(path)?);
    }

    if let Some(value) = inline_value {
        merged.extend(value.iter().map(|(k, v)| (k.clone(), v.clone())));
    }

    Ok(merged)
}

/// Parse a flat map from YAML or JSON text.
///
/// YAML is attempted first; JSON is the fallback. Blank text yields an empty
/// map.
pub fn parse_map_str(text: &str) -> Result<ValueMap> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Ok(ValueMap::new());
    }

    let yaml_err = match serde_yaml::from_str::<ValueMap>(trimmed) {
        Ok(map) => return Ok(map),
        Err(err) => err,
    };
    debug!(error = %yaml_err, "inputs are not a YAML mapping, trying JSON");

    serde_json::from_str::<ValueMap>(trimmed).map_err(|json_err| {
        OrchestrationError::InvalidInputFormat {
            message: format!("not a YAML mapping ({yaml_err}) nor a JSON object ({json_err})"),
        }
    })
}

/// Read a YAML/JSON map from a file. A missing file contributes nothing.
pub fn read_map_file(path: &Path) -> Result<ValueMap> {
    if !path.exists() {
        info!(path = %path.display(), "inputs file not found, skipping");
        return Ok(ValueMap::new());
    }

    let content = std::fs::read_to_string(path).map_err(|source| OrchestrationError::InputFile {
        path: path.to_path_buf(),
        source,
    })?;
    parse_map_str(&content)
}

/// Copy of `inputs` with the values of masked keys replaced by [`MASKED_VALUE`].
pub fn masked(inputs: &ValueMap, mask: &dyn Fn(&str) -> bool) -> ValueMap {
    inputs
        .iter()
        .map(|(k, v)| {
            let value = if mask(k) {
                Value::String(MASKED_VALUE.to_string())
            } else {
                v.clone()
            };
            (k.clone(), value)
        })
        .collect()
}
