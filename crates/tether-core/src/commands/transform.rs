//! Convert a persisted outputs document into an inputs file.

use std::path::PathBuf;

use tracing::info;

use crate::document::{OutputsDocument, write_json};
use crate::error::Result;
use crate::inputs::Mapping;
use crate::remote::ValueMap;

#[derive(Debug, Clone)]
pub struct OutputsToInputsOptions {
    /// `{outputs, capabilities}` document written by a provisioning step
    pub outputs_path: PathBuf,
    /// Mapping as YAML or JSON text
    pub mapping: String,
    /// Where the resulting inputs map is written
    pub inputs_path: PathBuf,
}

impl OutputsToInputsOptions {
    pub fn new(
        outputs_path: impl Into<PathBuf>,
        mapping: impl Into<String>,
        inputs_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            outputs_path: outputs_path.into(),
            mapping: mapping.into(),
            inputs_path: inputs_path.into(),
        }
    }
}

pub fn outputs_to_inputs(options: &OutputsToInputsOptions) -> Result<ValueMap> {
    let mapping = Mapping::parse(&options.mapping)?;
    for target in mapping.overlapping_targets() {
        info!(input = target, "input produced by both outputs and capabilities; capability value wins");
    }

    let document = OutputsDocument::load(&options.outputs_path)?;
    let inputs = document.transform(&mapping);

    info!(
        from = %options.outputs_path.display(),
        to = %options.inputs_path.display(),
        keys = inputs.len(),
        "writing inputs"
    );
    write_json(&inputs, &options.inputs_path)?;
    Ok(inputs)
}
