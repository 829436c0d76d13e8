//! Outputs/capabilities to inputs field mapping.

use std::collections::BTreeMap;
use std::fmt;

use serde::de::{self, MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::{OrchestrationError, Result};
use crate::remote::ValueMap;

/// Two independent rename tables: remote field name -> target input name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Mapping {
    #[serde(default, deserialize_with = "unique_table")]
    pub outputs: BTreeMap<String, String>,
    #[serde(default, deserialize_with = "unique_table")]
    pub capabilities: BTreeMap<String, String>,
}

/// Read a rename table, rejecting a source key that appears twice.
fn unique_table<'de, D>(deserializer: D) -> std::result::Result<BTreeMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    struct UniqueTable;

    impl<'de> Visitor<'de> for UniqueTable {
        type Value = BTreeMap<String, String>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a table of field renames")
        }

        fn visit_map<A>(self, mut access: A) -> std::result::Result<Self::Value, A::Error>
        where
            A: MapAccess<'de>,
        {
            let mut table = BTreeMap::new();
            while let Some((from, to)) = access.next_entry::<String, String>()? {
                if table.contains_key(&from) {
                    return Err(de::Error::custom(format_args!("duplicate key '{from}'")));
                }
                table.insert(from, to);
            }
            Ok(table)
        }
    }

    deserializer.deserialize_map(UniqueTable)
}

impl Mapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_output(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.outputs.insert(from.into(), to.into());
        self
    }

    pub fn with_capability(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.capabilities.insert(from.into(), to.into());
        self
    }

    /// Parse a mapping from YAML or JSON text.
    pub fn parse(text: &str) -> Result<Self> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(OrchestrationError::InvalidMapping {
                message: "mapping is empty".to_string(),
            });
        }

        let yaml_err = match serde_yaml::from_str::<Self>(trimmed) {
            Ok(mapping) => return Ok(mapping),
            Err(err) => err,
        };
        serde_json::from_str::<Self>(trimmed).map_err(|json_err| {
            OrchestrationError::InvalidMapping {
                message: format!("not valid YAML ({yaml_err}) nor JSON ({json_err})"),
            }
        })
    }

    /// Target keys produced by both tables. The capability value wins for
    /// these in [`transform`].
    pub fn overlapping_targets(&self) -> Vec<&str> {
        let from_outputs: std::collections::BTreeSet<&str> =
            self.outputs.values().map(String::as_str).collect();
        let mut overlap: Vec<&str> = self
            .capabilities
            .values()
            .map(String::as_str)
            .filter(|target| from_outputs.contains(target))
            .collect();
        overlap.sort_unstable();
        overlap.dedup();
        overlap
    }
}

/// Project outputs and capabilities into an inputs map.
///
/// Only mapped keys appear in the result. A mapped key missing from its source
/// produces `null`. Outputs are applied first, then capabilities, so a target
/// key produced by both tables carries the capability value.
pub fn transform(mapping: &Mapping, outputs: &ValueMap, capabilities: &ValueMap) -> ValueMap {
    let mut result = ValueMap::new();
    project(&mapping.outputs, outputs, &mut result);
    project(&mapping.capabilities, capabilities, &mut result);
    result
}

fn project(table: &BTreeMap<String, String>, source: &ValueMap, result: &mut ValueMap) {
    for (from, to) in table {
        let value = source.get(from).cloned().unwrap_or(Value::Null);
        result.insert(to.clone(), value);
    }
}
