//! Configuration schema for tether.toml

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::environment::EchoOptions;
use crate::execution::DEFAULT_POLL_INTERVAL;

/// Root configuration structure for tether.toml
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TetherConfig {
    #[serde(default)]
    pub execution: ExecutionSettings,

    #[serde(default)]
    pub teardown: TeardownSettings,

    #[serde(default)]
    pub inputs: InputSettings,

    #[serde(default)]
    pub blueprint: BlueprintSettings,
}

/// Workflow execution polling
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExecutionSettings {
    /// Seconds between two status polls
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Also print debug-level execution events
    #[serde(default)]
    pub debug_output: bool,
}

impl Default for ExecutionSettings {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval_secs(),
            debug_output: false,
        }
    }
}

fn default_poll_interval_secs() -> u64 {
    DEFAULT_POLL_INTERVAL.as_secs()
}

impl ExecutionSettings {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TeardownSettings {
    /// Log teardown failures instead of failing the unit of work
    #[serde(default)]
    pub ignore_failure: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InputSettings {
    /// Print merged inputs before creating the deployment
    #[serde(default)]
    pub echo: bool,

    /// Keys whose values are never printed
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub masked_keys: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BlueprintSettings {
    /// Packages that must be installed on the manager before uploading
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required_packages: Vec<String>,
}

impl TetherConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.execution.poll_interval_secs == 0 {
            anyhow::bail!("execution.poll_interval_secs must be greater than zero");
        }
        if let Some(key) = self.inputs.masked_keys.iter().find(|k| k.trim().is_empty()) {
            anyhow::bail!("inputs.masked_keys contains a blank key: {:?}", key);
        }
        if self
            .blueprint
            .required_packages
            .iter()
            .any(|p| p.trim().is_empty())
        {
            anyhow::bail!("blueprint.required_packages contains a blank package name");
        }
        Ok(())
    }

    /// Echo settings derived from the `[inputs]` and `[execution]` tables.
    pub fn echo_options(&self) -> EchoOptions {
        EchoOptions::default()
            .with_echo_inputs(self.inputs.echo)
            .with_debug_output(self.execution.debug_output)
            .with_masked_keys(self.inputs.masked_keys.iter().cloned())
    }
}
