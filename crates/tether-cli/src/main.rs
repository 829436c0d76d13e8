//! Tether - environment orchestration helpers for build pipelines
//!
//! Usage:
//!   tether inputs --inputs "a: 1" --set b=2     # Print aggregated inputs
//!   tether transform --env-data ... --mapping ... --output ...
//!   tether config                               # Print effective config

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::Value;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tether_core::commands::{OutputsToInputsOptions, outputs_to_inputs};
use tether_core::config::{ConfigScope, ConfigStore, TetherConfig, load_merged, to_toml};
use tether_core::inputs::{self, InputSources};
use tether_core::remote::ValueMap;

#[derive(Parser)]
#[command(name = "tether")]
#[command(about = "Provision and tear down test environments", long_about = None)]
struct Cli {
    /// Configuration file (defaults to the global and project tether.toml)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the aggregated deployment inputs as JSON
    Inputs {
        /// Inputs as YAML or JSON text
        #[arg(long)]
        inputs: Option<String>,

        /// YAML or JSON file with inputs (skipped when missing)
        #[arg(long, value_name = "PATH")]
        inputs_file: Option<PathBuf>,

        /// Single input value, parsed as JSON when possible (KEY=VALUE)
        #[arg(long = "set", value_name = "KEY=VALUE")]
        values: Vec<String>,

        /// Hide the values of the configured masked keys
        #[arg(long)]
        mask: bool,
    },

    /// Map environment outputs and capabilities to inputs of another deployment
    Transform {
        /// JSON file with `outputs` and `capabilities`
        #[arg(long, value_name = "PATH")]
        env_data: PathBuf,

        /// Mapping as YAML or JSON text
        #[arg(long)]
        mapping: String,

        /// Where to write the resulting inputs
        #[arg(long, value_name = "PATH")]
        output: PathBuf,
    },

    /// Print the effective configuration
    Config,
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tether=debug,info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Inputs {
            inputs,
            inputs_file,
            values,
            mask,
        } => run_inputs(&config, inputs, inputs_file, &values, mask)?,
        Commands::Transform {
            env_data,
            mapping,
            output,
        } => run_transform(env_data, mapping, output)?,
        Commands::Config => print!("{}", to_toml(&config)?),
    }

    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<TetherConfig> {
    match path {
        Some(path) => ConfigStore::from_file(path).load(),
        None => {
            let global = ConfigStore::from_scope(ConfigScope::Global)?;
            let project = ConfigStore::from_scope(ConfigScope::Project)?;
            load_merged(&global, &project)
        }
    }
}

fn run_inputs(
    config: &TetherConfig,
    text: Option<String>,
    file: Option<PathBuf>,
    values: &[String],
    mask: bool,
) -> Result<()> {
    let mut sources = InputSources::new();
    if let Some(text) = text {
        sources = sources.with_text(text);
    }
    if let Some(file) = file {
        sources = sources.with_file(file);
    }
    if !values.is_empty() {
        sources = sources.with_value(parse_values(values)?);
    }

    let mut aggregated = sources.aggregate()?;
    if mask {
        let masked_keys = &config.inputs.masked_keys;
        aggregated = inputs::masked(&aggregated, &|key| masked_keys.iter().any(|k| k == key));
    }

    println!("{}", serde_json::to_string_pretty(&Value::Object(aggregated))?);
    Ok(())
}

fn run_transform(env_data: PathBuf, mapping: String, output: PathBuf) -> Result<()> {
    let options = OutputsToInputsOptions::new(env_data, mapping, output);
    let produced = outputs_to_inputs(&options)?;
    tracing::info!(
        path = %options.inputs_path.display(),
        count = produced.len(),
        "inputs written"
    );
    Ok(())
}

/// Parse `KEY=VALUE` pairs. Values that are not valid JSON are kept as strings.
fn parse_values(pairs: &[String]) -> Result<ValueMap> {
    let mut map = ValueMap::new();
    for pair in pairs {
        let (key, raw) = pair
            .split_once('=')
            .with_context(|| format!("Invalid value '{pair}', expected KEY=VALUE"))?;
        let key = key.trim();
        if key.is_empty() {
            anyhow::bail!("Invalid value '{pair}', key is empty");
        }
        let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
        map.insert(key.to_string(), value);
    }
    Ok(map)
}
