//! Configuration for orchestration behavior.
//!
//! Two files are read, the project one overriding the global one:
//! - Global: `~/.config/tether/tether.toml`
//! - Project: `./tether.toml`

pub mod parser;
pub mod schema;
pub mod store;

use serde::{Deserialize, Serialize};

pub use parser::{parse_tether_toml, parse_tether_toml_str, to_toml};
pub use schema::{
    BlueprintSettings, ExecutionSettings, InputSettings, TeardownSettings, TetherConfig,
};
pub use store::{ConfigStore, load_merged};

/// Configuration file location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConfigScope {
    /// User-wide configuration
    Global,
    /// Project configuration, usually committed next to the pipeline definition
    Project,
}

pub const CONFIG_FILE_NAME: &str = "tether.toml";
