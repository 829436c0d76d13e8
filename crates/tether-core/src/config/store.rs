//! Config store for loading tether.toml.

use std::path::{Path, PathBuf};

use anyhow::Context;

use super::{CONFIG_FILE_NAME, ConfigScope, TetherConfig, parser};

#[derive(Debug, Clone)]
pub struct ConfigStore {
    scope: ConfigScope,
    config_path: PathBuf,
}

impl ConfigStore {
    pub fn from_scope(scope: ConfigScope) -> anyhow::Result<Self> {
        let global_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?
            .join("tether");
        let project_root = std::env::current_dir()?;

        Ok(Self::from_paths(scope, &global_dir, &project_root))
    }

    pub fn from_paths(scope: ConfigScope, global_dir: &Path, project_root: &Path) -> Self {
        let config_path = match scope {
            ConfigScope::Global => global_dir.join(CONFIG_FILE_NAME),
            ConfigScope::Project => project_root.join(CONFIG_FILE_NAME),
        };
        Self { scope, config_path }
    }

    /// Store for an explicit file, treated as project configuration.
    pub fn from_file(path: impl Into<PathBuf>) -> Self {
        Self {
            scope: ConfigScope::Project,
            config_path: path.into(),
        }
    }

    pub fn scope(&self) -> ConfigScope {
        self.scope
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn load(&self) -> anyhow::Result<TetherConfig> {
        if !self.config_path.exists() {
            return Ok(TetherConfig::new());
        }
        parser::parse_tether_toml(&self.config_path)
    }

    /// The keys this file sets explicitly (empty when the file is missing).
    pub fn load_table(&self) -> anyhow::Result<toml::Table> {
        if !self.config_path.exists() {
            return Ok(toml::Table::new());
        }
        let content = std::fs::read_to_string(&self.config_path).with_context(|| {
            format!("Failed to read config file: {}", self.config_path.display())
        })?;
        parser::parse_tether_table_str(&content).with_context(|| {
            format!("Failed to parse config file: {}", self.config_path.display())
        })
    }
}

/// Load the global config with the project config laid over it.
///
/// Every key the project file sets wins, including one set back to its
/// default. Arrays are replaced, not unioned.
pub fn load_merged(global: &ConfigStore, project: &ConfigStore) -> anyhow::Result<TetherConfig> {
    let mut table = global.load_table()?;
    parser::merge_tables(&mut table, project.load_table()?);
    parser::config_from_table(table)
}
