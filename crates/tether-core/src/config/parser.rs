//! TOML parser with line context in error messages

use super::schema::TetherConfig;
use anyhow::{Context, Result};
use std::path::Path;

/// Parse tether.toml
pub fn parse_tether_toml(path: &Path) -> Result<TetherConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    parse_tether_toml_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Parse tether.toml content from string
pub fn parse_tether_toml_str(content: &str) -> Result<TetherConfig> {
    let config: TetherConfig =
        toml::from_str(content).map_err(|e| enhance_toml_error(e, content))?;

    config.validate()?;

    Ok(config)
}

/// Parse tether.toml content into a raw table, validating it as a whole
/// configuration first.
pub fn parse_tether_table_str(content: &str) -> Result<toml::Table> {
    parse_tether_toml_str(content)?;
    toml::from_str(content).map_err(|e| enhance_toml_error(e, content))
}

/// Lay `overlay` over `base`. Nested tables merge key by key; any other value
/// set in `overlay` replaces the one in `base`, arrays included.
pub fn merge_tables(base: &mut toml::Table, overlay: toml::Table) {
    for (key, value) in overlay {
        match (base.get_mut(&key), value) {
            (Some(toml::Value::Table(base_table)), toml::Value::Table(overlay_table)) => {
                merge_tables(base_table, overlay_table);
            }
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}

/// Build a validated configuration from a raw table.
pub fn config_from_table(table: toml::Table) -> Result<TetherConfig> {
    let config: TetherConfig = toml::Value::Table(table)
        .try_into()
        .context("Invalid configuration")?;
    config.validate()?;
    Ok(config)
}

fn enhance_toml_error(error: toml::de::Error, content: &str) -> anyhow::Error {
    let message = error.message().to_string();

    // The span is a byte range; turn its start into a 1-based line number.
    let line_num = error
        .span()
        .map(|span| content[..span.start.min(content.len())].matches('\n').count() + 1);

    match line_num {
        Some(line_num) => anyhow::anyhow!(
            "TOML parsing error at line {}:\n{}\n\nError: {}",
            line_num,
            get_line_context(content, line_num),
            message
        ),
        None => anyhow::anyhow!("TOML parsing error: {}", message),
    }
}

/// Context lines around an error, the offending one marked
fn get_line_context(content: &str, line_num: usize) -> String {
    let lines: Vec<&str> = content.lines().collect();
    let start = line_num.saturating_sub(2);
    let end = (line_num + 2).min(lines.len());

    lines[start.min(end)..end]
        .iter()
        .enumerate()
        .map(|(i, line)| {
            let num = start + i + 1;
            let marker = if num == line_num { ">>>" } else { "   " };
            format!("{} {:4} | {}", marker, num, line)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Serialize a configuration to TOML
pub fn to_toml(config: &TetherConfig) -> Result<String> {
    toml::to_string_pretty(config).context("Failed to serialize configuration to TOML")
}
