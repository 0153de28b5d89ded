//! CI config maintenance.
//!
//! The pass owns exactly one entry of the pre-build command list, found by a
//! marker substring and replaced in place on every run.
use crate::config::RefreshConfig;
use anyhow::{anyhow, Context, Result};
use serde::Serialize;
use serde_yaml::{Mapping, Value};
use std::fs;
use std::path::Path;

/// Result of the CI step for one repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CiUpdate {
    /// No CI config in the repository; nothing was written.
    Missing,
    /// The managed entry was (re)written.
    Updated {
        /// Prior entries that carried the marker.
        replaced: usize,
        /// Whether the command list differs from what was on disk.
        changed: bool,
    },
}

/// Replace the managed command in the CI config at `path`, if it exists.
pub fn update_ci_config(path: &Path, config: &RefreshConfig) -> Result<CiUpdate> {
    if !path.is_file() {
        return Ok(CiUpdate::Missing);
    }
    let text = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let mut document: Value = serde_yaml::from_str(&text)
        .with_context(|| format!("parse CI config YAML {}", path.display()))?;
    if document.is_null() {
        document = Value::Mapping(Mapping::new());
    }
    let root = document
        .as_mapping_mut()
        .ok_or_else(|| anyhow!("CI config {} is not a mapping", path.display()))?;

    let before = command_list(root, &config.ci_field)?;
    let marker = config.ci_marker();
    let mut commands = before
        .iter()
        .filter(|entry| !entry.as_str().is_some_and(|command| command.contains(&marker)))
        .cloned()
        .collect::<Vec<_>>();
    let replaced = before.len() - commands.len();
    commands.push(Value::String(config.ci_command()));
    let changed = commands != before;
    root.insert(
        Value::String(config.ci_field.clone()),
        Value::Sequence(commands),
    );

    let rendered = serde_yaml::to_string(&document).context("serialize CI config")?;
    fs::write(path, rendered.as_bytes()).with_context(|| format!("write {}", path.display()))?;
    Ok(CiUpdate::Updated { replaced, changed })
}

/// Current contents of the command list; a lone string counts as one entry.
fn command_list(root: &Mapping, field: &str) -> Result<Vec<Value>> {
    match root.get(field) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Sequence(entries)) => Ok(entries.clone()),
        Some(Value::String(command)) => Ok(vec![Value::String(command.clone())]),
        Some(_) => Err(anyhow!("CI config field {field} is not a list of commands")),
    }
}

#[cfg(test)]
#[path = "ci_tests.rs"]
mod tests;
