//! Package manifest loading, mutation, and persistence.
//!
//! The manifest is kept as an ordered JSON object so fields this pass does
//! not own survive a rewrite untouched and in their original order.
use crate::config::RefreshConfig;
use anyhow::{anyhow, Context, Result};
use serde::Serialize;
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEV_DEPENDENCIES: &str = "devDependencies";
pub const DEPENDENCIES: &str = "dependencies";
pub const SCRIPTS: &str = "scripts";

/// A parsed manifest bound to the file it came from.
#[derive(Debug, Clone)]
pub struct Manifest {
    path: PathBuf,
    document: Map<String, Value>,
}

/// What the manifest update changed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ManifestUpdate {
    /// Generator range before the update, if there was one.
    pub previous_range: Option<String>,
    pub pinned_range: String,
    /// The previous range did not admit the resolved version.
    pub major_bump: bool,
    pub auxiliary_added: bool,
    pub script_updated: bool,
}

impl Manifest {
    /// Read and shape-check the manifest at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = fs::read(path).with_context(|| format!("read {}", path.display()))?;
        let value: Value = serde_json::from_slice(&bytes)
            .with_context(|| format!("parse manifest JSON {}", path.display()))?;
        let Value::Object(document) = value else {
            return Err(anyhow!("manifest {} is not a JSON object", path.display()));
        };
        for section in [DEV_DEPENDENCIES, DEPENDENCIES, SCRIPTS] {
            match document.get(section) {
                None | Some(Value::Object(_)) => {}
                Some(_) => return Err(anyhow!("manifest field {section} is not an object")),
            }
        }
        Ok(Self {
            path: path.to_path_buf(),
            document,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// String value of `section[name]`, if present.
    pub fn entry(&self, section: &str, name: &str) -> Option<&str> {
        self.document
            .get(section)
            .and_then(Value::as_object)
            .and_then(|entries| entries.get(name))
            .and_then(Value::as_str)
    }

    fn has_entry(&self, section: &str, name: &str) -> bool {
        self.document
            .get(section)
            .and_then(Value::as_object)
            .is_some_and(|entries| entries.contains_key(name))
    }

    fn section_mut(&mut self, section: &str) -> Result<&mut Map<String, Value>> {
        self.document
            .entry(section.to_string())
            .or_insert_with(|| Value::Object(Map::new()))
            .as_object_mut()
            .ok_or_else(|| anyhow!("manifest field {section} is not an object"))
    }

    /// Set `section[name]`, returning whether the stored value changed.
    pub fn set_entry(&mut self, section: &str, name: &str, value: &str) -> Result<bool> {
        let entries = self.section_mut(section)?;
        let changed = entries.get(name).and_then(Value::as_str) != Some(value);
        entries.insert(name.to_string(), Value::String(value.to_string()));
        Ok(changed)
    }

    /// Persist as two-space indented JSON with a trailing newline.
    pub fn write(&self) -> Result<()> {
        let mut text =
            serde_json::to_string_pretty(&self.document).context("serialize manifest")?;
        text.push('\n');
        fs::write(&self.path, text.as_bytes())
            .with_context(|| format!("write {}", self.path.display()))?;
        Ok(())
    }
}

/// Pin the generator, ensure the auxiliary dependency, and set the script.
pub fn apply_updates(
    manifest: &mut Manifest,
    config: &RefreshConfig,
    latest: &str,
) -> Result<ManifestUpdate> {
    let version = semver::Version::parse(latest)
        .with_context(|| format!("parse generator version {latest}"))?;
    let previous_range = manifest
        .entry(DEV_DEPENDENCIES, &config.generator_package)
        .map(str::to_string);
    let major_bump = previous_range
        .as_deref()
        .is_none_or(|range| !range_admits(range, &version));
    let pinned_range = format!("^{latest}");
    manifest.set_entry(DEV_DEPENDENCIES, &config.generator_package, &pinned_range)?;

    let auxiliary_added = !manifest.has_entry(DEPENDENCIES, &config.auxiliary_package)
        && !manifest.has_entry(DEV_DEPENDENCIES, &config.auxiliary_package);
    if auxiliary_added {
        manifest.set_entry(
            DEV_DEPENDENCIES,
            &config.auxiliary_package,
            &config.auxiliary_range,
        )?;
    }

    let script_updated = manifest.set_entry(SCRIPTS, &config.script_name, &config.script_command)?;

    Ok(ManifestUpdate {
        previous_range,
        pinned_range,
        major_bump,
        auxiliary_added,
        script_updated,
    })
}

/// Whether an npm-style range admits `version`.
///
/// Covers comparator sets, `||` alternatives, hyphen ranges, and `x`
/// wildcards. Tags such as `latest` and non-registry specifiers never admit.
pub fn range_admits(range: &str, version: &semver::Version) -> bool {
    range.split("||").any(|alternative| {
        translate_range(alternative)
            .and_then(|req| semver::VersionReq::parse(&req).ok())
            .is_some_and(|req| req.matches(version))
    })
}

fn translate_range(alternative: &str) -> Option<String> {
    let alternative = alternative.trim();
    if alternative.is_empty() || alternative == "*" {
        return Some("*".to_string());
    }
    if let Some((low, high)) = alternative.split_once(" - ") {
        let mut low = numeric_parts(low.trim())?;
        let high = numeric_parts(high.trim())?;
        low.resize(3, 0);
        let upper = match high.as_slice() {
            [major, minor, patch] => format!("<={major}.{minor}.{patch}"),
            [major, minor] => format!("<{major}.{}.0", minor + 1),
            [major] => format!("<{}.0.0", major + 1),
            _ => return None,
        };
        return Some(format!(">={}.{}.{}, {upper}", low[0], low[1], low[2]));
    }

    let mut comparators = Vec::new();
    let mut pending_op = String::new();
    for token in alternative.split_whitespace() {
        if token.chars().all(is_operator) {
            pending_op.push_str(token);
            continue;
        }
        let token = format!("{pending_op}{token}");
        pending_op.clear();
        comparators.push(comparator(&token)?);
    }
    if !pending_op.is_empty() || comparators.is_empty() {
        return None;
    }
    Some(comparators.join(", "))
}

fn is_operator(ch: char) -> bool {
    matches!(ch, '<' | '>' | '=' | '~' | '^')
}

fn comparator(token: &str) -> Option<String> {
    let split = token.find(|ch: char| !is_operator(ch)).unwrap_or(token.len());
    let (op, version) = token.split_at(split);
    let version = version.strip_prefix('v').unwrap_or(version);
    let core_end = version.find(['-', '+']).unwrap_or(version.len());
    let (core, suffix) = version.split_at(core_end);
    let concrete = core
        .split('.')
        .take_while(|part| !matches!(*part, "x" | "X" | "*"))
        .collect::<Vec<_>>();
    if concrete
        .iter()
        .any(|part| part.is_empty() || !part.chars().all(|ch| ch.is_ascii_digit()))
    {
        return None;
    }
    if concrete.len() > 3 || (concrete.len() < 3 && !suffix.is_empty()) {
        return None;
    }
    let partial = concrete.join(".");
    // npm reads a bare version as exact and a partial one as a wildcard.
    Some(match (op, concrete.len()) {
        (_, 0) => ">=0.0.0".to_string(),
        ("", 3) => format!("={partial}{suffix}"),
        ("", _) => format!("~{partial}"),
        (op, _) => format!("{op}{partial}{suffix}"),
    })
}

fn numeric_parts(token: &str) -> Option<Vec<u64>> {
    let token = token.strip_prefix('v').unwrap_or(token);
    token
        .split('.')
        .take_while(|part| !matches!(*part, "x" | "X" | "*"))
        .map(|part| part.parse::<u64>().ok())
        .collect()
}

#[cfg(test)]
#[path = "manifest_tests.rs"]
mod tests;
