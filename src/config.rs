//! Refresh configuration helpers.
//!
//! Loads, validates, and defaults the JSON config that names the generator,
//! the managed script, and the files the pass is allowed to touch.
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const CONFIG_SCHEMA_VERSION: u32 = 1;
pub const CONFIG_FILE_NAME: &str = "typings-refresh.json";

/// Where the latest generator version is read from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum VersionSourceConfig {
    /// Run `npm view <package> dist-tags` and scan its output.
    NpmView,
    /// Fetch the package document from a registry over HTTP.
    Http { registry_url: String },
}

/// Pass configuration. Every field falls back to the built-in default.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RefreshConfig {
    pub schema_version: u32,
    pub generator_package: String,
    pub auxiliary_package: String,
    pub auxiliary_range: String,
    pub script_name: String,
    pub script_command: String,
    pub declaration_suffix: String,
    pub manifest_file: String,
    pub lock_file: String,
    pub ci_config_file: String,
    pub ci_field: String,
    /// Substring identifying the managed CI entry; derived from the run
    /// command when unset.
    pub ci_marker: Option<String>,
    pub install_command: String,
    pub run_command: String,
    pub commit_message: String,
    pub version_source: VersionSourceConfig,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            schema_version: CONFIG_SCHEMA_VERSION,
            generator_package: "dts-buddy".to_string(),
            auxiliary_package: "typescript".to_string(),
            auxiliary_range: "^5.0.0".to_string(),
            script_name: "generate:types".to_string(),
            script_command: "dts-buddy".to_string(),
            declaration_suffix: ".d.ts".to_string(),
            manifest_file: "package.json".to_string(),
            lock_file: "package-lock.json".to_string(),
            ci_config_file: ".travis.yml".to_string(),
            ci_field: "before_script".to_string(),
            ci_marker: None,
            install_command: "npm install".to_string(),
            run_command: "npm run".to_string(),
            commit_message: "chore: regenerate type declarations".to_string(),
            version_source: VersionSourceConfig::NpmView,
        }
    }
}

impl RefreshConfig {
    /// Command line that runs the managed script.
    pub fn script_invocation(&self) -> String {
        format!("{} {}", self.run_command.trim(), self.script_name)
    }

    /// Marker used to find the managed CI entry.
    pub fn ci_marker(&self) -> String {
        self.ci_marker
            .clone()
            .unwrap_or_else(|| self.script_invocation())
    }

    /// The pre-build command this pass owns in the CI config.
    ///
    /// Fails the build with a red message whenever regeneration leaves a diff.
    /// New files are marked intent-to-add so the diff sees them too.
    pub fn ci_command(&self) -> String {
        format!(
            "{} && git add -N . && git diff --exit-code --stat || (echo -e \"\\033[0;31mType declarations are out of date: run {} and commit the result\\033[0m\" && exit 1)",
            self.script_invocation(),
            self.script_invocation()
        )
    }
}

/// Resolve the config path: explicit flag first, then the user config dir.
pub fn config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    let candidate = dirs::config_dir()?
        .join("typings-refresh")
        .join(CONFIG_FILE_NAME);
    candidate.is_file().then_some(candidate)
}

/// Load and validate the config, or return defaults when none is present.
pub fn load_config(explicit: Option<&Path>) -> Result<RefreshConfig> {
    let Some(path) = config_path(explicit) else {
        return Ok(RefreshConfig::default());
    };
    let bytes = fs::read(&path).with_context(|| format!("read config {}", path.display()))?;
    let config: RefreshConfig = serde_json::from_slice(&bytes)
        .with_context(|| format!("parse config JSON {}", path.display()))?;
    validate_config(&config)?;
    tracing::debug!(path = %path.display(), "loaded config");
    Ok(config)
}

/// Validate schema version, required values, and repository-relative paths.
pub fn validate_config(config: &RefreshConfig) -> Result<()> {
    if config.schema_version != CONFIG_SCHEMA_VERSION {
        return Err(anyhow!(
            "unsupported config schema_version {}",
            config.schema_version
        ));
    }
    let required = [
        ("generator_package", &config.generator_package),
        ("auxiliary_package", &config.auxiliary_package),
        ("auxiliary_range", &config.auxiliary_range),
        ("script_name", &config.script_name),
        ("script_command", &config.script_command),
        ("declaration_suffix", &config.declaration_suffix),
        ("ci_field", &config.ci_field),
        ("install_command", &config.install_command),
        ("run_command", &config.run_command),
        ("commit_message", &config.commit_message),
    ];
    for (label, value) in required {
        if value.trim().is_empty() {
            return Err(anyhow!("{label} must be non-empty"));
        }
    }
    if !config.declaration_suffix.starts_with('.') {
        return Err(anyhow!(
            "declaration_suffix must start with '.' (got {:?})",
            config.declaration_suffix
        ));
    }
    validate_relative_path(&config.manifest_file, "manifest_file")?;
    validate_relative_path(&config.lock_file, "lock_file")?;
    validate_relative_path(&config.ci_config_file, "ci_config_file")?;
    let marker = config.ci_marker();
    if marker.trim().is_empty() || !config.ci_command().contains(&marker) {
        return Err(anyhow!(
            "ci_marker {marker:?} must appear in the managed CI command"
        ));
    }
    if let VersionSourceConfig::Http { registry_url } = &config.version_source {
        if !registry_url.starts_with("http://") && !registry_url.starts_with("https://") {
            return Err(anyhow!(
                "registry_url must be an http(s) URL (got {registry_url:?})"
            ));
        }
    }
    Ok(())
}

fn validate_relative_path(rel: &str, label: &str) -> Result<()> {
    let path = Path::new(rel);
    if rel.trim().is_empty() || path.is_absolute() || has_parent_components(path) {
        return Err(anyhow!(
            "{label} must be a relative path without '..' (got {rel:?})"
        ));
    }
    Ok(())
}

fn has_parent_components(path: &Path) -> bool {
    path.components()
        .any(|component| matches!(component, std::path::Component::ParentDir))
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
