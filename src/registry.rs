//! Latest-version lookup for the declaration generator.
//!
//! A `VersionResolver` is built once per run and handed to every pass, so the
//! registry is queried at most once no matter how many repositories run.
use crate::config::{RefreshConfig, VersionSourceConfig};
use crate::util::truncate_string;
use anyhow::{anyhow, Context, Result};
use regex::Regex;
use std::cell::OnceCell;
use std::process::Command;

const SEMVER_TOKEN: &str = r"\d+\.\d+\.\d+(?:-[0-9A-Za-z.-]+)?(?:\+[0-9A-Za-z.-]+)?";

/// Something that can report the latest published version of a package.
pub trait VersionSource {
    fn latest_version(&self, package: &str) -> Result<String>;
}

/// Reads the `latest` dist-tag from `npm view <package> dist-tags`.
#[derive(Debug, Default)]
pub struct NpmViewSource;

impl VersionSource for NpmViewSource {
    fn latest_version(&self, package: &str) -> Result<String> {
        let npm = which::which("npm").context("locate npm on PATH")?;
        let output = Command::new(&npm)
            .arg("view")
            .arg(package)
            .arg("dist-tags")
            .output()
            .with_context(|| format!("spawn npm view {package} dist-tags"))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow!(
                "npm view {package} dist-tags failed with status {}: {}",
                output.status,
                truncate_string(stderr.trim(), 2048)
            ));
        }
        let stdout = String::from_utf8_lossy(&output.stdout);
        parse_npm_view_latest(&stdout)
            .ok_or_else(|| anyhow!("no latest version in npm view output for {package}"))
    }
}

/// Reads `dist-tags.latest` from the registry's package document.
#[derive(Debug)]
pub struct HttpRegistrySource {
    registry_url: String,
}

impl HttpRegistrySource {
    pub fn new(registry_url: &str) -> Self {
        Self {
            registry_url: registry_url.trim_end_matches('/').to_string(),
        }
    }

    fn package_url(&self, package: &str) -> String {
        // Scoped names keep the '@' but escape the separator.
        format!("{}/{}", self.registry_url, package.replace('/', "%2F"))
    }
}

impl VersionSource for HttpRegistrySource {
    fn latest_version(&self, package: &str) -> Result<String> {
        let url = self.package_url(package);
        let mut response = ureq::get(&url)
            .header("Accept", "application/vnd.npm.install-v1+json")
            .call()
            .with_context(|| format!("fetch {url}"))?;
        let document: serde_json::Value = response
            .body_mut()
            .read_json()
            .with_context(|| format!("parse registry document {url}"))?;
        latest_from_registry_document(&document)
            .ok_or_else(|| anyhow!("no latest dist-tag in registry document for {package}"))
    }
}

/// Extract the `latest` tag from `npm view` output.
///
/// Accepts the inspected form printed for `dist-tags` (`{ latest: '1.2.3' }`)
/// and the unquoted summary form (`latest: 1.2.3`).
pub fn parse_npm_view_latest(output: &str) -> Option<String> {
    let latest = Regex::new(&format!(
        r"(?m)(?:^|[\s{{,])latest:\s*'?({SEMVER_TOKEN})(?:'|\s|,|\}}|$)"
    ))
    .expect("regex for npm view latest tag");
    latest
        .captures(output)
        .and_then(|captures| captures.get(1))
        .map(|token| token.as_str().to_string())
}

pub fn latest_from_registry_document(document: &serde_json::Value) -> Option<String> {
    let latest = document.get("dist-tags")?.get("latest")?.as_str()?;
    let bare = Regex::new(&format!("^{SEMVER_TOKEN}$")).expect("regex for bare semver");
    bare.is_match(latest).then(|| latest.to_string())
}

/// Memoizing front for a `VersionSource`, bound to one package.
pub struct VersionResolver {
    package: String,
    source: Box<dyn VersionSource>,
    cached: OnceCell<String>,
}

impl VersionResolver {
    pub fn new(package: &str, source: Box<dyn VersionSource>) -> Self {
        Self {
            package: package.to_string(),
            source,
            cached: OnceCell::new(),
        }
    }

    /// Build the resolver described by the config.
    pub fn from_config(config: &RefreshConfig) -> Self {
        let source: Box<dyn VersionSource> = match &config.version_source {
            VersionSourceConfig::NpmView => Box::new(NpmViewSource),
            VersionSourceConfig::Http { registry_url } => {
                Box::new(HttpRegistrySource::new(registry_url))
            }
        };
        Self::new(&config.generator_package, source)
    }

    pub fn package(&self) -> &str {
        &self.package
    }

    /// Latest version, fetched on first use and reused afterwards.
    ///
    /// Failures are not cached; a later call queries the source again.
    pub fn latest(&self) -> Result<String> {
        if let Some(version) = self.cached.get() {
            return Ok(version.clone());
        }
        let version = self.source.latest_version(&self.package)?;
        tracing::info!(package = %self.package, %version, "resolved latest generator version");
        Ok(self.cached.get_or_init(|| version).clone())
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
