//! Typed paths into a target repository.
//!
//! The config names files relative to the repository root; this keeps the
//! joins in one place.
use crate::config::RefreshConfig;
use std::path::{Path, PathBuf};

/// Convenience wrapper for locating the files a pass reads and writes.
#[derive(Debug, Clone)]
pub struct RepoPaths {
    root: PathBuf,
    name: String,
}

impl RepoPaths {
    /// Create a new path helper rooted at the repository checkout.
    pub fn new(root: PathBuf) -> Self {
        let name = root
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_else(|| root.display().to_string());
        Self { root, name }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Repository name used to label log lines and errors.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn manifest_path(&self, config: &RefreshConfig) -> PathBuf {
        self.root.join(&config.manifest_file)
    }

    pub fn lock_path(&self, config: &RefreshConfig) -> PathBuf {
        self.root.join(&config.lock_file)
    }

    pub fn ci_config_path(&self, config: &RefreshConfig) -> PathBuf {
        self.root.join(&config.ci_config_file)
    }
}
