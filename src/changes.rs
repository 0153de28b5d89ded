//! Changed-file classification.
//!
//! Decides which working-tree changes belong in the refresh commit and which
//! flags they raise.
use crate::config::RefreshConfig;
use crate::vcs::ChangedPath;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Declaration,
    CiConfig,
    Manifest,
    Unexpected,
}

/// Tag one repository-relative path.
pub fn classify(path: &str, config: &RefreshConfig) -> ChangeKind {
    if path.ends_with(&config.declaration_suffix) {
        ChangeKind::Declaration
    } else if path == config.ci_config_file {
        ChangeKind::CiConfig
    } else if path == config.manifest_file || path == config.lock_file {
        ChangeKind::Manifest
    } else {
        ChangeKind::Unexpected
    }
}

/// Classified working-tree changes for one repository.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ChangeSet {
    /// Paths accepted into the commit, in status order. An accepted rename
    /// brings its source path along.
    pub files: Vec<String>,
    pub unexpected: Vec<String>,
    pub types_updated: bool,
    pub ci_updated: bool,
}

impl ChangeSet {
    pub fn from_paths<I, P>(paths: I, config: &RefreshConfig) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<ChangedPath>,
    {
        let mut changes = Self::default();
        for changed in paths {
            let ChangedPath { path, renamed_from } = changed.into();
            match classify(&path, config) {
                ChangeKind::Declaration => changes.types_updated = true,
                ChangeKind::CiConfig => changes.ci_updated = true,
                ChangeKind::Manifest => {}
                ChangeKind::Unexpected => {
                    changes.unexpected.push(path);
                    continue;
                }
            }
            changes.files.push(path);
            changes.files.extend(renamed_from);
        }
        changes
    }
}
