//! The refresh pass for a single repository.
//!
//! Steps run strictly in order and the first failure ends the pass; files
//! already written stay written.
use crate::changes::ChangeSet;
use crate::ci::{self, CiUpdate};
use crate::config::RefreshConfig;
use crate::error::PassError;
use crate::manifest::{self, Manifest, ManifestUpdate};
use crate::paths::RepoPaths;
use crate::registry::VersionResolver;
use crate::toolchain::{self, Toolchain};
use crate::vcs::VersionControl;
use anyhow::Result;
use serde::Serialize;

/// What one pass did to one repository.
#[derive(Debug, Clone, Serialize)]
pub struct PassOutcome {
    pub repo: String,
    pub latest_version: String,
    pub manifest: ManifestUpdate,
    pub ci: CiUpdate,
    pub lock_removed: bool,
    pub changes: ChangeSet,
    pub committed: bool,
}

impl PassOutcome {
    /// Whether the pass has a reason to commit.
    pub fn wants_commit(&self) -> bool {
        self.changes.types_updated
            || self.manifest.major_bump
            || self.manifest.script_updated
            || self.changes.ci_updated
    }
}

/// Collaborators shared by every pass in a run.
pub struct RefreshPass<'a> {
    config: &'a RefreshConfig,
    resolver: &'a VersionResolver,
    toolchain: &'a dyn Toolchain,
    vcs: &'a dyn VersionControl,
}

impl<'a> RefreshPass<'a> {
    pub fn new(
        config: &'a RefreshConfig,
        resolver: &'a VersionResolver,
        toolchain: &'a dyn Toolchain,
        vcs: &'a dyn VersionControl,
    ) -> Self {
        Self {
            config,
            resolver,
            toolchain,
            vcs,
        }
    }

    pub fn run(&self, repo: &RepoPaths) -> Result<PassOutcome> {
        let config = self.config;
        let name = repo.name();

        let manifest_path = repo.manifest_path(config);
        let mut manifest = Manifest::load(&manifest_path)
            .map_err(|err| PassError::invalid_manifest(name, manifest_path.clone(), err))?;
        let latest_version = self
            .resolver
            .latest()
            .map_err(|err| PassError::version_not_found(name, self.resolver.package(), err))?;

        let manifest_update = manifest::apply_updates(&mut manifest, config, &latest_version)?;
        manifest.write()?;
        tracing::info!(
            repo = %name,
            pinned = %manifest_update.pinned_range,
            major_bump = manifest_update.major_bump,
            script_updated = manifest_update.script_updated,
            "updated {}",
            manifest.path().display()
        );

        let ci_path = repo.ci_config_path(config);
        let ci = ci::update_ci_config(&ci_path, config)?;
        match &ci {
            CiUpdate::Missing => tracing::info!(
                repo = %name,
                "no {} found, skipping CI config",
                config.ci_config_file
            ),
            CiUpdate::Updated { replaced, changed } => tracing::debug!(
                repo = %name,
                replaced,
                changed,
                "updated {}",
                ci_path.display()
            ),
        }

        let lock_removed = toolchain::remove_lock_file(&repo.lock_path(config))?;
        self.toolchain.install(repo.root())?;
        self.toolchain.run_script(repo.root(), &config.script_name)?;

        let changes = ChangeSet::from_paths(self.vcs.changed_files(repo.root())?, config);
        for path in &changes.unexpected {
            tracing::warn!(repo = %name, path = %path, "unexpected changed file left out of commit");
        }

        let mut outcome = PassOutcome {
            repo: name.to_string(),
            latest_version,
            manifest: manifest_update,
            ci,
            lock_removed,
            changes,
            committed: false,
        };
        if !outcome.wants_commit() || outcome.changes.files.is_empty() {
            tracing::info!(repo = %name, "no changes");
            return Ok(outcome);
        }
        self.vcs
            .commit(repo.root(), &outcome.changes.files, &config.commit_message)?;
        outcome.committed = true;
        tracing::info!(
            repo = %name,
            files = outcome.changes.files.len(),
            "committed regenerated types"
        );
        Ok(outcome)
    }
}

#[cfg(test)]
#[path = "pass_tests.rs"]
mod tests;
