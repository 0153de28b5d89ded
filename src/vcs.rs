//! Version-control boundary: working-tree status and commits.
use crate::toolchain::run_in;
use anyhow::{anyhow, Context, Result};
use std::path::Path;
use std::process::Command;

/// One changed path from the working-tree status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangedPath {
    pub path: String,
    /// Source of a staged rename; its deletion belongs with `path`.
    pub renamed_from: Option<String>,
}

impl ChangedPath {
    pub fn renamed(path: &str, from: &str) -> Self {
        Self {
            path: path.to_string(),
            renamed_from: Some(from.to_string()),
        }
    }
}

impl From<String> for ChangedPath {
    fn from(path: String) -> Self {
        Self {
            path,
            renamed_from: None,
        }
    }
}

impl From<&str> for ChangedPath {
    fn from(path: &str) -> Self {
        Self::from(path.to_string())
    }
}

/// The two version-control operations the pass needs.
pub trait VersionControl {
    /// Repository-relative paths with any working-tree or index change.
    fn changed_files(&self, repo: &Path) -> Result<Vec<ChangedPath>>;
    fn commit(&self, repo: &Path, files: &[String], message: &str) -> Result<()>;
}

/// `git` on `PATH`.
#[derive(Debug, Default)]
pub struct GitCli;

impl VersionControl for GitCli {
    fn changed_files(&self, repo: &Path) -> Result<Vec<ChangedPath>> {
        let git = which::which("git").context("locate git on PATH")?;
        let output = Command::new(git)
            .args(["status", "--porcelain=v1", "-z", "--untracked-files=all"])
            .current_dir(repo)
            .output()
            .context("spawn git status")?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow!(
                "git status failed with status {}: {}",
                output.status,
                stderr.trim()
            ));
        }
        let text = String::from_utf8(output.stdout).context("decode git status as UTF-8")?;
        parse_porcelain_z(&text)
    }

    fn commit(&self, repo: &Path, files: &[String], message: &str) -> Result<()> {
        // Deleted paths (rename sources included) cannot be added by name;
        // `git commit -- <paths>` records their removal on its own.
        let present = files
            .iter()
            .filter(|file| repo.join(file).symlink_metadata().is_ok())
            .cloned()
            .collect::<Vec<_>>();
        if !present.is_empty() {
            let mut add = vec!["git".to_string(), "add".into(), "-A".into(), "--".into()];
            add.extend(present);
            run_in(repo, &add)?;
        }

        let mut commit = vec![
            "git".to_string(),
            "commit".into(),
            "-m".into(),
            message.to_string(),
            "--".into(),
        ];
        commit.extend(files.iter().cloned());
        run_in(repo, &commit)
    }
}

/// Parse `git status --porcelain=v1 -z` output into changed paths.
///
/// Rename and copy records carry their source path as a second field. A
/// rename keeps it; a copy leaves the source untouched, so it is dropped.
pub fn parse_porcelain_z(output: &str) -> Result<Vec<ChangedPath>> {
    let mut paths = Vec::new();
    let mut records = output.split('\0').filter(|record| !record.is_empty());
    while let Some(record) = records.next() {
        if record.len() < 4 || record.as_bytes()[2] != b' ' {
            return Err(anyhow!("malformed git status record {record:?}"));
        }
        let (status, path) = record.split_at(3);
        if status.contains('R') {
            let from = records
                .next()
                .ok_or_else(|| anyhow!("rename record {record:?} has no source path"))?;
            paths.push(ChangedPath::renamed(path, from));
            continue;
        }
        if status.contains('C') {
            records.next();
        }
        paths.push(ChangedPath::from(path));
    }
    Ok(paths)
}

#[cfg(test)]
#[path = "vcs_tests.rs"]
mod tests;
