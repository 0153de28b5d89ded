//! Package-manager invocations run inside the target repository.
use crate::config::RefreshConfig;
use crate::util::truncate_string;
use anyhow::{anyhow, Context, Result};
use std::fs;
use std::path::Path;
use std::process::Command;

const MAX_STDERR_BYTES: usize = 4096;

/// Dependency installation and script execution for one repository.
pub trait Toolchain {
    fn install(&self, repo: &Path) -> Result<()>;
    fn run_script(&self, repo: &Path, script: &str) -> Result<()>;
}

/// Runs the configured install and run command lines.
#[derive(Debug, Clone)]
pub struct CommandToolchain {
    install: Vec<String>,
    run: Vec<String>,
}

impl CommandToolchain {
    pub fn from_config(config: &RefreshConfig) -> Result<Self> {
        Ok(Self {
            install: split_command(&config.install_command)?,
            run: split_command(&config.run_command)?,
        })
    }
}

impl Toolchain for CommandToolchain {
    fn install(&self, repo: &Path) -> Result<()> {
        run_in(repo, &self.install)
    }

    fn run_script(&self, repo: &Path, script: &str) -> Result<()> {
        let mut argv = self.run.clone();
        argv.push(script.to_string());
        run_in(repo, &argv)
    }
}

fn split_command(command: &str) -> Result<Vec<String>> {
    let argv =
        shell_words::split(command).with_context(|| format!("parse command: {command}"))?;
    if argv.is_empty() {
        return Err(anyhow!("command is empty"));
    }
    Ok(argv)
}

/// Run `argv` with `repo` as working directory; non-zero exit is an error.
pub fn run_in(repo: &Path, argv: &[String]) -> Result<()> {
    let (program, args) = argv
        .split_first()
        .ok_or_else(|| anyhow!("command is empty"))?;
    let command_line = argv.join(" ");
    let resolved = which::which(program).with_context(|| format!("locate {program} on PATH"))?;
    tracing::debug!(repo = %repo.display(), command = %command_line, "running");
    let output = Command::new(&resolved)
        .args(args)
        .current_dir(repo)
        .output()
        .with_context(|| format!("spawn {command_line}"))?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(anyhow!(
            "{command_line} failed with status {}: {}",
            output.status,
            truncate_string(stderr.trim(), MAX_STDERR_BYTES)
        ));
    }
    Ok(())
}

/// Delete the lock file so the install resolves the freshly pinned range.
pub fn remove_lock_file(path: &Path) -> Result<bool> {
    if !path.exists() {
        return Ok(false);
    }
    fs::remove_file(path).with_context(|| format!("remove {}", path.display()))?;
    Ok(true)
}

#[cfg(test)]
#[path = "toolchain_tests.rs"]
mod tests;
