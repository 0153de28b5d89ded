//! Run-level orchestration over many repositories.
//!
//! One resolver, toolchain, and git handle are shared by every pass. A failed
//! repository is reported and the run moves on to the next one.
use crate::cli::{ConfigArgs, RunArgs};
use crate::config::{load_config, RefreshConfig};
use crate::pass::{PassOutcome, RefreshPass};
use crate::paths::RepoPaths;
use crate::registry::VersionResolver;
use crate::toolchain::CommandToolchain;
use crate::vcs::GitCli;
use anyhow::{anyhow, Context, Result};
use serde::Serialize;
use std::path::Path;

/// Per-repository line of the run report.
#[derive(Debug, Serialize)]
pub struct RepoReport {
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<PassOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub fn run_refresh(args: RunArgs) -> Result<()> {
    let config = load_config(args.config.as_deref())?;
    let resolver = VersionResolver::from_config(&config);
    let toolchain = CommandToolchain::from_config(&config)?;
    let vcs = GitCli;
    let pass = RefreshPass::new(&config, &resolver, &toolchain, &vcs);

    let mut reports = Vec::with_capacity(args.repos.len());
    for repo in &args.repos {
        let result = refresh_one(&pass, repo);
        if let Err(err) = &result {
            tracing::error!(repo = %repo.display(), "refresh failed: {err:#}");
        }
        let (outcome, error) = match result {
            Ok(outcome) => (Some(outcome), None),
            Err(err) => (None, Some(format!("{err:#}"))),
        };
        reports.push(RepoReport {
            path: repo.display().to_string(),
            outcome,
            error,
        });
    }

    if args.json {
        let text = serde_json::to_string_pretty(&reports).context("serialize run report")?;
        println!("{text}");
    }

    let failed = reports.iter().filter(|report| report.error.is_some()).count();
    if failed > 0 {
        return Err(anyhow!(
            "{failed} of {} repositories failed",
            reports.len()
        ));
    }
    Ok(())
}

fn refresh_one(pass: &RefreshPass<'_>, repo: &Path) -> Result<PassOutcome> {
    let root = repo
        .canonicalize()
        .with_context(|| format!("resolve repository {}", repo.display()))?;
    pass.run(&RepoPaths::new(root))
}

pub fn show_config(args: ConfigArgs) -> Result<()> {
    let config: RefreshConfig = load_config(args.config.as_deref())?;
    let text = serde_json::to_string_pretty(&config).context("serialize config")?;
    println!("{text}");
    Ok(())
}
