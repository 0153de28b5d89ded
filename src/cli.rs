//! CLI argument parsing for the refresh workflow.
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Root CLI entrypoint.
#[derive(Parser, Debug)]
#[command(
    name = "typings-refresh",
    version,
    about = "Regenerate type declarations and commit the result",
    after_help = "Examples:\n  typings-refresh run --repo ./checkouts/left-pad\n  typings-refresh run --repo a --repo b --json\n  typings-refresh config --config ./refresh.json",
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct RootArgs {
    /// Emit debug logging (overridden by RUST_LOG)
    #[arg(long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    Run(RunArgs),
    Config(ConfigArgs),
}

/// Run inputs: the repositories to refresh, in order.
#[derive(Parser, Debug)]
#[command(about = "Refresh type declarations in one or more repositories")]
pub struct RunArgs {
    /// Repository checkout to refresh (repeatable)
    #[arg(long = "repo", value_name = "DIR", required = true)]
    pub repos: Vec<PathBuf>,

    /// Config file (defaults to the user config dir, then built-ins)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Print per-repository results as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Parser, Debug)]
#[command(about = "Print the effective configuration")]
pub struct ConfigArgs {
    /// Config file (defaults to the user config dir, then built-ins)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,
}
