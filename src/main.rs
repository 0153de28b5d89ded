use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod changes;
mod ci;
mod cli;
mod config;
mod error;
mod manifest;
mod pass;
mod paths;
mod registry;
mod toolchain;
mod util;
mod vcs;
mod workflow;

use cli::{Command, RootArgs};

fn main() -> Result<()> {
    let args = RootArgs::parse();
    init_tracing(args.verbose);

    match args.command {
        Command::Run(args) => workflow::run_refresh(args),
        Command::Config(args) => workflow::show_config(args),
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
