//! Fusion Metadata Registry CLI.

use anyhow::{Context, Result};
use clap::Parser;
use fmr_core::{ApiParams, Credentials, Registry};

mod cli;
mod commands;
mod logging;

use crate::cli::{Cli, Command};
use crate::commands::{run_add_items, run_codelist, run_validate, run_validate_batch};
use crate::logging::init_logging;

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbosity.tracing_level_filter());

    let exit_code = match run(&cli) {
        Ok(true) => 0,
        Ok(false) => 1,
        Err(error) => {
            eprintln!("error: {error:#}");
            1
        }
    };
    std::process::exit(exit_code);
}

fn run(cli: &Cli) -> Result<bool> {
    let params = ApiParams::load(&cli.config)
        .with_context(|| format!("failed to load settings from {}", cli.config.display()))?;

    match &cli.command {
        Command::Codelist(args) => {
            let registry = Registry::connect(params, credentials(cli, false)?);
            run_codelist(&registry, args)
        }
        Command::AddItems(args) => {
            let registry = Registry::connect(params, credentials(cli, true)?);
            run_add_items(&registry, args)
        }
        Command::Validate(args) => {
            let registry = Registry::connect(params, credentials(cli, true)?);
            run_validate(&registry, args)
        }
        Command::ValidateBatch(args) => {
            let registry = Registry::connect(params, credentials(cli, !args.skip)?);
            run_validate_batch(&registry, args)
        }
    }
}

/// Credentials from `--user`/`--password` (or `FMR_USER`/`FMR_PASSWORD`).
fn credentials(cli: &Cli, required: bool) -> Result<Credentials> {
    match (&cli.user, &cli.password) {
        (Some(user), Some(password)) => Ok(Credentials::new(user.as_str(), password.as_str())),
        _ if required => anyhow::bail!("registry credentials are required, set FMR_USER and FMR_PASSWORD"),
        _ => Ok(Credentials::new("", "")),
    }
}
