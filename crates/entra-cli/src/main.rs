//! # entra-appreg
//!
//! Provision and validate Entra ID app registrations from the command line.
//!
//! ## Commands
//!
//! - `provision`: converge registration, service principal, role assignment
//!   and (unless `--skip-secret`) mint a client secret
//! - `plan`: print what `provision` would do
//! - `validate`: report whether a registration allows multitenant sign-in
//! - `infra render`: write the ARM template for the supporting resources
//!
//! Every failure is logged and exits with status 1. Help and version exit 0.

#![deny(unsafe_code)]

mod cli;
mod commands;
mod logging;

use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use clap::error::ErrorKind;
use entra_directory::{AzCliDirectory, RetryPolicy, Retrying, XshellRunner};
use entra_provision::Settings;
use entra_provision::config::{ConfigError, DEFAULT_LOG_FILE};

use crate::cli::{Cli, Command, InfraCommand};
use crate::commands::ProvisionOptions;

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            return match err.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => ExitCode::SUCCESS,
                _ => ExitCode::from(1),
            };
        }
    };

    // Settings come first: LOG_FILE decides where the log goes.
    let settings = cli.config_path().map(Settings::from_file);
    let log_path = log_path(&cli, settings.as_ref().and_then(|s| s.as_ref().ok()));

    if let Err(err) = logging::init(cli.verbose, &log_path) {
        eprintln!("error: {err:#}");
        return ExitCode::from(1);
    }
    tracing::debug!(log_file = %log_path.display(), "logging initialized");

    match run(cli, settings) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let code = match err.downcast_ref::<entra_provision::Error>() {
                Some(known) => {
                    tracing::error!(kind = known.kind(), "{known}");
                    known.exit_code()
                }
                None => {
                    tracing::error!("{err:#}");
                    1
                }
            };
            ExitCode::from(u8::try_from(code).unwrap_or(1))
        }
    }
}

fn log_path(cli: &Cli, settings: Option<&Settings>) -> PathBuf {
    cli.log_file
        .clone()
        .or_else(|| settings.map(|s| s.log_file.clone()))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_FILE))
}

fn az_directory(retry: RetryPolicy) -> Result<Retrying<AzCliDirectory<XshellRunner>>> {
    let runner = XshellRunner::new().map_err(entra_provision::Error::from)?;
    Ok(Retrying::new(AzCliDirectory::new(runner), retry))
}

fn loaded(settings: Option<Result<Settings, ConfigError>>) -> Result<Settings> {
    match settings {
        Some(result) => Ok(result.map_err(entra_provision::Error::from)?),
        None => Err(anyhow::anyhow!("no settings file given")),
    }
}

fn run(cli: Cli, settings: Option<Result<Settings, ConfigError>>) -> Result<()> {
    let mut out = io::stdout().lock();
    match cli.command {
        Command::Provision {
            skip_secret,
            dry_run,
            redirect_policy,
            ..
        } => {
            let settings = commands::with_overrides(
                loaded(settings)?,
                ProvisionOptions {
                    skip_secret,
                    redirect_policy,
                },
            );
            let directory = az_directory(settings.retry.clone())?;
            commands::provision(directory, &settings, dry_run, &mut out)
        }
        Command::Plan { .. } => {
            let settings = loaded(settings)?;
            let directory = az_directory(settings.retry.clone())?;
            commands::plan(directory, &settings, &mut out)
        }
        Command::Validate { app_id, json } => {
            let directory = az_directory(RetryPolicy::default())?;
            commands::validate(directory, &app_id, json, &mut out)
        }
        Command::Infra {
            command: InfraCommand::Render(args),
        } => commands::render(&args, &mut out),
    }
}
