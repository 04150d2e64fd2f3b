//! Command-line surface.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use entra_provision::RedirectPolicy;

#[derive(Debug, Parser)]
#[command(
    name = "entra-appreg",
    version,
    about = "Provision and validate Entra ID app registrations"
)]
pub struct Cli {
    /// Append logs to this file (default: LOG_FILE from the config, or app_registration.log)
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// More log output (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Converge the registration, service principal and role assignment
    Provision {
        /// Settings file (KEY=value lines)
        #[arg(long, value_name = "FILE")]
        config: PathBuf,
        /// Do not mint a client secret
        #[arg(long)]
        skip_secret: bool,
        /// Print the plan without changing anything
        #[arg(long)]
        dry_run: bool,
        /// Override REDIRECT_URI_POLICY (preserve, merge, replace)
        #[arg(long, value_name = "POLICY")]
        redirect_policy: Option<RedirectPolicy>,
    },
    /// Print what provision would do
    Plan {
        /// Settings file (KEY=value lines)
        #[arg(long, value_name = "FILE")]
        config: PathBuf,
    },
    /// Report whether a registration is set up for multitenant sign-in
    Validate {
        /// Application (client) id
        app_id: String,
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Declarative infrastructure templates
    Infra {
        #[command(subcommand)]
        command: InfraCommand,
    },
}

#[derive(Debug, Subcommand)]
pub enum InfraCommand {
    /// Render the ARM deployment template
    Render(RenderArgs),
}

#[derive(Debug, Args)]
pub struct RenderArgs {
    /// Environment name (lowercase letters, digits, hyphens)
    #[arg(long, value_name = "E")]
    pub environment: String,
    /// Azure region
    #[arg(long, value_name = "L")]
    pub location: String,
    /// Scope id the resource token is derived from
    #[arg(long, value_name = "S")]
    pub scope: String,
    /// Also grant AcrPull to this principal
    #[arg(long, value_name = "ID")]
    pub principal_id: Option<String>,
    /// API Management publisher email
    #[arg(long, value_name = "M")]
    pub publisher_email: Option<String>,
    /// API Management publisher name
    #[arg(long, value_name = "N")]
    pub publisher_name: Option<String>,
    /// API Management SKU
    #[arg(long, value_name = "SKU")]
    pub sku: Option<String>,
    /// Extra tag, repeatable
    #[arg(long = "tag", value_name = "KEY=VALUE", value_parser = parse_tag)]
    pub tags: Vec<(String, String)>,
    /// Write the template here instead of stdout
    #[arg(long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

fn parse_tag(raw: &str) -> Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got `{raw}`"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("tag `{raw}` has an empty key"));
    }
    Ok((key.to_string(), value.trim().to_string()))
}

impl Cli {
    /// Settings file named by the subcommand, if any.
    pub fn config_path(&self) -> Option<&PathBuf> {
        match &self.command {
            Command::Provision { config, .. } | Command::Plan { config } => Some(config),
            Command::Validate { .. } | Command::Infra { .. } => None,
        }
    }
}
