//! Subcommand implementations.
//!
//! Each command takes the directory and the output stream as parameters so
//! it can run against the in-memory directory in tests. Command output goes
//! to `out`; diagnostics go through `tracing`.

use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use entra_directory::Directory;
use entra_infra::{Deployment, InfraParams};
use entra_provision::{Provisioner, RedirectPolicy, Settings};

use crate::cli::RenderArgs;

/// Per-invocation overrides for `provision`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProvisionOptions {
    pub skip_secret: bool,
    pub redirect_policy: Option<RedirectPolicy>,
}

/// Apply command-line overrides to file settings.
pub fn with_overrides(settings: Settings, options: ProvisionOptions) -> Settings {
    let settings = settings.mint_secret(!options.skip_secret);
    match options.redirect_policy {
        Some(policy) => settings.redirect_policy(policy),
        None => settings,
    }
}

pub fn provision<D: Directory>(
    directory: D,
    settings: &Settings,
    dry_run: bool,
    out: &mut impl Write,
) -> Result<()> {
    let provisioner = Provisioner::new(directory);
    if dry_run {
        let preview = provisioner.preview(settings)?;
        write!(out, "{preview}")?;
        writeln!(out, "Dry run: nothing was changed.")?;
        return Ok(());
    }

    let summary = provisioner.provision(settings)?;
    write!(out, "{summary}")?;
    if let Some(secret) = &summary.secret {
        writeln!(out)?;
        writeln!(
            out,
            "Client secret (shown once, store it now): {}",
            secret.expose()
        )?;
    }
    Ok(())
}

pub fn plan<D: Directory>(directory: D, settings: &Settings, out: &mut impl Write) -> Result<()> {
    let preview = Provisioner::new(directory).preview(settings)?;
    write!(out, "{preview}")?;
    Ok(())
}

pub fn validate<D: Directory>(
    directory: D,
    app_id: &str,
    json: bool,
    out: &mut impl Write,
) -> Result<()> {
    let report = entra_provision::validate(&directory, app_id)?;
    if json {
        writeln!(out, "{}", report.to_json()?)?;
    } else {
        write!(out, "{report}")?;
    }
    Ok(())
}

pub fn render(args: &RenderArgs, out: &mut impl Write) -> Result<()> {
    let mut params = InfraParams::new(&args.environment, &args.location, &args.scope);
    if let Some(principal) = &args.principal_id {
        params = params.principal_id(principal);
    }
    if args.publisher_email.is_some() || args.publisher_name.is_some() {
        let email = args
            .publisher_email
            .clone()
            .unwrap_or_else(|| params.publisher_email.clone());
        let name = args
            .publisher_name
            .clone()
            .unwrap_or_else(|| params.publisher_name.clone());
        params = params.publisher(email, name);
    }
    if let Some(sku) = &args.sku {
        params = params.apim_sku(sku);
    }
    for (key, value) in &args.tags {
        params = params.tag(key, value);
    }

    let deployment = Deployment::declare(&params)?;
    let json = deployment.to_json_pretty()?;
    tracing::info!(
        environment = %params.environment_name,
        token = %deployment.names.token,
        resources = deployment.resources.len(),
        "declared deployment"
    );

    match &args.output {
        Some(path) => write_template(path, &json),
        None => {
            writeln!(out, "{json}")?;
            Ok(())
        }
    }
}

fn write_template(path: &Path, json: &str) -> Result<()> {
    std::fs::write(path, format!("{json}\n"))
        .with_context(|| format!("cannot write template to {}", path.display()))?;
    tracing::info!(path = %path.display(), "wrote ARM template");
    Ok(())
}
