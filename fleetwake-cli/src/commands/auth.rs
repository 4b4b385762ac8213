//! Credential bootstrap commands: seed, exchange, authorize-url.
//!
//! The browser consent step itself happens outside fleetwake; these commands
//! cover the parts around it.

use anyhow::{Context, Result};
use clap::Args;
use fleetwake_core::Clock;
use fleetwake_store::CredentialStore;
use tracing::info;

use super::Runtime;
use crate::output::{CredentialStatus, JsonFormatter, TextFormatter};
use crate::{Cli, ExitCode, OutputFormat};

/// Arguments for the seed command.
#[derive(Args)]
pub struct SeedArgs {
    /// Refresh token to store.
    #[arg(long, env = "TESLA_REFRESH_TOKEN", hide_env_values = true)]
    pub refresh_token: String,
}

/// Arguments for the exchange command.
#[derive(Args)]
pub struct ExchangeArgs {
    /// Authorization code from the redirect.
    #[arg(long)]
    pub code: String,
}

/// Arguments for the authorize-url command.
#[derive(Args)]
pub struct AuthorizeUrlArgs {
    /// Opaque state echoed back on the redirect.
    #[arg(long)]
    pub state: Option<String>,
}

/// Stores a refresh token; the next poll refreshes before reading.
pub async fn seed(args: &SeedArgs, cli: &Cli) -> Result<ExitCode> {
    let rt = Runtime::new(cli.settings.to_config()?)?;
    let store = rt.credentials()?;
    store
        .seed(&args.refresh_token)
        .await
        .with_context(|| format!("writing {}", store.path().display()))?;

    print_credential(&rt, &store, cli).await?;
    Ok(ExitCode::Success)
}

/// Performs the authorization-code grant and stores the tokens.
pub async fn exchange(args: &ExchangeArgs, cli: &Cli) -> Result<ExitCode> {
    let rt = Runtime::new(cli.settings.to_config()?)?;
    let client = rt.token_client()?;
    let store = rt.credentials()?;

    let grant = client
        .exchange_code(args.code.trim())
        .await
        .context("exchanging authorization code")?;
    if grant.refresh_token.is_none() {
        anyhow::bail!("token response has no refresh token; is offline_access among the scopes?");
    }
    store.store_grant(grant).await?;
    info!(path = %store.path().display(), "Stored credential");

    print_credential(&rt, &store, cli).await?;
    Ok(ExitCode::Success)
}

/// Prints the consent URL.
pub fn authorize_url(args: &AuthorizeUrlArgs, cli: &Cli) -> Result<ExitCode> {
    let rt = Runtime::new(cli.settings.to_config()?)?;
    let client = rt.token_client()?;
    let state = args
        .state
        .clone()
        .unwrap_or_else(|| format!("fleetwake-{}", rt.clock.now_utc().timestamp_millis()));
    let url = client.authorize_url(&state)?;

    match cli.format {
        OutputFormat::Text => println!("{url}"),
        OutputFormat::Json => {
            let formatter = JsonFormatter::new(cli.pretty);
            let output = serde_json::json!({ "url": url.as_str(), "state": state });
            println!("{}", formatter.format(&output)?);
        }
    }
    Ok(ExitCode::Success)
}

async fn print_credential(rt: &Runtime, store: &CredentialStore, cli: &Cli) -> Result<()> {
    if cli.quiet {
        return Ok(());
    }
    let credential = store.load().await?;
    let status = CredentialStatus::from_credential(credential.as_ref(), rt.clock.now_utc());
    match cli.format {
        OutputFormat::Text => {
            let formatter = TextFormatter::new(!cli.no_color);
            println!("{}", formatter.format_credential(&status));
        }
        OutputFormat::Json => {
            let formatter = JsonFormatter::new(cli.pretty);
            println!("{}", formatter.format(&status)?);
        }
    }
    Ok(())
}
