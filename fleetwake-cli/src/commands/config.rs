//! Config command - show effective configuration.

use anyhow::Result;
use clap::{Args, Subcommand};

use crate::output::JsonFormatter;
use crate::{Cli, ExitCode, OutputFormat};

/// Arguments for the config command.
#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

/// Config subcommands.
#[derive(Subcommand)]
pub enum ConfigAction {
    /// Show effective configuration (secrets omitted).
    Show,

    /// Show state and log file paths.
    Path,
}

/// Runs the config command.
pub fn run(args: &ConfigArgs, cli: &Cli) -> Result<ExitCode> {
    match &args.action {
        ConfigAction::Show => show_config(cli)?,
        ConfigAction::Path => show_paths(cli)?,
    }
    Ok(ExitCode::Success)
}

fn show_config(cli: &Cli) -> Result<()> {
    let config = cli.settings.to_config()?;

    match cli.format {
        OutputFormat::Text => {
            println!("fleetwake Configuration");
            println!("{}", "─".repeat(40));
            println!();
            println!("Region:           {} ({})", config.region, config.api_base());
            println!(
                "Vehicle:          {}",
                config.vehicle_tag.as_deref().unwrap_or("(not set)")
            );
            println!(
                "Client id:        {}",
                config.oauth.client_id.as_deref().unwrap_or("(not set)")
            );
            println!(
                "Client secret:    {}",
                if config.oauth.client_secret.is_some() { "set" } else { "(not set)" }
            );
            println!("Wake policy:      {}", config.wake.policy);
            println!("Quiet window:     {}", config.wake.quiet_window);
            println!("Max wakes/day:    {}", config.wake.max_per_day);
            println!(
                "Post-wake reads:  {} x {}s",
                config.wake.post_wake_attempts, config.wake.post_wake_delay_secs
            );
            println!(
                "Registration:     {}",
                config.registration.effective_domain().unwrap_or("disabled")
            );
            println!("Exit 0 on quiet:  {}", config.exit_zero_on_quiet);
        }
        OutputFormat::Json => {
            let formatter = JsonFormatter::new(cli.pretty);
            println!("{}", formatter.format(&config)?);
        }
    }

    Ok(())
}

fn show_paths(cli: &Cli) -> Result<()> {
    let config = cli.settings.to_config()?;
    let paths = &config.paths;

    match cli.format {
        OutputFormat::Text => {
            println!("State Paths");
            println!("{}", "─".repeat(40));
            println!();
            println!("Log file:      {}", paths.log_file.display());
            println!("Wake counter:  {}", paths.wake_counter.display());
            println!("Credential:    {}", paths.tokens.display());
            println!("Run state:     {}", paths.state.display());
            println!("Run lock:      {}", paths.lock_file().display());
        }
        OutputFormat::Json => {
            let formatter = JsonFormatter::new(cli.pretty);
            let mut value = serde_json::to_value(paths)?;
            value["lock_file"] = serde_json::Value::String(paths.lock_file().display().to_string());
            println!("{}", formatter.format(&value)?);
        }
    }

    Ok(())
}
