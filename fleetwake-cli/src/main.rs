// Lint configuration for this crate
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! fleetwake CLI - budgeted wake-and-poll vehicle telemetry logger.
//!
//! Meant to be run periodically by a scheduler (cron, systemd timer, CI).
//! Every run appends exactly one line to the log.
//!
//! # Examples
//!
//! ```bash
//! # One poll cycle (the default command)
//! fleetwake
//!
//! # Never wake, only read if the car is already awake
//! WAKE_POLICY=never fleetwake poll
//!
//! # Budget, credential and last success
//! fleetwake status --registration
//!
//! # First-time setup
//! fleetwake authorize-url
//! fleetwake exchange --code NA_abc...
//! # or
//! fleetwake seed --refresh-token NA_def...
//! ```

mod commands;
mod output;
mod settings;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use fleetwake_store::{CredentialError, StoreError};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use commands::{auth, config, poll, status};
use settings::SettingsArgs;

// ============================================================================
// CLI Definition
// ============================================================================

/// fleetwake CLI - vehicle telemetry logger.
#[derive(Parser)]
#[command(name = "fleetwake")]
#[command(about = "Budgeted wake-and-poll telemetry logger for a single vehicle")]
#[command(long_about = r#"
fleetwake reads a vehicle's state of charge through the Fleet API and appends
it to a JSON-lines log. When the vehicle is asleep it may wake it, limited by
a daily wake budget and a quiet time-of-day window.

Every setting can be given as a flag or through the environment variable
shown in --help.

Exit codes:
  0  read succeeded, or run skipped by quota (or quiet window)
  1  fatal error
  2  configuration error
  3  authentication error (re-authorize)
  4  vehicle did not wake in time
  5  another run holds the lock

Examples:
  fleetwake                      # One poll cycle
  fleetwake status               # Budget and credential state
  fleetwake --format json        # JSON output
"#)]
#[command(version)]
pub struct Cli {
    /// Subcommand to run. If none, runs 'poll' by default.
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Output format (text or json).
    #[arg(long, short = 'f', default_value = "text", global = true)]
    pub format: OutputFormat,

    /// Pretty-print JSON output.
    #[arg(long, global = true)]
    pub pretty: bool,

    /// Verbose output (show debug info).
    #[arg(long, short, global = true)]
    pub verbose: bool,

    /// Disable colored output.
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Quiet mode (no logging, minimal output).
    #[arg(long, short, global = true)]
    pub quiet: bool,

    /// Run settings.
    #[command(flatten)]
    pub settings: SettingsArgs,
}

/// CLI commands.
#[derive(Subcommand)]
pub enum Commands {
    /// Run one read/wake/poll cycle (default if no command specified).
    #[command(visible_alias = "p")]
    Poll,

    /// Show wake budget, credential and last run.
    #[command(visible_alias = "s")]
    Status(status::StatusArgs),

    /// Store a refresh token obtained elsewhere.
    Seed(auth::SeedArgs),

    /// Exchange an authorization code for tokens.
    Exchange(auth::ExchangeArgs),

    /// Print the authorization URL to open in a browser.
    AuthorizeUrl(auth::AuthorizeUrlArgs),

    /// Show effective configuration.
    Config(config::ConfigArgs),
}

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
pub enum OutputFormat {
    /// Human-readable text with colors.
    #[default]
    Text,
    /// JSON output for scripting.
    Json,
}

/// CLI exit codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    /// Success or planned skip.
    Success = 0,
    /// General error.
    Error = 1,
    /// Invalid or missing configuration.
    Config = 2,
    /// Credential missing or rejected.
    Auth = 3,
    /// Vehicle did not become available after the wake.
    Timeout = 4,
    /// Another run is in progress.
    Locked = 5,
}

impl ExitCode {
    /// Exit code for an error that escaped a command.
    pub fn for_error(err: &anyhow::Error) -> Self {
        for cause in err.chain() {
            if cause.downcast_ref::<CredentialError>().is_some() {
                return Self::Auth;
            }
            match cause.downcast_ref::<StoreError>() {
                Some(StoreError::Config(_)) => return Self::Config,
                Some(StoreError::Locked(_)) => return Self::Locked,
                _ => {}
            }
        }
        Self::Error
    }
}

// ============================================================================
// Logging Setup
// ============================================================================

fn setup_logging(verbose: bool, quiet: bool) {
    if quiet {
        return; // No logging in quiet mode
    }

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("fleetwake=debug,info")
        } else {
            EnvFilter::new("fleetwake=info")
        }
    });

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(false)
                .without_time()
                .with_writer(std::io::stderr),
        )
        .with(filter)
        .init();
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    let result = match &cli.command {
        Some(Commands::Poll) | None => poll::run(&cli).await,
        Some(Commands::Status(args)) => status::run(args, &cli).await,
        Some(Commands::Seed(args)) => auth::seed(args, &cli).await,
        Some(Commands::Exchange(args)) => auth::exchange(args, &cli).await,
        Some(Commands::AuthorizeUrl(args)) => auth::authorize_url(args, &cli),
        Some(Commands::Config(args)) => config::run(args, &cli),
    };

    let code = match result {
        Ok(code) => code,
        Err(e) => {
            if !cli.quiet {
                eprintln!("Error: {e:#}");
            }
            ExitCode::for_error(&e)
        }
    };

    std::process::exit(code as i32);
}
