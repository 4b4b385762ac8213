//! Status command - wake budget, credential and run history.

use anyhow::Result;
use chrono::Duration;
use clap::Args;
use fleetwake_core::{Clock, Credential, WakeCounter};
use fleetwake_poller::RegistrationGuard;
use fleetwake_store::{RunLog, RunState, load_json_opt};
use tracing::{debug, warn};

use super::Runtime;
use crate::output::{
    BudgetStatus, CredentialStatus, JsonFormatter, QuietStatus, RegistrationOutput, StatusOutput,
    TextFormatter,
};
use crate::{Cli, ExitCode, OutputFormat};

/// Arguments for the status command.
#[derive(Args, Default)]
pub struct StatusArgs {
    /// Also query partner registration (needs a valid token).
    #[arg(long)]
    pub registration: bool,
}

/// Runs the status command. Reads state files without modifying them.
pub async fn run(args: &StatusArgs, cli: &Cli) -> Result<ExitCode> {
    let config = cli.settings.to_config()?;
    let rt = Runtime::new(config)?;
    let now = rt.clock.now();
    let now_utc = rt.clock.now_utc();
    let paths = &rt.config.paths;

    let credential: Option<Credential> = load_json_opt(&paths.tokens).await.unwrap_or_else(|e| {
        warn!(path = %paths.tokens.display(), error = %e, "Unreadable credential file");
        None
    });
    let credential = CredentialStatus::from_credential(credential.as_ref(), now_utc);

    let today = now.date_naive();
    let mut counter = load_json_opt::<WakeCounter>(&paths.wake_counter)
        .await
        .ok()
        .flatten()
        .unwrap_or_else(|| WakeCounter::new(today));
    counter.roll_over(today);
    let max = rt.config.wake.max_per_day;

    let quiet_policy = rt.config.quiet_policy();
    let state = RunState::load(&paths.state).await;
    let week_ago = now_utc - Duration::days(7);
    let last_record = RunLog::new(&paths.log_file).last().await.unwrap_or_else(|e| {
        debug!(error = %e, "Could not read log");
        None
    });

    let registration = if args.registration {
        Some(registration_status(&rt).await)
    } else {
        None
    };

    let output = StatusOutput {
        now: now_utc,
        region: rt.config.region,
        wake_policy: rt.config.wake.policy,
        credential,
        wake_budget: BudgetStatus {
            date: counter.date,
            used: counter.count,
            max,
            remaining: counter.remaining(max),
        },
        quiet: QuietStatus {
            window: quiet_policy.window().map(|w| w.to_string()),
            active: quiet_policy.is_quiet(&now),
        },
        last_success: state.last_success_iso,
        wakes_last_7_days: state.wakes_since(week_ago),
        polls_last_7_days: state.polls.iter().filter(|ts| **ts >= week_ago).count(),
        last_record,
        registration,
    };

    match cli.format {
        OutputFormat::Text => {
            let formatter = TextFormatter::new(!cli.no_color);
            println!("{}", formatter.format_status(&output));
        }
        OutputFormat::Json => {
            let formatter = JsonFormatter::new(cli.pretty);
            println!("{}", formatter.format(&output)?);
        }
    }

    Ok(ExitCode::Success)
}

async fn registration_status(rt: &Runtime) -> RegistrationOutput {
    let guard = RegistrationGuard::from_config(rt.fleet.clone(), &rt.config.registration);
    let domain = guard.domain().map(str::to_string);
    if domain.is_none() {
        return RegistrationOutput::disabled();
    }

    let token = match rt.credentials() {
        Ok(store) => store.get_valid_access_token().await.map_err(anyhow::Error::from),
        Err(e) => Err(e),
    };
    let result = match token {
        Ok(token) => guard.status(&token).await.map_err(anyhow::Error::from),
        Err(e) => Err(e),
    };

    match result {
        Ok(status) => RegistrationOutput {
            domain,
            registered: status.map(|s| s.registered),
            error: None,
        },
        Err(e) => RegistrationOutput {
            domain,
            registered: None,
            error: Some(format!("{e:#}")),
        },
    }
}
