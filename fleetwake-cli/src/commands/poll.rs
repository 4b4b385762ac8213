//! Poll command - one read/wake/poll cycle.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use fleetwake_core::{Clock, LogRecord, SystemClock};
use fleetwake_poller::{
    AvailabilityPoller, PollError, PollOutcome, PollReport, PollerSettings, RegistrationGuard,
};
use fleetwake_store::{Config, RunLock, RunLog, RunState, WakeBudget};
use tracing::{debug, info, warn};

use super::Runtime;
use crate::output::{JsonFormatter, PollOutput, TextFormatter};
use crate::{Cli, ExitCode, OutputFormat};

/// Runs the poll command.
pub async fn run(cli: &Cli) -> Result<ExitCode> {
    let config = cli.settings.to_config()?;
    let log = RunLog::new(&config.paths.log_file);

    let (_lock, rt, poller) = match prepare(config) {
        Ok(parts) => parts,
        Err(e) => {
            record_setup_failure(&log, &e, SystemClock.now_utc()).await;
            return Err(e);
        }
    };
    let report = poller.run().await;

    record(&rt, &report).await;
    print_report(&report, cli)?;

    Ok(exit_code(&report.outcome, rt.config.exit_zero_on_quiet))
}

/// Takes the run lock and wires the poller.
fn prepare(config: Config) -> Result<(RunLock, Runtime, AvailabilityPoller)> {
    let settings = PollerSettings::from_config(&config)?;

    let lock = RunLock::acquire(&config.paths.lock_file()).context("acquiring run lock")?;

    let rt = Runtime::new(config)?;
    let credentials = rt.credentials()?;
    let budget = WakeBudget::new(&rt.config.paths.wake_counter, rt.clock.clone());
    let registration = RegistrationGuard::from_config(rt.fleet.clone(), &rt.config.registration);

    info!(
        vehicle = %settings.vehicle,
        region = %settings.region,
        policy = %settings.wake_policy,
        "Starting poll"
    );

    let poller = AvailabilityPoller::new(
        rt.fleet.clone(),
        credentials,
        budget,
        registration,
        rt.clock.clone(),
        settings,
    );
    Ok((lock, rt, poller))
}

/// Logs a run that failed before the poller started.
async fn record_setup_failure(log: &RunLog, err: &anyhow::Error, ts: DateTime<Utc>) {
    let record = LogRecord::failure(ts, format!("{err:#}"));
    if let Err(e) = log.append(&record).await {
        warn!(path = %log.path().display(), error = %e, "Failed to append log record");
    }
}

/// Appends the outcome to the log and updates the run state.
///
/// Failures here are logged; the run's own outcome decides the exit code.
async fn record(rt: &Runtime, report: &PollReport) {
    let log = RunLog::new(&rt.config.paths.log_file);
    if let Err(e) = log.append(&report.to_record()).await {
        warn!(path = %log.path().display(), error = %e, "Failed to append log record");
    }

    let path = &rt.config.paths.state;
    let mut state = RunState::load(path).await;
    state.record(
        &report.trace.read_times(),
        &report.trace.wakes,
        report.success_at(),
    );
    match state.save(path, report.finished_at).await {
        Ok(()) => debug!(path = %path.display(), "Run state updated"),
        Err(e) => warn!(path = %path.display(), error = %e, "Failed to save run state"),
    }
}

fn print_report(report: &PollReport, cli: &Cli) -> Result<()> {
    if cli.quiet {
        return Ok(());
    }
    match cli.format {
        OutputFormat::Text => {
            let formatter = TextFormatter::new(!cli.no_color);
            println!("{}", formatter.format_poll(report));
        }
        OutputFormat::Json => {
            let formatter = JsonFormatter::new(cli.pretty);
            println!("{}", formatter.format(&PollOutput::from_report(report))?);
        }
    }
    Ok(())
}

/// Maps an outcome to the process exit code.
pub fn exit_code(outcome: &PollOutcome, exit_zero_on_quiet: bool) -> ExitCode {
    match outcome {
        PollOutcome::Success { .. } | PollOutcome::QuotaBlocked { .. } => ExitCode::Success,
        PollOutcome::QuietBlocked { .. } if exit_zero_on_quiet => ExitCode::Success,
        PollOutcome::QuietBlocked { .. } => ExitCode::Error,
        PollOutcome::Timeout { .. } => ExitCode::Timeout,
        PollOutcome::Fatal(PollError::Auth(_)) => ExitCode::Auth,
        PollOutcome::Fatal(_) => ExitCode::Error,
    }
}
