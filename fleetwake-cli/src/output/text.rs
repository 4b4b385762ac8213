//! Text output formatting with progress bars and colors.

use chrono::{DateTime, Duration, Local, Utc};
use fleetwake_core::{LogRecord, VehicleSnapshot};
use fleetwake_poller::{PollOutcome, PollReport};

use super::json::{describe_ack, outcome_kind};
use super::{CredentialStatus, StatusOutput};

// ============================================================================
// ANSI Colors
// ============================================================================

const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";
const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";
const RED: &str = "\x1b[31m";
const CYAN: &str = "\x1b[36m";

// Progress bar characters
const BAR_FULL: char = '█';
const BAR_EMPTY: char = '░';

/// Text formatter with optional colors.
pub struct TextFormatter {
    use_colors: bool,
    bar_width: usize,
}

impl TextFormatter {
    /// Creates a new text formatter.
    pub fn new(use_colors: bool) -> Self {
        Self {
            use_colors,
            bar_width: 10,
        }
    }

    /// Formats the result of a poll run.
    pub fn format_poll(&self, report: &PollReport) -> String {
        let mut lines = Vec::new();

        let kind = outcome_kind(&report.outcome);
        let badge = match &report.outcome {
            PollOutcome::Success { .. } => self.green(kind),
            PollOutcome::QuotaBlocked { .. } | PollOutcome::QuietBlocked { .. } => {
                self.yellow(kind)
            }
            PollOutcome::Timeout { .. } | PollOutcome::Fatal(_) => self.red(kind),
        };
        lines.push(format!("{} {}", self.bold("Poll:"), badge));
        lines.push(format!("  {}", report.outcome));

        if let Some(snapshot) = report.outcome.snapshot() {
            lines.push(String::new());
            lines.extend(self.format_snapshot(snapshot));
        }

        let trace = &report.trace;
        lines.push(String::new());
        if let Some(id) = &trace.vehicle_id {
            lines.push(format!("Vehicle:   {}", self.cyan(id)));
        }
        lines.push(format!(
            "Reads:     {} ({} after wake)",
            trace.reads.len(),
            trace.post_wake_attempts()
        ));
        match &trace.wake_ack {
            Some(ack) if ack.is_warning() => {
                lines.push(format!("Wake:      {}", self.yellow(&describe_ack(ack))));
            }
            Some(ack) => lines.push(format!("Wake:      {}", describe_ack(ack))),
            None => lines.push(format!("Wake:      {}", self.dim("not issued"))),
        }

        lines.join("\n")
    }

    fn format_snapshot(&self, snapshot: &VehicleSnapshot) -> Vec<String> {
        let mut lines = Vec::new();

        match snapshot.soc_percent {
            Some(soc) => {
                let pct = self.color_for_percent(soc, &format!("{soc:.0}%"));
                lines.push(format!("{:<10} {} {}", "Battery:", self.progress_bar(soc), pct));
            }
            None => lines.push(format!("{:<10} {}", "Battery:", self.dim("n/a"))),
        }

        let charging = if snapshot.is_charging {
            self.green(&snapshot.charging_state)
        } else if snapshot.charging_state.is_empty() {
            self.dim("unknown")
        } else {
            snapshot.charging_state.clone()
        };
        lines.push(format!("{:<10} {}", "Charging:", charging));

        if let Some(range) = snapshot.battery_range_km {
            lines.push(format!("{:<10} {range:.1} km", "Range:"));
        }
        if let Some(odometer) = snapshot.odometer_km {
            lines.push(format!("{:<10} {odometer:.1} km", "Odometer:"));
        }
        lines.push(format!(
            "{:<10} {} via {}",
            "State:",
            snapshot.online_state,
            if snapshot.woke() { "wake" } else { "none" }
        ));

        lines
    }

    /// Formats the status command output.
    pub fn format_status(&self, status: &StatusOutput) -> String {
        let mut lines = Vec::new();

        lines.push(self.bold("fleetwake Status"));
        lines.push("─".repeat(40));
        lines.push(format!(
            "Region: {}   Wake policy: {}",
            status.region, status.wake_policy
        ));
        lines.push(String::new());

        lines.push(self.format_credential(&status.credential));

        let budget = &status.wake_budget;
        let remaining_pct = if budget.max == 0 {
            0.0
        } else {
            f64::from(budget.remaining) / f64::from(budget.max) * 100.0
        };
        lines.push(format!(
            "{:<12} {} {}",
            "Wakes:",
            self.progress_bar(remaining_pct),
            self.color_for_percent(
                remaining_pct,
                &format!("{}/{} used ({})", budget.used, budget.max, budget.date)
            )
        ));

        let quiet = match (&status.quiet.window, status.quiet.active) {
            (Some(window), true) => self.yellow(&format!("{window} (active)")),
            (Some(window), false) => window.clone(),
            (None, _) => self.dim("disabled"),
        };
        lines.push(format!("{:<12} {}", "Quiet:", quiet));

        lines.push(String::new());
        let last_success = status.last_success.map_or_else(
            || self.dim("never"),
            |ts| format_age(ts, status.now),
        );
        lines.push(format!("{:<12} {}", "Last read:", last_success));
        lines.push(format!(
            "{:<12} {} polls, {} wakes",
            "Last 7 days:", status.polls_last_7_days, status.wakes_last_7_days
        ));
        if let Some(record) = &status.last_record {
            lines.push(format!(
                "{:<12} {}",
                "Last line:",
                self.format_record(record, status.now)
            ));
        }

        if let Some(registration) = &status.registration {
            let text = match (&registration.domain, registration.registered, &registration.error) {
                (None, _, _) => self.dim("disabled"),
                (Some(domain), _, Some(error)) => format!("{domain}: {}", self.red(error)),
                (Some(domain), Some(true), None) => format!("{domain}: {}", self.green("registered")),
                (Some(domain), Some(false), None) => {
                    format!("{domain}: {}", self.yellow("not registered"))
                }
                (Some(domain), None, None) => format!("{domain}: {}", self.dim("unknown")),
            };
            lines.push(format!("{:<12} {}", "Partner:", text));
        }

        lines.join("\n")
    }

    /// Formats a credential summary line.
    pub fn format_credential(&self, credential: &CredentialStatus) -> String {
        let state = if !credential.present {
            self.red("missing")
        } else if !credential.has_refresh_token {
            self.red("no refresh token")
        } else if credential.needs_refresh {
            self.yellow("refresh on next run")
        } else {
            let expires = credential
                .expires_at
                .map(|at| at.with_timezone(&Local).format("%H:%M").to_string())
                .unwrap_or_default();
            self.green(&format!("valid until {expires}"))
        };
        format!("{:<12} {}", "Credential:", state)
    }

    fn format_record(&self, record: &LogRecord, now: DateTime<Utc>) -> String {
        let age = self.dim(&format_age(record.ts(), now));
        match record {
            LogRecord::Snapshot(s) => format!(
                "{} {}",
                self.green(&s.soc_percent.map_or_else(|| "read".to_string(), |v| format!("{v:.0}%"))),
                age
            ),
            LogRecord::Skipped(s) => format!("{} {}", self.yellow(&s.detail), age),
            LogRecord::Failure(f) => format!("{} {}", self.red(&f.error), age),
        }
    }

    /// Formats a progress bar.
    pub fn progress_bar(&self, percent: f64) -> String {
        #[allow(
            clippy::cast_possible_truncation,
            clippy::cast_sign_loss,
            clippy::cast_precision_loss
        )]
        let filled = ((percent.clamp(0.0, 100.0) / 100.0) * self.bar_width as f64).round() as usize;
        let empty = self.bar_width.saturating_sub(filled);

        let bar = format!(
            "{}{}",
            BAR_FULL.to_string().repeat(filled),
            BAR_EMPTY.to_string().repeat(empty)
        );

        self.color_for_percent(percent, &bar)
    }

    // ========================================================================
    // Color/style helpers
    // ========================================================================

    fn color_for_percent(&self, percent: f64, text: &str) -> String {
        if !self.use_colors {
            return text.to_string();
        }

        if percent < 20.0 {
            self.red(text)
        } else if percent < 50.0 {
            self.yellow(text)
        } else {
            self.green(text)
        }
    }

    fn paint(&self, color: &str, text: &str) -> String {
        if self.use_colors {
            format!("{color}{text}{RESET}")
        } else {
            text.to_string()
        }
    }

    fn bold(&self, text: &str) -> String {
        self.paint(BOLD, text)
    }

    fn dim(&self, text: &str) -> String {
        self.paint(DIM, text)
    }

    fn green(&self, text: &str) -> String {
        self.paint(GREEN, text)
    }

    fn yellow(&self, text: &str) -> String {
        self.paint(YELLOW, text)
    }

    fn red(&self, text: &str) -> String {
        self.paint(RED, text)
    }

    fn cyan(&self, text: &str) -> String {
        self.paint(CYAN, text)
    }
}

/// Relative age of `ts` as seen at `now`.
pub(crate) fn format_age(ts: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let diff = now - ts;
    if diff < Duration::minutes(1) {
        "just now".to_string()
    } else if diff < Duration::hours(1) {
        let mins = diff.num_minutes();
        format!("{} minute{} ago", mins, if mins == 1 { "" } else { "s" })
    } else if diff < Duration::hours(24) {
        let hours = diff.num_hours();
        let mins = diff.num_minutes() % 60;
        if mins > 0 {
            format!("{hours}h {mins}m ago")
        } else {
            format!("{} hour{} ago", hours, if hours == 1 { "" } else { "s" })
        }
    } else {
        let local = ts.with_timezone(&Local);
        local.format("%a %d %b at %H:%M").to_string()
    }
}

// ============================================================================
// Tests
// ============================================================================
