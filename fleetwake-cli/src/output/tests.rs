//! CLI output formatting tests.
//!
//! These tests verify that poll and status output is correctly formatted
//! for both text and JSON output modes.

use chrono::{DateTime, NaiveDate, Utc};
use fleetwake_core::{
    Credential, LogRecord, QuietWindow, Region, SkipReason, VehicleData, VehicleSnapshot,
    WakePolicy,
};
use fleetwake_fetch::WakeAck;
use fleetwake_poller::{Phase, PollError, PollOutcome, PollReport, PollTrace, ReadAttempt};

use super::{
    BudgetStatus, CredentialStatus, JsonFormatter, PollOutput, QuietStatus, RegistrationOutput,
    StatusOutput, TextFormatter,
};

fn now() -> DateTime<Utc> {
    "2025-03-01T08:00:00Z".parse().unwrap()
}

fn snapshot(woke: bool) -> VehicleSnapshot {
    let data = VehicleData::from_value(serde_json::json!({
        "state": "online",
        "charge_state": {"battery_level": 64, "charging_state": "Charging", "battery_range": 150.0},
        "vehicle_state": {"odometer": 12345.67}
    }))
    .unwrap();
    VehicleSnapshot::from_data(&data, now(), woke, Region::Eu)
}

fn read(phase: Phase, error: Option<&str>) -> ReadAttempt {
    ReadAttempt {
        ts: now(),
        phase,
        class: None,
        error: error.map(str::to_string),
    }
}

fn woken_report() -> PollReport {
    let trace = PollTrace {
        phases: vec![Phase::Reading, Phase::Unavailable, Phase::Waking],
        reads: vec![
            read(Phase::Reading, Some("asleep")),
            read(Phase::PollingAfterWake, Some("asleep")),
            read(Phase::PollingAfterWake, None),
        ],
        wakes: vec![now()],
        wake_ack: Some(WakeAck::Accepted {
            state: Some("asleep".into()),
        }),
        vehicle_id: Some("42".into()),
    };
    PollReport {
        outcome: PollOutcome::Success {
            snapshot: snapshot(true),
            woke: true,
        },
        trace,
        finished_at: now(),
    }
}

fn report(outcome: PollOutcome) -> PollReport {
    PollReport {
        outcome,
        trace: PollTrace::default(),
        finished_at: now(),
    }
}

fn status() -> StatusOutput {
    StatusOutput {
        now: now(),
        region: Region::Eu,
        wake_policy: WakePolicy::OnFail,
        credential: CredentialStatus::from_credential(None, now()),
        wake_budget: BudgetStatus {
            date: NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
            used: 4,
            max: 16,
            remaining: 12,
        },
        quiet: QuietStatus {
            window: Some("00:00-07:30".into()),
            active: false,
        },
        last_success: None,
        wakes_last_7_days: 9,
        polls_last_7_days: 40,
        last_record: None,
        registration: None,
    }
}

mod text_formatter_tests {
    use super::*;

    #[test]
    fn test_progress_bar_boundary_values() {
        let formatter = TextFormatter::new(false);

        let test_cases = vec![
            (0.0, "░░░░░░░░░░"),
            (10.0, "█░░░░░░░░░"),
            (25.0, "███░░░░░░░"), // 2.5 rounds to 3 blocks
            (50.0, "█████░░░░░"),
            (75.0, "████████░░"),
            (100.0, "██████████"),
        ];

        for (percent, expected) in test_cases {
            assert_eq!(formatter.progress_bar(percent), expected, "Failed for {percent}%");
        }
    }

    #[test]
    fn test_format_poll_success() {
        let formatter = TextFormatter::new(false);
        let output = formatter.format_poll(&woken_report());

        assert!(output.contains("Poll: success"));
        assert!(output.contains("64%"));
        assert!(output.contains("Charging"));
        assert!(output.contains("241.4 km"));
        assert!(output.contains("12345.7 km"));
        assert!(output.contains("via wake"));
        assert!(output.contains("Vehicle:   42"));
        assert!(output.contains("3 (2 after wake)"));
        assert!(output.contains("accepted (asleep)"));
    }

    #[test]
    fn test_format_poll_quiet_skip() {
        let formatter = TextFormatter::new(false);
        let window = QuietWindow::parse("00:00-07:30").unwrap();
        let output = formatter.format_poll(&report(PollOutcome::QuietBlocked { window }));

        assert!(output.contains("quiet_blocked"));
        assert!(output.contains("00:00-07:30"));
        assert!(output.contains("not issued"));
        assert!(!output.contains("Battery"));
    }

    #[test]
    fn test_format_poll_failure_colored() {
        let formatter = TextFormatter::new(true);
        let output = formatter.format_poll(&report(PollOutcome::Fatal(PollError::Auth(
            "invalid_grant".into(),
        ))));

        assert!(output.contains("\x1b[31mfatal"));
        assert!(output.contains("invalid_grant"));
    }

    #[test]
    fn test_format_poll_rejected_wake() {
        let formatter = TextFormatter::new(false);
        let mut report = report(PollOutcome::Timeout { attempts: 7 });
        report.trace.wake_ack = Some(WakeAck::Rejected {
            status: 408,
            message: "offline".into(),
        });
        let output = formatter.format_poll(&report);

        assert!(output.contains("timeout"));
        assert!(output.contains("rejected: HTTP 408 offline"));
    }

    #[test]
    fn test_format_status() {
        let formatter = TextFormatter::new(false);
        let output = formatter.format_status(&status());

        assert!(output.contains("Region: eu"));
        assert!(output.contains("Wake policy: onfail"));
        assert!(output.contains("missing"));
        assert!(output.contains("4/16 used (2025-03-01)"));
        assert!(output.contains("00:00-07:30"));
        assert!(!output.contains("(active)"));
        assert!(output.contains("never"));
        assert!(output.contains("40 polls, 9 wakes"));
        assert!(!output.contains("Partner"));
    }

    #[test]
    fn test_format_status_last_record() {
        let formatter = TextFormatter::new(false);
        let mut status = status();
        status.quiet.active = true;
        status.last_success = Some(now() - chrono::Duration::minutes(5));
        status.last_record = Some(LogRecord::skipped(
            now() - chrono::Duration::hours(2),
            SkipReason::WakeQuota,
            "vehicle unavailable, 16/16 wakes used today",
        ));
        status.registration = Some(RegistrationOutput {
            domain: Some("example.com".into()),
            registered: Some(false),
            error: None,
        });
        let output = formatter.format_status(&status);

        assert!(output.contains("(active)"));
        assert!(output.contains("5 minutes ago"));
        assert!(output.contains("16/16 wakes used today 2 hours ago"));
        assert!(output.contains("example.com: not registered"));
    }

    #[test]
    fn test_format_credential_states() {
        let formatter = TextFormatter::new(false);

        let seeded = Credential::from_refresh_token("r");
        let status = CredentialStatus::from_credential(Some(&seeded), now());
        assert!(formatter.format_credential(&status).contains("refresh on next run"));

        let mut valid = Credential::from_refresh_token("r");
        valid.access_token = Some("a".into());
        valid.expires_at = Some(now() + chrono::Duration::hours(1));
        let status = CredentialStatus::from_credential(Some(&valid), now());
        assert!(formatter.format_credential(&status).contains("valid until"));

        let mut no_refresh = valid.clone();
        no_refresh.refresh_token = None;
        let status = CredentialStatus::from_credential(Some(&no_refresh), now());
        assert!(formatter.format_credential(&status).contains("no refresh token"));
    }
}

mod json_formatter_tests {
    use super::*;

    #[test]
    fn test_poll_output_success() {
        let output = PollOutput::from_report(&woken_report());
        let json: serde_json::Value =
            serde_json::from_str(&JsonFormatter::new(false).format(&output).unwrap()).unwrap();

        assert_eq!(json["outcome"], "success");
        assert_eq!(json["vehicleId"], "42");
        assert_eq!(json["reads"], 3);
        assert_eq!(json["wakes"], 1);
        assert_eq!(json["postWakeAttempts"], 2);
        assert_eq!(json["wakeAck"], "accepted (asleep)");
        assert_eq!(json["snapshot"]["soc_percent"], 64.0);
        assert_eq!(json["snapshot"]["awake_via"], "wake");
        assert_eq!(json["finishedAt"], "2025-03-01T08:00:00+00:00");
    }

    #[test]
    fn test_poll_output_skip_omits_snapshot() {
        let output = PollOutput::from_report(&report(PollOutcome::QuotaBlocked { used: 16, max: 16 }));
        let json = serde_json::to_value(&output).unwrap();

        assert_eq!(json["outcome"], "quota_blocked");
        assert!(json.get("snapshot").is_none());
        assert!(json.get("wakeAck").is_none());
        assert!(json["message"].as_str().unwrap().contains("16/16"));
    }

    #[test]
    fn test_status_output_shape() {
        let json = serde_json::to_value(status()).unwrap();

        assert_eq!(json["region"], "eu");
        assert_eq!(json["wakePolicy"], "onfail");
        assert_eq!(json["wakeBudget"]["remaining"], 12);
        assert_eq!(json["wakeBudget"]["date"], "2025-03-01");
        assert_eq!(json["quiet"]["active"], false);
        assert_eq!(json["credential"]["present"], false);
        assert!(json.get("lastSuccess").is_none());
        assert!(json.get("registration").is_none());
    }

    #[test]
    fn test_status_output_record_passthrough() {
        let mut status = status();
        status.last_record = Some(LogRecord::failure(now(), "boom"));
        let json = serde_json::to_value(status).unwrap();
        assert_eq!(json["lastRecord"]["error"], "boom");
    }
}
