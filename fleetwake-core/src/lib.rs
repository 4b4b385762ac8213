// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # `fleetwake` Core
//!
//! Core types, models, and pure policies for the `fleetwake` poller.
//!
//! Nothing in this crate performs I/O. It provides:
//!
//! - Domain models (credential, wake counter, vehicle snapshot, log records)
//! - The quiet-window policy (a pure time-of-day check)
//! - Wake policy and API region selectors
//! - A [`Clock`] abstraction so callers can pin "now" in tests
//!
//! ## Key Types
//!
//! ### Credentials
//! - [`Credential`] - Persisted OAuth credential
//! - [`TokenGrant`] - Token endpoint response, applied onto a credential
//!
//! ### Policy
//! - [`QuietWindow`] / [`QuietWindowPolicy`] - Time-of-day wake blackout
//! - [`WakePolicy`] - Whether waking is allowed at all
//! - [`WakeCounter`] - Per-day wake count
//!
//! ### Telemetry
//! - [`VehicleSnapshot`] - Normalized vehicle read
//! - [`LogRecord`] - One line of the append-only log

pub mod clock;
pub mod error;
pub mod models;

pub use clock::{Clock, FixedClock, SystemClock};
pub use error::CoreError;

pub use models::{
    // Credentials
    Credential,
    TokenGrant,
    DEFAULT_TOKEN_LIFETIME_SECS,
    TOKEN_SAFETY_MARGIN_SECS,
    // Policy
    QuietWindow,
    QuietWindowPolicy,
    Region,
    WakeCounter,
    WakePolicy,
    // Telemetry
    AwakeVia,
    FailureRecord,
    LogRecord,
    SkipReason,
    SkipRecord,
    VehicleData,
    VehicleSnapshot,
};
