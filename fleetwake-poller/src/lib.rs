// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # fleetwake Poller
//!
//! Orchestration of one poll-and-record cycle:
//!
//! - **AvailabilityPoller**: read, decide, wake, poll again
//! - **RegistrationGuard**: proactive and error-triggered partner registration
//! - **VehicleResolver**: numeric id or VIN to API id
//! - **PollOutcome** / **PollReport**: what the run produced and how
//!
//! ## Usage
//!
//! ```ignore
//! use fleetwake_poller::{AvailabilityPoller, PollerSettings, RegistrationGuard};
//!
//! let poller = AvailabilityPoller::new(
//!     api.clone(),
//!     credentials,
//!     budget,
//!     RegistrationGuard::from_config(api, &config.registration),
//!     clock,
//!     PollerSettings::from_config(&config)?,
//! );
//! let report = poller.run().await;
//! log.append(&report.to_record()).await?;
//! ```

pub mod error;
pub mod outcome;
pub mod poller;
pub mod registration;
pub mod vehicle;

pub use error::PollError;
pub use outcome::{Phase, PollOutcome, PollReport, PollTrace, ReadAttempt};
pub use poller::{AvailabilityPoller, PollerSettings};
pub use registration::RegistrationGuard;
pub use vehicle::{VehicleResolver, VehicleTag};
