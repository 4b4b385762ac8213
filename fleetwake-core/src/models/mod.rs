//! Domain models for fleetwake.
//!
//! ## Submodules
//!
//! - [`credential`] - OAuth credential and token grants
//! - [`quiet`] - Quiet-window parsing and policy
//! - [`wake`] - Per-day wake counter
//! - [`policy`] - Wake policy and API region selectors
//! - [`snapshot`] - Raw vehicle data and the normalized snapshot
//! - [`record`] - Lines of the append-only log

mod credential;
mod policy;
mod quiet;
mod record;
mod snapshot;
mod wake;

pub use credential::{
    Credential, DEFAULT_TOKEN_LIFETIME_SECS, TOKEN_SAFETY_MARGIN_SECS, TokenGrant,
};
pub use policy::{Region, WakePolicy};
pub use quiet::{QuietWindow, QuietWindowPolicy};
pub use record::{FailureRecord, LogRecord, SkipReason, SkipRecord};
pub use snapshot::{AwakeVia, ChargeState, VehicleData, VehicleSnapshot, VehicleState};
pub use wake::WakeCounter;
