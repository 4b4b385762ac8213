// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # fleetwake Fetch
//!
//! HTTP clients for the Fleet API and its OAuth2 token endpoint.
//!
//! ## Host APIs
//!
//! - [`host::http`] - HTTP client with tracing and domain allowlist
//!
//! ## Clients
//!
//! - [`fleet::FleetClient`] - vehicle data, wake, vehicle list, partner registration
//! - [`oauth::TokenClient`] - refresh and authorization-code grants
//!
//! The poller depends on the [`VehicleApi`] and [`TokenApi`] traits rather
//! than the concrete clients, so it can be driven by in-memory fakes.
//!
//! ## Failure Classification
//!
//! [`classify::Classifier`] maps a [`FetchError`] to an [`ErrorClass`]
//! (unavailable, registration, auth, transport) from a rule table.
//!
//! ## Example
//!
//! ```ignore
//! use fleetwake_fetch::{FleetClient, HttpClient, VehicleApi};
//! use fleetwake_core::Region;
//!
//! let fleet = FleetClient::for_region(HttpClient::new()?, Region::Eu);
//! let data = fleet.vehicle_data(&token, "1492931337154343").await?;
//! ```

pub mod classify;
pub mod error;
pub mod fleet;
pub mod host;
pub mod oauth;
pub mod retry;

// Errors
pub use error::{FetchError, HttpError};

// Host APIs
pub use host::http::HttpClient;

// Clients
pub use fleet::{FleetClient, RegistrationStatus, VehicleApi, VehicleSummary, WakeAck};
pub use oauth::{OAuthSettings, TokenApi, TokenClient};

// Classification & retry
pub use classify::{ClassRule, Classifier, ErrorClass, classify};
pub use retry::RetryStrategy;
