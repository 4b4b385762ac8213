// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # fleetwake Store
//!
//! Persistent state and configuration for fleetwake.
//!
//! This crate provides:
//!
//! - **CredentialStore**: OAuth credential file with silent refresh
//! - **WakeBudget**: per-day wake counter
//! - **RunState** / **RunLog**: run history and the append-only outcome log
//! - **RunLock**: single-instance guard
//! - **Config**: immutable run configuration
//! - **Persistence**: atomic JSON file helpers
//!
//! ## Usage
//!
//! ```ignore
//! use fleetwake_store::{CredentialStore, WakeBudget};
//!
//! let credentials = CredentialStore::new(&config.paths.tokens, tokens, clock.clone());
//! let token = credentials.get_valid_access_token().await?;
//!
//! let budget = WakeBudget::new(&config.paths.wake_counter, clock);
//! if budget.remaining_today(config.wake.max_per_day).await? > 0 {
//!     // wake
//!     budget.increment().await?;
//! }
//! ```

pub mod config;
pub mod credential_store;
pub mod error;
pub mod lock;
pub mod persistence;
pub mod run_log;
pub mod run_state;
pub mod wake_budget;

pub use config::{Config, OAuthConfig, PathsConfig, RegistrationConfig, WakeConfig, parse_scopes};
pub use credential_store::CredentialStore;
pub use error::{CredentialError, StoreError};
pub use lock::RunLock;
pub use persistence::{
    append_json_line, default_state_dir, ensure_dir, load_json, load_json_opt,
    load_json_or_default, save_json,
};
pub use run_log::RunLog;
pub use run_state::RunState;
pub use wake_budget::WakeBudget;
