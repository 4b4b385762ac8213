//! Host APIs.
//!
//! - [`http`] - HTTP client with tracing and domain allowlist

pub mod http;
