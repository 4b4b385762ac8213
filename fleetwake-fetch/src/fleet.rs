//! Fleet API client.
//!
//! # Endpoints
//!
//! ```text
//! GET  {base}/vehicles                                  list vehicles
//! GET  {base}/vehicles/{id}/vehicle_data                telemetry snapshot
//! POST {base}/vehicles/{id}/wake_up                     wake command
//! POST {base}/partner_accounts        {"domain": ...}   register domain
//! GET  {base}/partner_accounts/public_key?domain=...     registration status
//! ```
//!
//! All calls are authenticated with the user's bearer access token.

use async_trait::async_trait;
use fleetwake_core::{Region, VehicleData};
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::{debug, instrument, warn};
use url::Url;

use crate::error::FetchError;
use crate::host::http::{HttpClient, read_json};

// ============================================================================
// Types
// ============================================================================

/// Result of a wake command.
///
/// Waking is best effort: only [`WakeAck::Accepted`] is a clean answer, but
/// none of the variants stops the caller from polling afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WakeAck {
    /// 2xx response.
    Accepted {
        /// Vehicle state reported in the response, if any.
        state: Option<String>,
    },
    /// Non-2xx response; some regions answer 4xx while the wake proceeds.
    Rejected {
        /// HTTP status.
        status: u16,
        /// Provider error text.
        message: String,
    },
    /// The request did not complete.
    Unreachable {
        /// Transport error text.
        message: String,
    },
}

impl WakeAck {
    /// True unless the API answered 2xx.
    pub fn is_warning(&self) -> bool {
        !matches!(self, Self::Accepted { .. })
    }
}

/// One entry of the vehicle list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct VehicleSummary {
    /// API id used in vehicle paths.
    #[serde(default, deserialize_with = "de_opt_id")]
    pub id: Option<String>,
    /// Legacy vehicle id.
    #[serde(default, deserialize_with = "de_opt_id")]
    pub vehicle_id: Option<String>,
    /// Vehicle identification number.
    #[serde(default)]
    pub vin: Option<String>,
    /// Connectivity state.
    #[serde(default)]
    pub state: Option<String>,
}

impl VehicleSummary {
    /// The id to use in API paths (`id`, falling back to `vehicle_id`).
    pub fn api_id(&self) -> Option<&str> {
        self.id.as_deref().or(self.vehicle_id.as_deref())
    }
}

/// Registration state of a partner domain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationStatus {
    /// True when the domain has a registered public key.
    pub registered: bool,
    /// The registered public key, hex encoded.
    pub public_key: Option<String>,
}

fn de_opt_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

// ============================================================================
// Vehicle API Trait
// ============================================================================

/// Vehicle-facing Fleet API operations used by the poller.
#[async_trait]
pub trait VehicleApi: Send + Sync {
    /// Reads the full vehicle data document.
    async fn vehicle_data(&self, token: &str, vehicle_id: &str)
    -> Result<VehicleData, FetchError>;

    /// Issues a wake command. Never fails; problems are reported in the ack.
    async fn wake_up(&self, token: &str, vehicle_id: &str) -> WakeAck;

    /// Lists vehicles on the account.
    async fn list_vehicles(&self, token: &str) -> Result<Vec<VehicleSummary>, FetchError>;

    /// Registers a partner domain in the current region.
    ///
    /// Re-registering an already registered domain is treated as success.
    async fn register_partner(&self, token: &str, domain: &str) -> Result<(), FetchError>;

    /// Checks whether a partner domain is registered.
    async fn partner_status(
        &self,
        token: &str,
        domain: &str,
    ) -> Result<RegistrationStatus, FetchError>;
}

// ============================================================================
// Fleet Client
// ============================================================================

/// Fleet API client for one region.
#[derive(Debug, Clone)]
pub struct FleetClient {
    http: HttpClient,
    base_url: String,
}

impl FleetClient {
    /// Creates a client for an explicit base URL (e.g. `.../api/1`).
    pub fn new(http: HttpClient, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Creates a client for a region's public endpoint.
    pub fn for_region(http: HttpClient, region: Region) -> Self {
        Self::new(http, region.api_base())
    }

    /// The base URL requests are made against.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get(&self, url: &str, token: &str) -> Result<Value, FetchError> {
        let response = self.http.get_with_bearer(url, token).await?;
        read_json(response).await
    }

    async fn post(&self, path: &str, token: &str, body: &Value) -> Result<Value, FetchError> {
        let response = self
            .http
            .post_json_with_bearer(&self.url(path), token, body)
            .await?;
        read_json(response).await
    }
}

/// Unwraps the `{"response": ...}` envelope used by every Fleet endpoint.
fn unwrap_response(value: Value) -> Value {
    match value {
        Value::Object(mut map) if map.contains_key("response") => {
            map.remove("response").unwrap_or_default()
        }
        other => other,
    }
}

#[async_trait]
impl VehicleApi for FleetClient {
    #[instrument(skip(self, token))]
    async fn vehicle_data(
        &self,
        token: &str,
        vehicle_id: &str,
    ) -> Result<VehicleData, FetchError> {
        let url = self.url(&format!("/vehicles/{vehicle_id}/vehicle_data"));
        let value = unwrap_response(self.get(&url, token).await?);
        if !value.is_object() {
            return Err(FetchError::InvalidResponse(
                "vehicle_data response is not an object".to_string(),
            ));
        }
        Ok(VehicleData::from_value(value)?)
    }

    #[instrument(skip(self, token))]
    async fn wake_up(&self, token: &str, vehicle_id: &str) -> WakeAck {
        let path = format!("/vehicles/{vehicle_id}/wake_up");
        match self.post(&path, token, &Value::Object(serde_json::Map::new())).await {
            Ok(value) => {
                let state = unwrap_response(value)
                    .get("state")
                    .and_then(Value::as_str)
                    .map(str::to_string);
                debug!(state = ?state, "Wake accepted");
                WakeAck::Accepted { state }
            }
            Err(FetchError::Api { status, message }) => {
                warn!(status, error = %message, "Wake request answered with an error");
                WakeAck::Rejected { status, message }
            }
            Err(e) => {
                warn!(error = %e, "Wake request failed");
                WakeAck::Unreachable {
                    message: e.to_string(),
                }
            }
        }
    }

    #[instrument(skip(self, token))]
    async fn list_vehicles(&self, token: &str) -> Result<Vec<VehicleSummary>, FetchError> {
        let value = self.get(&self.url("/vehicles"), token).await?;
        let list = match value {
            Value::Object(mut map) => map
                .remove("response")
                .or_else(|| map.remove("vehicles"))
                .unwrap_or(Value::Array(Vec::new())),
            other => other,
        };
        if list.is_null() {
            return Ok(Vec::new());
        }
        Ok(serde_json::from_value(list)?)
    }

    #[instrument(skip(self, token))]
    async fn register_partner(&self, token: &str, domain: &str) -> Result<(), FetchError> {
        let body = serde_json::json!({ "domain": domain });
        match self.post("/partner_accounts", token, &body).await {
            Ok(_) => Ok(()),
            Err(FetchError::Api { status: 409, .. }) => {
                debug!("Domain already registered");
                Ok(())
            }
            Err(FetchError::Api { message, .. })
                if message.to_lowercase().contains("already registered") =>
            {
                debug!("Domain already registered");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    #[instrument(skip(self, token))]
    async fn partner_status(
        &self,
        token: &str,
        domain: &str,
    ) -> Result<RegistrationStatus, FetchError> {
        let url = Url::parse_with_params(
            &self.url("/partner_accounts/public_key"),
            &[("domain", domain)],
        )
        .map_err(|e| FetchError::InvalidUrl(e.to_string()))?;

        match self.get(url.as_str(), token).await {
            Ok(value) => {
                let public_key = unwrap_response(value)
                    .get("public_key")
                    .and_then(Value::as_str)
                    .filter(|k| !k.is_empty())
                    .map(str::to_string);
                Ok(RegistrationStatus {
                    registered: public_key.is_some(),
                    public_key,
                })
            }
            Err(FetchError::Api { status: 404, .. }) => Ok(RegistrationStatus {
                registered: false,
                public_key: None,
            }),
            Err(e) => Err(e),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
