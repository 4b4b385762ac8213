//! Vehicle data types.
//!
//! [`VehicleData`] mirrors the parts of the Fleet API `vehicle_data`
//! document we read; [`VehicleSnapshot`] is the normalized record written
//! to the log.
//!
//! # Response Format
//!
//! ```json
//! {
//!   "response": {
//!     "state": "online",
//!     "charge_state": {"battery_level": 78, "charging_state": "Charging", "battery_range": 201.3},
//!     "vehicle_state": {"odometer": 15231.87}
//!   }
//! }
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::policy::Region;

/// Kilometres per mile; `battery_range` is reported in miles.
const KM_PER_MILE: f64 = 1.609_344;

// ============================================================================
// Raw Vehicle Data
// ============================================================================

/// The subset of the `vehicle_data` response used for snapshots.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VehicleData {
    /// Connectivity state (`online`, `asleep`, ...).
    #[serde(default)]
    pub state: Option<String>,
    /// Charging information.
    #[serde(default)]
    pub charge_state: Option<ChargeState>,
    /// Body/odometer information.
    #[serde(default)]
    pub vehicle_state: Option<VehicleState>,
}

/// `charge_state` block.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChargeState {
    /// State of charge, percent.
    #[serde(default)]
    pub battery_level: Option<f64>,
    /// `Charging`, `Complete`, `Disconnected`, ...
    #[serde(default)]
    pub charging_state: Option<String>,
    /// Estimated range in miles.
    #[serde(default)]
    pub battery_range: Option<f64>,
}

/// `vehicle_state` block.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VehicleState {
    /// Odometer as reported by the API.
    #[serde(default)]
    pub odometer: Option<f64>,
    /// Fallback connectivity state.
    #[serde(default)]
    pub vehicle_state: Option<String>,
}

impl VehicleData {
    /// Parses either the enveloped (`{"response": {...}}`) or bare document.
    ///
    /// # Errors
    ///
    /// Returns the serde error if the document is not an object of the
    /// expected shape.
    pub fn from_value(value: serde_json::Value) -> Result<Self, serde_json::Error> {
        match value {
            serde_json::Value::Object(mut map) if map.get("response").is_some_and(|v| v.is_object()) => {
                serde_json::from_value(map.remove("response").unwrap_or_default())
            }
            other => serde_json::from_value(other),
        }
    }
}

// ============================================================================
// Snapshot
// ============================================================================

/// How the vehicle was awake when it was read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AwakeVia {
    /// Already awake.
    None,
    /// Woken by this run.
    Wake,
}

/// Normalized vehicle read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleSnapshot {
    /// When the read completed.
    pub ts: DateTime<Utc>,
    /// State of charge, percent.
    pub soc_percent: Option<f64>,
    /// True while charging.
    pub is_charging: bool,
    /// Raw charging state string.
    pub charging_state: String,
    /// Estimated range in kilometres.
    pub battery_range_km: Option<f64>,
    /// Odometer, one decimal.
    pub odometer_km: Option<f64>,
    /// True when the vehicle reported itself online.
    pub online: bool,
    /// Raw connectivity state string.
    pub online_state: String,
    /// Whether this run woke the vehicle.
    pub awake_via: AwakeVia,
    /// Region the data was read from.
    pub api_region: Region,
}

impl VehicleSnapshot {
    /// Normalizes raw vehicle data.
    pub fn from_data(data: &VehicleData, ts: DateTime<Utc>, woke: bool, region: Region) -> Self {
        let charge = data.charge_state.clone().unwrap_or_default();
        let vehicle = data.vehicle_state.clone().unwrap_or_default();

        let charging_state = charge.charging_state.unwrap_or_default();
        let online_state = data
            .state
            .clone()
            .or(vehicle.vehicle_state)
            .unwrap_or_default();

        Self {
            ts,
            soc_percent: charge.battery_level.filter(|v| v.is_finite()),
            is_charging: charging_state.eq_ignore_ascii_case("charging"),
            charging_state,
            battery_range_km: charge
                .battery_range
                .filter(|v| v.is_finite())
                .map(|mi| round1(mi * KM_PER_MILE)),
            odometer_km: vehicle.odometer.filter(|v| v.is_finite()).map(round1),
            online: online_state.eq_ignore_ascii_case("online"),
            online_state,
            awake_via: if woke { AwakeVia::Wake } else { AwakeVia::None },
            api_region: region,
        }
    }

    /// True when the snapshot followed a wake issued by this run.
    pub fn woke(&self) -> bool {
        self.awake_via == AwakeVia::Wake
    }
}

fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}
