//! Vehicle tag resolution.

use std::fmt;

use fleetwake_fetch::VehicleSummary;

use crate::error::PollError;

/// How the configured vehicle is identified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VehicleTag {
    /// Numeric API id, used in paths as is.
    Id(String),
    /// Vehicle identification number, looked up in the vehicle list.
    Vin(String),
}

impl VehicleTag {
    /// Numeric tags are ids, anything else is a VIN.
    ///
    /// # Errors
    ///
    /// [`PollError::VehicleNotFound`] for an empty tag.
    pub fn parse(raw: &str) -> Result<Self, PollError> {
        let tag = raw.trim();
        if tag.is_empty() {
            return Err(PollError::VehicleNotFound("no vehicle tag configured".to_string()));
        }
        if tag.bytes().all(|b| b.is_ascii_digit()) {
            Ok(Self::Id(tag.to_string()))
        } else {
            Ok(Self::Vin(tag.to_ascii_uppercase()))
        }
    }

    /// True when resolving needs the vehicle list.
    pub fn needs_lookup(&self) -> bool {
        matches!(self, Self::Vin(_))
    }
}

impl fmt::Display for VehicleTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => write!(f, "id {id}"),
            Self::Vin(vin) => write!(f, "VIN {vin}"),
        }
    }
}

/// Resolves a [`VehicleTag`] to the id used in API paths.
#[derive(Debug, Clone)]
pub struct VehicleResolver {
    tag: VehicleTag,
}

impl VehicleResolver {
    /// Resolver for `tag`.
    pub fn new(tag: VehicleTag) -> Self {
        Self { tag }
    }

    /// The configured tag.
    pub fn tag(&self) -> &VehicleTag {
        &self.tag
    }

    /// The id without a lookup, for numeric tags.
    pub fn direct_id(&self) -> Option<&str> {
        match &self.tag {
            VehicleTag::Id(id) => Some(id),
            VehicleTag::Vin(_) => None,
        }
    }

    /// Picks the configured vehicle out of the account's vehicle list.
    ///
    /// # Errors
    ///
    /// [`PollError::VehicleNotFound`] listing the available VINs.
    pub fn pick(&self, vehicles: &[VehicleSummary]) -> Result<String, PollError> {
        if let Some(id) = self.direct_id() {
            return Ok(id.to_string());
        }
        if vehicles.is_empty() {
            return Err(PollError::VehicleNotFound(
                "no vehicles on this account".to_string(),
            ));
        }

        let found = vehicles.iter().find(|v| match (&self.tag, v.vin.as_deref()) {
            (VehicleTag::Vin(want), Some(vin)) => vin.eq_ignore_ascii_case(want),
            _ => false,
        });

        match found.and_then(VehicleSummary::api_id) {
            Some(id) => Ok(id.to_string()),
            None => {
                let available: Vec<&str> =
                    vehicles.iter().filter_map(|v| v.vin.as_deref()).collect();
                Err(PollError::VehicleNotFound(format!(
                    "{} not on account (available: {})",
                    self.tag,
                    available.join(", ")
                )))
            }
        }
    }
}
