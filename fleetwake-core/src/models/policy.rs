//! Wake policy and API region selectors.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

// ============================================================================
// Wake Policy
// ============================================================================

/// Whether the poller may wake a sleeping vehicle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WakePolicy {
    /// Never wake; an unavailable vehicle fails the run.
    Never,
    /// Wake only after a read failed because the vehicle is unavailable.
    #[default]
    OnFail,
    /// Same decision path as `OnFail`.
    Always,
}

impl WakePolicy {
    /// True when waking is permitted at all.
    pub fn allows_wake(&self) -> bool {
        !matches!(self, Self::Never)
    }

    /// The configuration spelling of this policy.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Never => "never",
            Self::OnFail => "onfail",
            Self::Always => "always",
        }
    }
}

impl FromStr for WakePolicy {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "never" => Ok(Self::Never),
            "onfail" | "on_fail" | "on-fail" => Ok(Self::OnFail),
            "always" => Ok(Self::Always),
            other => Err(CoreError::InvalidConfig(format!(
                "wake policy must be never, onfail or always, got {other:?}"
            ))),
        }
    }
}

impl fmt::Display for WakePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Region
// ============================================================================

/// Fleet API region.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Region {
    /// Europe, Middle East, Africa.
    #[default]
    Eu,
    /// North America.
    Na,
    /// Asia-Pacific.
    Ap,
}

impl Region {
    /// Base URL of the Fleet API for this region.
    pub fn api_base(&self) -> &'static str {
        match self {
            Self::Eu => "https://fleet-api.prd.eu.vn.cloud.tesla.com/api/1",
            Self::Na => "https://fleet-api.prd.na.vn.cloud.tesla.com/api/1",
            Self::Ap => "https://fleet-api.prd.apac.vn.cloud.tesla.com/api/1",
        }
    }

    /// Short lowercase code (`eu`, `na`, `ap`).
    pub fn code(&self) -> &'static str {
        match self {
            Self::Eu => "eu",
            Self::Na => "na",
            Self::Ap => "ap",
        }
    }
}

impl FromStr for Region {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "eu" => Ok(Self::Eu),
            "na" => Ok(Self::Na),
            "ap" | "apac" => Ok(Self::Ap),
            other => Err(CoreError::InvalidConfig(format!("unknown region {other:?}"))),
        }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wake_policy_parse() {
        assert_eq!("never".parse::<WakePolicy>().unwrap(), WakePolicy::Never);
        assert_eq!("ONFAIL".parse::<WakePolicy>().unwrap(), WakePolicy::OnFail);
        assert_eq!("always".parse::<WakePolicy>().unwrap(), WakePolicy::Always);
        assert!("sometimes".parse::<WakePolicy>().is_err());
    }

    #[test]
    fn test_wake_policy_allows_wake() {
        assert!(!WakePolicy::Never.allows_wake());
        assert!(WakePolicy::OnFail.allows_wake());
        assert!(WakePolicy::Always.allows_wake());
    }

    #[test]
    fn test_region_parse_and_base() {
        assert_eq!("EU".parse::<Region>().unwrap(), Region::Eu);
        assert_eq!("apac".parse::<Region>().unwrap(), Region::Ap);
        assert!("mars".parse::<Region>().is_err());
        assert!(Region::Na.api_base().contains(".na."));
    }
}
