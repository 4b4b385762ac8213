//! Failure classification.
//!
//! Every failed Fleet API call is mapped to an [`ErrorClass`], which is all
//! the poller looks at when deciding what to do next. The mapping is a
//! table of case-insensitive needles matched against the provider's error
//! text, followed by status-code rules; new provider strings only need a
//! new [`ClassRule`].

use std::fmt;

use crate::error::FetchError;

// ============================================================================
// Error Class
// ============================================================================

/// What a failed call means for the poll cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    /// Vehicle asleep, offline, or the request timed out.
    Unavailable,
    /// The calling domain is not registered in this region.
    Registration,
    /// Token rejected.
    Auth,
    /// Anything else.
    Transport,
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Unavailable => "unavailable",
            Self::Registration => "registration",
            Self::Auth => "auth",
            Self::Transport => "transport",
        })
    }
}

// ============================================================================
// Rules
// ============================================================================

/// One message rule: if the error text contains `needle`, the class is `class`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassRule {
    /// Class assigned on match.
    pub class: ErrorClass,
    /// Lowercase substring to look for.
    pub needle: String,
}

impl ClassRule {
    /// Creates a rule. The needle is lowercased.
    pub fn new(class: ErrorClass, needle: &str) -> Self {
        Self {
            class,
            needle: needle.to_lowercase(),
        }
    }
}

/// Message rules known for the Fleet API, checked in order.
pub const DEFAULT_MESSAGE_RULES: &[(ErrorClass, &str)] = &[
    (ErrorClass::Registration, "must be registered in the current region"),
    (ErrorClass::Unavailable, "vehicle unavailable"),
    (ErrorClass::Unavailable, "asleep"),
    (ErrorClass::Unavailable, "offline"),
];

// ============================================================================
// Classifier
// ============================================================================

/// Maps fetch errors to [`ErrorClass`].
///
/// Message rules win over status rules: the Fleet API reports a sleeping
/// vehicle as `408 vehicle unavailable` and a missing registration as a
/// 4xx with an explanatory message.
#[derive(Debug, Clone)]
pub struct Classifier {
    rules: Vec<ClassRule>,
}

impl Default for Classifier {
    fn default() -> Self {
        Self {
            rules: DEFAULT_MESSAGE_RULES
                .iter()
                .map(|(class, needle)| ClassRule::new(*class, needle))
                .collect(),
        }
    }
}

impl Classifier {
    /// Adds a message rule after the existing ones.
    #[must_use]
    pub fn with_rule(mut self, class: ErrorClass, needle: &str) -> Self {
        self.rules.push(ClassRule::new(class, needle));
        self
    }

    /// The message rules in evaluation order.
    pub fn rules(&self) -> &[ClassRule] {
        &self.rules
    }

    /// Classifies provider error text alone.
    pub fn classify_message(&self, message: &str) -> Option<ErrorClass> {
        let lower = message.to_lowercase();
        self.rules
            .iter()
            .find(|rule| lower.contains(&rule.needle))
            .map(|rule| rule.class)
    }

    /// Classifies a fetch error.
    pub fn classify(&self, error: &FetchError) -> ErrorClass {
        match error {
            FetchError::Timeout => ErrorClass::Unavailable,
            FetchError::Http(e) if e.is_timeout() => ErrorClass::Unavailable,
            FetchError::AuthenticationFailed(_) => ErrorClass::Auth,
            FetchError::Api { status, message } => self
                .classify_message(message)
                .unwrap_or_else(|| classify_status(*status)),
            _ => ErrorClass::Transport,
        }
    }
}

fn classify_status(status: u16) -> ErrorClass {
    match status {
        408 => ErrorClass::Unavailable,
        401 | 403 => ErrorClass::Auth,
        _ => ErrorClass::Transport,
    }
}

/// Classifies with the default rule table.
pub fn classify(error: &FetchError) -> ErrorClass {
    Classifier::default().classify(error)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn api(status: u16, message: &str) -> FetchError {
        FetchError::Api {
            status,
            message: message.to_string(),
        }
    }

    #[test]
    fn test_unavailable_messages() {
        for msg in [
            "vehicle unavailable: {:error=>\"vehicle unavailable:\"}",
            "Vehicle is ASLEEP",
            "vehicle is offline or asleep",
        ] {
            assert_eq!(classify(&api(408, msg)), ErrorClass::Unavailable, "{msg}");
            assert_eq!(classify(&api(500, msg)), ErrorClass::Unavailable, "{msg}");
        }
    }

    #[test]
    fn test_registration_message() {
        let err = api(
            412,
            "Account must be registered in the current region https://fleet-api.prd.eu.vn.cloud.tesla.com",
        );
        assert_eq!(classify(&err), ErrorClass::Registration);
    }

    #[test]
    fn test_status_rules() {
        assert_eq!(classify(&api(408, "")), ErrorClass::Unavailable);
        assert_eq!(classify(&api(401, "token expired")), ErrorClass::Auth);
        assert_eq!(classify(&api(403, "forbidden")), ErrorClass::Auth);
        assert_eq!(classify(&api(500, "internal")), ErrorClass::Transport);
        assert_eq!(classify(&api(404, "not found")), ErrorClass::Transport);
    }

    #[test]
    fn test_non_api_errors() {
        assert_eq!(classify(&FetchError::Timeout), ErrorClass::Unavailable);
        assert_eq!(
            classify(&FetchError::AuthenticationFailed("no".to_string())),
            ErrorClass::Auth
        );
        assert_eq!(
            classify(&FetchError::InvalidResponse("garbage".to_string())),
            ErrorClass::Transport
        );
    }

    #[test]
    fn test_custom_rule_extends_table() {
        let classifier = Classifier::default().with_rule(ErrorClass::Unavailable, "In Service");
        assert_eq!(
            classifier.classify(&api(500, "vehicle in service")),
            ErrorClass::Unavailable
        );
        assert_eq!(classifier.rules().len(), DEFAULT_MESSAGE_RULES.len() + 1);
    }

    #[test]
    fn test_first_matching_rule_wins() {
        // Registration is listed before the unavailable needles.
        let err = api(421, "offline: must be registered in the current region");
        assert_eq!(classify(&err), ErrorClass::Registration);
    }
}
