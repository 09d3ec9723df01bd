//! Error types used throughout the application

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for Slotwise
///
/// Provider-side failures are classified into this taxonomy exactly once, at
/// the gateway boundary; callers never re-classify.
#[derive(Error, Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum SlotwiseError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Configuration missing: {0}")]
    ConfigMissing(String),

    #[error("Booking not found: {0}")]
    BookingNotFound(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Delegation required: {0}")]
    DelegationRequired(String),

    #[error("Invalid webhook signature")]
    SignatureInvalid,

    #[error("Operation timed out: {0}")]
    Timeout(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Provider error: {0}")]
    Provider(String),
}

impl SlotwiseError {
    /// Operator-facing remediation text for errors that have a known fix on
    /// the provider side. Returned alongside the error at the HTTP boundary.
    pub fn remediation_hint(&self) -> Option<&'static str> {
        match self {
            Self::PermissionDenied(_) => Some(
                "Share the target calendar with the service credential and grant it \
                 'Make changes to events' access.",
            ),
            Self::DelegationRequired(_) => Some(
                "The credential cannot send attendee invitations on its own authority. \
                 Enable delegated sending for it on the provider side, or connect a \
                 user credential that owns the calendar.",
            ),
            _ => None,
        }
    }

    /// True for errors that must never be retried.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::InvalidInput(_) | Self::ConfigMissing(_) | Self::SignatureInvalid)
    }
}

/// Result type alias for Slotwise operations
pub type Result<T> = std::result::Result<T, SlotwiseError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remediation_hint_only_for_actionable_errors() {
        assert!(SlotwiseError::PermissionDenied("no write access".into())
            .remediation_hint()
            .is_some());
        assert!(SlotwiseError::DelegationRequired("cannot invite".into())
            .remediation_hint()
            .is_some());
        assert!(SlotwiseError::Network("connection reset".into()).remediation_hint().is_none());
        assert!(SlotwiseError::BookingNotFound("evt-1".into()).remediation_hint().is_none());
    }

    #[test]
    fn fatal_errors_are_not_retryable() {
        assert!(SlotwiseError::InvalidInput("bad date".into()).is_fatal());
        assert!(SlotwiseError::ConfigMissing("calendar id".into()).is_fatal());
        assert!(SlotwiseError::SignatureInvalid.is_fatal());
        assert!(!SlotwiseError::Network("timeout".into()).is_fatal());
    }

    #[test]
    fn errors_serialize_with_tagged_shape() {
        let err = SlotwiseError::InvalidInput("bad date".into());
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["type"], "InvalidInput");
        assert_eq!(json["message"], "bad date");
    }
}
