//! Provider error classification.
//!
//! The single place where provider status codes and message text are
//! pattern-matched into the domain taxonomy. Neither provider returns a
//! structured error taxonomy, so this is best-effort matching; callers
//! receive the closed set of domain errors and never inspect provider
//! messages themselves.

use reqwest::StatusCode;
use slotwise_domain::SlotwiseError;

/// Classify a non-success provider response.
pub fn classify_provider_error(status: StatusCode, body: &str) -> SlotwiseError {
    let lower = body.to_ascii_lowercase();
    let detail = body.trim().to_string();

    match status.as_u16() {
        // 410 is how the calendar provider reports an already-deleted event
        404 | 410 => SlotwiseError::BookingNotFound(detail),
        401 | 403 => {
            if lower.contains("delegat") || lower.contains("cannot invite attendees") {
                SlotwiseError::DelegationRequired(detail)
            } else {
                SlotwiseError::PermissionDenied(detail)
            }
        }
        429 => SlotwiseError::Network(format!("provider rate limit: {detail}")),
        500..=599 => SlotwiseError::Network(format!("provider unavailable ({status}): {detail}")),
        _ => SlotwiseError::Provider(format!("unexpected provider response ({status}): {detail}")),
    }
}
