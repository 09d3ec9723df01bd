//! Error-to-response mapping for the HTTP surface.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use slotwise_domain::SlotwiseError;

/// Domain error carried across the HTTP boundary.
///
/// Validation failures map to 400, missing configuration to 503 (never 500),
/// rejected signatures to 401, unknown bookings to 404, and timeouts to 504.
/// Everything else is a 500 whose body keeps the provider message for
/// operator diagnosis, plus a remediation hint when one exists.
pub struct ApiError(pub SlotwiseError);

impl From<SlotwiseError> for ApiError {
    fn from(err: SlotwiseError) -> Self {
        Self(err)
    }
}

pub fn status_of(err: &SlotwiseError) -> StatusCode {
    match err {
        SlotwiseError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        SlotwiseError::ConfigMissing(_) => StatusCode::SERVICE_UNAVAILABLE,
        SlotwiseError::SignatureInvalid => StatusCode::UNAUTHORIZED,
        SlotwiseError::BookingNotFound(_) => StatusCode::NOT_FOUND,
        SlotwiseError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
        SlotwiseError::PermissionDenied(_)
        | SlotwiseError::DelegationRequired(_)
        | SlotwiseError::Database(_)
        | SlotwiseError::Network(_)
        | SlotwiseError::Provider(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Short stable label for the error kind.
pub fn label_of(err: &SlotwiseError) -> &'static str {
    match err {
        SlotwiseError::InvalidInput(_) => "invalid input",
        SlotwiseError::ConfigMissing(_) => "not configured",
        SlotwiseError::SignatureInvalid => "invalid signature",
        SlotwiseError::BookingNotFound(_) => "booking not found",
        SlotwiseError::Timeout(_) => "provider timeout",
        SlotwiseError::PermissionDenied(_) => "permission denied",
        SlotwiseError::DelegationRequired(_) => "delegation required",
        SlotwiseError::Database(_) => "storage failure",
        SlotwiseError::Network(_) => "provider unreachable",
        SlotwiseError::Provider(_) => "provider error",
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_of(&self.0);

        let mut body = json!({
            "error": label_of(&self.0),
            "details": self.0.to_string(),
        });
        if let Some(hint) = self.0.remediation_hint() {
            body["hint"] = json!(hint);
        }

        (status, Json(body)).into_response()
    }
}
