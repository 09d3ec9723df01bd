//! HTTP server for the scheduling and booking service.
//!
//! # Endpoints
//!
//! - `GET /availability?date=YYYY-MM-DD` - bookable slot labels for a day
//! - `POST /booking` - create a booking (provider event + invitation email)
//! - `DELETE /booking?eventId=` - cancel a booking
//! - `GET /booking/status?eventId=` - attendee response status
//! - `POST /webhook` - scheduling-provider webhook receiver
//! - `POST /sync` - backfill reconciliation (setup secret guarded)
//! - `POST /setup/webhook` - register the webhook subscription
//! - `GET /health` - liveness probe

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;

use crate::context::AppContext;

pub mod availability;
pub mod booking;
pub mod error;
pub mod health;
pub mod sync;
pub mod webhook;

/// Shared application state passed to all handlers.
pub type AppState = Arc<AppContext>;

/// Build the HTTP router over the application context.
pub fn router(ctx: AppState) -> Router {
    Router::new()
        .route("/availability", get(availability::availability_handler))
        .route(
            "/booking",
            post(booking::create_handler).delete(booking::delete_handler),
        )
        .route("/booking/status", get(booking::status_handler))
        .route("/webhook", post(webhook::webhook_handler))
        .route("/sync", post(sync::sync_handler))
        .route("/setup/webhook", post(sync::register_webhook_handler))
        .route("/health", get(health::health_handler))
        .with_state(ctx)
}
