//! # Slotwise Core
//!
//! Engine components of the scheduling and booking synchronization service.
//!
//! This crate contains:
//! - Port traits for the calendar gateway, scheduling provider, and booking
//!   store (implemented by `slotwise-infra`)
//! - Availability computation (pure, side-effect-free)
//! - Booking lifecycle management
//! - Webhook ingestion with payload normalization
//! - Backfill reconciliation against the provider's full history
//!
//! ## Architecture
//! - Depends only on `slotwise-domain` and the port traits defined here
//! - No I/O: all external effects go through injected port implementations

pub mod availability;
pub mod backfill;
pub mod booking;
pub mod ports;
pub mod webhook;

pub use availability::{compute_availability, slot_label, AvailabilityService};
pub use backfill::BackfillService;
pub use booking::BookingService;
pub use webhook::WebhookService;
