//! # Slotwise App
//!
//! HTTP surface and application wiring for the scheduling and booking
//! synchronization service.

pub mod context;
pub mod server;

pub use context::AppContext;
pub use server::router;
