//! Webhook transport concerns (signature verification).

pub mod signature;

pub use signature::verify_signature;
