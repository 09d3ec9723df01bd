//! Scheduling-webhook provider integration.

mod client;

pub use client::HttpSchedulingProvider;
