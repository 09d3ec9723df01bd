//! Calendar provider integration.

mod auth;
mod gateway;

pub use auth::AccessTokenManager;
pub use gateway::HttpCalendarGateway;
