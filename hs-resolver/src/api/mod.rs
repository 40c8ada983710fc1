//! HTTP API handlers for handlescope

pub mod health;
pub mod profile;

pub use health::health_routes;
pub use profile::profile_routes;
