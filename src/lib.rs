//! Agbalumo Gate Library
//!
//! Per-client admission control for the Agbalumo directory server: a
//! token-bucket [`rate_limit::AdmissionController`], the axum middleware
//! that applies it to every request, and the server wiring around them.

pub mod config;
pub mod logging;
pub mod metrics;
pub mod middleware;
pub mod rate_limit;
pub mod server;

pub use rate_limit::{AdmissionController, RateLimitConfig};
