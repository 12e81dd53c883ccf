//! Per-Client Admission Control
//!
//! This module decides, for every inbound request, whether the calling client
//! may proceed, using one token bucket per client key.
//!
//! # Features
//!
//! - Token bucket algorithm with lazy, time-based refill (no per-client timers)
//! - Registry entries created on first sight of a client
//! - Periodic sweep that evicts clients idle beyond a fixed window
//! - Injectable monotonic clock for deterministic tests
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                   Admission Controller                       │
//! │            allow(key) -> bool        sweep()                 │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ┌──────────────────────────────────────┐  ┌─────────────┐  │
//! │  │ Client Registry (one Mutex)          │  │  Sweeper    │  │
//! │  │  key -> (TokenBucket, last_seen)     │◄─┤  (tokio)    │  │
//! │  └──────────────────────────────────────┘  └─────────────┘  │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod bucket;
pub mod clock;
pub mod config;
pub mod manager;
pub mod store;
pub mod sweeper;

pub use bucket::TokenBucket;
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::RateLimitConfig;
pub use manager::AdmissionController;
pub use store::{ClientKey, ClientRegistry};
pub use sweeper::SweeperHandle;

#[cfg(test)]
mod proptests;
