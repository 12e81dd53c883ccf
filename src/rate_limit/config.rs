//! Rate Limit Configuration
//!
//! Configuration for per-client admission control.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default rate limits
pub const DEFAULT_RATE: f64 = 20.0; // tokens per second
pub const DEFAULT_BURST: u32 = 40; // burst allowance
pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 60;
pub const DEFAULT_STALE_AFTER_SECS: u64 = 180; // idle time before eviction

/// Rate limit configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Enable rate limiting
    pub enabled: bool,

    /// Token refill rate per client (tokens per second)
    pub rate: f64,

    /// Maximum tokens per client (burst capacity)
    pub burst: u32,

    /// How often the idle-client sweep runs, in seconds
    pub sweep_interval_secs: u64,

    /// Inactivity after which a client's bucket is evicted, in seconds
    pub stale_after_secs: u64,

    /// Derive the client key from `X-Forwarded-For` / `X-Real-IP`
    ///
    /// On by default so clients behind a reverse proxy are told apart. The
    /// headers are caller-controlled: a client reaching the server directly
    /// can send a new `X-Forwarded-For` value on every request, get a fresh
    /// bucket each time, and leave an entry behind for `stale_after_secs`.
    /// Turn this off unless a trusted proxy overwrites these headers.
    pub trust_forwarded_headers: bool,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            rate: DEFAULT_RATE,
            burst: DEFAULT_BURST,
            sweep_interval_secs: DEFAULT_SWEEP_INTERVAL_SECS,
            stale_after_secs: DEFAULT_STALE_AFTER_SECS,
            trust_forwarded_headers: true,
        }
    }
}

impl RateLimitConfig {
    /// Create a configuration with the given rate and burst, defaults elsewhere
    pub fn new(rate: f64, burst: u32) -> Self {
        Self {
            rate,
            burst,
            ..Self::default()
        }
    }

    /// Apply `RATE_LIMIT_*` environment overrides on top of `self`
    ///
    /// Unset or unparsable variables keep their current value.
    pub fn apply_env_overrides(mut self) -> Self {
        if let Ok(val) = std::env::var("RATE_LIMIT_ENABLED") {
            self.enabled = val.parse().unwrap_or(self.enabled);
        }

        if let Ok(val) = std::env::var("RATE_LIMIT_RATE") {
            if let Ok(rate) = val.parse() {
                self.rate = rate;
            }
        }

        if let Ok(val) = std::env::var("RATE_LIMIT_BURST") {
            if let Ok(burst) = val.parse() {
                self.burst = burst;
            }
        }

        if let Ok(val) = std::env::var("RATE_LIMIT_SWEEP_INTERVAL_SECS") {
            if let Ok(secs) = val.parse() {
                self.sweep_interval_secs = secs;
            }
        }

        if let Ok(val) = std::env::var("RATE_LIMIT_STALE_AFTER_SECS") {
            if let Ok(secs) = val.parse() {
                self.stale_after_secs = secs;
            }
        }

        if let Ok(val) = std::env::var("RATE_LIMIT_TRUST_FORWARDED") {
            self.trust_forwarded_headers = val.parse().unwrap_or(self.trust_forwarded_headers);
        }

        self
    }

    /// Get sweep interval
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    /// Get staleness window
    pub fn stale_after(&self) -> Duration {
        Duration::from_secs(self.stale_after_secs)
    }

    /// Refill rate clamped to a usable value (negative or NaN becomes 0)
    pub fn effective_rate(&self) -> f64 {
        if self.rate.is_nan() {
            0.0
        } else {
            self.rate.max(0.0)
        }
    }

    /// Burst clamped to at least one token
    pub fn effective_burst(&self) -> u32 {
        self.burst.max(1)
    }

    /// Disable rate limiting (for testing)
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }
}
