//! Token Bucket
//!
//! Per-client token bucket with lazy refill: tokens are recomputed from the
//! elapsed time whenever the bucket is consulted, so idle buckets cost
//! nothing and no timer runs per client.

use std::time::Instant;

/// Token bucket for rate limiting
#[derive(Debug, Clone)]
pub struct TokenBucket {
    /// Maximum capacity (burst size)
    capacity: u32,

    /// Current tokens, `0.0 ..= capacity`
    tokens: f64,

    /// Refill rate (tokens per second)
    refill_rate: f64,

    /// Last refill time
    last_refill: Instant,
}

impl TokenBucket {
    /// Create a full bucket
    pub fn new(capacity: u32, refill_rate: f64, now: Instant) -> Self {
        Self {
            capacity,
            tokens: capacity as f64,
            refill_rate,
            last_refill: now,
        }
    }

    /// Try to take one token at `now`
    ///
    /// Refills first, then consumes a single token if at least one is
    /// available. Returns `false` when the bucket is depleted.
    pub fn try_acquire(&mut self, now: Instant) -> bool {
        self.refill(now);

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    /// Refill tokens based on elapsed time
    fn refill(&mut self, now: Instant) {
        // an earlier `now` adds nothing and does not move last_refill back
        let elapsed = now.saturating_duration_since(self.last_refill);
        let refilled = self.tokens + elapsed.as_secs_f64() * self.refill_rate;
        self.tokens = refilled.min(self.capacity as f64);
        if now > self.last_refill {
            self.last_refill = now;
        }
    }

    /// Tokens available at `now`, without consuming
    pub fn available(&self, now: Instant) -> f64 {
        let elapsed = now.saturating_duration_since(self.last_refill);
        (self.tokens + elapsed.as_secs_f64() * self.refill_rate).min(self.capacity as f64)
    }

    /// Burst capacity
    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Refill rate in tokens per second
    pub fn refill_rate(&self) -> f64 {
        self.refill_rate
    }
}
