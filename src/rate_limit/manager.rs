//! Admission Controller
//!
//! Central owner of the client registry. Decides allow/deny per client key
//! and evicts idle clients so memory stays bounded no matter how many
//! distinct callers a long-running server has seen.

use std::sync::Arc;
use std::time::Duration;

use super::bucket::TokenBucket;
use super::clock::{Clock, SystemClock};
use super::config::RateLimitConfig;
use super::store::ClientRegistry;
use super::sweeper::{self, SweeperHandle};

/// Per-client token bucket admission controller
///
/// Every client gets the same `rate`/`burst`. Several controllers can coexist
/// (e.g. different limits for different route classes); none of them is a
/// process-wide singleton.
#[derive(Debug)]
pub struct AdmissionController {
    /// Configuration, with rate and burst already clamped
    config: RateLimitConfig,

    /// Client buckets
    registry: ClientRegistry,

    /// Monotonic time source
    clock: Arc<dyn Clock>,
}

impl AdmissionController {
    /// Create a controller from a full configuration
    pub fn new(config: RateLimitConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Create a controller reading time from `clock`
    pub fn with_clock(config: RateLimitConfig, clock: Arc<dyn Clock>) -> Self {
        let config = RateLimitConfig {
            rate: config.effective_rate(),
            burst: config.effective_burst(),
            ..config
        };

        Self {
            config,
            registry: ClientRegistry::new(),
            clock,
        }
    }

    /// Create a controller with `rate` tokens/second and `burst` capacity
    ///
    /// Edge values are accepted: `rate = 0` admits each client's initial
    /// burst and nothing after it, `burst = 0` is treated as 1.
    pub fn configure(rate: f64, burst: u32) -> Self {
        Self::new(RateLimitConfig::new(rate, burst))
    }

    /// Create a controller that admits everything (for testing)
    pub fn disabled() -> Self {
        Self::new(RateLimitConfig::disabled())
    }

    /// Decide whether `client_key` may proceed
    ///
    /// Unseen keys start with a full bucket. A denial still refreshes the
    /// client's last-seen time, so a client hammering the server is never
    /// evicted as idle. Never blocks on I/O and never fails.
    pub fn allow(&self, client_key: &str) -> bool {
        if !self.config.enabled {
            return true;
        }

        let (burst, rate) = (self.config.burst, self.config.rate);

        self.registry.with_visitor(
            client_key,
            || self.clock.now(),
            |now| TokenBucket::new(burst, rate, now),
            |visitor, now| {
                visitor.last_seen = now;
                visitor.bucket.try_acquire(now)
            },
        )
    }

    /// Evict every client idle for longer than the staleness window
    pub fn sweep(&self) {
        let evicted = self.evict_idle();
        if evicted > 0 {
            tracing::debug!(
                evicted,
                remaining = self.registry.len(),
                "Evicted idle rate limit entries"
            );
        }
    }

    /// Sweep and report how many entries were removed
    pub(crate) fn evict_idle(&self) -> usize {
        self.registry
            .evict_idle(|| self.clock.now(), self.config.stale_after())
    }

    /// Start the periodic sweep on the current tokio runtime
    ///
    /// The task runs every `sweep_interval` until the returned handle is shut
    /// down or dropped.
    pub fn spawn_sweeper(self: &Arc<Self>) -> SweeperHandle {
        sweeper::spawn(Arc::clone(self), self.config.sweep_interval())
    }

    /// Number of clients currently tracked
    pub fn tracked_clients(&self) -> usize {
        self.registry.len()
    }

    /// Whether `client_key` currently has a bucket
    pub fn is_tracked(&self, client_key: &str) -> bool {
        self.registry.contains(client_key)
    }

    /// Get current configuration
    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    /// Idle time after which a client is evicted
    pub fn stale_after(&self) -> Duration {
        self.config.stale_after()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rate_limit::clock::ManualClock;

    fn controller(rate: f64, burst: u32) -> (AdmissionController, ManualClock) {
        let clock = ManualClock::new();
        let controller = AdmissionController::with_clock(
            RateLimitConfig::new(rate, burst),
            Arc::new(clock.clone()),
        );
        (controller, clock)
    }

    #[test]
    fn test_controller_creation() {
        let controller = AdmissionController::configure(10.0, 2);
        assert!(controller.config().enabled);
        assert_eq!(controller.config().burst, 2);
        assert_eq!(controller.tracked_clients(), 0);
    }

    #[test]
    fn test_burst_admission() {
        let (controller, _clock) = controller(1.0, 5);

        for i in 0..5 {
            assert!(controller.allow("1.2.3.4"), "request {} should pass", i);
        }
        assert!(!controller.allow("1.2.3.4"));
    }

    #[test]
    fn test_refill_after_denial() {
        let (controller, clock) = controller(10.0, 2);

        assert!(controller.allow("1.2.3.4"));
        assert!(controller.allow("1.2.3.4"));
        assert!(!controller.allow("1.2.3.4"));

        clock.advance(Duration::from_millis(100));
        assert!(controller.allow("1.2.3.4"));
        assert!(!controller.allow("1.2.3.4"));
    }

    #[test]
    fn test_capacity_ceiling() {
        let (controller, clock) = controller(2.0, 3);

        assert!(controller.allow("idle"));

        // Far longer than burst / rate
        clock.advance(Duration::from_secs(3600));

        for _ in 0..3 {
            assert!(controller.allow("idle"));
        }
        assert!(!controller.allow("idle"));
    }

    #[test]
    fn test_clients_are_independent() {
        let (controller, _clock) = controller(0.0, 1);

        assert!(controller.allow("a"));
        assert!(!controller.allow("a"));

        assert!(controller.allow("b"));
        assert_eq!(controller.tracked_clients(), 2);
    }

    #[test]
    fn test_zero_rate_blocks_after_burst() {
        let (controller, clock) = controller(0.0, 2);

        assert!(controller.allow("x"));
        assert!(controller.allow("x"));
        clock.advance(Duration::from_secs(86_400));
        assert!(!controller.allow("x"));
    }

    #[test]
    fn test_zero_burst_treated_as_one() {
        let (controller, _clock) = controller(1.0, 0);
        assert_eq!(controller.config().burst, 1);
        assert!(controller.allow("x"));
        assert!(!controller.allow("x"));
    }

    #[test]
    fn test_sweep_evicts_idle_clients() {
        let (controller, clock) = controller(1.0, 1);

        controller.allow("old");
        clock.advance(Duration::from_secs(170));
        controller.allow("recent");
        clock.advance(Duration::from_secs(20));

        controller.sweep();

        assert!(!controller.is_tracked("old"));
        assert!(controller.is_tracked("recent"));
        assert_eq!(controller.tracked_clients(), 1);
    }

    #[test]
    fn test_denied_client_counts_as_seen() {
        let (controller, clock) = controller(0.0, 1);

        assert!(controller.allow("abuser"));
        clock.advance(Duration::from_secs(170));
        assert!(!controller.allow("abuser"));
        clock.advance(Duration::from_secs(170));

        controller.sweep();
        assert!(controller.is_tracked("abuser"));
    }

    #[test]
    fn test_evicted_client_starts_over_with_full_bucket() {
        let (controller, clock) = controller(0.0, 1);

        assert!(controller.allow("returning"));
        assert!(!controller.allow("returning"));

        clock.advance(controller.stale_after() + Duration::from_secs(1));
        controller.sweep();
        assert!(!controller.is_tracked("returning"));

        assert!(controller.allow("returning"));
    }

    #[test]
    fn test_identical_controllers_agree() {
        let (first, first_clock) = controller(3.0, 2);
        let (second, second_clock) = controller(3.0, 2);

        let steps = [0u64, 0, 0, 100, 250, 400, 0, 0, 1000];
        for step in steps {
            first_clock.advance(Duration::from_millis(step));
            second_clock.advance(Duration::from_millis(step));
            assert_eq!(first.allow("k"), second.allow("k"));
        }
    }

    #[test]
    fn test_disabled_allows_all() {
        let controller = AdmissionController::disabled();

        for _ in 0..200 {
            assert!(controller.allow("1.2.3.4"));
        }
        assert_eq!(controller.tracked_clients(), 0);
    }
}
