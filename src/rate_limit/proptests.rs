//! Property-Based Tests for Admission Control
//!
//! # Test Strategies
//!
//! - **Burst admission**: a fresh client gets exactly `burst` admits in a row
//! - **Capacity ceiling**: however long a client idles, it never banks more
//!   than `burst` tokens
//! - **Refill**: after `1/rate` seconds a depleted client is admitted again
//! - **Determinism**: identical controllers fed identical timing agree
//!
//! # Running the Tests
//!
//! ```bash
//! cargo test --lib rate_limit::proptests
//! ```

use proptest::prelude::*;
use std::sync::Arc;
use std::time::Duration;

use super::clock::ManualClock;
use super::config::RateLimitConfig;
use super::manager::AdmissionController;

fn controller(rate: f64, burst: u32) -> (AdmissionController, ManualClock) {
    let clock = ManualClock::new();
    let controller =
        AdmissionController::with_clock(RateLimitConfig::new(rate, burst), Arc::new(clock.clone()));
    (controller, clock)
}

proptest! {
    #[test]
    fn prop_fresh_client_gets_exactly_burst(
        rate in 0.0f64..1000.0,
        burst in 1u32..200,
        extra in 1usize..50,
    ) {
        let (controller, _clock) = controller(rate, burst);

        let admitted = (0..burst as usize + extra)
            .filter(|_| controller.allow("client"))
            .count();

        prop_assert_eq!(admitted, burst as usize);
    }

    #[test]
    fn prop_idle_never_exceeds_capacity(
        rate in 0.01f64..100.0,
        burst in 1u32..100,
        extra_secs in 0u64..100_000,
    ) {
        let (controller, clock) = controller(rate, burst);
        prop_assert!(controller.allow("idle"));

        // Long enough to refill the whole bucket, and then some
        let idle = Duration::from_secs_f64(burst as f64 / rate) + Duration::from_secs(extra_secs + 1);
        clock.advance(idle);

        let admitted = (0..burst as usize * 2)
            .filter(|_| controller.allow("idle"))
            .count();

        prop_assert_eq!(admitted, burst as usize);
    }

    #[test]
    fn prop_refill_after_one_token_interval(
        rate in 0.1f64..1000.0,
        burst in 1u32..20,
    ) {
        let (controller, clock) = controller(rate, burst);
        for _ in 0..burst {
            prop_assert!(controller.allow("client"));
        }
        prop_assert!(!controller.allow("client"));

        // One token's worth of time, rounded up to the next microsecond
        let wait = Duration::from_micros((1_000_000.0 / rate).ceil() as u64 + 1);
        clock.advance(wait);

        prop_assert!(controller.allow("client"));
    }

    #[test]
    fn prop_identical_controllers_agree(
        rate in 0.0f64..50.0,
        burst in 1u32..10,
        steps in prop::collection::vec(0u64..500, 1..60),
    ) {
        let (a, clock_a) = controller(rate, burst);
        let (b, clock_b) = controller(rate, burst);

        for step in steps {
            clock_a.advance(Duration::from_millis(step));
            clock_b.advance(Duration::from_millis(step));
            prop_assert_eq!(a.allow("k"), b.allow("k"));
        }
    }

    #[test]
    fn prop_sweep_keeps_only_recent_clients(
        ages in prop::collection::vec(0u64..400, 1..40),
    ) {
        let (controller, clock) = controller(1.0, 1);
        let stale_after = controller.stale_after().as_secs();
        let oldest = *ages.iter().max().unwrap();

        // Touch clients so that client i is `ages[i]` seconds old at the end
        let mut order: Vec<(usize, u64)> = ages.iter().copied().enumerate().collect();
        order.sort_by(|x, y| y.1.cmp(&x.1));
        let mut elapsed = 0;
        for (i, age) in &order {
            let touch_at = oldest - age;
            clock.advance(Duration::from_secs(touch_at - elapsed));
            elapsed = touch_at;
            controller.allow(&format!("client-{}", i));
        }
        clock.advance(Duration::from_secs(oldest - elapsed));

        controller.sweep();

        for (i, age) in ages.iter().enumerate() {
            prop_assert_eq!(controller.is_tracked(&format!("client-{}", i)), *age <= stale_after);
        }
    }
}
