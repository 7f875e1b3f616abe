//! Integration tests for the sliding-window limiter
//!
//! End-to-end admission scenarios across several endpoint classes, run
//! under tokio's paused clock so no test sleeps for real.

#![cfg(feature = "runtime")]

use std::time::Duration;

use tenora_common::resilience::{RateLimitConfig, SlidingWindowLimiter};
use tokio::time::Instant;

fn platform_limiter() -> SlidingWindowLimiter {
    SlidingWindowLimiter::builder()
        .class(
            "/auth",
            RateLimitConfig::builder()
                .max_requests(5)
                .window(Duration::from_secs(60))
                .cooldown(Duration::from_secs(3))
                .build()
                .unwrap(),
        )
        .class(
            "/ai",
            RateLimitConfig::builder()
                .max_requests(2)
                .window(Duration::from_secs(2))
                .cooldown(Duration::from_secs(5))
                .build()
                .unwrap(),
        )
        .class(
            "/uploads",
            RateLimitConfig::builder()
                .max_requests(3)
                .window(Duration::from_secs(5))
                .cooldown(Duration::from_secs(10))
                .build()
                .unwrap(),
        )
        .build()
        .unwrap()
}

/// Classes throttle independently: filling the /ai budget does not slow
/// default-class traffic.
#[tokio::test(start_paused = true)]
async fn classes_do_not_interfere() {
    let limiter = platform_limiter();

    limiter.acquire("/ai/suggest").await;
    limiter.acquire("/ai/suggest").await;

    let start = Instant::now();
    limiter.acquire("/properties").await;
    limiter.acquire("/leases").await;
    assert_eq!(start.elapsed(), Duration::ZERO);
}

/// The third /ai request waits for the two-second window, while clones of
/// the limiter share the same budget.
#[tokio::test(start_paused = true)]
async fn clones_share_budgets() {
    let limiter = platform_limiter();
    let clone = limiter.clone();

    limiter.acquire("/ai/suggest").await;
    clone.acquire("/ai/suggest").await;

    let start = Instant::now();
    limiter.acquire("/ai/suggest").await;
    assert!(start.elapsed() >= Duration::from_secs(2));
}

/// A penalty makes the next admission immediate even when the window was
/// full, and the cool-down hint reflects the class configuration.
#[tokio::test(start_paused = true)]
async fn penalty_resets_a_saturated_class() {
    let limiter = platform_limiter();

    for _ in 0..3 {
        limiter.acquire("/uploads/images").await;
    }

    limiter.penalize("/uploads/images");

    let start = Instant::now();
    limiter.acquire("/uploads/images").await;
    assert_eq!(start.elapsed(), Duration::ZERO);
    assert_eq!(limiter.cooldown_hint("/uploads/images"), Some(Duration::from_secs(10)));
    assert_eq!(limiter.cooldown_hint("/properties"), None);
}

/// Many queued requests drain in order without ever being rejected; each
/// admission frees a slot one window-length after the one it replaced.
#[tokio::test(start_paused = true)]
async fn saturated_class_drains_without_rejection() {
    let limiter = platform_limiter();

    let start = Instant::now();
    for _ in 0..6 {
        limiter.acquire("/ai/suggest").await;
    }
    // Budget is 2 per 2s: six sequential admissions need two full windows.
    assert!(start.elapsed() >= Duration::from_secs(4));
}
