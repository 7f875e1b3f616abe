//! Resilience patterns for client-side traffic shaping
//!
//! This module provides the admission-control primitives the API access
//! layer is built on:
//! - **Sliding window limiter**: admits at most N requests per endpoint
//!   class in any trailing time interval, delaying (never rejecting) the
//!   overflow
//! - **Punitive cool-down**: resets a class window after a server-signaled
//!   overload and keeps it clear for a configured period
//!
//! The limiter is deliberately asynchronous: an admission check that finds
//! the window full suspends the caller until a slot frees up, so callers
//! impose their own timeouts if they need a hard bound.

pub mod rate_limiter;

pub use rate_limiter::{
    RateLimitConfig, RateLimitConfigBuilder, SlidingWindowLimiter, SlidingWindowLimiterBuilder,
};
