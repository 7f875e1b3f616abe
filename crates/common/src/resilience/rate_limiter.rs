//! Sliding-window rate limiting keyed by endpoint class
//!
//! Backend routes are grouped into coarse classes by URL prefix (`/auth`,
//! `/ai`, `/uploads`, ...), each with its own request budget. Every class
//! keeps a window of admission timestamps; a request whose class window is
//! full is suspended until the oldest timestamp ages out, then admitted.
//! Admission therefore delays but never rejects.
//!
//! A server-signaled overload (HTTP 429) is punished with [`penalize`]:
//! the class window is cleared immediately (releasing queued waiters) and,
//! when a cool-down is configured, cleared again once the cool-down
//! elapses so the class restarts from an empty window.
//!
//! [`penalize`]: SlidingWindowLimiter::penalize

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::Notify;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Window key used when a URL matches no configured class prefix.
const DEFAULT_CLASS: &str = "default";

/// Admission budget for one endpoint class
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Maximum number of requests admitted within the trailing window
    pub max_requests: u32,
    /// Length of the trailing window
    pub window: Duration,
    /// Cool-down applied after a server-signaled overload
    pub cooldown: Option<Duration>,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self { max_requests: 5, window: Duration::from_secs(1), cooldown: None }
    }
}

impl RateLimitConfig {
    /// Create a new configuration builder
    pub fn builder() -> RateLimitConfigBuilder {
        RateLimitConfigBuilder::new()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.max_requests == 0 {
            return Err("max_requests must be greater than 0".to_string());
        }
        if self.window.is_zero() {
            return Err("window must be greater than zero".to_string());
        }
        Ok(())
    }
}

/// Builder for [`RateLimitConfig`]
#[derive(Debug)]
pub struct RateLimitConfigBuilder {
    config: RateLimitConfig,
}

impl Default for RateLimitConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RateLimitConfigBuilder {
    pub fn new() -> Self {
        Self { config: RateLimitConfig::default() }
    }

    pub fn max_requests(mut self, max_requests: u32) -> Self {
        self.config.max_requests = max_requests;
        self
    }

    pub fn window(mut self, window: Duration) -> Self {
        self.config.window = window;
        self
    }

    pub fn cooldown(mut self, cooldown: Duration) -> Self {
        self.config.cooldown = Some(cooldown);
        self
    }

    pub fn build(self) -> Result<RateLimitConfig, String> {
        self.config.validate()?;
        Ok(self.config)
    }
}

struct LimiterInner {
    /// Class prefixes with their budgets, longest prefix first
    classes: Vec<(String, RateLimitConfig)>,
    default_config: RateLimitConfig,
    /// Admission timestamps per class, pruned lazily on each check
    windows: Mutex<HashMap<String, VecDeque<Instant>>>,
    /// Wakes suspended admission checks when a penalty clears a window
    window_cleared: Notify,
}

impl LimiterInner {
    /// Resolve the endpoint class for a URL by longest-prefix match.
    fn resolve(&self, url: &str) -> (&str, &RateLimitConfig) {
        for (prefix, config) in &self.classes {
            if url.starts_with(prefix.as_str()) {
                return (prefix.as_str(), config);
            }
        }
        (DEFAULT_CLASS, &self.default_config)
    }

    /// Try to admit one request for `class`.
    ///
    /// Returns `None` when admitted (the timestamp is recorded), or the
    /// duration until the oldest window entry ages out. The lock is held
    /// only for the read-prune-append; never across a suspension.
    fn try_admit(&self, class: &str, config: &RateLimitConfig) -> Option<Duration> {
        let mut windows = self.windows.lock();
        let window = windows.entry(class.to_string()).or_default();
        let now = Instant::now();

        while window.front().is_some_and(|&t| now.duration_since(t) >= config.window) {
            window.pop_front();
        }

        if (window.len() as u32) < config.max_requests {
            window.push_back(now);
            return None;
        }

        match window.front().copied() {
            Some(oldest) => Some(config.window.saturating_sub(now.duration_since(oldest))),
            // Unreachable while max_requests >= 1, but admitting is the
            // safe answer for an empty-yet-full window.
            None => {
                window.push_back(now);
                None
            }
        }
    }

    fn clear_class(&self, class: &str) {
        let mut windows = self.windows.lock();
        if let Some(window) = windows.get_mut(class) {
            window.clear();
        }
    }
}

/// Sliding-window limiter shared by all requests of one API client
///
/// Cloning is cheap and clones share the same windows, so every handle
/// throttles against the same budgets.
///
/// # Examples
///
/// ```rust
/// use std::time::Duration;
///
/// use tenora_common::resilience::{RateLimitConfig, SlidingWindowLimiter};
///
/// # async fn example() -> Result<(), String> {
/// let limiter = SlidingWindowLimiter::builder()
///     .class(
///         "/uploads",
///         RateLimitConfig::builder()
///             .max_requests(3)
///             .window(Duration::from_secs(5))
///             .cooldown(Duration::from_secs(10))
///             .build()?,
///     )
///     .build()?;
///
/// // Suspends if the /uploads window is full, then admits.
/// limiter.acquire("/uploads/images").await;
/// # Ok(())
/// # }
/// ```
pub struct SlidingWindowLimiter {
    inner: Arc<LimiterInner>,
}

impl SlidingWindowLimiter {
    /// Create a builder for configuring per-class budgets
    pub fn builder() -> SlidingWindowLimiterBuilder {
        SlidingWindowLimiterBuilder::new()
    }

    /// Admit one request for the class matching `url`, delaying as needed.
    ///
    /// Resolves the endpoint class by longest-prefix match, falling back to
    /// the default class. When the class window is full the caller is
    /// suspended until the oldest admission ages out of the window (or a
    /// penalty clears it), then re-checked. This never rejects; callers
    /// needing a hard cap impose their own timeout, and a caller that
    /// gives up while suspended leaves no trace in the window.
    pub async fn acquire(&self, url: &str) {
        let (class, config) = self.inner.resolve(url);

        loop {
            let Some(wait) = self.inner.try_admit(class, config) else {
                return;
            };

            debug!(
                class,
                wait_ms = wait.as_millis() as u64,
                max_requests = config.max_requests,
                "admission window full; delaying request"
            );

            tokio::select! {
                () = tokio::time::sleep(wait) => {}
                () = self.inner.window_cleared.notified() => {}
            }
        }
    }

    /// React to a server-signaled overload (HTTP 429) for `url`'s class.
    ///
    /// Clears the class window immediately so queued waiters are released,
    /// and schedules a second clearing pass after the configured cool-down
    /// so the class restarts from an empty window once the backend has
    /// recovered.
    pub fn penalize(&self, url: &str) {
        let (class, config) = self.inner.resolve(url);

        warn!(class, "server-signaled overload; resetting admission window");
        self.inner.clear_class(class);
        self.inner.window_cleared.notify_waiters();

        if let Some(cooldown) = config.cooldown {
            let inner = Arc::clone(&self.inner);
            let class = class.to_string();
            tokio::spawn(async move {
                tokio::time::sleep(cooldown).await;
                inner.clear_class(&class);
                inner.window_cleared.notify_waiters();
                debug!(class = %class, "cool-down elapsed; admission window reset");
            });
        }
    }

    /// The configured cool-down for `url`'s class, if any.
    ///
    /// Carried into rate-limit errors as a "try again in" hint.
    pub fn cooldown_hint(&self, url: &str) -> Option<Duration> {
        self.inner.resolve(url).1.cooldown
    }

    #[cfg(test)]
    fn window_len(&self, class: &str) -> usize {
        self.inner.windows.lock().get(class).map_or(0, VecDeque::len)
    }
}

impl Clone for SlidingWindowLimiter {
    fn clone(&self) -> Self {
        Self { inner: Arc::clone(&self.inner) }
    }
}

impl Default for SlidingWindowLimiter {
    fn default() -> Self {
        Self {
            inner: Arc::new(LimiterInner {
                classes: Vec::new(),
                default_config: RateLimitConfig::default(),
                windows: Mutex::new(HashMap::new()),
                window_cleared: Notify::new(),
            }),
        }
    }
}

/// Builder for [`SlidingWindowLimiter`]
#[derive(Debug, Default)]
pub struct SlidingWindowLimiterBuilder {
    classes: Vec<(String, RateLimitConfig)>,
    default_config: RateLimitConfig,
}

impl SlidingWindowLimiterBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a budget for all URLs starting with `prefix`.
    ///
    /// Multiple logical endpoints sharing one prefix share one window;
    /// the budget throttles the backend resource, not the URL.
    pub fn class(mut self, prefix: impl Into<String>, config: RateLimitConfig) -> Self {
        self.classes.push((prefix.into(), config));
        self
    }

    /// Budget applied to URLs matching no registered prefix.
    pub fn default_config(mut self, config: RateLimitConfig) -> Self {
        self.default_config = config;
        self
    }

    pub fn build(mut self) -> Result<SlidingWindowLimiter, String> {
        self.default_config.validate()?;
        for (prefix, config) in &self.classes {
            if prefix.is_empty() {
                return Err("class prefix must not be empty".to_string());
            }
            config.validate().map_err(|e| format!("class {prefix}: {e}"))?;
        }

        let mut seen = std::collections::HashSet::new();
        for (prefix, _) in &self.classes {
            if !seen.insert(prefix.clone()) {
                return Err(format!("duplicate class prefix: {prefix}"));
            }
        }

        // Longest prefix first so `/auth/refresh` wins over `/auth`.
        self.classes.sort_by(|a, b| b.0.len().cmp(&a.0.len()));

        Ok(SlidingWindowLimiter {
            inner: Arc::new(LimiterInner {
                classes: self.classes,
                default_config: self.default_config,
                windows: Mutex::new(HashMap::new()),
                window_cleared: Notify::new(),
            }),
        })
    }
}
