//! Request and token budgeting for the translation service.
//!
//! The limiter counts requests and estimated tokens inside a fixed window
//! (one minute by default). When either budget is met the caller is put to
//! sleep until the window ends, then a fresh window starts.

use std::time::{Duration, Instant};

/// Source of time for the limiter.
pub trait Clock {
    /// Current instant.
    fn now(&self) -> Instant;

    /// Block the caller for `duration`.
    fn sleep(&self, duration: Duration);
}

/// Wall clock backed by [`Instant`] and [`std::thread::sleep`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Budgets for one rate window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimits {
    /// Requests allowed per window.
    pub max_requests: u32,

    /// Estimated tokens allowed per window.
    pub max_tokens: u64,

    /// Length of the window.
    pub window: Duration,
}

impl Default for RateLimits {
    fn default() -> Self {
        Self {
            max_requests: 60,
            max_tokens: 100_000,
            window: Duration::from_secs(60),
        }
    }
}

/// Rough token cost of a text: its whitespace-delimited word count.
pub fn estimate_tokens(text: &str) -> u64 {
    text.split_whitespace().count() as u64
}

/// Fixed-window limiter for outbound requests.
#[derive(Debug)]
pub struct RateLimiter<C: Clock = SystemClock> {
    limits: RateLimits,
    clock: C,
    window_start: Instant,
    requests: u32,
    tokens: u64,
}

impl RateLimiter<SystemClock> {
    /// Create a limiter on the wall clock.
    pub fn new(limits: RateLimits) -> Self {
        Self::with_clock(limits, SystemClock)
    }
}

impl<C: Clock> RateLimiter<C> {
    /// Create a limiter on a custom clock.
    pub fn with_clock(limits: RateLimits, clock: C) -> Self {
        let window_start = clock.now();
        Self {
            limits,
            clock,
            window_start,
            requests: 0,
            tokens: 0,
        }
    }

    /// Account for one request costing `tokens`, blocking if a budget is met.
    ///
    /// Returns how long the caller was blocked, if at all.
    pub fn acquire(&mut self, tokens: u64) -> Option<Duration> {
        self.requests = self.requests.saturating_add(1);
        self.tokens = self.tokens.saturating_add(tokens);

        let now = self.clock.now();
        let elapsed = now.saturating_duration_since(self.window_start);

        if elapsed >= self.limits.window {
            self.reset(now);
            return None;
        }

        if self.requests >= self.limits.max_requests || self.tokens >= self.limits.max_tokens {
            let wait = self.limits.window - elapsed;
            log::info!(
                "Rate limit reached ({} requests, ~{} tokens), waiting {:.1}s",
                self.requests,
                self.tokens,
                wait.as_secs_f64()
            );
            self.clock.sleep(wait);
            let now = self.clock.now();
            self.reset(now);
            return Some(wait);
        }

        None
    }

    /// Requests counted in the current window.
    pub fn requests(&self) -> u32 {
        self.requests
    }

    /// Tokens counted in the current window.
    pub fn tokens(&self) -> u64 {
        self.tokens
    }

    /// Configured budgets.
    pub fn limits(&self) -> RateLimits {
        self.limits
    }

    fn reset(&mut self, now: Instant) {
        self.window_start = now;
        self.requests = 0;
        self.tokens = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    /// Virtual clock: `sleep` advances time instead of blocking.
    #[derive(Clone)]
    struct ManualClock {
        start: Instant,
        offset: Rc<Cell<Duration>>,
        sleeps: Rc<RefCell<Vec<Duration>>>,
    }

    impl ManualClock {
        fn new() -> Self {
            Self {
                start: Instant::now(),
                offset: Rc::new(Cell::new(Duration::ZERO)),
                sleeps: Rc::new(RefCell::new(Vec::new())),
            }
        }

        fn advance(&self, by: Duration) {
            self.offset.set(self.offset.get() + by);
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> Instant {
            self.start + self.offset.get()
        }

        fn sleep(&self, duration: Duration) {
            self.sleeps.borrow_mut().push(duration);
            self.advance(duration);
        }
    }

    fn limits(max_requests: u32, max_tokens: u64) -> RateLimits {
        RateLimits {
            max_requests,
            max_tokens,
            window: Duration::from_secs(60),
        }
    }

    #[test]
    fn test_estimate_tokens() {
        assert_eq!(estimate_tokens(""), 0);
        assert_eq!(estimate_tokens("   "), 0);
        assert_eq!(estimate_tokens("Hello World"), 2);
        assert_eq!(estimate_tokens("  one\ttwo\nthree  "), 3);
    }

    #[test]
    fn test_under_budget_does_not_block() {
        let clock = ManualClock::new();
        let mut limiter = RateLimiter::with_clock(limits(10, 1000), clock.clone());

        for _ in 0..5 {
            assert_eq!(limiter.acquire(3), None);
        }
        assert_eq!(limiter.requests(), 5);
        assert_eq!(limiter.tokens(), 15);
        assert!(clock.sleeps.borrow().is_empty());
    }

    #[test]
    fn test_request_ceiling_blocks_for_rest_of_window() {
        let clock = ManualClock::new();
        let mut limiter = RateLimiter::with_clock(limits(3, 1000), clock.clone());

        assert_eq!(limiter.acquire(1), None);
        clock.advance(Duration::from_secs(20));
        assert_eq!(limiter.acquire(1), None);

        // Third request meets the ceiling 20s into the window
        assert_eq!(limiter.acquire(1), Some(Duration::from_secs(40)));
        assert_eq!(*clock.sleeps.borrow(), vec![Duration::from_secs(40)]);

        // Fresh window afterwards
        assert_eq!(limiter.requests(), 0);
        assert_eq!(limiter.tokens(), 0);
        assert_eq!(limiter.acquire(1), None);
    }

    #[test]
    fn test_token_ceiling_blocks() {
        let clock = ManualClock::new();
        let mut limiter = RateLimiter::with_clock(limits(100, 10), clock.clone());

        assert_eq!(limiter.acquire(4), None);
        clock.advance(Duration::from_secs(15));
        assert_eq!(limiter.acquire(4), None);
        clock.advance(Duration::from_secs(15));

        let waited = limiter.acquire(4);
        assert_eq!(waited, Some(Duration::from_secs(30)));
        assert_eq!(limiter.tokens(), 0);
    }

    #[test]
    fn test_elapsed_window_resets_regardless_of_usage() {
        let clock = ManualClock::new();
        let mut limiter = RateLimiter::with_clock(limits(3, 1000), clock.clone());

        assert_eq!(limiter.acquire(500), None);
        assert_eq!(limiter.acquire(400), None);
        clock.advance(Duration::from_secs(61));

        // Would meet both ceilings, but the window is over
        assert_eq!(limiter.acquire(200), None);
        assert_eq!(limiter.requests(), 0);
        assert_eq!(limiter.tokens(), 0);
        assert!(clock.sleeps.borrow().is_empty());
    }
}
