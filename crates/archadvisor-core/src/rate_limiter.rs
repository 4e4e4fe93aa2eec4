//! Sliding-window admission control keyed by client fingerprint.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

pub struct SlidingWindowRateLimiter {
    max_requests: u32,
    window: Duration,
    hits: Mutex<HashMap<String, Vec<Instant>>>,
}

impl SlidingWindowRateLimiter {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            hits: Mutex::new(HashMap::new()),
        }
    }

    pub fn max_requests(&self) -> u32 {
        self.max_requests
    }

    /// Prune timestamps older than the window, admit if a slot remains, and
    /// record the admission. Fails closed: if the lock is poisoned the
    /// request is denied.
    pub fn allow(&self, key: &str) -> bool {
        let now = Instant::now();
        let Ok(mut hits) = self.hits.lock() else {
            tracing::error!("rate limiter state poisoned; denying request");
            return false;
        };
        let window_hits = hits.entry(key.to_string()).or_default();
        window_hits.retain(|t| now.duration_since(*t) < self.window);
        if window_hits.len() >= self.max_requests as usize {
            return false;
        }
        window_hits.push(now);
        true
    }

    /// Remaining admissions in the current window, without consuming one.
    pub fn remaining(&self, key: &str) -> u32 {
        let now = Instant::now();
        let Ok(hits) = self.hits.lock() else {
            return 0;
        };
        let in_window = hits
            .get(key)
            .map(|ts| ts.iter().filter(|t| now.duration_since(**t) < self.window).count())
            .unwrap_or(0);
        self.max_requests.saturating_sub(in_window as u32)
    }

    /// Seconds until the oldest in-window admission expires.
    pub fn reset_time(&self, key: &str) -> u64 {
        let now = Instant::now();
        let Ok(hits) = self.hits.lock() else {
            return self.window.as_secs();
        };
        hits.get(key)
            .and_then(|ts| {
                ts.iter()
                    .filter(|t| now.duration_since(**t) < self.window)
                    .min()
            })
            .map(|oldest| {
                self.window
                    .saturating_sub(now.duration_since(*oldest))
                    .as_secs()
            })
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admits_up_to_the_limit_then_denies() {
        let limiter = SlidingWindowRateLimiter::new(3, Duration::from_secs(60));
        assert!(limiter.allow("client"));
        assert!(limiter.allow("client"));
        assert!(limiter.allow("client"));
        assert!(!limiter.allow("client"));
        assert_eq!(limiter.remaining("client"), 0);
    }

    #[test]
    fn keys_are_independent() {
        let limiter = SlidingWindowRateLimiter::new(1, Duration::from_secs(60));
        assert!(limiter.allow("a"));
        assert!(limiter.allow("b"));
        assert!(!limiter.allow("a"));
    }

    #[test]
    fn window_expiry_frees_slots() {
        let limiter = SlidingWindowRateLimiter::new(2, Duration::from_millis(40));
        assert!(limiter.allow("client"));
        assert!(limiter.allow("client"));
        assert!(!limiter.allow("client"));
        std::thread::sleep(Duration::from_millis(50));
        assert!(limiter.allow("client"));
    }

    #[test]
    fn remaining_does_not_consume() {
        let limiter = SlidingWindowRateLimiter::new(5, Duration::from_secs(60));
        assert_eq!(limiter.remaining("client"), 5);
        assert_eq!(limiter.remaining("client"), 5);
        limiter.allow("client");
        assert_eq!(limiter.remaining("client"), 4);
    }

    #[test]
    fn reset_time_tracks_the_oldest_admission() {
        let limiter = SlidingWindowRateLimiter::new(1, Duration::from_secs(60));
        assert_eq!(limiter.reset_time("client"), 0);
        limiter.allow("client");
        let reset = limiter.reset_time("client");
        assert!(reset <= 60 && reset >= 58, "reset was {reset}");
    }

    #[test]
    fn at_most_max_requests_admitted_within_any_window() {
        let limiter = SlidingWindowRateLimiter::new(4, Duration::from_secs(60));
        let admitted = (0..20).filter(|_| limiter.allow("client")).count();
        assert_eq!(admitted, 4);
    }
}
