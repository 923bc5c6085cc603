use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};

#[derive(Clone, Debug)]
struct RateLimitEntry {
    count: u32,
    window_start: DateTime<Utc>,
}

/// Sliding-window rate limiter keyed by caller identity (client IP or
/// username) and action name.
pub struct RateLimiter {
    entries: Mutex<HashMap<String, HashMap<String, RateLimitEntry>>>,
    max_requests: u32,
    window_seconds: i64,
}

impl RateLimiter {
    pub fn new(max_requests: u32, window_seconds: i64) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            max_requests,
            window_seconds,
        }
    }

    /// Returns Ok(()) if allowed, Err(message) if rate limited.
    pub fn check(&self, key: &str, action: &str) -> Result<(), String> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| "Failed to acquire rate limiter lock".to_string())?;

        let now = Utc::now();
        let window_duration = Duration::seconds(self.window_seconds);

        // Sweep elapsed windows so idle keys do not accumulate forever.
        entries.retain(|_, actions| {
            actions.retain(|_, entry| now < entry.window_start + window_duration);
            !actions.is_empty()
        });

        let key_entries = entries.entry(key.to_string()).or_insert_with(HashMap::new);

        let entry = key_entries
            .entry(action.to_string())
            .or_insert_with(|| RateLimitEntry {
                count: 0,
                window_start: now,
            });

        entry.count += 1;

        if entry.count > self.max_requests {
            let retry_after = (entry.window_start + window_duration - now).num_seconds();
            return Err(format!(
                "Rate limit exceeded. Max {} requests per {} seconds. Try again in {} seconds.",
                self.max_requests,
                self.window_seconds,
                retry_after.max(0)
            ));
        }

        Ok(())
    }

    #[cfg(test)]
    fn tracked_keys(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }
}

lazy_static::lazy_static! {
    /// Public storefront discount apply: 30 requests per minute per caller.
    pub static ref APPLY_DISCOUNT_LIMIT: RateLimiter = RateLimiter::new(30, 60);

    /// Image uploads go out to a third-party API: 10 per minute per caller.
    pub static ref UPLOAD_LIMIT: RateLimiter = RateLimiter::new(10, 60);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allows_up_to_limit_then_blocks() {
        let limiter = RateLimiter::new(3, 60);
        for _ in 0..3 {
            assert!(limiter.check("10.0.0.1", "apply").is_ok());
        }
        let err = limiter.check("10.0.0.1", "apply").unwrap_err();
        assert!(err.contains("Rate limit exceeded"));
    }

    #[test]
    fn test_keys_are_independent() {
        let limiter = RateLimiter::new(1, 60);
        assert!(limiter.check("10.0.0.1", "apply").is_ok());
        assert!(limiter.check("10.0.0.2", "apply").is_ok());
        assert!(limiter.check("10.0.0.1", "apply").is_err());
    }

    #[test]
    fn test_expired_windows_are_pruned() {
        let limiter = RateLimiter::new(5, 0);
        assert!(limiter.check("10.0.0.1", "apply").is_ok());
        assert!(limiter.check("10.0.0.2", "apply").is_ok());
        assert_eq!(limiter.tracked_keys(), 1);
    }

    #[test]
    fn test_expiry_resets_the_budget() {
        let limiter = RateLimiter::new(1, 0);
        assert!(limiter.check("10.0.0.1", "apply").is_ok());
        assert!(limiter.check("10.0.0.1", "apply").is_ok());
    }

    #[test]
    fn test_actions_are_independent() {
        let limiter = RateLimiter::new(1, 60);
        assert!(limiter.check("10.0.0.1", "apply").is_ok());
        assert!(limiter.check("10.0.0.1", "upload").is_ok());
    }
}
