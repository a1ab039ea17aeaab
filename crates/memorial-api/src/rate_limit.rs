use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Per-client throttle consulted before accepting a request.
///
/// Handlers only see this trait, so a shared backend can replace the
/// in-process [`SlidingWindowLimiter`] when running several instances.
pub trait RateLimiter: Send + Sync {
    /// Records an attempt for `key` and reports whether it is allowed.
    fn allow(&self, key: &str) -> bool;

    /// Drops bookkeeping for idle keys. Returns how many keys were removed.
    fn sweep(&self) -> usize {
        0
    }
}

/// Keeps the timestamps of recent attempts per key and rejects once `max`
/// of them fall inside `window`. Rejected attempts are not recorded.
pub struct SlidingWindowLimiter {
    window: Duration,
    max: usize,
    hits: Mutex<HashMap<String, VecDeque<Instant>>>,
}

impl SlidingWindowLimiter {
    pub fn new(window: Duration, max: usize) -> Self {
        Self {
            window,
            max,
            hits: Mutex::new(HashMap::new()),
        }
    }

    /// 5 submissions per minute.
    pub fn memory_submissions() -> Self {
        Self::new(Duration::from_secs(60), 5)
    }

    /// 5 login attempts per 15 minutes, successful or not.
    pub fn admin_login() -> Self {
        Self::new(Duration::from_secs(15 * 60), 5)
    }

    pub fn allow_at(&self, key: &str, now: Instant) -> bool {
        let mut hits = self.hits.lock().unwrap_or_else(|e| e.into_inner());
        let entries = hits.entry(key.to_string()).or_default();

        while let Some(&oldest) = entries.front() {
            if now.saturating_duration_since(oldest) >= self.window {
                entries.pop_front();
            } else {
                break;
            }
        }

        if entries.len() >= self.max {
            return false;
        }

        entries.push_back(now);
        true
    }

    pub fn sweep_at(&self, now: Instant) -> usize {
        let mut hits = self.hits.lock().unwrap_or_else(|e| e.into_inner());
        let before = hits.len();
        hits.retain(|_, entries| {
            entries
                .back()
                .is_some_and(|&last| now.saturating_duration_since(last) < self.window)
        });
        before - hits.len()
    }

    pub fn tracked_keys(&self) -> usize {
        self.hits.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

impl RateLimiter for SlidingWindowLimiter {
    fn allow(&self, key: &str) -> bool {
        self.allow_at(key, Instant::now())
    }

    fn sweep(&self) -> usize {
        self.sweep_at(Instant::now())
    }
}
