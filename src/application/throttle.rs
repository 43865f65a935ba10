use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Past this many tracked usernames a failure also sweeps stale buckets.
const SWEEP_THRESHOLD: usize = 10_000;

/// Sliding-window counter of failed sign-ins per username.
#[derive(Debug, Clone)]
pub struct LoginThrottle {
    window: Duration,
    max_failures: u32,
    buckets: Arc<DashMap<String, Vec<Instant>>>,
}

impl LoginThrottle {
    pub fn new(window: Duration, max_failures: u32) -> Self {
        Self {
            window,
            max_failures,
            buckets: Arc::new(DashMap::new()),
        }
    }

    /// `Err(seconds)` until the oldest failure in the window expires.
    pub fn check(&self, username: &str) -> Result<(), u64> {
        let now = Instant::now();
        let window = self.window;
        let key = username.to_lowercase();

        let verdict = {
            let Some(mut entry) = self.buckets.get_mut(&key) else {
                return Ok(());
            };
            entry.retain(|instant| now.duration_since(*instant) < window);

            if (entry.len() as u32) < self.max_failures {
                Ok(entry.is_empty())
            } else {
                let retry_after = entry
                    .first()
                    .map(|oldest| window.saturating_sub(now.duration_since(*oldest)))
                    .unwrap_or(window);
                Err(retry_after.as_secs().max(1))
            }
        };

        match verdict {
            Ok(true) => {
                self.buckets.remove_if(&key, |_, stamps| stamps.is_empty());
                Ok(())
            }
            Ok(false) => Ok(()),
            Err(retry_after) => Err(retry_after),
        }
    }

    pub fn record_failure(&self, username: &str) {
        let now = Instant::now();
        let window = self.window;
        {
            let mut entry = self.buckets.entry(username.to_lowercase()).or_default();
            entry.retain(|instant| now.duration_since(*instant) < window);
            entry.push(now);
        }
        if self.buckets.len() > SWEEP_THRESHOLD {
            self.sweep();
        }
    }

    pub fn reset(&self, username: &str) {
        self.buckets.remove(&username.to_lowercase());
    }

    /// Drops usernames whose failures have all left the window; returns how many.
    pub fn sweep(&self) -> usize {
        let now = Instant::now();
        let window = self.window;
        let before = self.buckets.len();
        self.buckets.retain(|_, stamps| {
            stamps.retain(|instant| now.duration_since(*instant) < window);
            !stamps.is_empty()
        });
        before.saturating_sub(self.buckets.len())
    }

    pub fn tracked_usernames(&self) -> usize {
        self.buckets.len()
    }
}
