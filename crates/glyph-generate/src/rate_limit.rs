//! Sliding-window request limiter.

use std::collections::VecDeque;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

/// Longest single sleep while waiting for a slot.
const MAX_WAIT_STEP: Duration = Duration::from_secs(1);

/// Allows at most `max_requests` acquisitions in any trailing `window`.
#[derive(Debug)]
pub struct RateLimiter {
    max_requests: usize,
    window: Duration,
    requests: Mutex<VecDeque<Instant>>,
}

impl RateLimiter {
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            requests: Mutex::new(VecDeque::with_capacity(max_requests)),
        }
    }

    /// Requests per minute.
    pub fn per_minute(max_requests: usize) -> Self {
        Self::new(max_requests, Duration::from_secs(60))
    }

    pub fn max_requests(&self) -> usize {
        self.max_requests
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    fn prune(&self, requests: &mut VecDeque<Instant>, now: Instant) {
        while requests
            .front()
            .is_some_and(|t| now.duration_since(*t) >= self.window)
        {
            requests.pop_front();
        }
    }

    /// Take a slot if one is free.
    pub async fn try_acquire(&self) -> bool {
        let mut requests = self.requests.lock().await;
        let now = Instant::now();
        self.prune(&mut requests, now);
        if requests.len() < self.max_requests {
            requests.push_back(now);
            true
        } else {
            false
        }
    }

    /// Wait until a slot is free, then take it. A zero limit never blocks.
    pub async fn wait_if_needed(&self) {
        if self.max_requests == 0 {
            return;
        }
        loop {
            if self.try_acquire().await {
                return;
            }
            let wait = {
                let requests = self.requests.lock().await;
                requests
                    .front()
                    .map(|oldest| self.window.saturating_sub(oldest.elapsed()))
                    .unwrap_or_default()
            };
            tracing::debug!(wait_ms = wait.as_millis() as u64, "rate limit reached, waiting");
            tokio::time::sleep(wait.min(MAX_WAIT_STEP)).await;
        }
    }

    /// Acquisitions still inside the window.
    pub async fn in_window(&self) -> usize {
        let mut requests = self.requests.lock().await;
        self.prune(&mut requests, Instant::now());
        requests.len()
    }
}
