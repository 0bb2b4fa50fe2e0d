// src/api/rate_limiter.rs
//! Fixed-window throttle for outbound provider calls.

use std::future::Future;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

const RATE_WINDOW: Duration = Duration::from_secs(1);

#[derive(Debug)]
struct RateWindow {
    started: Instant,
    dispatched: u32,
}

/// Dispatches at most `max_requests_per_second` operations per window.
///
/// Callers queue on an async mutex, so admission follows submission order.
/// The limiter never fails: it only delays.
#[derive(Debug)]
pub struct RateLimiter {
    max_requests_per_second: AtomicU32,
    window: Mutex<RateWindow>,
}

impl RateLimiter {
    pub fn new(max_requests_per_second: u32) -> Self {
        Self {
            max_requests_per_second: AtomicU32::new(max_requests_per_second.max(1)),
            window: Mutex::new(RateWindow {
                started: Instant::now(),
                dispatched: 0,
            }),
        }
    }

    pub fn max_requests_per_second(&self) -> u32 {
        self.max_requests_per_second.load(Ordering::Relaxed)
    }

    /// Changes the quota; takes effect for the next admitted call.
    pub fn set_max_requests_per_second(&self, max_requests_per_second: u32) {
        self.max_requests_per_second
            .store(max_requests_per_second.max(1), Ordering::Relaxed);
    }

    /// Runs `request` once the current window has room for it.
    pub async fn execute<F, Fut, T>(&self, request: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        self.admit().await;
        request().await
    }

    async fn admit(&self) {
        let mut window = self.window.lock().await;
        let limit = self.max_requests_per_second();

        if window.started.elapsed() >= RATE_WINDOW {
            window.started = Instant::now();
            window.dispatched = 0;
        }

        if window.dispatched >= limit {
            let boundary = window.started + RATE_WINDOW;
            log::debug!(
                "Rate limit of {}/s reached, waiting {:?}",
                limit,
                boundary.saturating_duration_since(Instant::now())
            );
            tokio::time::sleep_until(boundary).await;
            window.started = Instant::now();
            window.dispatched = 0;
        }

        window.dispatched += 1;
    }
}
