use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::debug;

/// Spaces out requests so a single run never bursts the search API
#[derive(Debug)]
pub struct RateLimiter {
    last_request_time: Option<Instant>,
    min_interval: Duration,
}

impl RateLimiter {
    /// Create a new rate limiter with the specified rate (requests per second)
    #[must_use]
    pub fn new(requests_per_second: f64) -> Self {
        let min_interval = Self::interval_for(requests_per_second);

        debug!(
            "Created rate limiter: {} requests per second",
            requests_per_second
        );

        Self {
            last_request_time: None,
            min_interval,
        }
    }

    fn interval_for(requests_per_second: f64) -> Duration {
        if requests_per_second > 0.0 {
            Duration::from_millis((1000.0 / requests_per_second) as u64)
        } else {
            Duration::from_secs(1)
        }
    }

    /// Wait until it's safe to make a request
    pub async fn acquire(&mut self) {
        if let Some(wait_time) = self.time_until_ready() {
            debug!("Rate limiter: waiting {}ms", wait_time.as_millis());
            sleep(wait_time).await;
        }

        self.last_request_time = Some(Instant::now());
    }

    /// Get time until next request is allowed
    #[must_use]
    pub fn time_until_ready(&self) -> Option<Duration> {
        self.last_request_time.and_then(|last_time| {
            let elapsed = last_time.elapsed();
            if elapsed >= self.min_interval {
                None
            } else {
                Some(self.min_interval - elapsed)
            }
        })
    }
}
