//! Outbound call pacing
//!
//! A single shared gate bounding calls to the Fortnox API to a
//! configured requests-per-second ceiling. Callers are delayed, never
//! rejected. The last-call timestamp is stamped unconditionally after
//! every permitted call, so bursts under the interval threshold still
//! advance the clock.

use std::time::{Duration, Instant};

use tokio::sync::Mutex;
use tracing::trace;

/// Fixed-interval pacing gate.
///
/// Holding the internal lock across the wait serializes callers, so N
/// concurrent acquires complete no faster than (N-1) intervals apart.
pub struct Throttle {
    min_interval: Duration,
    last_call: Mutex<Option<Instant>>,
}

impl Throttle {
    /// Create a gate allowing at most `rate_limit` calls per second.
    ///
    /// `rate_limit` must be non-zero; config validation enforces this
    /// before construction.
    pub fn new(rate_limit: u32) -> Self {
        Self {
            min_interval: Duration::from_secs(1) / rate_limit,
            last_call: Mutex::new(None),
        }
    }

    /// Wait until the minimum inter-call interval has elapsed, then
    /// record the current time as the new last-call timestamp.
    pub async fn acquire(&self) {
        let mut last_call = self.last_call.lock().await;
        if let Some(last) = *last_call {
            let elapsed = last.elapsed();
            if elapsed < self.min_interval {
                let wait = self.min_interval - elapsed;
                trace!(wait_ms = wait.as_millis() as u64, "throttling outbound call");
                tokio::time::sleep(wait).await;
            }
        }
        *last_call = Some(Instant::now());
    }
}
