use std::num::NonZeroU32;
use std::time::Duration;

use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter as GovernorRateLimiter};
use nonzero_ext::nonzero;
use tracing::debug;

/// At most `requests` provider calls per `window`, shared by every batch.
///
/// The window is spread evenly over the requests, with a burst of the full
/// quota allowed up front.
pub struct RateLimiter {
    limiter: GovernorRateLimiter<NotKeyed, InMemoryState, DefaultClock>,
}

impl RateLimiter {
    pub fn new(requests: u32, window: Duration) -> Self {
        let burst: NonZeroU32 = NonZeroU32::new(requests).unwrap_or(nonzero!(1u32));
        let quota: Quota = Quota::with_period(window / burst.get())
            .unwrap_or_else(|| Quota::per_second(burst))
            .allow_burst(burst);
        debug!("Scoring rate limit: {burst} requests per {window:?}");

        Self {
            limiter: GovernorRateLimiter::direct(quota),
        }
    }

    /// Waits until a request may be sent.
    pub async fn acquire(&self) {
        self.limiter.until_ready().await;
    }

    /// Claims a slot only if one is free right now.
    pub fn try_acquire(&self) -> bool {
        self.limiter.check().is_ok()
    }
}
