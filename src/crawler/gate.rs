//! Concurrency gate for page fetches
//!
//! Bounds how many fetches are in flight, paces each one with a short fixed
//! delay so bursts do not line up, and applies a per-second quota on top.

use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use std::future::Future;
use std::num::NonZeroU32;
use std::time::Duration;
use tokio::sync::{Semaphore, SemaphorePermit};

use crate::config::Config;
use crate::utils::error::FetchError;

/// Default in-flight ceiling
pub const DEFAULT_MAX_IN_FLIGHT: usize = 5;

/// Default delay before each call
pub const DEFAULT_PACE: Duration = Duration::from_millis(50);

/// Default per-second quota
pub const DEFAULT_RATE_LIMIT: u32 = 10;

/// Bounded, paced gate around remote calls
pub struct ConcurrencyGate {
    /// In-flight permits
    semaphore: Semaphore,

    /// Fixed delay applied after entering the gate
    pace: Duration,

    /// Per-second quota
    rate_limiter: RateLimiter<NotKeyed, InMemoryState, DefaultClock>,

    max_in_flight: usize,
}

impl ConcurrencyGate {
    /// Create a gate
    ///
    /// `max_in_flight` and `pace` are clamped to at least 1 permit and 1 ms;
    /// a rate of 0 falls back to 1 request per second.
    pub fn new(max_in_flight: usize, pace: Duration, requests_per_second: u32) -> Self {
        let max_in_flight = max_in_flight.max(1);
        let pace = pace.max(Duration::from_millis(1));

        let rate = NonZeroU32::new(requests_per_second).unwrap_or(NonZeroU32::MIN);
        let rate_limiter = RateLimiter::direct(Quota::per_second(rate));

        Self {
            semaphore: Semaphore::new(max_in_flight),
            pace,
            rate_limiter,
            max_in_flight,
        }
    }

    /// Create from configuration
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.collector.max_concurrent_requests,
            config.pace_delay(),
            config.collector.rate_limit,
        )
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight
    }

    pub fn pace(&self) -> Duration {
        self.pace
    }

    /// Run `operation` once a permit is held, the pace delay has elapsed and
    /// the quota allows it. The permit is released when the operation ends.
    ///
    /// # Errors
    ///
    /// `FetchError::GateClosed` if the semaphore was closed
    pub async fn run<T, F, Fut>(&self, operation: F) -> Result<T, FetchError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let _permit = self.acquire().await?;

        tokio::time::sleep(self.pace).await;
        self.rate_limiter.until_ready().await;

        Ok(operation().await)
    }

    /// Like [`Self::run`], but gives up as soon as `proceed` returns false
    ///
    /// `proceed` is checked before waiting for a permit, once the permit is
    /// held and again after the pace delay. A call that gives up returns
    /// `Ok(None)` without sleeping further or spending quota.
    ///
    /// # Errors
    ///
    /// `FetchError::GateClosed` if the semaphore was closed
    pub async fn run_if<T, P, F, Fut>(&self, proceed: P, operation: F) -> Result<Option<T>, FetchError>
    where
        P: Fn() -> bool,
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        if !proceed() {
            return Ok(None);
        }

        let _permit = self.acquire().await?;
        if !proceed() {
            return Ok(None);
        }

        tokio::time::sleep(self.pace).await;
        if !proceed() {
            return Ok(None);
        }
        self.rate_limiter.until_ready().await;

        Ok(Some(operation().await))
    }

    async fn acquire(&self) -> Result<SemaphorePermit<'_>, FetchError> {
        self.semaphore
            .acquire()
            .await
            .map_err(|_| FetchError::GateClosed)
    }
}

impl Default for ConcurrencyGate {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_IN_FLIGHT, DEFAULT_PACE, DEFAULT_RATE_LIMIT)
    }
}
