//! Bounded retries for calls that may hit a gateway which is still warming up.
//!
//! A [`RetryPolicy`] is plain data: how many attempts, which status codes count
//! as transient and how long to wait in between. [`retry_with_policy`] is the
//! control flow, and [`RetryingExecutor`] applies both to HTTP requests.
//!
//! A response whose status is transient is retried until the attempts run out
//! and is then returned as is; it never turns into an error. Transport failures
//! are retried the same way and surface as `Error::Transport` once exhausted.
//! A request that cannot be built at all is rejected before the first attempt.

use crate::{
    data::{RequestSpec, ResponseDescriptor},
    error::Error,
    http_client::HttpTransport,
    util,
};
use std::{collections::BTreeSet, fmt::Debug, fmt::Display, sync::Arc, thread, time::Duration};
use tracing::{debug, warn};

/// Blocks the calling thread. Swapped for a recording fake in tests.
pub trait Sleeper: Debug + Send + Sync {
    fn sleep(&self, duration: Duration);
}

#[derive(Debug, Default, Copy, Clone)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        if !duration.is_zero() {
            thread::sleep(duration);
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum DelayStrategy {
    Fixed(Duration),
    /// `base * multiplier^k` before the (k+1)-th retry.
    Exponential { base: Duration, multiplier: f64 },
}

impl DelayStrategy {
    /// Delay to wait before retry number `retry` (0 for the first retry).
    pub fn delay_for_retry(&self, retry: u32) -> Duration {
        match *self {
            DelayStrategy::Fixed(delay) => delay,
            DelayStrategy::Exponential { base, multiplier } => {
                let millis = base.as_millis() as f64 * multiplier.powi(retry as i32);
                Duration::from_millis(millis.max(0.0) as u64)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    max_attempts: u32,
    retryable_status_codes: BTreeSet<u16>,
    delay: DelayStrategy,
}

impl RetryPolicy {
    /// `max_attempts` below 1 is raised to 1.
    pub fn new<I: IntoIterator<Item = u16>>(
        max_attempts: u32,
        retryable_status_codes: I,
        delay: DelayStrategy,
    ) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            retryable_status_codes: retryable_status_codes.into_iter().collect(),
            delay,
        }
    }

    /// 405 while routes are still loading, 503 while a circuit breaker is open.
    pub fn transient_gateway() -> Self {
        Self::new(3, vec![405, 503], DelayStrategy::Fixed(Duration::from_millis(500)))
    }

    pub fn service_unavailable_backoff() -> Self {
        Self::new(
            5,
            vec![503],
            DelayStrategy::Exponential {
                base: Duration::from_secs(1),
                multiplier: 2.0,
            },
        )
    }

    pub fn single_attempt() -> Self {
        Self::new(1, Vec::new(), DelayStrategy::Fixed(Duration::from_millis(0)))
    }

    pub fn builder() -> RetryPolicyBuilder {
        RetryPolicyBuilder {
            max_attempts: 3,
            retryable_status_codes: BTreeSet::new(),
            delay: DelayStrategy::Fixed(Duration::from_millis(500)),
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn retryable_status_codes(&self) -> &BTreeSet<u16> {
        &self.retryable_status_codes
    }

    pub fn delay(&self) -> DelayStrategy {
        self.delay
    }

    pub fn is_retryable(&self, status_code: u16) -> bool {
        self.retryable_status_codes.contains(&status_code)
    }
}

#[derive(Debug, Clone)]
pub struct RetryPolicyBuilder {
    max_attempts: u32,
    retryable_status_codes: BTreeSet<u16>,
    delay: DelayStrategy,
}

impl RetryPolicyBuilder {
    pub fn max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn retry_on(mut self, status_code: u16) -> Self {
        self.retryable_status_codes.insert(status_code);
        self
    }

    pub fn fixed_delay(mut self, delay: Duration) -> Self {
        self.delay = DelayStrategy::Fixed(delay);
        self
    }

    pub fn exponential_backoff(mut self, base: Duration, multiplier: f64) -> Self {
        self.delay = DelayStrategy::Exponential { base, multiplier };
        self
    }

    pub fn build(self) -> RetryPolicy {
        RetryPolicy::new(self.max_attempts, self.retryable_status_codes, self.delay)
    }
}

/// Runs `operation` until it yields a value `should_retry` rejects, fails for
/// the last time, or the policy's attempts are used up. The operation receives
/// the 1-based attempt number.
pub fn retry_with_policy<T, E, F, R>(
    policy: &RetryPolicy,
    sleeper: &dyn Sleeper,
    mut operation: F,
    should_retry: R,
) -> Result<T, E>
where
    F: FnMut(u32) -> Result<T, E>,
    R: Fn(&T) -> bool,
    E: Display,
{
    let mut attempt = 1;

    loop {
        let outcome = operation(attempt);
        let wants_retry = match &outcome {
            Ok(value) => should_retry(value),
            Err(_) => true,
        };

        if !wants_retry {
            return outcome;
        }
        if attempt >= policy.max_attempts() {
            warn!(attempt, "retries exhausted, returning last outcome");
            return outcome;
        }

        match &outcome {
            Err(err) => {
                warn!(attempt, max_attempts = policy.max_attempts(), error = %err, "attempt failed, retrying")
            }
            Ok(_) => {
                debug!(attempt, max_attempts = policy.max_attempts(), "transient result, retrying")
            }
        }

        sleeper.sleep(policy.delay().delay_for_retry(attempt - 1));
        attempt += 1;
    }
}

/// Sends requests through a transport, retrying transient statuses and
/// transport failures according to a [`RetryPolicy`].
#[derive(Debug, Clone)]
pub struct RetryingExecutor {
    transport: Arc<dyn HttpTransport>,
    sleeper: Arc<dyn Sleeper>,
}

impl RetryingExecutor {
    pub fn new(transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            transport,
            sleeper: Arc::new(ThreadSleeper),
        }
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn sleeper(&self) -> &dyn Sleeper {
        self.sleeper.as_ref()
    }

    pub fn transport(&self) -> &dyn HttpTransport {
        self.transport.as_ref()
    }

    pub fn execute(&self, request: &RequestSpec) -> Result<ResponseDescriptor, Error> {
        self.execute_with_retry(request, &RetryPolicy::single_attempt())
    }

    pub fn execute_with_retry(
        &self,
        request: &RequestSpec,
        policy: &RetryPolicy,
    ) -> Result<ResponseDescriptor, Error> {
        util::validate_headers(request.headers())?;

        let response = retry_with_policy(
            policy,
            self.sleeper.as_ref(),
            |attempt| {
                if attempt > 1 {
                    debug!(
                        attempt,
                        method = %request.method(),
                        endpoint = request.endpoint(),
                        "retrying request"
                    );
                }
                self.transport
                    .execute(request)
                    .map_err(|e| e.with_attempts(attempt))
            },
            |response: &ResponseDescriptor| policy.is_retryable(response.status_code()),
        )?;

        Ok(response)
    }
}

#[cfg(any(test, feature = "test-utils"))]
pub mod testing {
    use super::Sleeper;
    use std::{sync::Mutex, time::Duration};

    /// Fake clock: remembers every requested sleep and returns immediately.
    #[derive(Debug, Default)]
    pub struct RecordingSleeper {
        sleeps: Mutex<Vec<Duration>>,
    }

    impl RecordingSleeper {
        pub fn sleeps(&self) -> Vec<Duration> {
            self.sleeps.lock().unwrap().clone()
        }
    }

    impl Sleeper for RecordingSleeper {
        fn sleep(&self, duration: Duration) {
            self.sleeps.lock().unwrap().push(duration);
        }
    }
}
