//! Retry engine: exponential backoff with jitter and pluggable
//! retryability classification.
//!
//! [`with_retry`] wraps any fallible async operation; [`fetch_with_retry`]
//! specializes it for a single HTTP request. Classification is structured:
//! it reads [`Error::status()`] instead of pattern-matching message text.

use crate::{Error, Result};
use rand::Rng;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// HTTP statuses retried by default: rate limiting and transient
/// server-side failures.
pub const DEFAULT_RETRYABLE_STATUSES: [u16; 5] = [429, 500, 502, 503, 504];

type OnRetry = dyn Fn(usize, &Error, Duration) + Send + Sync;

/// Trait for custom retryability classification.
///
/// Install an implementation on a [`RetryPolicy`] to override the default
/// status-set classification entirely.
///
/// # Examples
///
/// ```
/// use exa_websets::{Error, RetryPredicate};
///
/// struct RetryOnRateLimitOnly;
///
/// impl RetryPredicate for RetryOnRateLimitOnly {
///     fn should_retry(&self, error: &Error, _attempt: usize) -> bool {
///         error.status().map(|s| s.as_u16()) == Some(429)
///     }
/// }
/// ```
pub trait RetryPredicate: Send + Sync {
    /// Determines whether a failed attempt should be retried.
    ///
    /// `attempt` is 1-indexed: attempt 1 is the first try that failed.
    fn should_retry(&self, error: &Error, attempt: usize) -> bool;
}

/// Configuration for [`with_retry`] and [`fetch_with_retry`].
///
/// Immutable per call; defaults match the Websets client:
/// 3 retries, 1 s base delay doubling per attempt, capped at 10 s,
/// retrying on 429/500/502/503/504 and on timeouts.
///
/// # Examples
///
/// ```
/// use exa_websets::RetryPolicy;
/// use std::time::Duration;
///
/// let policy = RetryPolicy::default()
///     .with_max_retries(5)
///     .with_base_delay(Duration::from_millis(250));
/// assert_eq!(policy.max_retries, 5);
/// ```
#[derive(Clone)]
pub struct RetryPolicy {
    /// Maximum number of retries after the initial attempt.
    pub max_retries: usize,
    /// Delay before the first retry; doubles (by default) each retry.
    pub base_delay: Duration,
    /// Hard cap applied after jitter.
    pub max_delay: Duration,
    /// Exponential growth factor between retries.
    pub backoff_multiplier: f64,
    /// HTTP statuses classified as retryable.
    pub retryable_statuses: Vec<u16>,
    /// Whether timed-out requests are retried (subject to the attempt cap).
    pub retry_on_timeout: bool,
    on_retry: Option<Arc<OnRetry>>,
    predicate: Option<Arc<dyn RetryPredicate>>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(1000),
            max_delay: Duration::from_millis(10_000),
            backoff_multiplier: 2.0,
            retryable_statuses: DEFAULT_RETRYABLE_STATUSES.to_vec(),
            retry_on_timeout: true,
            on_retry: None,
            predicate: None,
        }
    }
}

impl fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("max_retries", &self.max_retries)
            .field("base_delay", &self.base_delay)
            .field("max_delay", &self.max_delay)
            .field("backoff_multiplier", &self.backoff_multiplier)
            .field("retryable_statuses", &self.retryable_statuses)
            .field("retry_on_timeout", &self.retry_on_timeout)
            .field("on_retry", &self.on_retry.as_ref().map(|_| "<callback>"))
            .field("predicate", &self.predicate.as_ref().map(|_| "<predicate>"))
            .finish()
    }
}

impl RetryPolicy {
    /// Disables retries entirely (a single attempt).
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Default::default()
        }
    }

    /// Sets the maximum number of retries.
    pub fn with_max_retries(mut self, max_retries: usize) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Sets the base delay before the first retry.
    pub fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }

    /// Sets the post-jitter delay cap.
    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    /// Sets the exponential growth factor.
    pub fn with_backoff_multiplier(mut self, multiplier: f64) -> Self {
        self.backoff_multiplier = multiplier;
        self
    }

    /// Replaces the retryable HTTP status set.
    pub fn with_retryable_statuses(mut self, statuses: impl Into<Vec<u16>>) -> Self {
        self.retryable_statuses = statuses.into();
        self
    }

    /// Sets whether timed-out requests are retried.
    pub fn with_retry_on_timeout(mut self, retry: bool) -> Self {
        self.retry_on_timeout = retry;
        self
    }

    /// Installs an observer invoked before each backoff sleep with the
    /// attempt number (1-indexed), the triggering error, and the delay.
    ///
    /// The engine itself emits no log lines; this is the hook for them.
    pub fn with_on_retry<F>(mut self, on_retry: F) -> Self
    where
        F: Fn(usize, &Error, Duration) + Send + Sync + 'static,
    {
        self.on_retry = Some(Arc::new(on_retry));
        self
    }

    /// Prepends an observer, keeping any previously installed one.
    ///
    /// The client uses this to add its retry logging without displacing a
    /// caller-configured observer.
    pub(crate) fn with_chained_on_retry<F>(mut self, on_retry: F) -> Self
    where
        F: Fn(usize, &Error, Duration) + Send + Sync + 'static,
    {
        let previous = self.on_retry.take();
        self.on_retry = Some(Arc::new(move |attempt, error, delay| {
            on_retry(attempt, error, delay);
            if let Some(previous) = &previous {
                previous(attempt, error, delay);
            }
        }));
        self
    }

    /// Installs a custom [`RetryPredicate`], overriding the default
    /// status-set classification.
    pub fn with_predicate<P>(mut self, predicate: P) -> Self
    where
        P: RetryPredicate + 'static,
    {
        self.predicate = Some(Arc::new(predicate));
        self
    }

    /// Returns the backoff delay before retry `attempt` (1-indexed).
    ///
    /// `base_delay * multiplier^(attempt-1)`, plus 0–20 % uniform jitter,
    /// then capped at `max_delay`. Jitter is applied before the cap, so
    /// the cap is always respected.
    pub fn delay_for_attempt(&self, attempt: usize) -> Duration {
        let exponent = attempt.saturating_sub(1) as i32;
        let exponential =
            self.base_delay.as_millis() as f64 * self.backoff_multiplier.powi(exponent);
        let jittered = exponential + exponential * 0.2 * rand::thread_rng().gen::<f64>();
        let capped = (jittered.floor() as u64).min(self.max_delay.as_millis() as u64);
        Duration::from_millis(capped)
    }

    /// Classifies a failed attempt.
    ///
    /// A custom predicate, if installed, decides alone. Otherwise transport
    /// errors are retryable, timeouts follow `retry_on_timeout`, and API
    /// errors are retryable when their status is in the configured set.
    pub fn should_retry(&self, error: &Error, attempt: usize) -> bool {
        if let Some(predicate) = &self.predicate {
            return predicate.should_retry(error, attempt);
        }
        match error {
            Error::Timeout => self.retry_on_timeout,
            other => other.is_retryable_with(&self.retryable_statuses),
        }
    }

    fn notify_retry(&self, attempt: usize, error: &Error, delay: Duration) {
        if let Some(on_retry) = &self.on_retry {
            on_retry(attempt, error, delay);
        }
    }
}

/// Runs `operation` with retries according to `policy`.
///
/// Executes at most `max_retries + 1` sequential attempts. Success
/// short-circuits immediately. A failure on the last allowed attempt, or
/// one classified non-retryable, propagates unchanged; errors are never
/// wrapped or swallowed. Between attempts the task sleeps for the computed
/// backoff delay; the policy's `on_retry` observer fires before each sleep.
///
/// # Examples
///
/// ```no_run
/// use exa_websets::{with_retry, RetryPolicy};
///
/// # async fn example() -> exa_websets::Result<()> {
/// let policy = RetryPolicy::default();
/// let body = with_retry(&policy, || async {
///     // any fallible async operation
///     Ok::<_, exa_websets::Error>("ok")
/// })
/// .await?;
/// # Ok(())
/// # }
/// ```
pub async fn with_retry<T, F, Fut>(policy: &RetryPolicy, mut operation: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 0usize;
    loop {
        attempt += 1;
        match operation().await {
            Ok(value) => return Ok(value),
            Err(error) => {
                if attempt > policy.max_retries {
                    return Err(error);
                }
                if !policy.should_retry(&error, attempt) {
                    return Err(error);
                }
                let delay = policy.delay_for_attempt(attempt);
                policy.notify_retry(attempt, &error, delay);
                tokio::time::sleep(delay).await;
            }
        }
    }
}

/// Executes one HTTP request with retries on retryable statuses.
///
/// Contract (deliberately asymmetric): a response whose status is in the
/// policy's retryable set is converted into [`Error::Api`] so the retry
/// loop sees it; any other response, including non-retryable failures
/// like 400 or 404, is returned as a normal `reqwest::Response`, and
/// callers must check `status()` themselves. Transport errors and
/// timeouts go through the same classification as everywhere else.
pub async fn fetch_with_retry(
    http: &reqwest::Client,
    request: reqwest::Request,
    policy: &RetryPolicy,
) -> Result<reqwest::Response> {
    with_retry(policy, || {
        let cloned = request.try_clone();
        async move {
            let request = cloned.ok_or_else(|| {
                Error::Configuration("request body cannot be cloned for retry".to_string())
            })?;
            let response = http.execute(request).await?;
            let status = response.status();
            if !status.is_success() && policy.retryable_statuses.contains(&status.as_u16()) {
                let headers = response.headers().clone();
                let raw_response = response.text().await.unwrap_or_default();
                return Err(Error::Api {
                    status,
                    raw_response,
                    headers: Box::new(headers),
                });
            }
            Ok(response)
        }
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::{HeaderMap, StatusCode};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    fn api_error(status: u16) -> Error {
        Error::Api {
            status: StatusCode::from_u16(status).unwrap(),
            raw_response: "error".to_string(),
            headers: Box::new(HeaderMap::new()),
        }
    }

    fn fast_policy(max_retries: usize) -> RetryPolicy {
        RetryPolicy::default()
            .with_max_retries(max_retries)
            .with_base_delay(Duration::from_millis(1))
            .with_max_delay(Duration::from_millis(5))
    }

    #[test]
    fn delay_grows_exponentially_with_bounded_jitter() {
        let policy = RetryPolicy::default()
            .with_base_delay(Duration::from_millis(100))
            .with_max_delay(Duration::from_secs(60));

        for attempt in 1..=4usize {
            let exponential = 100u64 * 2u64.pow(attempt as u32 - 1);
            for _ in 0..50 {
                let delay = policy.delay_for_attempt(attempt).as_millis() as u64;
                assert!(delay >= exponential, "attempt {attempt}: {delay}");
                // 20% additive jitter upper bound
                assert!(delay <= exponential * 6 / 5, "attempt {attempt}: {delay}");
            }
        }
    }

    #[test]
    fn delay_never_exceeds_cap() {
        let policy = RetryPolicy::default()
            .with_base_delay(Duration::from_millis(1000))
            .with_max_delay(Duration::from_millis(10_000));

        // Exponential growth passes the cap by attempt 5 even before jitter.
        for _ in 0..50 {
            let delay = policy.delay_for_attempt(5);
            assert_eq!(delay, Duration::from_millis(10_000));
        }
        for attempt in 1..=10usize {
            for _ in 0..20 {
                assert!(policy.delay_for_attempt(attempt) <= Duration::from_millis(10_000));
            }
        }
    }

    #[tokio::test]
    async fn permanently_failing_operation_is_bounded() {
        for max_retries in [0usize, 1, 3] {
            let calls = Arc::new(AtomicUsize::new(0));
            let calls_clone = calls.clone();
            let result: Result<()> = with_retry(&fast_policy(max_retries), move || {
                let calls = calls_clone.clone();
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err(api_error(503))
                }
            })
            .await;

            assert!(result.is_err());
            assert_eq!(calls.load(Ordering::SeqCst), max_retries + 1);
        }
    }

    #[tokio::test]
    async fn success_short_circuits() {
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = calls.clone();
        let result = with_retry(&fast_policy(5), move || {
            let calls = calls_clone.clone();
            async move {
                if calls.fetch_add(1, Ordering::SeqCst) < 1 {
                    Err(api_error(500))
                } else {
                    Ok(42)
                }
            }
        })
        .await
        .unwrap();

        assert_eq!(result, 42);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn non_retryable_error_short_circuits_on_first_attempt() {
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = calls.clone();
        let result: Result<()> = with_retry(&fast_policy(5), move || {
            let calls = calls_clone.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(api_error(400))
            }
        })
        .await;

        match result {
            Err(Error::Api { status, .. }) => assert_eq!(status.as_u16(), 400),
            other => panic!("expected Api error, got {other:?}"),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn last_error_propagates_unchanged_on_exhaustion() {
        let result: Result<()> =
            with_retry(&fast_policy(2), || async { Err(api_error(502)) }).await;

        match result {
            Err(Error::Api {
                status,
                raw_response,
                ..
            }) => {
                assert_eq!(status.as_u16(), 502);
                assert_eq!(raw_response, "error");
            }
            other => panic!("expected Api error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn on_retry_receives_attempt_numbers_and_delays() {
        let observed: Arc<Mutex<Vec<(usize, u64)>>> = Arc::new(Mutex::new(Vec::new()));
        let observed_clone = observed.clone();
        let policy = RetryPolicy::default()
            .with_max_retries(5)
            .with_base_delay(Duration::from_millis(1))
            .with_max_delay(Duration::from_millis(50))
            .with_on_retry(move |attempt, _error, delay| {
                observed_clone
                    .lock()
                    .unwrap()
                    .push((attempt, delay.as_millis() as u64));
            });

        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = calls.clone();
        with_retry(&policy, move || {
            let calls = calls_clone.clone();
            async move {
                if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(api_error(503))
                } else {
                    Ok(())
                }
            }
        })
        .await
        .unwrap();

        let observed = observed.lock().unwrap();
        assert_eq!(observed.len(), 2);
        assert_eq!(observed[0].0, 1);
        assert_eq!(observed[1].0, 2);
        assert!(observed[0].1 >= 1 && observed[0].1 <= 50);
        assert!(observed[1].1 >= 2 && observed[1].1 <= 50);
    }

    #[tokio::test]
    async fn timeout_retry_is_policy_controlled() {
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = calls.clone();
        let policy = fast_policy(2).with_retry_on_timeout(false);
        let result: Result<()> = with_retry(&policy, move || {
            let calls = calls_clone.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(Error::Timeout)
            }
        })
        .await;

        assert!(matches!(result, Err(Error::Timeout)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = calls.clone();
        let policy = fast_policy(2).with_retry_on_timeout(true);
        let result: Result<()> = with_retry(&policy, move || {
            let calls = calls_clone.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(Error::Timeout)
            }
        })
        .await;

        assert!(matches!(result, Err(Error::Timeout)));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn custom_predicate_overrides_classification() {
        struct Never;
        impl RetryPredicate for Never {
            fn should_retry(&self, _error: &Error, _attempt: usize) -> bool {
                false
            }
        }

        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = calls.clone();
        let policy = fast_policy(5).with_predicate(Never);
        let result: Result<()> = with_retry(&policy, move || {
            let calls = calls_clone.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(api_error(503))
            }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
