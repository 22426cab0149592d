//! Structured logging helpers for request/response/retry observability.
//!
//! Events are emitted through `tracing` with structured fields and are
//! correlated by a caller-supplied request id. Formatting concerns
//! (timestamps, colors, output streams, debug gating) belong to the
//! installed subscriber, typically `tracing_subscriber::fmt` with an
//! `EnvFilter`.

use crate::Error;
use http::Method;
use std::time::{Duration, Instant};

/// A log record describing one logical request.
///
/// Created at call sites and consumed immediately by the logging helpers;
/// never stored.
#[derive(Debug)]
pub struct RequestLog<'a> {
    /// Correlation id threading one logical operation through its logs.
    pub request_id: &'a str,
    /// The HTTP method.
    pub method: &'a Method,
    /// The request path or endpoint.
    pub path: &'a str,
    /// Elapsed time in milliseconds, when known.
    pub duration_ms: Option<u128>,
    /// The HTTP status code, when a response was received.
    pub status: Option<u16>,
    /// The failure message, when the request failed.
    pub error: Option<&'a str>,
    /// Open key-value context supplied by the caller.
    pub metadata: Option<&'a serde_json::Value>,
}

impl<'a> RequestLog<'a> {
    /// Creates a log record with only the identifying fields set.
    pub fn new(request_id: &'a str, method: &'a Method, path: &'a str) -> Self {
        Self {
            request_id,
            method,
            path,
            duration_ms: None,
            status: None,
            error: None,
            metadata: None,
        }
    }

    /// Sets the elapsed duration.
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration_ms = Some(duration.as_millis());
        self
    }

    /// Sets the response status.
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    /// Sets the failure message.
    pub fn with_error(mut self, error: &'a str) -> Self {
        self.error = Some(error);
        self
    }

    /// Attaches caller metadata.
    pub fn with_metadata(mut self, metadata: &'a serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// Logs an inbound-request marker at info level.
pub fn log_request(log: &RequestLog<'_>) {
    tracing::info!(
        request_id = log.request_id,
        method = %log.method,
        path = log.path,
        metadata = log.metadata.map(tracing::field::display),
        "→ {} {}",
        log.method,
        log.path
    );
}

/// Logs an outbound-response marker.
///
/// Level is chosen dynamically: error when the record carries an error,
/// warn when the status is 400 or above, info otherwise. Status is
/// reported as "unknown" when absent.
pub fn log_response(log: &RequestLog<'_>) {
    let status = log
        .status
        .map(|s| s.to_string())
        .unwrap_or_else(|| "unknown".to_string());
    let duration_ms = log.duration_ms;

    if let Some(error) = log.error {
        tracing::error!(
            request_id = log.request_id,
            method = %log.method,
            path = log.path,
            status = %status,
            duration_ms,
            error,
            "✗ {} {} failed",
            log.method,
            log.path
        );
    } else if log.status.is_some_and(|s| s >= 400) {
        tracing::warn!(
            request_id = log.request_id,
            method = %log.method,
            path = log.path,
            status = %status,
            duration_ms,
            "✗ {} {} -> {}",
            log.method,
            log.path,
            status
        );
    } else {
        tracing::info!(
            request_id = log.request_id,
            method = %log.method,
            path = log.path,
            status = %status,
            duration_ms,
            "✓ {} {} -> {}",
            log.method,
            log.path,
            status
        );
    }
}

/// Logs a retry attempt at warn level.
///
/// This is the natural `on_retry` body for a
/// [`RetryPolicy`](crate::RetryPolicy).
pub fn log_retry(
    request_id: &str,
    attempt: usize,
    max_retries: usize,
    delay: Duration,
    error: &Error,
) {
    tracing::warn!(
        request_id,
        attempt,
        max_retries,
        delay_ms = delay.as_millis(),
        error = %error,
        "↻ retrying ({}/{}) after {}ms",
        attempt,
        max_retries,
        delay.as_millis()
    );
}

/// Brackets one outbound call to an external service.
///
/// Starting a span logs the call at debug level and captures the clock.
/// [`complete`](CallSpan::complete) logs the completion with elapsed time;
/// [`fail`](CallSpan::fail) logs the failure at error level. Both consume
/// the span. A span dropped without either logs nothing further; an
/// abandoned call simply has no completion line.
#[derive(Debug)]
pub struct CallSpan {
    service: &'static str,
    endpoint: String,
    request_id: String,
    started: Instant,
}

impl CallSpan {
    /// Opens the span and logs the call start at debug level.
    pub fn start(service: &'static str, endpoint: impl Into<String>, request_id: &str) -> Self {
        let endpoint = endpoint.into();
        tracing::debug!(
            service,
            endpoint = %endpoint,
            request_id,
            "calling {} {}",
            service,
            endpoint
        );
        Self {
            service,
            endpoint,
            request_id: request_id.to_string(),
            started: Instant::now(),
        }
    }

    /// Elapsed time since the span was opened.
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Logs successful completion with elapsed duration.
    pub fn complete(self, status: Option<u16>) {
        tracing::debug!(
            service = self.service,
            endpoint = %self.endpoint,
            request_id = %self.request_id,
            status,
            duration_ms = self.elapsed().as_millis(),
            "completed {} {}",
            self.service,
            self.endpoint
        );
    }

    /// Logs a failed call at error level with status, duration, and the
    /// error message.
    pub fn fail(self, status: Option<u16>, error: &Error) {
        tracing::error!(
            service = self.service,
            endpoint = %self.endpoint,
            request_id = %self.request_id,
            status,
            duration_ms = self.elapsed().as_millis(),
            error = %error,
            "✗ {} {} failed",
            self.service,
            self.endpoint
        );
    }
}

/// A stopwatch for call sites that need a duration without the full
/// logging machinery.
#[derive(Debug)]
pub struct RequestTimer {
    started: Instant,
}

impl RequestTimer {
    /// Starts the timer.
    pub fn start() -> Self {
        Self {
            started: Instant::now(),
        }
    }

    /// Elapsed time since the timer was started.
    pub fn duration(&self) -> Duration {
        self.started.elapsed()
    }

    /// Elapsed milliseconds since the timer was started.
    pub fn duration_ms(&self) -> u128 {
        self.duration().as_millis()
    }
}

impl Default for RequestTimer {
    fn default() -> Self {
        Self::start()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timer_measures_elapsed_time() {
        let timer = RequestTimer::start();
        std::thread::sleep(Duration::from_millis(10));
        assert!(timer.duration() >= Duration::from_millis(10));
        assert!(timer.duration_ms() >= 10);
    }

    #[test]
    fn span_tracks_elapsed_time() {
        let span = CallSpan::start("exa", "/websets", "req_test");
        std::thread::sleep(Duration::from_millis(5));
        assert!(span.elapsed() >= Duration::from_millis(5));
        span.complete(Some(200));
    }

    #[test]
    fn dropped_span_is_silent() {
        // No Drop impl: abandoning a span must not log or panic.
        let span = CallSpan::start("exa", "/websets", "req_test");
        drop(span);
    }

    #[test]
    fn request_log_builder_sets_fields() {
        let method = Method::POST;
        let metadata = serde_json::json!({"query": "engineers"});
        let log = RequestLog::new("req_1", &method, "/websets")
            .with_status(201)
            .with_duration(Duration::from_millis(42))
            .with_metadata(&metadata);

        assert_eq!(log.status, Some(201));
        assert_eq!(log.duration_ms, Some(42));
        assert!(log.error.is_none());

        // Emission never panics regardless of which fields are present.
        log_request(&log);
        log_response(&log);
        log_response(&RequestLog::new("req_2", &method, "/websets").with_error("boom"));
        log_response(&RequestLog::new("req_3", &method, "/websets"));
    }
}
