//! Rate limit header parsing for observability.
//!
//! The Websets client logs rate limit state at debug level whenever the
//! API includes the relevant headers; parsed values never alter retry
//! timing, which stays on the exponential backoff schedule.

use http::HeaderMap;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Information extracted from rate limit headers.
#[derive(Debug, Clone)]
pub struct RateLimitInfo {
    /// When the rate limit resets (from X-RateLimit-Reset or RateLimit-Reset).
    pub reset_at: Option<SystemTime>,

    /// How long the server asked us to wait (from Retry-After).
    pub retry_after: Option<Duration>,

    /// Number of requests remaining in the current window.
    pub remaining: Option<u64>,
}

impl RateLimitInfo {
    /// Extracts rate limit information from response headers.
    ///
    /// Parses `Retry-After` (delta-seconds or HTTP date),
    /// `X-RateLimit-Reset` / `RateLimit-Reset` (Unix timestamp), and
    /// `X-RateLimit-Remaining`.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        Self {
            reset_at: parse_rate_limit_reset(headers),
            retry_after: parse_retry_after(headers),
            remaining: parse_rate_limit_remaining(headers),
        }
    }

    /// Returns `true` if any rate limit header was present at all.
    pub fn is_present(&self) -> bool {
        self.reset_at.is_some() || self.retry_after.is_some() || self.remaining.is_some()
    }

    /// Returns `true` if this represents an active rate limit:
    /// `Retry-After` was sent, or the remaining quota is zero.
    pub fn is_rate_limited(&self) -> bool {
        self.retry_after.is_some() || self.remaining == Some(0)
    }
}

/// Parses the Retry-After header (delta-seconds or RFC 7231 HTTP date).
fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    let header = headers.get("retry-after")?.to_str().ok()?;

    if let Ok(seconds) = header.parse::<u64>() {
        return Some(Duration::from_secs(seconds));
    }

    if let Ok(date_time) = httpdate::parse_http_date(header) {
        if let Ok(duration) = date_time.duration_since(SystemTime::now()) {
            return Some(duration);
        }
    }

    None
}

/// Parses X-RateLimit-Reset or RateLimit-Reset headers (Unix timestamp).
fn parse_rate_limit_reset(headers: &HeaderMap) -> Option<SystemTime> {
    for name in ["x-ratelimit-reset", "ratelimit-reset"] {
        if let Some(header) = headers.get(name) {
            if let Ok(timestamp_str) = header.to_str() {
                if let Ok(timestamp) = timestamp_str.parse::<u64>() {
                    return Some(UNIX_EPOCH + Duration::from_secs(timestamp));
                }
            }
        }
    }
    None
}

/// Parses the X-RateLimit-Remaining header.
fn parse_rate_limit_remaining(headers: &HeaderMap) -> Option<u64> {
    let header = headers.get("x-ratelimit-remaining")?.to_str().ok()?;
    header.parse().ok()
}
