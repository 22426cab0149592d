//! Error types for Websets API calls.
//!
//! Every failure carries its HTTP status as a structured field rather than
//! encoding it in the message text, so retry classification never has to
//! parse error strings. Raw response bodies are preserved for debugging.

use http::{HeaderMap, StatusCode};

/// The main error type for Websets API calls.
///
/// # Examples
///
/// ```no_run
/// use exa_websets::{Error, WebsetsClient};
///
/// # async fn example() -> Result<(), Error> {
/// let client = WebsetsClient::builder().api_key("sk-...").build()?;
///
/// match client.get_webset("ws_123").await {
///     Ok(webset) => println!("status: {:?}", webset.status),
///     Err(Error::Api { status, raw_response, .. }) => {
///         eprintln!("API error {}: {}", status, raw_response);
///     }
///     Err(e) => eprintln!("Other error: {}", e),
/// }
/// # Ok(())
/// # }
/// ```
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// A network-level error occurred (connection failed, DNS lookup failed, etc.).
    ///
    /// This wraps the underlying `reqwest::Error` and indicates problems at the
    /// transport layer rather than the HTTP protocol layer.
    #[error("network error: {0}")]
    Network(reqwest::Error),

    /// The request did not complete within its configured timeout.
    ///
    /// The in-flight request is aborted when the deadline elapses; whether the
    /// failure is retried is controlled by [`RetryPolicy::retry_on_timeout`].
    ///
    /// [`RetryPolicy::retry_on_timeout`]: crate::RetryPolicy
    #[error("request timed out")]
    Timeout,

    /// The API returned a non-2xx HTTP status code.
    ///
    /// # Fields
    ///
    /// * `status` - The HTTP status code
    /// * `raw_response` - The raw response body
    /// * `headers` - The response headers (rate limit headers included)
    #[error("Exa API error {status}: {raw_response}")]
    Api {
        /// The HTTP status code.
        status: StatusCode,
        /// The raw response body.
        raw_response: String,
        /// The response headers.
        headers: Box<HeaderMap>,
    },

    /// Failed to deserialize the response body into the expected type.
    ///
    /// Preserves both the raw response text and the serde error message.
    #[error("failed to deserialize response (status {status}): {serde_error}")]
    Deserialization {
        /// The raw response body that failed to deserialize.
        raw_response: String,
        /// The serde error message.
        serde_error: String,
        /// The HTTP status code of the response.
        status: StatusCode,
    },

    /// Failed to serialize the request body to JSON.
    #[error("failed to serialize request: {0}")]
    Serialization(String),

    /// Invalid client or request configuration.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The API key environment variable is absent or empty.
    ///
    /// Raised before any network activity occurs.
    #[error("missing API key: set the {0} environment variable")]
    MissingApiKey(&'static str),

    /// An invalid URL was provided.
    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Error::Timeout
        } else {
            Error::Network(err)
        }
    }
}

impl Error {
    /// Returns `true` if this is a retryable failure given the retryable
    /// status set.
    ///
    /// Transport errors are always retryable; API errors are retryable when
    /// their status is in `retryable_statuses`; timeouts are classified by
    /// the caller (see `RetryPolicy::retry_on_timeout`); everything else is
    /// permanent.
    ///
    /// # Examples
    ///
    /// ```
    /// use exa_websets::Error;
    /// use http::StatusCode;
    ///
    /// let err = Error::Api {
    ///     status: StatusCode::SERVICE_UNAVAILABLE,
    ///     raw_response: "unavailable".to_string(),
    ///     headers: Box::new(http::HeaderMap::new()),
    /// };
    /// assert!(err.is_retryable_with(&[429, 500, 502, 503, 504]));
    ///
    /// let err = Error::Api {
    ///     status: StatusCode::BAD_REQUEST,
    ///     raw_response: "bad request".to_string(),
    ///     headers: Box::new(http::HeaderMap::new()),
    /// };
    /// assert!(!err.is_retryable_with(&[429, 500, 502, 503, 504]));
    /// ```
    pub fn is_retryable_with(&self, retryable_statuses: &[u16]) -> bool {
        match self {
            Error::Network(_) => true,
            Error::Api { status, .. } => retryable_statuses.contains(&status.as_u16()),
            _ => false,
        }
    }

    /// Returns the HTTP status code if this error has one.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Error::Api { status, .. } => Some(*status),
            Error::Deserialization { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Returns the raw response body if this error has one.
    pub fn raw_response(&self) -> Option<&str> {
        match self {
            Error::Api { raw_response, .. } => Some(raw_response),
            Error::Deserialization { raw_response, .. } => Some(raw_response),
            _ => None,
        }
    }

    /// Returns `true` for transport-level failures (connection, DNS, etc.).
    pub fn is_transport(&self) -> bool {
        matches!(self, Error::Network(_))
    }

    /// Returns `true` for timeout failures.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Timeout)
    }
}

/// A specialized `Result` type for Websets API calls.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    fn api_error(status: u16) -> Error {
        Error::Api {
            status: StatusCode::from_u16(status).unwrap(),
            raw_response: "body".to_string(),
            headers: Box::new(HeaderMap::new()),
        }
    }

    #[test]
    fn default_status_set_classification() {
        let set = [429, 500, 502, 503, 504];
        for status in set {
            assert!(api_error(status).is_retryable_with(&set), "{status}");
        }
        for status in [400, 401, 403, 404, 422] {
            assert!(!api_error(status).is_retryable_with(&set), "{status}");
        }
    }

    #[test]
    fn timeout_is_not_classified_by_status_set() {
        // Timeouts are policy-controlled, not status-controlled.
        assert!(!Error::Timeout.is_retryable_with(&[429, 500, 502, 503, 504]));
        assert!(Error::Timeout.is_timeout());
    }

    #[test]
    fn status_accessor() {
        assert_eq!(api_error(503).status().map(|s| s.as_u16()), Some(503));
        assert_eq!(Error::Timeout.status(), None);
    }

    #[test]
    fn raw_response_accessor() {
        assert_eq!(api_error(500).raw_response(), Some("body"));
        assert_eq!(Error::Configuration("bad".to_string()).raw_response(), None);
    }

    #[test]
    fn api_error_display_embeds_status_and_body() {
        let message = api_error(502).to_string();
        assert!(message.contains("502"));
        assert!(message.contains("body"));
    }
}
