//! Typed client for the Exa Websets API.
//!
//! [`WebsetsClient`] translates typed method calls into HTTP requests
//! against the versioned Websets endpoint, enforcing per-request timeouts,
//! attaching API key authentication, retrying transient failures, and
//! logging every call. Build one at application startup and pass it to
//! whatever needs it; there is no implicit global instance.

use crate::{
    logging::{log_retry, CallSpan},
    rate_limit::RateLimitInfo,
    retry::with_retry,
    types::{CreateWebsetParams, Criterion, EnrichmentSpec, Webset, WebsetItemList, WebsetList},
    Error, Result, RetryPolicy,
};
use http::{header, HeaderMap, HeaderName, HeaderValue, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Environment variable holding the API key for [`WebsetsClient::from_env`].
pub const API_KEY_ENV: &str = "EXA_API_KEY";

/// The versioned Websets endpoint all paths are resolved against.
pub const DEFAULT_BASE_URL: &str = "https://api.exa.ai/websets/v0";

/// Result count requested when [`CreateWebsetParams::count`] is unset.
pub const DEFAULT_RESULT_COUNT: u64 = 20;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const SERVICE_NAME: &str = "exa";

/// A typed client for the Exa Websets search API.
///
/// Cheap to clone (the configuration lives behind an `Arc`) and safe to
/// share across tasks: the only state is the immutable API key and
/// configuration.
///
/// # Examples
///
/// ```no_run
/// use exa_websets::{CreateWebsetParams, WebsetsClient};
///
/// # async fn example() -> exa_websets::Result<()> {
/// let client = WebsetsClient::from_env()?;
///
/// let webset = client
///     .create_webset(
///         CreateWebsetParams::new("senior rust engineers in europe")
///             .with_count(10)
///             .with_criterion("has open source contributions"),
///     )
///     .await?;
/// println!("created {}", webset.id);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct WebsetsClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    http: reqwest::Client,
    base_url: Url,
    api_key: String,
    timeout: Duration,
    retry_policy: RetryPolicy,
}

impl fmt::Debug for WebsetsClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebsetsClient")
            .field("base_url", &self.inner.base_url.as_str())
            .field("api_key", &"<redacted>")
            .field("timeout", &self.inner.timeout)
            .field("retry_policy", &self.inner.retry_policy)
            .finish()
    }
}

impl WebsetsClient {
    /// Creates a new [`WebsetsClientBuilder`].
    pub fn builder() -> WebsetsClientBuilder {
        WebsetsClientBuilder::new()
    }

    /// Creates a client from the `EXA_API_KEY` environment variable.
    ///
    /// Fails with [`Error::MissingApiKey`] before any network activity if
    /// the variable is absent or empty.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var(API_KEY_ENV).map_err(|_| Error::MissingApiKey(API_KEY_ENV))?;
        if api_key.trim().is_empty() {
            return Err(Error::MissingApiKey(API_KEY_ENV));
        }
        Self::builder().api_key(api_key).build()
    }

    /// Creates a server-side search.
    ///
    /// `count` defaults to 20; criteria and enrichments are omitted from
    /// the request body entirely when empty.
    pub async fn create_webset(&self, params: CreateWebsetParams) -> Result<Webset> {
        let body = create_webset_body(&params)?;
        self.send(RequestContext::new(Method::POST, "/websets"), Some(body))
            .await
    }

    /// Fetches a webset by id.
    pub async fn get_webset(&self, id: &str) -> Result<Webset> {
        self.send(
            RequestContext::new(Method::GET, format!("/websets/{id}")),
            None,
        )
        .await
    }

    /// Lists websets, newest first. Pagination parameters are sent only
    /// when provided.
    pub async fn list_websets(&self, limit: Option<u64>, cursor: Option<&str>) -> Result<WebsetList> {
        let mut ctx = RequestContext::new(Method::GET, "/websets");
        if let Some(limit) = limit {
            ctx = ctx.with_query_param("limit", limit.to_string());
        }
        if let Some(cursor) = cursor {
            ctx = ctx.with_query_param("cursor", cursor);
        }
        self.send(ctx, None).await
    }

    /// Lists the items accumulated by a webset. Pagination parameters are
    /// sent only when provided.
    pub async fn get_webset_items(
        &self,
        id: &str,
        limit: Option<u64>,
        cursor: Option<&str>,
    ) -> Result<WebsetItemList> {
        let mut ctx = RequestContext::new(Method::GET, format!("/websets/{id}/items"));
        if let Some(limit) = limit {
            ctx = ctx.with_query_param("limit", limit.to_string());
        }
        if let Some(cursor) = cursor {
            ctx = ctx.with_query_param("cursor", cursor);
        }
        self.send(ctx, None).await
    }

    /// Deletes a webset. The response body is discarded.
    pub async fn delete_webset(&self, id: &str) -> Result<()> {
        let ctx = RequestContext::new(Method::DELETE, format!("/websets/{id}"));
        self.dispatch(&ctx, None).await?;
        Ok(())
    }

    /// Cancels a running webset search and returns the updated resource.
    pub async fn cancel_webset(&self, id: &str) -> Result<Webset> {
        self.send(
            RequestContext::new(Method::POST, format!("/websets/{id}/cancel")),
            None,
        )
        .await
    }

    /// Executes one request described by `ctx` and deserializes the JSON
    /// response into `Res`.
    ///
    /// This is the primitive the typed operations are built on; it is
    /// public for endpoints this client does not model yet.
    pub async fn send<Res>(&self, ctx: RequestContext, body: Option<Value>) -> Result<Res>
    where
        Res: DeserializeOwned,
    {
        let (status, raw_body) = self.dispatch(&ctx, body.as_ref()).await?;
        serde_json::from_str::<Res>(&raw_body).map_err(|err| Error::Deserialization {
            raw_response: raw_body,
            serde_error: err.to_string(),
            status,
        })
    }

    /// Runs the request through the retry engine (unless bypassed) and
    /// returns the successful status and raw body.
    async fn dispatch(&self, ctx: &RequestContext, body: Option<&Value>) -> Result<(StatusCode, String)> {
        let request_id = ctx
            .request_id
            .clone()
            .unwrap_or_else(generate_request_id);

        if ctx.skip_retry {
            return self.execute(ctx, body, &request_id).await;
        }

        let policy = {
            let request_id = request_id.clone();
            let max_retries = self.inner.retry_policy.max_retries;
            self.inner
                .retry_policy
                .clone()
                .with_chained_on_retry(move |attempt, error, delay| {
                    log_retry(&request_id, attempt, max_retries, delay, error);
                })
        };

        with_retry(&policy, || self.execute(ctx, body, &request_id)).await
    }

    /// Executes a single attempt: build, send, classify, read.
    async fn execute(
        &self,
        ctx: &RequestContext,
        body: Option<&Value>,
        request_id: &str,
    ) -> Result<(StatusCode, String)> {
        let url = self.endpoint_url(ctx)?;
        let span = CallSpan::start(SERVICE_NAME, ctx.path.clone(), request_id);

        let mut request = self
            .inner
            .http
            .request(ctx.method.clone(), url)
            .timeout(ctx.timeout.unwrap_or(self.inner.timeout))
            .header("x-api-key", &self.inner.api_key)
            .header(header::CONTENT_TYPE, "application/json")
            .header(header::ACCEPT, "application/json");

        // Caller headers are applied after the defaults, so a caller can
        // override them. Accepted tradeoff.
        for (name, value) in &ctx.headers {
            request = request.header(name, value);
        }

        if let Some(body) = body {
            request = request.json(body);
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(err) => {
                let error = Error::from(err);
                span.fail(None, &error);
                return Err(error);
            }
        };

        let status = response.status();
        let headers = response.headers().clone();

        let rate_limit = RateLimitInfo::from_headers(&headers);
        if rate_limit.is_present() {
            tracing::debug!(
                request_id,
                status = status.as_u16(),
                rate_limited = rate_limit.is_rate_limited(),
                remaining = rate_limit.remaining,
                retry_after_ms = rate_limit.retry_after.map(|d| d.as_millis()),
                "rate limit headers present"
            );
        }

        if !status.is_success() {
            let raw_response = response.text().await.unwrap_or_default();
            let error = Error::Api {
                status,
                raw_response,
                headers: Box::new(headers),
            };
            span.fail(Some(status.as_u16()), &error);
            return Err(error);
        }

        let raw_body = response.text().await.map_err(Error::from)?;
        span.complete(Some(status.as_u16()));
        Ok((status, raw_body))
    }

    fn endpoint_url(&self, ctx: &RequestContext) -> Result<Url> {
        let joined = format!(
            "{}{}",
            self.inner.base_url.as_str().trim_end_matches('/'),
            ctx.path
        );
        let mut url = Url::parse(&joined)?;
        for (key, value) in &ctx.query {
            url.query_pairs_mut().append_pair(key, value);
        }
        Ok(url)
    }
}

/// Everything describing one request besides its body: method, path,
/// query parameters, extra headers, correlation id, timeout override, and
/// the retry bypass flag.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// The HTTP method.
    pub method: Method,
    /// The path relative to the base URL (leading slash included).
    pub path: String,
    /// Query parameters appended to the URL.
    pub query: Vec<(String, String)>,
    /// Additional headers, applied after the client defaults.
    pub headers: HeaderMap,
    /// Correlation id; generated when absent.
    pub request_id: Option<String>,
    /// Per-request timeout override.
    pub timeout: Option<Duration>,
    /// Bypass the retry engine entirely for this request.
    pub skip_retry: bool,
}

impl RequestContext {
    /// Creates a context for the given method and path.
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            headers: HeaderMap::new(),
            request_id: None,
            timeout: None,
            skip_retry: false,
        }
    }

    /// Appends a query parameter.
    pub fn with_query_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Adds a header.
    ///
    /// # Errors
    ///
    /// Returns an error if the header name or value is invalid.
    pub fn with_header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Result<Self> {
        let name = HeaderName::try_from(name.as_ref())
            .map_err(|e| Error::Configuration(format!("invalid header name: {e}")))?;
        let value = HeaderValue::try_from(value.as_ref())
            .map_err(|e| Error::Configuration(format!("invalid header value: {e}")))?;
        self.headers.insert(name, value);
        Ok(self)
    }

    /// Sets the correlation id for this request's logs.
    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    /// Overrides the client's default timeout for this request.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Bypasses the retry engine for this request.
    pub fn without_retry(mut self) -> Self {
        self.skip_retry = true;
        self
    }
}

/// Builder for configuring and creating a [`WebsetsClient`].
///
/// # Examples
///
/// ```no_run
/// use exa_websets::{RetryPolicy, WebsetsClient};
/// use std::time::Duration;
///
/// # fn example() -> exa_websets::Result<()> {
/// let client = WebsetsClient::builder()
///     .api_key("sk-...")
///     .timeout(Duration::from_secs(15))
///     .retry_policy(RetryPolicy::default().with_max_retries(5))
///     .build()?;
/// # Ok(())
/// # }
/// ```
pub struct WebsetsClientBuilder {
    api_key: Option<String>,
    base_url: Option<Url>,
    timeout: Duration,
    retry_policy: RetryPolicy,
}

impl WebsetsClientBuilder {
    /// Creates a builder with the default base URL, a 30 second timeout,
    /// and the default retry policy.
    pub fn new() -> Self {
        Self {
            api_key: None,
            base_url: None,
            timeout: DEFAULT_TIMEOUT,
            retry_policy: RetryPolicy::default(),
        }
    }

    /// Sets the API key. Required.
    pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Overrides the base URL (useful for mock servers in tests).
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid.
    pub fn base_url(mut self, url: impl AsRef<str>) -> Result<Self> {
        self.base_url = Some(Url::parse(url.as_ref())?);
        Ok(self)
    }

    /// Sets the default per-request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the retry policy applied to every request.
    pub fn retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    /// Builds the configured client.
    ///
    /// # Errors
    ///
    /// Returns an error if no API key was provided or the HTTP client
    /// cannot be constructed.
    pub fn build(self) -> Result<WebsetsClient> {
        let api_key = self
            .api_key
            .ok_or_else(|| Error::Configuration("API key is required".to_string()))?;

        let base_url = match self.base_url {
            Some(url) => url,
            None => Url::parse(DEFAULT_BASE_URL)?,
        };

        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| Error::Configuration(format!("failed to build HTTP client: {e}")))?;

        Ok(WebsetsClient {
            inner: Arc::new(ClientInner {
                http,
                base_url,
                api_key,
                timeout: self.timeout,
                retry_policy: self.retry_policy,
            }),
        })
    }
}

impl Default for WebsetsClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Shapes the creation request body: `{search: {query, count, criteria?},
/// enrichments?}` with empty lists omitted rather than sent as `[]`.
fn create_webset_body(params: &CreateWebsetParams) -> Result<Value> {
    #[derive(Serialize)]
    struct SearchBody<'a> {
        query: &'a str,
        count: u64,
        #[serde(skip_serializing_if = "Option::is_none")]
        criteria: Option<Vec<Criterion>>,
    }

    #[derive(Serialize)]
    struct CreateBody<'a> {
        search: SearchBody<'a>,
        #[serde(skip_serializing_if = "Option::is_none")]
        enrichments: Option<&'a [EnrichmentSpec]>,
    }

    let criteria = if params.criteria.is_empty() {
        None
    } else {
        Some(
            params
                .criteria
                .iter()
                .map(|description| Criterion {
                    description: description.clone(),
                })
                .collect(),
        )
    };

    let enrichments = if params.enrichments.is_empty() {
        None
    } else {
        Some(params.enrichments.as_slice())
    };

    let body = CreateBody {
        search: SearchBody {
            query: &params.query,
            count: params.count.unwrap_or(DEFAULT_RESULT_COUNT),
            criteria,
        },
        enrichments,
    };

    serde_json::to_value(&body).map_err(|e| Error::Serialization(e.to_string()))
}

fn generate_request_id() -> String {
    format!("req_{:016x}", rand::random::<u64>())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_body_defaults_count_and_omits_empty_lists() {
        let body = create_webset_body(&CreateWebsetParams::new("engineers")).unwrap();

        assert_eq!(body["search"]["query"], "engineers");
        assert_eq!(body["search"]["count"], 20);
        assert!(body["search"].get("criteria").is_none());
        assert!(body.get("enrichments").is_none());
    }

    #[test]
    fn create_body_shapes_criteria_and_enrichments() {
        let params = CreateWebsetParams::new("engineers")
            .with_count(10)
            .with_criterion("writes rust")
            .with_criterion("based in europe")
            .with_enrichment(EnrichmentSpec::new("work email").with_format("email"));
        let body = create_webset_body(&params).unwrap();

        assert_eq!(body["search"]["count"], 10);
        let criteria = body["search"]["criteria"].as_array().unwrap();
        assert_eq!(criteria.len(), 2);
        assert_eq!(criteria[0]["description"], "writes rust");
        assert_eq!(criteria[1]["description"], "based in europe");

        let enrichments = body["enrichments"].as_array().unwrap();
        assert_eq!(enrichments.len(), 1);
        assert_eq!(enrichments[0]["description"], "work email");
        assert_eq!(enrichments[0]["format"], "email");
    }

    #[test]
    fn missing_api_key_fails_before_any_network_activity() {
        std::env::remove_var(API_KEY_ENV);
        match WebsetsClient::from_env() {
            Err(Error::MissingApiKey(var)) => assert_eq!(var, API_KEY_ENV),
            other => panic!("expected MissingApiKey, got {other:?}"),
        }

        std::env::set_var(API_KEY_ENV, "   ");
        assert!(matches!(
            WebsetsClient::from_env(),
            Err(Error::MissingApiKey(_))
        ));
        std::env::remove_var(API_KEY_ENV);
    }

    #[test]
    fn builder_requires_api_key() {
        match WebsetsClient::builder().build() {
            Err(Error::Configuration(msg)) => assert!(msg.contains("API key")),
            other => panic!("expected Configuration error, got {other:?}"),
        }
    }

    #[test]
    fn debug_redacts_api_key() {
        let client = WebsetsClient::builder()
            .api_key("secret-key")
            .build()
            .unwrap();
        let debug = format!("{client:?}");
        assert!(debug.contains("<redacted>"));
        assert!(!debug.contains("secret-key"));
    }

    #[test]
    fn endpoint_url_joins_base_path_and_query() {
        let client = WebsetsClient::builder()
            .api_key("k")
            .base_url("https://api.example.com/websets/v0")
            .unwrap()
            .build()
            .unwrap();

        let ctx = RequestContext::new(Method::GET, "/websets/ws_1/items")
            .with_query_param("limit", "25")
            .with_query_param("cursor", "abc");
        let url = client.endpoint_url(&ctx).unwrap();

        assert_eq!(
            url.as_str(),
            "https://api.example.com/websets/v0/websets/ws_1/items?limit=25&cursor=abc"
        );
    }
}
