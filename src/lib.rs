//! # exa-websets - A retry-aware client for the Exa Websets search API
//!
//! This crate is the outbound API layer for tools built on Exa "websets":
//! server-side search jobs that accumulate result items (for example,
//! candidate profiles matched against a natural-language query). It
//! provides a typed client composed from a generic retry engine and
//! structured request logging.
//!
//! ## Quick Start
//!
//! ```no_run
//! use exa_websets::{CreateWebsetParams, WebsetsClient};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), exa_websets::Error> {
//!     // Reads EXA_API_KEY; fails loudly if it's absent.
//!     let client = WebsetsClient::from_env()?;
//!
//!     let webset = client
//!         .create_webset(
//!             CreateWebsetParams::new("staff engineers with systems experience")
//!                 .with_count(10)
//!                 .with_criterion("has shipped production rust"),
//!         )
//!         .await?;
//!
//!     let items = client.get_webset_items(&webset.id, Some(25), None).await?;
//!     println!("{} items so far", items.data.len());
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **Typed operations** - create/get/list/delete/cancel websets and list
//!   their items, with unknown response fields preserved verbatim
//! - **Transient-failure resilience** - exponential backoff with jitter,
//!   a configurable retryable-status set, and bounded attempts
//! - **Structured errors** - every failure carries its HTTP status as a
//!   field, so retry classification never parses message text
//! - **Observability** - every call, response, and retry is logged through
//!   `tracing` and correlated by a request id
//! - **Explicit construction** - the client is an injectable value, never
//!   a process-wide singleton, which keeps it trivially mockable
//!
//! ## Retry behavior
//!
//! Defaults: 3 retries, 1 s base delay doubling per attempt with 0–20 %
//! jitter, capped at 10 s, retrying on 429/500/502/503/504 and timeouts.
//! All of it is configurable per client:
//!
//! ```no_run
//! use exa_websets::{RetryPolicy, WebsetsClient};
//! use std::time::Duration;
//!
//! # fn example() -> exa_websets::Result<()> {
//! let client = WebsetsClient::builder()
//!     .api_key("sk-...")
//!     .retry_policy(
//!         RetryPolicy::default()
//!             .with_max_retries(5)
//!             .with_base_delay(Duration::from_millis(250))
//!             .with_retryable_statuses([429, 503]),
//!     )
//!     .build()?;
//! # Ok(())
//! # }
//! ```
//!
//! The retry engine is exposed directly as [`with_retry`] and
//! [`fetch_with_retry`] for callers wrapping their own operations. Note
//! the deliberate asymmetry in [`fetch_with_retry`]: retryable statuses
//! are converted to errors (and retried), while non-retryable failures
//! like 404 come back as ordinary non-ok responses.

mod client;
mod error;
pub mod logging;
pub mod rate_limit;
mod retry;
pub mod types;

pub use client::{
    RequestContext, WebsetsClient, WebsetsClientBuilder, API_KEY_ENV, DEFAULT_BASE_URL,
    DEFAULT_RESULT_COUNT,
};
pub use error::{Error, Result};
pub use retry::{
    fetch_with_retry, with_retry, RetryPolicy, RetryPredicate, DEFAULT_RETRYABLE_STATUSES,
};
pub use types::{CreateWebsetParams, EnrichmentSpec, Webset, WebsetItem, WebsetItemList, WebsetList};
