//! Example demonstrating custom retry configuration.
//!
//! This example shows how to:
//! - Tune the backoff schedule and retryable-status set
//! - Observe retries through the on_retry hook
//! - Replace the classification entirely with a custom predicate
//!
//! Run with: `cargo run --example retry_tuning`

use exa_websets::{Error, RetryPolicy, RetryPredicate, WebsetsClient};
use std::time::Duration;

/// Custom predicate: retry rate limiting only, give up on everything else.
struct RetryOnRateLimitOnly;

impl RetryPredicate for RetryOnRateLimitOnly {
    fn should_retry(&self, error: &Error, _attempt: usize) -> bool {
        error.status().map(|s| s.as_u16()) == Some(429)
    }
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter("exa_websets=debug,retry_tuning=info")
        .init();

    // Aggressive schedule: 5 retries starting at 250ms, capped at 5s,
    // logging each retry as it happens.
    let policy = RetryPolicy::default()
        .with_max_retries(5)
        .with_base_delay(Duration::from_millis(250))
        .with_max_delay(Duration::from_secs(5))
        .with_on_retry(|attempt, error, delay| {
            println!("retry {attempt} in {delay:?}: {error}");
        });

    let client = WebsetsClient::builder()
        .api_key(std::env::var("EXA_API_KEY").unwrap_or_default())
        .retry_policy(policy)
        .build()?;

    match client.list_websets(Some(5), None).await {
        Ok(page) => println!("{} websets", page.data.len()),
        Err(e) => eprintln!("listing failed: {e}"),
    }

    // Retrying nothing but 429s:
    let strict = WebsetsClient::builder()
        .api_key(std::env::var("EXA_API_KEY").unwrap_or_default())
        .retry_policy(RetryPolicy::default().with_predicate(RetryOnRateLimitOnly))
        .build()?;

    match strict.list_websets(None, None).await {
        Ok(page) => println!("{} websets", page.data.len()),
        Err(e) => eprintln!("listing failed: {e}"),
    }

    Ok(())
}
