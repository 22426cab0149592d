//! Example demonstrating an end-to-end webset search.
//!
//! This example shows how to:
//! - Build a client from the EXA_API_KEY environment variable
//! - Create a search with criteria and enrichments
//! - Poll the webset and page through its items
//!
//! Run with: `cargo run --example create_webset`

use exa_websets::{CreateWebsetParams, EnrichmentSpec, Error, WebsetsClient};
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Initialize tracing for logging
    tracing_subscriber::fmt()
        .with_env_filter("exa_websets=debug,create_webset=info")
        .init();

    let client = WebsetsClient::from_env()?;

    let webset = client
        .create_webset(
            CreateWebsetParams::new("senior backend engineers with rust experience")
                .with_count(10)
                .with_criterion("has contributed to open source")
                .with_enrichment(EnrichmentSpec::new("work email address").with_format("email")),
        )
        .await?;
    println!("Created webset {}", webset.id);

    // The search runs server-side; poll until it settles.
    loop {
        let current = client.get_webset(&webset.id).await?;
        let status = current.status.as_deref().unwrap_or("unknown");
        println!("Status: {status}");
        if status != "running" {
            break;
        }
        tokio::time::sleep(Duration::from_secs(5)).await;
    }

    let mut cursor: Option<String> = None;
    loop {
        let page = client
            .get_webset_items(&webset.id, Some(25), cursor.as_deref())
            .await?;
        for item in &page.data {
            println!("- {} {:?}", item.id, item.properties);
        }
        match page.next_cursor {
            Some(next) if page.has_more == Some(true) => cursor = Some(next),
            _ => break,
        }
    }

    Ok(())
}
