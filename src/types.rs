//! Wire types for the Websets API.
//!
//! The API owns these schemas; known fields are typed and everything else
//! is preserved verbatim in a flattened map, so server-side additions pass
//! through untouched.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A saved, server-side search job plus its accumulating results.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Webset {
    /// Server-assigned identifier (`ws_...`).
    pub id: String,
    /// Lifecycle status reported by the API (`running`, `idle`, ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// Caller-supplied external identifier, when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    /// Fields this client does not model; returned verbatim.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A single result record belonging to a [`Webset`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebsetItem {
    /// Server-assigned identifier.
    pub id: String,
    /// Identifier of the owning webset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webset_id: Option<String>,
    /// The found entity (person, company, ...), schema owned by the API.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<Value>,
    /// Per-criterion evaluation results.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evaluations: Option<Value>,
    /// Enrichment results attached asynchronously by the API.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enrichments: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    /// Fields this client does not model; returned verbatim.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One page of websets from the list endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebsetList {
    pub data: Vec<Webset>,
    #[serde(default)]
    pub has_more: Option<bool>,
    #[serde(default)]
    pub next_cursor: Option<String>,
}

/// One page of items from a webset's items endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebsetItemList {
    pub data: Vec<WebsetItem>,
    #[serde(default)]
    pub has_more: Option<bool>,
    #[serde(default)]
    pub next_cursor: Option<String>,
}

/// Parameters for creating a webset search.
///
/// `count` defaults to 20 when unset. Empty `criteria` and `enrichments`
/// are omitted from the request body entirely, never sent as empty arrays.
#[derive(Debug, Clone, Default)]
pub struct CreateWebsetParams {
    /// Natural-language description of what to find.
    pub query: String,
    /// Target number of results.
    pub count: Option<u64>,
    /// Free-text requirements the API evaluates against each item.
    pub criteria: Vec<String>,
    /// Additional fields the API derives for each item.
    pub enrichments: Vec<EnrichmentSpec>,
}

impl CreateWebsetParams {
    /// Creates parameters for the given query with all optionals unset.
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Default::default()
        }
    }

    /// Sets the target result count.
    pub fn with_count(mut self, count: u64) -> Self {
        self.count = Some(count);
        self
    }

    /// Adds a free-text criterion.
    pub fn with_criterion(mut self, criterion: impl Into<String>) -> Self {
        self.criteria.push(criterion.into());
        self
    }

    /// Adds an enrichment request.
    pub fn with_enrichment(mut self, enrichment: EnrichmentSpec) -> Self {
        self.enrichments.push(enrichment);
        self
    }
}

/// A requested derived field, attached to each item asynchronously.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichmentSpec {
    /// What to derive (e.g. "work email address").
    pub description: String,
    /// Expected result format (`text`, `email`, `number`, ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
}

impl EnrichmentSpec {
    /// Creates an enrichment with no format constraint.
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            format: None,
        }
    }

    /// Sets the expected result format.
    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }
}

/// A free-text requirement in the shape the API expects.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Criterion {
    pub description: String,
}
