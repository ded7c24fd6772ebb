//! Retrieval engine boundary: submit a structured query, get ranked hits back.

mod opensearch;

use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::Value;

use crate::query::StructuredQuery;

pub use opensearch::OpenSearchClient;

pub trait SearchEngine: Send + Sync {
    fn name(&self) -> &'static str;
    fn search(&self, query: &StructuredQuery, index: &str) -> Result<SearchResponse>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub id: String,
    /// Absent when the engine sorts on something other than relevance.
    pub score: Option<f64>,
    pub source: Value,
}

impl SearchHit {
    pub fn field_str(&self, field: &str) -> Option<&str> {
        self.source.get(field).and_then(Value::as_str)
    }
}

/// Engine response: the raw body plus a typed view of its hits.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResponse {
    pub raw: Value,
    pub took_ms: Option<u64>,
    pub total: Option<u64>,
    pub hits: Vec<SearchHit>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum TotalHits {
    Count(u64),
    Object { value: u64 },
}

#[derive(Deserialize)]
struct RawHit {
    #[serde(rename = "_id")]
    id: String,
    #[serde(rename = "_score", default)]
    score: Option<f64>,
    #[serde(rename = "_source", default)]
    source: Value,
}

#[derive(Deserialize, Default)]
struct RawHits {
    #[serde(default)]
    total: Option<TotalHits>,
    #[serde(default)]
    hits: Vec<RawHit>,
}

#[derive(Deserialize)]
struct RawResponse {
    #[serde(default)]
    took: Option<u64>,
    #[serde(default)]
    hits: RawHits,
}

impl SearchResponse {
    pub fn from_json(raw: Value) -> Result<Self> {
        let parsed = RawResponse::deserialize(&raw).context("Unexpected search response shape")?;
        let hits = parsed
            .hits
            .hits
            .into_iter()
            .map(|h| SearchHit {
                id: h.id,
                score: h.score,
                source: h.source,
            })
            .collect();
        let total = parsed.hits.total.map(|t| match t {
            TotalHits::Count(n) => n,
            TotalHits::Object { value } => value,
        });

        Ok(Self {
            raw,
            took_ms: parsed.took,
            total,
            hits,
        })
    }

    pub fn has_hits(&self) -> bool {
        !self.hits.is_empty()
    }
}
