use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use base64::Engine;
use serde_json::Value;
use tracing::debug;

use super::{SearchEngine, SearchResponse};
use crate::query::StructuredQuery;

const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Basic-auth `_search` client for an OpenSearch (or Elasticsearch) cluster.
#[derive(Clone)]
pub struct OpenSearchClient {
    client: ureq::Agent,
    base_url: String,
    authorization: Option<String>,
}

impl OpenSearchClient {
    pub fn new(base_url: String, timeout_secs: u64) -> Self {
        let client = ureq::AgentBuilder::new()
            .timeout(Duration::from_secs(if timeout_secs == 0 {
                DEFAULT_TIMEOUT_SECS
            } else {
                timeout_secs
            }))
            .build();

        Self {
            client,
            base_url,
            authorization: None,
        }
    }

    pub fn with_basic_auth(mut self, user: &str, password: &str) -> Self {
        let token =
            base64::engine::general_purpose::STANDARD.encode(format!("{}:{}", user, password));
        self.authorization = Some(format!("Basic {}", token));
        self
    }

    fn search_url(&self, index: &str) -> String {
        format!(
            "{}/{}/_search",
            self.base_url.trim_end_matches('/'),
            index.trim_matches('/')
        )
    }

    fn describe_status(status: u16, index: &str, body: &str) -> String {
        let reason = match status {
            401 | 403 => "authentication failed (check --user and password)".to_string(),
            404 => format!("index '{}' not found", index),
            500..=599 => format!("server error ({})", status),
            _ => format!("status {}", status),
        };
        if body.is_empty() {
            format!("Search request failed: {}", reason)
        } else {
            format!("Search request failed: {}: {}", reason, body)
        }
    }
}

impl SearchEngine for OpenSearchClient {
    fn name(&self) -> &'static str {
        "opensearch"
    }

    fn search(&self, query: &StructuredQuery, index: &str) -> Result<SearchResponse> {
        let url = self.search_url(index);
        let body = serde_json::to_value(query).context("Failed to serialize query")?;

        let mut request = self
            .client
            .post(&url)
            .set("Content-Type", "application/json");
        if let Some(auth) = &self.authorization {
            request = request.set("Authorization", auth);
        }

        debug!("url" = %url, "msg" = "submitting search");
        let response = request.send_json(body).map_err(|e| match e {
            ureq::Error::Status(status, response) => {
                let body = response.into_string().unwrap_or_default();
                anyhow!(Self::describe_status(status, index, &body))
            }
            other => anyhow!("Failed to reach search engine at {}: {}", url, other),
        })?;

        let raw: Value = response
            .into_json()
            .context("Failed to parse search response")?;
        SearchResponse::from_json(raw)
    }
}
