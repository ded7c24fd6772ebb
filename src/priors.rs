//! Click priors: historical click evidence turned into document-id boosts.
//!
//! The output is a `query_string` expression such as `1065813^0.250 8371111^0.031`
//! evaluated against the document-id field. An empty string means no prior.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Click aggregate for one document under one query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClickRow {
    pub doc_id: String,
    pub clicks: f64,
    #[serde(default)]
    pub num_impressions: Option<f64>,
}

impl ClickRow {
    pub fn new(doc_id: impl Into<String>, clicks: f64, num_impressions: f64) -> Self {
        Self {
            doc_id: doc_id.into(),
            clicks,
            num_impressions: Some(num_impressions),
        }
    }
}

fn boost_term(doc_id: &str, weight: f64) -> Option<String> {
    if doc_id.is_empty() || !weight.is_finite() || weight < 0.0 {
        return None;
    }
    Some(format!("{}^{:.3}", doc_id, weight))
}

/// Build a prior from grouped rows, weighting each document by clicks / impressions.
///
/// Rows with zero or missing impressions are skipped.
pub fn prior_from_grouped_clicks(rows: &[ClickRow]) -> String {
    rows.iter()
        .filter_map(|row| {
            let impressions = row.num_impressions.filter(|n| *n > 0.0)?;
            boost_term(&row.doc_id, row.clicks / impressions)
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Build a prior from raw per-document counts normalized by how often the query was seen.
pub fn prior_from_raw_counts<S: AsRef<str>>(
    doc_ids: &[S],
    weights: &HashMap<String, f64>,
    total_query_occurrences: f64,
) -> String {
    if !total_query_occurrences.is_finite() || total_query_occurrences <= 0.0 {
        return String::new();
    }

    doc_ids
        .iter()
        .filter_map(|doc| {
            let doc = doc.as_ref();
            let weight = weights.get(doc)?;
            boost_term(doc, weight / total_query_occurrences)
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Per-query click rows loaded from a JSON table (`{"query": [rows...]}`).
#[derive(Debug, Clone, Default)]
pub struct ClickPriorTable {
    entries: HashMap<String, Vec<ClickRow>>,
}

impl ClickPriorTable {
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read click priors: {}", path.display()))?;
        let raw: HashMap<String, Vec<ClickRow>> = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse click priors: {}", path.display()))?;
        Ok(Self::from_entries(raw))
    }

    pub fn from_entries(raw: HashMap<String, Vec<ClickRow>>) -> Self {
        let mut entries: HashMap<String, Vec<ClickRow>> = HashMap::with_capacity(raw.len());
        for (query, rows) in raw {
            entries.entry(Self::key(&query)).or_default().extend(rows);
        }
        Self { entries }
    }

    fn key(query: &str) -> String {
        query.trim().to_lowercase()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn rows_for(&self, query: &str) -> Option<&[ClickRow]> {
        self.entries.get(&Self::key(query)).map(Vec::as_slice)
    }

    /// Boost expression for `query`, or `None` when there is no usable click evidence.
    pub fn prior_for(&self, query: &str) -> Option<String> {
        let prior = prior_from_grouped_clicks(self.rows_for(query)?);
        (!prior.is_empty()).then_some(prior)
    }
}
