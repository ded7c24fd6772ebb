//! Nearest-neighbour query over the catalog's embedding field.

use anyhow::{bail, Result};

use super::dsl::{KnnQuery, Query};
use super::{StructuredQuery, DEFAULT_SIZE};
use crate::embedding::BatchEmbedder;

pub const VECTOR_FIELD: &str = "embedding";

#[derive(Debug, Clone)]
pub struct VectorParams<'a> {
    pub query: &'a str,
    pub size: usize,
    pub source: Option<Vec<String>>,
    pub field: &'a str,
}

impl<'a> VectorParams<'a> {
    pub fn new(query: &'a str) -> Self {
        Self {
            query,
            size: DEFAULT_SIZE,
            source: None,
            field: VECTOR_FIELD,
        }
    }
}

/// Embed the raw query and request its `size` nearest neighbours. Carries no
/// filters, sort or scoring.
pub fn build_vector(
    embedder: &dyn BatchEmbedder,
    params: VectorParams<'_>,
) -> Result<StructuredQuery> {
    let vector = embedder.embed(params.query)?;
    if vector.is_empty() {
        bail!("Embedding model returned an empty vector");
    }

    Ok(StructuredQuery {
        size: params.size,
        sort: Vec::new(),
        query: Query::Knn(KnnQuery {
            field: params.field.to_string(),
            vector,
            k: params.size,
        }),
        source: params.source,
    })
}
