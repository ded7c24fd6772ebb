//! Query routing: classify, build the lexical or vector request, submit it.

use std::sync::Arc;

use anyhow::{anyhow, Result};
use clap::ValueEnum;
use serde::Deserialize;
use tracing::{debug, info};

use crate::classifier::{CategoryClassifier, CategoryFilterSet};
use crate::embedding::BatchEmbedder;
use crate::engine::{SearchEngine, SearchResponse};
use crate::priors::ClickPriorTable;
use crate::query::{
    build_lexical, build_vector, category_filter, LexicalParams, SortOrder, StructuredQuery,
    VectorParams, DEFAULT_SIZE, DEFAULT_SORT_FIELD, VECTOR_FIELD,
};

/// Which retrieval path a query takes. The two are never combined in one request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum RetrievalMode {
    #[default]
    Lexical,
    Vector,
}

impl RetrievalMode {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "lexical" => Some(RetrievalMode::Lexical),
            "vector" => Some(RetrievalMode::Vector),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RetrievalMode::Lexical => "lexical",
            RetrievalMode::Vector => "vector",
        }
    }
}

#[derive(Debug, Clone)]
pub struct SearchOptions {
    pub index: String,
    pub mode: RetrievalMode,
    pub synonyms: bool,
    pub sort: String,
    pub sort_order: SortOrder,
    pub size: usize,
    /// Stored fields returned by lexical queries; `None` returns everything.
    pub source_fields: Option<Vec<String>>,
    pub vector_field: String,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            index: "bbuy_products".to_string(),
            mode: RetrievalMode::Lexical,
            synonyms: false,
            sort: DEFAULT_SORT_FIELD.to_string(),
            sort_order: SortOrder::Desc,
            size: DEFAULT_SIZE,
            source_fields: None,
            vector_field: VECTOR_FIELD.to_string(),
        }
    }
}

/// Everything decided for one query before it is sent.
#[derive(Debug, Clone)]
pub struct QueryPlan {
    pub categories: CategoryFilterSet,
    pub click_prior: Option<String>,
    pub request: StructuredQuery,
}

pub struct Searcher {
    engine: Arc<dyn SearchEngine>,
    classifier: Option<CategoryClassifier>,
    embedder: Option<Arc<dyn BatchEmbedder>>,
    priors: Option<ClickPriorTable>,
}

impl Searcher {
    pub fn new(engine: Arc<dyn SearchEngine>) -> Self {
        Self {
            engine,
            classifier: None,
            embedder: None,
            priors: None,
        }
    }

    pub fn with_classifier(mut self, classifier: CategoryClassifier) -> Self {
        self.classifier = Some(classifier);
        self
    }

    pub fn with_embedder(mut self, embedder: Arc<dyn BatchEmbedder>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    pub fn with_priors(mut self, priors: ClickPriorTable) -> Self {
        self.priors = Some(priors);
        self
    }

    fn classify(&self, query: &str) -> Result<CategoryFilterSet> {
        match &self.classifier {
            Some(classifier) => classifier.classify(query),
            None => Ok(CategoryFilterSet::default()),
        }
    }

    pub fn plan(&self, query: &str, options: &SearchOptions) -> Result<QueryPlan> {
        let categories = self.classify(query)?;

        match options.mode {
            RetrievalMode::Lexical => {
                let click_prior = self
                    .priors
                    .as_ref()
                    .and_then(|table| table.prior_for(query));

                let mut params = LexicalParams::new(query);
                params.click_prior = click_prior.as_deref();
                params.filters = category_filter(categories.as_slice()).into_iter().collect();
                params.sort = options.sort.as_str();
                params.sort_order = options.sort_order;
                params.size = options.size;
                params.source = options.source_fields.clone();
                params.synonyms = options.synonyms;
                let request = build_lexical(params);

                Ok(QueryPlan {
                    categories,
                    click_prior,
                    request,
                })
            }
            RetrievalMode::Vector => {
                let embedder = self
                    .embedder
                    .as_deref()
                    .ok_or_else(|| anyhow!("Vector mode requires an embedding model"))?;
                if !categories.is_empty() {
                    debug!("msg" = "category filter is not applied to vector queries");
                }

                let mut params = VectorParams::new(query);
                params.size = options.size;
                params.field = options.vector_field.as_str();
                let request = build_vector(embedder, params)?;

                Ok(QueryPlan {
                    categories,
                    click_prior: None,
                    request,
                })
            }
        }
    }

    /// Run one query end to end. `Ok(None)` means the engine returned no hits.
    pub fn search(&self, query: &str, options: &SearchOptions) -> Result<Option<SearchResponse>> {
        let plan = self.plan(query, options)?;
        debug!(
            "mode" = options.mode.as_str(),
            "request" = %plan.request.to_json(),
            "msg" = "structured query"
        );

        let response = self.engine.search(&plan.request, &options.index)?;
        info!(
            "engine" = self.engine.name(),
            "index" = %options.index,
            "hits" = response.hits.len(),
            "took_ms" = ?response.took_ms
        );

        Ok(response.has_hits().then_some(response))
    }
}
