use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Context, Result};
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use moka::sync::Cache;
use tracing::debug;

use super::BatchEmbedder;

/// Sentence embedder backed by a local ONNX model, with an in-memory cache of
/// query vectors keyed by the exact query text.
#[derive(Clone)]
pub struct LocalEmbedder {
    cache: Cache<String, Arc<Vec<f32>>>,
    inner: Arc<Mutex<TextEmbedding>>,
}

impl LocalEmbedder {
    pub fn new(max_cache: u64, show_download_progress: bool) -> Result<Self> {
        let options = InitOptions::new(EmbeddingModel::AllMiniLML6V2)
            .with_show_download_progress(show_download_progress);
        let model = TextEmbedding::try_new(options)
            .map_err(|e| anyhow!("{e}"))
            .context("Failed to initialize embedding model")?;

        Ok(Self {
            cache: Cache::builder().max_capacity(max_cache).build(),
            inner: Arc::new(Mutex::new(model)),
        })
    }
}

impl BatchEmbedder for LocalEmbedder {
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut results = vec![Vec::new(); texts.len()];
        let mut uncached = Vec::new();
        let mut uncached_indices = Vec::new();

        for (i, text) in texts.iter().enumerate() {
            match self.cache.get(text) {
                Some(vec) => results[i] = vec.as_ref().clone(),
                None => {
                    uncached.push(text.as_str());
                    uncached_indices.push(i);
                }
            }
        }

        if uncached.is_empty() {
            return Ok(results);
        }

        debug!("embedding" = uncached.len(), "cached" = texts.len() - uncached.len());
        #[allow(unused_mut)]
        let mut inner = self
            .inner
            .lock()
            .map_err(|_| anyhow!("Embedding model lock poisoned"))?;
        let embeddings = inner
            .embed(uncached, None)
            .map_err(|e| anyhow!("{e}"))
            .context("Embedding inference failed")?;

        for (embedding, idx) in embeddings.into_iter().zip(uncached_indices) {
            self.cache.insert(texts[idx].clone(), Arc::new(embedding.clone()));
            results[idx] = embedding;
        }

        Ok(results)
    }
}
