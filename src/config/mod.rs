use std::path::PathBuf;
use std::{env, fs};

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use tracing::warn;

use crate::classifier::{DEFAULT_LABEL_PREFIX, DEFAULT_THRESHOLD, DEFAULT_TOP_K};
use crate::embedding::DEFAULT_CACHE_SIZE;
use crate::normalize::StemAlgorithm;
use crate::query::{SortOrder, DEFAULT_SIZE, DEFAULT_SORT_FIELD, VECTOR_FIELD};
use crate::search::RetrievalMode;

/// Connection settings for the search engine.
#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_use_ssl")]
    pub use_ssl: bool,
    #[serde(default = "default_user")]
    pub user: Option<String>,
    #[serde(default = "default_password")]
    pub password: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Collection queried when no `--index` is given
    #[serde(default = "default_index")]
    pub index: String,
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    9200
}

fn default_use_ssl() -> bool {
    true
}

fn default_user() -> Option<String> {
    Some("admin".to_string())
}

fn default_password() -> Option<String> {
    Some("admin".to_string())
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_index() -> String {
    "bbuy_products".to_string()
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            use_ssl: default_use_ssl(),
            user: default_user(),
            password: default_password(),
            timeout_secs: default_timeout_secs(),
            index: default_index(),
        }
    }
}

impl EngineConfig {
    pub fn base_url(&self) -> String {
        let scheme = if self.use_ssl { "https" } else { "http" };
        format!("{}://{}:{}", scheme, self.host, self.port)
    }
}

/// Per-request search options.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchConfig {
    /// "lexical" or "vector"; anything else falls back to lexical
    #[serde(default)]
    pub mode: Option<String>,
    #[serde(default)]
    pub synonyms: bool,
    #[serde(default = "default_sort")]
    pub sort: String,
    #[serde(default)]
    pub sort_dir: SortOrder,
    #[serde(default = "default_size")]
    pub size: usize,
    #[serde(default = "default_source_fields")]
    pub source_fields: Vec<String>,
}

fn default_sort() -> String {
    DEFAULT_SORT_FIELD.to_string()
}

fn default_size() -> usize {
    DEFAULT_SIZE
}

fn default_source_fields() -> Vec<String> {
    ["name", "shortDescription", "categoryPathIds"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            mode: None,
            synonyms: false,
            sort: default_sort(),
            sort_dir: SortOrder::Desc,
            size: default_size(),
            source_fields: default_source_fields(),
        }
    }
}

impl SearchConfig {
    pub fn retrieval_mode(&self) -> RetrievalMode {
        match self.mode.as_deref().map(str::trim) {
            None | Some("") => RetrievalMode::Lexical,
            Some(raw) => RetrievalMode::parse(raw).unwrap_or_else(|| {
                warn!("mode" = raw, "msg" = "unknown retrieval mode, using lexical");
                RetrievalMode::Lexical
            }),
        }
    }
}

/// Label model used to derive category filters. No endpoint, no filtering.
#[derive(Debug, Clone, Deserialize)]
pub struct ClassifierConfig {
    pub endpoint: Option<String>,
    #[serde(default = "default_threshold")]
    pub threshold: f32,
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    #[serde(default = "default_label_prefix")]
    pub label_prefix: String,
    /// Stemmer the model's training text was normalized with
    #[serde(default)]
    pub stemmer: StemAlgorithm,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_threshold() -> f32 {
    DEFAULT_THRESHOLD
}

fn default_top_k() -> usize {
    DEFAULT_TOP_K
}

fn default_label_prefix() -> String {
    DEFAULT_LABEL_PREFIX.to_string()
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            threshold: default_threshold(),
            top_k: default_top_k(),
            label_prefix: default_label_prefix(),
            stemmer: StemAlgorithm::default(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmbeddingConfig {
    #[serde(default = "default_cache_size")]
    pub cache_size: u64,
    #[serde(default = "default_vector_field")]
    pub vector_field: String,
}

fn default_cache_size() -> u64 {
    DEFAULT_CACHE_SIZE
}

fn default_vector_field() -> String {
    VECTOR_FIELD.to_string()
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            cache_size: default_cache_size(),
            vector_field: default_vector_field(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PriorsConfig {
    /// JSON table of click rows keyed by query
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub classifier: ClassifierConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub priors: PriorsConfig,
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        if !config_path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        let config: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", config_path.display()))?;

        config
            .validate()
            .with_context(|| format!("Invalid config file: {}", config_path.display()))?;

        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let threshold = self.classifier.threshold;
        if !threshold.is_finite() || !(0.0..=1.0).contains(&threshold) {
            bail!("classifier.threshold must be within [0, 1], got {}", threshold);
        }
        if self.search.size == 0 {
            bail!("search.size must be at least 1");
        }
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        if let Ok(path) = env::var("PRODSEARCH_CONFIG") {
            return PathBuf::from(path);
        }

        if let Ok(home) = env::var("PRODSEARCH_HOME") {
            return PathBuf::from(home).join("config.toml");
        }

        if let Some(home) = env::var_os("HOME") {
            return PathBuf::from(home).join(".prodsearch").join("config.toml");
        }

        PathBuf::from(".prodsearch").join("config.toml")
    }

    pub fn create_default_config() -> Result<PathBuf> {
        let config_path = Self::config_path();

        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let default_config = r#"[engine]
host = "localhost"
port = 9200
use_ssl = true
index = "bbuy_products"

[search]
mode = "lexical"
synonyms = false
sort = "_score"
sort_dir = "desc"
size = 10

[classifier]
# endpoint = "http://localhost:8000/predict"
threshold = 0.5
top_k = 1
"#;

        fs::write(&config_path, default_config)
            .with_context(|| format!("Failed to write config file: {}", config_path.display()))?;

        Ok(config_path)
    }
}
