use std::env;
use std::io::{self, BufRead, Write};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use console::{style, Term};
use tracing::{info, warn};

use crate::classifier::{CategoryClassifier, HttpLabelPredictor};
use crate::cli::{Cli, Commands};
use crate::config::Config;
use crate::embedding::LocalEmbedder;
use crate::engine::OpenSearchClient;
use crate::output::{self, OutputFormat};
use crate::priors::ClickPriorTable;
use crate::search::{RetrievalMode, SearchOptions, Searcher};

pub const EXIT_COMMAND: &str = "Exit";
const QUERY_PROMPT: &str = "\nEnter your query (type 'Exit' to exit or hit ctrl-c):";

struct ProgressLine {
    term: Term,
    enabled: bool,
}

impl ProgressLine {
    fn stderr() -> Self {
        let term = Term::stderr();
        let enabled = term.is_term();
        Self { term, enabled }
    }

    fn set(&self, message: &str) {
        if self.enabled {
            let _ = self.term.clear_line();
            let _ = self.term.write_str(&format!("\r{message}"));
            let _ = self.term.flush();
        } else {
            eprintln!("{message}");
        }
    }

    fn finish(&self, message: &str) {
        if self.enabled {
            let _ = self.term.clear_line();
            let _ = self.term.write_line(&format!("\r{message}"));
        } else {
            eprintln!("{message}");
        }
    }
}

/// Outcome counts of an interactive session.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SessionStats {
    pub queries: usize,
    pub with_hits: usize,
    pub failed: usize,
}

pub fn run() -> Result<()> {
    setup_tracing();
    let cli = Cli::parse();
    run_with_cli(cli)
}

pub fn run_with_cli(cli: Cli) -> Result<()> {
    match cli.command.clone().unwrap_or(Commands::Interactive) {
        Commands::Config { init, show } => handle_config(init, show),
        Commands::Search { query } => {
            let (searcher, options) = prepare(&cli)?;
            handle_search(&searcher, &options, &query, cli.format)
        }
        Commands::Interactive => {
            let (searcher, options) = prepare(&cli)?;
            let stdin = io::stdin();
            let stdout = io::stdout();
            let stats = run_interactive(
                &searcher,
                &options,
                cli.format,
                stdin.lock(),
                &mut stdout.lock(),
            )?;
            info!(
                "queries" = stats.queries,
                "with_hits" = stats.with_hits,
                "failed" = stats.failed,
                "msg" = "session finished"
            );
            Ok(())
        }
    }
}

fn prepare(cli: &Cli) -> Result<(Searcher, SearchOptions)> {
    let mut config = Config::load()?;
    apply_overrides(&mut config, cli)?;
    let options = search_options(&config, cli.requested_mode());
    let searcher = build_searcher(&config, options.mode)?;

    info!(
        "index" = %options.index,
        "mode" = options.mode.as_str(),
        "synonyms" = options.synonyms
    );
    Ok((searcher, options))
}

fn handle_config(init: bool, show: bool) -> Result<()> {
    let path = Config::config_path();

    if init {
        if path.exists() {
            println!(
                "{} Config already exists at {}",
                style("ℹ").blue(),
                path.display()
            );
        } else {
            let created = Config::create_default_config()?;
            println!(
                "{} Created default config at {}",
                style("✔").green(),
                created.display()
            );
        }
    }

    if show || !init {
        let config = Config::load()?;
        println!("Config path: {}", path.display());
        println!("Engine: {}", config.engine.base_url());
        println!("Index: {}", config.engine.index);
        println!("Mode: {}", config.search.retrieval_mode().as_str());
        println!(
            "Classifier: {}",
            config
                .classifier
                .endpoint
                .as_deref()
                .unwrap_or("(none, no category filtering)")
        );
    }

    Ok(())
}

fn apply_overrides(config: &mut Config, cli: &Cli) -> Result<()> {
    if let Some(index) = &cli.index {
        config.engine.index = index.clone();
    }
    if let Some(host) = &cli.host {
        config.engine.host = host.clone();
    }
    if let Some(port) = cli.port {
        config.engine.port = port;
    }
    if let Some(user) = &cli.user {
        config.engine.user = Some(user.clone());
        config.engine.password = Some(resolve_password(user)?);
    }
    if cli.synonyms {
        config.search.synonyms = true;
    }
    if let Some(sort) = &cli.sort {
        config.search.sort = sort.clone();
    }
    if let Some(dir) = cli.sort_dir {
        config.search.sort_dir = dir;
    }
    if let Some(size) = cli.size {
        config.search.size = size;
    }
    config.validate()
}

fn resolve_password(user: &str) -> Result<String> {
    if let Ok(password) = env::var("PRODSEARCH_PASSWORD") {
        return Ok(password);
    }
    let term = Term::stderr();
    term.write_str(&format!("Password for {}: ", user))?;
    term.read_secure_line()
        .context("Failed to read password from terminal")
}

fn search_options(config: &Config, requested: Option<RetrievalMode>) -> SearchOptions {
    SearchOptions {
        index: config.engine.index.clone(),
        mode: requested.unwrap_or_else(|| config.search.retrieval_mode()),
        synonyms: config.search.synonyms,
        sort: config.search.sort.clone(),
        sort_order: config.search.sort_dir,
        size: config.search.size,
        source_fields: Some(config.search.source_fields.clone()),
        vector_field: config.embedding.vector_field.clone(),
    }
}

fn build_searcher(config: &Config, mode: RetrievalMode) -> Result<Searcher> {
    let mut engine = OpenSearchClient::new(config.engine.base_url(), config.engine.timeout_secs);
    if let (Some(user), Some(password)) = (&config.engine.user, &config.engine.password) {
        engine = engine.with_basic_auth(user, password);
    }
    let mut searcher = Searcher::new(Arc::new(engine));

    match &config.classifier.endpoint {
        Some(endpoint) => {
            let predictor =
                HttpLabelPredictor::new(endpoint.clone(), config.classifier.timeout_secs);
            let classifier = CategoryClassifier::new(Arc::new(predictor))
                .with_threshold(config.classifier.threshold)
                .with_top_k(config.classifier.top_k)
                .with_label_prefix(config.classifier.label_prefix.clone())
                .with_stemmer(config.classifier.stemmer);
            searcher = searcher.with_classifier(classifier);
        }
        None => warn!("msg" = "no classifier endpoint configured, category filtering disabled"),
    }

    if let Some(path) = &config.priors.path {
        let table = ClickPriorTable::load(path)?;
        info!("queries" = table.len(), "path" = %path.display(), "msg" = "loaded click priors");
        searcher = searcher.with_priors(table);
    }

    if mode == RetrievalMode::Vector {
        let progress = ProgressLine::stderr();
        progress.set("Loading embedding model…");
        let embedder = LocalEmbedder::new(config.embedding.cache_size, progress.enabled)?;
        progress.finish("Embedding model ready");
        searcher = searcher.with_embedder(Arc::new(embedder));
    }

    Ok(searcher)
}

fn handle_search(
    searcher: &Searcher,
    options: &SearchOptions,
    query: &str,
    format: OutputFormat,
) -> Result<()> {
    if let Some(response) = searcher.search(query, options)? {
        if let Some(rendered) = output::render(&response, format)? {
            println!("{}", rendered);
        }
    } else {
        eprintln!("{} No results for \"{}\"", style("ℹ").blue(), query);
    }
    Ok(())
}

/// Prompt, read a query, search, render; repeat until `Exit` or end of input.
/// A failing query is logged and the loop moves on to the next prompt.
pub fn run_interactive<R: BufRead, W: Write>(
    searcher: &Searcher,
    options: &SearchOptions,
    format: OutputFormat,
    input: R,
    out: &mut W,
) -> Result<SessionStats> {
    let mut stats = SessionStats::default();
    let mut lines = input.lines();

    loop {
        writeln!(out, "{}", QUERY_PROMPT)?;
        out.flush()?;

        let Some(line) = lines.next() else {
            break;
        };
        let line = match line {
            Ok(line) => line,
            Err(e) if e.kind() == io::ErrorKind::InvalidData => {
                stats.queries += 1;
                stats.failed += 1;
                warn!("error" = %e, "msg" = "skipping query that is not valid UTF-8");
                continue;
            }
            Err(e) => return Err(e).context("Failed to read query"),
        };
        let query = line.as_str();

        if query == EXIT_COMMAND {
            break;
        }
        if query.trim().is_empty() {
            continue;
        }

        stats.queries += 1;
        let rendered = searcher
            .search(query, options)
            .and_then(|response| match response {
                Some(response) => output::render(&response, format),
                None => Ok(None),
            });

        match rendered {
            Ok(Some(text)) => {
                stats.with_hits += 1;
                writeln!(out, "{}", text)?;
            }
            Ok(None) => {}
            Err(e) => {
                stats.failed += 1;
                let detail = format!("{:#}", e);
                warn!("query" = query, "error" = %detail, "msg" = "query failed");
            }
        }
    }

    Ok(stats)
}

fn setup_tracing() {
    let filter = env::var("RUST_LOG").unwrap_or_else(|_| "prodsearch=info".into());
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .try_init();
}
