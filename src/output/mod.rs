use anyhow::{Context, Result};
use clap::ValueEnum;
use console::style;
use serde_json::Value;

use crate::engine::{SearchHit, SearchResponse};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Pretty-printed engine response
    #[default]
    Json,
    /// One line per hit
    Table,
}

/// Render a response for the terminal. Returns `None` when there is nothing to show.
pub fn render(response: &SearchResponse, format: OutputFormat) -> Result<Option<String>> {
    if !response.has_hits() {
        return Ok(None);
    }

    let rendered = match format {
        OutputFormat::Json => serde_json::to_string_pretty(&response.raw)
            .context("Failed to format search response")?,
        OutputFormat::Table => render_table(response),
    };
    Ok(Some(rendered))
}

fn render_table(response: &SearchResponse) -> String {
    let mut lines = Vec::with_capacity(response.hits.len() + 1);
    if let Some(total) = response.total {
        let took = response
            .took_ms
            .map(|ms| format!(" in {}ms", ms))
            .unwrap_or_default();
        lines.push(
            style(format!("{} of {} hits{}", response.hits.len(), total, took))
                .dim()
                .to_string(),
        );
    }

    for (rank, hit) in response.hits.iter().enumerate() {
        lines.push(render_hit(rank + 1, hit));
    }
    lines.join("\n")
}

fn render_hit(rank: usize, hit: &SearchHit) -> String {
    let score = hit
        .score
        .map(|s| format!("{:.4}", s))
        .unwrap_or_else(|| "-".to_string());
    let name = hit.field_str("name").unwrap_or("(unnamed)");
    let categories = match hit.source.get("categoryPathIds") {
        Some(Value::Array(ids)) => ids
            .iter()
            .filter_map(Value::as_str)
            .collect::<Vec<_>>()
            .join(" > "),
        _ => String::new(),
    };

    let mut line = format!(
        "{:>3}. {} {} {}",
        rank,
        style(&hit.id).cyan(),
        style(score).yellow(),
        style(name).bold()
    );
    if !categories.is_empty() {
        line.push_str(&format!("  [{}]", style(categories).dim()));
    }
    line
}
