use clap::{Parser, Subcommand};

use crate::output::OutputFormat;
use crate::query::SortOrder;
use crate::search::RetrievalMode;

#[derive(Parser, Debug, Clone)]
#[command(
    name = "prodsearch",
    version,
    about = "Interactive product search with query classification and click priors"
)]
pub struct Cli {
    /// Index (collection) to search. Also reads PRODSEARCH_INDEX.
    #[arg(global = true, short = 'i', long, env = "PRODSEARCH_INDEX")]
    pub index: Option<String>,

    /// Search engine host name. Also reads PRODSEARCH_HOST.
    #[arg(global = true, short = 's', long, env = "PRODSEARCH_HOST")]
    pub host: Option<String>,

    /// Search engine port. Also reads PRODSEARCH_PORT.
    #[arg(global = true, short = 'p', long, env = "PRODSEARCH_PORT")]
    pub port: Option<u16>,

    /// Engine user; the password comes from PRODSEARCH_PASSWORD or a prompt
    #[arg(global = true, long, env = "PRODSEARCH_USER")]
    pub user: Option<String>,

    /// Match the fuzzy name clause against the synonym-expanded field
    #[arg(global = true, long)]
    pub synonyms: bool,

    /// Retrieval mode (defaults to the config value, then lexical)
    #[arg(global = true, long, value_enum)]
    pub mode: Option<RetrievalMode>,

    /// Shorthand for --mode vector
    #[arg(global = true, long, conflicts_with = "mode")]
    pub vector: bool,

    /// Field to sort on
    #[arg(global = true, long)]
    pub sort: Option<String>,

    /// Sort direction
    #[arg(global = true, long, value_enum)]
    pub sort_dir: Option<SortOrder>,

    /// Maximum hits to return
    #[arg(global = true, short = 'n', long)]
    pub size: Option<usize>,

    /// How hits are printed
    #[arg(global = true, long, value_enum, default_value_t = OutputFormat::Json)]
    pub format: OutputFormat,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

impl Cli {
    pub fn requested_mode(&self) -> Option<RetrievalMode> {
        if self.vector {
            Some(RetrievalMode::Vector)
        } else {
            self.mode
        }
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Read queries from the terminal until "Exit" (the default)
    Interactive,
    /// Run a single query and exit
    Search {
        /// Query such as "apple ipad" or a SKU
        query: String,
    },
    /// Show or create configuration
    Config {
        /// Create a default config file if none exists
        #[arg(long)]
        init: bool,
        /// Print the effective configuration path and engine URL
        #[arg(long)]
        show: bool,
    },
}
