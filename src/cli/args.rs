//! CLI argument definitions using clap.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::core::models::{DEFAULT_SEARCH_LIMIT, SearchParams};

/// Legal Research Assistant - resilient, cached CourtListener client.
#[derive(Parser, Debug)]
#[command(name = "lra")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    // === Global flags ===
    /// Pretty-print JSON output
    #[arg(long, global = true)]
    pub pretty: bool,

    /// How errors are written to stderr
    #[arg(long, value_enum, default_value = "text", global = true)]
    pub error_format: ErrorFormat,

    /// Config file (overrides LRA_CONFIG and the default location)
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Log level
    #[arg(long, value_name = "LEVEL", global = true)]
    pub log_level: Option<String>,

    /// Emit JSONL logs to stderr
    #[arg(long, global = true)]
    pub json_output: bool,

    /// Verbose output (sets log level to debug)
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// Error output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum ErrorFormat {
    /// `Error [CODE]: message` plus a fix hint.
    #[default]
    Text,
    /// One JSON object.
    Json,
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Inspect or clear the response cache
    #[command(subcommand)]
    Cache(CacheCommand),

    /// Resolve citations to the cases they name
    Lookup(LookupArgs),

    /// Find cases citing a citation
    Citing(CitingArgs),

    /// Search opinions
    Search(SearchArgs),

    /// Fetch an opinion's metadata or text
    Opinion(OpinionArgs),
}

/// Cache management subcommands.
#[derive(Subcommand, Debug)]
pub enum CacheCommand {
    /// Show cache counters and on-disk size
    Stats,

    /// Remove cached entries
    Clear {
        /// Only clear one category (metadata, text, search)
        #[arg(long = "type", value_name = "TYPE")]
        category: Option<String>,
    },
}

/// Arguments for the `lookup` command.
#[derive(Args, Debug)]
pub struct LookupArgs {
    /// Citations such as "410 U.S. 113"
    #[arg(required = true, value_name = "CITATION")]
    pub citations: Vec<String>,
}

/// Arguments for the `citing` command.
#[derive(Args, Debug)]
pub struct CitingArgs {
    /// Citation of the cited case
    pub citation: String,

    /// Maximum number of citing cases
    #[arg(long, default_value_t = DEFAULT_SEARCH_LIMIT)]
    pub limit: u32,
}

/// Arguments for the `search` command.
#[derive(Args, Debug)]
pub struct SearchArgs {
    /// Search query
    pub query: String,

    /// Court identifier (e.g. scotus, ca9)
    #[arg(long)]
    pub court: Option<String>,

    /// Case name
    #[arg(long)]
    pub case_name: Option<String>,

    /// Judge name
    #[arg(long)]
    pub judge: Option<String>,

    /// Filed on or after (YYYY-MM-DD)
    #[arg(long, value_name = "DATE")]
    pub filed_after: Option<NaiveDate>,

    /// Filed on or before (YYYY-MM-DD)
    #[arg(long, value_name = "DATE")]
    pub filed_before: Option<NaiveDate>,

    /// Cited more than N times
    #[arg(long, value_name = "N")]
    pub cited_gt: Option<u32>,

    /// Cited fewer than N times
    #[arg(long, value_name = "N")]
    pub cited_lt: Option<u32>,

    /// Ordering, e.g. "dateFiled desc" (default "score desc")
    #[arg(long)]
    pub order_by: Option<String>,

    /// Maximum number of results (upstream caps at 100)
    #[arg(long, default_value_t = DEFAULT_SEARCH_LIMIT)]
    pub limit: u32,
}

impl SearchArgs {
    /// Convert into request parameters.
    #[must_use]
    pub fn to_params(&self) -> SearchParams {
        SearchParams {
            query: self.query.clone(),
            court: self.court.clone(),
            case_name: self.case_name.clone(),
            judge: self.judge.clone(),
            filed_after: self.filed_after,
            filed_before: self.filed_before,
            cited_gt: self.cited_gt,
            cited_lt: self.cited_lt,
            order_by: self.order_by.clone(),
            limit: self.limit,
        }
    }
}

/// Arguments for the `opinion` command.
#[derive(Args, Debug)]
pub struct OpinionArgs {
    /// CourtListener opinion id
    pub id: u64,

    /// Print the opinion text instead of the metadata record
    #[arg(long)]
    pub text: bool,
}
