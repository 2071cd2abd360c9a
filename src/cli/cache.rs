//! `lra cache` commands.

use serde::Serialize;

use crate::cli::args::CacheCommand;
use crate::cli::output::print_json;
use crate::error::Result;
use crate::storage::cache::{CacheCategory, TtlCache};
use crate::storage::config::Config;

#[derive(Debug, Serialize)]
struct ClearReport {
    removed: usize,
    #[serde(rename = "type")]
    category: Option<CacheCategory>,
}

/// Execute a cache command.
pub fn execute(cmd: &CacheCommand, config: &Config, pretty: bool) -> Result<()> {
    let cache = TtlCache::from_config(config);
    match cmd {
        CacheCommand::Stats => print_json(&cache.stats(), pretty),
        CacheCommand::Clear { category } => {
            let category = category
                .as_deref()
                .map(str::parse::<CacheCategory>)
                .transpose()?;
            let removed = cache.clear(category);
            print_json(&ClearReport { removed, category }, pretty)
        }
    }
}
