//! CLI argument parsing and command dispatch.

pub mod args;
pub mod cache;
pub mod output;
pub mod research;

pub use args::{Cli, Commands, ErrorFormat};

use crate::core::client::ResilientClient;
use crate::error::Result;
use crate::storage::config::Config;

/// Run a parsed command line.
///
/// # Errors
///
/// Returns the command's error; the caller renders it and picks the exit code.
pub async fn run(cli: &Cli) -> Result<()> {
    let config = Config::resolve(cli.config.as_deref())?;
    let pretty = cli.pretty;

    match &cli.command {
        Commands::Cache(cmd) => cache::execute(cmd, &config, pretty),
        Commands::Lookup(args) => research::lookup(&ResilientClient::new(&config)?, args, pretty).await,
        Commands::Citing(args) => research::citing(&ResilientClient::new(&config)?, args, pretty).await,
        Commands::Search(args) => research::search(&ResilientClient::new(&config)?, args, pretty).await,
        Commands::Opinion(args) => research::opinion(&ResilientClient::new(&config)?, args, pretty).await,
    }
}
