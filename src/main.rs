//! lra - Legal Research Assistant
//!
//! CLI entry point.

#![forbid(unsafe_code)]
#![warn(clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

use clap::Parser;
use std::process::ExitCode;

use lra::cli::output::{render_error_json, render_error_text};
use lra::cli::{Cli, ErrorFormat};
use lra::core::logging::{self, LogLevel, LogSettings};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let log_level = cli.log_level.as_deref().and_then(LogLevel::from_arg);
    logging::init(&LogSettings::resolve(log_level, cli.json_output, cli.verbose));

    match lra::cli::run(&cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error_code = e.error_code(), "{e}");
            let rendered = match cli.error_format {
                ErrorFormat::Json => render_error_json(&e, cli.pretty),
                ErrorFormat::Text => render_error_text(&e),
            };
            eprintln!("{rendered}");
            ExitCode::from(e.exit_code() as u8)
        }
    }
}
