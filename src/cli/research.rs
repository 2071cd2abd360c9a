//! Commands that query CourtListener: `lookup`, `citing`, `search`, `opinion`.

use futures::future::join_all;
use serde_json::json;

use crate::cli::args::{CitingArgs, LookupArgs, OpinionArgs, SearchArgs};
use crate::cli::output::print_json;
use crate::core::client::ResilientClient;
use crate::error::Result;

/// Resolve every citation concurrently and print them in argument order.
pub async fn lookup(client: &ResilientClient, args: &LookupArgs, pretty: bool) -> Result<()> {
    tracing::debug!(count = args.citations.len(), "Looking up citations");
    let lookups = join_all(args.citations.iter().map(|c| client.lookup_citation(c)))
        .await
        .into_iter()
        .collect::<Result<Vec<_>>>()?;
    print_json(&lookups, pretty)
}

/// Print citing cases with their confidence bookkeeping.
pub async fn citing(client: &ResilientClient, args: &CitingArgs, pretty: bool) -> Result<()> {
    let result = client.find_citing_cases(&args.citation, args.limit).await?;
    if result.incomplete {
        tracing::warn!(
            failed = result.failed_attempts.len(),
            confidence = result.confidence,
            "Citing case results are incomplete"
        );
    }
    print_json(&result, pretty)
}

/// Print one page of search results.
pub async fn search(client: &ResilientClient, args: &SearchArgs, pretty: bool) -> Result<()> {
    let response = client.search_opinions(&args.to_params()).await?;
    print_json(&response, pretty)
}

/// Print an opinion's metadata, or its text wrapped in a small object.
pub async fn opinion(client: &ResilientClient, args: &OpinionArgs, pretty: bool) -> Result<()> {
    if args.text {
        let text = client.get_opinion_full_text(args.id).await?;
        print_json(&json!({ "opinion_id": args.id, "text": text }), pretty)
    } else {
        let opinion = client.get_opinion(args.id).await?;
        print_json(&opinion, pretty)
    }
}
