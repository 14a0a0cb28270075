//! Comment crawling with bounded concurrency
//!
//! This module implements fetching a video's comment thread page by page,
//! fanning the pages out through a paced gate and flattening them into an
//! ordered record stream.

pub mod collector;
pub mod comment;
pub mod fetcher;
pub mod flatten;
pub mod gate;
pub mod planner;
pub mod url;

pub use collector::{
    CollectStats, CollectionReport, CollectorState, CommentCollector, NoProgress, ProgressReporter,
};
pub use comment::{CommentClient, FetchOutcome, PageFetcher, ResourceResolver};
pub use fetcher::BiliFetcher;
pub use flatten::flatten_page;
pub use gate::ConcurrencyGate;
pub use planner::{PageMode, PaginationPlan};
pub use url::VideoRef;

use crate::config::Config;
use crate::utils::error::FetchError;

/// Build a collector over the HTTP client from configuration
///
/// # Errors
///
/// Returns `FetchError::Http` if the HTTP client cannot be built
pub fn collector_from_config(config: &Config) -> Result<CommentCollector<CommentClient>, FetchError> {
    let client = CommentClient::from_config(config)?;
    let gate = ConcurrencyGate::from_config(config);

    tracing::debug!(
        max_in_flight = gate.max_in_flight(),
        pace_ms = gate.pace().as_millis() as u64,
        rate_limit = config.collector.rate_limit,
        "Created comment collector"
    );

    Ok(CommentCollector::new(client, gate).with_page_size(config.collector.page_size))
}
