//! Comment collection orchestrator
//!
//! Fetches page 1, plans the page range from its total count, fans the
//! remaining pages out through the [`ConcurrencyGate`], flattens every page
//! and concatenates the records by page number.
//!
//! # Flow
//!
//! ```text
//! Init ─▶ FetchingFirstPage ─▶ Planning ─▶ FanningOut ─▶ Aggregating ─▶ Done
//!                │
//!                └──▶ Failed (page 1 fatal or lost)
//! ```
//!
//! Once page 1 succeeds the run always reaches `Done`; later page failures
//! are recorded in [`CollectStats`] and the page is dropped.

use futures::stream::{FuturesUnordered, StreamExt};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use tracing::{debug, info, warn};

use crate::crawler::comment::{api, FetchOutcome, PageFetcher, ResourceResolver};
use crate::crawler::flatten::flatten_page;
use crate::crawler::gate::ConcurrencyGate;
use crate::crawler::planner::{PageMode, PaginationPlan};
use crate::crawler::url::VideoRef;
use crate::models::{CommentRecord, Credential, Progress, ResourceInfo};
use crate::utils::error::CollectError;

// ============================================================================
// Progress
// ============================================================================

/// Receives progress updates; called from a single task, one update at a time
pub trait ProgressReporter: Send + Sync {
    fn report(&self, progress: &Progress);
}

impl<F> ProgressReporter for F
where
    F: Fn(&Progress) + Send + Sync,
{
    fn report(&self, progress: &Progress) {
        self(progress)
    }
}

/// Reporter that discards updates
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressReporter for NoProgress {
    fn report(&self, _progress: &Progress) {}
}

// ============================================================================
// State and Results
// ============================================================================

/// Collector lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CollectorState {
    Init,
    FetchingFirstPage,
    Planning,
    FanningOut,
    Aggregating,
    Done,
    Failed,
}

impl fmt::Display for CollectorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Init => "init",
            Self::FetchingFirstPage => "fetching_first_page",
            Self::Planning => "planning",
            Self::FanningOut => "fanning_out",
            Self::Aggregating => "aggregating",
            Self::Done => "done",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Per-page bookkeeping of one collection
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectStats {
    /// Pages that returned comments
    pub succeeded_pages: Vec<u32>,

    /// Pages that returned a valid but empty list
    pub empty_pages: Vec<u32>,

    /// Pages lost to transient or fatal errors
    pub failed_pages: Vec<u32>,

    /// Pages never requested because an earlier result ended pagination
    pub skipped_pages: Vec<u32>,

    /// The thread became unavailable during fan-out
    pub halted: bool,

    /// Top-level comments collected
    pub top_level: usize,

    /// Nested replies collected
    pub nested_replies: usize,
}

impl CollectStats {
    /// Whether every planned page was either fetched or known to lie past the end
    pub fn is_complete(&self) -> bool {
        self.failed_pages.is_empty() && !self.halted
    }

    /// Pages that answered with a valid response
    pub fn pages_fetched(&self) -> usize {
        self.succeeded_pages.len() + self.empty_pages.len()
    }

    fn sort(&mut self) {
        self.succeeded_pages.sort_unstable();
        self.empty_pages.sort_unstable();
        self.failed_pages.sort_unstable();
        self.skipped_pages.sort_unstable();
    }
}

/// Result of a finished collection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionReport {
    /// Video title
    pub title: String,

    /// Internal id (aid)
    pub resource_id: u64,

    pub bvid: String,

    pub plan: PaginationPlan,

    /// Records in page order
    pub records: Vec<CommentRecord>,

    pub stats: CollectStats,
}

impl CollectionReport {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Mean author level over the records that carry one
    pub fn average_author_level(&self) -> Option<f64> {
        let levels: Vec<f64> = self
            .records
            .iter()
            .filter_map(|r| r.author_level)
            .map(f64::from)
            .collect();

        if levels.is_empty() {
            return None;
        }
        Some(levels.iter().sum::<f64>() / levels.len() as f64)
    }
}

/// Outcome of one fan-out slot
enum PageResult {
    Fetched(FetchOutcome),
    Skipped,
}

// ============================================================================
// Collector
// ============================================================================

/// Comment collection orchestrator
pub struct CommentCollector<C> {
    client: C,
    gate: ConcurrencyGate,
    page_size: u32,
}

impl<C> CommentCollector<C> {
    /// Create a collector over a comment client and a gate
    pub fn new(client: C, gate: ConcurrencyGate) -> Self {
        Self {
            client,
            gate,
            page_size: api::PAGE_SIZE,
        }
    }

    /// Override the page size used for planning
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn gate(&self) -> &ConcurrencyGate {
        &self.gate
    }
}

impl<C> CommentCollector<C>
where
    C: PageFetcher + ResourceResolver,
{
    /// Resolve `identifier` (URL, BV id or av id) and collect its comments
    ///
    /// # Errors
    ///
    /// - `CollectError::InvalidIdentifier` when no id can be found in the input
    /// - `CollectError::ResourceNotFound` when the video or its thread is gone
    /// - `CollectError::Resolve` when the metadata lookup fails otherwise
    /// - `CollectError::FirstPage` when page 1 cannot be fetched
    pub async fn collect(
        &self,
        identifier: &str,
        mode: PageMode,
        credential: Option<&Credential>,
        progress: &dyn ProgressReporter,
    ) -> Result<CollectionReport, CollectError> {
        let video = VideoRef::parse(identifier)?;

        let resource = self
            .client
            .resolve(&video, credential)
            .await
            .map_err(|e| {
                if e.is_not_found() {
                    CollectError::ResourceNotFound(e.to_string())
                } else {
                    CollectError::Resolve(e)
                }
            })?;

        info!(
            video = %video,
            aid = resource.id,
            title = %resource.title,
            "Resolved video"
        );

        self.collect_resource(&resource, mode, credential, progress)
            .await
    }
}

impl<C> CommentCollector<C>
where
    C: PageFetcher,
{
    /// Collect the comments of an already resolved resource
    ///
    /// # Errors
    ///
    /// Only page 1 can fail the collection: `CollectError::ResourceNotFound`
    /// on a fatal outcome, `CollectError::FirstPage` on a transient one.
    pub async fn collect_resource(
        &self,
        resource: &ResourceInfo,
        mode: PageMode,
        credential: Option<&Credential>,
        progress: &dyn ProgressReporter,
    ) -> Result<CollectionReport, CollectError> {
        let resource_id = resource.id;
        let mut state = CollectorState::Init;

        // Page 1 is fetched alone; planning needs its total count
        enter(&mut state, CollectorState::FetchingFirstPage, resource_id);
        let first = self
            .gate
            .run(move || self.client.fetch_page(resource_id, 1, credential))
            .await
            .unwrap_or_else(|e| FetchOutcome::TransientFailure(e.to_string()));

        let first_page = match first {
            FetchOutcome::Success(page) | FetchOutcome::EmptyButValid(page) => page,
            FetchOutcome::Fatal(reason) => {
                enter(&mut state, CollectorState::Failed, resource_id);
                warn!(resource_id, error = %reason, "Comment thread not found");
                return Err(CollectError::ResourceNotFound(reason));
            }
            FetchOutcome::TransientFailure(reason) => {
                enter(&mut state, CollectorState::Failed, resource_id);
                warn!(resource_id, error = %reason, "First comment page failed");
                return Err(CollectError::FirstPage(reason));
            }
        };

        enter(&mut state, CollectorState::Planning, resource_id);
        let plan = PaginationPlan::plan(&first_page, mode, self.page_size);
        let denominator = plan.progress_denominator();
        info!(
            resource_id,
            total_count = plan.total_count,
            available_pages = plan.available_pages,
            target_pages = plan.target_pages,
            fan_out = plan.fan_out_len(),
            "Planned comment pages"
        );

        enter(&mut state, CollectorState::FanningOut, resource_id);
        let mut stats = CollectStats::default();
        let mut pages: BTreeMap<u32, Vec<CommentRecord>> = BTreeMap::new();

        if first_page.is_empty() {
            stats.empty_pages.push(1);
        } else {
            stats.succeeded_pages.push(1);
        }
        let first_records = flatten_page(&first_page);
        let mut completed: u32 = 1;
        progress.report(&Progress {
            completed,
            target: denominator,
            message: format!("page 1: {} comments", first_page.comments.len()),
        });
        pages.insert(1, first_records);

        // Pages above this number are not requested any more
        let boundary = AtomicU32::new(u32::MAX);
        let boundary = &boundary;

        let mut in_flight: FuturesUnordered<_> = plan
            .fan_out_pages()
            .map(move |page| async move {
                let result = self
                    .gate
                    .run_if(
                        move || page <= boundary.load(Ordering::Acquire),
                        move || self.client.fetch_page(resource_id, page, credential),
                    )
                    .await;

                let result = match result {
                    Ok(Some(outcome)) => PageResult::Fetched(outcome),
                    Ok(None) => PageResult::Skipped,
                    Err(e) => PageResult::Fetched(FetchOutcome::TransientFailure(e.to_string())),
                };
                (page, result)
            })
            .collect();

        // Completions arrive here one at a time in arbitrary order
        while let Some((page, result)) = in_flight.next().await {
            completed += 1;

            let message = match result {
                PageResult::Fetched(FetchOutcome::Success(fetched)) => {
                    stats.succeeded_pages.push(page);
                    let message = format!("page {page}: {} comments", fetched.comments.len());
                    pages.insert(page, flatten_page(&fetched));
                    message
                }
                PageResult::Fetched(FetchOutcome::EmptyButValid(_)) => {
                    debug!(resource_id, page, "Reached end of comments before plan");
                    stats.empty_pages.push(page);
                    boundary.fetch_min(page, Ordering::AcqRel);
                    format!("page {page}: empty")
                }
                PageResult::Fetched(FetchOutcome::TransientFailure(reason)) => {
                    warn!(resource_id, page, error = %reason, "Dropping comment page");
                    stats.failed_pages.push(page);
                    format!("page {page}: failed ({reason})")
                }
                PageResult::Fetched(FetchOutcome::Fatal(reason)) => {
                    warn!(resource_id, page, error = %reason, "Comment thread became unavailable");
                    stats.failed_pages.push(page);
                    stats.halted = true;
                    boundary.store(0, Ordering::Release);
                    format!("page {page}: unavailable ({reason})")
                }
                PageResult::Skipped => {
                    stats.skipped_pages.push(page);
                    format!("page {page}: skipped")
                }
            };

            progress.report(&Progress {
                completed,
                target: denominator,
                message,
            });
        }

        enter(&mut state, CollectorState::Aggregating, resource_id);
        let records: Vec<CommentRecord> = pages.into_values().flatten().collect();
        stats.nested_replies = records.iter().filter(|r| r.is_nested_reply).count();
        stats.top_level = records.len() - stats.nested_replies;
        stats.sort();

        enter(&mut state, CollectorState::Done, resource_id);
        info!(
            resource_id,
            records = records.len(),
            pages_fetched = stats.pages_fetched(),
            failed_pages = stats.failed_pages.len(),
            skipped_pages = stats.skipped_pages.len(),
            "Collected comments"
        );

        Ok(CollectionReport {
            title: resource.title.clone(),
            resource_id,
            bvid: resource.bvid.clone(),
            plan,
            records,
            stats,
        })
    }
}

fn enter(state: &mut CollectorState, next: CollectorState, resource_id: u64) {
    debug!(resource_id, from = %state, to = %next, "Collector state change");
    *state = next;
}
