//! Common test utilities

#![allow(dead_code)]

use async_trait::async_trait;
use bili_comments::crawler::{ConcurrencyGate, FetchOutcome, PageFetcher, ResourceResolver, VideoRef};
use bili_comments::models::{CommentNode, CommentPage, Credential, Progress, ResourceInfo};
use bili_comments::utils::error::FetchError;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Top-level comments placed on each scripted page
pub const COMMENTS_PER_PAGE: usize = 2;

/// Create a comment node with default values
pub fn comment_node(id: &str, replies: Vec<CommentNode>) -> CommentNode {
    CommentNode {
        id: id.to_string(),
        author: format!("user-{id}"),
        author_level: Some(4),
        message: format!("message {id}"),
        likes: 10,
        ctime: 1_700_000_000,
        reply_count: replies.len() as u64,
        replies,
        ..Default::default()
    }
}

/// Page with `COMMENTS_PER_PAGE` comments, each carrying one nested reply
///
/// Ids are `p{page}-c{i}` and `p{page}-c{i}-r0`.
pub fn scripted_page(number: u32, total_count: u64) -> CommentPage {
    let comments = (0..COMMENTS_PER_PAGE)
        .map(|i| {
            let id = format!("p{number}-c{i}");
            let reply = comment_node(&format!("{id}-r0"), vec![]);
            comment_node(&id, vec![reply])
        })
        .collect();

    CommentPage {
        number,
        total_count,
        comments,
    }
}

/// Record ids `scripted_page` produces for the given pages, in order
pub fn expected_ids(pages: impl IntoIterator<Item = u32>) -> Vec<String> {
    pages
        .into_iter()
        .flat_map(|p| {
            (0..COMMENTS_PER_PAGE)
                .flat_map(move |i| [format!("p{p}-c{i}"), format!("p{p}-c{i}-r0")])
        })
        .collect()
}

/// Gate with a tiny pace and a quota that never throttles tests
pub fn fast_gate(max_in_flight: usize) -> ConcurrencyGate {
    ConcurrencyGate::new(max_in_flight, Duration::from_millis(1), 10_000)
}

/// Scripted behaviour of one page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Script {
    Comments,
    Empty,
    Transient,
    Fatal,
}

/// In-memory fetcher answering from a per-page script
pub struct ScriptedFetcher {
    total_count: u64,
    scripts: HashMap<u32, Script>,
    delays: HashMap<u32, Duration>,
    default_delay: Duration,
    resource: Option<ResourceInfo>,
    calls: Mutex<Vec<u32>>,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl ScriptedFetcher {
    /// Every page returns comments; page 1 reports `total_count`
    pub fn new(total_count: u64) -> Self {
        Self {
            total_count,
            scripts: HashMap::new(),
            delays: HashMap::new(),
            default_delay: Duration::from_millis(1),
            resource: Some(ResourceInfo {
                id: 170_001,
                bvid: "BV17x411w7KC".to_string(),
                title: "scripted video".to_string(),
            }),
            calls: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }

    pub fn with_script(mut self, page: u32, script: Script) -> Self {
        self.scripts.insert(page, script);
        self
    }

    pub fn with_delay(mut self, page: u32, delay: Duration) -> Self {
        self.delays.insert(page, delay);
        self
    }

    pub fn with_default_delay(mut self, delay: Duration) -> Self {
        self.default_delay = delay;
        self
    }

    /// Resolution fails as not found
    pub fn without_resource(mut self) -> Self {
        self.resource = None;
        self
    }

    /// Pages requested, in call order
    pub fn calls(&self) -> Vec<u32> {
        self.calls.lock().unwrap().clone()
    }

    /// Highest number of simultaneous fetches observed
    pub fn peak_in_flight(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PageFetcher for ScriptedFetcher {
    async fn fetch_page(
        &self,
        _resource_id: u64,
        page: u32,
        _credential: Option<&Credential>,
    ) -> FetchOutcome {
        self.calls.lock().unwrap().push(page);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        let delay = self.delays.get(&page).copied().unwrap_or(self.default_delay);
        tokio::time::sleep(delay).await;

        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        match self.scripts.get(&page).copied().unwrap_or(Script::Comments) {
            Script::Comments => FetchOutcome::Success(scripted_page(page, self.total_count)),
            Script::Empty => FetchOutcome::EmptyButValid(CommentPage::empty(page, self.total_count)),
            Script::Transient => FetchOutcome::TransientFailure("HTTP 412".to_string()),
            Script::Fatal => FetchOutcome::Fatal("comments closed".to_string()),
        }
    }
}

#[async_trait]
impl ResourceResolver for ScriptedFetcher {
    async fn resolve(
        &self,
        video: &VideoRef,
        _credential: Option<&Credential>,
    ) -> Result<ResourceInfo, FetchError> {
        self.resource
            .clone()
            .ok_or_else(|| FetchError::NotFound(format!("{video} does not exist")))
    }
}

/// Progress reporter recording every update
#[derive(Default)]
pub struct RecordingProgress {
    updates: Mutex<Vec<Progress>>,
}

impl RecordingProgress {
    pub fn updates(&self) -> Vec<Progress> {
        self.updates.lock().unwrap().clone()
    }
}

impl bili_comments::crawler::ProgressReporter for RecordingProgress {
    fn report(&self, progress: &Progress) {
        self.updates.lock().unwrap().push(progress.clone());
    }
}

// ============================================================================
// API payloads
// ============================================================================

/// Raw reply JSON as the reply API returns it
pub fn raw_reply(rpid: u64, message: &str, replies: Vec<Value>) -> Value {
    json!({
        "rpid": rpid,
        "rpid_str": rpid.to_string(),
        "ctime": 1_700_000_000 + rpid,
        "like": rpid % 7,
        "count": replies.len(),
        "member": {
            "uname": format!("user{rpid}"),
            "sex": "保密",
            "level_info": { "current_level": 5 }
        },
        "content": { "message": message },
        "replies": replies
    })
}

/// Reply list envelope for one page with `ids` as top-level comments
pub fn reply_page_body(page: u32, total_count: u64, ids: &[u64]) -> Value {
    let replies: Vec<Value> = ids
        .iter()
        .map(|&id| {
            let nested = raw_reply(id * 100, &format!("reply to {id}"), vec![]);
            raw_reply(id, &format!("comment {id}"), vec![nested])
        })
        .collect();

    json!({
        "code": 0,
        "message": "0",
        "data": {
            "page": { "num": page, "size": 20, "count": total_count, "acount": total_count * 2 },
            "replies": replies
        }
    })
}

/// Envelope with a non-zero API code
pub fn api_error_body(code: i64, message: &str) -> Value {
    json!({ "code": code, "message": message, "data": null })
}

/// Video view envelope
pub fn view_body(aid: u64, bvid: &str, title: &str) -> Value {
    json!({
        "code": 0,
        "message": "0",
        "data": { "aid": aid, "bvid": bvid, "title": title }
    })
}
