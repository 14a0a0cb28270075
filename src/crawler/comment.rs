//! Bilibili comment API client
//!
//! This module handles fetching one page of a comment thread (`x/v2/reply`)
//! and resolving video metadata (`x/web-interface/view`), and translating
//! transport and API failures into a [`FetchOutcome`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::crawler::fetcher::BiliFetcher;
use crate::crawler::url::VideoRef;
use crate::models::{CommentNode, CommentPage, Credential, ResourceInfo, SortOrder};
use crate::utils::error::FetchError;

// ============================================================================
// API Endpoints
// ============================================================================

/// Bilibili API endpoints and constants
pub mod api {
    /// Paginated reply list
    pub const REPLY_PATH: &str = "/x/v2/reply";

    /// Video metadata
    pub const VIEW_PATH: &str = "/x/web-interface/view";

    /// `type` of a video comment thread
    pub const VIDEO_TYPE: u32 = 1;

    /// Top-level comments per page
    pub const PAGE_SIZE: u32 = 20;

    /// API codes meaning the resource or its thread is gone:
    /// -404 nothing here, 12002 comments closed, 12061 closed by uploader,
    /// 62002 video invisible, 62004 video under review
    pub const NOT_FOUND_CODES: &[i64] = &[-404, 12002, 12061, 62002, 62004];
}

// ============================================================================
// API Response Structures
// ============================================================================

/// `data` of a reply list response
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ReplyData {
    /// Pagination info
    #[serde(default)]
    pub page: Option<ReplyPageInfo>,

    /// Top-level replies; `null` past the last page
    #[serde(default)]
    pub replies: Option<Vec<RawReply>>,
}

/// Pagination info of a reply list
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ReplyPageInfo {
    /// Current page number
    #[serde(default)]
    pub num: u32,

    /// Page size
    #[serde(default)]
    pub size: u32,

    /// Top-level comment count
    #[serde(default)]
    pub count: u64,

    /// Count including nested replies
    #[serde(default)]
    pub acount: u64,
}

/// Raw reply as returned by the API
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawReply {
    #[serde(default)]
    pub rpid: i64,

    #[serde(default)]
    pub rpid_str: String,

    /// Creation time (seconds)
    #[serde(default)]
    pub ctime: i64,

    #[serde(default)]
    pub like: i64,

    /// Nested reply count
    #[serde(default)]
    pub count: i64,

    /// Floor number; only present on older threads
    #[serde(default)]
    pub floor: Option<u64>,

    #[serde(default)]
    pub member: RawMember,

    #[serde(default)]
    pub content: RawContent,

    /// Preview of nested replies (truncated by the API)
    #[serde(default)]
    pub replies: Option<Vec<RawReply>>,
}

/// Reply author
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawMember {
    #[serde(default)]
    pub uname: String,

    #[serde(default)]
    pub sex: Option<String>,

    #[serde(default)]
    pub level_info: Option<RawLevelInfo>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawLevelInfo {
    #[serde(default)]
    pub current_level: u8,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawContent {
    #[serde(default)]
    pub message: String,
}

/// `data` of a video view response
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ViewData {
    pub aid: u64,

    #[serde(default)]
    pub bvid: String,

    #[serde(default)]
    pub title: String,
}

// ============================================================================
// Conversion
// ============================================================================

/// Convert a raw reply (and its preview replies) to a [`CommentNode`]
pub fn convert_reply(raw: &RawReply) -> CommentNode {
    let id = if raw.rpid_str.is_empty() {
        raw.rpid.to_string()
    } else {
        raw.rpid_str.clone()
    };

    CommentNode {
        id,
        author: raw.member.uname.clone(),
        author_sex: raw.member.sex.clone().filter(|s| !s.is_empty()),
        author_level: raw.member.level_info.as_ref().map(|l| l.current_level),
        message: raw.content.message.clone(),
        likes: raw.like.max(0) as u64,
        ctime: raw.ctime,
        reply_count: raw.count.max(0) as u64,
        floor: raw.floor,
        replies: raw
            .replies
            .as_deref()
            .unwrap_or_default()
            .iter()
            .map(convert_reply)
            .collect(),
    }
}

/// Convert a reply list response into a [`CommentPage`]
pub fn convert_page(number: u32, data: &ReplyData) -> CommentPage {
    let total_count = data.page.as_ref().map(|p| p.count).unwrap_or(0);
    let comments = data
        .replies
        .as_deref()
        .unwrap_or_default()
        .iter()
        .map(convert_reply)
        .collect();

    CommentPage {
        number,
        total_count,
        comments,
    }
}

/// Map a non-zero API code to an error
fn api_error(code: i64, message: String, context: &str) -> FetchError {
    if api::NOT_FOUND_CODES.contains(&code) {
        FetchError::NotFound(format!("{context}: {message} ({code})"))
    } else {
        FetchError::Api { code, message }
    }
}

// ============================================================================
// Collaborator Traits
// ============================================================================

/// Result of fetching one comment page
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// Page with at least one comment
    Success(CommentPage),
    /// Valid response without comments; no more pages past this one
    EmptyButValid(CommentPage),
    /// Page lost; the collection continues without it
    TransientFailure(String),
    /// Resource is gone; pagination must stop
    Fatal(String),
}

impl FetchOutcome {
    /// The fetched page, if the call succeeded
    pub fn page(&self) -> Option<&CommentPage> {
        match self {
            Self::Success(page) | Self::EmptyButValid(page) => Some(page),
            Self::TransientFailure(_) | Self::Fatal(_) => None,
        }
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Fatal(_))
    }
}

impl From<Result<CommentPage, FetchError>> for FetchOutcome {
    fn from(result: Result<CommentPage, FetchError>) -> Self {
        match result {
            Ok(page) if page.is_empty() => Self::EmptyButValid(page),
            Ok(page) => Self::Success(page),
            Err(e) if e.is_not_found() => Self::Fatal(e.to_string()),
            Err(e) => Self::TransientFailure(e.to_string()),
        }
    }
}

/// Fetches one page of a comment thread
///
/// Implementations issue exactly one remote call and never retry.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch_page(
        &self,
        resource_id: u64,
        page: u32,
        credential: Option<&Credential>,
    ) -> FetchOutcome;
}

/// Resolves a user-facing video reference to its internal id and title
#[async_trait]
pub trait ResourceResolver: Send + Sync {
    async fn resolve(
        &self,
        video: &VideoRef,
        credential: Option<&Credential>,
    ) -> Result<ResourceInfo, FetchError>;
}

// ============================================================================
// Comment API Client
// ============================================================================

/// Comment API client
pub struct CommentClient {
    fetcher: BiliFetcher,
    sort: SortOrder,
    page_size: u32,
}

impl CommentClient {
    /// Create a video comment client over an existing fetcher
    pub fn new(fetcher: BiliFetcher) -> Self {
        Self {
            fetcher,
            sort: SortOrder::default(),
            page_size: api::PAGE_SIZE,
        }
    }

    /// Create from configuration
    pub fn from_config(config: &Config) -> Result<Self, FetchError> {
        let fetcher = BiliFetcher::from_config(config)?;
        Ok(Self::new(fetcher)
            .with_sort(config.collector.sort)
            .with_page_size(config.collector.page_size))
    }

    pub fn with_sort(mut self, sort: SortOrder) -> Self {
        self.sort = sort;
        self
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Query parameters for one reply page
    pub fn reply_query(&self, resource_id: u64, page: u32) -> Vec<(&'static str, String)> {
        vec![
            ("type", api::VIDEO_TYPE.to_string()),
            ("oid", resource_id.to_string()),
            ("pn", page.to_string()),
            ("ps", self.page_size.to_string()),
            ("sort", self.sort.sort_code().to_string()),
        ]
    }

    /// Fetch and convert one reply page
    ///
    /// # Errors
    ///
    /// `FetchError::NotFound` when the thread is gone, any other variant for
    /// transport or API trouble
    pub async fn fetch_reply_page(
        &self,
        resource_id: u64,
        page: u32,
        credential: Option<&Credential>,
    ) -> Result<CommentPage, FetchError> {
        let query = self.reply_query(resource_id, page);
        let envelope = self
            .fetcher
            .get_json::<ReplyData>(api::REPLY_PATH, &query, credential)
            .await?;

        if envelope.code != 0 {
            return Err(api_error(
                envelope.code,
                envelope.message,
                &format!("comments of {resource_id}"),
            ));
        }

        let data = envelope.data.unwrap_or_default();
        Ok(convert_page(page, &data))
    }
}

#[async_trait]
impl PageFetcher for CommentClient {
    async fn fetch_page(
        &self,
        resource_id: u64,
        page: u32,
        credential: Option<&Credential>,
    ) -> FetchOutcome {
        if page == 0 {
            return FetchOutcome::Fatal("page numbers start at 1".to_string());
        }

        let outcome = FetchOutcome::from(self.fetch_reply_page(resource_id, page, credential).await);

        if let Some(fetched) = outcome.page() {
            tracing::debug!(
                resource_id,
                page,
                comments = fetched.comments.len(),
                total_count = fetched.total_count,
                "Fetched comment page"
            );
        } else if let FetchOutcome::TransientFailure(reason) | FetchOutcome::Fatal(reason) = &outcome {
            tracing::debug!(resource_id, page, error = %reason, "Comment page failed");
        }

        outcome
    }
}

#[async_trait]
impl ResourceResolver for CommentClient {
    async fn resolve(
        &self,
        video: &VideoRef,
        credential: Option<&Credential>,
    ) -> Result<ResourceInfo, FetchError> {
        let query = [video.query_pair()];
        let envelope = self
            .fetcher
            .get_json::<ViewData>(api::VIEW_PATH, &query, credential)
            .await?;

        if envelope.code != 0 {
            return Err(api_error(envelope.code, envelope.message, &video.to_string()));
        }

        let data = envelope
            .data
            .ok_or_else(|| FetchError::Decode(format!("video info for {video} has no data")))?;

        tracing::debug!(aid = data.aid, bvid = %data.bvid, "Resolved video");

        Ok(ResourceInfo {
            id: data.aid,
            bvid: data.bvid,
            title: data.title,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    const PAGE_JSON: &str = r#"{
        "code": 0,
        "message": "0",
        "ttl": 1,
        "data": {
            "page": {"num": 1, "size": 20, "count": 41, "acount": 97},
            "replies": [
                {
                    "rpid": 1001,
                    "rpid_str": "1001",
                    "ctime": 1700000000,
                    "like": 12,
                    "count": 2,
                    "member": {"uname": "alice", "sex": "女", "level_info": {"current_level": 5}},
                    "content": {"message": "first!"},
                    "replies": [
                        {
                            "rpid": 1002,
                            "rpid_str": "1002",
                            "ctime": 1700000100,
                            "like": 1,
                            "count": 0,
                            "member": {"uname": "bob", "sex": "保密", "level_info": {"current_level": 3}},
                            "content": {"message": "reply"},
                            "replies": null
                        }
                    ]
                },
                {
                    "rpid": 1003,
                    "ctime": 1700000200,
                    "like": -1,
                    "member": {"uname": "carol"},
                    "content": {"message": "no replies"},
                    "replies": null
                }
            ]
        }
    }"#;

    #[test]
    fn test_deserialize_reply_page() {
        let envelope: crate::crawler::fetcher::ApiEnvelope<ReplyData> =
            serde_json::from_str(PAGE_JSON).unwrap();
        assert_eq!(envelope.code, 0);

        let page = convert_page(1, &envelope.data.unwrap());
        assert_eq!(page.number, 1);
        assert_eq!(page.total_count, 41);
        assert_eq!(page.comments.len(), 2);

        let first = &page.comments[0];
        assert_eq!(first.id, "1001");
        assert_eq!(first.author, "alice");
        assert_eq!(first.author_level, Some(5));
        assert_eq!(first.reply_count, 2);
        assert_eq!(first.replies.len(), 1);
        assert_eq!(first.replies[0].author, "bob");
    }

    #[test]
    fn test_convert_reply_fallbacks() {
        let raw = RawReply {
            rpid: 77,
            like: -5,
            count: -1,
            member: RawMember {
                uname: "dave".to_string(),
                sex: Some(String::new()),
                level_info: None,
            },
            ..Default::default()
        };

        let node = convert_reply(&raw);
        assert_eq!(node.id, "77");
        assert_eq!(node.likes, 0);
        assert_eq!(node.reply_count, 0);
        assert_eq!(node.author_sex, None);
        assert_eq!(node.author_level, None);
        assert!(node.replies.is_empty());
    }

    #[test]
    fn test_convert_page_past_the_end() {
        let data = ReplyData {
            page: Some(ReplyPageInfo {
                num: 9,
                size: 20,
                count: 41,
                acount: 97,
            }),
            replies: None,
        };
        let page = convert_page(9, &data);
        assert!(page.is_empty());
        assert_eq!(page.total_count, 41);
    }

    #[test]
    fn test_outcome_classification() {
        let ok = FetchOutcome::from(Ok::<_, FetchError>(CommentPage {
            number: 1,
            total_count: 1,
            comments: vec![CommentNode::default()],
        }));
        assert!(matches!(ok, FetchOutcome::Success(_)));

        let empty = FetchOutcome::from(Ok::<_, FetchError>(CommentPage::empty(3, 0)));
        assert!(matches!(empty, FetchOutcome::EmptyButValid(_)));
        assert!(empty.page().is_some());

        let fatal = FetchOutcome::from(Err::<CommentPage, _>(api_error(-404, "啥都木有".to_string(), "av1")));
        assert!(fatal.is_fatal());

        let transient = FetchOutcome::from(Err::<CommentPage, _>(api_error(-412, "请求被拦截".to_string(), "av1")));
        assert!(matches!(transient, FetchOutcome::TransientFailure(_)));

        let timeout = FetchOutcome::from(Err::<CommentPage, _>(FetchError::Timeout));
        assert!(matches!(timeout, FetchOutcome::TransientFailure(_)));
    }

    #[test]
    fn test_reply_query() {
        let fetcher = BiliFetcher::new(Duration::from_secs(10)).unwrap();
        let client = CommentClient::new(fetcher).with_sort(SortOrder::Likes);

        let query = client.reply_query(170001, 3);
        assert!(query.contains(&("type", "1".to_string())));
        assert!(query.contains(&("oid", "170001".to_string())));
        assert!(query.contains(&("pn", "3".to_string())));
        assert!(query.contains(&("ps", "20".to_string())));
        assert!(query.contains(&("sort", "1".to_string())));
    }

    #[tokio::test]
    async fn test_page_zero_is_rejected_without_request() {
        let fetcher =
            BiliFetcher::with_base_url("http://127.0.0.1:9", Duration::from_millis(100)).unwrap();
        let client = CommentClient::new(fetcher);

        let outcome = client.fetch_page(1, 0, None).await;
        assert!(outcome.is_fatal());
    }
}
