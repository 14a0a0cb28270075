// Core data structures for the comment collector

use chrono::{DateTime, Local, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Fixed display format for comment timestamps
pub const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Marker prepended to nested reply bodies so a flat table keeps the hierarchy
pub const NESTED_REPLY_MARKER: &str = "[楼中楼] ";

/// One displayable comment or nested reply
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentRecord {
    pub comment_id: String, // rpid_str
    pub author: String,
    pub author_sex: Option<String>,
    pub author_level: Option<u8>,
    pub content: String,
    pub likes: u64,
    pub posted_at: DateTime<Utc>,
    /// Always 0 for nested replies
    pub reply_count: u64,
    pub floor: Option<u64>,
    pub is_nested_reply: bool,
}

impl CommentRecord {
    /// Render the post time in the given timezone
    pub fn formatted_time_in<Tz>(&self, tz: &Tz) -> String
    where
        Tz: TimeZone,
        Tz::Offset: fmt::Display,
    {
        self.posted_at.with_timezone(tz).format(TIME_FORMAT).to_string()
    }

    /// Render the post time in the local timezone
    pub fn formatted_time(&self) -> String {
        self.formatted_time_in(&Local)
    }
}

/// A comment node as returned by one page of the reply API
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentNode {
    pub id: String,
    pub author: String,
    pub author_sex: Option<String>,
    pub author_level: Option<u8>,
    pub message: String,
    pub likes: u64,
    /// Unix timestamp (seconds)
    pub ctime: i64,
    pub reply_count: u64,
    pub floor: Option<u64>,
    /// Preview of nested replies; the API truncates these and never nests deeper
    pub replies: Vec<CommentNode>,
}

/// One fetched page of top-level comments
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentPage {
    /// 1-based page number
    pub number: u32,
    /// Total top-level comment count reported by the API
    pub total_count: u64,
    pub comments: Vec<CommentNode>,
}

impl CommentPage {
    /// Create an empty page carrying only metadata
    pub fn empty(number: u32, total_count: u64) -> Self {
        Self {
            number,
            total_count,
            comments: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.comments.is_empty()
    }
}

/// Sort order of the reply API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Time = 0,
    Likes = 1,
    Replies = 2,
}

impl SortOrder {
    /// Value of the `sort` query parameter
    pub fn sort_code(&self) -> u32 {
        *self as u32
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Time => "time",
            Self::Likes => "likes",
            Self::Replies => "replies",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "time" | "new" => Some(Self::Time),
            "likes" | "like" | "hot" => Some(Self::Likes),
            "replies" | "reply" => Some(Self::Replies),
            _ => None,
        }
    }
}

/// Resolved video identity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceInfo {
    /// Internal id (aid) keying the comment thread
    pub id: u64,
    pub bvid: String,
    pub title: String,
}

/// Opaque login credential forwarded as cookies
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credential {
    pub sessdata: String,
    pub bili_jct: Option<String>,
    pub buvid3: Option<String>,
}

impl Credential {
    pub fn new(sessdata: impl Into<String>) -> Self {
        Self {
            sessdata: sessdata.into(),
            ..Default::default()
        }
    }

    /// Render as a `Cookie` header value
    pub fn cookie_header(&self) -> String {
        let mut cookie = format!("SESSDATA={}", self.sessdata);
        if let Some(jct) = &self.bili_jct {
            cookie.push_str(&format!("; bili_jct={jct}"));
        }
        if let Some(buvid3) = &self.buvid3 {
            cookie.push_str(&format!("; buvid3={buvid3}"));
        }
        cookie
    }
}

// Never print session tokens
impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("sessdata", &"***")
            .field("bili_jct", &self.bili_jct.as_ref().map(|_| "***"))
            .field("buvid3", &self.buvid3.as_ref().map(|_| "***"))
            .finish()
    }
}

/// Progress update emitted by the collector
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Progress {
    pub completed: u32,
    pub target: u32,
    pub message: String,
}

impl Progress {
    /// Completion ratio in `0.0..=1.0`
    pub fn ratio(&self) -> f64 {
        (self.completed as f64 / self.target.max(1) as f64).min(1.0)
    }

    pub fn is_finished(&self) -> bool {
        self.completed >= self.target
    }
}

impl fmt::Display for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}/{}] {}", self.completed, self.target, self.message)
    }
}
