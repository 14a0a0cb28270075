//! Video identifier extraction
//!
//! Accepts what a user pastes: a bare `BV…` id, an `av…` id, or a full video
//! URL containing either. Short links (`b23.tv`) need a redirect and are not
//! handled here.

use regex::Regex;
use std::fmt;
use std::sync::LazyLock;
use url::Url;

use crate::utils::error::ParseError;

/// BV ids are "BV" followed by exactly ten base58-ish characters
static BVID_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(BV[a-zA-Z0-9]{10})").unwrap());

static AID_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(?:^|[^a-z0-9])av(\d+)").unwrap());

/// Reference to a video as given by the user
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum VideoRef {
    Bvid(String),
    Aid(u64),
}

impl VideoRef {
    /// Parse a user-supplied identifier
    ///
    /// # Example
    /// ```
    /// use bili_comments::crawler::url::VideoRef;
    ///
    /// let video = VideoRef::parse("https://www.bilibili.com/video/BV1GJ411x7h7/?p=1").unwrap();
    /// assert_eq!(video, VideoRef::Bvid("BV1GJ411x7h7".to_string()));
    /// ```
    pub fn parse(input: &str) -> Result<Self, ParseError> {
        let trimmed = input.trim();

        if let Some(captures) = BVID_REGEX.captures(trimmed) {
            if let Some(m) = captures.get(1) {
                return Ok(Self::Bvid(m.as_str().to_string()));
            }
        }

        // `?aid=` on player and embed URLs
        if let Ok(parsed) = Url::parse(trimmed) {
            let aid = parsed
                .query_pairs()
                .filter(|(key, _)| key == "aid" || key == "oid")
                .find_map(|(_, value)| value.parse::<u64>().ok());
            if let Some(aid) = aid {
                return Ok(Self::Aid(aid));
            }
        }

        if let Some(captures) = AID_REGEX.captures(trimmed) {
            if let Some(aid) = captures.get(1).and_then(|m| m.as_str().parse::<u64>().ok()) {
                return Ok(Self::Aid(aid));
            }
        }

        Err(ParseError::InvalidIdentifier(trimmed.to_string()))
    }

    /// Query parameter pair for the video info endpoint
    pub fn query_pair(&self) -> (&'static str, String) {
        match self {
            Self::Bvid(bvid) => ("bvid", bvid.clone()),
            Self::Aid(aid) => ("aid", aid.to_string()),
        }
    }
}

impl fmt::Display for VideoRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bvid(bvid) => write!(f, "{bvid}"),
            Self::Aid(aid) => write!(f, "av{aid}"),
        }
    }
}
