//! bili-comments - Bilibili video comment collector
//!
//! Collects the comment thread of a Bilibili video with bounded, paced
//! concurrency and returns it as an ordered flat list of records.
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - [`config`] - Configuration management and settings
//! - [`crawler`] - Comment fetching, pagination planning and orchestration
//! - [`models`] - Core data structures and types
//! - [`storage`] - JSON output of collected reports
//! - [`error`] - Unified error type and classification
//! - [`utils`] - Domain errors and small helpers
//!
//! # Example
//!
//! ```no_run
//! use bili_comments::config::Config;
//! use bili_comments::crawler::{collector_from_config, NoProgress, PageMode};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env()?;
//!     let collector = collector_from_config(&config)?;
//!     let report = collector
//!         .collect("BV1xx411c7mD", PageMode::Bounded(3), None, &NoProgress)
//!         .await?;
//!     println!("{} comments", report.len());
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod crawler;
pub mod error;
pub mod models;
pub mod storage;
pub mod utils;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::Config;
    pub use crate::crawler::{
        CollectStats, CollectionReport, CommentClient, CommentCollector, PageMode,
        ProgressReporter, VideoRef,
    };
    pub use crate::error::{Error, ErrorCategory, ErrorClassify, Result};
    pub use crate::models::{CommentRecord, Credential, Progress, SortOrder};
    pub use crate::storage::JsonWriter;
}

// Direct re-exports for convenience
pub use models::{CommentRecord, Progress};
