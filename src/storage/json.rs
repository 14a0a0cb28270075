//! JSON file storage for collection reports
//!
//! Writes a whole [`CollectionReport`] as pretty JSON, or only its records as
//! JSON lines for downstream tabular exporters.

use serde::Serialize;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::crawler::collector::CollectionReport;
use crate::error::Result;
use crate::models::CommentRecord;

/// Output layout
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// One pretty-printed report document
    #[default]
    Report,
    /// One record per line
    JsonLines,
}

impl OutputFormat {
    /// Guess from a file extension (`.jsonl` / `.ndjson` mean JSON lines)
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("jsonl") | Some("ndjson") => Self::JsonLines,
            _ => Self::Report,
        }
    }
}

/// A record flattened for export, with the display time already rendered
#[derive(Debug, Serialize)]
struct ExportRecord<'a> {
    comment_id: &'a str,
    author: &'a str,
    author_sex: Option<&'a str>,
    author_level: Option<u8>,
    content: &'a str,
    likes: u64,
    posted_at: String,
    reply_count: u64,
    floor: Option<u64>,
    is_nested_reply: bool,
}

impl<'a> From<&'a CommentRecord> for ExportRecord<'a> {
    fn from(record: &'a CommentRecord) -> Self {
        Self {
            comment_id: &record.comment_id,
            author: &record.author,
            author_sex: record.author_sex.as_deref(),
            author_level: record.author_level,
            content: &record.content,
            likes: record.likes,
            posted_at: record.formatted_time(),
            reply_count: record.reply_count,
            floor: record.floor,
            is_nested_reply: record.is_nested_reply,
        }
    }
}

/// Report writer
pub struct JsonWriter {
    path: PathBuf,
    format: OutputFormat,
}

impl JsonWriter {
    /// Create a writer for `path`, choosing the format from its extension
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let format = OutputFormat::from_path(&path);
        Self { path, format }
    }

    pub fn with_format(mut self, format: OutputFormat) -> Self {
        self.format = format;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    /// Write the report, creating parent directories as needed
    ///
    /// Returns the number of records written.
    pub fn write(&self, report: &CollectionReport) -> Result<usize> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let mut out = BufWriter::new(File::create(&self.path)?);

        match self.format {
            OutputFormat::Report => {
                serde_json::to_writer_pretty(&mut out, report)?;
                writeln!(out)?;
            }
            OutputFormat::JsonLines => {
                for record in &report.records {
                    serde_json::to_writer(&mut out, &ExportRecord::from(record))?;
                    writeln!(out)?;
                }
            }
        }
        out.flush()?;

        tracing::info!(
            path = %self.path.display(),
            records = report.records.len(),
            "Saved comments"
        );

        Ok(report.records.len())
    }

    /// Read a report previously written in [`OutputFormat::Report`]
    pub fn read_report(path: &Path) -> Result<CollectionReport> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}
