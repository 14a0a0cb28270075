//! Storage layer for collected comments
//!
//! Collected reports are handed to external exporters as JSON files.

pub mod json;

pub use json::{JsonWriter, OutputFormat};
