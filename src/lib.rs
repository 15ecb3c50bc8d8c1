//! imgsearch - image similarity search from the terminal
//!
//! This library holds the search view and its connection to a remote image
//! similarity search service.
//!
//! # Modules
//!
//! - [`controller`] - View state and the submit-search operation
//! - [`client`] - HTTP client for the search service
//! - [`service`] - The trait the controller talks to
//! - [`model`] - Queries, results and request state
//! - [`preview`] - Self-releasing preview references for the selected image
//! - [`render`] - Text, JSON, compact and CSV output
//! - [`repl`] - Interactive search session
//! - [`error`] - Error taxonomy and CLI error formatting

pub mod cli;
pub mod client;
pub mod config;
pub mod controller;
pub mod error;
pub mod image;
pub mod logging;
pub mod model;
pub mod preview;
pub mod render;
pub mod repl;
pub mod service;

pub use cli::*;
pub use client::HttpSearchClient;
pub use config::{Config, DEFAULT_API_BASE};
pub use controller::{ControllerOptions, SearchController};
pub use error::{
    ImgSearchError, NO_IMAGE_MESSAGE, NO_RESPONSE_MESSAGE, Result, SearchError,
    VALID_METRICS, find_closest_match, format_error, format_unknown_value_error,
};
pub use image::ImageFile;
pub use model::*;
pub use service::{SearchRequest, SearchService};

/// Standard width for content dividers in CLI output
pub const CONTENT_DIVIDER_WIDTH: usize = 60;

const BYTES_PER_KB: u64 = 1024;
const BYTES_PER_MB: u64 = 1024 * 1024;
const BYTES_PER_GB: u64 = 1024 * 1024 * 1024;

/// Escape text for CSV by sanitizing newlines and quotes.
#[must_use]
pub fn csv_escape_text(text: &str) -> String {
    text.replace('"', "\"\"").replace(['\n', '\r'], " ")
}

/// Format bytes into a human-friendly string.
#[must_use]
pub fn format_bytes(bytes: u64) -> String {
    if bytes < BYTES_PER_KB {
        format!("{bytes} B")
    } else if bytes < BYTES_PER_MB {
        format_bytes_with_unit(bytes, BYTES_PER_KB, "KB")
    } else if bytes < BYTES_PER_GB {
        format_bytes_with_unit(bytes, BYTES_PER_MB, "MB")
    } else {
        format_bytes_with_unit(bytes, BYTES_PER_GB, "GB")
    }
}

fn format_bytes_with_unit(bytes: u64, unit: u64, suffix: &str) -> String {
    let whole = bytes / unit;
    let tenths = (bytes % unit) * 10 / unit;
    format!("{whole}.{tenths} {suffix}")
}
