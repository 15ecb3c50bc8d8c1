//! Custom error types for imgsearch.
//!
//! Two layers of errors live here:
//!
//! - [`SearchError`] is the taxonomy of failures a single search submission can
//!   end in. Every variant renders to the one message the view shows.
//! - [`ImgSearchError`] covers everything around it: loading images,
//!   configuration, and command-line input.

use std::path::PathBuf;
use thiserror::Error;

/// Message shown when a search is submitted without a selected image.
pub const NO_IMAGE_MESSAGE: &str = "Please choose an image first.";

/// Message shown when the request went out but no response came back.
pub const NO_RESPONSE_MESSAGE: &str = "Network Error (no response). Check CORS/URL/server.";

/// Outcome of a failed search submission.
///
/// The `Display` output of each variant is exactly the message surfaced to the
/// user, so callers can store `err.to_string()` directly.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SearchError {
    /// No image was selected when the search was submitted.
    #[error("{}", NO_IMAGE_MESSAGE)]
    Validation,

    /// The service answered with a non-success status.
    ///
    /// `body` holds the response payload serialized as JSON.
    #[error("HTTP {status}: {body}")]
    Server { status: u16, body: String },

    /// The request was sent but no response was obtained.
    #[error("{}", NO_RESPONSE_MESSAGE)]
    Connectivity,

    /// The request could not be built or dispatched.
    #[error("Error: {0}")]
    Client(String),

    /// A success response whose result entries could not be decoded.
    #[error("Error: invalid response body: {0}")]
    MalformedResponse(String),
}

impl SearchError {
    /// Create a server error from a status code and serialized body.
    pub fn server(status: u16, body: impl Into<String>) -> Self {
        Self::Server {
            status,
            body: body.into(),
        }
    }

    /// Create a client-side error from any displayable cause.
    pub fn client(cause: impl std::fmt::Display) -> Self {
        Self::Client(cause.to_string())
    }

    /// Short machine-friendly name of the error kind, used in logs and JSON output.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::Server { .. } => "server",
            Self::Connectivity => "connectivity",
            Self::Client(_) => "client",
            Self::MalformedResponse(_) => "malformed_response",
        }
    }

    /// Whether a request was actually sent to the service.
    #[must_use]
    pub const fn reached_network(&self) -> bool {
        matches!(
            self,
            Self::Server { .. } | Self::Connectivity | Self::MalformedResponse(_)
        )
    }
}

/// Primary error type for imgsearch operations outside a search submission.
#[derive(Error, Debug)]
pub enum ImgSearchError {
    // =========================================================================
    // Image Errors
    // =========================================================================
    /// Image file not found at the specified path.
    #[error("Image not found at '{path}'")]
    ImageNotFound { path: PathBuf },

    /// The file exists but is not a recognized image format.
    #[error("'{path}' is not a supported image (expected PNG, JPEG, GIF, WEBP, BMP or TIFF)")]
    NotAnImage { path: PathBuf },

    // =========================================================================
    // IO Errors
    // =========================================================================
    /// File read/write error.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Path-specific IO error with context.
    #[error("Failed to {operation} '{path}': {source}")]
    PathError {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// Configuration file parsing error.
    #[error("Invalid configuration in '{path}': {reason}")]
    ConfigError { path: PathBuf, reason: String },

    // =========================================================================
    // Search Errors
    // =========================================================================
    /// A search submission failed.
    #[error(transparent)]
    Search(#[from] SearchError),

    // =========================================================================
    // Generic Errors
    // =========================================================================
    /// Catch-all for other errors with context.
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// Result type alias for imgsearch operations.
pub type Result<T> = std::result::Result<T, ImgSearchError>;

impl ImgSearchError {
    /// Create an image not found error.
    pub fn image_not_found(path: impl Into<PathBuf>) -> Self {
        Self::ImageNotFound { path: path.into() }
    }

    /// Create a not-an-image error.
    pub fn not_an_image(path: impl Into<PathBuf>) -> Self {
        Self::NotAnImage { path: path.into() }
    }

    /// Create a path error with context.
    pub fn path_error(
        operation: &'static str,
        path: impl Into<PathBuf>,
        source: std::io::Error,
    ) -> Self {
        Self::PathError {
            operation,
            path: path.into(),
            source,
        }
    }

    /// Wrap an error with additional context.
    pub fn with_context<E>(context: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::WithContext {
            context: context.into(),
            source: Box::new(source),
        }
    }

    /// Get a suggestion for how to fix this error, if applicable.
    #[must_use]
    pub const fn suggestion(&self) -> Option<&'static str> {
        match self {
            Self::ImageNotFound { .. } => Some("Check the path to the image file."),
            Self::NotAnImage { .. } => {
                Some("Choose a PNG, JPEG, GIF, WEBP, BMP or TIFF file.")
            }
            Self::ConfigError { .. } => {
                Some("Run 'imgsearch config --init' to write a fresh config file.")
            }
            Self::Search(SearchError::Connectivity) => Some(
                "Verify the service is running and --api-base (or IMGSEARCH_API_BASE) points at it.",
            ),
            Self::Search(SearchError::Validation) => {
                Some("Pass an image path, or use 'open <path>' in interactive mode.")
            }
            _ => None,
        }
    }
}

// =============================================================================
// CLI Error Formatting Utilities
// =============================================================================

use colored::Colorize;

/// Format a structured CLI error with explanation and suggestions.
#[must_use]
pub fn format_error(title: &str, explanation: &str, suggestions: &[&str]) -> String {
    use std::fmt::Write;

    let mut output = format!("{} {}", "✗".red().bold(), title.bold());

    if !explanation.is_empty() {
        let _ = write!(output, "\n\n   {explanation}");
    }

    if !suggestions.is_empty() {
        output.push_str("\n\n   ");
        if suggestions.len() == 1 {
            let _ = write!(output, "{} {}", "Hint:".cyan(), suggestions[0]);
        } else {
            let _ = write!(output, "{}:", "Try".cyan());
            for suggestion in suggestions {
                let _ = write!(output, "\n     {} {}", "•".dimmed(), suggestion);
            }
        }
    }

    output
}

/// Calculate the Levenshtein edit distance between two strings.
#[must_use]
pub fn levenshtein_distance(a: &str, b: &str) -> usize {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();
    let b_len = b_chars.len();

    if a_chars.is_empty() {
        return b_len;
    }
    if b_len == 0 {
        return a_chars.len();
    }

    // Two rows instead of the full matrix
    let mut prev_row: Vec<usize> = (0..=b_len).collect();
    let mut curr_row: Vec<usize> = vec![0; b_len + 1];

    for (i, a_char) in a_chars.iter().enumerate() {
        curr_row[0] = i + 1;

        for (j, b_char) in b_chars.iter().enumerate() {
            let cost = usize::from(a_char != b_char);
            curr_row[j + 1] = (prev_row[j + 1] + 1)
                .min(curr_row[j] + 1)
                .min(prev_row[j] + cost);
        }

        std::mem::swap(&mut prev_row, &mut curr_row);
    }

    prev_row[b_len]
}

/// Find the closest candidate within `max_distance` edits (default 2).
///
/// Exact matches are not returned; they are not typos.
#[must_use]
pub fn find_closest_match<'a>(
    input: &str,
    candidates: &[&'a str],
    max_distance: Option<usize>,
) -> Option<&'a str> {
    let max_dist = max_distance.unwrap_or(2);
    let input_lower = input.to_lowercase();

    candidates
        .iter()
        .map(|&candidate| {
            let distance = levenshtein_distance(&input_lower, &candidate.to_lowercase());
            (candidate, distance)
        })
        .filter(|(_, distance)| *distance <= max_dist && *distance > 0)
        .min_by_key(|(_, distance)| *distance)
        .map(|(candidate, _)| candidate)
}

/// Format a "did you mean?" suggestion.
#[must_use]
pub fn format_did_you_mean(suggestion: &str) -> String {
    format!("Did you mean '{}'?", suggestion.green())
}

/// Format an error for an unknown value with "did you mean?" support.
#[must_use]
pub fn format_unknown_value_error(kind: &str, input: &str, valid_options: &[&str]) -> String {
    let title = format!("Unknown {kind}: '{input}'");

    let mut suggestions = Vec::new();

    if let Some(closest) = find_closest_match(input, valid_options, None) {
        suggestions.push(format_did_you_mean(closest));
    }

    if valid_options.len() <= 12 {
        suggestions.push(format!("Valid {kind}s: {}", valid_options.join(", ")));
    }

    let suggestion_refs: Vec<&str> = suggestions.iter().map(String::as_str).collect();
    format_error(&title, "", &suggestion_refs)
}

/// Metric names accepted on the command line and in the interactive session.
pub const VALID_METRICS: &[&str] = &["l2", "cosine"];

/// Commands understood by the interactive session.
pub const VALID_REPL_COMMANDS: &[&str] = &[
    "open", "close", "k", "metric", "search", "results", "show", "guide", "help", "quit",
];
