//! Data models for search queries, results and view state.

use serde::{Deserialize, Serialize};

use crate::error::SearchError;

/// Smallest result count the input surfaces accept.
pub const MIN_TOP_K: u32 = 1;

/// Largest result count the input surfaces accept.
pub const MAX_TOP_K: u32 = 20;

/// Result count used when nothing else is configured.
pub const DEFAULT_TOP_K: u32 = 5;

/// Similarity measure forwarded to the search service.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    /// Euclidean distance between embeddings.
    #[default]
    L2,
    /// Angle between embeddings, ignoring magnitude.
    Cosine,
}

impl Metric {
    /// Wire value for the `metric` query parameter.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::L2 => "l2",
            Self::Cosine => "cosine",
        }
    }

    /// Human label, as shown in the metric selector.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::L2 => "L2",
            Self::Cosine => "Cosine",
        }
    }
}

impl std::fmt::Display for Metric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Metric {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "l2" | "euclidean" => Ok(Self::L2),
            "cosine" | "cos" => Ok(Self::Cosine),
            _ => Err(format!("Invalid metric: {s}")),
        }
    }
}

/// One ranked match returned by the search service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultItem {
    pub index: u64,
    pub rank: u32,
    pub distance: f64,
    pub image_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
}

impl ResultItem {
    /// Display key; unique within one result set.
    #[must_use]
    pub const fn key(&self) -> (u64, u32) {
        (self.index, self.rank)
    }

    /// Filename to show, falling back to "Unknown".
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.filename.as_deref().unwrap_or("Unknown")
    }
}

/// Body of a successful search response.
///
/// A missing or `null` `results` field decodes to an empty list.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchResponse {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub results: Vec<ResultItem>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<ResultItem>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<Vec<ResultItem>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Lifecycle of the current search request.
///
/// Results and error message live inside the variants, so a view can never be
/// loading while still showing an error, or show results from a failed search.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum RequestState {
    #[default]
    Idle,
    Loading,
    Succeeded(Vec<ResultItem>),
    Failed(SearchError),
}

impl RequestState {
    #[must_use]
    pub const fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }

    /// Results of the last successful search, empty otherwise.
    #[must_use]
    pub fn results(&self) -> &[ResultItem] {
        match self {
            Self::Succeeded(results) => results,
            _ => &[],
        }
    }

    /// Failure of the last search, if any.
    #[must_use]
    pub const fn error(&self) -> Option<&SearchError> {
        match self {
            Self::Failed(err) => Some(err),
            _ => None,
        }
    }

    #[must_use]
    pub const fn status(&self) -> RequestStatus {
        match self {
            Self::Idle => RequestStatus::Idle,
            Self::Loading => RequestStatus::Loading,
            Self::Succeeded(_) => RequestStatus::Succeeded,
            Self::Failed(_) => RequestStatus::Failed,
        }
    }
}

/// Which [`RequestState`] a view is in, without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    Idle,
    Loading,
    Succeeded,
    Failed,
}

impl RequestStatus {
    /// Short name used in logs and JSON output.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Loading => "loading",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
        }
    }
}
