//! The seam between the view controller and the remote search service.

use crate::error::SearchError;
use crate::image::ImageFile;
use crate::model::{Metric, SearchResponse};

/// Everything needed to issue one search.
#[derive(Debug, Clone)]
pub struct SearchRequest {
    pub image: ImageFile,
    pub top_k: u32,
    /// `None` when the service does not take a metric parameter.
    pub metric: Option<Metric>,
}

impl SearchRequest {
    /// Query parameters in the order they are sent.
    #[must_use]
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![("k", self.top_k.to_string())];
        if let Some(metric) = self.metric {
            pairs.push(("metric", metric.as_str().to_string()));
        }
        pairs
    }
}

/// A service that ranks stored images by similarity to a query image.
///
/// Implementations must classify every failure into a [`SearchError`]; the
/// controller shows the error's message verbatim.
#[allow(async_fn_in_trait)]
pub trait SearchService {
    /// Submit one search and wait for its outcome.
    async fn search(&self, request: &SearchRequest) -> Result<SearchResponse, SearchError>;
}

impl<S: SearchService + ?Sized> SearchService for &S {
    async fn search(&self, request: &SearchRequest) -> Result<SearchResponse, SearchError> {
        (**self).search(request).await
    }
}
