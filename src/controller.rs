//! The search view controller.
//!
//! Holds everything the search view shows (query, preview, request state,
//! results) and performs the one side-effecting operation: submitting the
//! selected image to a [`SearchService`].
//!
//! Submissions are numbered. A completion is applied only when it belongs to
//! the most recent submission, so when two searches overlap the view always
//! reflects the latest one, whatever order the responses arrive in.

use std::collections::HashSet;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::error::SearchError;
use crate::image::ImageFile;
use crate::logging::OperationGuard;
use crate::model::{DEFAULT_TOP_K, Metric, RequestState, ResultItem, SearchResponse};
use crate::preview::{PreviewHandle, PreviewRegistry};
use crate::service::{SearchRequest, SearchService};

/// Construction-time settings for a controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControllerOptions {
    /// Whether the service takes a `metric` parameter.
    pub send_metric: bool,
    /// Initial result count.
    pub top_k: u32,
    /// Initial metric.
    pub metric: Metric,
}

impl Default for ControllerOptions {
    fn default() -> Self {
        Self {
            send_metric: true,
            top_k: DEFAULT_TOP_K,
            metric: Metric::L2,
        }
    }
}

impl ControllerOptions {
    #[must_use]
    pub const fn from_config(config: &Config) -> Self {
        Self {
            send_metric: config.service.send_metric,
            top_k: config.search.default_top_k,
            metric: config.search.default_metric,
        }
    }
}

/// What the user has entered so far.
#[derive(Debug, Clone)]
pub struct Query {
    pub file: Option<ImageFile>,
    pub top_k: u32,
    pub metric: Metric,
}

/// A submitted search waiting for its outcome.
#[derive(Debug)]
pub struct PendingSearch {
    seq: u64,
    request: SearchRequest,
}

impl PendingSearch {
    /// Sequence number of this submission; later submissions have larger ones.
    #[must_use]
    pub const fn seq(&self) -> u64 {
        self.seq
    }

    #[must_use]
    pub const fn request(&self) -> &SearchRequest {
        &self.request
    }
}

/// Search view state plus the service it talks to.
pub struct SearchController<S> {
    service: S,
    send_metric: bool,
    query: Query,
    previews: PreviewRegistry,
    preview: Option<PreviewHandle>,
    state: RequestState,
    issued: u64,
}

impl<S: SearchService> SearchController<S> {
    pub fn new(service: S, options: ControllerOptions) -> Self {
        Self {
            service,
            send_metric: options.send_metric,
            query: Query {
                file: None,
                top_k: options.top_k,
                metric: options.metric,
            },
            previews: PreviewRegistry::new(),
            preview: None,
            state: RequestState::Idle,
            issued: 0,
        }
    }

    /// Select the query image, or clear the selection with `None`.
    ///
    /// Clears any error message. The previous preview is released and, when a
    /// file is given, a new one is created. Never touches the network.
    pub fn select_file(&mut self, file: Option<ImageFile>) {
        if matches!(self.state, RequestState::Failed(_)) {
            self.state = RequestState::Idle;
        }
        // Assigning drops the previous handle, which revokes its URL.
        self.preview = file.as_ref().map(|f| self.previews.create(f));
        match &file {
            Some(f) => debug!(name = f.name(), bytes = f.len(), "Selected image"),
            None => debug!("Cleared image selection"),
        }
        self.query.file = file;
    }

    /// Set the requested result count.
    ///
    /// The value is sent as given; range checks belong to the input surface.
    pub const fn set_top_k(&mut self, top_k: u32) {
        self.query.top_k = top_k;
    }

    pub const fn set_metric(&mut self, metric: Metric) {
        self.query.metric = metric;
    }

    /// Start a submission: validate, enter `Loading`, and hand back the request.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Validation`] (and enters `Failed`) if no image
    /// is selected. No request is produced in that case.
    pub fn begin_search(&mut self) -> Result<PendingSearch, SearchError> {
        let Some(image) = self.query.file.clone() else {
            warn!("Search submitted without an image");
            self.state = RequestState::Failed(SearchError::Validation);
            return Err(SearchError::Validation);
        };

        self.issued += 1;
        self.state = RequestState::Loading;
        let request = SearchRequest {
            image,
            top_k: self.query.top_k,
            metric: self.send_metric.then_some(self.query.metric),
        };
        info!(
            seq = self.issued,
            top_k = request.top_k,
            metric = request.metric.map_or("-", Metric::as_str),
            "Search started"
        );
        Ok(PendingSearch {
            seq: self.issued,
            request,
        })
    }

    /// Apply the outcome of a submission.
    ///
    /// Returns `false` and leaves the view untouched if a newer submission has
    /// been started since `seq` was issued.
    pub fn complete_search(
        &mut self,
        seq: u64,
        outcome: Result<SearchResponse, SearchError>,
    ) -> bool {
        if seq != self.issued {
            debug!(seq, latest = self.issued, "Discarding stale search outcome");
            return false;
        }

        self.state = match outcome {
            Ok(response) => {
                let results = order_results(response.results);
                info!(seq, count = results.len(), "Search succeeded");
                RequestState::Succeeded(results)
            }
            Err(err) => {
                error!(
                    seq,
                    kind = err.kind(),
                    reached_network = err.reached_network(),
                    error = %err,
                    "Search failed"
                );
                RequestState::Failed(err)
            }
        };
        true
    }

    /// Submit the selected image and wait for the outcome.
    ///
    /// Every exit path leaves the controller out of `Loading` unless a newer
    /// submission is still in flight.
    pub async fn submit_search(&mut self) -> &RequestState {
        let Ok(pending) = self.begin_search() else {
            return &self.state;
        };

        let guard = OperationGuard::new("search");
        let outcome = self.service.search(&pending.request).await;
        match &outcome {
            Ok(_) => guard.complete(),
            Err(err) => guard.fail(err),
        }

        self.complete_search(pending.seq, outcome);
        &self.state
    }

    #[must_use]
    pub const fn state(&self) -> &RequestState {
        &self.state
    }

    #[must_use]
    pub const fn is_loading(&self) -> bool {
        self.state.is_loading()
    }

    #[must_use]
    pub fn results(&self) -> &[ResultItem] {
        self.state.results()
    }

    /// The message to show, if the last search failed.
    #[must_use]
    pub fn error_message(&self) -> Option<String> {
        self.state.error().map(ToString::to_string)
    }

    #[must_use]
    pub const fn query(&self) -> &Query {
        &self.query
    }

    #[must_use]
    pub const fn preview(&self) -> Option<&PreviewHandle> {
        self.preview.as_ref()
    }

    #[must_use]
    pub const fn previews(&self) -> &PreviewRegistry {
        &self.previews
    }

    #[must_use]
    pub const fn sends_metric(&self) -> bool {
        self.send_metric
    }

    #[must_use]
    pub const fn service(&self) -> &S {
        &self.service
    }
}

/// Sort by ascending rank and drop entries whose (index, rank) key repeats.
fn order_results(mut results: Vec<ResultItem>) -> Vec<ResultItem> {
    results.sort_by_key(|item| item.rank);
    let mut seen = HashSet::with_capacity(results.len());
    results.retain(|item| {
        let fresh = seen.insert(item.key());
        if !fresh {
            warn!(index = item.index, rank = item.rank, "Dropping duplicate result");
        }
        fresh
    });
    results
}
