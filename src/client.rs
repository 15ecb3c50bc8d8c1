//! HTTP client for the remote image search service.
//!
//! Sends `POST {api_base}/search?k=..[&metric=..]` with the image as the
//! multipart field `file`, and sorts every failure into a [`SearchError`].

use reqwest::multipart::{Form, Part};
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

use crate::config::ServiceConfig;
use crate::error::{ImgSearchError, Result, SearchError};
use crate::model::SearchResponse;
use crate::service::{SearchRequest, SearchService};

/// Multipart field name carrying the image.
pub const FILE_FIELD: &str = "file";

/// HTTP client for the search service.
#[derive(Debug, Clone)]
pub struct HttpSearchClient {
    client: reqwest::Client,
    api_base: String,
}

impl HttpSearchClient {
    /// Create a client for the configured service.
    ///
    /// The base URL is not validated here; a malformed base surfaces as a
    /// [`SearchError::Client`] when a search is submitted.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(config: &ServiceConfig) -> Result<Self> {
        let mut builder =
            reqwest::Client::builder().user_agent(concat!("imgsearch/", env!("CARGO_PKG_VERSION")));
        if let Some(timeout) = config.timeout() {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| ImgSearchError::with_context("Failed to create HTTP client", e))?;

        Ok(Self {
            client,
            api_base: config.api_base.clone(),
        })
    }

    #[must_use]
    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    /// Build the full search URL for a request.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Client`] if the base URL does not parse.
    pub fn search_url(&self, request: &SearchRequest) -> std::result::Result<Url, SearchError> {
        let endpoint = format!("{}/search", self.api_base.trim_end_matches('/'));
        Url::parse_with_params(&endpoint, request.query_pairs())
            .map_err(|e| SearchError::client(format!("invalid API base '{}': {e}", self.api_base)))
    }

    fn build_form(request: &SearchRequest) -> std::result::Result<Form, SearchError> {
        let image = &request.image;
        let body = reqwest::Body::from(image.bytes().clone());
        let part = Part::stream_with_length(body, u64::try_from(image.len()).unwrap_or(u64::MAX))
            .file_name(image.name().to_string())
            .mime_str(image.mime_type())
            .map_err(SearchError::client)?;
        Ok(Form::new().part(FILE_FIELD, part))
    }
}

impl SearchService for HttpSearchClient {
    async fn search(
        &self,
        request: &SearchRequest,
    ) -> std::result::Result<SearchResponse, SearchError> {
        let url = self.search_url(request)?;
        let form = Self::build_form(request)?;
        debug!(%url, bytes = request.image.len(), "Sending search request");

        let response = self
            .client
            .post(url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| classify_send_error(&e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.bytes().await.unwrap_or_default();
            return Err(SearchError::server(status.as_u16(), serialize_body(&body)));
        }

        let body = response.bytes().await.map_err(|e| {
            warn!(error = %e, "Response body was cut off");
            SearchError::Connectivity
        })?;
        decode_success(&body)
    }
}

/// Sort a failed send into "never left" vs "no response".
fn classify_send_error(err: &reqwest::Error) -> SearchError {
    if err.is_builder() {
        SearchError::client(err)
    } else {
        debug!(error = %err, connect = err.is_connect(), timeout = err.is_timeout(), "No response");
        SearchError::Connectivity
    }
}

/// Serialize an error payload for display.
///
/// JSON bodies are re-serialized compactly; anything else is shown as a JSON
/// string.
#[must_use]
pub fn serialize_body(body: &[u8]) -> String {
    serde_json::from_slice::<Value>(body).map_or_else(
        |_| Value::String(String::from_utf8_lossy(body).into_owned()).to_string(),
        |value| value.to_string(),
    )
}

/// Decode a success payload.
///
/// Bodies that are not JSON objects carry no `results` field and decode to an
/// empty list.
///
/// # Errors
///
/// Returns [`SearchError::MalformedResponse`] if `results` holds entries of the
/// wrong shape.
pub fn decode_success(body: &[u8]) -> std::result::Result<SearchResponse, SearchError> {
    match serde_json::from_slice::<Value>(body) {
        Ok(value @ Value::Object(_)) => serde_json::from_value(value)
            .map_err(|e| SearchError::MalformedResponse(e.to_string())),
        Ok(_) | Err(_) => {
            warn!(bytes = body.len(), "Success response is not a JSON object; no results");
            Ok(SearchResponse::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::ImageFile;
    use crate::model::Metric;

    fn client(base: &str) -> HttpSearchClient {
        HttpSearchClient::new(&ServiceConfig {
            api_base: base.to_string(),
            ..ServiceConfig::default()
        })
        .unwrap()
    }

    fn request(metric: Option<Metric>) -> SearchRequest {
        SearchRequest {
            image: ImageFile::from_bytes("q.gif", b"GIF89a\x01\x00".to_vec()).unwrap(),
            top_k: 5,
            metric,
        }
    }

    #[test]
    fn search_url_carries_k_and_metric() {
        let url = client("http://127.0.0.1:8000").search_url(&request(Some(Metric::L2))).unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:8000/search?k=5&metric=l2");
    }

    #[test]
    fn search_url_tolerates_trailing_slash_and_prefix() {
        let url = client("https://api.example.com/v1/").search_url(&request(None)).unwrap();
        assert_eq!(url.as_str(), "https://api.example.com/v1/search?k=5");
    }

    #[test]
    fn malformed_base_is_client_error() {
        let err = client("not a url").search_url(&request(None)).unwrap_err();
        assert!(matches!(err, SearchError::Client(_)));
        assert!(err.to_string().starts_with("Error: invalid API base 'not a url'"));
    }

    #[test]
    fn serialize_body_keeps_json_compact() {
        assert_eq!(serialize_body(br#"{ "detail" : "oops" }"#), r#"{"detail":"oops"}"#);
        assert_eq!(serialize_body(b"Internal Server Error"), r#""Internal Server Error""#);
        assert_eq!(serialize_body(b""), r#""""#);
    }

    #[test]
    fn decode_success_handles_missing_and_non_object() {
        assert!(decode_success(b"{}").unwrap().results.is_empty());
        assert!(decode_success(b"[]").unwrap().results.is_empty());
        assert!(decode_success(b"<html>ok</html>").unwrap().results.is_empty());
    }

    #[test]
    fn decode_success_rejects_wrong_item_shape() {
        let err = decode_success(br#"{"results": [{"rank": "first"}]}"#).unwrap_err();
        assert!(matches!(err, SearchError::MalformedResponse(_)));
    }
}
