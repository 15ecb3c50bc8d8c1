//! Integration tests for the HTTP search client.
//!
//! Each test starts an in-process stub search service on an ephemeral port
//! and drives the real client (and controller) against it.

use axum::Router;
use axum::extract::{Multipart, Query, State};
use axum::http::{StatusCode, header};
use axum::routing::post;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use imgsearch::config::ServiceConfig;
use imgsearch::controller::{ControllerOptions, SearchController};
use imgsearch::{
    HttpSearchClient, ImageFile, Metric, NO_RESPONSE_MESSAGE, RequestState, SearchError,
    SearchRequest, SearchService,
};

const PNG: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 13];

/// What the stub saw for one request.
#[derive(Debug, Default, Clone)]
struct Recorded {
    params: HashMap<String, String>,
    field: Option<String>,
    filename: Option<String>,
    content_type: Option<String>,
    size: usize,
}

#[derive(Clone)]
struct Stub {
    status: StatusCode,
    content_type: &'static str,
    body: &'static str,
    delay: Option<Duration>,
    seen: Arc<Mutex<Vec<Recorded>>>,
}

impl Stub {
    fn json(status: StatusCode, body: &'static str) -> Self {
        Self {
            status,
            content_type: "application/json",
            body,
            delay: None,
            seen: Arc::default(),
        }
    }
}

async fn handle_search(
    State(stub): State<Stub>,
    Query(params): Query<HashMap<String, String>>,
    mut multipart: Multipart,
) -> (StatusCode, [(header::HeaderName, &'static str); 1], &'static str) {
    let mut recorded = Recorded {
        params,
        ..Recorded::default()
    };
    while let Ok(Some(field)) = multipart.next_field().await {
        recorded.field = field.name().map(str::to_string);
        recorded.filename = field.file_name().map(str::to_string);
        recorded.content_type = field.content_type().map(str::to_string);
        recorded.size = field.bytes().await.map_or(0, |b| b.len());
    }
    stub.seen.lock().push(recorded);

    if let Some(delay) = stub.delay {
        tokio::time::sleep(delay).await;
    }
    (stub.status, [(header::CONTENT_TYPE, stub.content_type)], stub.body)
}

/// Serve `stub` on 127.0.0.1 and return its base URL.
async fn serve(stub: Stub) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind stub listener");
    let addr = listener.local_addr().expect("stub address");
    let app = Router::new()
        .route("/search", post(handle_search))
        .with_state(stub);
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("stub server");
    });
    format!("http://{addr}")
}

/// A base URL nothing is listening on.
fn dead_base() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
    let addr = listener.local_addr().expect("address");
    drop(listener);
    format!("http://{addr}")
}

fn client(base: &str) -> HttpSearchClient {
    HttpSearchClient::new(&ServiceConfig {
        api_base: base.to_string(),
        ..ServiceConfig::default()
    })
    .expect("client")
}

fn request(top_k: u32, metric: Option<Metric>) -> SearchRequest {
    SearchRequest {
        image: ImageFile::from_bytes("query.png", PNG.to_vec()).expect("png"),
        top_k,
        metric,
    }
}

const THREE_MATCHES: &str = r#"{"results": [
    {"index": 42, "rank": 2, "distance": 0.31, "image_url": "http://cdn/42.jpg", "filename": "42.jpg"},
    {"index": 7, "rank": 1, "distance": 0.12, "image_url": "http://cdn/7.jpg"},
    {"index": 99, "rank": 3, "distance": 0.58, "image_url": "http://cdn/99.jpg", "filename": "99.jpg"}
]}"#;

#[tokio::test]
async fn sends_multipart_file_and_query_parameters() {
    let stub = Stub::json(StatusCode::OK, THREE_MATCHES);
    let seen = stub.seen.clone();
    let base = serve(stub).await;

    let response = client(&base)
        .search(&request(12, Some(Metric::Cosine)))
        .await
        .expect("search succeeds");
    assert_eq!(response.results.len(), 3);

    let seen = seen.lock();
    assert_eq!(seen.len(), 1);
    let recorded = &seen[0];
    assert_eq!(recorded.params.get("k").map(String::as_str), Some("12"));
    assert_eq!(recorded.params.get("metric").map(String::as_str), Some("cosine"));
    assert_eq!(recorded.field.as_deref(), Some("file"));
    assert_eq!(recorded.filename.as_deref(), Some("query.png"));
    assert_eq!(recorded.content_type.as_deref(), Some("image/png"));
    assert_eq!(recorded.size, PNG.len());
}

#[tokio::test]
async fn omits_metric_when_not_supported() {
    let stub = Stub::json(StatusCode::OK, "{}");
    let seen = stub.seen.clone();
    let base = serve(stub).await;

    client(&base).search(&request(5, None)).await.expect("search succeeds");

    let seen = seen.lock();
    assert_eq!(seen[0].params.get("k").map(String::as_str), Some("5"));
    assert!(!seen[0].params.contains_key("metric"));
}

#[tokio::test]
async fn server_error_embeds_status_and_body() {
    let base = serve(Stub::json(StatusCode::INTERNAL_SERVER_ERROR, r#"{"detail":"oops"}"#)).await;

    let err = client(&base)
        .search(&request(5, Some(Metric::L2)))
        .await
        .expect_err("500 is an error");

    assert_eq!(err, SearchError::server(500, r#"{"detail":"oops"}"#));
    let msg = err.to_string();
    assert!(msg.contains("500"));
    assert!(msg.contains("oops"));
}

#[tokio::test]
async fn plain_text_error_body_is_quoted() {
    let stub = Stub {
        content_type: "text/plain",
        ..Stub::json(StatusCode::BAD_GATEWAY, "upstream down")
    };
    let base = serve(stub).await;

    let err = client(&base).search(&request(5, None)).await.expect_err("502");
    assert_eq!(err.to_string(), r#"HTTP 502: "upstream down""#);
}

#[tokio::test]
async fn missing_results_field_is_empty() {
    let base = serve(Stub::json(StatusCode::OK, r#"{"took_ms": 4}"#)).await;
    let response = client(&base).search(&request(5, None)).await.expect("ok");
    assert!(response.results.is_empty());
}

#[tokio::test]
async fn refused_connection_is_connectivity_error() {
    let err = client(&dead_base())
        .search(&request(5, None))
        .await
        .expect_err("nothing is listening");
    assert_eq!(err, SearchError::Connectivity);
    assert_eq!(err.to_string(), NO_RESPONSE_MESSAGE);
}

#[tokio::test]
async fn timeout_is_connectivity_error() {
    let stub = Stub {
        delay: Some(Duration::from_secs(30)),
        ..Stub::json(StatusCode::OK, "{}")
    };
    let base = serve(stub).await;
    let client = HttpSearchClient::new(&ServiceConfig {
        api_base: base,
        timeout_secs: Some(1),
        ..ServiceConfig::default()
    })
    .expect("client");

    let err = client.search(&request(5, None)).await.expect_err("times out");
    assert_eq!(err, SearchError::Connectivity);
}

#[tokio::test]
async fn unsupported_scheme_is_client_error() {
    let err = client("ftp://127.0.0.1:21")
        .search(&request(5, None))
        .await
        .expect_err("ftp is not http");
    assert!(matches!(err, SearchError::Client(_)));
    assert!(err.to_string().starts_with("Error: "));
}

#[tokio::test]
async fn controller_end_to_end_orders_results() {
    let base = serve(Stub::json(StatusCode::OK, THREE_MATCHES)).await;
    let mut controller = SearchController::new(client(&base), ControllerOptions::default());
    controller.select_file(ImageFile::from_bytes("query.png", PNG.to_vec()));

    let state = controller.submit_search().await;
    assert!(matches!(state, RequestState::Succeeded(_)));

    let ranks: Vec<u32> = controller.results().iter().map(|r| r.rank).collect();
    assert_eq!(ranks, vec![1, 2, 3]);
    assert_eq!(controller.results()[0].display_name(), "Unknown");
    assert!(!controller.is_loading());
}

#[tokio::test]
async fn controller_reports_connectivity_not_server_error() {
    let mut controller = SearchController::new(client(&dead_base()), ControllerOptions::default());
    controller.select_file(ImageFile::from_bytes("query.png", PNG.to_vec()));

    controller.submit_search().await;

    let msg = controller.error_message().expect("failed");
    assert_eq!(msg, NO_RESPONSE_MESSAGE);
    assert!(!msg.starts_with("HTTP"));
    assert!(!controller.is_loading());
}
