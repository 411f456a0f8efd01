use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use predictor::config::GitHubConfig;
use predictor::remote::{ContentKind, RemoteError, RemoteStore};
use predictor::remote_github::GitHubStore;
use serde_json::{json, Value};

const RAW_MEDIA_TYPE: &str = "application/vnd.github.raw+json";

/// Minimal contents API. Behaviour is keyed on the file name.
#[derive(Clone, Default)]
struct Stub {
    puts: Arc<Mutex<Vec<(String, Value)>>>,
    requests: Arc<Mutex<Vec<HeaderMap>>>,
}

async fn get_file(
    State(stub): State<Stub>,
    Path(path): Path<String>,
    headers: HeaderMap,
) -> Response {
    let raw = headers
        .get(header::ACCEPT)
        .is_some_and(|v| v.as_bytes() == RAW_MEDIA_TYPE.as_bytes());
    stub.requests.lock().unwrap().push(headers);

    match path.as_str() {
        "missing.csv" => StatusCode::NOT_FOUND.into_response(),
        "broken.csv" => (StatusCode::INTERNAL_SERVER_ERROR, "backend down").into_response(),
        // "id,bill_length" wrapped the way the contents API wraps base64
        "small.csv" => Json(json!({
            "sha": "abc123",
            "content": "aWQsYmls\nbF9sZW5n\ndGg=\n",
            "encoding": "base64"
        }))
        .into_response(),
        "big.xlsx" if raw => b"raw workbook bytes".to_vec().into_response(),
        "big.xlsx" => {
            Json(json!({"sha": "big1", "content": "", "encoding": "none"})).into_response()
        }
        _ => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn put_file(
    State(stub): State<Stub>,
    Path(path): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    stub.puts.lock().unwrap().push((path.clone(), body));
    match path.as_str() {
        "stale.csv" => (StatusCode::CONFLICT, "sha does not match").into_response(),
        "exists.csv" => (StatusCode::UNPROCESSABLE_ENTITY, "sha wasn't supplied").into_response(),
        "forbidden.csv" => (StatusCode::FORBIDDEN, "no push access").into_response(),
        "new.csv" => (StatusCode::CREATED, Json(json!({}))).into_response(),
        _ => Json(json!({})).into_response(),
    }
}

async fn serve() -> (GitHubStore, Stub) {
    let stub = Stub::default();
    let app = Router::new()
        .route("/repos/octo/penguins/contents/*path", get(get_file).put(put_file))
        .with_state(stub.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let cfg = GitHubConfig {
        api_url: format!("http://{addr}"),
        username: "octo".into(),
        repo: "penguins".into(),
        token: "secret-token".into(),
        branch: "main".into(),
    };
    (GitHubStore::new(&cfg, Duration::from_secs(5)).unwrap(), stub)
}

#[tokio::test]
async fn test_missing_file_reads_as_none() {
    let (store, _) = serve().await;
    assert!(store.read_current("missing.csv").await.unwrap().is_none());
}

#[tokio::test]
async fn test_read_decodes_wrapped_base64() {
    let (store, stub) = serve().await;

    let file = store.read_current("small.csv").await.unwrap().unwrap();
    assert_eq!(file.path, "small.csv");
    assert_eq!(file.version, "abc123");
    assert_eq!(file.content, b"id,bill_length");

    let requests = stub.requests.lock().unwrap();
    assert_eq!(requests[0][header::AUTHORIZATION], "Bearer secret-token");
    assert!(requests[0].contains_key(header::USER_AGENT));
}

#[tokio::test]
async fn test_large_file_is_fetched_raw() {
    let (store, stub) = serve().await;

    let file = store.read_current("big.xlsx").await.unwrap().unwrap();
    assert_eq!(file.version, "big1");
    assert_eq!(file.content, b"raw workbook bytes");
    assert_eq!(stub.requests.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn test_server_error_on_read_is_a_status_error() {
    let (store, _) = serve().await;
    match store.read_current("broken.csv").await {
        Err(RemoteError::Status { status, body }) => {
            assert_eq!(status, 500);
            assert_eq!(body, "backend down");
        }
        other => panic!("expected status error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_create_sends_no_sha() {
    let (store, stub) = serve().await;

    store
        .write_conditional("new.csv", b"a", ContentKind::Text, None)
        .await
        .unwrap();

    let puts = stub.puts.lock().unwrap();
    let (path, body) = &puts[0];
    assert_eq!(path, "new.csv");
    assert_eq!(body["message"], "Create prediction file: new.csv");
    assert_eq!(body["content"], "YQ==");
    assert_eq!(body["branch"], "main");
    assert!(body.get("sha").is_none());
}

#[tokio::test]
async fn test_update_sends_sha() {
    let (store, stub) = serve().await;

    store
        .write_conditional("predictions.xlsx", &[0x50, 0x4b], ContentKind::Binary, Some("abc123"))
        .await
        .unwrap();

    let puts = stub.puts.lock().unwrap();
    let (_, body) = &puts[0];
    assert_eq!(body["message"], "Update prediction file: predictions.xlsx");
    assert_eq!(body["sha"], "abc123");
    assert_eq!(body["content"], "UEs=");
}

#[tokio::test]
async fn test_conflict_statuses_map_to_conflict() {
    let (store, _) = serve().await;

    let stale = store
        .write_conditional("stale.csv", b"a", ContentKind::Text, Some("old"))
        .await
        .unwrap_err();
    assert!(stale.is_conflict(), "{stale:?}");

    let exists = store
        .write_conditional("exists.csv", b"a", ContentKind::Text, None)
        .await
        .unwrap_err();
    assert!(exists.is_conflict(), "{exists:?}");
}

#[tokio::test]
async fn test_other_write_failures_are_status_errors() {
    let (store, _) = serve().await;

    let err = store
        .write_conditional("forbidden.csv", b"a", ContentKind::Text, Some("v"))
        .await
        .unwrap_err();
    assert!(matches!(err, RemoteError::Status { status: 403, .. }), "{err:?}");
}
