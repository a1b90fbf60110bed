use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::http::{HeaderMap, Request, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

use familystream::http::{build_router, proxy::MAX_REQUEST_BODY, state::AppState};
use familystream::hub::HubClient;
use familystream::relay::{Relay, cache::AssetCache};

const INJECTED_TAG: &str = r#"<script src="/familystream-ha-integration.js"></script>"#;

#[derive(Clone)]
struct FakeSite {
    origin: String,
    stylesheet_hits: Arc<AtomicUsize>,
}

async fn page(State(site): State<FakeSite>) -> Response {
    let html = format!(
        r#"<html><head><link rel="stylesheet" href="{0}/static/site.css"></head><BODY><a href="{0}/about">About</a></BODY></html>"#,
        site.origin
    );
    (
        [
            (header::CONTENT_TYPE, "text/html; charset=utf-8"),
            (header::CONTENT_SECURITY_POLICY, "script-src 'self' cdn.test"),
        ],
        html,
    )
        .into_response()
}

async fn stylesheet(State(site): State<FakeSite>) -> Response {
    site.stylesheet_hits.fetch_add(1, Ordering::SeqCst);
    ([(header::CONTENT_TYPE, "text/plain")], "body{margin:0}").into_response()
}

async fn font() -> Response {
    (
        [(header::CONTENT_TYPE, "application/octet-stream")],
        vec![0x77u8, 0x4f, 0x46, 0x32],
    )
        .into_response()
}

async fn redirect(State(site): State<FakeSite>) -> Response {
    (
        StatusCode::FOUND,
        [
            (header::LOCATION, format!("{}/login?next=%2F", site.origin)),
            (header::SET_COOKIE, "sid=abc; Path=/; Domain=familystream.test".to_string()),
        ],
    )
        .into_response()
}

async fn echo(headers: HeaderMap, body: Bytes) -> Json<Value> {
    Json(json!({
        "body": String::from_utf8_lossy(&body),
        "accept_encoding": headers.get(header::ACCEPT_ENCODING).and_then(|v| v.to_str().ok()),
        "cookie": headers.get(header::COOKIE).and_then(|v| v.to_str().ok()),
    }))
}

async fn missing_stylesheet() -> StatusCode {
    StatusCode::NOT_FOUND
}

async fn no_content() -> Response {
    (StatusCode::NO_CONTENT, [(header::CONTENT_TYPE, "text/html")]).into_response()
}

async fn not_modified() -> Response {
    (
        StatusCode::NOT_MODIFIED,
        [(header::CONTENT_TYPE, "text/html"), (header::ETAG, "\"v1\"")],
    )
        .into_response()
}

/// Bytes labelled gzip, sent even though the relay asks for identity.
const GZIPPED_PAGE: &[u8] = &[0x1f, 0x8b, 0x08, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x03];

async fn gzipped_page() -> Response {
    (
        [
            (header::CONTENT_TYPE, "text/html; charset=utf-8"),
            (header::CONTENT_ENCODING, "gzip"),
        ],
        GZIPPED_PAGE,
    )
        .into_response()
}

const LATIN1_PAGE: &[u8] = b"<html><body>caf\xe9</body></html>";

async fn latin1_page() -> Response {
    ([(header::CONTENT_TYPE, "text/html; charset=iso-8859-1")], LATIN1_PAGE).into_response()
}

/// Start a fake target site; returns it plus its origin (`http://127.0.0.1:PORT`).
async fn spawn_site() -> FakeSite {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let site = FakeSite {
        origin: format!("http://{}", listener.local_addr().unwrap()),
        stylesheet_hits: Arc::new(AtomicUsize::new(0)),
    };
    let app = Router::new()
        .route("/page", get(page))
        .route("/static/site.css", get(stylesheet))
        .route("/static/missing.css", get(missing_stylesheet))
        .route("/fonts/inter.woff2", get(font))
        .route("/redirect", get(redirect))
        .route("/nocontent", get(no_content))
        .route("/notmod", get(not_modified))
        .route("/gzipped", get(gzipped_page))
        .route("/latin1", get(latin1_page))
        .route("/echo", post(echo))
        .with_state(site.clone());
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    site
}

fn make_state(target: &str, cache_dir: Option<PathBuf>, public_dir: Option<PathBuf>) -> AppState {
    let relay_http = reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap();
    AppState {
        hub: HubClient::new(reqwest::Client::new(), "http://127.0.0.1:1", "token"),
        relay: Relay::new(relay_http, target, cache_dir.map(AssetCache::new)).unwrap(),
        playback: Default::default(),
        default_player: None,
        public_url: None,
        capture: None,
        public_dir,
    }
}

fn get_req(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn body_text(response: Response) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn content_type(response: &Response) -> String {
    response
        .headers()
        .get(header::CONTENT_TYPE)
        .map(|v| v.to_str().unwrap().to_string())
        .unwrap_or_default()
}

// ── HTML rewriting ────────────────────────────────────────────────────────────

#[tokio::test]
async fn html_gets_script_injected_before_body_close() {
    let site = spawn_site().await;
    let response = build_router(make_state(&site.origin, None, None))
        .oneshot(get_req("/page"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let text = body_text(response).await;
    assert!(
        text.ends_with(&format!("{INJECTED_TAG}</BODY></html>")),
        "Expected script before </BODY>:\n{text}"
    );
    assert_eq!(text.matches(INJECTED_TAG).count(), 1);
}

#[tokio::test]
async fn html_links_to_target_become_relative() {
    let site = spawn_site().await;
    let response = build_router(make_state(&site.origin, None, None))
        .oneshot(get_req("/page"))
        .await
        .unwrap();
    let text = body_text(response).await;
    assert!(text.contains(r#"href="/about""#), "Expected relative link:\n{text}");
    assert!(text.contains(r#"href="/static/site.css""#), "Expected relative stylesheet:\n{text}");
    assert!(!text.contains(&site.origin), "Origin left in page:\n{text}");
}

#[tokio::test]
async fn html_csp_header_is_dropped() {
    let site = spawn_site().await;
    let response = build_router(make_state(&site.origin, None, None))
        .oneshot(get_req("/page"))
        .await
        .unwrap();
    assert!(response.headers().get(header::CONTENT_SECURITY_POLICY).is_none());
    assert!(content_type(&response).starts_with("text/html"));
}

#[tokio::test]
async fn bodiless_html_responses_stay_empty() {
    let site = spawn_site().await;
    let app = build_router(make_state(&site.origin, None, None));

    let no_content = app.clone().oneshot(get_req("/nocontent")).await.unwrap();
    assert_eq!(no_content.status(), StatusCode::NO_CONTENT);
    assert_eq!(body_text(no_content).await, "");

    let revalidated = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/notmod")
                .header(header::IF_NONE_MATCH, "\"v1\"")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(revalidated.status(), StatusCode::NOT_MODIFIED);
    assert_eq!(body_text(revalidated).await, "");

    let head = app
        .oneshot(Request::builder().method("HEAD").uri("/page").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(head.status(), StatusCode::OK);
    assert_eq!(body_text(head).await, "");
}

#[tokio::test]
async fn still_encoded_html_is_passed_through_untouched() {
    let site = spawn_site().await;
    let response = build_router(make_state(&site.origin, None, None))
        .oneshot(get_req("/gzipped"))
        .await
        .unwrap();
    assert_eq!(response.headers()[header::CONTENT_ENCODING], "gzip");
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&bytes[..], GZIPPED_PAGE);
}

#[tokio::test]
async fn non_utf8_html_is_passed_through_untouched() {
    let site = spawn_site().await;
    let response = build_router(make_state(&site.origin, None, None))
        .oneshot(get_req("/latin1"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&bytes[..], LATIN1_PAGE);
}

// ── headers / content types ───────────────────────────────────────────────────

#[tokio::test]
async fn stylesheet_served_as_text_plain_is_corrected() {
    let site = spawn_site().await;
    let response = build_router(make_state(&site.origin, None, None))
        .oneshot(get_req("/static/site.css"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(content_type(&response), "text/css; charset=utf-8");
    assert_eq!(body_text(response).await, "body{margin:0}");
}

#[tokio::test]
async fn redirect_is_passed_through_with_relative_location() {
    let site = spawn_site().await;
    let response = build_router(make_state(&site.origin, None, None))
        .oneshot(get_req("/redirect"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(response.headers()[header::LOCATION], "/login?next=%2F");
    assert_eq!(response.headers()[header::SET_COOKIE], "sid=abc; Path=/");
}

#[tokio::test]
async fn post_body_and_cookies_are_forwarded_uncompressed() {
    let site = spawn_site().await;
    let response = build_router(make_state(&site.origin, None, None))
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/echo")
                // brotli is not enabled on the relay's own compression layer
                .header(header::ACCEPT_ENCODING, "br")
                .header(header::COOKIE, "sid=abc")
                .header(header::CONTENT_TYPE, "text/plain")
                .body(Body::from("hello upstream"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let echoed: Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(echoed["body"], "hello upstream");
    assert_eq!(echoed["accept_encoding"], "identity");
    assert_eq!(echoed["cookie"], "sid=abc");
}

#[tokio::test]
async fn oversized_request_body_returns_413() {
    let response = build_router(make_state("http://127.0.0.1:1", None, None))
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/upload")
                .body(Body::from(vec![b'x'; MAX_REQUEST_BODY + 1]))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn unreachable_upstream_returns_500_json() {
    let response = build_router(make_state("http://127.0.0.1:1", None, None))
        .oneshot(get_req("/anything"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(body["error"], "Failed to reach upstream site");
}

// ── asset cache ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn cached_asset_is_served_from_disk_on_second_request() {
    let site = spawn_site().await;
    let cache_dir = tempfile::tempdir().unwrap();
    let app = build_router(make_state(&site.origin, Some(cache_dir.path().to_path_buf()), None));

    let first = app.clone().oneshot(get_req("/static/site.css")).await.unwrap();
    assert_eq!(first.headers()["x-familystream-cache"], "miss");
    assert_eq!(body_text(first).await, "body{margin:0}");
    assert!(cache_dir.path().join("static/site.css").is_file());

    let second = app.oneshot(get_req("/static/site.css")).await.unwrap();
    assert_eq!(second.status(), StatusCode::OK);
    assert_eq!(second.headers()["x-familystream-cache"], "hit");
    assert_eq!(content_type(&second), "text/css; charset=utf-8");
    assert_eq!(body_text(second).await, "body{margin:0}");
    assert_eq!(site.stylesheet_hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn cached_binary_asset_keeps_exact_bytes() {
    let site = spawn_site().await;
    let cache_dir = tempfile::tempdir().unwrap();
    let app = build_router(make_state(&site.origin, Some(cache_dir.path().to_path_buf()), None));

    let response = app.oneshot(get_req("/fonts/inter.woff2")).await.unwrap();
    assert_eq!(content_type(&response), "font/woff2");
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&bytes[..], &[0x77, 0x4f, 0x46, 0x32]);
    assert_eq!(
        std::fs::read(cache_dir.path().join("fonts/inter.woff2")).unwrap(),
        vec![0x77, 0x4f, 0x46, 0x32]
    );
}

#[tokio::test]
async fn error_responses_are_not_cached() {
    let site = spawn_site().await;
    let cache_dir = tempfile::tempdir().unwrap();
    let app = build_router(make_state(&site.origin, Some(cache_dir.path().to_path_buf()), None));

    let response = app.oneshot(get_req("/static/missing.css")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(!cache_dir.path().join("static/missing.css").exists());
}

#[tokio::test]
async fn html_pages_are_never_cached() {
    let site = spawn_site().await;
    let cache_dir = tempfile::tempdir().unwrap();
    let app = build_router(make_state(&site.origin, Some(cache_dir.path().to_path_buf()), None));

    let response = app.oneshot(get_req("/page")).await.unwrap();
    assert!(response.headers().get("x-familystream-cache").is_none());
    assert_eq!(std::fs::read_dir(cache_dir.path()).unwrap().count(), 0);
}

// ── public dir ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn public_dir_files_win_and_misses_fall_through_to_proxy() {
    let site = spawn_site().await;
    let public = tempfile::tempdir().unwrap();
    std::fs::write(public.path().join("hello.txt"), "served locally").unwrap();
    let app = build_router(make_state(&site.origin, None, Some(public.path().to_path_buf())));

    let local = app.clone().oneshot(get_req("/hello.txt")).await.unwrap();
    assert_eq!(local.status(), StatusCode::OK);
    assert_eq!(body_text(local).await, "served locally");

    let proxied = app.clone().oneshot(get_req("/page")).await.unwrap();
    assert_eq!(proxied.status(), StatusCode::OK);
    assert!(body_text(proxied).await.contains(INJECTED_TAG));

    let posted = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/echo")
                .body(Body::from("through"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(posted.status(), StatusCode::OK);
}
