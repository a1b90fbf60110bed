pub mod api;
pub mod capture;
pub mod controls;
pub mod proxy;
pub mod state;

use axum::{
    Router,
    handler::Handler,
    http::Method,
    routing::{get, post},
};
use tower_http::{
    compression::{CompressionLayer, DefaultPredicate, Predicate, predicate::NotForContentType},
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};

use crate::http::state::AppState;
use crate::relay::rewrite::INJECTED_SCRIPT_PATH;

pub fn build_router(state: AppState) -> Router {
    let router = Router::new()
        .route("/api/media_players", get(api::list_media_players))
        .route("/api/play", post(api::play))
        .route("/api/media_control", post(api::media_control))
        .route("/api/volume", post(api::volume))
        .route("/api/now_playing", get(api::now_playing))
        .route("/api/capture.mp3", get(capture::capture_stream))
        .route("/controls", get(controls::serve_controls))
        .route(INJECTED_SCRIPT_PATH, get(controls::serve_integration_script));

    // Local static files win over the proxy; misses (any method) fall through upstream.
    let router = match &state.public_dir {
        Some(dir) => router.fallback_service(
            ServeDir::new(dir)
                .call_fallback_on_method_not_allowed(true)
                .fallback(proxy::relay_request.with_state(state.clone())),
        ),
        None => router.fallback(proxy::relay_request),
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::HEAD,
            Method::PUT,
            Method::PATCH,
            Method::POST,
            Method::DELETE,
        ])
        .allow_headers(Any);
    // live audio is already compressed and must not be buffered by the encoder
    let compression = CompressionLayer::new()
        .compress_when(DefaultPredicate::new().and(NotForContentType::const_new("audio/")));

    router
        .layer(compression)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
