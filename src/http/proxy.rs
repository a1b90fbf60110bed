use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
};

use crate::error::ApiError;
use crate::http::state::AppState;

/// Largest request body forwarded upstream; the whole body is buffered first.
pub const MAX_REQUEST_BODY: usize = 16 * 1024 * 1024;

/// Fallback handler: everything not served locally goes to the target site.
pub async fn relay_request(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Body,
) -> Response {
    let body = match axum::body::to_bytes(body, MAX_REQUEST_BODY).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!("Rejecting {} {}: request body unreadable or too large: {}", method, uri, e);
            return StatusCode::PAYLOAD_TOO_LARGE.into_response();
        }
    };

    match state.relay.forward(method.clone(), &uri, &headers, body).await {
        Ok(response) => response,
        Err(e) => {
            tracing::error!("Proxying {} {} failed: {}", method, uri, e);
            ApiError::internal("Failed to reach upstream site", e).into_response()
        }
    }
}
