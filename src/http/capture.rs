use axum::{
    body::Body,
    extract::State,
    http::header,
    response::{IntoResponse, Response},
};

use crate::capture;
use crate::error::{ApiError, ApiResult};
use crate::http::state::AppState;

/// GET /api/capture.mp3: live MP3 of the local audio input, one ffmpeg per client.
pub async fn capture_stream(State(state): State<AppState>) -> ApiResult<Response> {
    let config = state
        .capture
        .as_ref()
        .ok_or_else(|| ApiError::not_found("Audio capture is disabled"))?;

    let stream = capture::start(config).map_err(|e| {
        tracing::error!("Failed to start audio capture: {}", e);
        ApiError::internal("Failed to start audio capture", e)
    })?;

    Ok((
        [
            (header::CONTENT_TYPE, "audio/mpeg"),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        Body::from_stream(stream),
    )
        .into_response())
}
