//! JSON API translating player commands into hub service calls.

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::error::{ApiError, ApiResult};
use crate::http::state::AppState;
use crate::hub::{HubError, MediaAction, MediaPlayer, TrackMetadata};
use crate::playback::PlaybackState;

/// Artist reported to the hub when a titled track has none.
const DEFAULT_ARTIST: &str = "FamilyStream";

#[derive(Debug, Default, Deserialize)]
pub struct PlayRequest {
    pub entity_id: Option<String>,
    pub url: Option<String>,
    pub title: Option<String>,
    pub artist: Option<String>,
    pub volume: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct MediaControlRequest {
    pub entity_id: Option<String>,
    pub action: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct VolumeRequest {
    pub entity_id: Option<String>,
    pub volume: Option<f64>,
}

fn success() -> Json<Value> {
    Json(json!({ "success": true }))
}

/// Unwrap a JSON body, turning a malformed one into a 400 with the usual error shape.
fn body<T>(payload: Result<Json<T>, JsonRejection>) -> ApiResult<T> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| ApiError::bad_request(rejection.body_text()))
}

/// Log a hub failure and map it to a 500 carrying `message`.
fn hub_failure(message: &'static str) -> impl FnOnce(HubError) -> ApiError {
    move |e| {
        tracing::error!("{}: {}", message, e);
        ApiError::internal(message, e)
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

/// The request's entity, else the configured default player.
fn resolve_entity(state: &AppState, entity_id: Option<String>) -> ApiResult<String> {
    non_empty(entity_id)
        .or_else(|| state.default_player.clone())
        .ok_or_else(|| ApiError::bad_request("Media player entity ID is required"))
}

fn check_volume(volume: f64) -> ApiResult<f64> {
    if (0.0..=1.0).contains(&volume) {
        Ok(volume)
    } else {
        Err(ApiError::bad_request("Volume must be a value between 0 and 1"))
    }
}

/// GET /api/media_players
pub async fn list_media_players(State(state): State<AppState>) -> ApiResult<Json<Vec<MediaPlayer>>> {
    let players = state
        .hub
        .media_players()
        .await
        .map_err(hub_failure("Failed to fetch media players"))?;
    tracing::debug!("Hub reported {} media players", players.len());
    Ok(Json(players))
}

/// POST /api/play
pub async fn play(
    State(state): State<AppState>,
    payload: Result<Json<PlayRequest>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let req = body(payload)?;
    let entity_id = resolve_entity(&state, req.entity_id)?;
    let url = non_empty(req.url)
        .or_else(|| state.capture_url())
        .ok_or_else(|| ApiError::bad_request("Stream URL is required"))?;
    let volume = req.volume.map(check_volume).transpose()?;
    let title = non_empty(req.title);
    let artist = non_empty(req.artist);

    tracing::info!(
        "Playing \"{}\" by \"{}\" on {} with URL: {}",
        title.as_deref().unwrap_or_default(),
        artist.as_deref().unwrap_or_default(),
        entity_id,
        url
    );

    let metadata = title.as_ref().map(|title| TrackMetadata {
        title: title.clone(),
        artist: artist.clone().unwrap_or_else(|| DEFAULT_ARTIST.to_string()),
    });
    state
        .hub
        .play_media(&entity_id, &url, metadata.as_ref())
        .await
        .map_err(hub_failure("Failed to play media"))?;
    // the device is playing now, whatever happens to the volume call
    state.update_playback(&entity_id, |playback| {
        playback.record_play(&entity_id, &url, title.as_deref(), artist.as_deref())
    });

    if let Some(volume) = volume {
        state
            .hub
            .set_volume(&entity_id, volume)
            .await
            .map_err(hub_failure("Failed to play media"))?;
    }
    Ok(success())
}

/// POST /api/media_control
pub async fn media_control(
    State(state): State<AppState>,
    payload: Result<Json<MediaControlRequest>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let req = body(payload)?;
    let entity_id = resolve_entity(&state, req.entity_id)?;
    let action: MediaAction = req
        .action
        .as_deref()
        .unwrap_or_default()
        .parse()
        .map_err(|_| ApiError::bad_request("Invalid action. Must be play, pause, or stop"))?;

    tracing::info!("Sending {} command to {}", action.as_str(), entity_id);
    state
        .hub
        .control(&entity_id, action)
        .await
        .map_err(hub_failure("Failed to control media"))?;

    state.update_playback(&entity_id, |playback| playback.record_control(&entity_id, action));
    Ok(success())
}

/// POST /api/volume
pub async fn volume(
    State(state): State<AppState>,
    payload: Result<Json<VolumeRequest>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let req = body(payload)?;
    let entity_id = resolve_entity(&state, req.entity_id)?;
    let volume = req
        .volume
        .ok_or_else(|| ApiError::bad_request("Volume must be a value between 0 and 1"))
        .and_then(check_volume)?;

    tracing::info!("Setting volume to {} on {}", volume, entity_id);
    state
        .hub
        .set_volume(&entity_id, volume)
        .await
        .map_err(hub_failure("Failed to set volume"))?;
    Ok(success())
}

/// GET /api/now_playing
pub async fn now_playing(State(state): State<AppState>) -> Json<PlaybackState> {
    Json(state.playback_snapshot())
}
