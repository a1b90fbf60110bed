use std::path::PathBuf;
use std::sync::{Arc, PoisonError, RwLock};

use reqwest::{Client, redirect};

use crate::config::{CaptureConfig, Config};
use crate::hub::HubClient;
use crate::playback::PlaybackState;
use crate::relay::{Relay, RelayError, cache::AssetCache};

/// Shared application state injected into all route handlers via axum::extract::State.
/// Every field is cheap to clone; the playback state is the only mutable part.
#[derive(Clone)]
pub struct AppState {
    pub hub: HubClient,
    pub relay: Relay,
    pub playback: Arc<RwLock<PlaybackState>>,
    pub default_player: Option<String>,
    /// External base URL of this relay, used to build the capture stream URL.
    pub public_url: Option<String>,
    /// `None` disables `/api/capture.mp3`.
    pub capture: Option<CaptureConfig>,
    /// Static files served ahead of the proxy. `None` sends everything unmatched upstream.
    pub public_dir: Option<PathBuf>,
}

impl AppState {
    pub fn from_config(config: &Config) -> Result<Self, RelayError> {
        // The hub client keeps reqwest's default redirect handling; the proxy must
        // pass redirects through to the browser instead of following them.
        let hub_http = Client::builder()
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .build()?;
        let relay_http = Client::builder()
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .redirect(redirect::Policy::none())
            .build()?;

        let cache = config.cache_dir.as_ref().map(AssetCache::new);
        Ok(AppState {
            hub: HubClient::new(hub_http, &config.hub_url, &config.token),
            relay: Relay::new(relay_http, &config.target_url, cache)?,
            playback: Arc::new(RwLock::new(PlaybackState::default())),
            default_player: config.default_media_player.clone(),
            public_url: config.public_url.clone(),
            capture: config.capture.clone(),
            public_dir: Some(config.public_dir.clone()),
        })
    }

    /// URL a media player can fetch the local capture from, when capture is usable.
    pub fn capture_url(&self) -> Option<String> {
        match (&self.capture, &self.public_url) {
            (Some(_), Some(base)) => Some(format!("{base}/api/capture.mp3")),
            _ => None,
        }
    }

    pub fn playback_snapshot(&self) -> PlaybackState {
        self.playback
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Apply `update` if `entity_id` is the tracked device.
    pub fn update_playback(&self, entity_id: &str, update: impl FnOnce(&mut PlaybackState)) {
        if !PlaybackState::tracks(entity_id, self.default_player.as_deref()) {
            return;
        }
        let mut playback = self.playback.write().unwrap_or_else(PoisonError::into_inner);
        update(&mut playback);
    }
}
