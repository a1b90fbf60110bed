use serde::Serialize;

use crate::hub::MediaAction;

/// Last-known playback state of the tracked media player.
///
/// Only commands sent through this relay are reflected; the hub is never polled.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PlaybackState {
    pub entity_id: Option<String>,
    pub title: Option<String>,
    pub artist: Option<String>,
    pub stream_url: Option<String>,
    pub playing: bool,
}

impl PlaybackState {
    /// Whether commands for `entity_id` update this state.
    ///
    /// With a default player configured only that device is tracked; otherwise the
    /// most recently commanded entity is.
    pub fn tracks(entity_id: &str, default_player: Option<&str>) -> bool {
        default_player.is_none_or(|d| d == entity_id)
    }

    pub fn record_play(
        &mut self,
        entity_id: &str,
        stream_url: &str,
        title: Option<&str>,
        artist: Option<&str>,
    ) {
        *self = PlaybackState {
            entity_id: Some(entity_id.to_string()),
            title: title.map(str::to_string),
            artist: artist.map(str::to_string),
            stream_url: Some(stream_url.to_string()),
            playing: true,
        };
    }

    pub fn record_control(&mut self, entity_id: &str, action: MediaAction) {
        if self.entity_id.as_deref() != Some(entity_id) {
            // different device than the one we last started: metadata is unknown
            *self = PlaybackState {
                entity_id: Some(entity_id.to_string()),
                ..PlaybackState::default()
            };
        }
        match action {
            MediaAction::Play => self.playing = true,
            MediaAction::Pause => self.playing = false,
            MediaAction::Stop => {
                self.playing = false;
                self.stream_url = None;
            }
        }
    }
}
