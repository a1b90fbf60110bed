use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Entity id prefix of the hub's media-player domain.
pub const MEDIA_PLAYER_PREFIX: &str = "media_player.";

/// One entry of `GET /api/states`; only the fields the relay reads.
#[derive(Debug, Clone, Deserialize)]
pub struct EntityState {
    pub entity_id: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub attributes: serde_json::Map<String, serde_json::Value>,
}

impl EntityState {
    pub fn is_media_player(&self) -> bool {
        self.entity_id.starts_with(MEDIA_PLAYER_PREFIX)
    }

    /// `attributes.friendly_name`, falling back to the entity id.
    pub fn display_name(&self) -> String {
        self.attributes
            .get("friendly_name")
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty())
            .unwrap_or(&self.entity_id)
            .to_string()
    }
}

/// Media player as exposed by `GET /api/media_players`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaPlayer {
    pub entity_id: String,
    pub name: String,
    pub state: String,
}

impl From<EntityState> for MediaPlayer {
    fn from(entity: EntityState) -> Self {
        MediaPlayer {
            name: entity.display_name(),
            entity_id: entity.entity_id,
            state: entity.state,
        }
    }
}

/// Track metadata attached to a `play_media` call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrackMetadata {
    pub title: String,
    pub artist: String,
}

/// Transport commands accepted by `POST /api/media_control`.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum MediaAction {
    Play,
    Pause,
    Stop,
}

impl MediaAction {
    /// Hub service implementing this action in the `media_player` domain.
    pub fn service(self) -> &'static str {
        match self {
            MediaAction::Play => "media_play",
            MediaAction::Pause => "media_pause",
            MediaAction::Stop => "media_stop",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MediaAction::Play => "play",
            MediaAction::Pause => "pause",
            MediaAction::Stop => "stop",
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown media action: {0:?}")]
pub struct UnknownAction(pub String);

impl FromStr for MediaAction {
    type Err = UnknownAction;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "play" => Ok(MediaAction::Play),
            "pause" => Ok(MediaAction::Pause),
            "stop" => Ok(MediaAction::Stop),
            other => Err(UnknownAction(other.to_string())),
        }
    }
}
