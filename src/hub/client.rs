use reqwest::{Client, StatusCode, header};
use serde::Serialize;
use serde_json::json;

use crate::hub::entity::{EntityState, MediaAction, MediaPlayer, TrackMetadata};

/// Service domain every call goes through.
const MEDIA_PLAYER_DOMAIN: &str = "media_player";

#[derive(Debug, thiserror::Error)]
pub enum HubError {
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("hub answered {status} for {url}: {body}")]
    Status {
        url: String,
        status: StatusCode,
        body: String,
    },
}

/// REST client for the automation hub (Home Assistant core API).
///
/// Cheap to clone: `reqwest::Client` is internally reference counted.
#[derive(Clone, Debug)]
pub struct HubClient {
    client: Client,
    base_url: String,
    token: String,
}

impl HubClient {
    /// `base_url` is the API root without the `/api` suffix, e.g. `http://supervisor/core`.
    pub fn new(client: Client, base_url: impl Into<String>, token: impl Into<String>) -> Self {
        HubClient {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        }
    }

    /// All `media_player.*` entities known to the hub.
    pub async fn media_players(&self) -> Result<Vec<MediaPlayer>, HubError> {
        let url = format!("{}/api/states", self.base_url);
        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.token)
            .header(header::CONTENT_TYPE, "application/json")
            .send()
            .await
            .map_err(|source| HubError::Request { url: url.clone(), source })?;
        let response = check_status(&url, response).await?;
        let states: Vec<EntityState> = response
            .json()
            .await
            .map_err(|source| HubError::Request { url: url.clone(), source })?;

        Ok(states
            .into_iter()
            .filter(EntityState::is_media_player)
            .map(MediaPlayer::from)
            .collect())
    }

    /// Invoke `media_player.<service>` with a JSON payload.
    pub async fn call_service<P: Serialize + ?Sized>(
        &self,
        service: &str,
        payload: &P,
    ) -> Result<(), HubError> {
        let url = format!(
            "{}/api/services/{}/{}",
            self.base_url, MEDIA_PLAYER_DOMAIN, service
        );
        tracing::debug!("POST {}", url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .json(payload)
            .send()
            .await
            .map_err(|source| HubError::Request { url: url.clone(), source })?;
        check_status(&url, response).await?;
        Ok(())
    }

    pub async fn play_media(
        &self,
        entity_id: &str,
        url: &str,
        metadata: Option<&TrackMetadata>,
    ) -> Result<(), HubError> {
        let mut payload = json!({
            "entity_id": entity_id,
            "media_content_id": url,
            "media_content_type": "music",
        });
        if let Some(metadata) = metadata {
            payload["metadata"] = json!(metadata);
        }
        self.call_service("play_media", &payload).await
    }

    pub async fn set_volume(&self, entity_id: &str, level: f64) -> Result<(), HubError> {
        self.call_service(
            "volume_set",
            &json!({ "entity_id": entity_id, "volume_level": level }),
        )
        .await
    }

    pub async fn control(&self, entity_id: &str, action: MediaAction) -> Result<(), HubError> {
        self.call_service(action.service(), &json!({ "entity_id": entity_id }))
            .await
    }
}

async fn check_status(url: &str, response: reqwest::Response) -> Result<reqwest::Response, HubError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(HubError::Status {
        url: url.to_string(),
        status,
        body,
    })
}
