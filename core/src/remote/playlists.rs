use log::{debug, warn};
use serde::Deserialize;
use thiserror::Error;

use crate::config::{ConfigError, RemoteConfig};

const PLAYLIST_ITEMS_URL: &str = "https://www.googleapis.com/youtube/v3/playlistItems";
const PAGE_SIZE: u32 = 50;

/// Failure fetching a playlist.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The playlist source returned an error payload.
    #[error("playlist source rejected the request: {0}")]
    Api(String),
    #[error("playlist request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Client for the remote playlist source.
pub struct PlaylistSource {
    api_key: String,
    client: reqwest::Client,
}

impl PlaylistSource {
    /// Build a client from the startup configuration.
    ///
    /// Fails only when the API key is missing; that disables playlist
    /// features without touching the rest of the system.
    pub fn new(config: &RemoteConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            api_key: config.require_api_key()?.to_string(),
            client: super::http_client(),
        })
    }

    /// Fetch the ordered video ids of one playlist (first page, up to 50).
    pub async fn video_ids(&self, playlist_id: &str) -> Result<Vec<String>, FetchError> {
        debug!("fetching playlist {playlist_id}");
        let page_size = PAGE_SIZE.to_string();
        let response = self
            .client
            .get(PLAYLIST_ITEMS_URL)
            .query(&[
                ("part", "snippet"),
                ("playlistId", playlist_id),
                ("maxResults", page_size.as_str()),
                ("key", self.api_key.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        let payload: PlaylistItemsResponse = response.json().await?;
        if let Some(error) = payload.error {
            return Err(FetchError::Api(error.display()));
        }
        if !status.is_success() {
            return Err(FetchError::Api(format!("status {status}")));
        }

        let ids = extract_ids(payload);
        debug!("playlist {playlist_id}: {} videos", ids.len());
        Ok(ids)
    }

    /// Fetch a playlist, degrading every failure to an empty sequence.
    ///
    /// A missing id or an unreachable source must render as "no content"
    /// for that side, never crash the page.
    pub async fn video_ids_or_empty(&self, playlist_id: Option<&str>) -> Vec<String> {
        let Some(playlist_id) = playlist_id else {
            return Vec::new();
        };
        match self.video_ids(playlist_id).await {
            Ok(ids) => ids,
            Err(e) => {
                warn!("playlist {playlist_id} unavailable, substituting empty: {e}");
                Vec::new()
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct PlaylistItemsResponse {
    #[serde(default)]
    items: Vec<PlaylistItem>,
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct PlaylistItem {
    snippet: Option<Snippet>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Snippet {
    resource_id: Option<ResourceId>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResourceId {
    video_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    code: Option<i64>,
    message: Option<String>,
}

impl ApiError {
    fn display(&self) -> String {
        match (&self.message, self.code) {
            (Some(message), _) => message.clone(),
            (None, Some(code)) => format!("error {code}"),
            (None, None) => "unknown error".to_string(),
        }
    }
}

fn extract_ids(payload: PlaylistItemsResponse) -> Vec<String> {
    payload
        .items
        .into_iter()
        .filter_map(|item| item.snippet?.resource_id?.video_id)
        .filter(|id| {
            let ok = super::looks_like_video_id(id);
            if !ok {
                warn!("skipping malformed video id {id:?} in playlist payload");
            }
            ok
        })
        .collect()
}

/// External short-form remix URL for a video.
pub fn remix_url(video_id: &str) -> String {
    format!("https://www.youtube.com/shorts/remix/{video_id}")
}

/// Plain watch URL for a video.
pub fn watch_url(video_id: &str) -> String {
    format!("https://www.youtube.com/watch?v={video_id}")
}
