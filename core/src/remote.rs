mod auth;
mod playlists;

pub use auth::{AuthClient, AuthError, Session, SignUpOutcome};
pub use playlists::{FetchError, PlaylistSource, remix_url, watch_url};

use once_cell::sync::Lazy;

/// Shared HTTP client for every remote call.
static HTTP: Lazy<reqwest::Client> = Lazy::new(reqwest::Client::new);

pub(crate) fn http_client() -> reqwest::Client {
    HTTP.clone()
}

/// True when `value` has the shape of a single video id (11 URL-safe chars).
pub fn looks_like_video_id(value: &str) -> bool {
    value.len() == 11
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}
