use std::env;
use std::time::Duration;

use thiserror::Error;

/// How a coordinated pair is presented.
///
/// There is exactly one coordinator implementation; layout only selects
/// tuning defaults and labels log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairLayout {
    /// Side-by-side short-form pair, always active.
    Vertical,
    /// Stacked wide pair, active only while a session exists.
    Horizontal,
}

impl PairLayout {
    pub fn label(self) -> &'static str {
        match self {
            PairLayout::Vertical => "vertical",
            PairLayout::Horizontal => "horizontal",
        }
    }
}

/// Tuning knobs for a coordinated pair.
#[derive(Debug, Clone)]
pub struct PairTuning {
    /// Delay between issuing the same command to the leader and the follower.
    ///
    /// Embeds tend to drop one of two commands issued in the same tick;
    /// the exact value is tuned, not load-bearing.
    pub stagger: Duration,
    /// Timeline poll period while playing.
    pub sample_interval: Duration,
    /// Delay before probing the leader for duration after it reports ready.
    pub duration_probe_delay: Duration,
    /// Initial volume for the left player (0-100).
    pub volume_left: u8,
    /// Initial volume for the right player (0-100).
    pub volume_right: u8,
    /// Initial playback rate.
    pub initial_speed: f64,
    /// Restart both sides from zero once both have ended.
    pub loop_enabled: bool,
    /// Lowest selectable playback rate.
    pub min_speed: f64,
    /// Highest selectable playback rate.
    pub max_speed: f64,
}

impl Default for PairTuning {
    fn default() -> Self {
        Self {
            stagger: Duration::from_millis(50),
            sample_interval: Duration::from_millis(500),
            duration_probe_delay: Duration::from_millis(500),
            volume_left: 100,
            volume_right: 75,
            initial_speed: 1.0,
            loop_enabled: true,
            min_speed: 0.25,
            max_speed: 2.0,
        }
    }
}

impl PairTuning {
    /// Defaults for a given layout.
    ///
    /// The vertical pair ships with the right side quieter so the two
    /// audio tracks do not compete; the horizontal pair starts balanced.
    pub fn for_layout(layout: PairLayout) -> Self {
        match layout {
            PairLayout::Vertical => Self::default(),
            PairLayout::Horizontal => Self {
                volume_right: 100,
                ..Self::default()
            },
        }
    }

    /// Clamp a requested playback rate into the selectable range.
    pub fn clamp_speed(&self, speed: f64) -> f64 {
        if !speed.is_finite() {
            return self.initial_speed;
        }
        speed.clamp(self.min_speed, self.max_speed)
    }
}

/// A left/right pair of playlist identifiers.
#[derive(Debug, Clone, Default)]
pub struct PlaylistIds {
    pub left: Option<String>,
    pub right: Option<String>,
}

/// Remote service credentials and playlist ids, read once at startup and
/// passed by reference from there on.
///
/// Every field is optional: a missing credential disables the features
/// that depend on it but must not take the rest of the system down.
#[derive(Debug, Clone, Default)]
pub struct RemoteConfig {
    /// API key for the playlist source.
    pub youtube_api_key: Option<String>,
    /// Playlist ids for the always-active vertical pair.
    pub vertical_playlists: PlaylistIds,
    /// Playlist ids for the session-gated horizontal pair.
    pub horizontal_playlists: PlaylistIds,
    /// Base URL of the auth backend.
    pub auth_url: Option<String>,
    /// Public (anon) API key of the auth backend.
    pub auth_anon_key: Option<String>,
}

impl RemoteConfig {
    /// Read the configuration from the process environment.
    pub fn from_env() -> Self {
        Self {
            youtube_api_key: env_var("YOUTUBE_API_KEY"),
            vertical_playlists: PlaylistIds {
                left: env_var("YOUTUBE_PLAYLIST_ID_1"),
                right: env_var("YOUTUBE_PLAYLIST_ID_2"),
            },
            horizontal_playlists: PlaylistIds {
                left: env_var("H_PLAYLIST_ID_1"),
                right: env_var("H_PLAYLIST_ID_2"),
            },
            auth_url: env_var("SUPABASE_URL"),
            auth_anon_key: env_var("SUPABASE_ANON_KEY"),
        }
    }

    /// Whether playlist fetching can work at all.
    pub fn playlists_configured(&self) -> bool {
        self.youtube_api_key.is_some()
    }

    /// Whether the auth backend is reachable in principle.
    pub fn auth_configured(&self) -> bool {
        self.auth_url.is_some() && self.auth_anon_key.is_some()
    }

    pub fn require_api_key(&self) -> Result<&str, ConfigError> {
        self.youtube_api_key
            .as_deref()
            .ok_or(ConfigError::MissingVar("YOUTUBE_API_KEY"))
    }

    pub fn require_auth(&self) -> Result<(&str, &str), ConfigError> {
        let url = self
            .auth_url
            .as_deref()
            .ok_or(ConfigError::MissingVar("SUPABASE_URL"))?;
        let key = self
            .auth_anon_key
            .as_deref()
            .ok_or(ConfigError::MissingVar("SUPABASE_ANON_KEY"))?;
        Ok((url, key))
    }
}

/// A required credential or id was absent at startup.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    #[error("missing environment variable {0}")]
    MissingVar(&'static str),
}

fn env_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}
