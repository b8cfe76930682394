mod sim;

pub use sim::SimulatedEmbed;

use std::fmt;
use thiserror::Error;

/// Which player of the pair a value refers to.
///
/// The left player is the leader: it is the timing authority for the
/// timeline display, and transport commands reach it first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Left,
    Right,
}

impl Side {
    /// The opposite side of the pair.
    pub fn other(self) -> Side {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }

    /// Stable array index for per-side storage.
    pub fn index(self) -> usize {
        match self {
            Side::Left => 0,
            Side::Right => 1,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Left => write!(f, "left"),
            Side::Right => write!(f, "right"),
        }
    }
}

/// Lifecycle state reported by an embed widget.
///
/// Produced from the widget's raw integer codes by [`PlaybackState::from_raw`];
/// raw codes never travel further than that mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Unstarted,
    Ended,
    Playing,
    Paused,
    Buffering,
    Cued,
    Error,
}

impl PlaybackState {
    /// Map a raw widget state code to a playback state.
    ///
    /// Returns `None` for codes this system does not recognize; callers
    /// treat those as a no-op rather than guessing.
    pub fn from_raw(code: i32) -> Option<PlaybackState> {
        match code {
            -1 => Some(PlaybackState::Unstarted),
            0 => Some(PlaybackState::Ended),
            1 => Some(PlaybackState::Playing),
            2 => Some(PlaybackState::Paused),
            3 => Some(PlaybackState::Buffering),
            5 => Some(PlaybackState::Cued),
            _ => None,
        }
    }

    /// True for every state other than `Playing`/`Buffering`.
    ///
    /// This is the cross-side pause consensus test: a buffering side still
    /// counts as making progress.
    pub fn is_stopped_like(self) -> bool {
        !matches!(self, PlaybackState::Playing | PlaybackState::Buffering)
    }

    pub fn is_playing(self) -> bool {
        matches!(self, PlaybackState::Playing)
    }

    pub fn is_ended(self) -> bool {
        matches!(self, PlaybackState::Ended)
    }
}

/// Configuration bag passed to the embed widget when a video is loaded.
#[derive(Debug, Clone)]
pub struct EmbedOptions {
    /// Allow playback inline instead of forcing native fullscreen.
    pub inline_playback: bool,
    /// Show the widget's own control bar.
    pub show_controls: bool,
    /// Suggest related content when playback stops.
    pub related_content: bool,
    /// Reduce provider branding on the widget.
    pub modest_branding: bool,
    /// Show the widget's own fullscreen button.
    pub fullscreen_button: bool,
    /// Show in-video annotations.
    pub annotations: bool,
    /// Start playback as soon as the widget loads.
    pub autoplay: bool,
}

impl Default for EmbedOptions {
    fn default() -> Self {
        // The pair supplies its own transport, so the widget chrome is off.
        Self {
            inline_playback: true,
            show_controls: false,
            related_content: false,
            modest_branding: true,
            fullscreen_button: false,
            annotations: false,
            autoplay: false,
        }
    }
}

impl EmbedOptions {
    /// Flatten to the widget's numeric player variables.
    pub fn player_vars(&self) -> Vec<(&'static str, i32)> {
        vec![
            ("playsinline", self.inline_playback as i32),
            ("controls", self.show_controls as i32),
            ("rel", self.related_content as i32),
            ("modestbranding", self.modest_branding as i32),
            ("fs", self.fullscreen_button as i32),
            // 1 shows annotations, 3 suppresses them
            ("iv_load_policy", if self.annotations { 1 } else { 3 }),
            ("autoplay", self.autoplay as i32),
        ]
    }

    /// The iframe URL a hosting page would load for `video_id` with these
    /// options.
    pub fn embed_url(&self, video_id: &str) -> String {
        let mut url = format!("https://www.youtube.com/embed/{video_id}");
        for (i, (name, value)) in self.player_vars().into_iter().enumerate() {
            url.push(if i == 0 { '?' } else { '&' });
            url.push_str(name);
            url.push('=');
            url.push_str(&value.to_string());
        }
        url
    }
}

/// Failure calling into an embed handle.
#[derive(Debug, Clone, Error)]
pub enum EmbedError {
    /// The underlying widget was torn down; the handle is dead.
    #[error("embed handle is stale")]
    Stale,
    /// The widget has not finished initializing.
    #[error("embed is not ready")]
    NotReady,
    /// The widget reported a backend failure.
    #[error("embed backend error: {0}")]
    Backend(String),
}

/// Control surface of one embedded player instance.
///
/// Every call may fail: the widget lives outside this process and the
/// handle can go stale at any moment (for example mid-teardown). Callers
/// must treat a failure as "assume stopped" and never panic on it.
pub trait EmbedHandle: Send + Sync {
    fn play(&self) -> Result<(), EmbedError>;
    fn pause(&self) -> Result<(), EmbedError>;
    fn seek_to(&self, seconds: f64, allow_seek_ahead: bool) -> Result<(), EmbedError>;
    /// Set the audio volume, 0-100.
    fn set_volume(&self, volume: u8) -> Result<(), EmbedError>;
    fn set_playback_rate(&self, rate: f64) -> Result<(), EmbedError>;
    fn current_time(&self) -> Result<f64, EmbedError>;
    fn duration(&self) -> Result<f64, EmbedError>;
    /// Raw state code as defined by the widget (see [`PlaybackState::from_raw`]).
    fn player_state(&self) -> Result<i32, EmbedError>;
    fn request_fullscreen(&self) -> Result<(), EmbedError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_state_mapping() {
        assert_eq!(PlaybackState::from_raw(-1), Some(PlaybackState::Unstarted));
        assert_eq!(PlaybackState::from_raw(0), Some(PlaybackState::Ended));
        assert_eq!(PlaybackState::from_raw(1), Some(PlaybackState::Playing));
        assert_eq!(PlaybackState::from_raw(2), Some(PlaybackState::Paused));
        assert_eq!(PlaybackState::from_raw(3), Some(PlaybackState::Buffering));
        assert_eq!(PlaybackState::from_raw(5), Some(PlaybackState::Cued));
    }

    #[test]
    fn test_unknown_codes_are_rejected() {
        assert_eq!(PlaybackState::from_raw(4), None);
        assert_eq!(PlaybackState::from_raw(42), None);
        assert_eq!(PlaybackState::from_raw(-7), None);
    }

    #[test]
    fn test_stopped_like_excludes_buffering() {
        assert!(PlaybackState::Paused.is_stopped_like());
        assert!(PlaybackState::Unstarted.is_stopped_like());
        assert!(PlaybackState::Cued.is_stopped_like());
        assert!(PlaybackState::Ended.is_stopped_like());
        assert!(PlaybackState::Error.is_stopped_like());
        assert!(!PlaybackState::Playing.is_stopped_like());
        assert!(!PlaybackState::Buffering.is_stopped_like());
    }

    #[test]
    fn test_default_options_suppress_widget_chrome() {
        let vars = EmbedOptions::default().player_vars();
        let lookup = |k: &str| vars.iter().find(|(n, _)| *n == k).map(|(_, v)| *v);

        assert_eq!(lookup("playsinline"), Some(1));
        assert_eq!(lookup("controls"), Some(0));
        assert_eq!(lookup("rel"), Some(0));
        assert_eq!(lookup("modestbranding"), Some(1));
        assert_eq!(lookup("fs"), Some(0));
        assert_eq!(lookup("iv_load_policy"), Some(3));
        assert_eq!(lookup("autoplay"), Some(0));
    }

    #[test]
    fn test_embed_url_carries_the_player_vars() {
        let url = EmbedOptions::default().embed_url("dQw4w9WgXcQ");
        assert_eq!(
            url,
            "https://www.youtube.com/embed/dQw4w9WgXcQ\
             ?playsinline=1&controls=0&rel=0&modestbranding=1\
             &fs=0&iv_load_policy=3&autoplay=0"
        );
    }

    #[test]
    fn test_side_other_and_index() {
        assert_eq!(Side::Left.other(), Side::Right);
        assert_eq!(Side::Right.other(), Side::Left);
        assert_eq!(Side::Left.index(), 0);
        assert_eq!(Side::Right.index(), 1);
        assert_eq!(Side::Left.to_string(), "left");
    }
}
