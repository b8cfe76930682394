pub mod config;
pub mod embed;
pub mod playlist;
pub mod remote;
pub mod sync;

// Re-exports
pub use config::{PairLayout, PairTuning, PlaylistIds, RemoteConfig};
pub use embed::{EmbedHandle, EmbedOptions, PlaybackState, Side, SimulatedEmbed};
pub use playlist::{PlaylistNavigator, SidePair};
pub use remote::{
    AuthClient, AuthError, FetchError, PlaylistSource, Session, SignUpOutcome,
    looks_like_video_id, remix_url, watch_url,
};
pub use sync::{PairCoordinator, PlaybackClock, format_time};
