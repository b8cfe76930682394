use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, warn};
use tokio::sync::watch;

use duoplay_core::{
    AuthClient, EmbedOptions, PairCoordinator, PairLayout, PairTuning, PlaylistIds,
    PlaylistNavigator, PlaylistSource, RemoteConfig, Session, Side, SimulatedEmbed, format_time,
};

/// Command-line overrides for the pair tuning.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub stagger_ms: Option<u64>,
    pub sample_ms: Option<u64>,
    pub no_loop: bool,
}

impl Overrides {
    fn apply(&self, mut tuning: PairTuning) -> PairTuning {
        if let Some(ms) = self.stagger_ms {
            tuning.stagger = Duration::from_millis(ms);
        }
        if let Some(ms) = self.sample_ms {
            tuning.sample_interval = Duration::from_millis(ms);
        }
        if self.no_loop {
            tuning.loop_enabled = false;
        }
        tuning
    }
}

// App state
pub struct App {
    /// Startup configuration read from the environment.
    pub remote: RemoteConfig,
    /// Playlist source client, absent when the API key is missing.
    pub playlists: Option<PlaylistSource>,
    /// Auth backend client, absent when auth is not configured.
    pub auth: Option<AuthClient>,
    /// Always-active pair.
    pub vertical: PairSession,
    /// Session-gated pair, present only while signed in.
    pub horizontal: Option<PairSession>,
    /// Which pair the transport commands currently address.
    pub active: PairLayout,
    /// Status message to display after the current command.
    pub status: Option<String>,
    /// Whether the app should exit.
    pub should_quit: bool,
    overrides: Overrides,
    session_rx: Option<watch::Receiver<Option<Session>>>,
}

impl App {
    pub fn new(remote: RemoteConfig, overrides: Overrides) -> Self {
        let playlists = match PlaylistSource::new(&remote) {
            Ok(source) => Some(source),
            Err(e) => {
                warn!("playlist source disabled: {e}");
                None
            }
        };
        let auth = match AuthClient::new(&remote) {
            Ok(client) => Some(client),
            Err(e) => {
                warn!("auth backend disabled: {e}");
                None
            }
        };
        let session_rx = auth.as_ref().map(|a| a.subscribe());
        let vertical = PairSession::new(
            PairLayout::Vertical,
            overrides.apply(PairTuning::for_layout(PairLayout::Vertical)),
        );
        Self {
            remote,
            playlists,
            auth,
            vertical,
            horizontal: None,
            active: PairLayout::Vertical,
            status: None,
            should_quit: false,
            overrides,
            session_rx,
        }
    }

    /// Fetch the vertical pair's playlists and load its first pair.
    pub async fn init(&mut self) {
        let ids = self.remote.vertical_playlists.clone();
        self.vertical
            .load_sources(self.playlists.as_ref(), &ids)
            .await;
    }

    /// The pair the transport commands currently address.
    pub fn active_session(&mut self) -> &mut PairSession {
        match self.active {
            PairLayout::Horizontal => self.horizontal.as_mut().unwrap_or(&mut self.vertical),
            PairLayout::Vertical => &mut self.vertical,
        }
    }

    pub fn session(&self) -> Option<Session> {
        self.auth.as_ref().and_then(|a| a.session())
    }

    pub fn set_status(&mut self, message: impl Into<String>) {
        self.status = Some(message.into());
    }

    pub fn take_status(&mut self) -> Option<String> {
        self.status.take()
    }

    /// Pick up a session change published by the auth client and flip the
    /// session-gated playlist sources accordingly.
    pub async fn sync_session(&mut self) {
        let changed = match &mut self.session_rx {
            Some(rx) if rx.has_changed().unwrap_or(false) => Some(rx.borrow_and_update().clone()),
            _ => None,
        };
        if let Some(session) = changed {
            self.apply_session(session).await;
        }
    }

    async fn apply_session(&mut self, session: Option<Session>) {
        match session {
            Some(session) => {
                info!(
                    "session active for {}",
                    session.email.as_deref().unwrap_or("<unknown>")
                );
                if self.horizontal.is_none() {
                    let mut pair = PairSession::new(
                        PairLayout::Horizontal,
                        self.overrides
                            .apply(PairTuning::for_layout(PairLayout::Horizontal)),
                    );
                    let ids = self.remote.horizontal_playlists.clone();
                    pair.load_sources(self.playlists.as_ref(), &ids).await;
                    self.horizontal = Some(pair);
                    self.set_status("Signed in; horizontal pair activated (try 'pair h').");
                }
            }
            None => {
                info!("session ended, deactivating the horizontal pair");
                self.horizontal = None;
                self.active = PairLayout::Vertical;
                self.set_status("Signed out.");
            }
        }
    }
}

/// One coordinated pair plus its playlists and simulated embeds.
pub struct PairSession {
    pub layout: PairLayout,
    pub coordinator: PairCoordinator,
    pub navigator: PlaylistNavigator,
    left: Option<Arc<SimulatedEmbed>>,
    right: Option<Arc<SimulatedEmbed>>,
}

impl PairSession {
    pub fn new(layout: PairLayout, tuning: PairTuning) -> Self {
        Self {
            layout,
            coordinator: PairCoordinator::with_tuning(layout, tuning),
            navigator: PlaylistNavigator::new(),
            left: None,
            right: None,
        }
    }

    /// Fetch both playlists (failures degrade to empty) and load the
    /// first pair.
    pub async fn load_sources(&mut self, source: Option<&PlaylistSource>, ids: &PlaylistIds) {
        let (left_ids, right_ids) = match source {
            Some(source) => (
                source.video_ids_or_empty(ids.left.as_deref()).await,
                source.video_ids_or_empty(ids.right.as_deref()).await,
            ),
            None => {
                warn!(
                    "{} pair: playlist source not configured, no content",
                    self.layout.label()
                );
                (Vec::new(), Vec::new())
            }
        };
        self.navigator.set_sequences(left_ids, right_ids);
        self.load_current();
    }

    /// Tear the embeds down and rebuild them for the navigator's current pair.
    pub fn load_current(&mut self) {
        let pair = self.navigator.current();
        self.coordinator.load_pair(&pair);
        self.left = spawn_embed(&self.coordinator, Side::Left, pair.get(Side::Left));
        self.right = spawn_embed(&self.coordinator, Side::Right, pair.get(Side::Right));
    }

    pub fn next(&mut self) {
        self.navigator.next();
        self.load_current();
    }

    pub fn previous(&mut self) {
        self.navigator.previous();
        self.load_current();
    }

    /// Advance the simulated embeds by `seconds` and pump their events.
    pub fn tick(&mut self, seconds: f64) {
        if let Some(embed) = &self.left {
            embed.advance(seconds);
        }
        if let Some(embed) = &self.right {
            embed.advance(seconds);
        }
        self.pump();
    }

    /// Forward raw state codes emitted by the embeds to the coordinator.
    pub fn pump(&self) {
        for (side, embed) in [(Side::Left, &self.left), (Side::Right, &self.right)] {
            if let Some(embed) = embed {
                for raw in embed.take_events() {
                    self.coordinator.on_state_change(side, raw);
                }
            }
        }
    }

    pub fn video_id(&self, side: Side) -> Option<String> {
        self.coordinator
            .current_pair()
            .get(side)
            .map(str::to_string)
    }

    pub fn status_line(&self) -> String {
        let clock = self.coordinator.clock();
        let pair = self.coordinator.current_pair();
        format!(
            "[{}] {} / {}  {}  speed {:.2}x  vol {}/{}  loop {}  pair ({}, {})",
            self.layout.label(),
            format_time(clock.current_time),
            format_time(clock.duration),
            if clock.is_playing { "playing" } else { "stopped" },
            clock.speed,
            self.coordinator.volume(Side::Left),
            self.coordinator.volume(Side::Right),
            if self.coordinator.is_loop_enabled() {
                "on"
            } else {
                "off"
            },
            pair.left.as_deref().unwrap_or("-"),
            pair.right.as_deref().unwrap_or("-"),
        )
    }
}

fn spawn_embed(
    coordinator: &PairCoordinator,
    side: Side,
    video_id: Option<&str>,
) -> Option<Arc<SimulatedEmbed>> {
    let video_id = video_id?;
    debug!(
        "{side} embed stands in for {}",
        EmbedOptions::default().embed_url(video_id)
    );
    let embed = SimulatedEmbed::new(video_id, sim_duration(video_id));
    // the simulated widget initializes instantly; a real embed fires its
    // ready event asynchronously
    coordinator.on_player_ready(side, embed.clone());
    Some(embed)
}

/// Deterministic per-video duration so paired sides end at different
/// times and the both-ended loop is observable.
fn sim_duration(video_id: &str) -> f64 {
    let sum: u32 = video_id.bytes().map(u32::from).sum();
    30.0 + f64::from(sum % 45)
}
