use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, warn};
use parking_lot::Mutex;

use crate::config::{PairLayout, PairTuning};
use crate::embed::{EmbedHandle, PlaybackState, Side};
use crate::playlist::SidePair;

use super::timeline::{PlaybackClock, TimelineSampler};
use super::tracker::PlayerTracker;

/// Coordinates two embed players into one logical transport.
///
/// The left player is the leader: it receives commands first and is the
/// only source for the displayed timeline. The right player follows, a
/// stagger delay behind, because embeds tend to silently drop one of two
/// commands issued in the same tick.
///
/// All deferred work (staggered follower commands, the duration probe,
/// the timeline sampler) carries the pair generation it was scheduled
/// for and re-checks intent when it fires, so a command aimed at a torn
/// down pair, or a play that lost a race against a fresh pause, dies
/// quietly instead of acting on stale state.
///
/// Must be created inside a Tokio runtime.
#[derive(Clone)]
pub struct PairCoordinator {
    inner: Arc<Mutex<Inner>>,
}

struct Inner {
    layout: PairLayout,
    tuning: PairTuning,
    left: PlayerTracker,
    right: PlayerTracker,
    clock: PlaybackClock,
    loop_enabled: bool,
    speed: f64,
    volumes: [u8; 2],
    generation: u64,
    sampler: TimelineSampler,
    pair: SidePair,
}

impl PairCoordinator {
    pub fn new(layout: PairLayout) -> Self {
        Self::with_tuning(layout, PairTuning::for_layout(layout))
    }

    pub fn with_tuning(layout: PairLayout, tuning: PairTuning) -> Self {
        let speed = tuning.clamp_speed(tuning.initial_speed);
        let volumes = [tuning.volume_left.min(100), tuning.volume_right.min(100)];
        let clock = PlaybackClock {
            speed,
            ..PlaybackClock::default()
        };
        Self {
            inner: Arc::new(Mutex::new(Inner {
                layout,
                loop_enabled: tuning.loop_enabled,
                tuning,
                left: PlayerTracker::new(Side::Left),
                right: PlayerTracker::new(Side::Right),
                clock,
                speed,
                volumes,
                generation: 0,
                sampler: TimelineSampler::new(),
                pair: SidePair::default(),
            })),
        }
    }

    /// Tear down state for a new content pair.
    ///
    /// Trackers are replaced rather than reset: the embed widgets are keyed
    /// by video id and rebuilt from scratch, so the old handles are dead.
    /// Bumping the generation invalidates every in-flight deferred command
    /// and the running sampler.
    pub fn load_pair(&self, pair: &SidePair) {
        let mut inner = self.inner.lock();
        info!(
            "{} pair: loading ({:?}, {:?})",
            inner.layout.label(),
            pair.left,
            pair.right
        );
        inner.generation += 1;
        inner.sampler.stop();
        inner.left = PlayerTracker::new(Side::Left);
        inner.right = PlayerTracker::new(Side::Right);
        inner.clock.reset();
        inner.pair = pair.clone();
    }

    /// The embed widget for `side` finished initializing.
    pub fn on_player_ready(&self, side: Side, handle: Arc<dyn EmbedHandle>) {
        let mut inner = self.inner.lock();
        let volume = inner.volumes[side.index()];
        let speed = inner.speed;
        inner.tracker_mut(side).on_ready(handle, volume, speed);
        info!("{} pair: {side} embed ready", inner.layout.label());

        // Duration is frequently still unknown at ready time; ask the
        // leader again shortly.
        if side == Side::Left && inner.clock.duration <= 0.0 {
            let delay = inner.tuning.duration_probe_delay;
            self.after(inner.generation, delay, |inner| inner.refresh_duration());
        }
    }

    /// Fold a raw state code from `side` into the pair state machine.
    ///
    /// Returns the mapped state; unknown codes are ignored and return `None`.
    pub fn on_state_change(&self, side: Side, raw: i32) -> Option<PlaybackState> {
        let mut inner = self.inner.lock();
        let Some(state) = inner.tracker_mut(side).on_state_change(raw) else {
            debug!("{side} embed reported unknown state code {raw}, ignoring");
            return None;
        };
        debug!("{side} embed state: {state:?}");
        match state {
            PlaybackState::Playing => self.handle_playing(&mut inner, side),
            PlaybackState::Ended => self.handle_ended(&mut inner, side),
            PlaybackState::Paused | PlaybackState::Cued | PlaybackState::Unstarted => {
                inner.stopped_consensus(side);
            }
            PlaybackState::Buffering | PlaybackState::Error => {}
        }
        if side == Side::Left {
            inner.refresh_duration();
        }
        Some(state)
    }

    /// The embed widget for `side` reported an error event.
    pub fn on_player_error(&self, side: Side, code: i32) {
        let mut inner = self.inner.lock();
        warn!("{side} embed reported error code {code}");
        inner.tracker_mut(side).on_error();
        inner.stopped_consensus(side);
    }

    /// Start playback on both sides, leader first.
    ///
    /// No-op until every side that has content is ready.
    pub fn play(&self) {
        let mut inner = self.inner.lock();
        if !inner.all_required_ready() {
            debug!("play ignored: pair is not ready");
            return;
        }
        inner.left.play();
        let delay = inner.tuning.stagger;
        self.after(inner.generation, delay, |inner| {
            // a pause issued inside the stagger window wins over this play
            if inner.clock.is_playing {
                inner.right.play();
            }
        });
        inner.clock.is_playing = true;
        self.start_sampler(&mut inner);
    }

    /// Pause both sides.
    pub fn pause(&self) {
        let mut inner = self.inner.lock();
        if !inner.left.is_ready() && !inner.right.is_ready() {
            return;
        }
        inner.left.pause();
        inner.right.pause();
        inner.clock.is_playing = false;
        // the sampler is kept only while some side still reports progress
        if inner.left.live_state().is_stopped_like() && inner.right.live_state().is_stopped_like() {
            inner.sampler.stop();
        }
    }

    /// Seek both sides to `seconds`, clamped to the known duration.
    ///
    /// Leaves the play/pause state untouched either way (see DESIGN.md).
    pub fn seek(&self, seconds: f64) {
        if !seconds.is_finite() {
            return;
        }
        let mut inner = self.inner.lock();
        if !inner.left.is_ready() && !inner.right.is_ready() {
            debug!("seek ignored: no side is ready");
            return;
        }
        let duration = inner.clock.duration;
        let target = if duration > 0.0 {
            seconds.clamp(0.0, duration)
        } else {
            seconds.max(0.0)
        };
        inner.left.seek_to(target);
        inner.right.seek_to(target);
        inner.clock.current_time = target;
    }

    /// Set the playback rate on both sides and remember it for the session,
    /// so late-ready embeds and the next pair inherit it. Returns the
    /// clamped rate actually applied.
    pub fn set_speed(&self, speed: f64) -> f64 {
        let mut inner = self.inner.lock();
        let speed = inner.tuning.clamp_speed(speed);
        inner.speed = speed;
        inner.clock.speed = speed;
        inner.left.set_rate(speed);
        inner.right.set_rate(speed);
        speed
    }

    /// Set one side's volume (0-100); the other side is untouched.
    pub fn set_volume(&self, side: Side, volume: u8) {
        let mut inner = self.inner.lock();
        let volume = volume.min(100);
        inner.volumes[side.index()] = volume;
        inner.tracker(side).set_volume(volume);
    }

    pub fn volume(&self, side: Side) -> u8 {
        self.inner.lock().volumes[side.index()]
    }

    pub fn set_loop(&self, enabled: bool) {
        self.inner.lock().loop_enabled = enabled;
    }

    pub fn toggle_loop(&self) -> bool {
        let mut inner = self.inner.lock();
        inner.loop_enabled = !inner.loop_enabled;
        info!(
            "loop {}",
            if inner.loop_enabled { "enabled" } else { "disabled" }
        );
        inner.loop_enabled
    }

    pub fn is_loop_enabled(&self) -> bool {
        self.inner.lock().loop_enabled
    }

    pub fn is_playing(&self) -> bool {
        self.inner.lock().clock.is_playing
    }

    /// Snapshot of the shared transport clock.
    pub fn clock(&self) -> PlaybackClock {
        self.inner.lock().clock
    }

    pub fn speed(&self) -> f64 {
        self.inner.lock().speed
    }

    pub fn layout(&self) -> PairLayout {
        self.inner.lock().layout
    }

    pub fn current_pair(&self) -> SidePair {
        self.inner.lock().pair.clone()
    }

    pub fn is_side_ready(&self, side: Side) -> bool {
        self.inner.lock().tracker(side).is_ready()
    }

    pub fn request_fullscreen(&self, side: Side) -> bool {
        self.inner.lock().tracker(side).request_fullscreen()
    }

    pub fn sampler_running(&self) -> bool {
        self.inner.lock().sampler.is_running()
    }

    #[cfg(test)]
    pub(crate) fn sampler_starts(&self) -> u64 {
        self.inner.lock().sampler.starts()
    }

    fn handle_playing(&self, inner: &mut Inner, side: Side) {
        inner.clock.is_playing = true;
        self.start_sampler(inner);

        // Self-healing: if the other side silently stalled, nudge it after
        // the usual stagger. An ended side is left alone; restarting it is
        // the loop rule's call.
        let other = side.other();
        let other_state = inner.tracker(other).live_state();
        if inner.tracker(other).is_ready() && needs_nudge(other_state) {
            let delay = inner.tuning.stagger;
            self.after(inner.generation, delay, move |inner| {
                if !inner.clock.is_playing {
                    return;
                }
                let tracker = inner.tracker(other);
                if needs_nudge(tracker.live_state()) {
                    debug!("{other} embed stalled while {side} plays, nudging it");
                    tracker.play();
                }
            });
        }
    }

    fn handle_ended(&self, inner: &mut Inner, side: Side) {
        if inner.loop_enabled {
            if inner.left.ended() && inner.right.ended() {
                self.restart_loop(inner);
            } else {
                debug!("{side} embed ended, waiting for the other side");
            }
        } else if side == Side::Left {
            info!("leader ended with loop off, stopping");
            inner.sampler.stop();
            inner.clock.is_playing = false;
            inner.clock.current_time = 0.0;
        }
        // a follower-only end without loop is latched but not acted upon
    }

    /// Both sides have ended: rewind and restart, leader first.
    fn restart_loop(&self, inner: &mut Inner) {
        info!("{} pair: both sides ended, looping", inner.layout.label());
        inner.left.seek_to(0.0);
        inner.right.seek_to(0.0);
        inner.left.clear_ended();
        inner.right.clear_ended();
        inner.clock.current_time = 0.0;
        inner.clock.is_playing = true;
        inner.left.play();
        let delay = inner.tuning.stagger;
        self.after(inner.generation, delay, |inner| {
            if inner.clock.is_playing {
                inner.right.play();
            }
        });
        self.start_sampler(inner);
    }

    /// Run `f` against the coordinator after `delay`, unless the pair it
    /// was scheduled for has been torn down in the meantime.
    fn after<F>(&self, generation: u64, delay: Duration, f: F)
    where
        F: FnOnce(&mut Inner) + Send + 'static,
    {
        let weak = Arc::downgrade(&self.inner);
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let Some(inner) = weak.upgrade() else { return };
            let mut inner = inner.lock();
            if inner.generation == generation {
                f(&mut inner);
            }
        });
    }

    fn start_sampler(&self, inner: &mut Inner) {
        if inner.sampler.is_running() {
            return;
        }
        let weak = Arc::downgrade(&self.inner);
        let generation = inner.generation;
        let period = inner.tuning.sample_interval;
        inner.sampler.start(period, move || {
            let Some(arc) = weak.upgrade() else {
                return false;
            };
            let mut inner = arc.lock();
            inner.generation == generation && inner.clock.is_playing && inner.sample_leader()
        });
    }
}

/// States worth a recovery nudge: the side looks stalled, not finished.
fn needs_nudge(state: PlaybackState) -> bool {
    matches!(
        state,
        PlaybackState::Paused | PlaybackState::Unstarted | PlaybackState::Cued
    )
}

impl Inner {
    fn tracker(&self, side: Side) -> &PlayerTracker {
        match side {
            Side::Left => &self.left,
            Side::Right => &self.right,
        }
    }

    fn tracker_mut(&mut self, side: Side) -> &mut PlayerTracker {
        match side {
            Side::Left => &mut self.left,
            Side::Right => &mut self.right,
        }
    }

    /// Every side that has content is ready, and there is at least one.
    fn all_required_ready(&self) -> bool {
        let mut any = false;
        for side in [Side::Left, Side::Right] {
            if self.pair.get(side).is_some() {
                if !self.tracker(side).is_ready() {
                    return false;
                }
                any = true;
            }
        }
        any
    }

    /// One side went stopped-like; stop the pair only if the other side
    /// agrees. A still-playing side is authoritative, so a transient blip
    /// on one embed cannot pause the whole pair.
    fn stopped_consensus(&mut self, side: Side) {
        let other = side.other();
        if self.tracker(other).live_state().is_stopped_like() {
            if self.clock.is_playing {
                debug!("both sides stopped, leaving playback");
            }
            self.clock.is_playing = false;
            self.sampler.stop();
        } else {
            debug!("{side} stopped but {other} still plays, staying in playback");
        }
    }

    /// One sampler tick: read the leader's position while it plays.
    ///
    /// Returns `false` to cancel the sampler; a failing read cancels it
    /// rather than failing again every half second.
    fn sample_leader(&mut self) -> bool {
        if !self.left.is_ready() {
            return true;
        }
        let Some(handle) = self.left.handle().cloned() else {
            return true;
        };
        let playing =
            |raw| PlaybackState::from_raw(raw).is_some_and(PlaybackState::is_playing);
        match handle.player_state() {
            Ok(raw) if playing(raw) => {
                match handle.current_time() {
                    Ok(t) => self.clock.current_time = t,
                    Err(e) => {
                        warn!("timeline tick failed reading time, stopping sampler: {e}");
                        return false;
                    }
                }
                if self.clock.duration <= 0.0 {
                    if let Ok(d) = handle.duration() {
                        if d > 0.0 {
                            self.clock.duration = d;
                        }
                    }
                }
                true
            }
            Ok(_) => true,
            Err(e) => {
                warn!("timeline tick failed reading state, stopping sampler: {e}");
                false
            }
        }
    }

    /// Opportunistically learn the duration from the leader.
    fn refresh_duration(&mut self) {
        if self.clock.duration > 0.0 || !self.left.is_ready() {
            return;
        }
        let duration = self.left.duration();
        if duration > 0.0 {
            debug!("leader duration known: {duration:.2}s");
            self.clock.duration = duration;
        }
    }
}
