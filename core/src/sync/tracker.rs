use std::sync::Arc;

use log::{debug, warn};

use crate::embed::{EmbedHandle, PlaybackState, Side};

/// Queryable snapshot of one player's asynchronous event stream.
///
/// The embed reports readiness and state changes on its own schedule; this
/// wraps them into something the coordinator can read at any time. Every
/// call into the handle is guarded: a stale handle degrades to the last
/// known value (or a no-op) with a warning, never a panic.
pub struct PlayerTracker {
    side: Side,
    handle: Option<Arc<dyn EmbedHandle>>,
    ready: bool,
    state: PlaybackState,
    ended: bool,
    last_time: f64,
    last_duration: f64,
}

impl PlayerTracker {
    pub fn new(side: Side) -> Self {
        Self {
            side,
            handle: None,
            ready: false,
            state: PlaybackState::Unstarted,
            ended: false,
            last_time: 0.0,
            last_duration: 0.0,
        }
    }

    /// Adopt a freshly initialized handle and apply the session volume and
    /// speed to it best-effort.
    pub fn on_ready(&mut self, handle: Arc<dyn EmbedHandle>, volume: u8, speed: f64) {
        debug!("{} embed ready (volume {volume}, speed {speed})", self.side);
        if let Err(e) = handle.set_volume(volume.min(100)) {
            warn!("{} embed rejected initial volume: {e}", self.side);
        }
        if let Err(e) = handle.set_playback_rate(speed) {
            warn!("{} embed rejected initial speed: {e}", self.side);
        }
        self.handle = Some(handle);
        self.ready = true;
    }

    /// Fold a raw widget state code into the snapshot.
    ///
    /// Returns the mapped state, or `None` for codes this system does not
    /// recognize (those are ignored entirely). The ended flag latches on
    /// `Ended` and clears as soon as the side makes progress again.
    pub fn on_state_change(&mut self, raw: i32) -> Option<PlaybackState> {
        let state = PlaybackState::from_raw(raw)?;
        self.state = state;
        match state {
            PlaybackState::Ended => self.ended = true,
            PlaybackState::Playing | PlaybackState::Buffering => self.ended = false,
            _ => {}
        }
        Some(state)
    }

    /// Record an error event from the widget.
    pub fn on_error(&mut self) {
        self.state = PlaybackState::Error;
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    /// Last state reported through the event stream.
    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn ended(&self) -> bool {
        self.ended
    }

    pub fn clear_ended(&mut self) {
        self.ended = false;
    }

    pub fn handle(&self) -> Option<&Arc<dyn EmbedHandle>> {
        self.handle.as_ref()
    }

    /// State read live from the handle, for cross-side decisions.
    ///
    /// Falls back to the snapshot on unknown codes and assumes the side is
    /// stopped when the handle itself fails.
    pub fn live_state(&self) -> PlaybackState {
        let Some(handle) = self.handle.as_ref().filter(|_| self.ready) else {
            return self.state;
        };
        match handle.player_state() {
            Ok(raw) => PlaybackState::from_raw(raw).unwrap_or(self.state),
            Err(e) => {
                warn!("{} embed state read failed, assuming stopped: {e}", self.side);
                PlaybackState::Unstarted
            }
        }
    }

    /// Current position in seconds; keeps the last known value when the
    /// handle fails.
    pub fn current_time(&mut self) -> f64 {
        if let Some(handle) = self.handle.as_ref() {
            match handle.current_time() {
                Ok(t) => self.last_time = t,
                Err(e) => warn!("{} embed time read failed: {e}", self.side),
            }
        }
        self.last_time
    }

    /// Duration in seconds; keeps the last known value when the handle fails.
    pub fn duration(&mut self) -> f64 {
        if let Some(handle) = self.handle.as_ref() {
            match handle.duration() {
                Ok(d) if d > 0.0 => self.last_duration = d,
                Ok(_) => {}
                Err(e) => warn!("{} embed duration read failed: {e}", self.side),
            }
        }
        self.last_duration
    }

    /// Issue play; true when the command reached the embed.
    pub fn play(&self) -> bool {
        self.command("play", |h| h.play())
    }

    /// Issue pause; true when the command reached the embed.
    pub fn pause(&self) -> bool {
        self.command("pause", |h| h.pause())
    }

    pub fn seek_to(&self, seconds: f64) -> bool {
        self.command("seek", |h| h.seek_to(seconds, true))
    }

    pub fn set_volume(&self, volume: u8) -> bool {
        self.command("volume", |h| h.set_volume(volume.min(100)))
    }

    pub fn set_rate(&self, rate: f64) -> bool {
        self.command("rate", |h| h.set_playback_rate(rate))
    }

    pub fn request_fullscreen(&self) -> bool {
        self.command("fullscreen", |h| h.request_fullscreen())
    }

    /// Run a control command against the handle, rejecting it before
    /// readiness and swallowing (but logging) embed faults.
    fn command<F>(&self, what: &str, f: F) -> bool
    where
        F: FnOnce(&dyn EmbedHandle) -> Result<(), crate::embed::EmbedError>,
    {
        if !self.ready {
            debug!("{} embed not ready, {what} ignored", self.side);
            return false;
        }
        let Some(handle) = self.handle.as_ref() else {
            return false;
        };
        match f(handle.as_ref()) {
            Ok(()) => true,
            Err(e) => {
                warn!("{} embed rejected {what}: {e}", self.side);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embed::SimulatedEmbed;

    #[test]
    fn test_commands_rejected_before_ready() {
        let tracker = PlayerTracker::new(Side::Left);
        assert!(!tracker.is_ready());
        assert!(!tracker.play());
        assert!(!tracker.seek_to(10.0));
    }

    #[test]
    fn test_ready_applies_volume_and_speed() {
        let sim = SimulatedEmbed::new("abc", 60.0);
        let mut tracker = PlayerTracker::new(Side::Right);
        tracker.on_ready(sim.clone(), 40, 1.5);

        assert!(tracker.is_ready());
        assert_eq!(sim.volume(), 40);
        assert_eq!(sim.rate(), 1.5);
    }

    #[test]
    fn test_ended_flag_latches_and_clears() {
        let mut tracker = PlayerTracker::new(Side::Left);
        assert_eq!(tracker.on_state_change(0), Some(PlaybackState::Ended));
        assert!(tracker.ended());

        // still latched across a paused report
        tracker.on_state_change(2);
        assert!(tracker.ended());

        tracker.on_state_change(3);
        assert!(!tracker.ended());
    }

    #[test]
    fn test_unknown_codes_do_not_disturb_state() {
        let mut tracker = PlayerTracker::new(Side::Left);
        tracker.on_state_change(1);
        assert_eq!(tracker.on_state_change(42), None);
        assert_eq!(tracker.state(), PlaybackState::Playing);
    }

    #[test]
    fn test_time_reads_fail_soft() {
        let sim = SimulatedEmbed::new("abc", 60.0);
        let mut tracker = PlayerTracker::new(Side::Left);
        tracker.on_ready(sim.clone(), 100, 1.0);

        sim.play().unwrap();
        sim.advance(12.0);
        assert_eq!(tracker.current_time(), 12.0);
        assert_eq!(tracker.duration(), 60.0);

        sim.fail_calls(true);
        assert_eq!(tracker.current_time(), 12.0);
        assert_eq!(tracker.duration(), 60.0);
    }

    #[test]
    fn test_failed_handle_reads_as_stopped() {
        let sim = SimulatedEmbed::new("abc", 60.0);
        let mut tracker = PlayerTracker::new(Side::Left);
        tracker.on_ready(sim.clone(), 100, 1.0);

        sim.play().unwrap();
        tracker.on_state_change(1);
        assert!(!tracker.live_state().is_stopped_like());

        sim.fail_calls(true);
        assert!(tracker.live_state().is_stopped_like());
    }
}
