use std::sync::Arc;

use parking_lot::Mutex;

use super::{EmbedError, EmbedHandle};

// Raw widget codes, used only by the simulation itself.
const RAW_UNSTARTED: i32 = -1;
const RAW_ENDED: i32 = 0;
const RAW_PLAYING: i32 = 1;
const RAW_PAUSED: i32 = 2;

/// An in-process stand-in for the external embed widget.
///
/// Native processes have no iframe to drive, so the application binary,
/// the examples and the test suite all talk to this instead. It honors the
/// same command contract as the real widget, keeps its own clock that is
/// advanced manually with [`SimulatedEmbed::advance`], and records the raw
/// state codes it would have emitted so a driver can forward them to the
/// coordinator. `fail_calls` turns every handle call into a stale-handle
/// error for fault-injection tests.
pub struct SimulatedEmbed {
    state: Mutex<SimState>,
}

struct SimState {
    video_id: String,
    raw_state: i32,
    time: f64,
    duration: f64,
    volume: u8,
    rate: f64,
    failing: bool,
    events: Vec<i32>,
    fullscreen_requests: u32,
}

impl SimulatedEmbed {
    /// Create a simulated embed for `video_id` with a known duration.
    pub fn new(video_id: impl Into<String>, duration: f64) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(SimState {
                video_id: video_id.into(),
                raw_state: RAW_UNSTARTED,
                time: 0.0,
                duration,
                volume: 100,
                rate: 1.0,
                failing: false,
                events: Vec::new(),
                fullscreen_requests: 0,
            }),
        })
    }

    /// Make every subsequent handle call fail as if the iframe were torn down.
    pub fn fail_calls(&self, failing: bool) {
        self.state.lock().failing = failing;
    }

    /// Advance the simulated clock by `seconds` of wall time.
    ///
    /// Only moves while playing; playback position advances at the current
    /// rate and latches at the end of the video, emitting the ended code once.
    pub fn advance(&self, seconds: f64) {
        let mut s = self.state.lock();
        if s.raw_state != RAW_PLAYING {
            return;
        }
        s.time += seconds * s.rate;
        if s.duration > 0.0 && s.time >= s.duration {
            s.time = s.duration;
            s.raw_state = RAW_ENDED;
            s.events.push(RAW_ENDED);
        }
    }

    /// Force a raw state code, recording it as an emitted event.
    ///
    /// Lets tests script transitions the widget would produce on its own,
    /// such as buffering stalls.
    pub fn emit_raw(&self, code: i32) {
        let mut s = self.state.lock();
        s.raw_state = code;
        s.events.push(code);
    }

    /// Drain the raw state codes emitted since the last call.
    pub fn take_events(&self) -> Vec<i32> {
        std::mem::take(&mut self.state.lock().events)
    }

    pub fn video_id(&self) -> String {
        self.state.lock().video_id.clone()
    }

    pub fn raw_state(&self) -> i32 {
        self.state.lock().raw_state
    }

    pub fn volume(&self) -> u8 {
        self.state.lock().volume
    }

    pub fn rate(&self) -> f64 {
        self.state.lock().rate
    }

    pub fn fullscreen_requests(&self) -> u32 {
        self.state.lock().fullscreen_requests
    }
}

impl SimState {
    fn guard(&self) -> Result<(), EmbedError> {
        if self.failing {
            Err(EmbedError::Stale)
        } else {
            Ok(())
        }
    }

    fn transition(&mut self, code: i32) {
        if self.raw_state != code {
            self.raw_state = code;
            self.events.push(code);
        }
    }
}

impl EmbedHandle for SimulatedEmbed {
    fn play(&self) -> Result<(), EmbedError> {
        let mut s = self.state.lock();
        s.guard()?;
        s.transition(RAW_PLAYING);
        Ok(())
    }

    fn pause(&self) -> Result<(), EmbedError> {
        let mut s = self.state.lock();
        s.guard()?;
        s.transition(RAW_PAUSED);
        Ok(())
    }

    fn seek_to(&self, seconds: f64, _allow_seek_ahead: bool) -> Result<(), EmbedError> {
        let mut s = self.state.lock();
        s.guard()?;
        let max = if s.duration > 0.0 { s.duration } else { f64::MAX };
        s.time = seconds.clamp(0.0, max);
        Ok(())
    }

    fn set_volume(&self, volume: u8) -> Result<(), EmbedError> {
        let mut s = self.state.lock();
        s.guard()?;
        s.volume = volume.min(100);
        Ok(())
    }

    fn set_playback_rate(&self, rate: f64) -> Result<(), EmbedError> {
        let mut s = self.state.lock();
        s.guard()?;
        s.rate = rate;
        Ok(())
    }

    fn current_time(&self) -> Result<f64, EmbedError> {
        let s = self.state.lock();
        s.guard()?;
        Ok(s.time)
    }

    fn duration(&self) -> Result<f64, EmbedError> {
        let s = self.state.lock();
        s.guard()?;
        Ok(s.duration)
    }

    fn player_state(&self) -> Result<i32, EmbedError> {
        let s = self.state.lock();
        s.guard()?;
        Ok(s.raw_state)
    }

    fn request_fullscreen(&self) -> Result<(), EmbedError> {
        let mut s = self.state.lock();
        s.guard()?;
        s.fullscreen_requests += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_advance_only_moves_while_playing() {
        let sim = SimulatedEmbed::new("abc", 10.0);
        sim.advance(3.0);
        assert_eq!(sim.current_time().unwrap(), 0.0);

        sim.play().unwrap();
        sim.advance(3.0);
        assert_eq!(sim.current_time().unwrap(), 3.0);
    }

    #[test]
    fn test_advance_respects_playback_rate() {
        let sim = SimulatedEmbed::new("abc", 100.0);
        sim.play().unwrap();
        sim.set_playback_rate(2.0).unwrap();
        sim.advance(3.0);
        assert_eq!(sim.current_time().unwrap(), 6.0);
    }

    #[test]
    fn test_end_of_video_emits_ended_once() {
        let sim = SimulatedEmbed::new("abc", 5.0);
        sim.play().unwrap();
        sim.take_events();

        sim.advance(10.0);
        sim.advance(10.0);

        assert_eq!(sim.take_events(), vec![0]);
        assert_eq!(sim.current_time().unwrap(), 5.0);
        assert_eq!(sim.raw_state(), 0);
    }

    #[test]
    fn test_failing_handle_rejects_every_call() {
        let sim = SimulatedEmbed::new("abc", 5.0);
        sim.fail_calls(true);

        assert!(sim.play().is_err());
        assert!(sim.current_time().is_err());
        assert!(sim.player_state().is_err());

        sim.fail_calls(false);
        assert!(sim.play().is_ok());
    }

    #[test]
    fn test_seek_clamps_to_known_duration() {
        let sim = SimulatedEmbed::new("abc", 60.0);
        sim.seek_to(120.0, true).unwrap();
        assert_eq!(sim.current_time().unwrap(), 60.0);
        sim.seek_to(-4.0, true).unwrap();
        assert_eq!(sim.current_time().unwrap(), 0.0);
    }

    #[test]
    fn test_repeated_play_emits_single_event() {
        let sim = SimulatedEmbed::new("abc", 5.0);
        sim.play().unwrap();
        sim.play().unwrap();
        assert_eq!(sim.take_events(), vec![1]);
    }
}
