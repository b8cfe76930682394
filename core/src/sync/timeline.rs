use std::time::Duration;

use log::debug;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Shared logical transport state for a pair.
///
/// `duration` is sourced from the leader side only and may stay 0 until
/// the deferred probe or the sampler learns it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaybackClock {
    pub is_playing: bool,
    pub speed: f64,
    pub current_time: f64,
    pub duration: f64,
}

impl Default for PlaybackClock {
    fn default() -> Self {
        Self {
            is_playing: false,
            speed: 1.0,
            current_time: 0.0,
            duration: 0.0,
        }
    }
}

impl PlaybackClock {
    /// Fraction of the video played, safe while duration is unknown.
    pub fn progress(&self) -> f64 {
        if self.duration <= 0.0 {
            return 0.0;
        }
        (self.current_time / self.duration).clamp(0.0, 1.0)
    }

    /// Reset transport state for a new pair, keeping the session speed.
    pub fn reset(&mut self) {
        self.is_playing = false;
        self.current_time = 0.0;
        self.duration = 0.0;
    }
}

/// Render seconds as a zero-padded `MM:SS` display string.
pub fn format_time(seconds: f64) -> String {
    if !seconds.is_finite() || seconds < 0.0 {
        return "00:00".to_string();
    }
    let total = seconds as u64;
    format!("{:02}:{:02}", total / 60, total % 60)
}

/// Owns the repeating timeline poll task.
///
/// At most one task is active at a time; `start` is a no-op while one is
/// running. The tick callback returns `false` to end the loop (the task
/// cancels itself instead of erroring repeatedly), and `stop` aborts the
/// task outright. Dropping the sampler also aborts it, so teardown can
/// never leak a timer.
pub struct TimelineSampler {
    task: Option<JoinHandle<()>>,
    starts: u64,
}

impl TimelineSampler {
    pub fn new() -> Self {
        Self {
            task: None,
            starts: 0,
        }
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// How many times a poll task has been spawned.
    pub fn starts(&self) -> u64 {
        self.starts
    }

    /// Spawn the poll task unless one is already active.
    ///
    /// `tick` runs once per `period`; the first tick fires one full period
    /// after the start.
    pub fn start<F>(&mut self, period: Duration, mut tick: F)
    where
        F: FnMut() -> bool + Send + 'static,
    {
        if self.is_running() {
            return;
        }
        self.starts += 1;
        debug!("timeline sampler started ({}ms period)", period.as_millis());
        self.task = Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // the first interval tick completes immediately
            interval.tick().await;
            loop {
                interval.tick().await;
                if !tick() {
                    break;
                }
            }
        }));
    }

    /// Abort the poll task if one is active.
    pub fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            debug!("timeline sampler stopped");
        }
    }
}

impl Default for TimelineSampler {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for TimelineSampler {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_format_time() {
        assert_eq!(format_time(0.0), "00:00");
        assert_eq!(format_time(9.9), "00:09");
        assert_eq!(format_time(65.0), "01:05");
        assert_eq!(format_time(600.0), "10:00");
        assert_eq!(format_time(-3.0), "00:00");
        assert_eq!(format_time(f64::NAN), "00:00");
    }

    #[test]
    fn test_progress_is_zero_before_duration_is_known() {
        let mut clock = PlaybackClock::default();
        clock.current_time = 12.0;
        assert_eq!(clock.progress(), 0.0);

        clock.duration = 48.0;
        assert_eq!(clock.progress(), 0.25);
    }

    #[test]
    fn test_reset_keeps_session_speed() {
        let mut clock = PlaybackClock {
            is_playing: true,
            speed: 1.75,
            current_time: 33.0,
            duration: 120.0,
        };
        clock.reset();
        assert!(!clock.is_playing);
        assert_eq!(clock.speed, 1.75);
        assert_eq!(clock.current_time, 0.0);
        assert_eq!(clock.duration, 0.0);
    }

    async fn step(millis: u64) {
        // yield first so a freshly started poll task registers its timer
        // at the pre-advance instant
        tokio::task::yield_now().await;
        tokio::time::advance(Duration::from_millis(millis)).await;
        tokio::task::yield_now().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_is_idempotent_while_running() {
        let ticks = Arc::new(AtomicU32::new(0));
        let mut sampler = TimelineSampler::new();

        for _ in 0..3 {
            let ticks = ticks.clone();
            sampler.start(Duration::from_millis(500), move || {
                ticks.fetch_add(1, Ordering::SeqCst);
                true
            });
        }
        assert_eq!(sampler.starts(), 1);
        assert!(sampler.is_running());

        for _ in 0..3 {
            step(510).await;
        }
        assert_eq!(ticks.load(Ordering::SeqCst), 3);

        sampler.stop();
        assert!(!sampler.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_tick_returning_false_ends_the_loop() {
        let ticks = Arc::new(AtomicU32::new(0));
        let mut sampler = TimelineSampler::new();
        {
            let ticks = ticks.clone();
            sampler.start(Duration::from_millis(500), move || {
                ticks.fetch_add(1, Ordering::SeqCst) < 1
            });
        }

        for _ in 0..4 {
            step(510).await;
        }

        assert_eq!(ticks.load(Ordering::SeqCst), 2);
        assert!(!sampler.is_running());

        // a fresh start is allowed once the previous task has finished
        sampler.start(Duration::from_millis(500), || true);
        assert_eq!(sampler.starts(), 2);
        assert!(sampler.is_running());
        sampler.stop();
    }
}
