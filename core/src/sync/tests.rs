use std::sync::Arc;
use std::time::Duration;

use crate::config::PairLayout;
use crate::embed::{EmbedHandle, Side, SimulatedEmbed};
use crate::playlist::SidePair;
use crate::sync::PairCoordinator;

fn pair(left: &str, right: &str) -> SidePair {
    SidePair {
        left: Some(left.to_string()),
        right: Some(right.to_string()),
    }
}

/// A coordinator wired to two simulated embeds, both ready.
struct Rig {
    coordinator: PairCoordinator,
    left: Arc<SimulatedEmbed>,
    right: Arc<SimulatedEmbed>,
}

impl Rig {
    fn new(left_duration: f64, right_duration: f64) -> Self {
        let coordinator = PairCoordinator::new(PairLayout::Vertical);
        coordinator.load_pair(&pair("vid-left", "vid-right"));
        let left = SimulatedEmbed::new("vid-left", left_duration);
        let right = SimulatedEmbed::new("vid-right", right_duration);
        coordinator.on_player_ready(Side::Left, left.clone());
        coordinator.on_player_ready(Side::Right, right.clone());
        Self {
            coordinator,
            left,
            right,
        }
    }

    /// Forward every raw code the embeds emitted since the last pump.
    fn pump(&self) {
        for raw in self.left.take_events() {
            self.coordinator.on_state_change(Side::Left, raw);
        }
        for raw in self.right.take_events() {
            self.coordinator.on_state_change(Side::Right, raw);
        }
    }
}

/// Advance paused test time and let pending tasks run.
///
/// Yields before advancing so that freshly spawned deferred work gets to
/// register its timer at the pre-advance instant.
async fn step(millis: u64) {
    tokio::task::yield_now().await;
    tokio::time::advance(Duration::from_millis(millis)).await;
    tokio::task::yield_now().await;
    tokio::task::yield_now().await;
}

#[tokio::test(start_paused = true)]
async fn test_play_requires_every_content_side_ready() {
    let coordinator = PairCoordinator::new(PairLayout::Vertical);
    coordinator.load_pair(&pair("a", "b"));
    let left = SimulatedEmbed::new("a", 60.0);
    coordinator.on_player_ready(Side::Left, left.clone());

    coordinator.play();

    assert!(!coordinator.is_playing());
    assert_eq!(left.raw_state(), -1);
}

#[tokio::test(start_paused = true)]
async fn test_solo_side_plays_when_other_has_no_content() {
    let coordinator = PairCoordinator::new(PairLayout::Vertical);
    coordinator.load_pair(&SidePair {
        left: Some("a".to_string()),
        right: None,
    });
    let left = SimulatedEmbed::new("a", 60.0);
    coordinator.on_player_ready(Side::Left, left.clone());

    coordinator.play();

    assert!(coordinator.is_playing());
    assert_eq!(left.raw_state(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_play_reaches_the_follower_after_the_stagger() {
    let rig = Rig::new(120.0, 120.0);
    rig.coordinator.play();

    assert_eq!(rig.left.raw_state(), 1);
    assert_eq!(rig.right.raw_state(), -1);

    step(60).await;
    assert_eq!(rig.right.raw_state(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_pause_inside_the_stagger_window_wins() {
    let rig = Rig::new(120.0, 120.0);
    rig.coordinator.play();
    rig.coordinator.pause();

    step(60).await;

    // the stale deferred play must not override the fresh pause
    assert_eq!(rig.left.raw_state(), 2);
    assert_eq!(rig.right.raw_state(), 2);
    assert!(!rig.coordinator.is_playing());
}

#[tokio::test(start_paused = true)]
async fn test_one_stopped_side_does_not_pause_the_pair() {
    let rig = Rig::new(120.0, 120.0);
    rig.coordinator.play();
    step(60).await;
    rig.pump();
    assert!(rig.coordinator.is_playing());

    // right stalls; left is still playing and stays authoritative
    rig.right.emit_raw(2);
    rig.pump();
    assert!(rig.coordinator.is_playing());

    // once left stops too, consensus flips the pair off
    rig.left.emit_raw(2);
    rig.pump();
    assert!(!rig.coordinator.is_playing());
    assert!(!rig.coordinator.sampler_running());
}

#[tokio::test(start_paused = true)]
async fn test_loop_waits_until_both_sides_have_ended() {
    let rig = Rig::new(5.0, 8.0);
    rig.coordinator.play();
    step(60).await;
    rig.pump();

    // left finishes first; the pair keeps going on the right side
    rig.left.advance(6.0);
    rig.right.advance(6.0);
    rig.pump();
    assert_eq!(rig.left.raw_state(), 0);
    assert!(rig.coordinator.is_playing());

    // two more ticks on the right, then it ends as well
    rig.right.advance(1.0);
    rig.pump();
    rig.right.advance(1.5);
    rig.pump();

    // exactly one restart: both rewound, leader playing immediately
    assert_eq!(rig.left.raw_state(), 1);
    assert_eq!(rig.left.current_time().unwrap(), 0.0);
    assert_eq!(rig.right.current_time().unwrap(), 0.0);
    assert_eq!(rig.coordinator.clock().current_time, 0.0);
    assert!(rig.coordinator.is_playing());

    // the follower restart arrives a stagger later
    step(60).await;
    assert_eq!(rig.right.raw_state(), 1);

    // draining the restart events must not trigger a second restart
    rig.pump();
    assert!(rig.coordinator.is_playing());
    assert_eq!(rig.left.current_time().unwrap(), 0.0);
}

#[tokio::test(start_paused = true)]
async fn test_loop_disabled_leader_end_stops_the_pair() {
    let rig = Rig::new(5.0, 120.0);
    rig.coordinator.set_loop(false);
    rig.coordinator.play();
    step(60).await;
    rig.pump();

    rig.left.advance(6.0);
    rig.pump();

    assert!(!rig.coordinator.is_playing());
    assert!(!rig.coordinator.sampler_running());
    assert_eq!(rig.coordinator.clock().current_time, 0.0);
}

#[tokio::test(start_paused = true)]
async fn test_loop_disabled_follower_end_is_ignored() {
    let rig = Rig::new(120.0, 5.0);
    rig.coordinator.set_loop(false);
    rig.coordinator.play();
    step(60).await;
    rig.pump();

    rig.right.advance(6.0);
    rig.pump();

    assert!(rig.coordinator.is_playing());
}

#[tokio::test(start_paused = true)]
async fn test_seek_clamps_to_duration() {
    let rig = Rig::new(120.0, 120.0);
    rig.coordinator.play();
    rig.pump(); // leader playing report also teaches the clock its duration
    assert_eq!(rig.coordinator.clock().duration, 120.0);

    rig.coordinator.seek(-5.0);
    assert_eq!(rig.coordinator.clock().current_time, 0.0);
    assert_eq!(rig.left.current_time().unwrap(), 0.0);

    rig.coordinator.seek(500.0);
    assert_eq!(rig.coordinator.clock().current_time, 120.0);
    assert_eq!(rig.left.current_time().unwrap(), 120.0);
    assert_eq!(rig.right.current_time().unwrap(), 120.0);
}

#[tokio::test(start_paused = true)]
async fn test_seek_before_duration_is_known() {
    let rig = Rig::new(300.0, 300.0);
    // no state events delivered yet, so the clock has no duration
    assert_eq!(rig.coordinator.clock().duration, 0.0);

    rig.coordinator.seek(42.0);
    assert_eq!(rig.coordinator.clock().current_time, 42.0);

    rig.coordinator.seek(-1.0);
    assert_eq!(rig.coordinator.clock().current_time, 0.0);
}

#[tokio::test(start_paused = true)]
async fn test_seek_while_paused_stays_paused() {
    let rig = Rig::new(120.0, 120.0);
    rig.coordinator.play();
    step(60).await;
    rig.pump();
    rig.coordinator.pause();
    rig.pump();

    rig.coordinator.seek(50.0);

    assert!(!rig.coordinator.is_playing());
    assert_eq!(rig.left.raw_state(), 2);
    assert_eq!(rig.coordinator.clock().current_time, 50.0);
}

#[tokio::test(start_paused = true)]
async fn test_volume_is_per_side_and_idempotent() {
    let rig = Rig::new(120.0, 120.0);
    // layout defaults applied at ready time
    assert_eq!(rig.left.volume(), 100);
    assert_eq!(rig.right.volume(), 75);

    rig.coordinator.set_volume(Side::Left, 40);
    rig.coordinator.set_volume(Side::Left, 40);

    assert_eq!(rig.coordinator.volume(Side::Left), 40);
    assert_eq!(rig.left.volume(), 40);
    assert_eq!(rig.right.volume(), 75);

    rig.coordinator.set_volume(Side::Right, 200);
    assert_eq!(rig.coordinator.volume(Side::Right), 100);
    assert_eq!(rig.right.volume(), 100);
}

#[tokio::test(start_paused = true)]
async fn test_speed_is_clamped_and_inherited_by_late_ready_sides() {
    let coordinator = PairCoordinator::new(PairLayout::Vertical);
    coordinator.load_pair(&pair("a", "b"));
    let left = SimulatedEmbed::new("a", 60.0);
    coordinator.on_player_ready(Side::Left, left.clone());

    assert_eq!(coordinator.set_speed(6.0), 2.0);
    assert_eq!(left.rate(), 2.0);
    coordinator.set_volume(Side::Right, 20);

    // the right embed becomes ready later and inherits the session values
    let right = SimulatedEmbed::new("b", 60.0);
    coordinator.on_player_ready(Side::Right, right.clone());
    assert_eq!(right.rate(), 2.0);
    assert_eq!(right.volume(), 20);
}

#[tokio::test(start_paused = true)]
async fn test_sampler_lifecycle() {
    let rig = Rig::new(300.0, 300.0);
    rig.coordinator.play();
    rig.pump();
    assert!(rig.coordinator.sampler_running());
    assert_eq!(rig.coordinator.sampler_starts(), 1);

    // a second play while already playing must not stack another timer
    rig.coordinator.play();
    assert_eq!(rig.coordinator.sampler_starts(), 1);

    rig.left.advance(2.0);
    step(510).await;
    assert!((rig.coordinator.clock().current_time - 2.0).abs() < 1e-9);

    rig.coordinator.pause();
    assert!(!rig.coordinator.sampler_running());

    // the display no longer advances after the stop
    step(510).await;
    assert!((rig.coordinator.clock().current_time - 2.0).abs() < 1e-9);
}

#[tokio::test(start_paused = true)]
async fn test_sampler_cancels_itself_when_the_leader_handle_dies() {
    let rig = Rig::new(300.0, 300.0);
    rig.coordinator.play();
    rig.pump();
    assert!(rig.coordinator.sampler_running());

    rig.left.fail_calls(true);
    step(510).await;

    assert!(!rig.coordinator.sampler_running());
}

#[tokio::test(start_paused = true)]
async fn test_load_pair_cancels_stale_deferred_commands() {
    let rig = Rig::new(120.0, 120.0);
    rig.coordinator.play();

    // navigation happens before the staggered follower play fires
    rig.coordinator.load_pair(&pair("c", "d"));
    step(60).await;

    // the old embed never received the stale play
    assert_eq!(rig.right.raw_state(), -1);
    assert!(!rig.coordinator.is_playing());
}

#[tokio::test(start_paused = true)]
async fn test_load_pair_resets_transport_but_keeps_speed() {
    let rig = Rig::new(120.0, 120.0);
    rig.coordinator.set_speed(1.5);
    rig.coordinator.play();
    rig.pump();
    rig.left.advance(3.0);
    step(510).await;
    assert!(rig.coordinator.clock().current_time > 0.0);

    rig.coordinator.load_pair(&pair("c", "d"));

    let clock = rig.coordinator.clock();
    assert!(!clock.is_playing);
    assert_eq!(clock.current_time, 0.0);
    assert_eq!(clock.duration, 0.0);
    assert_eq!(clock.speed, 1.5);
    assert!(!rig.coordinator.sampler_running());
    assert!(!rig.coordinator.is_side_ready(Side::Left));
}

#[tokio::test(start_paused = true)]
async fn test_duration_probe_fires_after_ready() {
    let coordinator = PairCoordinator::new(PairLayout::Vertical);
    coordinator.load_pair(&pair("a", "b"));
    let left = SimulatedEmbed::new("a", 77.0);
    coordinator.on_player_ready(Side::Left, left);
    assert_eq!(coordinator.clock().duration, 0.0);

    step(510).await;

    assert_eq!(coordinator.clock().duration, 77.0);
}

#[tokio::test(start_paused = true)]
async fn test_playing_side_nudges_a_stalled_follower() {
    let rig = Rig::new(120.0, 120.0);

    // the left embed starts on its own; the right one silently stalls
    rig.left.emit_raw(1);
    rig.pump();
    assert_eq!(rig.right.raw_state(), -1);

    step(60).await;
    assert_eq!(rig.right.raw_state(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_failing_other_side_counts_as_stopped() {
    let rig = Rig::new(120.0, 120.0);
    rig.coordinator.play();
    step(60).await;
    rig.pump();
    assert!(rig.coordinator.is_playing());

    // right's iframe goes away mid-teardown; left then pauses
    rig.right.fail_calls(true);
    rig.left.emit_raw(2);
    rig.pump();

    assert!(!rig.coordinator.is_playing());
}

#[tokio::test(start_paused = true)]
async fn test_fullscreen_is_forwarded_to_one_side() {
    let rig = Rig::new(120.0, 120.0);
    assert!(rig.coordinator.request_fullscreen(Side::Right));
    assert_eq!(rig.right.fullscreen_requests(), 1);
    assert_eq!(rig.left.fullscreen_requests(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_widget_error_event_stops_a_lone_pair() {
    let rig = Rig::new(120.0, 120.0);
    rig.coordinator.play();
    step(60).await;
    rig.pump();

    rig.left.emit_raw(2);
    rig.pump();
    assert!(rig.coordinator.is_playing()); // right still playing

    rig.right.fail_calls(true);
    rig.coordinator.on_player_error(Side::Right, 101);
    assert!(!rig.coordinator.is_playing());
}
