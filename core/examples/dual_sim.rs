use std::sync::Arc;
use std::time::Duration;

use duoplay_core::{
    PairCoordinator, PairLayout, PlaylistNavigator, Side, SidePair, SimulatedEmbed, format_time,
};

/// Drives a coordinated pair of simulated embeds through a full session:
/// ready, synchronized play, a pause, a seek, and one loop restart once
/// both sides have ended.
#[tokio::main]
async fn main() {
    env_logger::init();

    let mut navigator = PlaylistNavigator::new();
    navigator.set_sequences(
        vec!["left-vid-01".to_string(), "left-vid-02".to_string()],
        vec!["right-vid-1".to_string()],
    );

    let coordinator = PairCoordinator::new(PairLayout::Vertical);
    let pair = navigator.current();
    let (left, right) = load_embeds(&coordinator, &pair);

    println!("pair loaded: {:?} / {:?}", pair.left, pair.right);
    coordinator.play();
    println!("play issued (leader first, follower staggered)");

    let mut paused_once = false;
    for tick in 0.. {
        tokio::time::sleep(Duration::from_millis(250)).await;

        // a quarter second of wall time moves the simulated videos 1s
        left.advance(1.0);
        right.advance(1.0);
        pump(&coordinator, &left, &right);

        let clock = coordinator.clock();
        println!(
            "t={} / {}  playing={}  left={}  right={}",
            format_time(clock.current_time),
            format_time(clock.duration),
            clock.is_playing,
            left.raw_state(),
            right.raw_state(),
        );

        // exercise pause/resume and a shared seek once mid-way
        if tick == 3 && !paused_once {
            paused_once = true;
            coordinator.pause();
            println!("paused both sides");
            tokio::time::sleep(Duration::from_millis(500)).await;
            coordinator.seek(2.0);
            coordinator.play();
            println!("sought to 00:02 and resumed");
        }

        // one loop restart is enough for the demonstration
        if tick > 12 {
            break;
        }
    }

    coordinator.pause();
    println!("done");
}

fn load_embeds(
    coordinator: &PairCoordinator,
    pair: &SidePair,
) -> (Arc<SimulatedEmbed>, Arc<SimulatedEmbed>) {
    coordinator.load_pair(pair);
    let left = SimulatedEmbed::new(pair.left.clone().unwrap_or_default(), 8.0);
    let right = SimulatedEmbed::new(pair.right.clone().unwrap_or_default(), 5.0);
    coordinator.on_player_ready(Side::Left, left.clone());
    coordinator.on_player_ready(Side::Right, right.clone());
    (left, right)
}

fn pump(coordinator: &PairCoordinator, left: &Arc<SimulatedEmbed>, right: &Arc<SimulatedEmbed>) {
    for raw in left.take_events() {
        coordinator.on_state_change(Side::Left, raw);
    }
    for raw in right.take_events() {
        coordinator.on_state_change(Side::Right, raw);
    }
}
