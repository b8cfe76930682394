pub mod coordinator;
pub mod timeline;
pub mod tracker;

#[cfg(test)]
mod tests;

pub use coordinator::PairCoordinator;
pub use timeline::{PlaybackClock, TimelineSampler, format_time};
pub use tracker::PlayerTracker;
