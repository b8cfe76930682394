use log::debug;

use crate::embed::Side;

/// The currently active (left, right) content-id pair.
///
/// `None` on a side means "no content for this side"; the other side
/// still plays on its own.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SidePair {
    pub left: Option<String>,
    pub right: Option<String>,
}

impl SidePair {
    pub fn get(&self, side: Side) -> Option<&str> {
        match side {
            Side::Left => self.left.as_deref(),
            Side::Right => self.right.as_deref(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.left.is_none() && self.right.is_none()
    }
}

/// Maintains the two ordered video-id sequences and the per-side cursor
/// into each.
///
/// The two sides advance pair-wise but wrap independently: each side's
/// index moves modulo that side's own length, so a short playlist cycles
/// while a longer one keeps going instead of both being cut to the
/// shorter length.
#[derive(Debug, Default)]
pub struct PlaylistNavigator {
    left_ids: Vec<String>,
    right_ids: Vec<String>,
    index_left: usize,
    index_right: usize,
}

impl PlaylistNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace both sequences and rewind both cursors to the start.
    pub fn set_sequences(&mut self, left_ids: Vec<String>, right_ids: Vec<String>) {
        debug!(
            "playlists loaded: {} left ids, {} right ids",
            left_ids.len(),
            right_ids.len()
        );
        self.left_ids = left_ids;
        self.right_ids = right_ids;
        self.index_left = 0;
        self.index_right = 0;
    }

    /// The pair at the current cursor position.
    pub fn current(&self) -> SidePair {
        SidePair {
            left: self.left_ids.get(self.index_left).cloned(),
            right: self.right_ids.get(self.index_right).cloned(),
        }
    }

    /// Advance each side one step, wrapping per side.
    ///
    /// No-op when both sequences are empty.
    pub fn next(&mut self) -> SidePair {
        if !self.left_ids.is_empty() {
            self.index_left = (self.index_left + 1) % self.left_ids.len();
        }
        if !self.right_ids.is_empty() {
            self.index_right = (self.index_right + 1) % self.right_ids.len();
        }
        self.current()
    }

    /// Step each side back one, wrapping per side.
    ///
    /// No-op when both sequences are empty.
    pub fn previous(&mut self) -> SidePair {
        if !self.left_ids.is_empty() {
            let len = self.left_ids.len();
            self.index_left = (self.index_left + len - 1) % len;
        }
        if !self.right_ids.is_empty() {
            let len = self.right_ids.len();
            self.index_right = (self.index_right + len - 1) % len;
        }
        self.current()
    }

    /// Current (left, right) cursor positions.
    pub fn indices(&self) -> (usize, usize) {
        (self.index_left, self.index_right)
    }

    /// Lengths of the (left, right) sequences.
    pub fn lengths(&self) -> (usize, usize) {
        (self.left_ids.len(), self.right_ids.len())
    }

    pub fn is_empty(&self) -> bool {
        self.left_ids.is_empty() && self.right_ids.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_sides_wrap_independently() {
        let mut nav = PlaylistNavigator::new();
        nav.set_sequences(ids(&["A", "B", "C"]), ids(&["X", "Y"]));

        assert_eq!(nav.indices(), (0, 0));
        nav.next();
        assert_eq!(nav.indices(), (1, 1));
        nav.next();
        assert_eq!(nav.indices(), (2, 0));
        nav.next();
        assert_eq!(nav.indices(), (0, 1));
        nav.next();
        assert_eq!(nav.indices(), (1, 0));
    }

    #[test]
    fn test_previous_wraps_at_the_front() {
        let mut nav = PlaylistNavigator::new();
        nav.set_sequences(ids(&["A", "B", "C"]), ids(&["X", "Y"]));

        let pair = nav.previous();
        assert_eq!(nav.indices(), (2, 1));
        assert_eq!(pair.left.as_deref(), Some("C"));
        assert_eq!(pair.right.as_deref(), Some("Y"));
    }

    #[test]
    fn test_indices_stay_in_bounds() {
        let mut nav = PlaylistNavigator::new();
        nav.set_sequences(ids(&["A", "B", "C", "D", "E"]), ids(&["X", "Y", "Z"]));

        for step in 0..40 {
            let (l, r) = nav.indices();
            assert!(l < 5 && r < 3, "out of bounds at step {step}");
            if step % 3 == 0 {
                nav.previous();
            } else {
                nav.next();
            }
        }
    }

    #[test]
    fn test_empty_side_pairs_with_none() {
        let mut nav = PlaylistNavigator::new();
        nav.set_sequences(ids(&["A", "B"]), Vec::new());

        let pair = nav.current();
        assert_eq!(pair.left.as_deref(), Some("A"));
        assert_eq!(pair.right, None);
        assert!(!pair.is_empty());

        let pair = nav.next();
        assert_eq!(pair.left.as_deref(), Some("B"));
        assert_eq!(pair.right, None);
    }

    #[test]
    fn test_both_empty_is_a_no_op() {
        let mut nav = PlaylistNavigator::new();
        assert!(nav.is_empty());
        assert_eq!(nav.next(), SidePair::default());
        assert_eq!(nav.previous(), SidePair::default());
        assert_eq!(nav.indices(), (0, 0));
    }

    #[test]
    fn test_set_sequences_rewinds() {
        let mut nav = PlaylistNavigator::new();
        nav.set_sequences(ids(&["A", "B", "C"]), ids(&["X", "Y"]));
        nav.next();
        nav.next();

        nav.set_sequences(ids(&["P", "Q"]), ids(&["R"]));
        assert_eq!(nav.indices(), (0, 0));
        assert_eq!(nav.current().left.as_deref(), Some("P"));
        assert_eq!(nav.current().right.as_deref(), Some("R"));
    }
}
