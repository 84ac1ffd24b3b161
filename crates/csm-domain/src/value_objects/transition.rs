//! The edge ("Transition") value type.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Placeholder prompt written onto a jump target's snapshot when it is
/// created purely as the destination of an arbitrary transition; replaced
/// with a real prompt the first time that snapshot is reached sequentially.
pub const PLACEHOLDER_PROMPT: &str = "Arbitrary transition";

/// An edge connecting two snapshots.
///
/// Sequential transitions satisfy `next_state == current_state + 1` and are
/// always paired with the creation of `next_state`'s snapshot. Jumps point at
/// an already-existing snapshot and never create a new one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transition {
    /// Dense, monotone, 1-based identifier.
    pub transition_id: u64,
    /// The snapshot this edge originates from.
    pub current_state: u64,
    /// The snapshot this edge points to.
    pub next_state: u64,
    /// Optional per-transition prompt, distinct from the target snapshot's
    /// own `user_prompt`.
    pub user_prompt: Option<String>,
    /// When the edge was recorded.
    pub timestamp: DateTime<Utc>,
}

impl Transition {
    /// `true` when this edge was produced by a sequential (non-jump) transition.
    pub fn is_sequential(&self) -> bool {
        self.next_state == self.current_state + 1
    }

    /// `true` when this edge is a jump to a non-adjacent, already-existing snapshot.
    pub fn is_jump(&self) -> bool {
        !self.is_sequential()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(current_state: u64, next_state: u64) -> Transition {
        Transition {
            transition_id: 1,
            current_state,
            next_state,
            user_prompt: None,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn sequential_edges_are_adjacent() {
        let t = sample(3, 4);
        assert!(t.is_sequential());
        assert!(!t.is_jump());
    }

    #[test]
    fn non_adjacent_edges_are_jumps() {
        let t = sample(3, 1);
        assert!(t.is_jump());
        assert!(!t.is_sequential());
    }
}
