//! Views and consensus phases.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One attempt, identified by (height, round), to agree on the next block.
///
/// Height increases only on commit; round increases on timeout within a
/// height and resets to 0 when the height advances. Views are totally
/// ordered by (height, round).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub struct View {
    pub height: u64,
    pub round: u64,
}

impl View {
    /// Construct a view.
    pub fn new(height: u64, round: u64) -> Self {
        View { height, round }
    }

    /// The next round at the same height (view change).
    pub fn next_round(&self) -> View {
        View {
            height: self.height,
            round: self.round + 1,
        }
    }

    /// Round 0 of the next height (commit).
    pub fn next_height(&self) -> View {
        View {
            height: self.height + 1,
            round: 0,
        }
    }
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.height, self.round)
    }
}

/// The four voting phases of a view.
///
/// A quorum certificate for one phase justifies entering the next; a
/// Decide-phase certificate is the sole justification for committing.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum Phase {
    Prepare,
    PreCommit,
    Commit,
    Decide,
}

impl Phase {
    /// The phase entered once a QC for this phase is observed.
    /// Returns `None` for `Decide`: its QC triggers the commit instead.
    pub fn next(&self) -> Option<Phase> {
        match self {
            Phase::Prepare => Some(Phase::PreCommit),
            Phase::PreCommit => Some(Phase::Commit),
            Phase::Commit => Some(Phase::Decide),
            Phase::Decide => None,
        }
    }

    /// Stable single-byte tag used in signing messages.
    pub fn tag(&self) -> u8 {
        match self {
            Phase::Prepare => 0,
            Phase::PreCommit => 1,
            Phase::Commit => 2,
            Phase::Decide => 3,
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Prepare => "Prepare",
            Phase::PreCommit => "PreCommit",
            Phase::Commit => "Commit",
            Phase::Decide => "Decide",
        };
        write!(f, "{}", name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_view_ordering() {
        assert!(View::new(1, 5) < View::new(2, 0));
        assert!(View::new(2, 0) < View::new(2, 1));
    }

    #[test]
    fn test_round_resets_on_height_advance() {
        let v = View::new(3, 7);
        assert_eq!(v.next_height(), View::new(4, 0));
        assert_eq!(v.next_round(), View::new(3, 8));
    }

    #[test]
    fn test_phase_chain_ends_at_decide() {
        assert_eq!(Phase::Prepare.next(), Some(Phase::PreCommit));
        assert_eq!(Phase::PreCommit.next(), Some(Phase::Commit));
        assert_eq!(Phase::Commit.next(), Some(Phase::Decide));
        assert_eq!(Phase::Decide.next(), None);
    }
}
