//! Consensus votes.

use crate::{Address, Hash, Phase, View, VoteSignature};
use serde::{Deserialize, Serialize};

/// A validator's vote for `block_hash` in one phase of one view.
///
/// A validator casts at most one vote per (view, phase); a second vote for a
/// different block at the same (view, phase) is equivocation evidence and is
/// flagged by the aggregator rather than silently dropped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vote {
    pub view: View,
    pub block_hash: Hash,
    pub phase: Phase,
    pub voter: Address,
    /// Partial signature over [`crate::consensus_vote_message`]; Ed25519 in
    /// individual mode, a threshold share after a successful DKG.
    pub signature: VoteSignature,
}

impl Vote {
    /// Key identifying the vote slot this vote occupies.
    pub fn slot(&self) -> (View, Phase) {
        (self.view, self.phase)
    }
}
