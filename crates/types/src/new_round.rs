//! Round-advance announcements.

use crate::{new_round_message, Address, PublicKey, Signature, View};
use serde::{Deserialize, Serialize};

/// Announcement that a validator's pacemaker advanced to `view`.
///
/// Broadcast on view timeout so lagging peers converge on the rotated
/// leader. Receivers treat this as a hint, not a command: an announcement
/// only moves a peer forward by a single round at its current height.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewRound {
    /// The view the sender advanced to.
    pub view: View,
    pub from: Address,
    /// Ed25519 signature over [`crate::new_round_message`].
    pub signature: Signature,
}

impl NewRound {
    /// Verify the announcement's signature.
    pub fn verify(&self, public_key: &PublicKey) -> bool {
        public_key.verify(&new_round_message(self.view), &self.signature)
    }
}
