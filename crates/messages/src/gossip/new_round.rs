//! New-round announcement gossip.

use crate::{envelope::MessageKind, NetworkMessage};
use palisade_types::NewRound;
use serde::{Deserialize, Serialize};

/// Round-advance announcement, broadcast when a pacemaker times out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewRoundGossip {
    pub announcement: NewRound,
}

impl NewRoundGossip {
    pub fn new(announcement: NewRound) -> Self {
        Self { announcement }
    }
}

impl NetworkMessage for NewRoundGossip {
    fn kind() -> MessageKind {
        MessageKind::NewRound
    }
}
