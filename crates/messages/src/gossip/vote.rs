//! Vote gossip message.

use crate::{envelope::MessageKind, NetworkMessage};
use palisade_types::Vote;
use serde::{Deserialize, Serialize};

/// A consensus vote, sent to the view's leader for aggregation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteGossip {
    pub vote: Vote,
}

impl VoteGossip {
    pub fn new(vote: Vote) -> Self {
        Self { vote }
    }
}

impl NetworkMessage for VoteGossip {
    fn kind() -> MessageKind {
        MessageKind::Vote
    }
}
