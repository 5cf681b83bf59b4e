//! Proposal gossip message.

use crate::{envelope::MessageKind, NetworkMessage};
use palisade_types::Block;
use serde::{Deserialize, Serialize};

/// A leader's block proposal for the current view.
///
/// The justify QC travels inside the block, so a replica that missed the
/// previous commit learns of it from any proposal that builds on it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalGossip {
    pub block: Block,
}

impl ProposalGossip {
    pub fn new(block: Block) -> Self {
        Self { block }
    }
}

impl NetworkMessage for ProposalGossip {
    fn kind() -> MessageKind {
        MessageKind::Proposal
    }
}
