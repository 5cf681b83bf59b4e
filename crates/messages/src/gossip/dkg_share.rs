//! DKG share gossip.

use crate::{envelope::MessageKind, NetworkMessage};
use palisade_types::DkgShare;
use serde::{Deserialize, Serialize};

/// A dealer's DKG share, sent point-to-point to its recipient.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DkgShareGossip {
    pub share: DkgShare,
}

impl DkgShareGossip {
    pub fn new(share: DkgShare) -> Self {
        Self { share }
    }
}

impl NetworkMessage for DkgShareGossip {
    fn kind() -> MessageKind {
        MessageKind::DkgShare
    }
}
