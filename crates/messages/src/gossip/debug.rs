//! Debug/control gossip.

use crate::{envelope::MessageKind, NetworkMessage};
use palisade_types::DebugAction;
use serde::{Deserialize, Serialize};

/// An administrative debug action, broadcastable from a driver process.
///
/// Kept separate from the consensus message kinds: it is an explicit
/// administrative API, not part of the protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebugGossip {
    pub action: DebugAction,
}

impl DebugGossip {
    pub fn new(action: DebugAction) -> Self {
        Self { action }
    }
}

impl NetworkMessage for DebugGossip {
    fn kind() -> MessageKind {
        MessageKind::Debug
    }
}
