//! State-sync requests.

use crate::{envelope::MessageKind, NetworkMessage};
use serde::{Deserialize, Serialize};

/// Request for the committed block at one height.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetBlockRequest {
    pub height: u64,
}

impl GetBlockRequest {
    pub fn new(height: u64) -> Self {
        Self { height }
    }
}

impl NetworkMessage for GetBlockRequest {
    fn kind() -> MessageKind {
        MessageKind::BlockRequest
    }
}
