//! State-sync responses.

use crate::{envelope::MessageKind, NetworkMessage};
use palisade_types::{Block, QuorumCertificate};
use serde::{Deserialize, Serialize};

/// Response to a [`crate::GetBlockRequest`].
///
/// `block` and `qc` are both `None` when the peer does not have the
/// requested height; a response carrying only one of the two is malformed
/// and rejected by the requester.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetBlockResponse {
    pub height: u64,
    pub block: Option<Block>,
    pub qc: Option<QuorumCertificate>,
}

impl GetBlockResponse {
    pub fn found(height: u64, block: Block, qc: QuorumCertificate) -> Self {
        Self {
            height,
            block: Some(block),
            qc: Some(qc),
        }
    }

    pub fn not_found(height: u64) -> Self {
        Self {
            height,
            block: None,
            qc: None,
        }
    }
}

impl NetworkMessage for GetBlockResponse {
    fn kind() -> MessageKind {
        MessageKind::BlockResponse
    }
}
