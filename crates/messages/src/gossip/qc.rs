//! Quorum certificate forwarding.

use crate::{envelope::MessageKind, NetworkMessage};
use palisade_types::QuorumCertificate;
use serde::{Deserialize, Serialize};

/// A quorum certificate forwarded by its aggregator.
///
/// Replicas advance on a forwarded QC exactly as the aggregator does; the
/// protocol is symmetric in what justifies a phase transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QcGossip {
    pub qc: QuorumCertificate,
}

impl QcGossip {
    pub fn new(qc: QuorumCertificate) -> Self {
        Self { qc }
    }
}

impl NetworkMessage for QcGossip {
    fn kind() -> MessageKind {
        MessageKind::Qc
    }
}
