//! Outbound message types for network communication.

use palisade_messages::{
    DebugGossip, DkgShareGossip, GetBlockRequest, GetBlockResponse, NewRoundGossip, ProposalGossip,
    QcGossip, VoteGossip,
};

/// Outbound network messages.
///
/// These are the messages a node can send to other nodes. The runner handles
/// the actual network I/O.
#[derive(Debug, Clone)]
pub enum OutboundMessage {
    /// Block proposal for the current view.
    Proposal(ProposalGossip),

    /// Vote on a proposal, addressed to the view's leader.
    Vote(VoteGossip),

    /// Forwarded quorum certificate.
    Qc(QcGossip),

    /// Round-advance announcement (pacemaker timeout).
    NewRound(NewRoundGossip),

    /// DKG ceremony share, addressed to one participant.
    DkgShare(DkgShareGossip),

    /// State-sync block request.
    BlockRequest(GetBlockRequest),

    /// State-sync block response.
    BlockResponse(GetBlockResponse),

    /// Administrative debug action.
    Debug(DebugGossip),
}

impl OutboundMessage {
    /// Get a human-readable name for this message type.
    pub fn type_name(&self) -> &'static str {
        match self {
            OutboundMessage::Proposal(_) => "Proposal",
            OutboundMessage::Vote(_) => "Vote",
            OutboundMessage::Qc(_) => "Qc",
            OutboundMessage::NewRound(_) => "NewRound",
            OutboundMessage::DkgShare(_) => "DkgShare",
            OutboundMessage::BlockRequest(_) => "BlockRequest",
            OutboundMessage::BlockResponse(_) => "BlockResponse",
            OutboundMessage::Debug(_) => "Debug",
        }
    }

    /// Check if this is a HotStuff consensus message.
    pub fn is_consensus(&self) -> bool {
        matches!(
            self,
            OutboundMessage::Proposal(_)
                | OutboundMessage::Vote(_)
                | OutboundMessage::Qc(_)
                | OutboundMessage::NewRound(_)
        )
    }

    /// Check if this is a state-sync message.
    pub fn is_sync(&self) -> bool {
        matches!(
            self,
            OutboundMessage::BlockRequest(_) | OutboundMessage::BlockResponse(_)
        )
    }
}
