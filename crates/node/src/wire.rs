//! Wire adapter: actions/events ↔ envelope bytes.
//!
//! Encoding dispatches on the outbound message kind; decoding is total over
//! the closed kind set and maps each payload to its inbound [`Event`]. A
//! failed decode is surfaced to the caller, which drops the message -
//! never partially interpreted.

use palisade_core::{Event, OutboundMessage};
use palisade_messages::{
    envelope, CodecError, DebugGossip, DkgShareGossip, GetBlockRequest, GetBlockResponse,
    MessageKind, NewRoundGossip, ProposalGossip, QcGossip, VoteGossip,
};
use palisade_types::Address;

/// Encode an outbound message into envelope bytes.
pub fn encode_message(message: &OutboundMessage, sender: Address) -> Result<Vec<u8>, CodecError> {
    match message {
        OutboundMessage::Proposal(gossip) => envelope::encode(sender, gossip),
        OutboundMessage::Vote(gossip) => envelope::encode(sender, gossip),
        OutboundMessage::Qc(gossip) => envelope::encode(sender, gossip),
        OutboundMessage::NewRound(gossip) => envelope::encode(sender, gossip),
        OutboundMessage::DkgShare(gossip) => envelope::encode(sender, gossip),
        OutboundMessage::BlockRequest(request) => envelope::encode(sender, request),
        OutboundMessage::BlockResponse(response) => envelope::encode(sender, response),
        OutboundMessage::Debug(gossip) => envelope::encode(sender, gossip),
    }
}

/// Decode envelope bytes into the sender and the inbound event.
pub fn decode_message(data: &[u8]) -> Result<(Address, Event), CodecError> {
    let env = envelope::decode(data)?;
    let sender = env.sender;

    let event = match env.kind {
        MessageKind::Proposal => {
            let gossip: ProposalGossip = env.payload()?;
            Event::ProposalReceived {
                block: gossip.block,
            }
        }
        MessageKind::Vote => {
            let gossip: VoteGossip = env.payload()?;
            Event::VoteReceived { vote: gossip.vote }
        }
        MessageKind::Qc => {
            let gossip: QcGossip = env.payload()?;
            Event::QcReceived { qc: gossip.qc }
        }
        MessageKind::NewRound => {
            let gossip: NewRoundGossip = env.payload()?;
            Event::NewRoundReceived {
                announcement: gossip.announcement,
            }
        }
        MessageKind::DkgShare => {
            let gossip: DkgShareGossip = env.payload()?;
            Event::DkgShareReceived {
                share: gossip.share,
            }
        }
        MessageKind::BlockRequest => {
            let request: GetBlockRequest = env.payload()?;
            Event::BlockRequestReceived {
                from: sender,
                height: request.height,
            }
        }
        MessageKind::BlockResponse => {
            let response: GetBlockResponse = env.payload()?;
            Event::BlockResponseReceived {
                height: response.height,
                block: response.block,
                qc: response.qc,
            }
        }
        MessageKind::Debug => {
            let gossip: DebugGossip = env.payload()?;
            Event::DebugCommandReceived {
                action: gossip.action,
            }
        }
    };

    Ok((sender, event))
}
