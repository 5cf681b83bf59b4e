//! Wire envelope encoding and decoding.
//!
//! # Wire Format
//!
//! ```text
//! [version: u8][kind: u8][sender: 20-byte address][payload: bincode]
//! ```
//!
//! The kind byte is a closed set: decoding fails with a distinguishable
//! error for an unknown version, an unknown kind, a truncated header, or a
//! payload that does not parse as the kind's message type. Callers must not
//! attempt partial interpretation of a failed decode - the message is
//! dropped.

use crate::NetworkMessage;
use palisade_types::Address;
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

/// Current wire format version.
pub const WIRE_VERSION: u8 = 1;

/// Bytes preceding the payload: version, kind, sender address.
const HEADER_LEN: usize = 2 + 20;

/// Errors that can occur during message encoding/decoding.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("Unknown wire version: {0}")]
    UnknownVersion(u8),

    #[error("Unknown message kind: {0}")]
    UnknownKind(u8),

    #[error("Message truncated: {len} bytes, need at least {need}")]
    Truncated { len: usize, need: usize },

    #[error("Payload does not decode as {kind:?}: {reason}")]
    Payload { kind: MessageKind, reason: String },

    #[error("Encode error: {0}")]
    Encode(String),
}

/// The closed set of consensus message kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MessageKind {
    Proposal = 1,
    Vote = 2,
    Qc = 3,
    NewRound = 4,
    DkgShare = 5,
    BlockRequest = 6,
    BlockResponse = 7,
    Debug = 8,
}

impl MessageKind {
    /// Parse a kind byte. Unknown bytes are a total, checkable case.
    pub fn from_byte(byte: u8) -> Result<Self, CodecError> {
        match byte {
            1 => Ok(MessageKind::Proposal),
            2 => Ok(MessageKind::Vote),
            3 => Ok(MessageKind::Qc),
            4 => Ok(MessageKind::NewRound),
            5 => Ok(MessageKind::DkgShare),
            6 => Ok(MessageKind::BlockRequest),
            7 => Ok(MessageKind::BlockResponse),
            8 => Ok(MessageKind::Debug),
            other => Err(CodecError::UnknownKind(other)),
        }
    }
}

/// A decoded envelope: sender, kind, and the raw payload bytes.
#[derive(Debug, Clone)]
pub struct Envelope {
    pub sender: Address,
    pub kind: MessageKind,
    payload: Vec<u8>,
}

impl Envelope {
    /// Decode the payload as the typed message for `T`'s kind.
    ///
    /// Fails with [`CodecError::Payload`] on a kind/payload mismatch.
    pub fn payload<T: NetworkMessage + DeserializeOwned>(&self) -> Result<T, CodecError> {
        debug_assert_eq!(self.kind, T::kind());
        bincode::deserialize(&self.payload).map_err(|e| CodecError::Payload {
            kind: self.kind,
            reason: e.to_string(),
        })
    }
}

/// Encode a message into wire format.
pub fn encode<T: NetworkMessage + Serialize>(
    sender: Address,
    message: &T,
) -> Result<Vec<u8>, CodecError> {
    let payload = bincode::serialize(message).map_err(|e| CodecError::Encode(e.to_string()))?;
    let mut bytes = Vec::with_capacity(HEADER_LEN + payload.len());
    bytes.push(WIRE_VERSION);
    bytes.push(T::kind() as u8);
    bytes.extend_from_slice(sender.as_bytes());
    bytes.extend_from_slice(&payload);
    Ok(bytes)
}

/// Decode the envelope header, returning sender, kind, and payload bytes.
pub fn decode(data: &[u8]) -> Result<Envelope, CodecError> {
    if data.len() < HEADER_LEN {
        return Err(CodecError::Truncated {
            len: data.len(),
            need: HEADER_LEN,
        });
    }

    let version = data[0];
    if version != WIRE_VERSION {
        return Err(CodecError::UnknownVersion(version));
    }

    let kind = MessageKind::from_byte(data[1])?;

    let mut sender = [0u8; 20];
    sender.copy_from_slice(&data[2..HEADER_LEN]);

    Ok(Envelope {
        sender: Address(sender),
        kind,
        payload: data[HEADER_LEN..].to_vec(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DebugGossip, GetBlockRequest, ProposalGossip, VoteGossip};
    use palisade_types::{Block, DebugAction, Hash, KeyPair, Phase, View, Vote, VoteSignature};

    fn sender() -> Address {
        KeyPair::from_seed([1u8; 32]).address()
    }

    #[test]
    fn test_encode_decode_proposal() {
        let gossip = ProposalGossip::new(Block::genesis());
        let bytes = encode(sender(), &gossip).unwrap();
        assert_eq!(bytes[0], WIRE_VERSION);
        assert_eq!(bytes[1], MessageKind::Proposal as u8);

        let envelope = decode(&bytes).unwrap();
        assert_eq!(envelope.sender, sender());
        assert_eq!(envelope.kind, MessageKind::Proposal);
        let decoded: ProposalGossip = envelope.payload().unwrap();
        assert_eq!(decoded, gossip);
    }

    #[test]
    fn test_encode_decode_vote() {
        let key = KeyPair::from_seed([2u8; 32]);
        let vote = Vote {
            view: View::new(3, 1),
            block_hash: Hash::digest(b"block"),
            phase: Phase::PreCommit,
            voter: key.address(),
            signature: VoteSignature::Ed25519(key.sign(b"msg")),
        };
        let gossip = VoteGossip::new(vote.clone());
        let bytes = encode(sender(), &gossip).unwrap();
        let decoded: VoteGossip = decode(&bytes).unwrap().payload().unwrap();
        assert_eq!(decoded.vote, vote);
    }

    #[test]
    fn test_encode_decode_debug() {
        let gossip = DebugGossip::new(DebugAction::TriggerNextView);
        let bytes = encode(sender(), &gossip).unwrap();
        let decoded: DebugGossip = decode(&bytes).unwrap().payload().unwrap();
        assert_eq!(decoded.action, DebugAction::TriggerNextView);
    }

    #[test]
    fn test_unknown_version() {
        let mut bytes = encode(sender(), &GetBlockRequest::new(5)).unwrap();
        bytes[0] = 99;
        assert!(matches!(decode(&bytes), Err(CodecError::UnknownVersion(99))));
    }

    #[test]
    fn test_unknown_kind() {
        let mut bytes = encode(sender(), &GetBlockRequest::new(5)).unwrap();
        bytes[1] = 0xEE;
        assert!(matches!(decode(&bytes), Err(CodecError::UnknownKind(0xEE))));
    }

    #[test]
    fn test_truncated_header() {
        let bytes = vec![WIRE_VERSION, MessageKind::Vote as u8, 0, 1];
        assert!(matches!(decode(&bytes), Err(CodecError::Truncated { .. })));
    }

    #[test]
    fn test_payload_kind_mismatch() {
        // A BlockRequest payload does not parse as a proposal.
        let mut bytes = encode(sender(), &GetBlockRequest::new(5)).unwrap();
        bytes[1] = MessageKind::Proposal as u8;
        let envelope = decode(&bytes).unwrap();
        let result: Result<ProposalGossip, _> = envelope.payload();
        assert!(matches!(result, Err(CodecError::Payload { .. })));
    }
}
