//! Network messages for the consensus protocol.

pub mod envelope;
pub mod gossip;
pub mod request;
pub mod response;

// Re-export commonly used types
pub use envelope::{CodecError, Envelope, MessageKind, WIRE_VERSION};
pub use gossip::{
    DebugGossip, DkgShareGossip, NewRoundGossip, ProposalGossip, QcGossip, VoteGossip,
};
pub use request::GetBlockRequest;
pub use response::GetBlockResponse;

/// Marker trait for messages carried on the consensus wire.
pub trait NetworkMessage {
    /// The envelope kind this message travels under.
    fn kind() -> MessageKind;
}
