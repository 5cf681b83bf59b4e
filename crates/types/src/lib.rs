//! Core types for Palisade consensus.
//!
//! This crate provides the foundational types used throughout the validator
//! node:
//!
//! - **Primitives**: Hash, cryptographic keys and signatures
//! - **Identifiers**: Address, View, VotePower
//! - **Consensus types**: Block, Vote, QuorumCertificate, ValidatorSet
//! - **Signing**: domain-separated message construction for votes
//!
//! # Design Philosophy
//!
//! This crate is self-contained and does not depend on any other workspace
//! crates, making it the foundation layer. Everything that crosses the wire
//! or is shared between subsystems lives here.

mod crypto;
mod hash;
mod identifiers;
mod signer_bitfield;
mod signing;
mod view;

// Consensus types
mod block;
mod dkg_share;
mod new_round;
mod quorum_certificate;
mod validator;
mod vote;

pub use crypto::{AggregateSignature, KeyPair, PublicKey, Signature, VoteSignature};
pub use hash::{Hash, HexError};
pub use identifiers::{Address, VotePower};
pub use signer_bitfield::SignerBitfield;
pub use signing::{consensus_vote_message, new_round_message, DOMAIN_NEW_ROUND, DOMAIN_VOTE};
pub use view::{Phase, View};

pub use block::{Block, BlockHeader, Transaction};
pub use dkg_share::DkgShare;
pub use new_round::NewRound;
pub use quorum_certificate::{QcError, QuorumCertificate};
pub use validator::{ValidatorInfo, ValidatorSet};
pub use vote::Vote;

// Re-export the threshold scheme types used by the DKG subsystem so other
// crates don't need a direct threshold_crypto dependency for type names.
pub use threshold_crypto::{
    PublicKey as GroupPublicKey, PublicKeySet, SecretKeyShare, SignatureShare,
};

/// Deterministic fixtures shared by tests across the workspace.
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils {
    pub use crate::validator::test_utils::*;
}

/// Debug/control actions broadcastable over the network.
///
/// This is a deliberate administrative backdoor for driving distributed test
/// scenarios from a single process. Unknown actions fail at decode
/// and are logged and ignored by the receiver, never fatal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum DebugAction {
    /// Advance the pacemaker one view (manual-mode driver).
    TriggerNextView,
    /// Start a distributed key generation ceremony.
    TriggerDkg,
    /// Toggle the pacemaker between wall-clock and manual advancement.
    TogglePacemakerManualMode,
    /// Reset consensus, sync, and ledger state back to genesis.
    ResetToGenesis,
    /// Log a diagnostic snapshot of the node's state.
    PrintNodeState,
}

impl DebugAction {
    /// Human-readable name for logging.
    pub fn name(&self) -> &'static str {
        match self {
            DebugAction::TriggerNextView => "TriggerNextView",
            DebugAction::TriggerDkg => "TriggerDkg",
            DebugAction::TogglePacemakerManualMode => "TogglePacemakerManualMode",
            DebugAction::ResetToGenesis => "ResetToGenesis",
            DebugAction::PrintNodeState => "PrintNodeState",
        }
    }
}
