//! Blocks and transactions.

use crate::{Address, Hash, QuorumCertificate, View};
use serde::{Deserialize, Serialize};

/// An opaque transaction payload.
///
/// The consensus core orders transactions; interpreting them is the ledger's
/// job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub payload: Vec<u8>,
}

impl Transaction {
    pub fn new(payload: Vec<u8>) -> Self {
        Transaction { payload }
    }

    pub fn hash(&self) -> Hash {
        Hash::digest(&self.payload)
    }
}

/// Consensus metadata for a block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeader {
    pub height: u64,
    /// Round the block was proposed in (part of the block identity: the same
    /// payload re-proposed in a later round is a different block).
    pub round: u64,
    pub proposer: Address,
    pub parent_hash: Hash,
    /// Proposer-local wall clock, milliseconds.
    pub timestamp_ms: u64,
}

/// A block proposal: header, the QC justifying its parent, and the ordered
/// transaction payload. Immutable once created; the canonical copy of a
/// committed block is owned by the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub header: BlockHeader,
    /// Quorum certificate for the parent block (Decide phase), or the
    /// genesis QC for the first block.
    pub justify_qc: QuorumCertificate,
    pub transactions: Vec<Transaction>,
}

impl Block {
    /// The view this block was proposed in.
    pub fn view(&self) -> View {
        View::new(self.header.height, self.header.round)
    }

    /// The block's content hash.
    ///
    /// Covers the header fields and the transaction hashes; the justify QC is
    /// excluded so that a block's identity is independent of which equivalent
    /// quorum proof the proposer happened to attach.
    pub fn hash(&self) -> Hash {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&self.header.height.to_le_bytes());
        hasher.update(&self.header.round.to_le_bytes());
        hasher.update(self.header.proposer.as_bytes());
        hasher.update(self.header.parent_hash.as_bytes());
        hasher.update(&self.header.timestamp_ms.to_le_bytes());
        for tx in &self.transactions {
            hasher.update(tx.hash().as_bytes());
        }
        Hash::from_raw(*hasher.finalize().as_bytes())
    }

    /// The genesis block: height 0, zero parent, empty payload.
    pub fn genesis() -> Self {
        Block {
            header: BlockHeader {
                height: 0,
                round: 0,
                proposer: Address([0u8; 20]),
                parent_hash: Hash::ZERO,
                timestamp_ms: 0,
            },
            justify_qc: QuorumCertificate::genesis(),
            transactions: Vec::new(),
        }
    }
}
