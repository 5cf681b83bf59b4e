//! The ledger/persistence collaborator.

use palisade_types::{Address, Block, Hash, QuorumCertificate, ValidatorSet};
use thiserror::Error;

/// Errors surfaced by the ledger.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("block at height {height} does not extend the chain: {reason}")]
    InvalidBlock { height: u64, reason: String },

    #[error("transaction rejected: {0}")]
    InvalidTransaction(String),

    #[error("height {attempted} is not the next commit height (committed: {committed})")]
    NonSequentialCommit { committed: u64, attempted: u64 },

    #[error("storage failure: {0}")]
    Storage(String),
}

/// Lifecycle status of a staked actor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActorStatus {
    Staked,
    Unstaking,
    Paused,
}

/// The external ledger: the only other writer of durable chain state.
///
/// Consensus invokes it synchronously from within state-machine handlers -
/// never concurrently from two handlers - and the ledger serializes writes
/// per height. Validator sets are snapshotted per height and mutated only by
/// applying committed blocks, never in place by the consensus core.
pub trait Ledger: Send + Sync {
    /// Validate `block` against the current chain tip and compute the state
    /// hash it would produce, without committing anything.
    ///
    /// Used when voting: a proposal whose speculative application fails is
    /// not voted for.
    fn speculate(&self, block: &Block) -> Result<Hash, LedgerError>;

    /// Durably apply a block certified by `qc`. Returns the resulting state
    /// hash. Commits must be sequential by height.
    fn commit(&self, block: &Block, qc: &QuorumCertificate) -> Result<Hash, LedgerError>;

    /// The latest committed height (0 = genesis only).
    fn committed_height(&self) -> u64;

    /// Hash of the latest committed block.
    fn committed_hash(&self) -> Hash;

    /// A committed block and its certifying QC, for serving state sync.
    fn block(&self, height: u64) -> Option<(Block, QuorumCertificate)>;

    /// The validator set snapshot for `height`.
    fn validator_set(&self, height: u64) -> ValidatorSet;

    /// Drop everything back to the genesis state (debug surface).
    fn reset_to_genesis(&self);

    // ─── Actor lifecycle queries (read-only for the consensus core) ───

    /// Whether an actor exists at `height`.
    fn actor_exists(&self, address: &Address, height: u64) -> bool;

    /// An actor's lifecycle status at `height`.
    fn actor_status(&self, address: &Address, height: u64) -> Option<ActorStatus>;

    /// The height at which an actor paused, if paused.
    fn pause_height(&self, address: &Address, height: u64) -> Option<u64>;

    /// The height at which an actor's unstaking completes, if unstaking.
    fn unstaking_height(&self, address: &Address, height: u64) -> Option<u64>;
}
