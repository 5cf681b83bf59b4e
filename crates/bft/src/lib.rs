//! BFT consensus state machine.
//!
//! This crate provides the HotStuff-style consensus core as a synchronous,
//! event-driven model.
//!
//! # Architecture
//!
//! Per view `(height, round)` the protocol runs four voting phases:
//!
//! - **Prepare** - the view's leader proposes a block; replicas validate it,
//!   speculatively apply it through the ledger, and vote.
//! - **PreCommit** - a Prepare QC justifies the second vote; replicas lock on
//!   the certified block.
//! - **Commit** - a PreCommit QC justifies the third vote.
//! - **Decide** - a Commit QC justifies the final vote; the Decide QC is the
//!   sole evidence that commits the block.
//!
//! A replica advances identically whether it aggregated a QC itself or
//! received one forwarded - the protocol is symmetric in what justifies a
//! phase transition. All I/O is performed by the runner via returned
//! `Action`s; the single exception is the ledger, which is invoked
//! synchronously from within handlers and never from anywhere else.
//!
//! # Safety
//!
//! - **Vote locking**: once a validator Prepare-votes for block B at height
//!   H, it will not Prepare-vote for a different block at H. Combined with
//!   quorum intersection this prevents two conflicting Decide QCs.
//! - **Single commit**: `commit` refuses any height other than
//!   `committed + 1`, so a duplicate Decide QC is a no-op.
//!
//! # Liveness
//!
//! - The pacemaker bounds how long a view may run; on timeout the round
//!   advances, the leader rotates, and the timeout backs off exponentially.
//! - A leader that is vote-locked re-broadcasts the locked block in later
//!   rounds rather than proposing a fresh one, so validators that missed the
//!   original proposal can still converge on it.

mod config;
mod leader;
mod pacemaker;
mod state;
mod vote_set;

pub use config::BftConfig;
pub use leader::leader_for;
pub use pacemaker::Pacemaker;
pub use state::{ConsensusState, ConsensusStats, SigningMode};
pub use vote_set::{VoteOutcome, VoteSet};
