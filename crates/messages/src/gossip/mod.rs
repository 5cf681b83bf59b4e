//! Gossip message types.

mod debug;
mod dkg_share;
mod new_round;
mod proposal;
mod qc;
mod vote;

pub use debug::DebugGossip;
pub use dkg_share::DkgShareGossip;
pub use new_round::NewRoundGossip;
pub use proposal::ProposalGossip;
pub use qc::QcGossip;
pub use vote::VoteGossip;
