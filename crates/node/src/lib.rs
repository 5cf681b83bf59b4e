//! Validator node assembly.
//!
//! Composes the consensus, DKG, and sync state machines into one
//! [`NodeState`], and wraps it with the I/O the state machines never touch:
//!
//! - [`Runner`]: the single event loop owning the state machine
//! - [`TimerManager`]: tokio-backed timers feeding the event queue
//! - [`wire`]: envelope encode/decode between actions/events and bytes
//! - [`InMemoryLedger`]: the ledger collaborator for tests and
//!   single-process clusters
//! - [`InProcessHub`]: loopback transport for multi-node-in-one-process
//!   runs
//! - [`NodeConfig`] / [`GenesisState`]: startup inputs, loaded once and
//!   validated fail-fast
//!
//! There is no global singleton: every node is an explicitly constructed
//! context object, so many nodes can live in one process for testing.

mod config;
mod ledger;
mod runner;
mod state;
mod timers;
mod transport;
pub mod wire;

pub use config::{ConfigError, GenesisState, GenesisValidator, NodeConfig};
pub use ledger::InMemoryLedger;
pub use runner::{Runner, RunnerError, RunnerHandle};
pub use state::{NodeSnapshot, NodeState};
pub use timers::TimerManager;
pub use transport::{HubEndpoint, InProcessHub, Transport, TransportError};
