//! State machine trait.

use crate::{Action, Event};
use std::time::Duration;

/// A synchronous, deterministic state machine.
///
/// The runner delivers one event at a time; each handler runs to completion
/// before the next event is processed, which is what makes phase transitions
/// and height/round invariants safe without locking.
pub trait StateMachine {
    /// Process one event, returning the actions to execute.
    fn handle(&mut self, event: Event) -> Vec<Action>;

    /// Inform the machine of the current time before delivering an event.
    ///
    /// State machines never read wall clocks themselves; this keeps them
    /// deterministic under test harnesses that control time explicitly.
    fn set_time(&mut self, now: Duration);
}
