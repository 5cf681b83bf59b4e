//! Action types for the deterministic state machine.

use crate::{Event, OutboundMessage, TimerId};
use palisade_types::{Address, Hash, Phase, View};
use std::time::Duration;

/// Actions the state machine wants to perform.
///
/// Actions are **commands** - they describe something to do. The runner
/// executes actions and may convert results back into events.
#[derive(Debug, Clone)]
pub enum Action {
    // ═══════════════════════════════════════════════════════════════════════
    // Network
    // ═══════════════════════════════════════════════════════════════════════
    /// Broadcast a message to every validator.
    Broadcast { message: OutboundMessage },

    /// Send a message to a single validator.
    Send {
        to: Address,
        message: OutboundMessage,
    },

    // ═══════════════════════════════════════════════════════════════════════
    // Timers
    // ═══════════════════════════════════════════════════════════════════════
    /// Arm a timer. An already-armed timer with the same id is replaced.
    SetTimer { id: TimerId, duration: Duration },

    /// Cancel a timer. No-op if it isn't armed.
    CancelTimer { id: TimerId },

    // ═══════════════════════════════════════════════════════════════════════
    // Internal (fed back as events with Internal priority)
    // ═══════════════════════════════════════════════════════════════════════
    /// Enqueue an internal event for processing before external inputs.
    EnqueueInternal { event: Event },

    // ═══════════════════════════════════════════════════════════════════════
    // Evidence
    // ═══════════════════════════════════════════════════════════════════════
    /// A validator equivocated: two different blocks at the same vote slot.
    ///
    /// Surfaced for operator visibility and eventual evidence handling;
    /// the offending message itself has already been discarded.
    ReportMisbehavior {
        offender: Address,
        view: View,
        phase: Phase,
        first: Hash,
        second: Hash,
    },
}

impl Action {
    /// Get the action type name for logging.
    pub fn type_name(&self) -> &'static str {
        match self {
            Action::Broadcast { .. } => "Broadcast",
            Action::Send { .. } => "Send",
            Action::SetTimer { .. } => "SetTimer",
            Action::CancelTimer { .. } => "CancelTimer",
            Action::EnqueueInternal { .. } => "EnqueueInternal",
            Action::ReportMisbehavior { .. } => "ReportMisbehavior",
        }
    }
}
