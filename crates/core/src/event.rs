//! Event types for the deterministic state machine.

use palisade_types::{
    Address, Block, DebugAction, DkgShare, Hash, NewRound, QuorumCertificate, Transaction, Vote,
};

/// Priority levels for event ordering within the same timestamp.
///
/// Events at the same time are processed in priority order. Lower values =
/// higher priority. Internal events (consequences of prior processing) are
/// handled before new external inputs so causality is preserved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum EventPriority {
    /// Internal events: consequences of prior event processing.
    Internal = 0,
    /// Timer events: scheduled by the node itself.
    Timer = 1,
    /// Network events: external inputs from other nodes.
    Network = 2,
    /// Client events: external inputs from users.
    Client = 3,
}

/// All possible events a node can receive.
///
/// Events are **passive data** - they describe something that happened. The
/// state machine processes events and returns actions.
#[derive(Debug, Clone)]
pub enum Event {
    // ═══════════════════════════════════════════════════════════════════════
    // Timers (priority: Timer)
    // ═══════════════════════════════════════════════════════════════════════
    /// The pacemaker's view deadline fired.
    ViewTimer,

    /// The DKG ceremony deadline fired.
    DkgTimer,

    /// Periodic sync pacing tick.
    SyncTick,

    // ═══════════════════════════════════════════════════════════════════════
    // Network Messages (priority: Network)
    // ═══════════════════════════════════════════════════════════════════════
    /// A block proposal arrived. Proposer identity is in the signed header.
    ProposalReceived { block: Block },

    /// A consensus vote arrived. Voter identity is in the vote itself.
    VoteReceived { vote: Vote },

    /// A forwarded quorum certificate arrived.
    QcReceived { qc: QuorumCertificate },

    /// A round-advance announcement arrived.
    NewRoundReceived { announcement: NewRound },

    /// A DKG share arrived.
    DkgShareReceived { share: DkgShare },

    /// A peer asked us for a committed block.
    BlockRequestReceived { from: Address, height: u64 },

    /// A peer answered one of our block requests.
    BlockResponseReceived {
        height: u64,
        block: Option<Block>,
        qc: Option<QuorumCertificate>,
    },

    /// A debug/control action arrived on the administrative channel.
    DebugCommandReceived { action: DebugAction },

    // ═══════════════════════════════════════════════════════════════════════
    // Internal Events (priority: Internal)
    // ═══════════════════════════════════════════════════════════════════════
    /// Enough voting power accumulated to form a QC.
    QcFormed { qc: QuorumCertificate },

    /// A block was committed at `height`.
    BlockCommitted { height: u64, block_hash: Hash },

    /// A height gap was detected; the sync subsystem should catch us up to
    /// `target` (the highest height known to be committed by the network).
    SyncStarted { target: u64 },

    /// The next in-order synced block is validated and ready to apply.
    SyncBlockReady {
        block: Block,
        qc: QuorumCertificate,
    },

    /// Sync finished; the node is caught up to `height`.
    SyncCompleted { height: u64 },

    /// Sync gave up after exhausting its retry budget.
    SyncAbandoned { target: u64 },

    /// The active DKG ceremony finished successfully.
    DkgCompleted { session: u64 },

    /// The active DKG ceremony failed.
    DkgFailed { session: u64, reason: String },

    // ═══════════════════════════════════════════════════════════════════════
    // Client Requests (priority: Client)
    // ═══════════════════════════════════════════════════════════════════════
    /// A client submitted a transaction for inclusion.
    SubmitTransaction { tx: Transaction },
}

impl Event {
    /// Get the priority for this event type.
    pub fn priority(&self) -> EventPriority {
        match self {
            Event::QcFormed { .. }
            | Event::BlockCommitted { .. }
            | Event::SyncStarted { .. }
            | Event::SyncBlockReady { .. }
            | Event::SyncCompleted { .. }
            | Event::SyncAbandoned { .. }
            | Event::DkgCompleted { .. }
            | Event::DkgFailed { .. } => EventPriority::Internal,

            Event::ViewTimer | Event::DkgTimer | Event::SyncTick => EventPriority::Timer,

            Event::ProposalReceived { .. }
            | Event::VoteReceived { .. }
            | Event::QcReceived { .. }
            | Event::NewRoundReceived { .. }
            | Event::DkgShareReceived { .. }
            | Event::BlockRequestReceived { .. }
            | Event::BlockResponseReceived { .. }
            | Event::DebugCommandReceived { .. } => EventPriority::Network,

            Event::SubmitTransaction { .. } => EventPriority::Client,
        }
    }

    /// Check if this is an internal event (consequence of prior processing).
    pub fn is_internal(&self) -> bool {
        self.priority() == EventPriority::Internal
    }

    /// Get the event type name for logging.
    pub fn type_name(&self) -> &'static str {
        match self {
            Event::ViewTimer => "ViewTimer",
            Event::DkgTimer => "DkgTimer",
            Event::SyncTick => "SyncTick",
            Event::ProposalReceived { .. } => "ProposalReceived",
            Event::VoteReceived { .. } => "VoteReceived",
            Event::QcReceived { .. } => "QcReceived",
            Event::NewRoundReceived { .. } => "NewRoundReceived",
            Event::DkgShareReceived { .. } => "DkgShareReceived",
            Event::BlockRequestReceived { .. } => "BlockRequestReceived",
            Event::BlockResponseReceived { .. } => "BlockResponseReceived",
            Event::DebugCommandReceived { .. } => "DebugCommandReceived",
            Event::QcFormed { .. } => "QcFormed",
            Event::BlockCommitted { .. } => "BlockCommitted",
            Event::SyncStarted { .. } => "SyncStarted",
            Event::SyncBlockReady { .. } => "SyncBlockReady",
            Event::SyncCompleted { .. } => "SyncCompleted",
            Event::SyncAbandoned { .. } => "SyncAbandoned",
            Event::DkgCompleted { .. } => "DkgCompleted",
            Event::DkgFailed { .. } => "DkgFailed",
            Event::SubmitTransaction { .. } => "SubmitTransaction",
        }
    }
}
