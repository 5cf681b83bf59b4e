//! Node state machine.

use palisade_bft::{BftConfig, ConsensusState};
use palisade_core::{Action, Event, Ledger, OutboundMessage, StateMachine};
use palisade_dkg::DkgState;
use palisade_messages::GetBlockResponse;
use palisade_sync::{SyncConfig, SyncState};
use palisade_types::{Address, DebugAction, KeyPair};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Diagnostic snapshot (debug `PrintNodeState`).
#[derive(Debug, Clone, Serialize)]
pub struct NodeSnapshot {
    pub address: String,
    pub committed_height: u64,
    pub view_height: u64,
    pub view_round: u64,
    pub syncing: bool,
    pub manual_pacemaker: bool,
    pub signing_mode: &'static str,
    pub dkg_phase: &'static str,
    pub validators: usize,
    pub mempool: usize,
    pub view_changes: u64,
    pub equivocations_flagged: u64,
}

/// Combined node state machine.
///
/// Composes consensus, DKG, and sync into a single state machine and routes
/// every event to the owning subsystem. This is the only place the three
/// meet: consensus hands gaps to sync, sync hands ordered blocks back to
/// consensus, and a completed DKG ceremony switches consensus to threshold
/// signing.
pub struct NodeState {
    address: Address,
    ledger: Arc<dyn Ledger>,
    consensus: ConsensusState,
    dkg: DkgState,
    sync: SyncState,
}

impl std::fmt::Debug for NodeState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeState")
            .field("address", &self.address)
            .field("consensus", &self.consensus)
            .field("syncing", &self.sync.is_syncing())
            .finish()
    }
}

impl NodeState {
    /// Assemble a node over its ledger collaborator.
    pub fn new(
        signing_key: KeyPair,
        ledger: Arc<dyn Ledger>,
        bft_config: BftConfig,
        sync_config: SyncConfig,
        dkg_deadline: Duration,
        manual_pacemaker: bool,
    ) -> Self {
        let address = signing_key.address();
        Self {
            address,
            ledger: Arc::clone(&ledger),
            consensus: ConsensusState::new(signing_key, ledger, bft_config, manual_pacemaker),
            dkg: DkgState::new(address, dkg_deadline),
            sync: SyncState::new(address, sync_config),
        }
    }

    /// This node's validator address.
    pub fn address(&self) -> Address {
        self.address
    }

    /// The consensus subsystem.
    pub fn consensus(&self) -> &ConsensusState {
        &self.consensus
    }

    /// Mutable access to the consensus subsystem.
    pub fn consensus_mut(&mut self) -> &mut ConsensusState {
        &mut self.consensus
    }

    /// The DKG subsystem.
    pub fn dkg(&self) -> &DkgState {
        &self.dkg
    }

    /// The sync subsystem.
    pub fn sync(&self) -> &SyncState {
        &self.sync
    }

    /// Enter the first open view. Call once at startup.
    pub fn initialize(&mut self) -> Vec<Action> {
        self.consensus.initialize()
    }

    /// Build the diagnostic snapshot.
    pub fn snapshot(&self) -> NodeSnapshot {
        let stats = self.consensus.stats();
        let view = self.consensus.view();
        NodeSnapshot {
            address: self.address.to_string(),
            committed_height: self.consensus.committed_height(),
            view_height: view.height,
            view_round: view.round,
            syncing: self.consensus.is_syncing(),
            manual_pacemaker: self.consensus.is_manual(),
            signing_mode: self.consensus.signing_mode().name(),
            dkg_phase: self.dkg.phase().name(),
            validators: self
                .ledger
                .validator_set(self.consensus.committed_height())
                .len(),
            mempool: self.consensus.mempool_len(),
            view_changes: stats.view_changes,
            equivocations_flagged: stats.equivocations_flagged,
        }
    }

    /// Addresses of every other validator, for sync peer selection.
    fn peers(&self) -> Vec<Address> {
        self.ledger
            .validator_set(self.consensus.committed_height())
            .addresses()
            .into_iter()
            .filter(|a| *a != self.address)
            .collect()
    }

    /// Route a debug/control action to its component operation.
    fn on_debug(&mut self, action: DebugAction) -> Vec<Action> {
        info!(action = action.name(), "Debug action received");
        match action {
            DebugAction::TriggerNextView => self.consensus.trigger_next_view(),
            DebugAction::TriggerDkg => {
                let set = self
                    .ledger
                    .validator_set(self.consensus.committed_height());
                // Enough shares to cover any 2/3 quorum of equal-weight
                // validators.
                let threshold = (2 * set.len()).div_ceil(3);
                match self.dkg.start_ceremony(set, threshold) {
                    Ok(actions) => actions,
                    Err(e) => {
                        warn!(error = %e, "DKG trigger rejected");
                        vec![]
                    }
                }
            }
            DebugAction::TogglePacemakerManualMode => self.consensus.toggle_manual_mode(),
            DebugAction::ResetToGenesis => {
                let mut actions = self.sync.cancel();
                actions.extend(self.consensus.reset_to_genesis());
                actions
            }
            DebugAction::PrintNodeState => {
                let snapshot = self.snapshot();
                info!(?snapshot, "Node state");
                vec![]
            }
        }
    }

    /// Serve a peer's block request from the ledger.
    fn serve_block_request(&self, from: Address, height: u64) -> Vec<Action> {
        let response = match self.ledger.block(height) {
            Some((block, qc)) if !qc.is_genesis() => GetBlockResponse::found(height, block, qc),
            // Genesis (or a height we lack) has no usable certificate.
            _ => GetBlockResponse::not_found(height),
        };
        vec![Action::Send {
            to: from,
            message: OutboundMessage::BlockResponse(response),
        }]
    }
}

impl StateMachine for NodeState {
    fn handle(&mut self, event: Event) -> Vec<Action> {
        match event {
            // Timers
            Event::ViewTimer => self.consensus.on_view_timer(),
            Event::DkgTimer => self.dkg.on_deadline(),
            Event::SyncTick => self.sync.on_tick(),

            // Consensus traffic
            Event::ProposalReceived { block } => self.consensus.on_proposal(block),
            Event::VoteReceived { vote } => self.consensus.on_vote(vote),
            Event::QcReceived { qc } => self.consensus.on_qc(qc),
            Event::NewRoundReceived { announcement } => self.consensus.on_new_round(announcement),
            Event::QcFormed { qc } => self.consensus.on_qc_formed(qc),

            // DKG
            Event::DkgShareReceived { share } => self.dkg.on_share(share),
            Event::DkgCompleted { session } => {
                match self.dkg.take_outcome() {
                    Some(outcome) => {
                        self.consensus.set_threshold_mode(
                            outcome.public_keys,
                            outcome.secret_share,
                            outcome.share_index,
                        );
                    }
                    None => warn!(session, "DKG completed without an outcome"),
                }
                vec![]
            }
            Event::DkgFailed { session, reason } => {
                // Reported and tolerated: block production continues on
                // individual signatures.
                warn!(session, %reason, "DKG ceremony failed");
                vec![]
            }

            // Sync
            Event::SyncStarted { target } => {
                let committed = self.consensus.committed_height();
                let peers = self.peers();
                self.sync.start(target, committed, peers)
            }
            Event::BlockRequestReceived { from, height } => self.serve_block_request(from, height),
            Event::BlockResponseReceived { height, block, qc } => {
                let set = self
                    .ledger
                    .validator_set(self.consensus.committed_height());
                let group_key = self.consensus.group_public_key();
                self.sync
                    .on_response(height, block, qc, &set, group_key.as_ref())
            }
            Event::SyncBlockReady { block, qc } => self.consensus.on_sync_block(block, qc),
            Event::SyncCompleted { height } => self.consensus.on_sync_complete(height),
            Event::SyncAbandoned { target } => self.consensus.on_sync_abandoned(target),
            Event::BlockCommitted { height, .. } => self.sync.on_committed(height),

            // Control / clients
            Event::DebugCommandReceived { action } => self.on_debug(action),
            Event::SubmitTransaction { tx } => {
                self.consensus.add_transaction(tx);
                vec![]
            }
        }
    }

    fn set_time(&mut self, now: Duration) {
        self.consensus.set_time(now);
        self.sync.set_time(now);
    }
}
