//! Consensus state machine.
//!
//! This module implements the four-phase HotStuff consensus core as a
//! synchronous, event-driven model. See the crate docs for the protocol
//! overview.

use palisade_core::{Action, Event, Ledger, OutboundMessage};
use palisade_messages::{NewRoundGossip, ProposalGossip, QcGossip, VoteGossip};
use palisade_types::{
    consensus_vote_message, new_round_message, Address, AggregateSignature, Block, BlockHeader,
    GroupPublicKey, Hash, KeyPair, NewRound, Phase, PublicKeySet, QuorumCertificate,
    SecretKeyShare, SignatureShare, SignerBitfield, Transaction, ValidatorSet, View, Vote,
    VotePower, VoteSignature,
};
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, trace, warn};

use crate::config::BftConfig;
use crate::leader::leader_for;
use crate::pacemaker::Pacemaker;
use crate::vote_set::{VoteOutcome, VoteSet};

/// How quorum certificates are signed and aggregated.
///
/// Individual mode is the startup default and the fallback whenever no DKG
/// ceremony has succeeded; a completed ceremony switches the node to
/// threshold mode.
#[derive(Clone)]
pub enum SigningMode {
    /// Per-validator Ed25519 signatures; QCs carry the constituent
    /// signatures.
    Individual,
    /// Threshold shares combined into one group signature.
    Threshold {
        public_keys: PublicKeySet,
        secret_share: SecretKeyShare,
        share_index: usize,
    },
}

impl SigningMode {
    /// Short name for diagnostics.
    pub fn name(&self) -> &'static str {
        match self {
            SigningMode::Individual => "individual",
            SigningMode::Threshold { .. } => "threshold",
        }
    }
}

impl std::fmt::Debug for SigningMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print the secret share.
        write!(f, "SigningMode::{}", self.name())
    }
}

/// Consensus statistics for monitoring.
#[derive(Clone, Copy, Debug, Default)]
pub struct ConsensusStats {
    /// Total number of view changes (round advances due to timeout or
    /// manual trigger).
    pub view_changes: u64,
    /// Equivocations flagged (votes and proposals).
    pub equivocations_flagged: u64,
    /// Blocks committed by this node.
    pub blocks_committed: u64,
}

/// HotStuff consensus state machine.
///
/// Handles proposal validation, voting, QC formation and application, block
/// commitment, and view changes. The validator set, current height, and
/// current view are exclusively owned by this state machine; network and
/// timer I/O happen through returned [`Action`]s, and the [`Ledger`] is the
/// only collaborator invoked synchronously from inside handlers.
pub struct ConsensusState {
    // ═══════════════════════════════════════════════════════════════════════
    // Identity
    // ═══════════════════════════════════════════════════════════════════════
    /// Signing key for votes, proposals, and announcements.
    signing_key: KeyPair,

    /// This node's validator address.
    address: Address,

    /// The external ledger collaborator.
    ledger: Arc<dyn Ledger>,

    // ═══════════════════════════════════════════════════════════════════════
    // Chain State
    // ═══════════════════════════════════════════════════════════════════════
    /// Latest committed height (mirrors the ledger).
    committed_height: u64,

    /// Hash of the latest committed block.
    committed_hash: Hash,

    /// Decide QC for the committed tip; justify for the next proposal.
    high_qc: QuorumCertificate,

    // ═══════════════════════════════════════════════════════════════════════
    // Per-height State
    // ═══════════════════════════════════════════════════════════════════════
    /// Proposals seen for the open height (hash -> block).
    proposals: HashMap<Hash, Block>,

    /// First proposal seen per view, for equivocating-leader detection.
    proposal_by_view: HashMap<View, Hash>,

    /// Vote aggregation per (view, phase) slot (leader role).
    vote_sets: HashMap<(View, Phase), VoteSet>,

    /// Slots for which this node already built a QC. The first block to
    /// reach quorum in a slot wins; later quorums in the same slot are
    /// ignored.
    qc_built: HashSet<(View, Phase)>,

    /// Our own votes per slot (idempotence under replays).
    voted: HashMap<(View, Phase), Hash>,

    /// Which block we Prepare-voted per height: the core vote-locking
    /// invariant. Key: height, value: (block hash, round).
    voted_height: HashMap<u64, (Hash, u64)>,

    /// PreCommit lock: the certified block we are bound to at its view.
    locked: Option<(View, Hash)>,

    // ═══════════════════════════════════════════════════════════════════════
    // Components
    // ═══════════════════════════════════════════════════════════════════════
    pacemaker: Pacemaker,
    config: BftConfig,
    signing_mode: SigningMode,

    // ═══════════════════════════════════════════════════════════════════════
    // Sync
    // ═══════════════════════════════════════════════════════════════════════
    /// While true the node observes and applies but does not vote or
    /// propose.
    syncing: bool,

    /// Highest sync target already announced, to avoid duplicate sessions.
    announced_sync_target: u64,

    // ═══════════════════════════════════════════════════════════════════════
    // Mempool
    // ═══════════════════════════════════════════════════════════════════════
    /// Pending transactions, FIFO. Removed when a block containing them
    /// commits.
    mempool: VecDeque<Transaction>,

    // ═══════════════════════════════════════════════════════════════════════
    // Time / Statistics
    // ═══════════════════════════════════════════════════════════════════════
    /// Current time (set by the runner before each handle call).
    now: Duration,

    stats: ConsensusStats,
}

impl std::fmt::Debug for ConsensusState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsensusState")
            .field("address", &self.address)
            .field("view", &self.pacemaker.view())
            .field("committed_height", &self.committed_height)
            .field("syncing", &self.syncing)
            .field("signing_mode", &self.signing_mode.name())
            .field("proposals", &self.proposals.len())
            .field("vote_sets", &self.vote_sets.len())
            .finish()
    }
}

impl ConsensusState {
    /// Create a new consensus state machine over `ledger`.
    pub fn new(
        signing_key: KeyPair,
        ledger: Arc<dyn Ledger>,
        config: BftConfig,
        manual_pacemaker: bool,
    ) -> Self {
        let address = signing_key.address();
        let committed_height = ledger.committed_height();
        let committed_hash = ledger.committed_hash();
        let high_qc = ledger
            .block(committed_height)
            .map(|(_, qc)| qc)
            .unwrap_or_else(QuorumCertificate::genesis);
        let pacemaker = Pacemaker::new(
            config.base_view_timeout,
            config.max_backoff_exponent,
            manual_pacemaker,
        );

        Self {
            signing_key,
            address,
            ledger,
            committed_height,
            committed_hash,
            high_qc,
            proposals: HashMap::new(),
            proposal_by_view: HashMap::new(),
            vote_sets: HashMap::new(),
            qc_built: HashSet::new(),
            voted: HashMap::new(),
            voted_height: HashMap::new(),
            locked: None,
            pacemaker,
            config,
            signing_mode: SigningMode::Individual,
            syncing: false,
            announced_sync_target: 0,
            mempool: VecDeque::new(),
            now: Duration::ZERO,
            stats: ConsensusStats::default(),
        }
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Accessors
    // ═══════════════════════════════════════════════════════════════════════

    /// This node's address.
    pub fn address(&self) -> Address {
        self.address
    }

    /// The current view.
    pub fn view(&self) -> View {
        self.pacemaker.view()
    }

    /// Latest committed height.
    pub fn committed_height(&self) -> u64 {
        self.committed_height
    }

    /// Hash of the latest committed block.
    pub fn committed_hash(&self) -> Hash {
        self.committed_hash
    }

    /// Whether the node is catching up and abstaining from participation.
    pub fn is_syncing(&self) -> bool {
        self.syncing
    }

    /// Current statistics snapshot.
    pub fn stats(&self) -> ConsensusStats {
        ConsensusStats {
            view_changes: self.stats.view_changes,
            equivocations_flagged: self.stats.equivocations_flagged,
            blocks_committed: self.stats.blocks_committed,
        }
    }

    /// The active signing mode.
    pub fn signing_mode(&self) -> &SigningMode {
        &self.signing_mode
    }

    /// Whether the pacemaker is in manual mode.
    pub fn is_manual(&self) -> bool {
        self.pacemaker.is_manual()
    }

    /// Number of pending mempool transactions.
    pub fn mempool_len(&self) -> usize {
        self.mempool.len()
    }

    /// Set the current time. Called by the runner before each handler.
    pub fn set_time(&mut self, now: Duration) {
        self.now = now;
    }

    /// The Decide QC certifying the committed tip.
    pub fn high_qc(&self) -> &QuorumCertificate {
        &self.high_qc
    }

    /// The group public key, once a DKG ceremony has succeeded.
    pub fn group_public_key(&self) -> Option<GroupPublicKey> {
        match &self.signing_mode {
            SigningMode::Individual => None,
            SigningMode::Threshold { public_keys, .. } => Some(public_keys.public_key()),
        }
    }

    fn validator_set(&self) -> ValidatorSet {
        self.ledger.validator_set(self.committed_height)
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Lifecycle
    // ═══════════════════════════════════════════════════════════════════════

    /// Enter the first open view. Call once at startup, after recovery.
    pub fn initialize(&mut self) -> Vec<Action> {
        info!(
            validator = ?self.address,
            committed_height = self.committed_height,
            committed_hash = ?self.committed_hash,
            "Initializing consensus"
        );
        self.enter_view(View::new(self.committed_height + 1, 0))
    }

    /// Switch QC aggregation to threshold signing (successful DKG).
    pub fn set_threshold_mode(
        &mut self,
        public_keys: PublicKeySet,
        secret_share: SecretKeyShare,
        share_index: usize,
    ) {
        info!(
            validator = ?self.address,
            share_index,
            "Switching to threshold signing mode"
        );
        self.signing_mode = SigningMode::Threshold {
            public_keys,
            secret_share,
            share_index,
        };
    }

    /// Full reset to the genesis state (debug surface).
    pub fn reset_to_genesis(&mut self) -> Vec<Action> {
        warn!(validator = ?self.address, "Resetting consensus state to genesis");
        self.ledger.reset_to_genesis();
        self.committed_height = self.ledger.committed_height();
        self.committed_hash = self.ledger.committed_hash();
        self.high_qc = QuorumCertificate::genesis();
        self.proposals.clear();
        self.proposal_by_view.clear();
        self.vote_sets.clear();
        self.qc_built.clear();
        self.voted.clear();
        self.voted_height.clear();
        self.locked = None;
        self.syncing = false;
        self.announced_sync_target = 0;
        self.mempool.clear();
        self.stats = ConsensusStats::default();
        self.enter_view(View::new(self.committed_height + 1, 0))
    }

    /// Queue a transaction for inclusion in a future proposal.
    pub fn add_transaction(&mut self, tx: Transaction) {
        trace!(tx = ?tx.hash(), "Transaction queued");
        self.mempool.push_back(tx);
    }

    // ═══════════════════════════════════════════════════════════════════════
    // View Entry / Proposing
    // ═══════════════════════════════════════════════════════════════════════

    fn enter_view(&mut self, view: View) -> Vec<Action> {
        let mut actions = self.pacemaker.start(view);
        // In manual mode nothing happens autonomously - the next proposal
        // waits for an explicit trigger.
        if !self.pacemaker.is_manual() {
            actions.extend(self.try_propose());
        }
        actions
    }

    /// Propose if this node leads the current view.
    fn try_propose(&mut self) -> Vec<Action> {
        if self.syncing {
            return vec![];
        }

        let view = self.pacemaker.view();
        let set = self.validator_set();
        if leader_for(view.height, view.round, &set) != Some(self.address) {
            trace!(view = %view, "Not the proposer for this view");
            return vec![];
        }

        // If we already Prepare-voted at this height we are committed to
        // that block: re-broadcast it (with its original round, which is
        // part of its identity) instead of proposing a fresh one. Validators
        // that missed the original proposal can still converge on it.
        if let Some((locked_hash, original_round)) = self.voted_height.get(&view.height).copied() {
            return match self.proposals.get(&locked_hash) {
                Some(block) => {
                    info!(
                        validator = ?self.address,
                        height = view.height,
                        original_round,
                        block_hash = ?locked_hash,
                        "Re-broadcasting vote-locked block"
                    );
                    vec![Action::Broadcast {
                        message: OutboundMessage::Proposal(ProposalGossip::new(block.clone())),
                    }]
                }
                None => {
                    warn!(
                        height = view.height,
                        block_hash = ?locked_hash,
                        "Cannot re-propose: locked block not held"
                    );
                    vec![]
                }
            };
        }

        let transactions: Vec<Transaction> = self
            .mempool
            .iter()
            .take(self.config.max_transactions_per_block)
            .cloned()
            .collect();

        let block = Block {
            header: BlockHeader {
                height: view.height,
                round: view.round,
                proposer: self.address,
                parent_hash: self.committed_hash,
                timestamp_ms: self.now.as_millis() as u64,
            },
            justify_qc: self.high_qc.clone(),
            transactions,
        };

        info!(
            validator = ?self.address,
            view = %view,
            block_hash = ?block.hash(),
            tx_count = block.transactions.len(),
            "Proposing block"
        );

        let mut actions = vec![Action::Broadcast {
            message: OutboundMessage::Proposal(ProposalGossip::new(block.clone())),
        }];
        // Process our own proposal through the normal path: validate,
        // speculate, vote.
        actions.extend(self.on_proposal(block));
        actions
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Proposal Handling
    // ═══════════════════════════════════════════════════════════════════════

    /// Handle a block proposal (network or our own).
    pub fn on_proposal(&mut self, block: Block) -> Vec<Action> {
        let view = block.view();
        let block_hash = block.hash();
        let height = block.header.height;

        debug!(
            validator = ?self.address,
            proposer = ?block.header.proposer,
            view = %view,
            block_hash = ?block_hash,
            "Received proposal"
        );

        // A proposal far ahead of us reveals a height gap: its parent chain
        // is already committed by the network.
        if height > self.committed_height + 1 + self.config.sync_gap_tolerance {
            return self.maybe_start_sync(height - 1);
        }

        if self.syncing {
            trace!("Observing only while syncing");
            return vec![];
        }

        if height <= self.committed_height {
            debug!(height, committed = self.committed_height, "Stale proposal");
            return vec![];
        }

        if height != self.committed_height + 1 {
            // Inside the tolerance window but not the next height.
            debug!(height, "Proposal is not for the open height");
            return vec![];
        }

        let set = self.validator_set();

        // A proposal from a later round means the network advanced past us.
        let mut actions = vec![];
        if view.height == self.pacemaker.view().height && view.round > self.pacemaker.view().round {
            if let Some(rearm) = self.pacemaker.catch_up(view) {
                actions.extend(rearm);
            }
        }

        // Proposer attribution is checked at the block's own view.
        match leader_for(view.height, view.round, &set) {
            Some(leader) if leader == block.header.proposer => {}
            expected => {
                warn!(
                    proposer = ?block.header.proposer,
                    expected = ?expected,
                    view = %view,
                    "Proposal from wrong proposer"
                );
                return actions;
            }
        }

        if self.proposals.contains_key(&block_hash) {
            trace!(block_hash = ?block_hash, "Already have proposal");
            return actions;
        }

        // Equivocating leader: a second, different proposal for a view.
        if let Some(&first) = self.proposal_by_view.get(&view) {
            if first != block_hash {
                warn!(
                    proposer = ?block.header.proposer,
                    view = %view,
                    first = ?first,
                    second = ?block_hash,
                    "Equivocating proposer"
                );
                self.stats.equivocations_flagged += 1;
                actions.push(Action::ReportMisbehavior {
                    offender: block.header.proposer,
                    view,
                    phase: Phase::Prepare,
                    first,
                    second: block_hash,
                });
                return actions;
            }
        }

        if let Err(reason) = self.validate_justify(&block, &set) {
            warn!(
                block_hash = ?block_hash,
                %reason,
                "Proposal justify QC rejected"
            );
            return actions;
        }

        self.proposals.insert(block_hash, block.clone());
        self.proposal_by_view.insert(view, block_hash);

        // Vote locking: never Prepare-vote a second block at this height.
        if let Some(&(locked_hash, locked_round)) = self.voted_height.get(&height) {
            if locked_hash != block_hash {
                debug!(
                    existing = ?locked_hash,
                    existing_round = locked_round,
                    new = ?block_hash,
                    height,
                    "Vote locking: already voted for a different block at this height"
                );
                return actions;
            }
        }

        // Speculative application: a block the ledger rejects is not voted
        // for; we stay in the view awaiting another proposal or a timeout.
        if let Err(e) = self.ledger.speculate(&block) {
            warn!(
                block_hash = ?block_hash,
                error = %e,
                "Ledger rejected proposal"
            );
            return actions;
        }

        actions.extend(self.cast_vote(view, Phase::Prepare, block_hash, &set));
        actions
    }

    /// Validate a proposal's justify QC against the committed tip.
    fn validate_justify(&self, block: &Block, set: &ValidatorSet) -> Result<(), String> {
        let justify = &block.justify_qc;

        if block.header.parent_hash != self.committed_hash {
            return Err(format!(
                "parent {:?} is not the committed tip {:?}",
                block.header.parent_hash, self.committed_hash
            ));
        }

        if self.committed_height == 0 {
            if !justify.is_genesis() {
                return Err("first block must carry the genesis QC".to_string());
            }
            return Ok(());
        }

        if justify.is_genesis() {
            return Err("genesis QC only justifies the first block".to_string());
        }
        if justify.phase != Phase::Decide {
            return Err(format!("justify phase is {}, not Decide", justify.phase));
        }
        if justify.view.height != block.header.height - 1 {
            return Err(format!(
                "justify height {} does not certify the parent of height {}",
                justify.view.height, block.header.height
            ));
        }
        if justify.block_hash != block.header.parent_hash {
            return Err("justify QC does not certify the parent".to_string());
        }

        let group_key = self.group_public_key();
        justify
            .verify(set, group_key.as_ref())
            .map_err(|e| e.to_string())
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Voting
    // ═══════════════════════════════════════════════════════════════════════

    /// Cast our vote for `block_hash` in `phase` of `view`, addressed to the
    /// view's leader. Idempotent per slot.
    fn cast_vote(
        &mut self,
        view: View,
        phase: Phase,
        block_hash: Hash,
        set: &ValidatorSet,
    ) -> Vec<Action> {
        if self.syncing {
            return vec![];
        }

        let slot = (view, phase);
        if self.voted.contains_key(&slot) {
            trace!(view = %view, phase = %phase, "Already voted in this slot");
            return vec![];
        }
        self.voted.insert(slot, block_hash);
        if phase == Phase::Prepare {
            self.voted_height.insert(view.height, (block_hash, view.round));
        }

        let message = consensus_vote_message(view, phase, &block_hash);
        let signature = match &self.signing_mode {
            SigningMode::Individual => VoteSignature::Ed25519(self.signing_key.sign(&message)),
            SigningMode::Threshold { secret_share, .. } => {
                VoteSignature::Share(secret_share.sign(&message))
            }
        };

        let vote = Vote {
            view,
            block_hash,
            phase,
            voter: self.address,
            signature,
        };

        debug!(
            validator = ?self.address,
            view = %view,
            phase = %phase,
            block_hash = ?block_hash,
            "Casting vote"
        );

        let Some(leader) = leader_for(view.height, view.round, set) else {
            return vec![];
        };

        if leader == self.address {
            // We are the aggregator: count our own vote directly.
            self.on_vote(vote)
        } else {
            vec![Action::Send {
                to: leader,
                message: OutboundMessage::Vote(VoteGossip::new(vote)),
            }]
        }
    }

    /// Handle a received vote (aggregator role).
    pub fn on_vote(&mut self, vote: Vote) -> Vec<Action> {
        if self.syncing {
            return vec![];
        }

        if vote.view.height <= self.committed_height {
            trace!(
                vote_height = vote.view.height,
                committed = self.committed_height,
                "Skipping vote for committed height"
            );
            return vec![];
        }

        let set = self.validator_set();

        // Only the slot's leader aggregates.
        if leader_for(vote.view.height, vote.view.round, &set) != Some(self.address) {
            trace!(view = %vote.view, "Not the aggregator for this view");
            return vec![];
        }

        let power = set.voting_power_of(&vote.voter);
        if power == 0 {
            warn!(voter = ?vote.voter, "Vote from unknown validator");
            return vec![];
        }

        if !self.verify_vote(&vote, &set) {
            warn!(
                voter = ?vote.voter,
                view = %vote.view,
                phase = %vote.phase,
                "Vote signature rejected"
            );
            return vec![];
        }

        let slot = vote.slot();
        let view = vote.view;
        let phase = vote.phase;
        let voter = vote.voter;
        let vote_block = vote.block_hash;
        let outcome = self
            .vote_sets
            .entry(slot)
            .or_insert_with(|| VoteSet::new(view, phase))
            .add_vote(vote, power);

        match outcome {
            VoteOutcome::Duplicate => return vec![],
            VoteOutcome::Equivocation { first } => {
                warn!(
                    voter = ?voter,
                    view = %view,
                    phase = %phase,
                    first = ?first,
                    second = ?vote_block,
                    "Equivocating voter"
                );
                self.stats.equivocations_flagged += 1;
                return vec![Action::ReportMisbehavior {
                    offender: voter,
                    view,
                    phase,
                    first,
                    second: vote_block,
                }];
            }
            VoteOutcome::Added => {}
        }

        let total = set.total_voting_power();
        let quorum_hash = self
            .vote_sets
            .get(&slot)
            .and_then(|vs| vs.check_quorum(total));

        let Some(block_hash) = quorum_hash else {
            return vec![];
        };

        // One QC per slot: the first block to reach quorum wins.
        if self.qc_built.contains(&slot) {
            return vec![];
        }

        match self.build_qc(view, phase, block_hash, &set) {
            Some(qc) => {
                self.qc_built.insert(slot);
                info!(
                    validator = ?self.address,
                    view = %view,
                    phase = %phase,
                    block_hash = ?block_hash,
                    voting_power = qc.voting_power,
                    "Quorum reached, QC formed"
                );
                vec![Action::EnqueueInternal {
                    event: Event::QcFormed { qc },
                }]
            }
            None => vec![],
        }
    }

    /// Verify a vote's partial signature under the active signing mode.
    fn verify_vote(&self, vote: &Vote, set: &ValidatorSet) -> bool {
        let message = consensus_vote_message(vote.view, vote.phase, &vote.block_hash);
        match (&vote.signature, &self.signing_mode) {
            (VoteSignature::Ed25519(sig), SigningMode::Individual) => set
                .get(&vote.voter)
                .is_some_and(|v| v.public_key.verify(&message, sig)),
            (VoteSignature::Share(share), SigningMode::Threshold { public_keys, .. }) => set
                .index_of(&vote.voter)
                .is_some_and(|idx| public_keys.public_key_share(idx).verify(share, &message)),
            _ => {
                debug!(
                    voter = ?vote.voter,
                    mode = self.signing_mode.name(),
                    "Vote signature variant does not match signing mode"
                );
                false
            }
        }
    }

    /// Build the QC for a slot once quorum power has accumulated.
    fn build_qc(
        &self,
        view: View,
        phase: Phase,
        block_hash: Hash,
        set: &ValidatorSet,
    ) -> Option<QuorumCertificate> {
        let vote_set = self.vote_sets.get(&(view, phase))?;

        let mut signers = SignerBitfield::new(set.len());
        let mut power = 0u64;

        let signature = match &self.signing_mode {
            SigningMode::Individual => {
                let mut signatures = Vec::new();
                for vote in vote_set.votes_for(&block_hash) {
                    let VoteSignature::Ed25519(sig) = &vote.signature else {
                        continue;
                    };
                    let Some(index) = set.index_of(&vote.voter) else {
                        continue;
                    };
                    signers.set(index);
                    power += set.voting_power_of(&vote.voter);
                    signatures.push(sig.clone());
                }
                AggregateSignature::Individual(signatures)
            }
            SigningMode::Threshold { public_keys, .. } => {
                let mut shares: BTreeMap<usize, SignatureShare> = BTreeMap::new();
                for vote in vote_set.votes_for(&block_hash) {
                    let VoteSignature::Share(share) = &vote.signature else {
                        continue;
                    };
                    let Some(index) = set.index_of(&vote.voter) else {
                        continue;
                    };
                    signers.set(index);
                    power += set.voting_power_of(&vote.voter);
                    shares.insert(index, share.clone());
                }
                match public_keys.combine_signatures(&shares) {
                    Ok(combined) => AggregateSignature::Threshold(combined),
                    Err(e) => {
                        warn!(error = ?e, "Failed to combine signature shares");
                        return None;
                    }
                }
            }
        };

        if !VotePower::has_quorum(power, set.total_voting_power()) {
            warn!(
                power,
                total = set.total_voting_power(),
                "Aggregatable votes fall short of quorum"
            );
            return None;
        }

        Some(QuorumCertificate {
            view,
            block_hash,
            phase,
            signature,
            signers,
            voting_power: power,
        })
    }

    // ═══════════════════════════════════════════════════════════════════════
    // QC Application
    // ═══════════════════════════════════════════════════════════════════════

    /// Handle a QC this node just formed: broadcast it, then advance.
    pub fn on_qc_formed(&mut self, qc: QuorumCertificate) -> Vec<Action> {
        let mut actions = vec![Action::Broadcast {
            message: OutboundMessage::Qc(QcGossip::new(qc.clone())),
        }];
        actions.extend(self.apply_qc(qc));
        actions
    }

    /// Handle a forwarded QC from the network.
    ///
    /// A replica advances on a forwarded QC exactly as the aggregator does.
    pub fn on_qc(&mut self, qc: QuorumCertificate) -> Vec<Action> {
        let height = qc.view.height;

        // Gap detection: a Decide QC proves its height is committable; any
        // other phase proves the parent chain is committed.
        let implied_committed = match qc.phase {
            Phase::Decide => height,
            _ => height.saturating_sub(1),
        };
        if implied_committed > self.committed_height + self.config.sync_gap_tolerance
            && height > self.committed_height + 1
        {
            return self.maybe_start_sync(implied_committed);
        }

        if self.syncing {
            return vec![];
        }

        if height <= self.committed_height {
            trace!(height, "Stale QC");
            return vec![];
        }

        let set = self.validator_set();
        let group_key = self.group_public_key();
        if let Err(e) = qc.verify(&set, group_key.as_ref()) {
            warn!(view = %qc.view, phase = %qc.phase, error = %e, "Invalid QC rejected");
            return vec![];
        }

        self.apply_qc(qc)
    }

    /// Advance on a verified QC. Idempotent: duplicate QCs re-derive votes
    /// that the per-slot `voted` map suppresses, and duplicate commits are
    /// refused by the height check.
    fn apply_qc(&mut self, qc: QuorumCertificate) -> Vec<Action> {
        let view = qc.view;
        let block_hash = qc.block_hash;

        trace!(
            validator = ?self.address,
            view = %view,
            phase = %qc.phase,
            block_hash = ?block_hash,
            "Applying QC"
        );

        match qc.phase {
            Phase::Prepare => {
                let set = self.validator_set();
                if self.proposals.contains_key(&block_hash) {
                    self.cast_vote(view, Phase::PreCommit, block_hash, &set)
                } else {
                    debug!(block_hash = ?block_hash, "Prepare QC for unknown proposal");
                    vec![]
                }
            }
            Phase::PreCommit => {
                // Lock on the certified block; a newer certified view
                // supersedes an older lock.
                let relock = match self.locked {
                    None => true,
                    Some((locked_view, _)) => view >= locked_view,
                };
                if relock {
                    self.locked = Some((view, block_hash));
                    debug!(view = %view, block_hash = ?block_hash, "Locked");
                }
                let set = self.validator_set();
                if self.proposals.contains_key(&block_hash) {
                    self.cast_vote(view, Phase::Commit, block_hash, &set)
                } else {
                    vec![]
                }
            }
            Phase::Commit => {
                let set = self.validator_set();
                if self.proposals.contains_key(&block_hash) {
                    self.cast_vote(view, Phase::Decide, block_hash, &set)
                } else {
                    vec![]
                }
            }
            Phase::Decide => self.commit(qc),
        }
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Commit
    // ═══════════════════════════════════════════════════════════════════════

    /// Commit the block certified by a Decide QC.
    ///
    /// The single safety-critical transition: it must never run twice for
    /// the same height with different blocks. The sequential-height guard
    /// makes duplicate Decide QCs no-ops, and quorum intersection prevents
    /// two conflicting Decide QCs from existing below the Byzantine bound.
    fn commit(&mut self, qc: QuorumCertificate) -> Vec<Action> {
        let height = qc.view.height;
        let block_hash = qc.block_hash;

        if height <= self.committed_height {
            trace!(height, "Already committed");
            return vec![];
        }
        if height != self.committed_height + 1 {
            return self.maybe_start_sync(height);
        }

        let Some(block) = self.proposals.get(&block_hash).cloned() else {
            // Certified but never received: fetch it through sync.
            debug!(block_hash = ?block_hash, height, "Decide QC for unheld block");
            return self.maybe_start_sync(height);
        };

        match self.ledger.commit(&block, &qc) {
            Ok(state_hash) => {
                info!(
                    validator = ?self.address,
                    height,
                    block_hash = ?block_hash,
                    state_hash = ?state_hash,
                    tx_count = block.transactions.len(),
                    "Committed block"
                );
            }
            Err(e) => {
                // A quorum-certified block the ledger refuses means local
                // divergence; do not advance past it.
                error!(height, block_hash = ?block_hash, error = %e, "Ledger refused certified block");
                return vec![];
            }
        }

        self.committed_height = height;
        self.committed_hash = block_hash;
        self.high_qc = qc;
        self.stats.blocks_committed += 1;

        let included: HashSet<Hash> = block.transactions.iter().map(|tx| tx.hash()).collect();
        self.mempool.retain(|tx| !included.contains(&tx.hash()));

        self.prune_below(height);

        let mut actions = vec![Action::EnqueueInternal {
            event: Event::BlockCommitted { height, block_hash },
        }];
        actions.extend(self.enter_view(View::new(height + 1, 0)));
        actions
    }

    /// Drop per-height bookkeeping at or below `height`.
    fn prune_below(&mut self, height: u64) {
        self.proposals.retain(|_, b| b.header.height > height);
        self.proposal_by_view.retain(|v, _| v.height > height);
        self.vote_sets.retain(|(v, _), _| v.height > height);
        self.qc_built.retain(|(v, _)| v.height > height);
        self.voted.retain(|(v, _), _| v.height > height);
        self.voted_height.retain(|&h, _| h > height);
        if self.locked.is_some_and(|(v, _)| v.height <= height) {
            self.locked = None;
        }
    }

    // ═══════════════════════════════════════════════════════════════════════
    // View Changes
    // ═══════════════════════════════════════════════════════════════════════

    /// Handle the pacemaker's view timer.
    pub fn on_view_timer(&mut self) -> Vec<Action> {
        if self.syncing {
            return vec![];
        }
        let Some(new_view) = self.pacemaker.on_timer_fired() else {
            return vec![];
        };
        self.advance_to(new_view)
    }

    /// Explicit view advancement (debug `TriggerNextView`).
    pub fn trigger_next_view(&mut self) -> Vec<Action> {
        if self.syncing {
            debug!("Ignoring TriggerNextView while syncing");
            return vec![];
        }
        let new_view = self.pacemaker.manual_advance();
        self.advance_to(new_view)
    }

    fn advance_to(&mut self, new_view: View) -> Vec<Action> {
        self.stats.view_changes += 1;

        let announcement = NewRound {
            view: new_view,
            from: self.address,
            signature: self.signing_key.sign(&new_round_message(new_view)),
        };

        let mut actions = vec![Action::Broadcast {
            message: OutboundMessage::NewRound(NewRoundGossip::new(announcement)),
        }];
        actions.extend(self.pacemaker.start(new_view));
        // Explicit advancement always gives the new leader its chance, even
        // in manual mode - that is the whole point of the trigger.
        actions.extend(self.try_propose());
        actions
    }

    /// Handle a round-advance announcement from a peer.
    ///
    /// Treated as a hint: it moves us forward by exactly one round at our
    /// current height, and only from a validator in the set.
    pub fn on_new_round(&mut self, announcement: NewRound) -> Vec<Action> {
        if self.syncing {
            return vec![];
        }

        let set = self.validator_set();
        let Some(sender) = set.get(&announcement.from) else {
            warn!(from = ?announcement.from, "New-round announcement from unknown validator");
            return vec![];
        };
        if !announcement.verify(&sender.public_key) {
            warn!(from = ?announcement.from, "New-round announcement signature rejected");
            return vec![];
        }

        let current = self.pacemaker.view();
        if announcement.view.height != current.height
            || announcement.view.round != current.round + 1
        {
            trace!(
                announced = %announcement.view,
                current = %current,
                "Ignoring non-adjacent new-round announcement"
            );
            return vec![];
        }

        debug!(view = %announcement.view, from = ?announcement.from, "Adopting announced round");
        self.stats.view_changes += 1;
        let mut actions = self
            .pacemaker
            .catch_up(announcement.view)
            .unwrap_or_default();
        actions.extend(self.try_propose());
        actions
    }

    /// Toggle the pacemaker's manual mode (debug surface).
    pub fn toggle_manual_mode(&mut self) -> Vec<Action> {
        let (_, actions) = self.pacemaker.toggle_manual();
        actions
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Sync Integration
    // ═══════════════════════════════════════════════════════════════════════

    /// Start (or widen) a sync session toward `target`.
    fn maybe_start_sync(&mut self, target: u64) -> Vec<Action> {
        if target <= self.committed_height || target <= self.announced_sync_target {
            return vec![];
        }
        info!(
            validator = ?self.address,
            committed = self.committed_height,
            target,
            "Height gap detected, entering sync"
        );
        self.syncing = true;
        self.announced_sync_target = target;
        vec![Action::EnqueueInternal {
            event: Event::SyncStarted { target },
        }]
    }

    /// Apply the next in-order synced block. The QC was validated by the
    /// sync subsystem before delivery.
    pub fn on_sync_block(&mut self, block: Block, qc: QuorumCertificate) -> Vec<Action> {
        let height = block.header.height;
        if height != self.committed_height + 1 {
            warn!(
                height,
                committed = self.committed_height,
                "Synced block out of order"
            );
            return vec![];
        }

        let block_hash = block.hash();
        match self.ledger.commit(&block, &qc) {
            Ok(_) => {
                info!(validator = ?self.address, height, block_hash = ?block_hash, "Applied synced block");
            }
            Err(e) => {
                error!(height, error = %e, "Ledger refused synced block");
                return vec![];
            }
        }

        self.committed_height = height;
        self.committed_hash = block_hash;
        self.high_qc = qc;
        self.stats.blocks_committed += 1;
        self.prune_below(height);

        vec![Action::EnqueueInternal {
            event: Event::BlockCommitted { height, block_hash },
        }]
    }

    /// Sync finished: rejoin consensus at the next open height.
    pub fn on_sync_complete(&mut self, height: u64) -> Vec<Action> {
        info!(validator = ?self.address, height, "Sync complete, resuming participation");
        self.syncing = false;
        self.announced_sync_target = 0;
        self.enter_view(View::new(self.committed_height + 1, 0))
    }

    /// Sync gave up. The node stays out of consensus - it must never
    /// silently resume voting while behind - but the next detected gap
    /// starts a fresh session.
    pub fn on_sync_abandoned(&mut self, target: u64) -> Vec<Action> {
        warn!(
            validator = ?self.address,
            target,
            committed = self.committed_height,
            "Sync abandoned; consensus stays paused until the next gap detection"
        );
        self.announced_sync_target = 0;
        vec![]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use palisade_core::{ActorStatus, LedgerError};
    use palisade_types::test_utils::test_validator_set;
    use std::collections::VecDeque;
    use std::sync::RwLock;
    use tracing_test::traced_test;

    /// Minimal in-memory ledger for driving the state machine in tests.
    ///
    /// Rejects any block containing a transaction whose payload starts with
    /// `bad:`, standing in for an invalid transaction inside an otherwise
    /// well-formed block.
    struct TestLedger {
        set: ValidatorSet,
        chain: RwLock<Vec<(Block, QuorumCertificate)>>,
    }

    impl TestLedger {
        fn new(set: ValidatorSet) -> Self {
            Self {
                set,
                chain: RwLock::new(vec![(Block::genesis(), QuorumCertificate::genesis())]),
            }
        }
    }

    impl Ledger for TestLedger {
        fn speculate(&self, block: &Block) -> Result<Hash, LedgerError> {
            let chain = self.chain.read().unwrap();
            let (tip, _) = chain.last().unwrap();
            if block.header.parent_hash != tip.hash() {
                return Err(LedgerError::InvalidBlock {
                    height: block.header.height,
                    reason: "parent mismatch".into(),
                });
            }
            if block
                .transactions
                .iter()
                .any(|tx| tx.payload.starts_with(b"bad:"))
            {
                return Err(LedgerError::InvalidTransaction("bad payload".into()));
            }
            Ok(Hash::digest(block.hash().as_bytes()))
        }

        fn commit(&self, block: &Block, qc: &QuorumCertificate) -> Result<Hash, LedgerError> {
            let mut chain = self.chain.write().unwrap();
            let committed = chain.len() as u64 - 1;
            if block.header.height != committed + 1 {
                return Err(LedgerError::NonSequentialCommit {
                    committed,
                    attempted: block.header.height,
                });
            }
            chain.push((block.clone(), qc.clone()));
            Ok(Hash::digest(block.hash().as_bytes()))
        }

        fn committed_height(&self) -> u64 {
            self.chain.read().unwrap().len() as u64 - 1
        }

        fn committed_hash(&self) -> Hash {
            self.chain.read().unwrap().last().unwrap().0.hash()
        }

        fn block(&self, height: u64) -> Option<(Block, QuorumCertificate)> {
            self.chain.read().unwrap().get(height as usize).cloned()
        }

        fn validator_set(&self, _height: u64) -> ValidatorSet {
            self.set.clone()
        }

        fn reset_to_genesis(&self) {
            self.chain.write().unwrap().truncate(1);
        }

        fn actor_exists(&self, address: &Address, _height: u64) -> bool {
            self.set.contains(address)
        }

        fn actor_status(&self, address: &Address, _height: u64) -> Option<ActorStatus> {
            self.set.contains(address).then_some(ActorStatus::Staked)
        }

        fn pause_height(&self, _address: &Address, _height: u64) -> Option<u64> {
            None
        }

        fn unstaking_height(&self, _address: &Address, _height: u64) -> Option<u64> {
            None
        }
    }

    /// A small in-process cluster delivering actions synchronously.
    struct Cluster {
        nodes: Vec<ConsensusState>,
        addresses: Vec<Address>,
        misbehavior_reports: Vec<(usize, Address)>,
        sync_requests: Vec<(usize, u64)>,
    }

    impl Cluster {
        fn new(n: usize) -> Self {
            let (set, keys) = test_validator_set(n);
            let addresses: Vec<Address> = keys.iter().map(|k| k.address()).collect();
            let nodes = keys
                .into_iter()
                .map(|key| {
                    let ledger = Arc::new(TestLedger::new(set.clone()));
                    ConsensusState::new(key, ledger, BftConfig::default(), true)
                })
                .collect();
            Self {
                nodes,
                addresses,
                misbehavior_reports: Vec::new(),
                sync_requests: Vec::new(),
            }
        }

        fn initialize(&mut self) {
            let actions: Vec<(usize, Vec<Action>)> = self
                .nodes
                .iter_mut()
                .enumerate()
                .map(|(i, node)| (i, node.initialize()))
                .collect();
            for (i, acts) in actions {
                self.run(i, acts);
            }
        }

        fn index_of(&self, address: &Address) -> usize {
            self.addresses.iter().position(|a| a == address).unwrap()
        }

        fn leader_index(&self, view: View) -> usize {
            let set = self.nodes[0].validator_set();
            let leader = leader_for(view.height, view.round, &set).unwrap();
            self.index_of(&leader)
        }

        /// Deliver `actions` produced by node `origin` until quiescent.
        fn run(&mut self, origin: usize, actions: Vec<Action>) {
            let mut queue: VecDeque<(usize, Action)> =
                actions.into_iter().map(|a| (origin, a)).collect();

            while let Some((from, action)) = queue.pop_front() {
                match action {
                    Action::Broadcast { message } => {
                        for to in 0..self.nodes.len() {
                            if to != from {
                                for a in self.deliver(to, &message) {
                                    queue.push_back((to, a));
                                }
                            }
                        }
                    }
                    Action::Send { to, message } => {
                        let to = self.index_of(&to);
                        for a in self.deliver(to, &message) {
                            queue.push_back((to, a));
                        }
                    }
                    Action::EnqueueInternal { event } => match event {
                        Event::QcFormed { qc } => {
                            for a in self.nodes[from].on_qc_formed(qc) {
                                queue.push_back((from, a));
                            }
                        }
                        Event::SyncStarted { target } => {
                            self.sync_requests.push((from, target));
                        }
                        _ => {}
                    },
                    Action::ReportMisbehavior { offender, .. } => {
                        self.misbehavior_reports.push((from, offender));
                    }
                    Action::SetTimer { .. } | Action::CancelTimer { .. } => {}
                }
            }
        }

        fn deliver(&mut self, to: usize, message: &OutboundMessage) -> Vec<Action> {
            let node = &mut self.nodes[to];
            match message {
                OutboundMessage::Proposal(g) => node.on_proposal(g.block.clone()),
                OutboundMessage::Vote(g) => node.on_vote(g.vote.clone()),
                OutboundMessage::Qc(g) => node.on_qc(g.qc.clone()),
                OutboundMessage::NewRound(g) => node.on_new_round(g.announcement.clone()),
                _ => vec![],
            }
        }

        /// Broadcast the debug TriggerNextView to every node.
        fn trigger_next_view(&mut self) {
            let actions: Vec<(usize, Vec<Action>)> = self
                .nodes
                .iter_mut()
                .enumerate()
                .map(|(i, node)| (i, node.trigger_next_view()))
                .collect();
            for (i, acts) in actions {
                self.run(i, acts);
            }
        }
    }

    #[traced_test]
    #[test]
    fn test_manual_liveness_advances_deterministically() {
        let mut cluster = Cluster::new(4);
        cluster.initialize();
        for node in &cluster.nodes {
            assert_eq!(node.committed_height(), 0);
        }

        // Each trigger drives exactly one commit.
        for expected_height in 1..=3u64 {
            cluster.trigger_next_view();
            for node in &cluster.nodes {
                assert_eq!(node.committed_height(), expected_height);
                assert_eq!(node.view(), View::new(expected_height + 1, 0));
            }
        }

        // Everyone agrees on the chain.
        let tip = cluster.nodes[0].committed_hash();
        for node in &cluster.nodes {
            assert_eq!(node.committed_hash(), tip);
        }
    }

    #[traced_test]
    #[test]
    fn test_equivocating_leader_commits_only_one_block() {
        let mut cluster = Cluster::new(4);
        cluster.initialize();
        cluster.trigger_next_view();
        let height = cluster.nodes[0].committed_height() + 1;
        let view = cluster.nodes[0].view();
        let leader = cluster.leader_index(view);

        let parent = cluster.nodes[leader].committed_hash();
        let justify = cluster.nodes[leader].high_qc.clone();

        let make_block = |payload: Option<&[u8]>| Block {
            header: BlockHeader {
                height,
                round: view.round,
                proposer: cluster.addresses[leader],
                parent_hash: parent,
                timestamp_ms: 0,
            },
            justify_qc: justify.clone(),
            transactions: payload
                .map(|p| vec![Transaction::new(p.to_vec())])
                .unwrap_or_default(),
        };
        let block_a = make_block(None);
        let block_b = make_block(Some(b"tx"));
        assert_ne!(block_a.hash(), block_b.hash());

        // Three nodes (a quorum) see A; the fourth sees B.
        let minority = (0..4).find(|&i| i != leader).unwrap();
        for i in 0..4 {
            let block = if i == minority {
                block_b.clone()
            } else {
                block_a.clone()
            };
            let actions = cluster.nodes[i].on_proposal(block);
            cluster.run(i, actions);
        }

        // Only A reached a Decide QC.
        let committed: Vec<u64> = cluster
            .nodes
            .iter()
            .map(|n| n.committed_height())
            .collect();
        for (i, &h) in committed.iter().enumerate() {
            if i == minority {
                // The minority node is vote-locked on B and cannot commit A
                // without the proposal; it detected the gap instead.
                assert_eq!(h, height - 1);
            } else {
                assert_eq!(h, height);
                assert_eq!(cluster.nodes[i].committed_hash(), block_a.hash());
            }
        }
        assert!(cluster
            .sync_requests
            .iter()
            .any(|&(node, target)| node == minority && target == height));

        // The late-arriving conflicting proposal changes nothing: the
        // committed height already covers it.
        let quorum_node = (0..4).find(|&i| i != minority && i != leader).unwrap();
        let actions = cluster.nodes[quorum_node].on_proposal(block_b.clone());
        cluster.run(quorum_node, actions);
        assert_eq!(cluster.nodes[quorum_node].committed_hash(), block_a.hash());
    }

    #[traced_test]
    #[test]
    fn test_duplicate_vote_is_idempotent() {
        let mut cluster = Cluster::new(4);
        cluster.initialize();

        let view = cluster.nodes[0].view();
        let leader = cluster.leader_index(View::new(view.height, view.round + 1));

        // Advance so the chosen leader proposes, but intercept its actions
        // instead of delivering them.
        let proposal_actions = cluster.nodes[leader].trigger_next_view();
        let block = proposal_actions
            .iter()
            .find_map(|a| match a {
                Action::Broadcast {
                    message: OutboundMessage::Proposal(g),
                } => Some(g.block.clone()),
                _ => None,
            })
            .expect("leader should propose");

        // A non-leader validates and votes.
        let voter = (0..4).find(|&i| i != leader).unwrap();
        let _ = cluster.nodes[voter].trigger_next_view();
        let vote = cluster.nodes[voter]
            .on_proposal(block)
            .into_iter()
            .find_map(|a| match a {
                Action::Send {
                    message: OutboundMessage::Vote(g),
                    ..
                } => Some(g.vote),
                _ => None,
            })
            .expect("voter should vote");

        let first = cluster.nodes[leader].on_vote(vote.clone());
        // Own vote + this one: two of four, no quorum yet, no actions.
        assert!(first.is_empty());

        let second = cluster.nodes[leader].on_vote(vote);
        assert!(second.is_empty(), "duplicate vote must change nothing");
    }

    #[traced_test]
    #[test]
    fn test_ledger_rejected_block_is_not_voted_for() {
        let mut cluster = Cluster::new(4);
        cluster.initialize();
        cluster.trigger_next_view();

        let view = cluster.nodes[0].view();
        let leader = cluster.leader_index(view);
        let replica = (0..4).find(|&i| i != leader).unwrap();

        let block = Block {
            header: BlockHeader {
                height: cluster.nodes[replica].committed_height() + 1,
                round: view.round,
                proposer: cluster.addresses[leader],
                parent_hash: cluster.nodes[replica].committed_hash(),
                timestamp_ms: 0,
            },
            justify_qc: cluster.nodes[replica].high_qc.clone(),
            transactions: vec![Transaction::new(b"bad: invalid".to_vec())],
        };

        let actions = cluster.nodes[replica].on_proposal(block);
        let voted = actions.iter().any(|a| {
            matches!(
                a,
                Action::Send {
                    message: OutboundMessage::Vote(_),
                    ..
                }
            )
        });
        assert!(!voted, "ledger-rejected proposal must not be voted for");
    }

    #[traced_test]
    #[test]
    fn test_wrong_proposer_is_rejected() {
        let mut cluster = Cluster::new(4);
        cluster.initialize();
        cluster.trigger_next_view();

        let view = cluster.nodes[0].view();
        let leader = cluster.leader_index(view);
        let imposter = (0..4).find(|&i| i != leader).unwrap();

        let block = Block {
            header: BlockHeader {
                height: cluster.nodes[leader].committed_height() + 1,
                round: view.round,
                proposer: cluster.addresses[imposter],
                parent_hash: cluster.nodes[leader].committed_hash(),
                timestamp_ms: 0,
            },
            justify_qc: cluster.nodes[leader].high_qc.clone(),
            transactions: vec![],
        };

        let target = (0..4).find(|&i| i != imposter).unwrap();
        let actions = cluster.nodes[target].on_proposal(block);
        assert!(actions.is_empty(), "misattributed proposal must be discarded");
    }

    #[traced_test]
    #[test]
    fn test_reset_to_genesis() {
        let mut cluster = Cluster::new(4);
        cluster.initialize();
        cluster.trigger_next_view();
        cluster.trigger_next_view();
        assert_eq!(cluster.nodes[0].committed_height(), 2);

        let actions = cluster.nodes[0].reset_to_genesis();
        cluster.run(0, actions);
        assert_eq!(cluster.nodes[0].committed_height(), 0);
        assert_eq!(cluster.nodes[0].view(), View::new(1, 0));
        assert_eq!(
            cluster.nodes[0].committed_hash(),
            Block::genesis().hash()
        );
    }

    #[traced_test]
    #[test]
    fn test_transactions_flow_into_committed_blocks() {
        let mut cluster = Cluster::new(4);
        cluster.initialize();

        let tx = Transaction::new(b"transfer 42".to_vec());
        for node in cluster.nodes.iter_mut() {
            node.add_transaction(tx.clone());
        }

        cluster.trigger_next_view();

        for node in &cluster.nodes {
            assert_eq!(node.committed_height(), 1);
            // The committed block drained the transaction from the mempool.
            assert_eq!(node.mempool_len(), 0);
        }
    }
}
