//! Sync session state machine.

use crate::error::SyncResponseError;
use palisade_core::{Action, Event, OutboundMessage, TimerId};
use palisade_messages::GetBlockRequest;
use palisade_types::{Address, Block, GroupPublicKey, Phase, QuorumCertificate, ValidatorSet};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::time::Duration;
use tracing::{debug, info, trace, warn};

/// Configuration for the sync subsystem.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Maximum concurrent block requests.
    pub max_in_flight: usize,
    /// Retry budget per height before the session is abandoned.
    pub max_retries: u32,
    /// Base timeout for one request; doubles per retry of that height.
    pub request_timeout: Duration,
    /// Pacing interval for timeout detection and window refill.
    pub tick_interval: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            max_in_flight: 4,
            max_retries: 3,
            request_timeout: Duration::from_secs(2),
            tick_interval: Duration::from_millis(500),
        }
    }
}

/// Snapshot of the sync state for diagnostics.
#[derive(Debug, Clone, Serialize)]
pub struct SyncStatus {
    pub syncing: bool,
    pub current_height: u64,
    pub target_height: Option<u64>,
    pub blocks_behind: u64,
    pub pending_requests: usize,
    pub queued_heights: usize,
}

/// One outstanding block request.
#[derive(Debug)]
struct PendingFetch {
    peer: Address,
    sent_at: Duration,
    retries: u32,
}

/// An open catch-up session toward a target height.
#[derive(Debug)]
struct Session {
    target: u64,
    peers: Vec<Address>,
    peer_cursor: usize,
    /// Heights awaiting a request slot.
    queued: VecDeque<u64>,
    /// Heights with an outstanding request.
    pending: HashMap<u64, PendingFetch>,
    /// Validated blocks waiting to be delivered in order.
    received: BTreeMap<u64, (Block, QuorumCertificate)>,
    /// Height currently handed to consensus, awaiting its commit.
    delivered: Option<u64>,
}

/// Validate a block response before accepting it.
///
/// The QC must be a Decide certificate for exactly the requested height and
/// block, and must verify against the validator set (and group key when
/// threshold-signed). Callers treat malicious errors differently from a
/// peer that simply lacks the block.
pub fn validate_response(
    requested: u64,
    block: Option<Block>,
    qc: Option<QuorumCertificate>,
    set: &ValidatorSet,
    group_key: Option<&GroupPublicKey>,
) -> Result<(Block, QuorumCertificate), SyncResponseError> {
    let (block, qc) = match (block, qc) {
        (Some(block), Some(qc)) => (block, qc),
        (None, None) => return Err(SyncResponseError::Empty { height: requested }),
        _ => return Err(SyncResponseError::PartialResponse { height: requested }),
    };

    if block.header.height != requested {
        return Err(SyncResponseError::HeightMismatch {
            requested,
            got: block.header.height,
        });
    }
    if qc.view.height != requested || qc.block_hash != block.hash() {
        return Err(SyncResponseError::QcBlockMismatch { height: requested });
    }
    if qc.phase != Phase::Decide {
        return Err(SyncResponseError::NotADecideQc { height: requested });
    }
    qc.verify(set, group_key)
        .map_err(|e| SyncResponseError::QcInvalid {
            height: requested,
            reason: e.to_string(),
        })?;

    Ok((block, qc))
}

/// State-sync session driver.
///
/// All I/O happens through returned [`Action`]s; responses and commits are
/// fed back in by the node state machine.
#[derive(Debug)]
pub struct SyncState {
    config: SyncConfig,
    address: Address,
    committed_height: u64,
    session: Option<Session>,
    now: Duration,
}

impl SyncState {
    /// Create the sync subsystem.
    pub fn new(address: Address, config: SyncConfig) -> Self {
        Self {
            config,
            address,
            committed_height: 0,
            session: None,
            now: Duration::ZERO,
        }
    }

    /// Set the current time. Called by the runner before each handler.
    pub fn set_time(&mut self, now: Duration) {
        self.now = now;
    }

    /// Whether a session is open.
    pub fn is_syncing(&self) -> bool {
        self.session.is_some()
    }

    /// Diagnostic snapshot.
    pub fn status(&self) -> SyncStatus {
        SyncStatus {
            syncing: self.session.is_some(),
            current_height: self.committed_height,
            target_height: self.session.as_ref().map(|s| s.target),
            blocks_behind: self
                .session
                .as_ref()
                .map(|s| s.target.saturating_sub(self.committed_height))
                .unwrap_or(0),
            pending_requests: self.session.as_ref().map(|s| s.pending.len()).unwrap_or(0),
            queued_heights: self.session.as_ref().map(|s| s.queued.len()).unwrap_or(0),
        }
    }

    /// Drop any open session without reporting (full node reset).
    pub fn cancel(&mut self) -> Vec<Action> {
        if self.session.take().is_some() {
            vec![Action::CancelTimer {
                id: TimerId::SyncTick,
            }]
        } else {
            vec![]
        }
    }

    /// Open (or widen) a session fetching `committed+1..=target` from
    /// `peers`.
    pub fn start(&mut self, target: u64, committed: u64, peers: Vec<Address>) -> Vec<Action> {
        self.committed_height = committed;

        let peers: Vec<Address> = peers.into_iter().filter(|p| *p != self.address).collect();
        if peers.is_empty() {
            warn!(target, "Cannot sync: no peers");
            return vec![];
        }

        match &mut self.session {
            Some(session) if session.target >= target => {
                trace!(target, existing = session.target, "Already syncing past target");
                return vec![];
            }
            Some(session) => {
                info!(old = session.target, new = target, "Widening sync session");
                let from = session.target + 1;
                for height in from..=target {
                    session.queued.push_back(height);
                }
                session.target = target;
            }
            None => {
                info!(
                    validator = ?self.address,
                    committed,
                    target,
                    "Starting sync session"
                );
                let mut queued = VecDeque::new();
                for height in (committed + 1)..=target {
                    queued.push_back(height);
                }
                self.session = Some(Session {
                    target,
                    peers,
                    peer_cursor: 0,
                    queued,
                    pending: HashMap::new(),
                    received: BTreeMap::new(),
                    delivered: None,
                });
            }
        }

        let mut actions = self.fill_window();
        actions.push(Action::SetTimer {
            id: TimerId::SyncTick,
            duration: self.config.tick_interval,
        });
        actions
    }

    /// Issue requests until the in-flight window is full.
    fn fill_window(&mut self) -> Vec<Action> {
        let Some(session) = &mut self.session else {
            return vec![];
        };

        let mut actions = Vec::new();
        while session.pending.len() < self.config.max_in_flight {
            let Some(height) = session.queued.pop_front() else {
                break;
            };
            if height <= self.committed_height || session.received.contains_key(&height) {
                continue;
            }
            let peer = session.peers[session.peer_cursor % session.peers.len()];
            session.peer_cursor += 1;

            trace!(height, peer = ?peer, "Requesting block");
            session.pending.insert(
                height,
                PendingFetch {
                    peer,
                    sent_at: self.now,
                    retries: 0,
                },
            );
            actions.push(Action::Send {
                to: peer,
                message: OutboundMessage::BlockRequest(GetBlockRequest::new(height)),
            });
        }
        actions
    }

    /// Pacing tick: detect timeouts, retry with backoff, refill the window.
    pub fn on_tick(&mut self) -> Vec<Action> {
        let Some(session) = &mut self.session else {
            // No session: let the tick timer lapse.
            return vec![];
        };

        let mut actions = Vec::new();
        let mut abandon = false;

        let timed_out: Vec<u64> = session
            .pending
            .iter()
            .filter(|(_, fetch)| {
                let deadline = self.config.request_timeout * 2u32.pow(fetch.retries.min(8));
                self.now.saturating_sub(fetch.sent_at) > deadline
            })
            .map(|(&height, _)| height)
            .collect();

        for height in timed_out {
            let Some(fetch) = session.pending.get_mut(&height) else {
                continue;
            };
            if fetch.retries >= self.config.max_retries {
                abandon = true;
                break;
            }
            fetch.retries += 1;
            fetch.sent_at = self.now;
            let peer = session.peers[session.peer_cursor % session.peers.len()];
            session.peer_cursor += 1;
            let old_peer = std::mem::replace(&mut fetch.peer, peer);

            debug!(
                height,
                retries = fetch.retries,
                old_peer = ?old_peer,
                new_peer = ?peer,
                "Sync request timed out, retrying"
            );
            actions.push(Action::Send {
                to: peer,
                message: OutboundMessage::BlockRequest(GetBlockRequest::new(height)),
            });
        }

        if abandon {
            let target = session.target;
            warn!(
                validator = ?self.address,
                target,
                committed = self.committed_height,
                "Retry budget exhausted, abandoning sync session"
            );
            self.session = None;
            return vec![
                Action::CancelTimer {
                    id: TimerId::SyncTick,
                },
                Action::EnqueueInternal {
                    event: Event::SyncAbandoned { target },
                },
            ];
        }

        actions.extend(self.fill_window());
        actions.push(Action::SetTimer {
            id: TimerId::SyncTick,
            duration: self.config.tick_interval,
        });
        actions
    }

    /// Handle a block response from a peer.
    pub fn on_response(
        &mut self,
        height: u64,
        block: Option<Block>,
        qc: Option<QuorumCertificate>,
        set: &ValidatorSet,
        group_key: Option<&GroupPublicKey>,
    ) -> Vec<Action> {
        let Some(session) = &mut self.session else {
            trace!(height, "Response with no session open");
            return vec![];
        };
        if !session.pending.contains_key(&height) {
            trace!(height, "Response for a height that is not pending");
            return vec![];
        }

        match validate_response(height, block, qc, set, group_key) {
            Ok((block, qc)) => {
                session.pending.remove(&height);
                debug!(height, "Accepted synced block");
                session.received.insert(height, (block, qc));
                let mut actions = self.deliver_next();
                actions.extend(self.fill_window());
                actions
            }
            Err(error) => {
                // Leave the pending entry in place: the tick path retries it
                // against another peer and enforces the retry budget.
                if error.is_malicious() {
                    warn!(height, error = %error, "Malicious sync response");
                } else {
                    debug!(height, error = %error, "Unusable sync response");
                }
                vec![]
            }
        }
    }

    /// Deliver the next in-order block to consensus, one at a time.
    fn deliver_next(&mut self) -> Vec<Action> {
        let Some(session) = &mut self.session else {
            return vec![];
        };
        if session.delivered.is_some() {
            return vec![];
        }
        let next = self.committed_height + 1;
        let Some((block, qc)) = session.received.remove(&next) else {
            return vec![];
        };

        debug!(height = next, "Delivering synced block for application");
        session.delivered = Some(next);
        vec![Action::EnqueueInternal {
            event: Event::SyncBlockReady { block, qc },
        }]
    }

    /// The consensus core committed `height`; advance the session.
    pub fn on_committed(&mut self, height: u64) -> Vec<Action> {
        self.committed_height = self.committed_height.max(height);

        let Some(session) = &mut self.session else {
            return vec![];
        };

        if session.delivered == Some(height) {
            session.delivered = None;
        }
        session.queued.retain(|&h| h > height);
        session.pending.retain(|&h, _| h > height);
        session.received.retain(|&h, _| h > height);

        if self.committed_height >= session.target {
            let reached = self.committed_height;
            info!(height = reached, "Sync session complete");
            self.session = None;
            return vec![
                Action::CancelTimer {
                    id: TimerId::SyncTick,
                },
                Action::EnqueueInternal {
                    event: Event::SyncCompleted { height: reached },
                },
            ];
        }

        let mut actions = self.deliver_next();
        actions.extend(self.fill_window());
        actions
    }
}
