//! DKG ceremony state machine.

use palisade_core::{Action, Event, OutboundMessage, TimerId};
use palisade_messages::DkgShareGossip;
use palisade_types::{Address, DkgShare, PublicKeySet, SecretKeyShare, ValidatorSet};
use std::collections::BTreeMap;
use std::time::Duration;
use thiserror::Error;
use threshold_crypto::group::CurveAffine;
use threshold_crypto::ff::Field;
use threshold_crypto::poly::{Commitment, Poly};
use threshold_crypto::serde_impl::FieldWrap;
use threshold_crypto::{Fr, G1Affine};
use tracing::{debug, info, warn};

/// Errors from ceremony control.
#[derive(Debug, Error)]
pub enum DkgError {
    #[error("a ceremony is already in flight (session {0})")]
    CeremonyInFlight(u64),

    #[error("this node is not among the ceremony participants")]
    NotAParticipant,

    #[error("threshold {threshold} is invalid for {participants} participants")]
    InvalidThreshold {
        threshold: usize,
        participants: usize,
    },
}

/// Ceremony lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DkgPhase {
    /// No ceremony has run.
    Idle,
    /// Dealing done, collecting and verifying peer shares.
    SharesDistributed,
    /// The last ceremony produced a group key.
    Complete,
    /// The last ceremony failed (deadline with missing shares).
    Failed,
}

impl DkgPhase {
    pub fn name(&self) -> &'static str {
        match self {
            DkgPhase::Idle => "idle",
            DkgPhase::SharesDistributed => "shares-distributed",
            DkgPhase::Complete => "complete",
            DkgPhase::Failed => "failed",
        }
    }
}

/// The product of a successful ceremony.
pub struct DkgOutcome {
    pub session: u64,
    pub public_keys: PublicKeySet,
    pub secret_share: SecretKeyShare,
    pub share_index: usize,
}

/// One in-flight ceremony's collection state.
struct Ceremony {
    session: u64,
    participants: ValidatorSet,
    /// Number of shares required to sign (polynomial degree + 1).
    threshold: usize,
    our_index: usize,
    /// Verified contributions per dealer: commitment and our share of it.
    contributions: BTreeMap<Address, (Commitment, Fr)>,
}

/// DKG subsystem state machine.
pub struct DkgState {
    address: Address,
    /// Deadline for collecting all contributions.
    deadline: Duration,
    /// Monotonic ceremony id.
    next_session: u64,
    active: Option<Ceremony>,
    /// Result of the last completed ceremony, until consumed.
    outcome: Option<DkgOutcome>,
    last_phase: DkgPhase,
}

impl std::fmt::Debug for DkgState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DkgState")
            .field("address", &self.address)
            .field("phase", &self.phase())
            .field("next_session", &self.next_session)
            .finish()
    }
}

impl DkgState {
    /// Create the DKG subsystem for this validator.
    pub fn new(address: Address, deadline: Duration) -> Self {
        Self {
            address,
            deadline,
            next_session: 0,
            active: None,
            outcome: None,
            last_phase: DkgPhase::Idle,
        }
    }

    /// The observable ceremony phase.
    pub fn phase(&self) -> DkgPhase {
        if self.active.is_some() {
            DkgPhase::SharesDistributed
        } else {
            self.last_phase
        }
    }

    /// Take the product of the last successful ceremony.
    pub fn take_outcome(&mut self) -> Option<DkgOutcome> {
        self.outcome.take()
    }

    /// Start a key-generation ceremony among `participants`, requiring
    /// `threshold` shares to sign.
    ///
    /// Rejected (not queued) while a ceremony is in flight.
    pub fn start_ceremony(
        &mut self,
        participants: ValidatorSet,
        threshold: usize,
    ) -> Result<Vec<Action>, DkgError> {
        if let Some(ceremony) = &self.active {
            return Err(DkgError::CeremonyInFlight(ceremony.session));
        }
        if threshold == 0 || threshold > participants.len() {
            return Err(DkgError::InvalidThreshold {
                threshold,
                participants: participants.len(),
            });
        }
        let our_index = participants
            .index_of(&self.address)
            .ok_or(DkgError::NotAParticipant)?;

        let session = self.next_session;
        self.next_session += 1;

        info!(
            validator = ?self.address,
            session,
            participants = participants.len(),
            threshold,
            "Starting DKG ceremony"
        );

        // Deal: a random polynomial of degree threshold-1. Share i is the
        // evaluation at x = i + 1 (x = 0 is the contribution's secret).
        let poly = Poly::random(threshold - 1, &mut rand::thread_rng());
        let commitment = poly.commitment();

        let mut actions = Vec::new();
        let mut ceremony = Ceremony {
            session,
            participants: participants.clone(),
            threshold,
            our_index,
            contributions: BTreeMap::new(),
        };

        for (index, participant) in participants.iter().enumerate() {
            let value: Fr = poly.evaluate(index as u64 + 1);
            if participant.address == self.address {
                // Our own contribution needs no wire trip.
                ceremony
                    .contributions
                    .insert(self.address, (commitment.clone(), value));
                continue;
            }
            let share_bytes = match bincode::serialize(&FieldWrap(value)) {
                Ok(bytes) => bytes,
                Err(e) => {
                    warn!(error = %e, "Failed to serialize share");
                    continue;
                }
            };
            actions.push(Action::Send {
                to: participant.address,
                message: OutboundMessage::DkgShare(DkgShareGossip::new(DkgShare {
                    session,
                    dealer: self.address,
                    recipient: participant.address,
                    commitment: commitment.clone(),
                    share: share_bytes,
                })),
            });
        }

        actions.push(Action::SetTimer {
            id: TimerId::Dkg,
            duration: self.deadline,
        });

        self.active = Some(ceremony);
        Ok(actions)
    }

    /// Handle a share from a dealer.
    ///
    /// The share is validated against the dealer's commitment before being
    /// accepted; invalid shares are rejected with the dealer logged.
    pub fn on_share(&mut self, share: DkgShare) -> Vec<Action> {
        let Some(ceremony) = &mut self.active else {
            debug!(session = share.session, "Share with no ceremony in flight");
            return vec![];
        };

        if share.session != ceremony.session {
            debug!(
                got = share.session,
                active = ceremony.session,
                "Share for a different ceremony"
            );
            return vec![];
        }
        if share.recipient != self.address {
            debug!(recipient = ?share.recipient, "Share addressed to someone else");
            return vec![];
        }
        if !ceremony.participants.contains(&share.dealer) {
            warn!(dealer = ?share.dealer, "Share from non-participant");
            return vec![];
        }
        if ceremony.contributions.contains_key(&share.dealer) {
            debug!(dealer = ?share.dealer, "Duplicate share");
            return vec![];
        }
        if share.commitment.degree() != ceremony.threshold - 1 {
            warn!(
                dealer = ?share.dealer,
                degree = share.commitment.degree(),
                expected = ceremony.threshold - 1,
                "Commitment has wrong degree"
            );
            return vec![];
        }

        let value: Fr = match bincode::deserialize::<FieldWrap<Fr>>(&share.share) {
            Ok(wrap) => wrap.into_inner(),
            Err(e) => {
                warn!(dealer = ?share.dealer, error = %e, "Share bytes do not decode");
                return vec![];
            }
        };

        // The commitment at our evaluation point must equal the share times
        // the group generator.
        let expected = share.commitment.evaluate(ceremony.our_index as u64 + 1);
        let actual = G1Affine::one().mul(value);
        if expected != actual {
            warn!(
                dealer = ?share.dealer,
                session = ceremony.session,
                "Share does not match dealer commitment, rejecting"
            );
            return vec![];
        }

        debug!(
            validator = ?self.address,
            dealer = ?share.dealer,
            collected = ceremony.contributions.len() + 1,
            needed = ceremony.participants.len(),
            "Verified DKG share"
        );

        ceremony
            .contributions
            .insert(share.dealer, (share.commitment, value));

        if ceremony.contributions.len() == ceremony.participants.len() {
            return self.finalize();
        }
        vec![]
    }

    /// Combine all verified contributions into the group key and our share.
    fn finalize(&mut self) -> Vec<Action> {
        let Some(ceremony) = self.active.take() else {
            return vec![];
        };

        let mut group_commitment = Poly::zero().commitment();
        let mut secret = Fr::zero();
        for (commitment, value) in ceremony.contributions.values() {
            group_commitment += commitment.clone();
            secret.add_assign(value);
        }

        let public_keys = PublicKeySet::from(group_commitment);
        let secret_share = SecretKeyShare::from_mut(&mut secret);

        info!(
            validator = ?self.address,
            session = ceremony.session,
            share_index = ceremony.our_index,
            "DKG ceremony complete"
        );

        let session = ceremony.session;
        self.outcome = Some(DkgOutcome {
            session,
            public_keys,
            secret_share,
            share_index: ceremony.our_index,
        });
        self.last_phase = DkgPhase::Complete;

        vec![
            Action::CancelTimer { id: TimerId::Dkg },
            Action::EnqueueInternal {
                event: Event::DkgCompleted { session },
            },
        ]
    }

    /// Handle the ceremony deadline.
    ///
    /// A ceremony still missing contributions fails; the failure is
    /// reported and block production continues on individual signatures.
    pub fn on_deadline(&mut self) -> Vec<Action> {
        let Some(ceremony) = self.active.take() else {
            return vec![];
        };

        let reason = format!(
            "collected {} of {} contributions before the deadline",
            ceremony.contributions.len(),
            ceremony.participants.len()
        );
        warn!(
            validator = ?self.address,
            session = ceremony.session,
            %reason,
            "DKG ceremony failed"
        );
        self.last_phase = DkgPhase::Failed;

        vec![Action::EnqueueInternal {
            event: Event::DkgFailed {
                session: ceremony.session,
                reason,
            },
        }]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use palisade_types::test_utils::test_validator_set;
    use std::collections::BTreeMap as Map;
    use tracing_test::traced_test;

    /// Run a full ceremony among `n` nodes, returning their DKG states.
    fn run_ceremony(n: usize, threshold: usize) -> Vec<DkgState> {
        let (set, keys) = test_validator_set(n);
        let mut states: Vec<DkgState> = keys
            .iter()
            .map(|k| DkgState::new(k.address(), Duration::from_secs(10)))
            .collect();

        // Start everywhere, collecting the dealt shares.
        let mut deliveries: Vec<(Address, DkgShare)> = Vec::new();
        for state in states.iter_mut() {
            let actions = state.start_ceremony(set.clone(), threshold).unwrap();
            for action in actions {
                if let Action::Send {
                    to,
                    message: OutboundMessage::DkgShare(gossip),
                } = action
                {
                    deliveries.push((to, gossip.share));
                }
            }
        }

        // Deliver every share.
        let by_address: Map<Address, usize> = keys
            .iter()
            .enumerate()
            .map(|(i, k)| (k.address(), i))
            .collect();
        for (to, share) in deliveries {
            let idx = by_address[&to];
            states[idx].on_share(share);
        }

        states
    }

    #[traced_test]
    #[test]
    fn test_full_ceremony_produces_working_group_key() {
        let mut states = run_ceremony(4, 3);
        for state in &states {
            assert_eq!(state.phase(), DkgPhase::Complete);
        }

        let outcomes: Vec<DkgOutcome> =
            states.iter_mut().map(|s| s.take_outcome().unwrap()).collect();

        // Every participant derived the same group key.
        let group_key = outcomes[0].public_keys.public_key();
        for outcome in &outcomes {
            assert_eq!(outcome.public_keys.public_key(), group_key);
        }

        // A threshold of shares combines into a signature the group key
        // verifies; fewer does not.
        let message = b"threshold me";
        let shares: Map<usize, _> = outcomes
            .iter()
            .take(3)
            .map(|o| (o.share_index, o.secret_share.sign(message)))
            .collect();
        let signature = outcomes[0]
            .public_keys
            .combine_signatures(&shares)
            .expect("threshold shares combine");
        assert!(group_key.verify(&signature, message));

        let too_few: Map<usize, _> = outcomes
            .iter()
            .take(2)
            .map(|o| (o.share_index, o.secret_share.sign(message)))
            .collect();
        assert!(outcomes[0].public_keys.combine_signatures(&too_few).is_err());
    }

    #[traced_test]
    #[test]
    fn test_second_ceremony_is_rejected_while_one_is_active() {
        let (set, keys) = test_validator_set(4);
        let mut state = DkgState::new(keys[0].address(), Duration::from_secs(10));

        state.start_ceremony(set.clone(), 3).unwrap();
        let second = state.start_ceremony(set, 3);
        assert!(matches!(second, Err(DkgError::CeremonyInFlight(0))));
    }

    #[traced_test]
    #[test]
    fn test_tampered_share_is_rejected() {
        let (set, keys) = test_validator_set(4);
        let mut dealer = DkgState::new(keys[0].address(), Duration::from_secs(10));
        let mut receiver = DkgState::new(keys[1].address(), Duration::from_secs(10));

        let dealt = dealer.start_ceremony(set.clone(), 3).unwrap();
        receiver.start_ceremony(set, 3).unwrap();

        let mut share = dealt
            .iter()
            .find_map(|a| match a {
                Action::Send {
                    to,
                    message: OutboundMessage::DkgShare(gossip),
                } if *to == keys[1].address() => Some(gossip.share.clone()),
                _ => None,
            })
            .unwrap();

        // Flip the share value: the commitment check must reject it.
        let honest = share.clone();
        let tampered_value = Fr::one();
        share.share = bincode::serialize(&FieldWrap(tampered_value)).unwrap();
        receiver.on_share(share);

        // Nothing was accepted from the dealer; the honest share still is.
        let actions = receiver.on_share(honest);
        assert!(actions.is_empty()); // accepted, but ceremony not complete
        assert_eq!(receiver.phase(), DkgPhase::SharesDistributed);
    }

    #[traced_test]
    #[test]
    fn test_deadline_fails_incomplete_ceremony() {
        let (set, keys) = test_validator_set(4);
        let mut state = DkgState::new(keys[0].address(), Duration::from_secs(10));
        state.start_ceremony(set, 3).unwrap();

        let actions = state.on_deadline();
        assert!(actions.iter().any(|a| matches!(
            a,
            Action::EnqueueInternal {
                event: Event::DkgFailed { session: 0, .. }
            }
        )));
        assert_eq!(state.phase(), DkgPhase::Failed);

        // A fresh ceremony can start afterwards.
        let (set, _) = test_validator_set(4);
        assert!(state.start_ceremony(set, 3).is_ok());
    }

    #[traced_test]
    #[test]
    fn test_share_from_wrong_session_is_ignored() {
        let mut states = run_ceremony(4, 3);
        // All complete; a stale share arrives afterwards.
        let stale = DkgShare {
            session: 99,
            dealer: states[1].address,
            recipient: states[0].address,
            commitment: Poly::zero().commitment(),
            share: vec![],
        };
        let actions = states[0].on_share(stale);
        assert!(actions.is_empty());
        assert_eq!(states[0].phase(), DkgPhase::Complete);
    }
}
