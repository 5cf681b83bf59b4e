//! Quorum certificates.

use crate::{
    consensus_vote_message, AggregateSignature, Hash, Phase, SignerBitfield, ValidatorSet, View,
    VotePower,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Reasons a quorum certificate fails verification.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum QcError {
    #[error("QC signer {index} is not in the validator set")]
    UnknownSigner { index: usize },

    #[error("QC voting power {power} does not meet quorum (total {total})")]
    InsufficientPower { power: u64, total: u64 },

    #[error("QC declares voting power {declared} but signers hold {actual}")]
    PowerMismatch { declared: u64, actual: u64 },

    #[error("QC carries {signatures} signatures for {signers} signers")]
    SignatureCountMismatch { signatures: usize, signers: usize },

    #[error("QC signature from signer {index} is invalid")]
    InvalidSignature { index: usize },

    #[error("QC threshold signature is invalid")]
    InvalidThresholdSignature,

    #[error("QC uses threshold signing but no group key is known")]
    MissingGroupKey,

    #[error("genesis QC cannot justify this context")]
    Genesis,
}

/// Aggregated proof that validators holding at least 2/3 of the voting power
/// voted for the same (view, block, phase).
///
/// A QC is the sole evidence that lets the state machine advance phase or
/// commit; it is superseded (and pruned) once a later QC exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuorumCertificate {
    pub view: View,
    pub block_hash: Hash,
    pub phase: Phase,
    pub signature: AggregateSignature,
    pub signers: SignerBitfield,
    pub voting_power: u64,
}

impl QuorumCertificate {
    /// The genesis QC: justifies only the first block after genesis.
    pub fn genesis() -> Self {
        QuorumCertificate {
            view: View::new(0, 0),
            block_hash: Hash::ZERO,
            phase: Phase::Decide,
            signature: AggregateSignature::empty(),
            signers: SignerBitfield::new(0),
            voting_power: 0,
        }
    }

    /// Whether this is the genesis QC.
    pub fn is_genesis(&self) -> bool {
        self.view == View::new(0, 0) && self.block_hash.is_zero()
    }

    /// Whether the declared voting power meets the quorum threshold.
    pub fn has_quorum(&self, total_power: u64) -> bool {
        VotePower::has_quorum(self.voting_power, total_power)
    }

    /// Fully verify this QC against the validator set for its height.
    ///
    /// Checks signer membership, that the signers' combined power matches the
    /// declared power and meets quorum, and that the aggregate signature
    /// verifies over the canonical vote message - individually per signer, or
    /// against the DKG group key for threshold aggregates.
    pub fn verify(
        &self,
        set: &ValidatorSet,
        group_key: Option<&threshold_crypto::PublicKey>,
    ) -> Result<(), QcError> {
        if self.is_genesis() {
            return Err(QcError::Genesis);
        }

        let total = set.total_voting_power();

        let mut actual_power = 0u64;
        for index in self.signers.set_indices() {
            let signer = set
                .at_index(index)
                .ok_or(QcError::UnknownSigner { index })?;
            actual_power += signer.voting_power;
        }

        if actual_power != self.voting_power {
            return Err(QcError::PowerMismatch {
                declared: self.voting_power,
                actual: actual_power,
            });
        }

        if !VotePower::has_quorum(actual_power, total) {
            return Err(QcError::InsufficientPower {
                power: actual_power,
                total,
            });
        }

        let message = consensus_vote_message(self.view, self.phase, &self.block_hash);

        match &self.signature {
            AggregateSignature::Individual(signatures) => {
                let signer_count = self.signers.count();
                if signatures.len() != signer_count {
                    return Err(QcError::SignatureCountMismatch {
                        signatures: signatures.len(),
                        signers: signer_count,
                    });
                }
                for (index, signature) in self.signers.set_indices().zip(signatures) {
                    // Membership was checked above; index is valid.
                    let signer = set.at_index(index).ok_or(QcError::UnknownSigner { index })?;
                    if !signer.public_key.verify(&message, signature) {
                        return Err(QcError::InvalidSignature { index });
                    }
                }
                Ok(())
            }
            AggregateSignature::Threshold(signature) => {
                let key = group_key.ok_or(QcError::MissingGroupKey)?;
                if !key.verify(signature, &message) {
                    return Err(QcError::InvalidThresholdSignature);
                }
                Ok(())
            }
        }
    }
}
