//! Cryptographic keys and signatures.
//!
//! Two signing modes coexist:
//!
//! - **Individual**: every validator signs with its own Ed25519 key. Quorum
//!   certificates carry the constituent signatures. This is the startup mode
//!   and the fallback when no DKG ceremony has succeeded.
//! - **Threshold**: after a successful DKG ceremony, validators sign with
//!   their secret key share and the aggregator combines shares into a single
//!   group signature verifiable against the group public key.

use ed25519_dalek::{Signer, Verifier};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::Address;

/// An Ed25519 signature.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature(Vec<u8>);

impl Signature {
    /// Wrap raw signature bytes.
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Signature(bytes)
    }

    /// The raw signature bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// An all-zero placeholder signature (test fixtures, genesis QC).
    pub fn zero() -> Self {
        Signature(vec![0u8; 64])
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sig:{}", &hex::encode(&self.0)[..8.min(self.0.len() * 2)])
    }
}

/// An Ed25519 public key.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PublicKey([u8; 32]);

impl PublicKey {
    /// Wrap raw key bytes.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        PublicKey(bytes)
    }

    /// The raw key bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Verify `signature` over `message`.
    ///
    /// Returns false for malformed keys or signatures rather than erroring:
    /// a bad signature from the network is a protocol violation, not a local
    /// fault.
    pub fn verify(&self, message: &[u8], signature: &Signature) -> bool {
        let Ok(key) = ed25519_dalek::VerifyingKey::from_bytes(&self.0) else {
            return false;
        };
        let Ok(sig_bytes) = <[u8; 64]>::try_from(signature.as_bytes()) else {
            return false;
        };
        let sig = ed25519_dalek::Signature::from_bytes(&sig_bytes);
        key.verify(message, &sig).is_ok()
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pk:{}", &hex::encode(self.0)[..8])
    }
}

/// An Ed25519 signing keypair.
#[derive(Clone)]
pub struct KeyPair {
    signing_key: ed25519_dalek::SigningKey,
}

impl KeyPair {
    /// Generate a fresh keypair from the OS RNG.
    pub fn generate() -> Self {
        let mut rng = rand::rngs::OsRng;
        KeyPair {
            signing_key: ed25519_dalek::SigningKey::generate(&mut rng),
        }
    }

    /// Deterministically derive a keypair from a 32-byte seed.
    pub fn from_seed(seed: [u8; 32]) -> Self {
        KeyPair {
            signing_key: ed25519_dalek::SigningKey::from_bytes(&seed),
        }
    }

    /// Sign a message.
    pub fn sign(&self, message: &[u8]) -> Signature {
        let sig = self.signing_key.sign(message);
        Signature(sig.to_bytes().to_vec())
    }

    /// The corresponding public key.
    pub fn public_key(&self) -> PublicKey {
        PublicKey(self.signing_key.verifying_key().to_bytes())
    }

    /// The address derived from the public key.
    pub fn address(&self) -> Address {
        Address::from_public_key(&self.public_key())
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Never print the secret half.
        f.debug_struct("KeyPair")
            .field("public_key", &self.public_key())
            .finish()
    }
}

/// A vote's partial signature, tagged by signing mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum VoteSignature {
    /// Individual Ed25519 signature over the vote message.
    Ed25519(Signature),
    /// Threshold signature share over the vote message.
    Share(threshold_crypto::SignatureShare),
}

/// The aggregate signature of a quorum certificate, tagged by mode so
/// verifiers need no out-of-band flag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AggregateSignature {
    /// Constituent Ed25519 signatures, in signer-set index order.
    Individual(Vec<Signature>),
    /// Combined threshold signature, verifiable against the DKG group key.
    Threshold(threshold_crypto::Signature),
}

impl AggregateSignature {
    /// Empty individual aggregate (genesis QC).
    pub fn empty() -> Self {
        AggregateSignature::Individual(Vec::new())
    }
}
