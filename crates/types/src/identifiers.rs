//! Identifier newtypes.

use crate::PublicKey;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::hash::HexError;

/// A validator address: the first 20 bytes of the blake3 hash of the
/// validator's public key.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Address(pub [u8; 20]);

impl Address {
    /// Derive the address for a public key.
    pub fn from_public_key(public_key: &PublicKey) -> Self {
        let digest = blake3::hash(public_key.as_bytes());
        let mut out = [0u8; 20];
        out.copy_from_slice(&digest.as_bytes()[..20]);
        Address(out)
    }

    /// The raw address bytes.
    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", &hex::encode(self.0)[..8])
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl FromStr for Address {
    type Err = HexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s).map_err(|e| HexError::InvalidHex(e.to_string()))?;
        if bytes.len() != 20 {
            return Err(HexError::WrongLength(bytes.len()));
        }
        let mut out = [0u8; 20];
        out.copy_from_slice(&bytes);
        Ok(Address(out))
    }
}

/// Voting power arithmetic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VotePower(pub u64);

impl VotePower {
    /// Check whether `power` meets the BFT quorum threshold against `total`.
    ///
    /// A set of signers representing exactly two thirds of the total voting
    /// power is sufficient: `power * 3 >= total * 2`.
    pub fn has_quorum(power: u64, total: u64) -> bool {
        total > 0 && power.saturating_mul(3) >= total.saturating_mul(2)
    }

    /// The minimum voting power that satisfies the quorum threshold.
    pub fn quorum_threshold(total: u64) -> u64 {
        total.saturating_mul(2).div_ceil(3)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::KeyPair;

    #[test]
    fn test_address_derivation_is_stable() {
        let key = KeyPair::from_seed([7u8; 32]);
        let a = Address::from_public_key(&key.public_key());
        let b = Address::from_public_key(&key.public_key());
        assert_eq!(a, b);
    }

    #[test]
    fn test_address_hex_round_trip() {
        let key = KeyPair::from_seed([9u8; 32]);
        let addr = key.address();
        let parsed: Address = addr.to_string().parse().unwrap();
        assert_eq!(addr, parsed);
    }

    #[test]
    fn test_quorum_at_exactly_two_thirds() {
        // 6 of 9 is exactly 2/3 and must pass.
        assert!(VotePower::has_quorum(6, 9));
        // One short of the threshold must fail.
        assert!(!VotePower::has_quorum(5, 9));
        // Unequal weights: 66/100 falls short, 67/100 passes.
        assert!(!VotePower::has_quorum(66, 100));
        assert!(VotePower::has_quorum(67, 100));
    }

    #[test]
    fn test_quorum_threshold_value() {
        assert_eq!(VotePower::quorum_threshold(9), 6);
        assert_eq!(VotePower::quorum_threshold(100), 67);
        assert!(VotePower::has_quorum(VotePower::quorum_threshold(100), 100));
    }

    #[test]
    fn test_zero_total_never_has_quorum() {
        assert!(!VotePower::has_quorum(0, 0));
    }
}
