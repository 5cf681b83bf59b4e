//! Validator set snapshots.

use crate::{Address, PublicKey};
use serde::{Deserialize, Serialize};

/// One validator's entry in a height's validator set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatorInfo {
    pub address: Address,
    pub public_key: PublicKey,
    pub voting_power: u64,
    /// Dial address for the validator's service endpoint.
    pub service_url: String,
}

/// The ordered validator set for one height.
///
/// Validators are kept sorted by address so every replica agrees on index
/// assignment (signer bitfields, DKG share indices, leader slots). Snapshots
/// are produced by the ledger when committed blocks change the set; the
/// consensus core never mutates one in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatorSet {
    validators: Vec<ValidatorInfo>,
}

impl ValidatorSet {
    /// Build a set, sorting by address and dropping zero-power entries.
    pub fn new(mut validators: Vec<ValidatorInfo>) -> Self {
        validators.retain(|v| v.voting_power > 0);
        validators.sort_by_key(|v| v.address);
        validators.dedup_by_key(|v| v.address);
        ValidatorSet { validators }
    }

    /// Number of validators.
    pub fn len(&self) -> usize {
        self.validators.len()
    }

    /// True if the set is empty.
    pub fn is_empty(&self) -> bool {
        self.validators.is_empty()
    }

    /// Sum of all voting power.
    pub fn total_voting_power(&self) -> u64 {
        self.validators.iter().map(|v| v.voting_power).sum()
    }

    /// Look up a validator by address.
    pub fn get(&self, address: &Address) -> Option<&ValidatorInfo> {
        self.index_of(address).map(|i| &self.validators[i])
    }

    /// The set index of an address, if present.
    pub fn index_of(&self, address: &Address) -> Option<usize> {
        self.validators
            .binary_search_by_key(address, |v| v.address)
            .ok()
    }

    /// The validator at a set index.
    pub fn at_index(&self, index: usize) -> Option<&ValidatorInfo> {
        self.validators.get(index)
    }

    /// Whether the address is a member.
    pub fn contains(&self, address: &Address) -> bool {
        self.index_of(address).is_some()
    }

    /// Voting power of an address (0 if absent).
    pub fn voting_power_of(&self, address: &Address) -> u64 {
        self.get(address).map(|v| v.voting_power).unwrap_or(0)
    }

    /// Iterate validators in set order.
    pub fn iter(&self) -> impl Iterator<Item = &ValidatorInfo> {
        self.validators.iter()
    }

    /// All member addresses in set order.
    pub fn addresses(&self) -> Vec<Address> {
        self.validators.iter().map(|v| v.address).collect()
    }
}

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils {
    use super::*;
    use crate::KeyPair;

    /// A deterministic validator set of `n` equal-weight validators, with
    /// their keypairs, ordered to match the set's index assignment.
    pub fn test_validator_set(n: usize) -> (ValidatorSet, Vec<KeyPair>) {
        test_weighted_validator_set(&vec![1u64; n])
    }

    /// Like [`test_validator_set`] but with explicit voting powers.
    pub fn test_weighted_validator_set(powers: &[u64]) -> (ValidatorSet, Vec<KeyPair>) {
        let mut keys: Vec<KeyPair> = (0..powers.len())
            .map(|i| {
                let mut seed = [0u8; 32];
                seed[0] = i as u8 + 1;
                KeyPair::from_seed(seed)
            })
            .collect();

        let infos: Vec<ValidatorInfo> = keys
            .iter()
            .zip(powers)
            .map(|(k, &power)| ValidatorInfo {
                address: k.address(),
                public_key: k.public_key(),
                voting_power: power,
                service_url: String::new(),
            })
            .collect();
        let set = ValidatorSet::new(infos);

        // Reorder the keypairs to match the address-sorted set indices.
        keys.sort_by_key(|k| k.address());
        (set, keys)
    }
}

#[cfg(test)]
mod tests {
    use super::test_utils::*;
    use super::*;
    use crate::KeyPair;

    #[test]
    fn test_index_assignment_is_address_ordered() {
        let (set, keys) = test_validator_set(4);
        for (i, key) in keys.iter().enumerate() {
            assert_eq!(set.index_of(&key.address()), Some(i));
            assert_eq!(set.at_index(i).unwrap().address, key.address());
        }
    }

    #[test]
    fn test_total_voting_power() {
        let (set, _) = test_weighted_validator_set(&[3, 1, 5]);
        assert_eq!(set.total_voting_power(), 9);
    }

    #[test]
    fn test_zero_power_entries_are_dropped() {
        let (set, _) = test_weighted_validator_set(&[1, 0, 2]);
        assert_eq!(set.len(), 2);
        assert_eq!(set.total_voting_power(), 3);
    }

    #[test]
    fn test_unknown_address_has_no_power() {
        let (set, _) = test_validator_set(2);
        let stranger = KeyPair::from_seed([0xAA; 32]).address();
        assert_eq!(set.voting_power_of(&stranger), 0);
        assert!(!set.contains(&stranger));
    }
}
