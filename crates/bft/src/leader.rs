//! Per-view leader election.

use palisade_types::{Address, ValidatorSet};

/// Domain tag mixed into the leader-selection seed.
const LEADER_SEED_DOMAIN: &[u8] = b"palisade/leader:";

/// The designated proposer for `(height, round)` under `set`.
///
/// A pure function of its inputs: identical inputs produce the identical
/// leader on every honest replica, so proposal attribution is verifiable
/// without additional communication. Selection is stake-weighted - a blake3
/// seed over the view picks a slot in the cumulative voting-power range, so
/// each validator leads in proportion to its power over many views.
///
/// Returns `None` only for an empty validator set.
pub fn leader_for(height: u64, round: u64, set: &ValidatorSet) -> Option<Address> {
    if set.is_empty() {
        return None;
    }
    let total = set.total_voting_power();
    if total == 0 {
        return None;
    }

    let mut hasher = blake3::Hasher::new();
    hasher.update(LEADER_SEED_DOMAIN);
    hasher.update(&height.to_le_bytes());
    hasher.update(&round.to_le_bytes());
    let digest = hasher.finalize();

    let mut seed_bytes = [0u8; 8];
    seed_bytes.copy_from_slice(&digest.as_bytes()[..8]);
    let slot = u64::from_le_bytes(seed_bytes) % total;

    let mut acc = 0u64;
    for validator in set.iter() {
        acc += validator.voting_power;
        if slot < acc {
            return Some(validator.address);
        }
    }

    // total > 0 guarantees the loop returned.
    None
}
