//! Vote aggregation for one (view, phase) slot.

use palisade_types::{Address, Hash, Phase, View, VotePower, Vote};
use std::collections::{BTreeMap, HashMap};

/// Result of adding a vote to a [`VoteSet`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VoteOutcome {
    /// The vote was counted.
    Added,
    /// The voter already voted for this block; nothing changed.
    Duplicate,
    /// The voter already voted for a different block at this slot.
    /// Equivocation evidence; the new vote is not counted.
    Equivocation { first: Hash },
}

/// Buffers votes for one (view, phase) until quorum is reached.
///
/// Votes are grouped per block hash - an equivocating leader can put two
/// blocks in play, and only one may reach quorum. Iteration order over
/// voters is address-ascending, which matches validator-set index order, so
/// aggregate signatures line up with the signer bitfield.
#[derive(Debug)]
pub struct VoteSet {
    view: View,
    phase: Phase,
    votes_by_block: BTreeMap<Hash, BTreeMap<Address, Vote>>,
    power_by_block: BTreeMap<Hash, u64>,
    voter_choice: HashMap<Address, Hash>,
}

impl VoteSet {
    /// Create an empty vote set for a slot.
    pub fn new(view: View, phase: Phase) -> Self {
        Self {
            view,
            phase,
            votes_by_block: BTreeMap::new(),
            power_by_block: BTreeMap::new(),
            voter_choice: HashMap::new(),
        }
    }

    /// The slot this set aggregates.
    pub fn slot(&self) -> (View, Phase) {
        (self.view, self.phase)
    }

    /// Add a vote carrying `power`. Duplicate votes are idempotent; a
    /// conflicting vote from a known voter is flagged, not counted.
    pub fn add_vote(&mut self, vote: Vote, power: u64) -> VoteOutcome {
        debug_assert_eq!(vote.slot(), (self.view, self.phase));

        if let Some(&first) = self.voter_choice.get(&vote.voter) {
            if first == vote.block_hash {
                return VoteOutcome::Duplicate;
            }
            return VoteOutcome::Equivocation { first };
        }

        self.voter_choice.insert(vote.voter, vote.block_hash);
        *self.power_by_block.entry(vote.block_hash).or_insert(0) += power;
        self.votes_by_block
            .entry(vote.block_hash)
            .or_default()
            .insert(vote.voter, vote);
        VoteOutcome::Added
    }

    /// The block that reached quorum against `total_power`, if any.
    pub fn check_quorum(&self, total_power: u64) -> Option<Hash> {
        self.power_by_block
            .iter()
            .find(|(_, &power)| VotePower::has_quorum(power, total_power))
            .map(|(&hash, _)| hash)
    }

    /// Accumulated power for one block.
    pub fn power_for(&self, block_hash: &Hash) -> u64 {
        self.power_by_block.get(block_hash).copied().unwrap_or(0)
    }

    /// Votes for one block, in voter-address (= set index) order.
    pub fn votes_for(&self, block_hash: &Hash) -> impl Iterator<Item = &Vote> {
        self.votes_by_block
            .get(block_hash)
            .into_iter()
            .flat_map(|votes| votes.values())
    }

    /// Number of distinct voters counted.
    pub fn voter_count(&self) -> usize {
        self.voter_choice.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use palisade_types::{KeyPair, VoteSignature};

    fn vote(seed: u8, block: &[u8]) -> Vote {
        let key = KeyPair::from_seed([seed; 32]);
        Vote {
            view: View::new(1, 0),
            block_hash: Hash::digest(block),
            phase: Phase::Prepare,
            voter: key.address(),
            signature: VoteSignature::Ed25519(key.sign(b"test")),
        }
    }

    #[test]
    fn test_quorum_is_reached_at_two_thirds() {
        let mut set = VoteSet::new(View::new(1, 0), Phase::Prepare);
        assert_eq!(set.add_vote(vote(1, b"a"), 1), VoteOutcome::Added);
        assert_eq!(set.check_quorum(3), None);
        assert_eq!(set.add_vote(vote(2, b"a"), 1), VoteOutcome::Added);
        assert_eq!(set.check_quorum(3), Some(Hash::digest(b"a")));
    }

    #[test]
    fn test_duplicate_vote_changes_nothing() {
        let mut set = VoteSet::new(View::new(1, 0), Phase::Prepare);
        set.add_vote(vote(1, b"a"), 1);
        let power_before = set.power_for(&Hash::digest(b"a"));

        assert_eq!(set.add_vote(vote(1, b"a"), 1), VoteOutcome::Duplicate);
        assert_eq!(set.power_for(&Hash::digest(b"a")), power_before);
        assert_eq!(set.voter_count(), 1);
    }

    #[test]
    fn test_equivocation_is_flagged_and_not_counted() {
        let mut set = VoteSet::new(View::new(1, 0), Phase::Prepare);
        set.add_vote(vote(1, b"a"), 1);

        let outcome = set.add_vote(vote(1, b"b"), 1);
        assert_eq!(
            outcome,
            VoteOutcome::Equivocation {
                first: Hash::digest(b"a")
            }
        );
        // The conflicting vote added no power anywhere.
        assert_eq!(set.power_for(&Hash::digest(b"b")), 0);
    }

    #[test]
    fn test_split_votes_only_one_block_reaches_quorum() {
        let mut set = VoteSet::new(View::new(1, 0), Phase::Prepare);
        set.add_vote(vote(1, b"a"), 1);
        set.add_vote(vote(2, b"b"), 1);
        set.add_vote(vote(3, b"a"), 1);
        set.add_vote(vote(4, b"a"), 1);
        // 3 of 4 power on "a": quorum; "b" can never reach it.
        assert_eq!(set.check_quorum(4), Some(Hash::digest(b"a")));
    }

    #[test]
    fn test_votes_for_is_address_ordered() {
        let mut set = VoteSet::new(View::new(1, 0), Phase::Prepare);
        for seed in [3u8, 1, 2] {
            set.add_vote(vote(seed, b"a"), 1);
        }
        let voters: Vec<Address> = set
            .votes_for(&Hash::digest(b"a"))
            .map(|v| v.voter)
            .collect();
        let mut sorted = voters.clone();
        sorted.sort();
        assert_eq!(voters, sorted);
    }
}
