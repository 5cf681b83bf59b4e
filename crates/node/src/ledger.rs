//! In-memory ledger collaborator.
//!
//! Implements the [`Ledger`] trait over plain memory: blocks, per-height
//! state hashes, and actor lifecycle records. Suitable for tests and
//! single-process clusters; a durable store plugs in behind the same trait.

use palisade_core::{ActorStatus, Ledger, LedgerError};
use palisade_types::{Address, Block, Hash, QuorumCertificate, ValidatorSet};
use std::collections::HashMap;
use std::sync::RwLock;

/// Actor lifecycle record.
#[derive(Debug, Clone)]
struct ActorRecord {
    status: ActorStatus,
    pause_height: Option<u64>,
    unstaking_height: Option<u64>,
}

struct Chain {
    /// Committed blocks and their QCs, indexed by height.
    blocks: Vec<(Block, QuorumCertificate)>,
    /// State hash per height.
    state_hashes: Vec<Hash>,
    /// Actor records keyed by address.
    actors: HashMap<Address, ActorRecord>,
}

/// Memory-backed [`Ledger`].
///
/// Writes are serialized per height by construction: `commit` refuses
/// non-sequential heights, and the consensus loop is the only caller.
pub struct InMemoryLedger {
    genesis_set: ValidatorSet,
    chain: RwLock<Chain>,
}

impl InMemoryLedger {
    /// Create a ledger holding only the genesis block, with `genesis_set`
    /// as the height-0 validator set.
    pub fn new(genesis_set: ValidatorSet) -> Self {
        let mut actors = HashMap::new();
        for validator in genesis_set.iter() {
            actors.insert(
                validator.address,
                ActorRecord {
                    status: ActorStatus::Staked,
                    pause_height: None,
                    unstaking_height: None,
                },
            );
        }

        let genesis = Block::genesis();
        let genesis_state = Self::state_hash_after(&Hash::ZERO, &genesis);
        Self {
            genesis_set,
            chain: RwLock::new(Chain {
                blocks: vec![(genesis, QuorumCertificate::genesis())],
                state_hashes: vec![genesis_state],
                actors,
            }),
        }
    }

    /// Mark an actor paused at `height` (operator/plumbing surface).
    pub fn pause_actor(&self, address: Address, height: u64) {
        let mut chain = self.chain.write().unwrap_or_else(|e| e.into_inner());
        if let Some(record) = chain.actors.get_mut(&address) {
            record.status = ActorStatus::Paused;
            record.pause_height = Some(height);
        }
    }

    /// Mark an actor unstaking, completing at `height`.
    pub fn unstake_actor(&self, address: Address, height: u64) {
        let mut chain = self.chain.write().unwrap_or_else(|e| e.into_inner());
        if let Some(record) = chain.actors.get_mut(&address) {
            record.status = ActorStatus::Unstaking;
            record.unstaking_height = Some(height);
        }
    }

    fn state_hash_after(prev: &Hash, block: &Block) -> Hash {
        let mut hasher = blake3::Hasher::new();
        hasher.update(prev.as_bytes());
        hasher.update(block.hash().as_bytes());
        for tx in &block.transactions {
            hasher.update(tx.hash().as_bytes());
        }
        Hash::from_raw(*hasher.finalize().as_bytes())
    }

    /// Shared validation for speculate and commit.
    fn validate(&self, chain: &Chain, block: &Block) -> Result<Hash, LedgerError> {
        let committed = chain.blocks.len() as u64 - 1;
        let height = block.header.height;

        if height != committed + 1 {
            return Err(LedgerError::NonSequentialCommit {
                committed,
                attempted: height,
            });
        }

        let (tip, _) = &chain.blocks[committed as usize];
        if block.header.parent_hash != tip.hash() {
            return Err(LedgerError::InvalidBlock {
                height,
                reason: format!(
                    "parent {} does not match tip {}",
                    block.header.parent_hash,
                    tip.hash()
                ),
            });
        }

        for tx in &block.transactions {
            if tx.payload.is_empty() {
                return Err(LedgerError::InvalidTransaction(
                    "empty transaction payload".to_string(),
                ));
            }
        }

        let prev_state = chain.state_hashes[committed as usize];
        Ok(Self::state_hash_after(&prev_state, block))
    }
}

impl Ledger for InMemoryLedger {
    fn speculate(&self, block: &Block) -> Result<Hash, LedgerError> {
        let chain = self.chain.read().unwrap_or_else(|e| e.into_inner());
        self.validate(&chain, block)
    }

    fn commit(&self, block: &Block, qc: &QuorumCertificate) -> Result<Hash, LedgerError> {
        let mut chain = self.chain.write().unwrap_or_else(|e| e.into_inner());
        let state_hash = self.validate(&chain, block)?;
        chain.blocks.push((block.clone(), qc.clone()));
        chain.state_hashes.push(state_hash);
        Ok(state_hash)
    }

    fn committed_height(&self) -> u64 {
        let chain = self.chain.read().unwrap_or_else(|e| e.into_inner());
        chain.blocks.len() as u64 - 1
    }

    fn committed_hash(&self) -> Hash {
        let chain = self.chain.read().unwrap_or_else(|e| e.into_inner());
        chain.blocks.last().map(|(b, _)| b.hash()).unwrap_or(Hash::ZERO)
    }

    fn block(&self, height: u64) -> Option<(Block, QuorumCertificate)> {
        let chain = self.chain.read().unwrap_or_else(|e| e.into_inner());
        chain.blocks.get(height as usize).cloned()
    }

    fn validator_set(&self, _height: u64) -> ValidatorSet {
        // Set mutations ride on committed blocks through the staking
        // pipeline, which lives outside this crate; every height snapshot
        // is the genesis set here.
        self.genesis_set.clone()
    }

    fn reset_to_genesis(&self) {
        let mut chain = self.chain.write().unwrap_or_else(|e| e.into_inner());
        chain.blocks.truncate(1);
        chain.state_hashes.truncate(1);
    }

    fn actor_exists(&self, address: &Address, _height: u64) -> bool {
        let chain = self.chain.read().unwrap_or_else(|e| e.into_inner());
        chain.actors.contains_key(address)
    }

    fn actor_status(&self, address: &Address, _height: u64) -> Option<ActorStatus> {
        let chain = self.chain.read().unwrap_or_else(|e| e.into_inner());
        chain.actors.get(address).map(|r| r.status)
    }

    fn pause_height(&self, address: &Address, _height: u64) -> Option<u64> {
        let chain = self.chain.read().unwrap_or_else(|e| e.into_inner());
        chain.actors.get(address).and_then(|r| r.pause_height)
    }

    fn unstaking_height(&self, address: &Address, _height: u64) -> Option<u64> {
        let chain = self.chain.read().unwrap_or_else(|e| e.into_inner());
        chain.actors.get(address).and_then(|r| r.unstaking_height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use palisade_types::test_utils::test_validator_set;
    use palisade_types::BlockHeader;

    fn next_block(ledger: &InMemoryLedger, proposer: Address) -> Block {
        Block {
            header: BlockHeader {
                height: ledger.committed_height() + 1,
                round: 0,
                proposer,
                parent_hash: ledger.committed_hash(),
                timestamp_ms: 0,
            },
            justify_qc: QuorumCertificate::genesis(),
            transactions: vec![],
        }
    }

    #[test]
    fn test_commit_advances_chain() {
        let (set, keys) = test_validator_set(4);
        let ledger = InMemoryLedger::new(set);
        assert_eq!(ledger.committed_height(), 0);

        let block = next_block(&ledger, keys[0].address());
        let speculated = ledger.speculate(&block).unwrap();
        let committed = ledger
            .commit(&block, &QuorumCertificate::genesis())
            .unwrap();
        assert_eq!(speculated, committed);
        assert_eq!(ledger.committed_height(), 1);
        assert_eq!(ledger.committed_hash(), block.hash());
    }

    #[test]
    fn test_non_sequential_commit_is_refused() {
        let (set, keys) = test_validator_set(4);
        let ledger = InMemoryLedger::new(set);
        let mut block = next_block(&ledger, keys[0].address());
        block.header.height = 5;
        assert!(matches!(
            ledger.commit(&block, &QuorumCertificate::genesis()),
            Err(LedgerError::NonSequentialCommit { .. })
        ));
    }

    #[test]
    fn test_wrong_parent_is_refused() {
        let (set, keys) = test_validator_set(4);
        let ledger = InMemoryLedger::new(set);
        let mut block = next_block(&ledger, keys[0].address());
        block.header.parent_hash = Hash::digest(b"elsewhere");
        assert!(matches!(
            ledger.speculate(&block),
            Err(LedgerError::InvalidBlock { .. })
        ));
    }

    #[test]
    fn test_empty_transaction_is_refused() {
        let (set, keys) = test_validator_set(4);
        let ledger = InMemoryLedger::new(set);
        let mut block = next_block(&ledger, keys[0].address());
        block
            .transactions
            .push(palisade_types::Transaction::new(vec![]));
        assert!(matches!(
            ledger.speculate(&block),
            Err(LedgerError::InvalidTransaction(_))
        ));
    }

    #[test]
    fn test_reset_to_genesis() {
        let (set, keys) = test_validator_set(4);
        let ledger = InMemoryLedger::new(set);
        let block = next_block(&ledger, keys[0].address());
        ledger.commit(&block, &QuorumCertificate::genesis()).unwrap();

        ledger.reset_to_genesis();
        assert_eq!(ledger.committed_height(), 0);
        assert_eq!(ledger.committed_hash(), Block::genesis().hash());
    }

    #[test]
    fn test_actor_lifecycle_queries() {
        let (set, keys) = test_validator_set(4);
        let addr = keys[1].address();
        let ledger = InMemoryLedger::new(set);

        assert!(ledger.actor_exists(&addr, 0));
        assert_eq!(ledger.actor_status(&addr, 0), Some(ActorStatus::Staked));
        assert_eq!(ledger.pause_height(&addr, 0), None);

        ledger.pause_actor(addr, 7);
        assert_eq!(ledger.actor_status(&addr, 7), Some(ActorStatus::Paused));
        assert_eq!(ledger.pause_height(&addr, 7), Some(7));

        ledger.unstake_actor(addr, 9);
        assert_eq!(ledger.unstaking_height(&addr, 9), Some(9));

        let stranger = palisade_types::KeyPair::from_seed([0x77; 32]).address();
        assert!(!ledger.actor_exists(&stranger, 0));
        assert_eq!(ledger.actor_status(&stranger, 0), None);
    }
}
