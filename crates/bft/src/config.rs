//! Consensus configuration.

use std::time::Duration;

/// Tunable consensus parameters.
///
/// Tie-break and retry constants are configuration, not protocol
/// invariants.
#[derive(Debug, Clone)]
pub struct BftConfig {
    /// Base view timeout before the pacemaker forces a round advance.
    pub base_view_timeout: Duration,

    /// Cap for the pacemaker's exponential backoff: the timeout doubles per
    /// round at the same height up to `base * 2^max_backoff_exponent`.
    pub max_backoff_exponent: u32,

    /// Maximum transactions pulled from the mempool into one proposal.
    pub max_transactions_per_block: usize,

    /// How far beyond `committed + 1` a referenced height may lie before a
    /// state-sync session is started.
    pub sync_gap_tolerance: u64,
}

impl Default for BftConfig {
    fn default() -> Self {
        Self {
            base_view_timeout: Duration::from_secs(5),
            max_backoff_exponent: 6,
            max_transactions_per_block: 100,
            sync_gap_tolerance: 0,
        }
    }
}
