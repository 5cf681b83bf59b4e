//! Distributed key generation.
//!
//! Runs a multi-dealer threshold key-generation ceremony among the validator
//! set. Every participant deals a random secret polynomial: it broadcasts
//! the polynomial's public commitment and sends each peer the evaluation at
//! that peer's share index. Shares are verified against the dealer's
//! commitment before being accepted. Once every dealer's contribution is
//! verified, the sums of the shares and of the commitments yield this node's
//! secret key share and the group public key set - no single party ever
//! learns the group secret.
//!
//! Exactly one ceremony is active at a time; triggering a second one while
//! one is in flight is rejected, not queued. A ceremony that misses its
//! deadline fails and is reported; consensus then keeps (or falls back to)
//! individual-signature aggregation until a later ceremony succeeds, so key
//! generation never blocks block production.

mod state;

pub use state::{DkgError, DkgOutcome, DkgPhase, DkgState};
