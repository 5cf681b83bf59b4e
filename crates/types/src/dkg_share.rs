//! DKG share messages.

use crate::Address;
use serde::{Deserialize, Serialize};
use threshold_crypto::poly::Commitment;

/// One dealer's contribution to a DKG ceremony, addressed to one recipient.
///
/// The dealer samples a secret polynomial, broadcasts its public
/// `commitment`, and sends each participant the polynomial's evaluation at
/// that participant's index. The recipient verifies the evaluation against
/// the commitment before accepting it; a share that fails the check is
/// rejected with the dealer's address logged.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DkgShare {
    /// Ceremony identifier; shares from other ceremonies are ignored.
    pub session: u64,
    pub dealer: Address,
    pub recipient: Address,
    /// Public commitment to the dealer's secret polynomial.
    pub commitment: Commitment,
    /// The dealer's polynomial evaluated at the recipient's share index,
    /// serialized field element.
    pub share: Vec<u8>,
}
