//! Per-pool depositor records

use prizevault_common::{ReceiverId, Timestamp, UFix64};
use serde::Serialize;

/// Registration data for one receiver; share balances live in the
/// [`ShareVault`](super::ShareVault).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Receiver {
    pub id: ReceiverId,
    pub registered_at: Timestamp,
    /// Sponsors earn rewards but never enter a draw
    pub is_sponsor: bool,
    pub lifetime_prizes: UFix64,
    /// Extra lottery weight added to the share balance
    pub bonus_weight: UFix64,
    pub bonus_reason: Option<String>,
}

impl Receiver {
    pub fn new(id: ReceiverId, registered_at: Timestamp, is_sponsor: bool) -> Self {
        Self {
            id,
            registered_at,
            is_sponsor,
            lifetime_prizes: UFix64::ZERO,
            bonus_weight: UFix64::ZERO,
            bonus_reason: None,
        }
    }

    /// Balance the TWAB tracker sees for this receiver
    pub fn effective_balance(&self, shares: UFix64) -> UFix64 {
        if self.is_sponsor {
            UFix64::ZERO
        } else {
            shares.saturating_add(self.bonus_weight)
        }
    }
}

/// Read model returned by `Pool::receiver_info`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReceiverInfo {
    pub receiver: ReceiverId,
    pub shares: UFix64,
    /// Current asset value of the shares
    pub balance: UFix64,
    pub bonus_weight: UFix64,
    pub is_sponsor: bool,
    pub registered_at: Timestamp,
    pub lifetime_prizes: UFix64,
    /// Weight accrued in the current round so far
    pub current_weight: u128,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effective_balance() {
        let mut depositor = Receiver::new(1, 0, false);
        depositor.bonus_weight = UFix64::from_int(5);
        assert_eq!(depositor.effective_balance(UFix64::from_int(10)), UFix64::from_int(15));

        let sponsor = Receiver::new(2, 0, true);
        assert_eq!(sponsor.effective_balance(UFix64::from_int(10)), UFix64::ZERO);
    }
}
