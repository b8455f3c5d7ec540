use serde::Serialize;
use utoipa::ToSchema;

use crate::leave::error::LeaveError;
use crate::model::role::RequesterRole;

/// Ledger key: one balance per user, role and calendar year.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct BalanceKey {
    pub user_id: u64,
    pub role: RequesterRole,
    pub year: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaveBalance {
    pub key: BalanceKey,
    pub total_leaves: u32,
    pub used_leaves: u32,
}

impl LeaveBalance {
    pub fn new(key: BalanceKey, total_leaves: u32) -> Self {
        Self {
            key,
            total_leaves,
            used_leaves: 0,
        }
    }

    pub fn remaining_leaves(&self) -> u32 {
        self.total_leaves.saturating_sub(self.used_leaves)
    }

    /// Charges `days` against the balance. Leaves the balance untouched on failure.
    pub fn record_approval(&mut self, days: u32) -> Result<(), LeaveError> {
        let remaining = self.remaining_leaves();
        if days > remaining {
            return Err(LeaveError::InsufficientBalance {
                requested: days,
                remaining,
            });
        }
        self.used_leaves += days;
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BalanceSummary {
    #[schema(example = 1000)]
    pub user_id: u64,
    #[schema(example = "tutor", value_type = String)]
    pub role: RequesterRole,
    #[schema(example = 2026)]
    pub year: i32,
    #[schema(example = 12)]
    pub total_leaves: u32,
    #[schema(example = 3)]
    pub used_leaves: u32,
    #[schema(example = 9)]
    pub remaining_leaves: u32,
}

impl From<&LeaveBalance> for BalanceSummary {
    fn from(balance: &LeaveBalance) -> Self {
        Self {
            user_id: balance.key.user_id,
            role: balance.key.role,
            year: balance.key.year,
            total_leaves: balance.total_leaves,
            used_leaves: balance.used_leaves,
            remaining_leaves: balance.remaining_leaves(),
        }
    }
}
