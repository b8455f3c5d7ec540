use std::collections::HashMap;

use crate::model::role::RequesterRole;

pub const DEFAULT_ANNUAL_ALLOWANCE: u32 = 12;

#[derive(Debug, Clone)]
pub struct LeavePolicy {
    pub default_allowance: u32,
    /// Per-role overrides of `default_allowance`.
    pub allowances: HashMap<RequesterRole, u32>,
    pub allow_backdated: bool,
}

impl Default for LeavePolicy {
    fn default() -> Self {
        Self {
            default_allowance: DEFAULT_ANNUAL_ALLOWANCE,
            allowances: HashMap::new(),
            allow_backdated: false,
        }
    }
}

impl LeavePolicy {
    pub fn allowance(&self, role: RequesterRole) -> u32 {
        self.allowances
            .get(&role)
            .copied()
            .unwrap_or(self.default_allowance)
    }
}
