//! Savings group aggregate.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{GroupId, Timestamp, UserId};

/// A rotating savings group.
///
/// `current_member_count` must always equal the number of active
/// memberships; it is maintained by exactly one mechanism, the atomic slot
/// claim in the group store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Group {
    pub id: GroupId,
    pub name: String,
    pub created_by: UserId,

    /// Number of payout slots (and therefore the target member count).
    pub member_target: u32,

    /// Per-cycle contribution in the minor currency unit.
    pub contribution_amount: i64,
    pub currency: String,

    pub current_member_count: u32,
    pub created_at: Timestamp,
}

impl Group {
    /// True when every payout slot is claimed.
    pub fn is_full(&self) -> bool {
        self.current_member_count >= self.member_target
    }

    /// True when `position` is a valid payout slot for this group.
    pub fn has_slot(&self, position: u32) -> bool {
        (1..=self.member_target).contains(&position)
    }
}
