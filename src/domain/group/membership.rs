//! Group membership aggregate.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{GroupId, Timestamp, UserId};

/// Participation status of a member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MembershipStatus {
    PendingPayment,
    Active,
    Suspended,
    Removed,
}

impl MembershipStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MembershipStatus::PendingPayment => "pending_payment",
            MembershipStatus::Active => "active",
            MembershipStatus::Suspended => "suspended",
            MembershipStatus::Removed => "removed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending_payment" => Some(Self::PendingPayment),
            "active" => Some(Self::Active),
            "suspended" => Some(Self::Suspended),
            "removed" => Some(Self::Removed),
            _ => None,
        }
    }
}

/// One user's participation in one group.
///
/// (group_id, user_id) is unique, as is (group_id, position). A membership
/// becomes active with `deposit_paid=true` only through processing exactly
/// one successful payment record; it is never created speculatively before
/// the payment is confirmed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Membership {
    pub group_id: GroupId,
    pub user_id: UserId,

    /// Assigned payout slot, 1..=member_target, unique within the group.
    pub position: u32,

    pub status: MembershipStatus,
    pub deposit_paid: bool,
    pub deposit_paid_at: Option<Timestamp>,
    pub joined_at: Timestamp,
}

impl Membership {
    /// Creates the active membership row written by the slot claim.
    pub fn activated(
        group_id: GroupId,
        user_id: UserId,
        position: u32,
        paid_at: Timestamp,
    ) -> Self {
        Self {
            group_id,
            user_id,
            position,
            status: MembershipStatus::Active,
            deposit_paid: true,
            deposit_paid_at: Some(paid_at),
            joined_at: paid_at,
        }
    }

    /// True when the member participates in payouts.
    pub fn is_active(&self) -> bool {
        self.status == MembershipStatus::Active
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn activated_membership_has_deposit_paid() {
        let paid_at = Timestamp::now();
        let membership = Membership::activated(GroupId::new(), UserId::new(), 2, paid_at);

        assert!(membership.is_active());
        assert!(membership.deposit_paid);
        assert_eq!(membership.deposit_paid_at, Some(paid_at));
        assert_eq!(membership.position, 2);
    }

    #[test]
    fn status_string_roundtrip() {
        for status in [
            MembershipStatus::PendingPayment,
            MembershipStatus::Active,
            MembershipStatus::Suspended,
            MembershipStatus::Removed,
        ] {
            assert_eq!(MembershipStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(MembershipStatus::parse("banned"), None);
    }
}
