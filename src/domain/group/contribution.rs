//! Per-cycle contribution records.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{GroupId, Timestamp, UserId};
use crate::domain::payment::PaymentReference;

/// Settlement status of one cycle's contribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContributionStatus {
    Pending,
    Paid,
    Overdue,
    Waived,
}

impl ContributionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContributionStatus::Pending => "pending",
            ContributionStatus::Paid => "paid",
            ContributionStatus::Overdue => "overdue",
            ContributionStatus::Waived => "waived",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "paid" => Some(Self::Paid),
            "overdue" => Some(Self::Overdue),
            "waived" => Some(Self::Waived),
            _ => None,
        }
    }
}

/// One cycle's due amount for one member.
///
/// `transaction_ref` back-references the payment that settled it; a
/// contribution already paid with a matching ref is a duplicate signal from
/// the second confirmation channel, not an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contribution {
    pub group_id: GroupId,
    pub user_id: UserId,
    pub cycle_number: u32,
    pub amount: i64,
    pub status: ContributionStatus,
    pub paid_date: Option<Timestamp>,
    pub transaction_ref: Option<PaymentReference>,
}

impl Contribution {
    /// Creates the cycle-1 contribution written as paid on activation.
    pub fn first_cycle_paid(
        group_id: GroupId,
        user_id: UserId,
        amount: i64,
        reference: PaymentReference,
        paid_at: Timestamp,
    ) -> Self {
        Self {
            group_id,
            user_id,
            cycle_number: 1,
            amount,
            status: ContributionStatus::Paid,
            paid_date: Some(paid_at),
            transaction_ref: Some(reference),
        }
    }

    /// True when this contribution was settled by the given payment.
    pub fn settled_by(&self, reference: &PaymentReference) -> bool {
        self.status == ContributionStatus::Paid && self.transaction_ref.as_ref() == Some(reference)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_cycle_contribution_is_paid() {
        let reference = PaymentReference::generate();
        let contribution = Contribution::first_cycle_paid(
            GroupId::new(),
            UserId::new(),
            10_000,
            reference.clone(),
            Timestamp::now(),
        );

        assert_eq!(contribution.cycle_number, 1);
        assert_eq!(contribution.status, ContributionStatus::Paid);
        assert!(contribution.settled_by(&reference));
    }

    #[test]
    fn settled_by_requires_matching_reference() {
        let contribution = Contribution::first_cycle_paid(
            GroupId::new(),
            UserId::new(),
            10_000,
            PaymentReference::generate(),
            Timestamp::now(),
        );

        assert!(!contribution.settled_by(&PaymentReference::generate()));
    }
}
