//! Group store port: the atomic primitives membership activation relies on.
//!
//! Every write that establishes "this payment has been activated" is a
//! single conditional operation here — a unique-constraint insert or a
//! compare-and-swap update — never a read-decide-write across two round
//! trips. The datastore's constraints are the only durable concurrency
//! guard; in-process locks do not hold across independent instances.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, GroupId, Timestamp, UserId};
use crate::domain::group::{Group, LedgerEntry, Membership};
use crate::domain::payment::PaymentReference;

/// Outcome of an atomic payout-slot claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotClaim {
    /// This call created the membership and incremented the member count.
    Claimed { position: u32 },
    /// A membership for (group, user) already existed; nothing was written.
    AlreadyMember { position: u32 },
    /// No free slot remained.
    GroupFull,
}

/// Outcome of settling a cycle contribution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContributionUpdate {
    /// This call marked the contribution paid.
    Updated,
    /// Already paid by the same payment; duplicate signal, not an error.
    AlreadyPaid,
    /// Already paid, but by a different payment.
    PaidWithDifferentRef,
    /// No contribution row exists for that cycle.
    NotFound,
}

/// Outcome of the security-deposit compare-and-swap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DepositUpdate {
    /// This call flipped `deposit_paid` to true.
    Updated,
    /// Deposit was already paid; no mutation.
    AlreadyPaid,
    /// No membership row exists.
    NotFound,
}

/// Port for group, membership, contribution, and ledger persistence.
#[async_trait]
pub trait GroupStore: Send + Sync {
    async fn find_group(&self, group_id: &GroupId) -> Result<Option<Group>, DomainError>;

    async fn find_membership(
        &self,
        group_id: &GroupId,
        user_id: &UserId,
    ) -> Result<Option<Membership>, DomainError>;

    /// True when an approved join request exists for (group, user).
    async fn has_approved_join_request(
        &self,
        group_id: &GroupId,
        user_id: &UserId,
    ) -> Result<bool, DomainError>;

    /// Atomically claims a payout slot and activates the membership.
    ///
    /// Assigns the preferred slot if it is still free at the moment of the
    /// claim, otherwise the lowest-numbered free slot. The membership insert
    /// and the group member-count increment are one atomic operation; a
    /// concurrent duplicate claim for the same (group, user) observes
    /// `AlreadyMember` with the winner's position.
    async fn claim_slot(
        &self,
        group_id: &GroupId,
        user_id: &UserId,
        preferred_slot: Option<u32>,
        paid_at: Timestamp,
    ) -> Result<SlotClaim, DomainError>;

    /// Records the cycle-1 contribution as paid, if not already present.
    ///
    /// Returns `true` if this call inserted the row, `false` if a cycle-1
    /// contribution for (group, user) already existed.
    async fn record_first_contribution(
        &self,
        group_id: &GroupId,
        user_id: &UserId,
        amount: i64,
        reference: &PaymentReference,
        paid_at: Timestamp,
    ) -> Result<bool, DomainError>;

    /// Settles a pending contribution for the given cycle.
    async fn mark_contribution_paid(
        &self,
        group_id: &GroupId,
        user_id: &UserId,
        cycle_number: u32,
        reference: &PaymentReference,
        paid_at: Timestamp,
    ) -> Result<ContributionUpdate, DomainError>;

    /// Compare-and-swap on `deposit_paid` for a standalone deposit payment.
    async fn mark_deposit_paid(
        &self,
        group_id: &GroupId,
        user_id: &UserId,
        paid_at: Timestamp,
    ) -> Result<DepositUpdate, DomainError>;

    /// Writes an audit ledger entry, keyed on (reference, kind).
    ///
    /// Returns `true` if this call inserted the entry, `false` if it already
    /// existed (duplicate processing).
    async fn record_ledger_entry(&self, entry: &LedgerEntry) -> Result<bool, DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn group_store_is_object_safe() {
        fn _accepts_dyn(_store: &dyn GroupStore) {}
    }
}
