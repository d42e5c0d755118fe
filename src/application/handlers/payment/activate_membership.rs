//! MembershipActivator - the shared, idempotent activation logic.
//!
//! Both confirmation channels (the synchronous verification service and the
//! webhook receiver) funnel every confirmed payment through this one
//! function, so the two entry points cannot diverge in behavior. Processing
//! the same payment twice, or from both channels at once, must converge on
//! the same end state; the guards are the group store's atomic conditional
//! operations, not any in-process lock.

use std::sync::Arc;

use crate::domain::foundation::{GroupId, Timestamp};
use crate::domain::group::{LedgerEntry, LedgerEntryKind};
use crate::domain::payment::{ActivationError, PaymentPurpose, PaymentRecord};
use crate::ports::{ContributionUpdate, DepositUpdate, GroupStore, SlotClaim};

/// Result of activating a confirmed payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Activation {
    /// Assigned payout slot, for the purposes that create a membership.
    pub position: Option<u32>,
}

/// Shared activation logic dispatched on the payment's purpose.
pub struct MembershipActivator {
    groups: Arc<dyn GroupStore>,
}

impl MembershipActivator {
    pub fn new(groups: Arc<dyn GroupStore>) -> Self {
        Self { groups }
    }

    /// Activates whatever the confirmed payment paid for.
    ///
    /// Idempotent and safe to call concurrently for the same reference:
    /// duplicate processing observes the existing rows and returns the same
    /// result without mutating anything twice.
    pub async fn activate(&self, record: &PaymentRecord) -> Result<Activation, ActivationError> {
        match record.purpose {
            PaymentPurpose::GroupCreation {
                group_id,
                preferred_slot,
            }
            | PaymentPurpose::GroupJoin {
                group_id,
                preferred_slot,
            } => {
                let position = self
                    .activate_group_membership(record, group_id, preferred_slot)
                    .await?;
                Ok(Activation {
                    position: Some(position),
                })
            }
            PaymentPurpose::Contribution {
                group_id,
                cycle_number,
            } => {
                self.settle_contribution(record, group_id, cycle_number)
                    .await?;
                Ok(Activation { position: None })
            }
            PaymentPurpose::SecurityDeposit { group_id } => {
                self.settle_deposit(record, group_id).await?;
                Ok(Activation { position: None })
            }
        }
    }

    async fn activate_group_membership(
        &self,
        record: &PaymentRecord,
        group_id: GroupId,
        preferred_slot: Option<u32>,
    ) -> Result<u32, ActivationError> {
        let paid_at = record.paid_at.unwrap_or_else(Timestamp::now);

        let group = self
            .groups
            .find_group(&group_id)
            .await?
            .ok_or(ActivationError::MembershipNotFound {
                group_id,
                user_id: record.user_id,
            })?;

        // The claim is the true concurrency guard: preferred slot if still
        // free at the moment of the insert, else lowest free; the member
        // count increment rides in the same atomic operation.
        let claim = self
            .groups
            .claim_slot(&group_id, &record.user_id, preferred_slot, paid_at)
            .await?;

        let position = match claim {
            SlotClaim::Claimed { position } => {
                tracing::info!(
                    reference = %record.reference,
                    group_id = %group_id,
                    user_id = %record.user_id,
                    position,
                    "membership activated"
                );
                position
            }
            SlotClaim::AlreadyMember { position } => {
                tracing::debug!(
                    reference = %record.reference,
                    group_id = %group_id,
                    position,
                    "membership already active, repairing any missing rows"
                );
                position
            }
            SlotClaim::GroupFull => {
                // Money was taken; the payment stays verified so a human can
                // reconcile. Never silently lose the membership intent.
                tracing::error!(
                    reference = %record.reference,
                    group_id = %group_id,
                    user_id = %record.user_id,
                    "group full after payment confirmation, needs reconciliation"
                );
                return Err(ActivationError::GroupFull { group_id });
            }
        };

        // The remaining writes are individually idempotent, so a retry after
        // a partial failure (or the losing entry point of a race) fills in
        // whatever is missing without duplicating anything.
        self.groups
            .record_first_contribution(
                &group_id,
                &record.user_id,
                group.contribution_amount,
                &record.reference,
                paid_at,
            )
            .await?;

        let deposit_amount = (record.amount - group.contribution_amount).max(0);
        self.groups
            .record_ledger_entry(&LedgerEntry::new(
                record.reference.clone(),
                LedgerEntryKind::SecurityDeposit,
                group_id,
                record.user_id,
                deposit_amount,
                record.currency.clone(),
                paid_at,
            ))
            .await?;
        self.groups
            .record_ledger_entry(&LedgerEntry::new(
                record.reference.clone(),
                LedgerEntryKind::Contribution,
                group_id,
                record.user_id,
                group.contribution_amount,
                record.currency.clone(),
                paid_at,
            ))
            .await?;

        Ok(position)
    }

    async fn settle_contribution(
        &self,
        record: &PaymentRecord,
        group_id: GroupId,
        cycle_number: u32,
    ) -> Result<(), ActivationError> {
        let paid_at = record.paid_at.unwrap_or_else(Timestamp::now);

        let update = self
            .groups
            .mark_contribution_paid(
                &group_id,
                &record.user_id,
                cycle_number,
                &record.reference,
                paid_at,
            )
            .await?;

        match update {
            ContributionUpdate::Updated => {
                self.groups
                    .record_ledger_entry(&LedgerEntry::new(
                        record.reference.clone(),
                        LedgerEntryKind::Contribution,
                        group_id,
                        record.user_id,
                        record.amount,
                        record.currency.clone(),
                        paid_at,
                    ))
                    .await?;
                tracing::info!(
                    reference = %record.reference,
                    group_id = %group_id,
                    cycle_number,
                    "contribution settled"
                );
                Ok(())
            }
            ContributionUpdate::AlreadyPaid => {
                tracing::debug!(
                    reference = %record.reference,
                    cycle_number,
                    "contribution already settled by this payment"
                );
                Ok(())
            }
            ContributionUpdate::PaidWithDifferentRef => {
                Err(ActivationError::ContributionAlreadyPaid { cycle_number })
            }
            ContributionUpdate::NotFound => Err(ActivationError::ContributionNotFound {
                group_id,
                cycle_number,
            }),
        }
    }

    async fn settle_deposit(
        &self,
        record: &PaymentRecord,
        group_id: GroupId,
    ) -> Result<(), ActivationError> {
        let paid_at = record.paid_at.unwrap_or_else(Timestamp::now);

        let update = self
            .groups
            .mark_deposit_paid(&group_id, &record.user_id, paid_at)
            .await?;

        match update {
            DepositUpdate::Updated => {
                self.groups
                    .record_ledger_entry(&LedgerEntry::new(
                        record.reference.clone(),
                        LedgerEntryKind::SecurityDeposit,
                        group_id,
                        record.user_id,
                        record.amount,
                        record.currency.clone(),
                        paid_at,
                    ))
                    .await?;
                Ok(())
            }
            DepositUpdate::AlreadyPaid => Ok(()),
            DepositUpdate::NotFound => Err(ActivationError::MembershipNotFound {
                group_id,
                user_id: record.user_id,
            }),
        }
    }
}
