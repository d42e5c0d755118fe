//! Payment initiation: mints the reference and persists the pending record
//! that later confirmation is checked against.

use std::sync::Arc;

use crate::domain::foundation::{Timestamp, UserId};
use crate::domain::payment::{
    CheckoutMetadata, InitiateError, PaymentPurpose, PaymentRecord, PaymentReference,
};
use crate::ports::{GroupStore, PaymentRepository};

/// What the client needs to open a checkout.
#[derive(Debug, Clone)]
pub struct InitiatedPayment {
    pub reference: PaymentReference,
    pub amount: i64,
    pub currency: String,
    /// Metadata to attach verbatim to the gateway checkout.
    pub metadata: serde_json::Value,
}

/// Creates pending payment records for an authenticated caller.
pub struct InitiatePaymentHandler {
    payments: Arc<dyn PaymentRepository>,
    groups: Arc<dyn GroupStore>,
}

impl InitiatePaymentHandler {
    pub fn new(payments: Arc<dyn PaymentRepository>, groups: Arc<dyn GroupStore>) -> Self {
        Self { payments, groups }
    }

    /// Validates the request, mints a fresh reference, and stores the
    /// pending record. The expected amount is fixed here and never trusted
    /// from later confirmation input.
    pub async fn initiate(
        &self,
        user_id: UserId,
        purpose: PaymentPurpose,
        amount: i64,
        currency: &str,
    ) -> Result<InitiatedPayment, InitiateError> {
        if amount <= 0 {
            return Err(InitiateError::InvalidAmount(amount));
        }

        self.check_ownership(&user_id, &purpose).await?;

        let reference = PaymentReference::generate();
        let record = PaymentRecord::new_pending(
            reference.clone(),
            user_id,
            purpose,
            amount,
            currency,
            Timestamp::now(),
        );

        // A conflict on a freshly minted reference is a datastore error, not
        // a business condition; it propagates like any other store failure.
        self.payments.insert_pending(&record).await?;

        tracing::info!(
            reference = %reference,
            user_id = %user_id,
            amount,
            "payment initiated"
        );

        Ok(InitiatedPayment {
            reference,
            amount,
            currency: currency.to_string(),
            metadata: CheckoutMetadata::new(user_id, purpose).to_value(),
        })
    }

    /// The caller must own the context the payment targets.
    async fn check_ownership(
        &self,
        user_id: &UserId,
        purpose: &PaymentPurpose,
    ) -> Result<(), InitiateError> {
        let group_id = purpose.group_id();
        let group = self
            .groups
            .find_group(&group_id)
            .await?
            .ok_or(InitiateError::GroupNotFound(group_id))?;

        match purpose {
            PaymentPurpose::GroupCreation { .. } => {
                if group.created_by != *user_id {
                    return Err(InitiateError::UnauthorizedPurpose(
                        "only the group creator can pay for group creation".to_string(),
                    ));
                }
            }
            PaymentPurpose::GroupJoin { .. } => {
                if !self
                    .groups
                    .has_approved_join_request(&group_id, user_id)
                    .await?
                {
                    return Err(InitiateError::UnauthorizedPurpose(
                        "no approved join request for this group".to_string(),
                    ));
                }
            }
            PaymentPurpose::Contribution { .. } | PaymentPurpose::SecurityDeposit { .. } => {
                if self
                    .groups
                    .find_membership(&group_id, user_id)
                    .await?
                    .is_none()
                {
                    return Err(InitiateError::UnauthorizedPurpose(
                        "caller is not a member of this group".to_string(),
                    ));
                }
            }
        }

        Ok(())
    }
}
