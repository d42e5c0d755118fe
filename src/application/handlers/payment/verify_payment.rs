//! Synchronous payment verification.
//!
//! Called when the client returns from checkout. Always asks the gateway
//! what actually happened; never trusts client-supplied status. The gateway
//! confirmation is persisted before the caller's credential is checked, so
//! an expired session cannot lose a real payment — the record is settled
//! and a later authenticated call (or the webhook) completes activation.

use std::sync::Arc;

use crate::domain::foundation::UserId;
use crate::domain::payment::{
    PaymentRecord, PaymentReference, VerificationError,
};
use crate::ports::{
    GatewayError, GatewayStatus, GatewayTransaction, PaymentGateway, PaymentRepository,
    SettlementDetails,
};

use super::activate_membership::MembershipActivator;

/// Result of a verification call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationOutcome {
    /// True when the gateway confirmed success and the record is settled.
    pub verified: bool,
    /// Assigned payout slot, for membership-creating purposes.
    pub position: Option<u32>,
    pub message: String,
}

/// Verifies a payment against the gateway and activates what it paid for.
pub struct VerifyPaymentHandler {
    payments: Arc<dyn PaymentRepository>,
    gateway: Arc<dyn PaymentGateway>,
    activator: Arc<MembershipActivator>,
}

impl VerifyPaymentHandler {
    pub fn new(
        payments: Arc<dyn PaymentRepository>,
        gateway: Arc<dyn PaymentGateway>,
        activator: Arc<MembershipActivator>,
    ) -> Self {
        Self {
            payments,
            gateway,
            activator,
        }
    }

    /// Verifies the transaction behind `reference`.
    ///
    /// `caller` is the authenticated user, if any. A missing or mismatched
    /// caller only blocks activation and the response; the gateway
    /// confirmation itself is still fetched and persisted for audit.
    pub async fn verify(
        &self,
        reference: &PaymentReference,
        caller: Option<UserId>,
    ) -> Result<VerificationOutcome, VerificationError> {
        let record = self
            .payments
            .find_by_reference(reference)
            .await?
            .ok_or_else(|| VerificationError::RecordNotFound(reference.clone()))?;

        if record.is_settled() {
            // Repeat call for an already-processed payment: no gateway round
            // trip. Activation is idempotent, so re-running it repairs any
            // step withheld earlier (e.g. a verify whose session had expired).
            self.require_owner(&record, caller)?;
            let activation = self.activator.activate(&record).await?;
            return Ok(VerificationOutcome {
                verified: true,
                position: activation.position,
                message: "payment already verified".to_string(),
            });
        }

        let transaction = match self.gateway.verify_transaction(reference).await {
            Ok(tx) => tx,
            Err(GatewayError::Unreachable(detail)) => {
                return Err(VerificationError::GatewayUnreachable(detail));
            }
            Err(GatewayError::Protocol(detail)) => {
                return Err(VerificationError::VerificationFailed(detail));
            }
        };

        match transaction.status {
            GatewayStatus::Success => self.settle_and_activate(record, transaction, caller).await,
            GatewayStatus::Failed => {
                self.payments.mark_failed(reference).await?;
                tracing::warn!(reference = %reference, "gateway reports transaction failed");
                Err(VerificationError::VerificationFailed(
                    "transaction failed at the gateway".to_string(),
                ))
            }
            GatewayStatus::Abandoned | GatewayStatus::Pending => {
                // Not terminal: the customer may still complete checkout, so
                // the record stays pending and the caller may re-verify.
                Ok(VerificationOutcome {
                    verified: false,
                    position: None,
                    message: "payment not completed yet".to_string(),
                })
            }
        }
    }

    async fn settle_and_activate(
        &self,
        record: PaymentRecord,
        transaction: GatewayTransaction,
        caller: Option<UserId>,
    ) -> Result<VerificationOutcome, VerificationError> {
        if !record.matches_confirmation(transaction.amount, &transaction.currency) {
            tracing::error!(
                reference = %record.reference,
                expected_amount = record.amount,
                confirmed_amount = transaction.amount,
                "confirmed amount does not match expectation, flagged for review"
            );
            return Err(VerificationError::AmountMismatch {
                expected_amount: record.amount,
                confirmed_amount: transaction.amount,
                expected_currency: record.currency.clone(),
                confirmed_currency: transaction.currency,
            });
        }

        let details = SettlementDetails {
            paid_at: transaction.paid_at,
            channel: transaction.channel.clone(),
            fees: transaction.fees,
            authorization_code: transaction.authorization_code.clone(),
        };

        // Persist the confirmation before any auth decision: the money is
        // real whether or not the session survived checkout.
        let transitioned = self.payments.mark_success(&record.reference, &details).await?;
        if !transitioned {
            tracing::debug!(
                reference = %record.reference,
                "record settled concurrently by the other entry point"
            );
        }

        let mut settled = record;
        settled.verified = true;
        settled.status = crate::domain::payment::PaymentStatus::Success;
        settled.paid_at = transaction.paid_at;

        self.require_owner(&settled, caller)?;

        let activation = self.activator.activate(&settled).await?;

        Ok(VerificationOutcome {
            verified: true,
            position: activation.position,
            message: "payment verified".to_string(),
        })
    }

    fn require_owner(
        &self,
        record: &PaymentRecord,
        caller: Option<UserId>,
    ) -> Result<(), VerificationError> {
        match caller {
            Some(user_id) if user_id == record.user_id => Ok(()),
            Some(_) => Err(VerificationError::Unauthenticated(
                "caller does not own this payment".to_string(),
            )),
            None => Err(VerificationError::Unauthenticated(
                "session expired, sign in and retry verification".to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::{
        InMemoryGroupStore, InMemoryPaymentRepository, MockPaymentGateway,
    };
    use crate::domain::foundation::{GroupId, Timestamp};
    use crate::domain::group::Group;
    use crate::domain::payment::{PaymentPurpose, PaymentStatus};
    use crate::ports::GroupStore;

    struct Fixture {
        handler: VerifyPaymentHandler,
        payments: Arc<InMemoryPaymentRepository>,
        groups: Arc<InMemoryGroupStore>,
        gateway: Arc<MockPaymentGateway>,
    }

    fn fixture(group_id: GroupId, creator: UserId) -> Fixture {
        let payments = Arc::new(InMemoryPaymentRepository::new());
        let groups = Arc::new(InMemoryGroupStore::new());
        groups.insert_group(Group {
            id: group_id,
            name: "Test Circle".to_string(),
            created_by: creator,
            member_target: 5,
            contribution_amount: 10_000,
            currency: "NGN".to_string(),
            current_member_count: 0,
            created_at: Timestamp::now(),
        });
        let gateway = Arc::new(MockPaymentGateway::new());
        let activator = Arc::new(MembershipActivator::new(groups.clone()));
        Fixture {
            handler: VerifyPaymentHandler::new(payments.clone(), gateway.clone(), activator),
            payments,
            groups,
            gateway,
        }
    }

    async fn seed_pending(
        fixture: &Fixture,
        user_id: UserId,
        purpose: PaymentPurpose,
        amount: i64,
    ) -> PaymentReference {
        let record = PaymentRecord::new_pending(
            PaymentReference::generate(),
            user_id,
            purpose,
            amount,
            "NGN",
            Timestamp::now(),
        );
        fixture.payments.insert_pending(&record).await.unwrap();
        record.reference
    }

    fn success_transaction(amount: i64) -> GatewayTransaction {
        GatewayTransaction {
            status: GatewayStatus::Success,
            amount,
            currency: "NGN".to_string(),
            paid_at: Some(Timestamp::now()),
            channel: Some("card".to_string()),
            fees: Some(180),
            authorization_code: Some("AUTH_8dfhjjdt".to_string()),
            metadata: serde_json::Value::Null,
        }
    }

    #[tokio::test]
    async fn successful_verification_settles_and_activates() {
        let group_id = GroupId::new();
        let user = UserId::new();
        let fx = fixture(group_id, user);
        let reference = seed_pending(
            &fx,
            user,
            PaymentPurpose::GroupCreation {
                group_id,
                preferred_slot: Some(1),
            },
            12_000,
        )
        .await;
        fx.gateway.respond_success(&reference, success_transaction(12_000));

        let outcome = fx.handler.verify(&reference, Some(user)).await.unwrap();

        assert!(outcome.verified);
        assert_eq!(outcome.position, Some(1));

        let stored = fx
            .payments
            .find_by_reference(&reference)
            .await
            .unwrap()
            .unwrap();
        assert!(stored.is_settled());
        assert_eq!(stored.channel.as_deref(), Some("card"));
        assert_eq!(fx.groups.member_count(&group_id), 1);
    }

    #[tokio::test]
    async fn repeat_verification_answers_without_gateway() {
        let group_id = GroupId::new();
        let user = UserId::new();
        let fx = fixture(group_id, user);
        let reference = seed_pending(
            &fx,
            user,
            PaymentPurpose::GroupCreation {
                group_id,
                preferred_slot: Some(2),
            },
            12_000,
        )
        .await;
        fx.gateway.respond_success(&reference, success_transaction(12_000));

        fx.handler.verify(&reference, Some(user)).await.unwrap();
        let calls_after_first = fx.gateway.call_count();

        let outcome = fx.handler.verify(&reference, Some(user)).await.unwrap();

        assert!(outcome.verified);
        assert_eq!(outcome.position, Some(2));
        assert_eq!(fx.gateway.call_count(), calls_after_first);
        assert_eq!(fx.groups.member_count(&group_id), 1);
    }

    #[tokio::test]
    async fn unknown_reference_is_not_found() {
        let fx = fixture(GroupId::new(), UserId::new());
        let result = fx
            .handler
            .verify(&PaymentReference::generate(), Some(UserId::new()))
            .await;
        assert!(matches!(result, Err(VerificationError::RecordNotFound(_))));
    }

    #[tokio::test]
    async fn failed_transaction_is_terminal() {
        let group_id = GroupId::new();
        let user = UserId::new();
        let fx = fixture(group_id, user);
        let reference = seed_pending(
            &fx,
            user,
            PaymentPurpose::SecurityDeposit { group_id },
            2_000,
        )
        .await;
        fx.gateway.respond_status(&reference, GatewayStatus::Failed);

        let result = fx.handler.verify(&reference, Some(user)).await;
        assert!(matches!(
            result,
            Err(VerificationError::VerificationFailed(_))
        ));

        let stored = fx
            .payments
            .find_by_reference(&reference)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.status, PaymentStatus::Failed);
    }

    #[tokio::test]
    async fn abandoned_checkout_stays_pending() {
        let group_id = GroupId::new();
        let user = UserId::new();
        let fx = fixture(group_id, user);
        let reference = seed_pending(
            &fx,
            user,
            PaymentPurpose::SecurityDeposit { group_id },
            2_000,
        )
        .await;
        fx.gateway.respond_status(&reference, GatewayStatus::Abandoned);

        let outcome = fx.handler.verify(&reference, Some(user)).await.unwrap();
        assert!(!outcome.verified);

        let stored = fx
            .payments
            .find_by_reference(&reference)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.status, PaymentStatus::Pending);
    }

    #[tokio::test]
    async fn gateway_outage_is_retryable() {
        let group_id = GroupId::new();
        let user = UserId::new();
        let fx = fixture(group_id, user);
        let reference = seed_pending(
            &fx,
            user,
            PaymentPurpose::SecurityDeposit { group_id },
            2_000,
        )
        .await;
        fx.gateway.respond_unreachable(&reference, "connect timeout");

        let result = fx.handler.verify(&reference, Some(user)).await;
        match result {
            Err(err @ VerificationError::GatewayUnreachable(_)) => assert!(err.is_retryable()),
            other => panic!("expected GatewayUnreachable, got {other:?}"),
        }

        // Record untouched, safe to retry.
        let stored = fx
            .payments
            .find_by_reference(&reference)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.status, PaymentStatus::Pending);
    }

    #[tokio::test]
    async fn amount_mismatch_is_flagged_not_activated() {
        let group_id = GroupId::new();
        let user = UserId::new();
        let fx = fixture(group_id, user);
        let reference = seed_pending(
            &fx,
            user,
            PaymentPurpose::GroupJoin {
                group_id,
                preferred_slot: None,
            },
            12_000,
        )
        .await;
        fx.gateway.respond_success(&reference, success_transaction(5_000));

        let result = fx.handler.verify(&reference, Some(user)).await;

        assert!(matches!(
            result,
            Err(VerificationError::AmountMismatch {
                expected_amount: 12_000,
                confirmed_amount: 5_000,
                ..
            })
        ));
        assert_eq!(fx.groups.member_count(&group_id), 0);
    }

    #[tokio::test]
    async fn expired_session_settles_but_does_not_activate() {
        let group_id = GroupId::new();
        let user = UserId::new();
        let fx = fixture(group_id, user);
        let reference = seed_pending(
            &fx,
            user,
            PaymentPurpose::GroupCreation {
                group_id,
                preferred_slot: Some(1),
            },
            12_000,
        )
        .await;
        fx.gateway.respond_success(&reference, success_transaction(12_000));

        // Unauthenticated call: confirmation persisted, activation withheld.
        let result = fx.handler.verify(&reference, None).await;
        assert!(matches!(result, Err(VerificationError::Unauthenticated(_))));

        let stored = fx
            .payments
            .find_by_reference(&reference)
            .await
            .unwrap()
            .unwrap();
        assert!(stored.is_settled(), "confirmation must survive auth failure");
        assert_eq!(fx.groups.member_count(&group_id), 0);

        // Re-verify after signing back in: completes activation.
        let outcome = fx.handler.verify(&reference, Some(user)).await.unwrap();
        assert!(outcome.verified);
        assert_eq!(outcome.position, Some(1));
        assert_eq!(fx.groups.member_count(&group_id), 1);
    }

    #[tokio::test]
    async fn another_user_cannot_verify_someone_elses_payment() {
        let group_id = GroupId::new();
        let owner = UserId::new();
        let fx = fixture(group_id, owner);
        let reference = seed_pending(
            &fx,
            owner,
            PaymentPurpose::GroupCreation {
                group_id,
                preferred_slot: None,
            },
            12_000,
        )
        .await;
        fx.gateway.respond_success(&reference, success_transaction(12_000));

        let result = fx.handler.verify(&reference, Some(UserId::new())).await;
        assert!(matches!(result, Err(VerificationError::Unauthenticated(_))));
        assert_eq!(fx.groups.member_count(&group_id), 0);
    }

    #[tokio::test]
    async fn group_full_keeps_payment_verified() {
        let group_id = GroupId::new();
        let creator = UserId::new();
        let fx = fixture(group_id, creator);

        // Fill the only remaining slots.
        let mut group = fx.groups.find_group(&group_id).await.unwrap().unwrap();
        group.member_target = 1;
        fx.groups.insert_group(group);

        let winner = UserId::new();
        let winner_ref = seed_pending(
            &fx,
            winner,
            PaymentPurpose::GroupJoin {
                group_id,
                preferred_slot: None,
            },
            12_000,
        )
        .await;
        fx.gateway.respond_success(&winner_ref, success_transaction(12_000));
        fx.handler.verify(&winner_ref, Some(winner)).await.unwrap();

        let loser = UserId::new();
        let loser_ref = seed_pending(
            &fx,
            loser,
            PaymentPurpose::GroupJoin {
                group_id,
                preferred_slot: None,
            },
            12_000,
        )
        .await;
        fx.gateway.respond_success(&loser_ref, success_transaction(12_000));

        let result = fx.handler.verify(&loser_ref, Some(loser)).await;
        assert!(matches!(
            result,
            Err(VerificationError::ActivationFailed(_))
        ));

        // The money is not lost: the record stays settled for reconciliation.
        let stored = fx
            .payments
            .find_by_reference(&loser_ref)
            .await
            .unwrap()
            .unwrap();
        assert!(stored.is_settled());
    }
}
