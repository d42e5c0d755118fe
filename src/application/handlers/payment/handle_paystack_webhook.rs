//! Paystack webhook processing.
//!
//! The webhook is the redundant confirmation channel: it must converge on
//! the same end state as synchronous verification, and it must acknowledge
//! with 2xx for every authenticated event it cannot act on, or Paystack
//! keeps redelivering a payload that will never process.

use std::sync::Arc;

use crate::domain::payment::{
    PaymentStatus, PaystackEvent, PaystackEventType, PaystackWebhookVerifier, WebhookError,
};
use crate::ports::{PaymentRepository, SettlementDetails};

use super::activate_membership::MembershipActivator;

/// How a signed webhook event was handled. Every variant maps to a 2xx
/// response; only signature and parse failures are rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookOutcome {
    /// This delivery settled the payment and ran activation.
    Processed { position: Option<u32> },
    /// The payment was already settled; duplicate delivery.
    AlreadyProcessed,
    /// Authenticated event we take no action on (unknown reference,
    /// unknown event type, or a failure notice).
    Acknowledged,
    /// Authenticated event that needs manual review; acknowledged so the
    /// gateway stops redelivering, logged loudly.
    Flagged { reason: String },
}

/// Verifies webhook signatures and processes charge events.
pub struct PaystackWebhookHandler {
    verifier: PaystackWebhookVerifier,
    payments: Arc<dyn PaymentRepository>,
    activator: Arc<MembershipActivator>,
}

impl PaystackWebhookHandler {
    pub fn new(
        verifier: PaystackWebhookVerifier,
        payments: Arc<dyn PaymentRepository>,
        activator: Arc<MembershipActivator>,
    ) -> Self {
        Self {
            verifier,
            payments,
            activator,
        }
    }

    /// Authenticates the raw payload against the signature header, then
    /// processes the event it carries.
    pub async fn handle(
        &self,
        payload: &[u8],
        signature_header: &str,
    ) -> Result<WebhookOutcome, WebhookError> {
        let event = self.verifier.verify_and_parse(payload, signature_header)?;

        match event.parsed_type() {
            PaystackEventType::ChargeSuccess => self.process_charge_success(event).await,
            PaystackEventType::ChargeFailed => self.process_charge_failed(event).await,
            PaystackEventType::Unknown => {
                tracing::debug!(event = %event.event, "ignoring unhandled webhook event type");
                Ok(WebhookOutcome::Acknowledged)
            }
        }
    }

    async fn process_charge_success(
        &self,
        event: PaystackEvent,
    ) -> Result<WebhookOutcome, WebhookError> {
        let data = event.data;
        let reference = match data.parsed_reference() {
            Some(reference) => reference,
            None => {
                tracing::warn!(
                    reference = %data.reference,
                    "charge.success for a reference not in our format, ignoring"
                );
                return Ok(WebhookOutcome::Acknowledged);
            }
        };

        let record = match self.payments.find_by_reference(&reference).await? {
            Some(record) => record,
            None => {
                // Possibly a delivery for another environment sharing the
                // Paystack account. Acknowledge, or it redelivers forever.
                tracing::warn!(
                    reference = %reference,
                    "charge.success for unknown reference, acknowledging"
                );
                return Ok(WebhookOutcome::Acknowledged);
            }
        };

        if record.is_settled() {
            tracing::debug!(reference = %reference, "duplicate charge.success delivery");
            return Ok(WebhookOutcome::AlreadyProcessed);
        }

        if !record.matches_confirmation(data.amount, &data.currency) {
            tracing::error!(
                reference = %reference,
                expected_amount = record.amount,
                confirmed_amount = data.amount,
                "webhook amount does not match expectation, flagged for review"
            );
            return Ok(WebhookOutcome::Flagged {
                reason: "amount mismatch".to_string(),
            });
        }

        let details = SettlementDetails {
            paid_at: data.paid_at.map(crate::domain::foundation::Timestamp::from_datetime),
            channel: data.channel.clone(),
            fees: data.fees,
            authorization_code: data
                .authorization
                .as_ref()
                .and_then(|a| a.authorization_code.clone()),
        };
        self.payments.mark_success(&reference, &details).await?;

        let mut settled = record;
        settled.verified = true;
        settled.status = PaymentStatus::Success;
        settled.paid_at = details.paid_at;

        match self.activator.activate(&settled).await {
            Ok(activation) => {
                tracing::info!(
                    reference = %reference,
                    position = ?activation.position,
                    "webhook settled payment"
                );
                Ok(WebhookOutcome::Processed {
                    position: activation.position,
                })
            }
            Err(err) => {
                // Payment confirmed but activation blocked. The record stays
                // settled; 2xx stops redelivery of an event that will never
                // activate on its own.
                tracing::error!(
                    reference = %reference,
                    error = %err,
                    "payment settled but activation failed, needs reconciliation"
                );
                Ok(WebhookOutcome::Flagged {
                    reason: err.to_string(),
                })
            }
        }
    }

    async fn process_charge_failed(
        &self,
        event: PaystackEvent,
    ) -> Result<WebhookOutcome, WebhookError> {
        let data = event.data;
        let reference = match data.parsed_reference() {
            Some(reference) => reference,
            None => return Ok(WebhookOutcome::Acknowledged),
        };

        let transitioned = self.payments.mark_failed(&reference).await?;
        if transitioned {
            tracing::info!(reference = %reference, "charge.failed recorded");
        }
        Ok(WebhookOutcome::Acknowledged)
    }
}
