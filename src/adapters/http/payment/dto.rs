//! Request/response DTOs for payment endpoints.

use serde::{Deserialize, Serialize};

use crate::application::handlers::payment::{InitiatedPayment, VerificationOutcome};
use crate::domain::payment::PaymentPurpose;

/// POST /api/payments request body.
///
/// The purpose is flattened so clients send
/// `{"purpose": "group_join", "group_id": ..., "amount": ...}`.
#[derive(Debug, Deserialize)]
pub struct InitiatePaymentRequest {
    #[serde(flatten)]
    pub purpose: PaymentPurpose,
    pub amount: i64,
    #[serde(default = "default_currency")]
    pub currency: String,
}

fn default_currency() -> String {
    "NGN".to_string()
}

/// POST /api/payments response body.
#[derive(Debug, Serialize)]
pub struct InitiatePaymentResponse {
    pub reference: String,
    pub amount: i64,
    pub currency: String,
    /// Attach verbatim to the gateway checkout.
    pub metadata: serde_json::Value,
}

impl From<InitiatedPayment> for InitiatePaymentResponse {
    fn from(initiated: InitiatedPayment) -> Self {
        Self {
            reference: initiated.reference.to_string(),
            amount: initiated.amount,
            currency: initiated.currency,
            metadata: initiated.metadata,
        }
    }
}

/// GET /api/payments/verify/{reference} response body.
#[derive(Debug, Serialize)]
pub struct VerifyPaymentResponse {
    pub verified: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<u32>,
    pub message: String,
}

impl From<VerificationOutcome> for VerifyPaymentResponse {
    fn from(outcome: VerificationOutcome) -> Self {
        Self {
            verified: outcome.verified,
            position: outcome.position,
            message: outcome.message,
        }
    }
}

/// Webhook acknowledgement body.
#[derive(Debug, Serialize)]
pub struct WebhookAckResponse {
    pub status: &'static str,
}

/// Standard error envelope.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ErrorBody {
                code: code.into(),
                message: message.into(),
            },
        }
    }
}
