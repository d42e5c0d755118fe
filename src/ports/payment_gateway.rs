//! Payment gateway port for transaction verification.
//!
//! Defines the contract for confirming a transaction against the external
//! gateway (Paystack). The gateway is the only authority on whether money
//! actually moved; nothing in this service marks a payment verified without
//! going through this port or a signature-authenticated webhook event.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::foundation::Timestamp;
use crate::domain::payment::PaymentReference;

/// Port for verify-by-reference gateway calls.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Confirms a transaction with the gateway.
    ///
    /// Implementations must bound the call with a timeout and classify
    /// timeouts/5xx as `GatewayError::Unreachable` (transient) rather than
    /// `Protocol` (terminal).
    async fn verify_transaction(
        &self,
        reference: &PaymentReference,
    ) -> Result<GatewayTransaction, GatewayError>;
}

/// Gateway-reported transaction status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GatewayStatus {
    /// Money moved.
    Success,
    /// Terminal failure (declined, reversed).
    Failed,
    /// The shopper left checkout without paying; may still complete later.
    Abandoned,
    /// Still in flight at the gateway.
    Pending,
}

impl GatewayStatus {
    /// Maps the gateway's status string. Anything unrecognized is treated as
    /// still pending so an unknown status never terminally fails a record.
    pub fn parse(s: &str) -> Self {
        match s {
            "success" => Self::Success,
            "failed" | "reversed" => Self::Failed,
            "abandoned" => Self::Abandoned,
            _ => Self::Pending,
        }
    }
}

/// The gateway's view of one transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayTransaction {
    pub status: GatewayStatus,

    /// Settled amount in the minor currency unit.
    pub amount: i64,
    pub currency: String,

    pub paid_at: Option<Timestamp>,
    pub channel: Option<String>,
    pub fees: Option<i64>,
    pub authorization_code: Option<String>,

    /// Echo of the checkout metadata supplied at initiation.
    pub metadata: serde_json::Value,
}

/// Errors from gateway calls.
#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    /// Timeout, connection failure, or gateway 5xx. Transient; the caller
    /// may retry with backoff.
    #[error("gateway unreachable: {0}")]
    Unreachable(String),

    /// The gateway answered but the request cannot succeed (unknown
    /// reference, rejected credentials, malformed response). Terminal.
    #[error("gateway protocol error: {0}")]
    Protocol(String),
}
