//! Payment record aggregate.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{Timestamp, UserId};

use super::purpose::PaymentPurpose;
use super::reference::PaymentReference;

/// Lifecycle status of a gateway transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    /// Created by the initiator, not yet confirmed either way.
    Pending,
    /// Confirmed successful by the gateway.
    Success,
    /// Confirmed failed by the gateway.
    Failed,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Success => "success",
            PaymentStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "success" => Some(Self::Success),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

/// One gateway transaction, keyed by its immutable reference.
///
/// A record transitions from pending to success/failed exactly once; after
/// that only gateway enrichment fields may change. `verified` is set solely
/// by the verification service or the webhook receiver after a gateway
/// confirmation, never from client input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentRecord {
    pub reference: PaymentReference,
    pub user_id: UserId,
    pub purpose: PaymentPurpose,

    /// Expected amount in the minor currency unit (kobo).
    pub amount: i64,
    pub currency: String,

    pub status: PaymentStatus,
    pub verified: bool,

    pub paid_at: Option<Timestamp>,
    pub created_at: Timestamp,

    // Gateway enrichment, informational only.
    pub channel: Option<String>,
    pub fees: Option<i64>,
    pub authorization_code: Option<String>,
}

impl PaymentRecord {
    /// Creates the pending, unverified record the initiator persists before
    /// redirecting to checkout.
    pub fn new_pending(
        reference: PaymentReference,
        user_id: UserId,
        purpose: PaymentPurpose,
        amount: i64,
        currency: impl Into<String>,
        created_at: Timestamp,
    ) -> Self {
        Self {
            reference,
            user_id,
            purpose,
            amount,
            currency: currency.into(),
            status: PaymentStatus::Pending,
            verified: false,
            paid_at: None,
            created_at,
            channel: None,
            fees: None,
            authorization_code: None,
        }
    }

    /// True once the gateway has confirmed success and the record is stored
    /// as verified. Settled records are processed at most once.
    pub fn is_settled(&self) -> bool {
        self.verified && self.status == PaymentStatus::Success
    }

    /// True once the gateway has confirmed failure.
    pub fn is_failed(&self) -> bool {
        self.status == PaymentStatus::Failed
    }

    /// Checks the confirmed amount and currency against expectations.
    ///
    /// Guards against a tampered reference pointing at an unrelated, smaller
    /// transaction.
    pub fn matches_confirmation(&self, amount: i64, currency: &str) -> bool {
        self.amount == amount && self.currency.eq_ignore_ascii_case(currency)
    }
}
