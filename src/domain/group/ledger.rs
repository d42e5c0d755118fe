//! Audit ledger entries.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{GroupId, Timestamp, UserId};
use crate::domain::payment::PaymentReference;

/// What a ledger entry records money against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerEntryKind {
    SecurityDeposit,
    Contribution,
}

impl LedgerEntryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            LedgerEntryKind::SecurityDeposit => "security_deposit",
            LedgerEntryKind::Contribution => "contribution",
        }
    }
}

/// One audit transaction row, keyed idempotently on (reference, kind).
///
/// Activation writes these so money movements stay traceable even when the
/// same payment is processed by both confirmation channels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub reference: PaymentReference,
    pub kind: LedgerEntryKind,
    pub group_id: GroupId,
    pub user_id: UserId,
    pub amount: i64,
    pub currency: String,
    pub recorded_at: Timestamp,
}

impl LedgerEntry {
    pub fn new(
        reference: PaymentReference,
        kind: LedgerEntryKind,
        group_id: GroupId,
        user_id: UserId,
        amount: i64,
        currency: impl Into<String>,
        recorded_at: Timestamp,
    ) -> Self {
        Self {
            reference,
            kind,
            group_id,
            user_id,
            amount,
            currency: currency.into(),
            recorded_at,
        }
    }

    /// The idempotency key for this entry.
    pub fn key(&self) -> (PaymentReference, LedgerEntryKind) {
        (self.reference.clone(), self.kind)
    }
}
