//! Error taxonomy for the payment verification pipeline.
//!
//! Every entry point classifies internal failures into one of these kinds
//! before responding; raw datastore or network errors never cross the HTTP
//! boundary unclassified.

use thiserror::Error;

use crate::domain::foundation::{DomainError, GroupId, UserId};

use super::reference::PaymentReference;

/// Errors from the payment initiator.
#[derive(Debug, Clone, Error)]
pub enum InitiateError {
    #[error("payment amount must be positive, got {0}")]
    InvalidAmount(i64),

    #[error("caller does not own the payment context: {0}")]
    UnauthorizedPurpose(String),

    #[error("group {0} not found")]
    GroupNotFound(GroupId),

    #[error(transparent)]
    Store(#[from] DomainError),
}

/// Errors from the shared membership activation logic.
///
/// An activation error never rolls back a confirmed payment: the record
/// stays verified so a human or the other entry point can reconcile.
#[derive(Debug, Clone, Error)]
pub enum ActivationError {
    #[error("group {group_id} has no free payout slot")]
    GroupFull { group_id: GroupId },

    #[error("payout slot {position} in group {group_id} is already taken")]
    SlotConflict { group_id: GroupId, position: u32 },

    #[error("no membership for user {user_id} in group {group_id}")]
    MembershipNotFound { group_id: GroupId, user_id: UserId },

    #[error("no contribution due for cycle {cycle_number} in group {group_id}")]
    ContributionNotFound { group_id: GroupId, cycle_number: u32 },

    #[error("contribution for cycle {cycle_number} was already paid under a different reference")]
    ContributionAlreadyPaid { cycle_number: u32 },

    #[error(transparent)]
    Store(#[from] DomainError),
}

/// Errors from the synchronous verification service.
#[derive(Debug, Clone, Error)]
pub enum VerificationError {
    /// Missing or expired caller credential. Retryable after re-auth; any
    /// gateway confirmation obtained meanwhile has already been stored.
    #[error("caller is not authenticated: {0}")]
    Unauthenticated(String),

    #[error("no payment record for reference {0}")]
    RecordNotFound(PaymentReference),

    /// Gateway reachable but the transaction did not succeed. Terminal.
    #[error("gateway could not verify the transaction: {0}")]
    VerificationFailed(String),

    /// Timeout or gateway 5xx. Transient; the caller may retry safely.
    #[error("payment gateway unreachable: {0}")]
    GatewayUnreachable(String),

    /// Confirmed amount does not match what the record expects. Terminal;
    /// flagged for manual review and never silently accepted.
    #[error(
        "confirmed amount {confirmed_amount} {confirmed_currency} does not match \
         expected {expected_amount} {expected_currency}"
    )]
    AmountMismatch {
        expected_amount: i64,
        confirmed_amount: i64,
        expected_currency: String,
        confirmed_currency: String,
    },

    /// Payment confirmed but a business rule blocked activation. The payment
    /// stays verified; requires manual reconciliation.
    #[error("payment confirmed but activation failed: {0}")]
    ActivationFailed(#[from] ActivationError),

    #[error(transparent)]
    Store(#[from] DomainError),
}

impl VerificationError {
    /// True for kinds where a caller-side retry can change the outcome.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            VerificationError::Unauthenticated(_) | VerificationError::GatewayUnreachable(_)
        )
    }
}

/// Errors from the webhook receiver.
#[derive(Debug, Clone, Error)]
pub enum WebhookError {
    /// Signature did not match the raw body. Rejected before any parsing or
    /// datastore access.
    #[error("webhook signature verification failed")]
    InvalidSignature,

    #[error("webhook payload could not be parsed: {0}")]
    Parse(String),

    /// Datastore failure while processing a verified event. Surfaced as 5xx
    /// so the gateway redelivers.
    #[error(transparent)]
    Store(#[from] DomainError),
}

impl From<ActivationError> for DomainError {
    fn from(err: ActivationError) -> Self {
        match err {
            ActivationError::Store(inner) => inner,
            other => DomainError::new(
                crate::domain::foundation::ErrorCode::InvalidStateTransition,
                other.to_string(),
            ),
        }
    }
}
