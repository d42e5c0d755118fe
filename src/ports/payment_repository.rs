//! Payment record store port.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::foundation::{DomainError, Timestamp};
use crate::domain::payment::{PaymentRecord, PaymentReference};

/// Gateway enrichment persisted with the success transition.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SettlementDetails {
    pub paid_at: Option<Timestamp>,
    pub channel: Option<String>,
    pub fees: Option<i64>,
    pub authorization_code: Option<String>,
}

/// Port for payment record persistence.
///
/// The success/failure transitions are conditional updates: they report
/// whether this call performed the transition so concurrent entry points can
/// detect that the other one won without treating it as an error.
#[async_trait]
pub trait PaymentRepository: Send + Sync {
    /// Inserts the pending record created by the initiator.
    ///
    /// Fails with a `Conflict` domain error if the reference already exists.
    async fn insert_pending(&self, record: &PaymentRecord) -> Result<(), DomainError>;

    /// Loads a record by its reference.
    async fn find_by_reference(
        &self,
        reference: &PaymentReference,
    ) -> Result<Option<PaymentRecord>, DomainError>;

    /// Marks a record success/verified with gateway enrichment.
    ///
    /// Returns `true` if this call performed the transition, `false` if the
    /// record was already settled (the other entry point won the race).
    async fn mark_success(
        &self,
        reference: &PaymentReference,
        details: &SettlementDetails,
    ) -> Result<bool, DomainError>;

    /// Marks a still-pending record failed.
    ///
    /// Returns `true` if this call performed the transition, `false` if the
    /// record was no longer pending.
    async fn mark_failed(&self, reference: &PaymentReference) -> Result<bool, DomainError>;
}
