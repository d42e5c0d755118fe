//! In-memory payment repository for tests and local development.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, ErrorCode};
use crate::domain::payment::{PaymentRecord, PaymentReference, PaymentStatus};
use crate::ports::{PaymentRepository, SettlementDetails};

/// Mutex-backed payment store with the same transition semantics as the
/// Postgres adapter: conditional updates report whether they transitioned.
#[derive(Default)]
pub struct InMemoryPaymentRepository {
    records: Mutex<HashMap<PaymentReference, PaymentRecord>>,
}

impl InMemoryPaymentRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<PaymentReference, PaymentRecord>> {
        match self.records.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

#[async_trait]
impl PaymentRepository for InMemoryPaymentRepository {
    async fn insert_pending(&self, record: &PaymentRecord) -> Result<(), DomainError> {
        let mut records = self.lock();
        if records.contains_key(&record.reference) {
            return Err(DomainError::new(
                ErrorCode::Conflict,
                format!("payment reference {} already exists", record.reference),
            ));
        }
        records.insert(record.reference.clone(), record.clone());
        Ok(())
    }

    async fn find_by_reference(
        &self,
        reference: &PaymentReference,
    ) -> Result<Option<PaymentRecord>, DomainError> {
        Ok(self.lock().get(reference).cloned())
    }

    async fn mark_success(
        &self,
        reference: &PaymentReference,
        details: &SettlementDetails,
    ) -> Result<bool, DomainError> {
        let mut records = self.lock();
        let record = records.get_mut(reference).ok_or_else(|| {
            DomainError::new(
                ErrorCode::PaymentNotFound,
                format!("no payment record for {reference}"),
            )
        })?;

        if record.is_settled() {
            return Ok(false);
        }

        record.status = PaymentStatus::Success;
        record.verified = true;
        record.paid_at = details.paid_at;
        record.channel = details.channel.clone();
        record.fees = details.fees;
        record.authorization_code = details.authorization_code.clone();
        Ok(true)
    }

    async fn mark_failed(&self, reference: &PaymentReference) -> Result<bool, DomainError> {
        let mut records = self.lock();
        let record = records.get_mut(reference).ok_or_else(|| {
            DomainError::new(
                ErrorCode::PaymentNotFound,
                format!("no payment record for {reference}"),
            )
        })?;

        if record.status != PaymentStatus::Pending {
            return Ok(false);
        }
        record.status = PaymentStatus::Failed;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::{GroupId, Timestamp, UserId};
    use crate::domain::payment::PaymentPurpose;

    fn pending_record() -> PaymentRecord {
        PaymentRecord::new_pending(
            PaymentReference::generate(),
            UserId::new(),
            PaymentPurpose::SecurityDeposit {
                group_id: GroupId::new(),
            },
            2_000,
            "NGN",
            Timestamp::now(),
        )
    }

    #[tokio::test]
    async fn duplicate_reference_is_a_conflict() {
        let repo = InMemoryPaymentRepository::new();
        let record = pending_record();

        repo.insert_pending(&record).await.unwrap();
        let err = repo.insert_pending(&record).await.unwrap_err();

        assert_eq!(err.code, ErrorCode::Conflict);
    }

    #[tokio::test]
    async fn mark_success_transitions_exactly_once() {
        let repo = InMemoryPaymentRepository::new();
        let record = pending_record();
        repo.insert_pending(&record).await.unwrap();

        let details = SettlementDetails {
            paid_at: Some(Timestamp::now()),
            channel: Some("card".to_string()),
            fees: Some(180),
            authorization_code: None,
        };

        assert!(repo.mark_success(&record.reference, &details).await.unwrap());
        assert!(!repo.mark_success(&record.reference, &details).await.unwrap());

        let stored = repo
            .find_by_reference(&record.reference)
            .await
            .unwrap()
            .unwrap();
        assert!(stored.is_settled());
        assert_eq!(stored.fees, Some(180));
    }

    #[tokio::test]
    async fn mark_failed_only_touches_pending_records() {
        let repo = InMemoryPaymentRepository::new();
        let record = pending_record();
        repo.insert_pending(&record).await.unwrap();

        assert!(repo.mark_failed(&record.reference).await.unwrap());
        assert!(!repo.mark_failed(&record.reference).await.unwrap());
    }

    #[tokio::test]
    async fn settled_record_cannot_be_failed() {
        let repo = InMemoryPaymentRepository::new();
        let record = pending_record();
        repo.insert_pending(&record).await.unwrap();
        repo.mark_success(&record.reference, &SettlementDetails::default())
            .await
            .unwrap();

        assert!(!repo.mark_failed(&record.reference).await.unwrap());
        let stored = repo
            .find_by_reference(&record.reference)
            .await
            .unwrap()
            .unwrap();
        assert!(stored.is_settled());
    }
}
