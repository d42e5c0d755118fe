//! PostgreSQL implementation of PaymentRepository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::foundation::{DomainError, ErrorCode, Timestamp, UserId};
use crate::domain::payment::{
    PaymentPurpose, PaymentRecord, PaymentReference, PaymentStatus,
};
use crate::ports::{PaymentRepository, SettlementDetails};

/// PostgreSQL implementation of the PaymentRepository port.
///
/// The status transitions are guarded in SQL: `mark_success` and
/// `mark_failed` are conditional UPDATEs whose affected-row count tells the
/// caller whether this call performed the transition.
pub struct PostgresPaymentRepository {
    pool: PgPool,
}

impl PostgresPaymentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct PaymentRow {
    reference: String,
    user_id: Uuid,
    purpose: serde_json::Value,
    amount: i64,
    currency: String,
    status: String,
    verified: bool,
    paid_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    channel: Option<String>,
    fees: Option<i64>,
    authorization_code: Option<String>,
}

impl TryFrom<PaymentRow> for PaymentRecord {
    type Error = DomainError;

    fn try_from(row: PaymentRow) -> Result<Self, Self::Error> {
        let reference = PaymentReference::parse(&row.reference).map_err(|e| {
            DomainError::new(ErrorCode::DatabaseError, format!("invalid reference: {e}"))
        })?;
        let purpose: PaymentPurpose = serde_json::from_value(row.purpose).map_err(|e| {
            DomainError::new(ErrorCode::DatabaseError, format!("invalid purpose: {e}"))
        })?;
        let status = PaymentStatus::parse(&row.status).ok_or_else(|| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("invalid payment status: {}", row.status),
            )
        })?;

        Ok(PaymentRecord {
            reference,
            user_id: UserId::from_uuid(row.user_id),
            purpose,
            amount: row.amount,
            currency: row.currency,
            status,
            verified: row.verified,
            paid_at: row.paid_at.map(Timestamp::from_datetime),
            created_at: Timestamp::from_datetime(row.created_at),
            channel: row.channel,
            fees: row.fees,
            authorization_code: row.authorization_code,
        })
    }
}

fn database_error(context: &str, e: sqlx::Error) -> DomainError {
    DomainError::new(ErrorCode::DatabaseError, format!("{context}: {e}"))
}

#[async_trait]
impl PaymentRepository for PostgresPaymentRepository {
    async fn insert_pending(&self, record: &PaymentRecord) -> Result<(), DomainError> {
        let purpose = serde_json::to_value(&record.purpose).map_err(|e| {
            DomainError::new(ErrorCode::InternalError, format!("purpose serialization: {e}"))
        })?;

        sqlx::query(
            r#"
            INSERT INTO payments (
                reference, user_id, purpose, amount, currency,
                status, verified, created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(record.reference.as_str())
        .bind(record.user_id.as_uuid())
        .bind(purpose)
        .bind(record.amount)
        .bind(&record.currency)
        .bind(record.status.as_str())
        .bind(record.verified)
        .bind(record.created_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.is_unique_violation() {
                    return DomainError::new(
                        ErrorCode::Conflict,
                        format!("payment reference {} already exists", record.reference),
                    );
                }
            }
            database_error("failed to insert payment", e)
        })?;

        Ok(())
    }

    async fn find_by_reference(
        &self,
        reference: &PaymentReference,
    ) -> Result<Option<PaymentRecord>, DomainError> {
        let row: Option<PaymentRow> = sqlx::query_as(
            r#"
            SELECT reference, user_id, purpose, amount, currency,
                   status, verified, paid_at, created_at,
                   channel, fees, authorization_code
            FROM payments
            WHERE reference = $1
            "#,
        )
        .bind(reference.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| database_error("failed to load payment", e))?;

        row.map(PaymentRecord::try_from).transpose()
    }

    async fn mark_success(
        &self,
        reference: &PaymentReference,
        details: &SettlementDetails,
    ) -> Result<bool, DomainError> {
        // Conditional update: a record already settled is left untouched and
        // reported back as `false` so the caller knows the other entry point
        // won the race.
        let result = sqlx::query(
            r#"
            UPDATE payments SET
                status = 'success',
                verified = TRUE,
                paid_at = COALESCE($2, paid_at, NOW()),
                channel = COALESCE($3, channel),
                fees = COALESCE($4, fees),
                authorization_code = COALESCE($5, authorization_code)
            WHERE reference = $1
              AND NOT (status = 'success' AND verified)
            "#,
        )
        .bind(reference.as_str())
        .bind(details.paid_at.map(|t| *t.as_datetime()))
        .bind(&details.channel)
        .bind(details.fees)
        .bind(&details.authorization_code)
        .execute(&self.pool)
        .await
        .map_err(|e| database_error("failed to mark payment success", e))?;

        Ok(result.rows_affected() > 0)
    }

    async fn mark_failed(&self, reference: &PaymentReference) -> Result<bool, DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE payments SET status = 'failed'
            WHERE reference = $1 AND status = 'pending'
            "#,
        )
        .bind(reference.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| database_error("failed to mark payment failed", e))?;

        Ok(result.rows_affected() > 0)
    }
}
