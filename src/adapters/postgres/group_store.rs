//! PostgreSQL implementation of GroupStore.
//!
//! The slot claim runs in a transaction holding a row lock on the group, so
//! concurrent claims for the same group serialize. Unique constraints on
//! (group_id, user_id) and (group_id, position) back the lock up; every
//! other write is a single conditional statement whose affected-row count
//! carries the outcome.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::domain::foundation::{DomainError, ErrorCode, GroupId, Timestamp, UserId};
use crate::domain::group::{
    Group, LedgerEntry, Membership, MembershipStatus,
};
use crate::domain::payment::PaymentReference;
use crate::ports::{ContributionUpdate, DepositUpdate, GroupStore, SlotClaim};

pub struct PostgresGroupStore {
    pool: PgPool,
}

impl PostgresGroupStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct GroupRow {
    id: Uuid,
    name: String,
    created_by: Uuid,
    member_target: i32,
    contribution_amount: i64,
    currency: String,
    current_member_count: i32,
    created_at: DateTime<Utc>,
}

impl From<GroupRow> for Group {
    fn from(row: GroupRow) -> Self {
        Group {
            id: GroupId::from_uuid(row.id),
            name: row.name,
            created_by: UserId::from_uuid(row.created_by),
            member_target: row.member_target.max(0) as u32,
            contribution_amount: row.contribution_amount,
            currency: row.currency,
            current_member_count: row.current_member_count.max(0) as u32,
            created_at: Timestamp::from_datetime(row.created_at),
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct MembershipRow {
    group_id: Uuid,
    user_id: Uuid,
    position: i32,
    status: String,
    deposit_paid: bool,
    deposit_paid_at: Option<DateTime<Utc>>,
    joined_at: DateTime<Utc>,
}

impl TryFrom<MembershipRow> for Membership {
    type Error = DomainError;

    fn try_from(row: MembershipRow) -> Result<Self, Self::Error> {
        let status = MembershipStatus::parse(&row.status).ok_or_else(|| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("invalid membership status: {}", row.status),
            )
        })?;

        Ok(Membership {
            group_id: GroupId::from_uuid(row.group_id),
            user_id: UserId::from_uuid(row.user_id),
            position: row.position.max(0) as u32,
            status,
            deposit_paid: row.deposit_paid,
            deposit_paid_at: row.deposit_paid_at.map(Timestamp::from_datetime),
            joined_at: Timestamp::from_datetime(row.joined_at),
        })
    }
}

fn database_error(context: &str, e: sqlx::Error) -> DomainError {
    DomainError::new(ErrorCode::DatabaseError, format!("{context}: {e}"))
}

#[async_trait]
impl GroupStore for PostgresGroupStore {
    async fn find_group(&self, group_id: &GroupId) -> Result<Option<Group>, DomainError> {
        let row: Option<GroupRow> = sqlx::query_as(
            r#"
            SELECT id, name, created_by, member_target, contribution_amount,
                   currency, current_member_count, created_at
            FROM groups
            WHERE id = $1
            "#,
        )
        .bind(group_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| database_error("failed to load group", e))?;

        Ok(row.map(Group::from))
    }

    async fn find_membership(
        &self,
        group_id: &GroupId,
        user_id: &UserId,
    ) -> Result<Option<Membership>, DomainError> {
        let row: Option<MembershipRow> = sqlx::query_as(
            r#"
            SELECT group_id, user_id, position, status,
                   deposit_paid, deposit_paid_at, joined_at
            FROM group_memberships
            WHERE group_id = $1 AND user_id = $2
            "#,
        )
        .bind(group_id.as_uuid())
        .bind(user_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| database_error("failed to load membership", e))?;

        row.map(Membership::try_from).transpose()
    }

    async fn has_approved_join_request(
        &self,
        group_id: &GroupId,
        user_id: &UserId,
    ) -> Result<bool, DomainError> {
        let row = sqlx::query(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM join_requests
                WHERE group_id = $1 AND user_id = $2 AND status = 'approved'
            ) AS approved
            "#,
        )
        .bind(group_id.as_uuid())
        .bind(user_id.as_uuid())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| database_error("failed to check join request", e))?;

        row.try_get("approved")
            .map_err(|e| database_error("failed to read join request flag", e))
    }

    async fn claim_slot(
        &self,
        group_id: &GroupId,
        user_id: &UserId,
        preferred_slot: Option<u32>,
        paid_at: Timestamp,
    ) -> Result<SlotClaim, DomainError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| database_error("failed to open claim transaction", e))?;

        // Row lock on the group serializes claims for the same group.
        let group_row: Option<GroupRow> = sqlx::query_as(
            r#"
            SELECT id, name, created_by, member_target, contribution_amount,
                   currency, current_member_count, created_at
            FROM groups
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(group_id.as_uuid())
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| database_error("failed to lock group", e))?;

        let group = match group_row {
            Some(row) => Group::from(row),
            None => {
                return Err(DomainError::new(
                    ErrorCode::GroupNotFound,
                    format!("no group with id {group_id}"),
                ))
            }
        };

        let existing: Option<MembershipRow> = sqlx::query_as(
            r#"
            SELECT group_id, user_id, position, status,
                   deposit_paid, deposit_paid_at, joined_at
            FROM group_memberships
            WHERE group_id = $1 AND user_id = $2
            "#,
        )
        .bind(group_id.as_uuid())
        .bind(user_id.as_uuid())
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| database_error("failed to check membership", e))?;

        if let Some(row) = existing {
            tx.rollback()
                .await
                .map_err(|e| database_error("failed to roll back claim", e))?;
            return Ok(SlotClaim::AlreadyMember {
                position: row.position.max(0) as u32,
            });
        }

        if group.is_full() {
            tx.rollback()
                .await
                .map_err(|e| database_error("failed to roll back claim", e))?;
            return Ok(SlotClaim::GroupFull);
        }

        let taken: Vec<i32> = sqlx::query_scalar(
            "SELECT position FROM group_memberships WHERE group_id = $1",
        )
        .bind(group_id.as_uuid())
        .fetch_all(&mut *tx)
        .await
        .map_err(|e| database_error("failed to list taken slots", e))?;

        let taken: Vec<u32> = taken.into_iter().map(|p| p.max(0) as u32).collect();
        let position = preferred_slot
            .filter(|slot| group.has_slot(*slot) && !taken.contains(slot))
            .or_else(|| (1..=group.member_target).find(|slot| !taken.contains(slot)));

        let position = match position {
            Some(position) => position,
            None => {
                tx.rollback()
                    .await
                    .map_err(|e| database_error("failed to roll back claim", e))?;
                return Ok(SlotClaim::GroupFull);
            }
        };

        sqlx::query(
            r#"
            INSERT INTO group_memberships (
                group_id, user_id, position, status,
                deposit_paid, deposit_paid_at, joined_at
            ) VALUES ($1, $2, $3, 'active', TRUE, $4, $4)
            "#,
        )
        .bind(group_id.as_uuid())
        .bind(user_id.as_uuid())
        .bind(position as i32)
        .bind(paid_at.as_datetime())
        .execute(&mut *tx)
        .await
        .map_err(|e| database_error("failed to insert membership", e))?;

        sqlx::query(
            "UPDATE groups SET current_member_count = current_member_count + 1 WHERE id = $1",
        )
        .bind(group_id.as_uuid())
        .execute(&mut *tx)
        .await
        .map_err(|e| database_error("failed to increment member count", e))?;

        tx.commit()
            .await
            .map_err(|e| database_error("failed to commit claim", e))?;

        Ok(SlotClaim::Claimed { position })
    }

    async fn record_first_contribution(
        &self,
        group_id: &GroupId,
        user_id: &UserId,
        amount: i64,
        reference: &PaymentReference,
        paid_at: Timestamp,
    ) -> Result<bool, DomainError> {
        let result = sqlx::query(
            r#"
            INSERT INTO contributions (
                group_id, user_id, cycle_number, amount,
                status, paid_date, transaction_ref
            ) VALUES ($1, $2, 1, $3, 'paid', $4, $5)
            ON CONFLICT (group_id, user_id, cycle_number) DO NOTHING
            "#,
        )
        .bind(group_id.as_uuid())
        .bind(user_id.as_uuid())
        .bind(amount)
        .bind(paid_at.as_datetime())
        .bind(reference.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| database_error("failed to record first contribution", e))?;

        Ok(result.rows_affected() > 0)
    }

    async fn mark_contribution_paid(
        &self,
        group_id: &GroupId,
        user_id: &UserId,
        cycle_number: u32,
        reference: &PaymentReference,
        paid_at: Timestamp,
    ) -> Result<ContributionUpdate, DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE contributions SET
                status = 'paid',
                paid_date = $4,
                transaction_ref = $5
            WHERE group_id = $1 AND user_id = $2 AND cycle_number = $3
              AND status <> 'paid'
            "#,
        )
        .bind(group_id.as_uuid())
        .bind(user_id.as_uuid())
        .bind(cycle_number as i32)
        .bind(paid_at.as_datetime())
        .bind(reference.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| database_error("failed to mark contribution paid", e))?;

        if result.rows_affected() > 0 {
            return Ok(ContributionUpdate::Updated);
        }

        // Nothing updated: classify by reading the row back.
        let row = sqlx::query(
            r#"
            SELECT transaction_ref FROM contributions
            WHERE group_id = $1 AND user_id = $2 AND cycle_number = $3
            "#,
        )
        .bind(group_id.as_uuid())
        .bind(user_id.as_uuid())
        .bind(cycle_number as i32)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| database_error("failed to classify contribution state", e))?;

        match row {
            None => Ok(ContributionUpdate::NotFound),
            Some(row) => {
                let existing_ref: Option<String> = row
                    .try_get("transaction_ref")
                    .map_err(|e| database_error("failed to read transaction_ref", e))?;
                if existing_ref.as_deref() == Some(reference.as_str()) {
                    Ok(ContributionUpdate::AlreadyPaid)
                } else {
                    Ok(ContributionUpdate::PaidWithDifferentRef)
                }
            }
        }
    }

    async fn mark_deposit_paid(
        &self,
        group_id: &GroupId,
        user_id: &UserId,
        paid_at: Timestamp,
    ) -> Result<DepositUpdate, DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE group_memberships SET
                deposit_paid = TRUE,
                deposit_paid_at = $3
            WHERE group_id = $1 AND user_id = $2 AND deposit_paid = FALSE
            "#,
        )
        .bind(group_id.as_uuid())
        .bind(user_id.as_uuid())
        .bind(paid_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| database_error("failed to mark deposit paid", e))?;

        if result.rows_affected() > 0 {
            return Ok(DepositUpdate::Updated);
        }

        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM group_memberships
                WHERE group_id = $1 AND user_id = $2
            )
            "#,
        )
        .bind(group_id.as_uuid())
        .bind(user_id.as_uuid())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| database_error("failed to classify deposit state", e))?;

        if exists {
            Ok(DepositUpdate::AlreadyPaid)
        } else {
            Ok(DepositUpdate::NotFound)
        }
    }

    async fn record_ledger_entry(&self, entry: &LedgerEntry) -> Result<bool, DomainError> {
        let result = sqlx::query(
            r#"
            INSERT INTO transactions (
                reference, kind, group_id, user_id,
                amount, currency, recorded_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (reference, kind) DO NOTHING
            "#,
        )
        .bind(entry.reference.as_str())
        .bind(entry.kind.as_str())
        .bind(entry.group_id.as_uuid())
        .bind(entry.user_id.as_uuid())
        .bind(entry.amount)
        .bind(&entry.currency)
        .bind(entry.recorded_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| database_error("failed to record ledger entry", e))?;

        Ok(result.rows_affected() > 0)
    }
}
