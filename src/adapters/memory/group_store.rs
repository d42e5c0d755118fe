//! In-memory group store for tests and local development.
//!
//! Every conditional operation runs under one mutex, mirroring the atomicity
//! the Postgres adapter gets from row locks and unique constraints.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, ErrorCode, GroupId, Timestamp, UserId};
use crate::domain::group::{
    Contribution, ContributionStatus, Group, LedgerEntry, LedgerEntryKind, Membership,
};
use crate::domain::payment::PaymentReference;
use crate::ports::{ContributionUpdate, DepositUpdate, GroupStore, SlotClaim};

#[derive(Default)]
struct State {
    groups: HashMap<GroupId, Group>,
    memberships: HashMap<(GroupId, UserId), Membership>,
    contributions: HashMap<(GroupId, UserId, u32), Contribution>,
    approved_join_requests: HashSet<(GroupId, UserId)>,
    ledger: HashMap<(PaymentReference, LedgerEntryKind), LedgerEntry>,
}

/// Mutex-backed group store.
#[derive(Default)]
pub struct InMemoryGroupStore {
    state: Mutex<State>,
}

impl InMemoryGroupStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Inserts or replaces a group. Test seeding helper.
    pub fn insert_group(&self, group: Group) {
        self.lock().groups.insert(group.id, group);
    }

    /// Seeds a pending contribution row. Test seeding helper.
    pub fn insert_pending_contribution(
        &self,
        group_id: GroupId,
        user_id: UserId,
        cycle_number: u32,
        amount: i64,
    ) {
        self.lock().contributions.insert(
            (group_id, user_id, cycle_number),
            Contribution {
                group_id,
                user_id,
                cycle_number,
                amount,
                status: ContributionStatus::Pending,
                paid_date: None,
                transaction_ref: None,
            },
        );
    }

    /// Marks a join request approved. Test seeding helper.
    pub fn approve_join_request(&self, group_id: GroupId, user_id: UserId) {
        self.lock().approved_join_requests.insert((group_id, user_id));
    }

    /// Current member count of the group, 0 if unknown.
    pub fn member_count(&self, group_id: &GroupId) -> u32 {
        self.lock()
            .groups
            .get(group_id)
            .map(|g| g.current_member_count)
            .unwrap_or(0)
    }

    /// Number of contribution rows for the group.
    pub fn contribution_count(&self, group_id: &GroupId) -> usize {
        self.lock()
            .contributions
            .keys()
            .filter(|(g, _, _)| g == group_id)
            .count()
    }

    /// Total ledger entries across all groups.
    pub fn ledger_count(&self) -> usize {
        self.lock().ledger.len()
    }
}

#[async_trait]
impl GroupStore for InMemoryGroupStore {
    async fn find_group(&self, group_id: &GroupId) -> Result<Option<Group>, DomainError> {
        Ok(self.lock().groups.get(group_id).cloned())
    }

    async fn find_membership(
        &self,
        group_id: &GroupId,
        user_id: &UserId,
    ) -> Result<Option<Membership>, DomainError> {
        Ok(self.lock().memberships.get(&(*group_id, *user_id)).cloned())
    }

    async fn has_approved_join_request(
        &self,
        group_id: &GroupId,
        user_id: &UserId,
    ) -> Result<bool, DomainError> {
        Ok(self
            .lock()
            .approved_join_requests
            .contains(&(*group_id, *user_id)))
    }

    async fn claim_slot(
        &self,
        group_id: &GroupId,
        user_id: &UserId,
        preferred_slot: Option<u32>,
        paid_at: Timestamp,
    ) -> Result<SlotClaim, DomainError> {
        let mut state = self.lock();

        if let Some(existing) = state.memberships.get(&(*group_id, *user_id)) {
            return Ok(SlotClaim::AlreadyMember {
                position: existing.position,
            });
        }

        let group = state.groups.get(group_id).ok_or_else(|| {
            DomainError::new(
                ErrorCode::GroupNotFound,
                format!("no group with id {group_id}"),
            )
        })?;

        if group.is_full() {
            return Ok(SlotClaim::GroupFull);
        }

        let member_target = group.member_target;
        let taken: HashSet<u32> = state
            .memberships
            .values()
            .filter(|m| m.group_id == *group_id)
            .map(|m| m.position)
            .collect();

        let position = preferred_slot
            .filter(|slot| (1..=member_target).contains(slot) && !taken.contains(slot))
            .or_else(|| (1..=member_target).find(|slot| !taken.contains(slot)));

        let position = match position {
            Some(position) => position,
            None => return Ok(SlotClaim::GroupFull),
        };

        state.memberships.insert(
            (*group_id, *user_id),
            Membership::activated(*group_id, *user_id, position, paid_at),
        );
        if let Some(group) = state.groups.get_mut(group_id) {
            group.current_member_count += 1;
        }

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
        let mut state = self.lock();
        let key = (*group_id, *user_id, 1);
        if state.contributions.contains_key(&key) {
            return Ok(false);
        }
        state.contributions.insert(
            key,
            Contribution::first_cycle_paid(*group_id, *user_id, amount, reference.clone(), paid_at),
        );
        Ok(true)
    }

    async fn mark_contribution_paid(
        &self,
        group_id: &GroupId,
        user_id: &UserId,
        cycle_number: u32,
        reference: &PaymentReference,
        paid_at: Timestamp,
    ) -> Result<ContributionUpdate, DomainError> {
        let mut state = self.lock();
        let contribution = match state
            .contributions
            .get_mut(&(*group_id, *user_id, cycle_number))
        {
            Some(contribution) => contribution,
            None => return Ok(ContributionUpdate::NotFound),
        };

        if contribution.status == ContributionStatus::Paid {
            if contribution.transaction_ref.as_ref() == Some(reference) {
                return Ok(ContributionUpdate::AlreadyPaid);
            }
            return Ok(ContributionUpdate::PaidWithDifferentRef);
        }

        contribution.status = ContributionStatus::Paid;
        contribution.paid_date = Some(paid_at);
        contribution.transaction_ref = Some(reference.clone());
        Ok(ContributionUpdate::Updated)
    }

    async fn mark_deposit_paid(
        &self,
        group_id: &GroupId,
        user_id: &UserId,
        paid_at: Timestamp,
    ) -> Result<DepositUpdate, DomainError> {
        let mut state = self.lock();
        let membership = match state.memberships.get_mut(&(*group_id, *user_id)) {
            Some(membership) => membership,
            None => return Ok(DepositUpdate::NotFound),
        };

        if membership.deposit_paid {
            return Ok(DepositUpdate::AlreadyPaid);
        }
        membership.deposit_paid = true;
        membership.deposit_paid_at = Some(paid_at);
        Ok(DepositUpdate::Updated)
    }

    async fn record_ledger_entry(&self, entry: &LedgerEntry) -> Result<bool, DomainError> {
        let mut state = self.lock();
        let key = entry.key();
        if state.ledger.contains_key(&key) {
            return Ok(false);
        }
        state.ledger.insert(key, entry.clone());
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded(group_id: GroupId, member_target: u32) -> InMemoryGroupStore {
        let store = InMemoryGroupStore::new();
        store.insert_group(Group {
            id: group_id,
            name: "Test Circle".to_string(),
            created_by: UserId::new(),
            member_target,
            contribution_amount: 10_000,
            currency: "NGN".to_string(),
            current_member_count: 0,
            created_at: Timestamp::now(),
        });
        store
    }

    #[tokio::test]
    async fn claim_prefers_requested_slot() {
        let group_id = GroupId::new();
        let store = seeded(group_id, 3);

        let claim = store
            .claim_slot(&group_id, &UserId::new(), Some(2), Timestamp::now())
            .await
            .unwrap();

        assert_eq!(claim, SlotClaim::Claimed { position: 2 });
        assert_eq!(store.member_count(&group_id), 1);
    }

    #[tokio::test]
    async fn claim_falls_back_to_lowest_free_slot() {
        let group_id = GroupId::new();
        let store = seeded(group_id, 3);

        store
            .claim_slot(&group_id, &UserId::new(), Some(1), Timestamp::now())
            .await
            .unwrap();
        let claim = store
            .claim_slot(&group_id, &UserId::new(), Some(1), Timestamp::now())
            .await
            .unwrap();

        assert_eq!(claim, SlotClaim::Claimed { position: 2 });
    }

    #[tokio::test]
    async fn out_of_range_preference_gets_lowest_free() {
        let group_id = GroupId::new();
        let store = seeded(group_id, 3);

        let claim = store
            .claim_slot(&group_id, &UserId::new(), Some(9), Timestamp::now())
            .await
            .unwrap();

        assert_eq!(claim, SlotClaim::Claimed { position: 1 });
    }

    #[tokio::test]
    async fn duplicate_claim_reports_existing_position() {
        let group_id = GroupId::new();
        let user = UserId::new();
        let store = seeded(group_id, 3);

        store
            .claim_slot(&group_id, &user, Some(3), Timestamp::now())
            .await
            .unwrap();
        let second = store
            .claim_slot(&group_id, &user, Some(1), Timestamp::now())
            .await
            .unwrap();

        assert_eq!(second, SlotClaim::AlreadyMember { position: 3 });
        assert_eq!(store.member_count(&group_id), 1);
    }

    #[tokio::test]
    async fn full_group_rejects_new_claims() {
        let group_id = GroupId::new();
        let store = seeded(group_id, 1);

        store
            .claim_slot(&group_id, &UserId::new(), None, Timestamp::now())
            .await
            .unwrap();
        let claim = store
            .claim_slot(&group_id, &UserId::new(), None, Timestamp::now())
            .await
            .unwrap();

        assert_eq!(claim, SlotClaim::GroupFull);
        assert_eq!(store.member_count(&group_id), 1);
    }

    #[tokio::test]
    async fn concurrent_claims_for_one_slot_assign_distinct_positions() {
        let group_id = GroupId::new();
        let store = std::sync::Arc::new(seeded(group_id, 3));

        let a = {
            let store = store.clone();
            tokio::spawn(async move {
                store
                    .claim_slot(&group_id, &UserId::new(), Some(2), Timestamp::now())
                    .await
                    .unwrap()
            })
        };
        let b = {
            let store = store.clone();
            tokio::spawn(async move {
                store
                    .claim_slot(&group_id, &UserId::new(), Some(2), Timestamp::now())
                    .await
                    .unwrap()
            })
        };

        let (a, b) = (a.await.unwrap(), b.await.unwrap());
        let positions: HashSet<u32> = [a, b]
            .iter()
            .map(|claim| match claim {
                SlotClaim::Claimed { position } => *position,
                other => panic!("expected Claimed, got {other:?}"),
            })
            .collect();

        assert_eq!(positions.len(), 2, "positions must be distinct");
        assert!(positions.contains(&2), "someone got the preferred slot");
        assert_eq!(store.member_count(&group_id), 2);
    }

    #[tokio::test]
    async fn first_contribution_inserts_once() {
        let group_id = GroupId::new();
        let user = UserId::new();
        let store = seeded(group_id, 3);
        let reference = PaymentReference::generate();

        assert!(store
            .record_first_contribution(&group_id, &user, 10_000, &reference, Timestamp::now())
            .await
            .unwrap());
        assert!(!store
            .record_first_contribution(&group_id, &user, 10_000, &reference, Timestamp::now())
            .await
            .unwrap());
        assert_eq!(store.contribution_count(&group_id), 1);
    }

    #[tokio::test]
    async fn ledger_entries_deduplicate_on_reference_and_kind() {
        let group_id = GroupId::new();
        let store = seeded(group_id, 3);
        let reference = PaymentReference::generate();
        let entry = LedgerEntry::new(
            reference.clone(),
            LedgerEntryKind::Contribution,
            group_id,
            UserId::new(),
            10_000,
            "NGN",
            Timestamp::now(),
        );

        assert!(store.record_ledger_entry(&entry).await.unwrap());
        assert!(!store.record_ledger_entry(&entry).await.unwrap());

        // Same reference, different kind: a distinct entry.
        let deposit = LedgerEntry::new(
            reference,
            LedgerEntryKind::SecurityDeposit,
            group_id,
            UserId::new(),
            2_000,
            "NGN",
            Timestamp::now(),
        );
        assert!(store.record_ledger_entry(&deposit).await.unwrap());
        assert_eq!(store.ledger_count(), 2);
    }
}
