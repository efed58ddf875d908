//! # Dispute Repository
//!
//! Storage port for dispute records. Every state change goes through
//! [`DisputeRepository::modify`], which applies a mutation under per-record
//! mutual exclusion: the read, the guards, and the write happen as one unit,
//! so concurrent votes can never push a tally past quorum and a dispute can
//! never be escalated twice.
//!
//! A mutation that returns `Err` leaves the stored record untouched.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use kome_core::{DisputeId, OrderId, UserId};
use parking_lot::RwLock;

use crate::dispute::{Dispute, DisputeStatus};
use crate::error::DisputeError;

/// A single atomic change to one dispute.
pub type Mutation<'a> = Box<dyn FnOnce(&mut Dispute) -> Result<(), DisputeError> + Send + 'a>;

/// Criteria for [`DisputeRepository::list`]. Empty matches everything.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DisputeFilter {
    pub status: Option<DisputeStatus>,
    /// Buyer or seller.
    pub party: Option<UserId>,
}

impl DisputeFilter {
    /// Only disputes in `status`.
    pub fn with_status(status: DisputeStatus) -> Self {
        Self {
            status: Some(status),
            party: None,
        }
    }

    pub fn matches(&self, dispute: &Dispute) -> bool {
        self.status.map_or(true, |s| dispute.status == s)
            && self
                .party
                .map_or(true, |p| dispute.buyer_id == p || dispute.seller_id == p)
    }
}

/// Persistent storage for disputes.
#[async_trait]
pub trait DisputeRepository: Send + Sync {
    /// Store a newly filed dispute.
    ///
    /// Fails with [`DisputeError::DuplicateDispute`] if the order already has
    /// one.
    async fn insert(&self, dispute: Dispute) -> Result<(), DisputeError>;

    async fn get(&self, id: &DisputeId) -> Result<Option<Dispute>, DisputeError>;

    async fn find_by_order(&self, order_id: &OrderId) -> Result<Option<Dispute>, DisputeError>;

    /// Matching disputes, oldest first.
    async fn list(&self, filter: &DisputeFilter) -> Result<Vec<Dispute>, DisputeError>;

    /// Atomically apply `mutation` to the dispute and return the updated
    /// record.
    ///
    /// Fails with [`DisputeError::DisputeNotFound`] if the dispute does not
    /// exist, or with whatever error the mutation returns.
    async fn modify(&self, id: &DisputeId, mutation: Mutation<'_>) -> Result<Dispute, DisputeError>;
}

#[derive(Debug, Default)]
struct Inner {
    disputes: HashMap<DisputeId, Dispute>,
    by_order: HashMap<OrderId, DisputeId>,
}

/// Repository backed by process memory.
///
/// Cloning shares the underlying data. The lock is only taken inside
/// synchronous helpers, so it is never held across an `.await` point.
#[derive(Debug, Clone, Default)]
pub struct InMemoryDisputeRepository {
    inner: Arc<RwLock<Inner>>,
}

impl InMemoryDisputeRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.inner.read().disputes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn insert_sync(&self, dispute: Dispute) -> Result<(), DisputeError> {
        let mut inner = self.inner.write();
        if let Some(existing) = inner.by_order.get(&dispute.order_id) {
            return Err(DisputeError::DuplicateDispute {
                order_id: dispute.order_id,
                existing: *existing,
            });
        }
        inner.by_order.insert(dispute.order_id, dispute.id);
        inner.disputes.insert(dispute.id, dispute);
        Ok(())
    }

    fn modify_sync(&self, id: &DisputeId, mutation: Mutation<'_>) -> Result<Dispute, DisputeError> {
        let mut inner = self.inner.write();
        let stored = inner
            .disputes
            .get_mut(id)
            .ok_or(DisputeError::DisputeNotFound(*id))?;
        let mut draft = stored.clone();
        mutation(&mut draft)?;
        *stored = draft.clone();
        Ok(draft)
    }

    fn list_sync(&self, filter: &DisputeFilter) -> Vec<Dispute> {
        let inner = self.inner.read();
        let mut out: Vec<Dispute> = inner
            .disputes
            .values()
            .filter(|d| filter.matches(d))
            .cloned()
            .collect();
        out.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        out
    }
}

#[async_trait]
impl DisputeRepository for InMemoryDisputeRepository {
    async fn insert(&self, dispute: Dispute) -> Result<(), DisputeError> {
        self.insert_sync(dispute)
    }

    async fn get(&self, id: &DisputeId) -> Result<Option<Dispute>, DisputeError> {
        Ok(self.inner.read().disputes.get(id).cloned())
    }

    async fn find_by_order(&self, order_id: &OrderId) -> Result<Option<Dispute>, DisputeError> {
        let inner = self.inner.read();
        Ok(inner
            .by_order
            .get(order_id)
            .and_then(|id| inner.disputes.get(id))
            .cloned())
    }

    async fn list(&self, filter: &DisputeFilter) -> Result<Vec<Dispute>, DisputeError> {
        Ok(self.list_sync(filter))
    }

    async fn modify(&self, id: &DisputeId, mutation: Mutation<'_>) -> Result<Dispute, DisputeError> {
        self.modify_sync(id, mutation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispute::Filing;
    use kome_core::Timestamp;

    fn dispute() -> Dispute {
        let buyer = UserId::new();
        Dispute::file(
            Filing {
                order_id: OrderId::new(),
                buyer_id: buyer,
                seller_id: UserId::new(),
                filed_by: buyer,
                filer_name: "Ito".into(),
                reason: "Wrong variety".into(),
                statement: "Ordered koshihikari, got sasanishiki.".into(),
                jury_size: 3,
                require_review: false,
            },
            Timestamp::now(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn insert_rejects_second_dispute_for_order() {
        let repo = InMemoryDisputeRepository::new();
        let first = dispute();
        let mut second = dispute();
        second.order_id = first.order_id;
        let first_id = first.id;

        repo.insert(first).await.unwrap();
        let err = repo.insert(second).await.unwrap_err();
        assert!(matches!(
            err,
            DisputeError::DuplicateDispute { existing, .. } if existing == first_id
        ));
        assert_eq!(repo.len(), 1);
    }

    #[tokio::test]
    async fn failed_mutation_leaves_record_untouched() {
        let repo = InMemoryDisputeRepository::new();
        let d = dispute();
        let id = d.id;
        repo.insert(d.clone()).await.unwrap();

        let result = repo
            .modify(
                &id,
                Box::new(|d: &mut Dispute| {
                    d.reason = "tampered".into();
                    Err(DisputeError::Storage("boom".into()))
                }),
            )
            .await;
        assert!(result.is_err());
        assert_eq!(repo.get(&id).await.unwrap(), Some(d));
    }

    #[tokio::test]
    async fn modify_missing_dispute_is_not_found() {
        let repo = InMemoryDisputeRepository::new();
        let err = repo
            .modify(&DisputeId::new(), Box::new(|_: &mut Dispute| Ok(())))
            .await
            .unwrap_err();
        assert!(matches!(err, DisputeError::DisputeNotFound(_)));
    }

    #[tokio::test]
    async fn list_filters_by_status_and_party() {
        let repo = InMemoryDisputeRepository::new();
        let a = dispute();
        let b = dispute();
        let buyer_a = a.buyer_id;
        let b_id = b.id;
        repo.insert(a).await.unwrap();
        repo.insert(b).await.unwrap();
        repo.modify(
            &b_id,
            Box::new(|d: &mut Dispute| {
                d.escalate(crate::escalation::EscalationCause::Timeout, Timestamp::now())
            }),
        )
        .await
        .unwrap();

        assert_eq!(repo.list(&DisputeFilter::default()).await.unwrap().len(), 2);
        let in_jury = repo
            .list(&DisputeFilter::with_status(DisputeStatus::InJury))
            .await
            .unwrap();
        assert_eq!(in_jury.len(), 1);
        assert_eq!(in_jury[0].id, b_id);
        let mine = repo
            .list(&DisputeFilter {
                status: None,
                party: Some(buyer_a),
            })
            .await
            .unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].buyer_id, buyer_a);
    }

    #[tokio::test]
    async fn find_by_order_uses_index() {
        let repo = InMemoryDisputeRepository::new();
        let d = dispute();
        let order = d.order_id;
        repo.insert(d).await.unwrap();
        assert!(repo.find_by_order(&order).await.unwrap().is_some());
        assert!(repo.find_by_order(&OrderId::new()).await.unwrap().is_none());
    }
}
