//! Dispute persistence.
//!
//! Each dispute is one row in `disputes`. The whole aggregate is stored as
//! JSONB in `record`; `status`, the party columns and the timestamps are
//! kept alongside it for filtering and ordering.
//!
//! [`DisputeRepository::modify`] runs inside a transaction holding
//! `SELECT ... FOR UPDATE` on the row, so concurrent updates to the same
//! dispute serialize in the database exactly as they do under the
//! in-memory repository's lock.

use async_trait::async_trait;
use kome_core::{DisputeId, OrderId};
use kome_dispute::{Dispute, DisputeError, DisputeFilter, DisputeRepository, Mutation};
use sqlx::PgPool;
use uuid::Uuid;

/// [`DisputeRepository`] backed by PostgreSQL.
#[derive(Debug, Clone)]
pub struct PgDisputeRepository {
    pool: PgPool,
}

impl PgDisputeRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct DisputeRow {
    id: Uuid,
    record: serde_json::Value,
}

impl DisputeRow {
    fn into_dispute(self) -> Result<Dispute, DisputeError> {
        serde_json::from_value(self.record).map_err(|e| {
            tracing::error!(id = %self.id, error = %e, "undecodable dispute record in database");
            DisputeError::Storage(format!("dispute {} has an undecodable record: {e}", self.id))
        })
    }
}

fn storage(err: sqlx::Error) -> DisputeError {
    DisputeError::Storage(err.to_string())
}

fn encode(dispute: &Dispute) -> Result<serde_json::Value, DisputeError> {
    serde_json::to_value(dispute)
        .map_err(|e| DisputeError::Storage(format!("failed to encode dispute {}: {e}", dispute.id)))
}

#[async_trait]
impl DisputeRepository for PgDisputeRepository {
    async fn insert(&self, dispute: Dispute) -> Result<(), DisputeError> {
        let record = encode(&dispute)?;
        let result = sqlx::query(
            "INSERT INTO disputes (id, order_id, buyer_id, seller_id, status, version,
             record, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
             ON CONFLICT (order_id) DO NOTHING",
        )
        .bind(dispute.id.as_uuid())
        .bind(dispute.order_id.as_uuid())
        .bind(dispute.buyer_id.as_uuid())
        .bind(dispute.seller_id.as_uuid())
        .bind(dispute.status.as_str())
        .bind(dispute.version as i64)
        .bind(record)
        .bind(dispute.created_at.as_datetime())
        .bind(dispute.updated_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(storage)?;

        if result.rows_affected() == 0 {
            return match self.find_by_order(&dispute.order_id).await? {
                Some(existing) => Err(DisputeError::DuplicateDispute {
                    order_id: dispute.order_id,
                    existing: existing.id,
                }),
                // The conflicting row vanished between the insert and the lookup.
                None => Err(DisputeError::Storage(format!(
                    "insert of dispute for {} conflicted but no row was found",
                    dispute.order_id
                ))),
            };
        }
        Ok(())
    }

    async fn get(&self, id: &DisputeId) -> Result<Option<Dispute>, DisputeError> {
        sqlx::query_as::<_, DisputeRow>("SELECT id, record FROM disputes WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(storage)?
            .map(DisputeRow::into_dispute)
            .transpose()
    }

    async fn find_by_order(&self, order_id: &OrderId) -> Result<Option<Dispute>, DisputeError> {
        sqlx::query_as::<_, DisputeRow>("SELECT id, record FROM disputes WHERE order_id = $1")
            .bind(order_id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(storage)?
            .map(DisputeRow::into_dispute)
            .transpose()
    }

    async fn list(&self, filter: &DisputeFilter) -> Result<Vec<Dispute>, DisputeError> {
        let rows = sqlx::query_as::<_, DisputeRow>(
            "SELECT id, record FROM disputes
             WHERE ($1::text IS NULL OR status = $1)
               AND ($2::uuid IS NULL OR buyer_id = $2 OR seller_id = $2)
             ORDER BY created_at, id",
        )
        .bind(filter.status.map(|s| s.as_str()))
        .bind(filter.party.map(|p| *p.as_uuid()))
        .fetch_all(&self.pool)
        .await
        .map_err(storage)?;

        rows.into_iter().map(DisputeRow::into_dispute).collect()
    }

    async fn modify(&self, id: &DisputeId, mutation: Mutation<'_>) -> Result<Dispute, DisputeError> {
        let mut tx = self.pool.begin().await.map_err(storage)?;

        // Dropping `tx` on any early return rolls back and releases the lock.
        let row = sqlx::query_as::<_, DisputeRow>(
            "SELECT id, record FROM disputes WHERE id = $1 FOR UPDATE",
        )
        .bind(id.as_uuid())
        .fetch_optional(&mut *tx)
        .await
        .map_err(storage)?
        .ok_or(DisputeError::DisputeNotFound(*id))?;

        let mut dispute = row.into_dispute()?;
        mutation(&mut dispute)?;

        sqlx::query(
            "UPDATE disputes SET status = $2, version = $3, record = $4, updated_at = $5
             WHERE id = $1",
        )
        .bind(id.as_uuid())
        .bind(dispute.status.as_str())
        .bind(dispute.version as i64)
        .bind(encode(&dispute)?)
        .bind(dispute.updated_at.as_datetime())
        .execute(&mut *tx)
        .await
        .map_err(storage)?;

        tx.commit().await.map_err(storage)?;
        Ok(dispute)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kome_core::{Timestamp, UserId};
    use kome_dispute::{DisputeStatus, Filing};

    fn sample() -> Dispute {
        let buyer = UserId::new();
        Dispute::file(
            Filing {
                order_id: OrderId::new(),
                buyer_id: buyer,
                seller_id: UserId::new(),
                filed_by: buyer,
                filer_name: "Tanaka".into(),
                reason: "Short weight".into(),
                statement: "Bag weighed 4.2kg, not 5kg.".into(),
                jury_size: 5,
                require_review: false,
            },
            Timestamp::now(),
        )
        .unwrap()
    }

    #[test]
    fn row_decodes_stored_record() {
        let dispute = sample();
        let row = DisputeRow {
            id: *dispute.id.as_uuid(),
            record: encode(&dispute).unwrap(),
        };
        assert_eq!(row.into_dispute().unwrap(), dispute);
    }

    #[test]
    fn corrupt_record_is_storage_error() {
        let row = DisputeRow {
            id: Uuid::new_v4(),
            record: serde_json::json!({"status": "in_chat"}),
        };
        assert!(matches!(row.into_dispute(), Err(DisputeError::Storage(_))));
    }

    /// Exercises the repository against a real database. Skipped unless
    /// `KOME_TEST_DATABASE_URL` is set.
    #[tokio::test]
    async fn postgres_round_trip_and_duplicate() {
        let Ok(url) = std::env::var("KOME_TEST_DATABASE_URL") else {
            return;
        };
        let pool = crate::db::init_pool(&url).await.unwrap();
        let repo = PgDisputeRepository::new(pool);

        let dispute = sample();
        repo.insert(dispute.clone()).await.unwrap();
        assert_eq!(repo.get(&dispute.id).await.unwrap(), Some(dispute.clone()));

        let mut again = sample();
        again.order_id = dispute.order_id;
        assert!(matches!(
            repo.insert(again).await,
            Err(DisputeError::DuplicateDispute { .. })
        ));

        let updated = repo
            .modify(
                &dispute.id,
                Box::new(|d: &mut Dispute| {
                    d.status = DisputeStatus::InJury;
                    Ok(())
                }),
            )
            .await
            .unwrap();
        assert_eq!(updated.status, DisputeStatus::InJury);
        let listed = repo
            .list(&DisputeFilter::with_status(DisputeStatus::InJury))
            .await
            .unwrap();
        assert!(listed.iter().any(|d| d.id == dispute.id));
    }
}
