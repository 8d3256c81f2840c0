//! # Sync Event Repository
//!
//! Outbound event log written alongside every stock-affecting document.
//!
//! ## Event Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Sync Event Log                                       │
//! │                                                                         │
//! │  checkout / sale edit / sale delete / transfer confirm                 │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                   SAME TRANSACTION                              │   │
//! │  │  1. document rows + Stock Engine calls                         │   │
//! │  │  2. INSERT INTO sync_events (.., status = 'PENDING')           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  PENDING ──► SENT ──► APPLIED                                          │
//! │     │          │                                                        │
//! │     └──────────┴──► ERROR (last_error set, retried by get_pending)     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! This is a log only. Nothing here merges or resolves conflicts.

use chrono::{Duration, Utc};
use serde::Serialize;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use kardex_core::{SyncAction, SyncEntity, SyncEvent, SyncEventStatus};

const SELECT_EVENT: &str = r#"
    SELECT id, company_id, branch_id, entity, entity_id, action, payload_json,
           status, last_error, created_at, updated_at
    FROM sync_events
"#;

/// Events per status, for the sync indicator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct SyncStatusCount {
    pub status: SyncEventStatus,
    pub count: i64,
}

/// Repository for sync event operations.
#[derive(Debug, Clone)]
pub struct SyncEventRepository {
    pool: SqlitePool,
}

impl SyncEventRepository {
    pub fn new(pool: SqlitePool) -> Self {
        SyncEventRepository { pool }
    }

    /// Pending and failed events, oldest first.
    pub async fn get_pending(&self, company_id: i64, limit: u32) -> DbResult<Vec<SyncEvent>> {
        let sql = format!(
            "{SELECT_EVENT} WHERE company_id = ?1 AND status IN ('PENDING', 'ERROR') \
             ORDER BY created_at ASC, id ASC LIMIT ?2"
        );
        let events = sqlx::query_as::<_, SyncEvent>(&sql)
            .bind(company_id)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        Ok(events)
    }

    /// Events for one entity, oldest first.
    pub async fn for_entity(
        &self,
        company_id: i64,
        entity: SyncEntity,
        entity_id: i64,
    ) -> DbResult<Vec<SyncEvent>> {
        let sql = format!(
            "{SELECT_EVENT} WHERE company_id = ?1 AND entity = ?2 AND entity_id = ?3 \
             ORDER BY created_at ASC, rowid ASC"
        );
        let events = sqlx::query_as::<_, SyncEvent>(&sql)
            .bind(company_id)
            .bind(entity)
            .bind(entity_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(events)
    }

    pub async fn mark_sent(&self, id: &str) -> DbResult<()> {
        self.set_status(id, SyncEventStatus::Sent, None).await
    }

    pub async fn mark_applied(&self, id: &str) -> DbResult<()> {
        self.set_status(id, SyncEventStatus::Applied, None).await
    }

    /// Records a delivery failure.
    pub async fn mark_failed(&self, id: &str, error: &str) -> DbResult<()> {
        self.set_status(id, SyncEventStatus::Error, Some(error)).await
    }

    /// Per-status counts for a company, optionally narrowed to one branch.
    pub async fn status_counts(
        &self,
        company_id: i64,
        branch_id: Option<i64>,
    ) -> DbResult<Vec<SyncStatusCount>> {
        let counts = sqlx::query_as::<_, SyncStatusCount>(
            r#"
            SELECT status, COUNT(*) AS count
            FROM sync_events
            WHERE company_id = ?1 AND (?2 IS NULL OR branch_id = ?2)
            GROUP BY status
            ORDER BY status
            "#,
        )
        .bind(company_id)
        .bind(branch_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(counts)
    }

    /// Deletes applied events older than `days_old` days.
    ///
    /// ## Returns
    /// Number of deleted events.
    pub async fn cleanup_applied(&self, days_old: u32) -> DbResult<u64> {
        let cutoff = Utc::now() - Duration::days(i64::from(days_old));

        let result = sqlx::query("DELETE FROM sync_events WHERE status = 'APPLIED' AND updated_at < ?1")
            .bind(cutoff)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    async fn set_status(&self, id: &str, status: SyncEventStatus, error: Option<&str>) -> DbResult<()> {
        debug!(id = %id, %status, "Updating sync event");

        let result = sqlx::query(
            r#"
            UPDATE sync_events
            SET status = ?2, last_error = ?3, updated_at = ?4
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(status)
        .bind(error)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("SyncEvent", id));
        }

        Ok(())
    }
}

/// Queues an event on the caller's connection, inside its transaction.
///
/// ## Example
/// ```rust,ignore
/// enqueue(&mut tx, company_id, Some(branch_id), SyncEntity::Sale,
///         Some(sale.id), SyncAction::Create, &document).await?;
/// ```
pub(crate) async fn enqueue<T: Serialize>(
    conn: &mut SqliteConnection,
    company_id: i64,
    branch_id: Option<i64>,
    entity: SyncEntity,
    entity_id: Option<i64>,
    action: SyncAction,
    payload: &T,
) -> DbResult<SyncEvent> {
    let payload_json = serde_json::to_string(payload)?;
    let now = Utc::now();

    debug!(company_id, %entity, ?entity_id, %action, "Queuing sync event");

    let event = sqlx::query_as::<_, SyncEvent>(
        r#"
        INSERT INTO sync_events (
            id, company_id, branch_id, entity, entity_id, action,
            payload_json, status, last_error, created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 'PENDING', NULL, ?8, ?8)
        RETURNING id, company_id, branch_id, entity, entity_id, action, payload_json,
                  status, last_error, created_at, updated_at
        "#,
    )
    .bind(Uuid::new_v4().to_string())
    .bind(company_id)
    .bind(branch_id)
    .bind(entity)
    .bind(entity_id)
    .bind(action)
    .bind(payload_json)
    .bind(now)
    .fetch_one(&mut *conn)
    .await?;

    Ok(event)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};

    #[tokio::test]
    async fn test_event_lifecycle() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let company = db.companies().create("Acme").await.unwrap();

        let event = {
            let mut conn = db.pool().acquire().await.unwrap();
            enqueue(
                &mut conn,
                company.id,
                None,
                SyncEntity::Inventory,
                Some(42),
                SyncAction::Update,
                &serde_json::json!({ "qty": "1.500" }),
            )
            .await
            .unwrap()
        };
        assert_eq!(event.status, SyncEventStatus::Pending);
        assert_eq!(event.payload_json.as_deref(), Some(r#"{"qty":"1.500"}"#));

        let repo = db.sync_events();
        assert_eq!(repo.get_pending(company.id, 10).await.unwrap().len(), 1);

        repo.mark_failed(&event.id, "timeout").await.unwrap();
        let pending = repo.get_pending(company.id, 10).await.unwrap();
        assert_eq!(pending[0].last_error.as_deref(), Some("timeout"));

        repo.mark_sent(&event.id).await.unwrap();
        repo.mark_applied(&event.id).await.unwrap();
        assert!(repo.get_pending(company.id, 10).await.unwrap().is_empty());

        let counts = repo.status_counts(company.id, None).await.unwrap();
        assert_eq!(
            counts,
            vec![SyncStatusCount {
                status: SyncEventStatus::Applied,
                count: 1
            }]
        );

        assert_eq!(repo.cleanup_applied(30).await.unwrap(), 0);
        assert!(repo.mark_sent("missing").await.is_err());
    }
}
