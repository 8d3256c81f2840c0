//! # Branch Repository
//!
//! Branches and the per-company warehouse.
//!
//! The warehouse is a branch flagged `is_warehouse`; its stock lives under
//! `WAREHOUSE:<branch id>` while every other branch uses `BRANCH:<branch id>`.
//!
//! ## Warehouse Rules
//! - At most one *active* warehouse per company
//! - A warehouse holding stock cannot be deactivated or demoted
//! - A branch holding stock cannot be promoted; its `BRANCH:<id>` balances
//!   would no longer be reachable under the new location

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info, warn};

use crate::error::{DbError, DbResult};
use crate::pool::BEGIN_IMMEDIATE;
use crate::stock;
use kardex_core::validation::validate_branch_name;
use kardex_core::{Branch, CoreError};

const SELECT_BRANCH: &str =
    "SELECT id, company_id, name, is_warehouse, is_active, created_at FROM branches";

#[derive(Debug, Clone)]
pub struct BranchRepository {
    pool: SqlitePool,
}

impl BranchRepository {
    pub fn new(pool: SqlitePool) -> Self {
        BranchRepository { pool }
    }

    /// Creates an active branch.
    ///
    /// ## Errors
    /// - [`CoreError::WarehouseConflict`] when `is_warehouse` is set and the
    ///   company already has an active warehouse
    /// - [`DbError::UniqueViolation`] for a duplicate name in the company
    pub async fn create(&self, company_id: i64, name: &str, is_warehouse: bool) -> DbResult<Branch> {
        let name = validate_branch_name(name)?;

        let mut tx = self.pool.begin_with(BEGIN_IMMEDIATE).await?;

        if is_warehouse {
            ensure_no_other_warehouse(&mut tx, company_id, None).await?;
        }

        let branch = sqlx::query_as::<_, Branch>(
            r#"
            INSERT INTO branches (company_id, name, is_warehouse, is_active, created_at)
            VALUES (?1, ?2, ?3, 1, ?4)
            RETURNING id, company_id, name, is_warehouse, is_active, created_at
            "#,
        )
        .bind(company_id)
        .bind(&name)
        .bind(is_warehouse)
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await
        .map_err(|err| match DbError::from(err) {
            DbError::UniqueViolation { .. } => DbError::duplicate("name", name.clone()),
            other => other,
        })?;

        tx.commit().await?;

        info!(branch_id = branch.id, company_id, is_warehouse, "Branch created");
        Ok(branch)
    }

    pub async fn get_by_id(&self, company_id: i64, id: i64) -> DbResult<Option<Branch>> {
        let mut conn = self.pool.acquire().await?;
        fetch_branch(&mut conn, company_id, id).await
    }

    /// The branch if it is active, otherwise [`CoreError::BranchNotFound`].
    pub async fn get_active(&self, company_id: i64, id: i64) -> DbResult<Branch> {
        let mut conn = self.pool.acquire().await?;
        fetch_active_branch(&mut conn, company_id, id).await
    }

    pub async fn active_warehouse(&self, company_id: i64) -> DbResult<Option<Branch>> {
        let mut conn = self.pool.acquire().await?;
        fetch_active_warehouse(&mut conn, company_id).await
    }

    /// Active branches, warehouse first, then by name.
    pub async fn list_active(&self, company_id: i64) -> DbResult<Vec<Branch>> {
        let sql = format!(
            "{SELECT_BRANCH} WHERE company_id = ?1 AND is_active = 1 ORDER BY is_warehouse DESC, name"
        );
        let branches = sqlx::query_as::<_, Branch>(&sql)
            .bind(company_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(branches)
    }

    /// Sets or clears the warehouse flag.
    ///
    /// ## Errors
    /// - [`CoreError::WarehouseConflict`] when promoting while another
    ///   active warehouse exists
    /// - [`CoreError::WarehouseHasStock`] when the branch still holds stock
    ///   at its current location, in either direction
    pub async fn set_warehouse(&self, company_id: i64, id: i64, is_warehouse: bool) -> DbResult<Branch> {
        let mut tx = self.pool.begin_with(BEGIN_IMMEDIATE).await?;

        let branch = fetch_branch(&mut tx, company_id, id)
            .await?
            .ok_or_else(|| DbError::from(CoreError::BranchNotFound(id)))?;

        if branch.is_warehouse == is_warehouse {
            return Ok(branch);
        }

        if is_warehouse && branch.is_active {
            ensure_no_other_warehouse(&mut tx, company_id, Some(id)).await?;
        }

        if stock::location_has_stock(&mut tx, company_id, id).await? {
            warn!(branch_id = id, is_warehouse, "Refusing to re-flag branch holding stock");
            return Err(CoreError::WarehouseHasStock { branch_id: id }.into());
        }

        let updated = update_flags(&mut tx, company_id, id, is_warehouse, branch.is_active).await?;
        tx.commit().await?;

        info!(branch_id = id, is_warehouse, "Warehouse flag changed");
        Ok(updated)
    }

    /// Flips `is_active`.
    ///
    /// ## Errors
    /// - [`CoreError::WarehouseHasStock`] when deactivating a warehouse with stock
    /// - [`CoreError::WarehouseConflict`] when reactivating a warehouse while
    ///   another one is active
    pub async fn toggle_active(&self, company_id: i64, id: i64) -> DbResult<Branch> {
        let mut tx = self.pool.begin_with(BEGIN_IMMEDIATE).await?;

        let branch = fetch_branch(&mut tx, company_id, id)
            .await?
            .ok_or_else(|| DbError::from(CoreError::BranchNotFound(id)))?;

        let activate = !branch.is_active;

        if branch.is_warehouse {
            if activate {
                ensure_no_other_warehouse(&mut tx, company_id, Some(id)).await?;
            } else if stock::location_has_stock(&mut tx, company_id, id).await? {
                warn!(branch_id = id, "Refusing to deactivate warehouse holding stock");
                return Err(CoreError::WarehouseHasStock { branch_id: id }.into());
            }
        }

        let updated = update_flags(&mut tx, company_id, id, branch.is_warehouse, activate).await?;
        tx.commit().await?;

        info!(branch_id = id, active = activate, "Branch activation changed");
        Ok(updated)
    }
}

// =============================================================================
// Connection-level helpers
// =============================================================================

pub(crate) async fn fetch_branch(
    conn: &mut SqliteConnection,
    company_id: i64,
    id: i64,
) -> DbResult<Option<Branch>> {
    debug!(company_id, id, "Getting branch");

    let sql = format!("{SELECT_BRANCH} WHERE company_id = ?1 AND id = ?2");
    let branch = sqlx::query_as::<_, Branch>(&sql)
        .bind(company_id)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

    Ok(branch)
}

pub(crate) async fn fetch_active_branch(
    conn: &mut SqliteConnection,
    company_id: i64,
    id: i64,
) -> DbResult<Branch> {
    match fetch_branch(conn, company_id, id).await? {
        Some(branch) if branch.is_active => Ok(branch),
        _ => Err(CoreError::BranchNotFound(id).into()),
    }
}

pub(crate) async fn fetch_active_warehouse(
    conn: &mut SqliteConnection,
    company_id: i64,
) -> DbResult<Option<Branch>> {
    let sql = format!(
        "{SELECT_BRANCH} WHERE company_id = ?1 AND is_warehouse = 1 AND is_active = 1 ORDER BY id LIMIT 1"
    );
    let branch = sqlx::query_as::<_, Branch>(&sql)
        .bind(company_id)
        .fetch_optional(&mut *conn)
        .await?;

    Ok(branch)
}

async fn ensure_no_other_warehouse(
    conn: &mut SqliteConnection,
    company_id: i64,
    except_id: Option<i64>,
) -> DbResult<()> {
    if let Some(existing) = fetch_active_warehouse(conn, company_id).await? {
        if Some(existing.id) != except_id {
            return Err(CoreError::WarehouseConflict {
                existing_id: existing.id,
            }
            .into());
        }
    }

    Ok(())
}

async fn update_flags(
    conn: &mut SqliteConnection,
    company_id: i64,
    id: i64,
    is_warehouse: bool,
    is_active: bool,
) -> DbResult<Branch> {
    let branch = sqlx::query_as::<_, Branch>(
        r#"
        UPDATE branches SET is_warehouse = ?3, is_active = ?4
        WHERE company_id = ?1 AND id = ?2
        RETURNING id, company_id, name, is_warehouse, is_active, created_at
        "#,
    )
    .bind(company_id)
    .bind(id)
    .bind(is_warehouse)
    .bind(is_active)
    .fetch_one(&mut *conn)
    .await?;

    Ok(branch)
}

// =============================================================================
// Unit Tests
// =============================================================================
