//! # Inventory Repository
//!
//! Balance queries, the kardex report, and the back-office flows that move
//! stock outside of sales and transfers.
//!
//! ## Back-office Flows
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  receive_purchase   active warehouse only   add_stock(PURCHASE_IN)     │
//! │  record_opening     any active location     add_stock(OPENING)         │
//! │  adjust_stock  +q   any active location     add_stock(ADJUST)          │
//! │  adjust_stock  -q   any active location     remove_stock(ADJUST)       │
//! │  record_loss        any active location     remove_stock(SHRINKAGE |   │
//! │                                                          DAMAGE)       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Each flow checks the product and location, then calls the Stock Engine
//! inside one transaction. Manual corrections never bypass the engine, so
//! they can never drive a balance negative.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use tracing::{debug, info};

use crate::error::DbResult;
use crate::pool::BEGIN_IMMEDIATE;
use crate::repository::branch::fetch_active_branch;
use crate::repository::branch::fetch_active_warehouse;
use crate::repository::product::fetch_active_product;
use crate::stock::{self, BalanceMismatch, StockChange};
use kardex_core::validation::{validate_search_query, validate_positive_qty};
use kardex_core::{
    Branch, CoreError, InventoryBalance, KardexMovement, Location, MoveType, Quantity, UnitCost,
    ValidationError, DEFAULT_KARDEX_DAYS, KARDEX_LIST_LIMIT, STOCK_LIST_LIMIT,
};

/// Default note on warehouse receipts.
pub const RECEIPT_NOTE: &str = "Warehouse receipt";

// =============================================================================
// Query Types
// =============================================================================

/// One product's balance at one location. A missing balance reads as zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct StockListRow {
    pub product_id: i64,
    pub name: String,
    pub sku: Option<String>,
    pub barcode: Option<String>,
    pub qty: Quantity,
}

/// Filters for the kardex report.
///
/// Dates are whole days; `to` is inclusive. Without dates the report covers
/// the last seven days including today.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KardexFilter {
    pub company_id: i64,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub product_id: Option<i64>,
    pub move_type: Option<MoveType>,
    /// Matches movements where the branch is source or destination.
    pub location_id: Option<i64>,
}

impl KardexFilter {
    pub fn for_company(company_id: i64) -> Self {
        KardexFilter {
            company_id,
            ..Default::default()
        }
    }

    pub fn between(mut self, from: NaiveDate, to: NaiveDate) -> Self {
        self.from = Some(from);
        self.to = Some(to);
        self
    }

    pub fn product(mut self, product_id: i64) -> Self {
        self.product_id = Some(product_id);
        self
    }

    pub fn move_type(mut self, move_type: MoveType) -> Self {
        self.move_type = Some(move_type);
        self
    }

    pub fn location(mut self, location_id: i64) -> Self {
        self.location_id = Some(location_id);
        self
    }

    /// Half-open `[start, end)` timestamps for the filter's days.
    pub fn time_range(&self, today: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
        let to = self.to.unwrap_or(today);
        let from = self
            .from
            .unwrap_or_else(|| to - chrono::Duration::days(DEFAULT_KARDEX_DAYS - 1));
        let end = to.succ_opt().unwrap_or(NaiveDate::MAX);

        (
            from.and_time(NaiveTime::MIN).and_utc(),
            end.and_time(NaiveTime::MIN).and_utc(),
        )
    }
}

// =============================================================================
// Repository
// =============================================================================

#[derive(Debug, Clone)]
pub struct InventoryRepository {
    pool: SqlitePool,
}

impl InventoryRepository {
    pub fn new(pool: SqlitePool) -> Self {
        InventoryRepository { pool }
    }

    /// Current quantity; zero when no balance row exists.
    pub async fn balance(&self, company_id: i64, product_id: i64, location: Location) -> DbResult<Quantity> {
        let mut conn = self.pool.acquire().await?;
        stock::balance(&mut conn, company_id, product_id, location).await
    }

    /// The stored balance row, if one was ever created.
    pub async fn get_balance(
        &self,
        company_id: i64,
        product_id: i64,
        location: Location,
    ) -> DbResult<Option<InventoryBalance>> {
        let balance = sqlx::query_as::<_, InventoryBalance>(
            r#"
            SELECT id, company_id, product_id, location_type, location_id, qty, updated_at
            FROM inventories
            WHERE company_id = ?1 AND product_id = ?2
              AND location_type = ?3 AND location_id = ?4
            "#,
        )
        .bind(company_id)
        .bind(product_id)
        .bind(location.kind)
        .bind(location.id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(balance)
    }

    /// Active products with their quantity at `location`.
    ///
    /// ## Arguments
    /// * `query` - optional name / SKU / barcode fragment
    /// * `only_low` - keep rows with quantity at or below zero
    pub async fn stock_list(
        &self,
        company_id: i64,
        location: Location,
        query: &str,
        only_low: bool,
    ) -> DbResult<Vec<StockListRow>> {
        let query = validate_search_query(query)?;

        debug!(company_id, %location, query = %query, only_low, "Listing stock");

        let rows = sqlx::query_as::<_, StockListRow>(
            r#"
            SELECT p.id AS product_id, p.name, p.sku, p.barcode,
                   COALESCE(i.qty, 0) AS qty
            FROM products p
            LEFT JOIN inventories i
                   ON i.company_id = p.company_id
                  AND i.product_id = p.id
                  AND i.location_type = ?2
                  AND i.location_id = ?3
            WHERE p.company_id = ?1 AND p.is_active = 1
              AND (?4 = ''
                   OR instr(lower(p.name), lower(?4)) > 0
                   OR instr(lower(COALESCE(p.sku, '')), lower(?4)) > 0
                   OR instr(lower(COALESCE(p.barcode, '')), lower(?4)) > 0)
              AND (?5 = 0 OR COALESCE(i.qty, 0) <= 0)
            ORDER BY p.name ASC
            LIMIT ?6
            "#,
        )
        .bind(company_id)
        .bind(location.kind)
        .bind(location.id)
        .bind(&query)
        .bind(only_low)
        .bind(STOCK_LIST_LIMIT)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Kardex report, newest first, capped at 300 rows.
    pub async fn kardex(&self, filter: &KardexFilter) -> DbResult<Vec<KardexMovement>> {
        let (start, end) = filter.time_range(Utc::now().date_naive());

        debug!(
            company_id = filter.company_id,
            %start,
            %end,
            product_id = ?filter.product_id,
            move_type = ?filter.move_type,
            location_id = ?filter.location_id,
            "Listing kardex"
        );

        let mut qb = QueryBuilder::<Sqlite>::new(
            r#"
            SELECT id, company_id, product_id, move_type,
                   from_location_type, from_location_id,
                   to_location_type, to_location_id,
                   qty, unit_cost, note, created_at
            FROM kardex_movements
            WHERE company_id = "#,
        );
        qb.push_bind(filter.company_id);
        qb.push(" AND created_at >= ").push_bind(start);
        qb.push(" AND created_at < ").push_bind(end);

        if let Some(product_id) = filter.product_id {
            qb.push(" AND product_id = ").push_bind(product_id);
        }
        if let Some(move_type) = filter.move_type {
            qb.push(" AND move_type = ").push_bind(move_type);
        }
        if let Some(location_id) = filter.location_id {
            qb.push(" AND (from_location_id = ")
                .push_bind(location_id)
                .push(" OR to_location_id = ")
                .push_bind(location_id)
                .push(")");
        }

        qb.push(" ORDER BY created_at DESC, id DESC LIMIT ")
            .push_bind(KARDEX_LIST_LIMIT);

        let movements = qb
            .build_query_as::<KardexMovement>()
            .fetch_all(&self.pool)
            .await?;

        Ok(movements)
    }

    /// Purchase receipt into the company's active warehouse.
    ///
    /// ## Errors
    /// - [`CoreError::WarehouseNotFound`] when `warehouse_id` is not the active warehouse
    /// - [`CoreError::ProductNotFound`] for an unknown or inactive product
    pub async fn receive_purchase(
        &self,
        company_id: i64,
        warehouse_id: i64,
        product_id: i64,
        qty: Quantity,
        unit_cost: Option<UnitCost>,
        note: Option<&str>,
    ) -> DbResult<StockChange> {
        validate_positive_qty(qty)?;

        let mut tx = self.pool.begin_with(BEGIN_IMMEDIATE).await?;

        let warehouse = match fetch_active_warehouse(&mut tx, company_id).await? {
            Some(warehouse) if warehouse.id == warehouse_id => warehouse,
            _ => return Err(CoreError::WarehouseNotFound(warehouse_id).into()),
        };
        fetch_active_product(&mut tx, company_id, product_id).await?;

        let note = note.map(str::trim).filter(|n| !n.is_empty()).unwrap_or(RECEIPT_NOTE);
        let change = stock::add_stock(
            &mut tx,
            company_id,
            product_id,
            warehouse.location(),
            qty,
            MoveType::PurchaseIn,
            Some(note),
            unit_cost,
        )
        .await?;

        tx.commit().await?;

        info!(company_id, product_id, warehouse_id, %qty, "Purchase received");
        Ok(change)
    }

    /// Initial stock load at any active location.
    pub async fn record_opening(
        &self,
        company_id: i64,
        product_id: i64,
        location: Location,
        qty: Quantity,
        unit_cost: Option<UnitCost>,
        note: Option<&str>,
    ) -> DbResult<StockChange> {
        validate_positive_qty(qty)?;

        let mut tx = self.pool.begin_with(BEGIN_IMMEDIATE).await?;

        check_location(&mut tx, company_id, location).await?;
        fetch_active_product(&mut tx, company_id, product_id).await?;

        let change = stock::add_stock(
            &mut tx,
            company_id,
            product_id,
            location,
            qty,
            MoveType::Opening,
            note,
            unit_cost,
        )
        .await?;

        tx.commit().await?;

        info!(company_id, product_id, %location, %qty, "Opening stock recorded");
        Ok(change)
    }

    /// Manual correction by a signed delta.
    ///
    /// Positive deltas add stock, negative deltas remove it and fail with
    /// [`CoreError::InsufficientStock`] rather than going below zero.
    ///
    /// ## Example
    /// ```rust,ignore
    /// // Counted 2.5 fewer than the system shows
    /// let delta = Quantity::normalize_signed("-2,5");
    /// db.inventory().adjust_stock(company_id, product_id, branch.location(), delta, Some("count")).await?;
    /// ```
    pub async fn adjust_stock(
        &self,
        company_id: i64,
        product_id: i64,
        location: Location,
        delta: Quantity,
        note: Option<&str>,
    ) -> DbResult<StockChange> {
        if delta.is_zero() {
            return Err(ValidationError::MustNotBeZero {
                field: "delta".to_string(),
            }
            .into());
        }

        let mut tx = self.pool.begin_with(BEGIN_IMMEDIATE).await?;

        check_location(&mut tx, company_id, location).await?;
        fetch_active_product(&mut tx, company_id, product_id).await?;

        let change = if delta.is_positive() {
            stock::add_stock(
                &mut tx,
                company_id,
                product_id,
                location,
                delta,
                MoveType::Adjust,
                note,
                None,
            )
            .await?
        } else {
            stock::remove_stock(
                &mut tx,
                company_id,
                product_id,
                location,
                delta.abs(),
                MoveType::Adjust,
                note,
            )
            .await?
        };

        tx.commit().await?;

        info!(company_id, product_id, %location, %delta, "Stock adjusted");
        Ok(change)
    }

    /// Shrinkage or damage write-off.
    ///
    /// ## Errors
    /// [`ValidationError::NotAllowed`] for any other move type.
    pub async fn record_loss(
        &self,
        company_id: i64,
        product_id: i64,
        location: Location,
        qty: Quantity,
        move_type: MoveType,
        note: Option<&str>,
    ) -> DbResult<StockChange> {
        if !move_type.is_loss() {
            return Err(ValidationError::NotAllowed {
                field: "move_type".to_string(),
                allowed: vec![
                    MoveType::Shrinkage.to_string(),
                    MoveType::Damage.to_string(),
                ],
            }
            .into());
        }
        validate_positive_qty(qty)?;

        let mut tx = self.pool.begin_with(BEGIN_IMMEDIATE).await?;

        check_location(&mut tx, company_id, location).await?;
        fetch_active_product(&mut tx, company_id, product_id).await?;

        let change = stock::remove_stock(
            &mut tx, company_id, product_id, location, qty, move_type, note,
        )
        .await?;

        tx.commit().await?;

        info!(company_id, product_id, %location, %qty, %move_type, "Stock loss recorded");
        Ok(change)
    }

    /// Balance recomputed from the ledger alone.
    pub async fn ledger_balance(
        &self,
        company_id: i64,
        product_id: i64,
        location: Location,
    ) -> DbResult<Quantity> {
        let mut conn = self.pool.acquire().await?;
        stock::ledger_balance(&mut conn, company_id, product_id, location).await
    }

    /// Stored balances that disagree with the ledger. Empty when healthy.
    pub async fn verify_balances(&self, company_id: i64) -> DbResult<Vec<BalanceMismatch>> {
        let mut conn = self.pool.acquire().await?;
        stock::verify_balances(&mut conn, company_id).await
    }
}

/// `location` must be an active branch of the company whose warehouse flag
/// matches the location kind.
async fn check_location(
    conn: &mut SqliteConnection,
    company_id: i64,
    location: Location,
) -> DbResult<Branch> {
    let branch = fetch_active_branch(conn, company_id, location.id).await?;

    if branch.location() != location {
        return Err(CoreError::BranchNotFound(location.id).into());
    }

    Ok(branch)
}

// =============================================================================
// Unit Tests
// =============================================================================
