//! # Stock Engine
//!
//! The only code that changes inventory balances or writes kardex rows.
//!
//! ## Operations
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          Stock Engine                                   │
//! │                                                                         │
//! │  add_stock(loc, q)        balance(loc) += q     kardex: → loc          │
//! │  remove_stock(loc, q)     balance(loc) -= q     kardex: loc →          │
//! │  transfer_stock(a, b, q)  balance(a) -= q       kardex: a → b          │
//! │                           balance(b) += q       (one row)              │
//! │                                                                         │
//! │  Each call:                                                             │
//! │   1. validates q > 0 before writing anything                           │
//! │   2. opens a transaction, or a SAVEPOINT when the caller already       │
//! │      holds one, so balance and ledger land together or not at all      │
//! │   3. decrements with  UPDATE .. SET qty = qty - q WHERE qty >= q       │
//! │      zero rows touched  → InsufficientStock, nothing persisted         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Consistency
//! For every `(company, product, location)`:
//! `balance = Σ qty where location is destination − Σ qty where it is source`.
//! [`verify_balances`] checks this against the stored balances.
//!
//! ## Concurrency
//! The decrement is a single conditional statement, so two sales racing for
//! the last unit cannot both succeed: SQLite serializes writers and the
//! second `UPDATE` sees the already-reduced quantity.
//!
//! Called on a bare connection, each operation starts with a write, so its
//! deferred `BEGIN` takes the write lock on the first statement. Flows that
//! read before they write run inside a `BEGIN IMMEDIATE` transaction
//! (repositories, `Database::begin`) so the loser of a race waits on
//! `busy_timeout` and then sees the new balance.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{Connection, SqliteConnection};
use tracing::{debug, warn};

use kardex_core::validation::{validate_note, validate_positive_qty};
use kardex_core::{
    CoreError, InventoryBalance, KardexMovement, Location, LocationType, MoveType, Quantity,
    UnitCost,
};

use crate::error::DbResult;

// =============================================================================
// Results
// =============================================================================

/// Balance after an inflow/outflow and the ledger row that recorded it.
#[derive(Debug, Clone, Serialize)]
pub struct StockChange {
    pub balance: InventoryBalance,
    pub movement: KardexMovement,
}

/// Both balances after a transfer and its single ledger row.
#[derive(Debug, Clone, Serialize)]
pub struct TransferChange {
    pub from: InventoryBalance,
    pub to: InventoryBalance,
    pub movement: KardexMovement,
}

/// A stored balance that disagrees with the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct BalanceMismatch {
    pub product_id: i64,
    pub location_type: LocationType,
    pub location_id: i64,
    pub stored: Quantity,
    pub ledger: Quantity,
}

impl BalanceMismatch {
    pub fn location(&self) -> Location {
        Location::new(self.location_type, self.location_id)
    }
}

// =============================================================================
// Mutations
// =============================================================================

/// Adds `qty` at `location` and records an inflow row.
///
/// `unit_cost` is stored on the ledger row for valuation (opening stock,
/// purchase receipts); pass `None` for returns and corrections.
#[allow(clippy::too_many_arguments)]
pub async fn add_stock(
    conn: &mut SqliteConnection,
    company_id: i64,
    product_id: i64,
    location: Location,
    qty: Quantity,
    move_type: MoveType,
    note: Option<&str>,
    unit_cost: Option<UnitCost>,
) -> DbResult<StockChange> {
    validate_positive_qty(qty)?;
    let note = validate_note(note)?;

    debug!(company_id, product_id, %location, %qty, %move_type, "Adding stock");

    let now = Utc::now();
    let mut tx = conn.begin().await?;

    let balance = increment_balance(&mut tx, company_id, product_id, location, qty, now).await?;
    let movement = insert_movement(
        &mut tx,
        MovementRow {
            company_id,
            product_id,
            move_type,
            from: None,
            to: Some(location),
            qty,
            unit_cost,
            note: note.as_deref(),
        },
        now,
    )
    .await?;

    tx.commit().await?;
    Ok(StockChange { balance, movement })
}

/// Removes `qty` from `location` and records an outflow row.
///
/// ## Errors
/// [`CoreError::InsufficientStock`] when the balance (or a missing balance,
/// treated as zero) is below `qty`. Nothing is written in that case.
pub async fn remove_stock(
    conn: &mut SqliteConnection,
    company_id: i64,
    product_id: i64,
    location: Location,
    qty: Quantity,
    move_type: MoveType,
    note: Option<&str>,
) -> DbResult<StockChange> {
    validate_positive_qty(qty)?;
    let note = validate_note(note)?;

    debug!(company_id, product_id, %location, %qty, %move_type, "Removing stock");

    let now = Utc::now();
    let mut tx = conn.begin().await?;

    let balance = decrement_balance(&mut tx, company_id, product_id, location, qty, now).await?;
    let movement = insert_movement(
        &mut tx,
        MovementRow {
            company_id,
            product_id,
            move_type,
            from: Some(location),
            to: None,
            qty,
            unit_cost: None,
            note: note.as_deref(),
        },
        now,
    )
    .await?;

    tx.commit().await?;
    Ok(StockChange { balance, movement })
}

/// Moves `qty` from `from` to `to` with a single `TRANSFER` ledger row.
///
/// ## Errors
/// - [`CoreError::SameLocation`] when `from` and `to` are the same place
/// - [`CoreError::InsufficientStock`] when `from` holds less than `qty`;
///   neither balance changes
pub async fn transfer_stock(
    conn: &mut SqliteConnection,
    company_id: i64,
    product_id: i64,
    from: Location,
    to: Location,
    qty: Quantity,
    note: Option<&str>,
) -> DbResult<TransferChange> {
    if from == to {
        return Err(CoreError::SameLocation(from.id).into());
    }
    validate_positive_qty(qty)?;
    let note = validate_note(note)?;

    debug!(company_id, product_id, %from, %to, %qty, "Transferring stock");

    let now = Utc::now();
    let mut tx = conn.begin().await?;

    let from_balance = decrement_balance(&mut tx, company_id, product_id, from, qty, now).await?;
    let to_balance = increment_balance(&mut tx, company_id, product_id, to, qty, now).await?;
    let movement = insert_movement(
        &mut tx,
        MovementRow {
            company_id,
            product_id,
            move_type: MoveType::Transfer,
            from: Some(from),
            to: Some(to),
            qty,
            unit_cost: None,
            note: note.as_deref(),
        },
        now,
    )
    .await?;

    tx.commit().await?;
    Ok(TransferChange {
        from: from_balance,
        to: to_balance,
        movement,
    })
}

// =============================================================================
// Reads
// =============================================================================

/// Current balance; a missing row reads as zero.
pub async fn balance(
    conn: &mut SqliteConnection,
    company_id: i64,
    product_id: i64,
    location: Location,
) -> DbResult<Quantity> {
    let qty: Option<Quantity> = sqlx::query_scalar(
        r#"
        SELECT qty FROM inventories
        WHERE company_id = ?1 AND product_id = ?2
          AND location_type = ?3 AND location_id = ?4
        "#,
    )
    .bind(company_id)
    .bind(product_id)
    .bind(location.kind)
    .bind(location.id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(qty.unwrap_or(Quantity::ZERO))
}

/// Balance derived from the ledger alone.
pub async fn ledger_balance(
    conn: &mut SqliteConnection,
    company_id: i64,
    product_id: i64,
    location: Location,
) -> DbResult<Quantity> {
    let qty: Quantity = sqlx::query_scalar(
        r#"
        SELECT
            COALESCE(SUM(CASE WHEN to_location_type = ?3 AND to_location_id = ?4
                              THEN qty ELSE 0 END), 0)
          - COALESCE(SUM(CASE WHEN from_location_type = ?3 AND from_location_id = ?4
                              THEN qty ELSE 0 END), 0)
        FROM kardex_movements
        WHERE company_id = ?1 AND product_id = ?2
        "#,
    )
    .bind(company_id)
    .bind(product_id)
    .bind(location.kind)
    .bind(location.id)
    .fetch_one(&mut *conn)
    .await?;

    Ok(qty)
}

/// Whether any product has a positive balance at branch `location_id`
/// (either location kind).
pub async fn location_has_stock(
    conn: &mut SqliteConnection,
    company_id: i64,
    location_id: i64,
) -> DbResult<bool> {
    let found: Option<i64> = sqlx::query_scalar(
        r#"
        SELECT 1 FROM inventories
        WHERE company_id = ?1 AND location_id = ?2 AND qty > 0
        LIMIT 1
        "#,
    )
    .bind(company_id)
    .bind(location_id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(found.is_some())
}

/// Every stored balance of the company whose ledger sum differs.
///
/// An empty result means balances and kardex agree.
pub async fn verify_balances(
    conn: &mut SqliteConnection,
    company_id: i64,
) -> DbResult<Vec<BalanceMismatch>> {
    let rows: Vec<BalanceMismatch> = sqlx::query_as(
        r#"
        SELECT product_id, location_type, location_id, stored, ledger
        FROM (
            SELECT
                i.product_id,
                i.location_type,
                i.location_id,
                i.qty AS stored,
                COALESCE((SELECT SUM(k.qty) FROM kardex_movements k
                          WHERE k.company_id = i.company_id AND k.product_id = i.product_id
                            AND k.to_location_type = i.location_type
                            AND k.to_location_id = i.location_id), 0)
              - COALESCE((SELECT SUM(k.qty) FROM kardex_movements k
                          WHERE k.company_id = i.company_id AND k.product_id = i.product_id
                            AND k.from_location_type = i.location_type
                            AND k.from_location_id = i.location_id), 0) AS ledger
            FROM inventories i
            WHERE i.company_id = ?1
        )
        WHERE stored <> ledger
        ORDER BY product_id, location_type, location_id
        "#,
    )
    .bind(company_id)
    .fetch_all(&mut *conn)
    .await?;

    if !rows.is_empty() {
        warn!(company_id, mismatches = rows.len(), "Balances disagree with kardex");
    }

    Ok(rows)
}

// =============================================================================
// Internals
// =============================================================================

struct MovementRow<'a> {
    company_id: i64,
    product_id: i64,
    move_type: MoveType,
    from: Option<Location>,
    to: Option<Location>,
    qty: Quantity,
    unit_cost: Option<UnitCost>,
    note: Option<&'a str>,
}

/// Upserts the balance row and adds `qty` to it.
async fn increment_balance(
    conn: &mut SqliteConnection,
    company_id: i64,
    product_id: i64,
    location: Location,
    qty: Quantity,
    now: DateTime<Utc>,
) -> DbResult<InventoryBalance> {
    let balance = sqlx::query_as::<_, InventoryBalance>(
        r#"
        INSERT INTO inventories (company_id, product_id, location_type, location_id, qty, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        ON CONFLICT (company_id, product_id, location_type, location_id)
        DO UPDATE SET qty = qty + excluded.qty, updated_at = excluded.updated_at
        RETURNING id, company_id, product_id, location_type, location_id, qty, updated_at
        "#,
    )
    .bind(company_id)
    .bind(product_id)
    .bind(location.kind)
    .bind(location.id)
    .bind(qty)
    .bind(now)
    .fetch_one(&mut *conn)
    .await?;

    Ok(balance)
}

/// Conditionally subtracts `qty`; fails without writing when short.
async fn decrement_balance(
    conn: &mut SqliteConnection,
    company_id: i64,
    product_id: i64,
    location: Location,
    qty: Quantity,
    now: DateTime<Utc>,
) -> DbResult<InventoryBalance> {
    let updated = sqlx::query_as::<_, InventoryBalance>(
        r#"
        UPDATE inventories
        SET qty = qty - ?5, updated_at = ?6
        WHERE company_id = ?1 AND product_id = ?2
          AND location_type = ?3 AND location_id = ?4
          AND qty >= ?5
        RETURNING id, company_id, product_id, location_type, location_id, qty, updated_at
        "#,
    )
    .bind(company_id)
    .bind(product_id)
    .bind(location.kind)
    .bind(location.id)
    .bind(qty)
    .bind(now)
    .fetch_optional(&mut *conn)
    .await?;

    match updated {
        Some(balance) => Ok(balance),
        None => {
            let available = balance(conn, company_id, product_id, location).await?;
            warn!(
                company_id,
                product_id,
                %location,
                %available,
                requested = %qty,
                "Insufficient stock"
            );
            Err(CoreError::InsufficientStock {
                product_id,
                location,
                available,
                requested: qty,
            }
            .into())
        }
    }
}

async fn insert_movement(
    conn: &mut SqliteConnection,
    row: MovementRow<'_>,
    now: DateTime<Utc>,
) -> DbResult<KardexMovement> {
    let movement = sqlx::query_as::<_, KardexMovement>(
        r#"
        INSERT INTO kardex_movements (
            company_id, product_id, move_type,
            from_location_type, from_location_id,
            to_location_type, to_location_id,
            qty, unit_cost, note, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
        RETURNING id, company_id, product_id, move_type,
                  from_location_type, from_location_id,
                  to_location_type, to_location_id,
                  qty, unit_cost, note, created_at
        "#,
    )
    .bind(row.company_id)
    .bind(row.product_id)
    .bind(row.move_type)
    .bind(row.from.map(|l| l.kind))
    .bind(row.from.map(|l| l.id))
    .bind(row.to.map(|l| l.kind))
    .bind(row.to.map(|l| l.id))
    .bind(row.qty)
    .bind(row.unit_cost)
    .bind(row.note)
    .bind(now)
    .fetch_one(&mut *conn)
    .await?;

    Ok(movement)
}
