//! # Stock Transfer Repository
//!
//! Draft/confirm documents moving stock between two branches.
//!
//! ## Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Stock Transfer Lifecycle                            │
//! │                                                                         │
//! │  create(confirm = false)          create(confirm = true)               │
//! │       │                                  │                              │
//! │       ▼                                  │                              │
//! │  ┌─────────┐    confirm()                │                              │
//! │  │  DRAFT  │ ───────────────┐            │                              │
//! │  └─────────┘                ▼            ▼                              │
//! │  no stock effect      ┌───────────────────────┐                         │
//! │                       │ transfer_stock(line)  │  once per line, in      │
//! │                       │ for every line        │  line order             │
//! │                       └───────────┬───────────┘                         │
//! │                                   ▼                                     │
//! │                            ┌─────────────┐                              │
//! │                            │  CONFIRMED  │ ── confirm() again: no-op    │
//! │                            └─────────────┘                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A failing line rolls back the status flip and every earlier line.

use chrono::Utc;
use serde::Serialize;
use sqlx::{Connection, SqliteConnection, SqlitePool};
use tracing::{debug, info};

use crate::error::DbResult;
use crate::pool::BEGIN_IMMEDIATE;
use crate::repository::branch::fetch_active_branch;
use crate::repository::product::fetch_active_product;
use crate::repository::sync::enqueue;
use crate::stock;
use kardex_core::validation::validate_note;
use kardex_core::{
    Branch, CoreError, NewTransfer, StockTransfer, StockTransferItem, SyncAction, SyncEntity,
    TransferLine, TransferStatus, TRANSFER_HISTORY_LIMIT,
};

const SELECT_TRANSFER: &str = r#"
    SELECT id, company_id, from_branch_id, to_branch_id, note, status,
           confirmed_at, created_by_user_id, created_at
    FROM stock_transfers
"#;

/// A transfer header with its lines.
#[derive(Debug, Clone, Serialize)]
pub struct TransferDocument {
    pub transfer: StockTransfer,
    pub items: Vec<StockTransferItem>,
}

impl TransferDocument {
    pub fn is_confirmed(&self) -> bool {
        self.transfer.status == TransferStatus::Confirmed
    }
}

/// Result of confirming a transfer.
#[derive(Debug, Clone)]
pub enum ConfirmOutcome {
    /// Stock moved by this call.
    Confirmed(TransferDocument),
    /// The transfer was already confirmed; nothing changed.
    AlreadyConfirmed(TransferDocument),
}

impl ConfirmOutcome {
    pub fn is_noop(&self) -> bool {
        matches!(self, ConfirmOutcome::AlreadyConfirmed(_))
    }

    pub fn document(&self) -> &TransferDocument {
        match self {
            ConfirmOutcome::Confirmed(doc) | ConfirmOutcome::AlreadyConfirmed(doc) => doc,
        }
    }

    pub fn into_document(self) -> TransferDocument {
        match self {
            ConfirmOutcome::Confirmed(doc) | ConfirmOutcome::AlreadyConfirmed(doc) => doc,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TransferRepository {
    pool: SqlitePool,
}

impl TransferRepository {
    pub fn new(pool: SqlitePool) -> Self {
        TransferRepository { pool }
    }

    /// Records a transfer, applying it at once when `new.confirm` is set.
    pub async fn create(&self, new: &NewTransfer) -> DbResult<TransferDocument> {
        let mut tx = self.pool.begin_with(BEGIN_IMMEDIATE).await?;
        let doc = create_in(&mut tx, new).await?;
        tx.commit().await?;
        Ok(doc)
    }

    /// Confirms a draft. Confirming twice is reported, not rejected.
    pub async fn confirm(&self, company_id: i64, transfer_id: i64) -> DbResult<ConfirmOutcome> {
        let mut tx = self.pool.begin_with(BEGIN_IMMEDIATE).await?;
        let outcome = confirm_in(&mut tx, company_id, transfer_id).await?;
        tx.commit().await?;
        Ok(outcome)
    }

    pub async fn get(&self, company_id: i64, transfer_id: i64) -> DbResult<Option<TransferDocument>> {
        let mut conn = self.pool.acquire().await?;
        fetch_document(&mut conn, company_id, transfer_id).await
    }

    /// The latest 200 transfers of the company, newest first.
    pub async fn history(&self, company_id: i64) -> DbResult<Vec<TransferDocument>> {
        let mut conn = self.pool.acquire().await?;

        let sql = format!(
            "{SELECT_TRANSFER} WHERE company_id = ?1 ORDER BY created_at DESC, id DESC LIMIT ?2"
        );
        let transfers = sqlx::query_as::<_, StockTransfer>(&sql)
            .bind(company_id)
            .bind(TRANSFER_HISTORY_LIMIT)
            .fetch_all(&mut *conn)
            .await?;

        let mut documents = Vec::with_capacity(transfers.len());
        for transfer in transfers {
            let items = fetch_items(&mut conn, transfer.id).await?;
            documents.push(TransferDocument { transfer, items });
        }

        Ok(documents)
    }
}

// =============================================================================
// Flows on a caller-supplied connection
// =============================================================================

/// Creates a transfer document inside the caller's transaction (or a new one).
///
/// ## Validation (before any stock moves)
/// 1. At least one line with a product and a positive quantity
/// 2. Source and destination differ
/// 3. Every product is active in the company
/// 4. Both branches are active in the company
pub async fn create_in(conn: &mut SqliteConnection, new: &NewTransfer) -> DbResult<TransferDocument> {
    let lines = new.usable_lines();
    if lines.is_empty() {
        return Err(CoreError::EmptyDocument {
            document: "stock transfer",
        }
        .into());
    }
    let note = validate_note(new.note.as_deref())?;

    debug!(
        company_id = new.company_id,
        from_branch_id = new.from_branch_id,
        to_branch_id = new.to_branch_id,
        lines = lines.len(),
        confirm = new.confirm,
        "Creating stock transfer"
    );

    let mut tx = conn.begin().await?;

    let (from, to) = check_endpoints(
        &mut tx,
        new.company_id,
        new.from_branch_id,
        new.to_branch_id,
        &lines,
    )
    .await?;

    let now = Utc::now();
    let status = if new.confirm {
        TransferStatus::Confirmed
    } else {
        TransferStatus::Draft
    };

    let transfer = sqlx::query_as::<_, StockTransfer>(
        r#"
        INSERT INTO stock_transfers (
            company_id, from_branch_id, to_branch_id, note, status,
            confirmed_at, created_by_user_id, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        RETURNING id, company_id, from_branch_id, to_branch_id, note, status,
                  confirmed_at, created_by_user_id, created_at
        "#,
    )
    .bind(new.company_id)
    .bind(from.id)
    .bind(to.id)
    .bind(&note)
    .bind(status)
    .bind(new.confirm.then_some(now))
    .bind(new.created_by_user_id)
    .bind(now)
    .fetch_one(&mut *tx)
    .await?;

    let mut items = Vec::with_capacity(lines.len());
    for line in &lines {
        let item = sqlx::query_as::<_, StockTransferItem>(
            r#"
            INSERT INTO stock_transfer_items (transfer_id, product_id, qty)
            VALUES (?1, ?2, ?3)
            RETURNING id, transfer_id, product_id, qty
            "#,
        )
        .bind(transfer.id)
        .bind(line.product_id)
        .bind(line.qty)
        .fetch_one(&mut *tx)
        .await?;
        items.push(item);
    }

    let document = TransferDocument { transfer, items };

    if new.confirm {
        apply_lines(&mut tx, &document, &from, &to).await?;
        enqueue(
            &mut tx,
            document.transfer.company_id,
            Some(from.id),
            SyncEntity::StockTransfer,
            Some(document.transfer.id),
            SyncAction::Confirm,
            &document,
        )
        .await?;
    }

    tx.commit().await?;

    info!(
        transfer_id = document.transfer.id,
        status = %document.transfer.status,
        lines = document.items.len(),
        "Stock transfer created"
    );
    Ok(document)
}

/// Confirms a draft inside the caller's transaction (or a new one).
///
/// The status flip is a conditional `UPDATE .. WHERE status = 'DRAFT'`, so
/// two concurrent confirmations apply the lines once.
pub async fn confirm_in(
    conn: &mut SqliteConnection,
    company_id: i64,
    transfer_id: i64,
) -> DbResult<ConfirmOutcome> {
    let mut tx = conn.begin().await?;

    let document = fetch_document(&mut tx, company_id, transfer_id)
        .await?
        .ok_or(CoreError::TransferNotFound(transfer_id))?;

    if document.is_confirmed() {
        info!(transfer_id, "Stock transfer already confirmed");
        return Ok(ConfirmOutcome::AlreadyConfirmed(document));
    }

    let lines: Vec<TransferLine> = document
        .items
        .iter()
        .map(|item| TransferLine {
            product_id: item.product_id,
            qty: item.qty,
        })
        .collect();
    let (from, to) = check_endpoints(
        &mut tx,
        company_id,
        document.transfer.from_branch_id,
        document.transfer.to_branch_id,
        &lines,
    )
    .await?;

    let flipped = sqlx::query_as::<_, StockTransfer>(
        r#"
        UPDATE stock_transfers SET status = 'CONFIRMED', confirmed_at = ?3
        WHERE id = ?1 AND company_id = ?2 AND status = 'DRAFT'
        RETURNING id, company_id, from_branch_id, to_branch_id, note, status,
                  confirmed_at, created_by_user_id, created_at
        "#,
    )
    .bind(transfer_id)
    .bind(company_id)
    .bind(Utc::now())
    .fetch_optional(&mut *tx)
    .await?;

    let Some(transfer) = flipped else {
        info!(transfer_id, "Stock transfer confirmed concurrently");
        return Ok(ConfirmOutcome::AlreadyConfirmed(document));
    };

    let document = TransferDocument {
        transfer,
        items: document.items,
    };

    apply_lines(&mut tx, &document, &from, &to).await?;
    enqueue(
        &mut tx,
        company_id,
        Some(from.id),
        SyncEntity::StockTransfer,
        Some(transfer_id),
        SyncAction::Confirm,
        &document,
    )
    .await?;

    tx.commit().await?;

    info!(transfer_id, lines = document.items.len(), "Stock transfer confirmed");
    Ok(ConfirmOutcome::Confirmed(document))
}

// =============================================================================
// Internals
// =============================================================================

async fn check_endpoints(
    conn: &mut SqliteConnection,
    company_id: i64,
    from_branch_id: i64,
    to_branch_id: i64,
    lines: &[TransferLine],
) -> DbResult<(Branch, Branch)> {
    if from_branch_id == to_branch_id {
        return Err(CoreError::SameLocation(from_branch_id).into());
    }

    for line in lines {
        fetch_active_product(conn, company_id, line.product_id).await?;
    }

    let from = fetch_active_branch(conn, company_id, from_branch_id).await?;
    let to = fetch_active_branch(conn, company_id, to_branch_id).await?;

    Ok((from, to))
}

/// One `transfer_stock` per item, in item order.
async fn apply_lines(
    conn: &mut SqliteConnection,
    document: &TransferDocument,
    from: &Branch,
    to: &Branch,
) -> DbResult<()> {
    let default_note = format!("Transfer #{}", document.transfer.id);
    let note = document.transfer.note.as_deref().unwrap_or(&default_note);

    for item in &document.items {
        stock::transfer_stock(
            conn,
            document.transfer.company_id,
            item.product_id,
            from.location(),
            to.location(),
            item.qty,
            Some(note),
        )
        .await?;
    }

    Ok(())
}

async fn fetch_document(
    conn: &mut SqliteConnection,
    company_id: i64,
    transfer_id: i64,
) -> DbResult<Option<TransferDocument>> {
    let sql = format!("{SELECT_TRANSFER} WHERE company_id = ?1 AND id = ?2");
    let transfer = sqlx::query_as::<_, StockTransfer>(&sql)
        .bind(company_id)
        .bind(transfer_id)
        .fetch_optional(&mut *conn)
        .await?;

    match transfer {
        Some(transfer) => {
            let items = fetch_items(conn, transfer.id).await?;
            Ok(Some(TransferDocument { transfer, items }))
        }
        None => Ok(None),
    }
}

async fn fetch_items(conn: &mut SqliteConnection, transfer_id: i64) -> DbResult<Vec<StockTransferItem>> {
    let items = sqlx::query_as::<_, StockTransferItem>(
        "SELECT id, transfer_id, product_id, qty FROM stock_transfer_items WHERE transfer_id = ?1 ORDER BY id",
    )
    .bind(transfer_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(items)
}
