//! # Sale Repository
//!
//! Checkout, edit and delete: the sale-side consumers of the Stock Engine.
//!
//! ## Sale Flows
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Sale Flows                                      │
//! │                                                                         │
//! │  CHECKOUT                                                               │
//! │    header ─► per line: remove_stock(SALE_OUT) + item (cost photographed)│
//! │                                                                         │
//! │  EDIT  (plan_sale_edit computes per-product deltas)                    │
//! │    Increase ─► remove_stock(SALE_EDIT, delta)                          │
//! │    Decrease ─► add_stock(SALE_EDIT, delta)                             │
//! │    Remove   ─► add_stock(SALE_EDIT, qty) + delete item                 │
//! │    Add      ─► remove_stock(SALE_EDIT, qty) + item                     │
//! │    then: subtotal/total recomputed from persisted items                │
//! │                                                                         │
//! │  DELETE                                                                 │
//! │    per item: add_stock(SALE_VOID) ─► delete items ─► delete header     │
//! │                                                                         │
//! │  Each flow + its sync event = ONE transaction                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use serde::Serialize;
use sqlx::{Connection, SqliteConnection, SqlitePool};
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::pool::BEGIN_IMMEDIATE;
use crate::repository::branch::{fetch_active_branch, fetch_branch};
use crate::repository::client::fetch_active_client;
use crate::repository::product::fetch_active_product;
use crate::repository::sync::enqueue;
use crate::stock;
use kardex_core::{
    plan_sale_edit, CheckoutRequest, CoreError, LineChange, Location, Money, MoveType, Quantity,
    Sale, SaleEdit, SaleItem, SyncAction, SyncEntity,
};

const SELECT_SALE: &str = r#"
    SELECT id, company_id, branch_id, client_id, price_tier, payment_method,
           subtotal, discount_total, total, created_at
    FROM sales
"#;

/// A sale header with its items.
#[derive(Debug, Clone, Serialize)]
pub struct SaleDocument {
    pub sale: Sale,
    pub items: Vec<SaleItem>,
}

impl SaleDocument {
    /// Σ (unit_price − unit_cost) × qty over the items.
    pub fn profit(&self) -> Money {
        self.items.iter().map(SaleItem::profit).sum()
    }

    pub fn quantity_of(&self, product_id: i64) -> Quantity {
        self.items
            .iter()
            .filter(|item| item.product_id == product_id)
            .map(|item| item.qty)
            .sum()
    }
}

/// Repository for sale operations.
///
/// ## Usage
/// ```rust,ignore
/// let request = cart.to_checkout(company_id, branch_id, PaymentMethod::Cash)?;
/// let document = db.sales().checkout(&request).await?;
/// db.sales().delete(company_id, document.sale.id).await?;
/// ```
#[derive(Debug, Clone)]
pub struct SaleRepository {
    pool: SqlitePool,
}

impl SaleRepository {
    pub fn new(pool: SqlitePool) -> Self {
        SaleRepository { pool }
    }

    pub async fn checkout(&self, request: &CheckoutRequest) -> DbResult<SaleDocument> {
        let mut tx = self.pool.begin_with(BEGIN_IMMEDIATE).await?;
        let doc = checkout_in(&mut tx, request).await?;
        tx.commit().await?;
        Ok(doc)
    }

    pub async fn edit(&self, company_id: i64, sale_id: i64, edit: &SaleEdit) -> DbResult<SaleDocument> {
        let mut tx = self.pool.begin_with(BEGIN_IMMEDIATE).await?;
        let doc = edit_in(&mut tx, company_id, sale_id, edit).await?;
        tx.commit().await?;
        Ok(doc)
    }

    /// Voids a sale: stock goes back, then the rows go away.
    ///
    /// ## Returns
    /// The sale as it was before deletion.
    pub async fn delete(&self, company_id: i64, sale_id: i64) -> DbResult<SaleDocument> {
        let mut tx = self.pool.begin_with(BEGIN_IMMEDIATE).await?;
        let doc = delete_in(&mut tx, company_id, sale_id).await?;
        tx.commit().await?;
        Ok(doc)
    }

    pub async fn get(&self, company_id: i64, sale_id: i64) -> DbResult<Option<SaleDocument>> {
        let mut conn = self.pool.acquire().await?;

        match fetch_sale(&mut conn, company_id, sale_id).await? {
            Some(sale) => {
                let items = fetch_items(&mut conn, sale.id).await?;
                Ok(Some(SaleDocument { sale, items }))
            }
            None => Ok(None),
        }
    }

    /// Latest sales headers, optionally for one branch.
    pub async fn list_recent(
        &self,
        company_id: i64,
        branch_id: Option<i64>,
        limit: u32,
    ) -> DbResult<Vec<Sale>> {
        let sql = format!(
            "{SELECT_SALE} WHERE company_id = ?1 AND (?2 IS NULL OR branch_id = ?2) \
             ORDER BY created_at DESC, id DESC LIMIT ?3"
        );
        let sales = sqlx::query_as::<_, Sale>(&sql)
            .bind(company_id)
            .bind(branch_id)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        Ok(sales)
    }
}

// =============================================================================
// Flows on a caller-supplied connection
// =============================================================================

/// Records a sale and removes its stock from the branch.
///
/// ## Errors
/// - validation errors from [`CheckoutRequest::validate`]
/// - [`CoreError::BranchNotFound`], [`CoreError::ClientNotFound`],
///   [`CoreError::ProductNotFound`]
/// - [`CoreError::InsufficientStock`] for the first short line
///
/// Any error leaves no header, no items and no stock movement behind.
pub async fn checkout_in(conn: &mut SqliteConnection, request: &CheckoutRequest) -> DbResult<SaleDocument> {
    request.validate()?;

    let company_id = request.company_id;

    debug!(
        company_id,
        branch_id = request.branch_id,
        lines = request.lines.len(),
        "Checking out sale"
    );

    let mut tx = conn.begin().await?;

    let branch = fetch_active_branch(&mut tx, company_id, request.branch_id).await?;
    if let Some(client_id) = request.client_id {
        fetch_active_client(&mut tx, company_id, client_id).await?;
    }

    let subtotal = request.subtotal();
    let sale = sqlx::query_as::<_, Sale>(
        r#"
        INSERT INTO sales (
            company_id, branch_id, client_id, price_tier, payment_method,
            subtotal, discount_total, total, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0, ?6, ?7)
        RETURNING id, company_id, branch_id, client_id, price_tier, payment_method,
                  subtotal, discount_total, total, created_at
        "#,
    )
    .bind(company_id)
    .bind(branch.id)
    .bind(request.client_id)
    .bind(request.price_tier)
    .bind(request.payment_method)
    .bind(subtotal)
    .bind(Utc::now())
    .fetch_one(&mut *tx)
    .await?;

    let location = branch.location();
    let note = format!("Sale #{}", sale.id);

    let mut items = Vec::with_capacity(request.lines.len());
    for line in &request.lines {
        let product = fetch_active_product(&mut tx, company_id, line.product_id).await?;

        stock::remove_stock(
            &mut tx,
            company_id,
            product.id,
            location,
            line.qty,
            MoveType::SaleOut,
            Some(&note),
        )
        .await?;

        let item = insert_item(
            &mut tx,
            sale.id,
            product.id,
            line.qty,
            line.unit_price,
            product.cost_price,
        )
        .await?;
        items.push(item);
    }

    let document = SaleDocument { sale, items };
    enqueue(
        &mut tx,
        company_id,
        Some(branch.id),
        SyncEntity::Sale,
        Some(document.sale.id),
        SyncAction::Create,
        &document,
    )
    .await?;

    tx.commit().await?;

    info!(
        sale_id = document.sale.id,
        branch_id = branch.id,
        total = %document.sale.total,
        "Sale created"
    );
    Ok(document)
}

/// Applies the desired line set to a persisted sale.
///
/// Stock goes back to (or leaves) the branch the sale was made at, even if
/// that branch has since been deactivated. Lines added by the edit take the
/// product's current cost and, without an explicit price, the sale's tier
/// price.
pub async fn edit_in(
    conn: &mut SqliteConnection,
    company_id: i64,
    sale_id: i64,
    edit: &SaleEdit,
) -> DbResult<SaleDocument> {
    let mut tx = conn.begin().await?;

    let sale = fetch_sale(&mut tx, company_id, sale_id)
        .await?
        .ok_or(CoreError::SaleNotFound(sale_id))?;
    let items = fetch_items(&mut tx, sale.id).await?;

    let changes = plan_sale_edit(&items, edit)?;

    debug!(sale_id, changes = changes.len(), "Editing sale");

    let location = sale_location(&mut tx, &sale).await?;
    let note = format!("Sale #{} edit", sale.id);

    for change in &changes {
        match *change {
            LineChange::Keep {
                item_id,
                qty,
                unit_price,
            } => {
                if let Some(price) = unit_price {
                    rewrite_item(&mut tx, item_id, qty, price).await?;
                }
            }
            LineChange::Increase {
                item_id,
                product_id,
                delta,
                new_qty,
                unit_price,
            } => {
                stock::remove_stock(
                    &mut tx,
                    company_id,
                    product_id,
                    location,
                    delta,
                    MoveType::SaleEdit,
                    Some(&note),
                )
                .await?;
                let price = match unit_price {
                    Some(price) => price,
                    None => find_item(&items, item_id)?.unit_price,
                };
                rewrite_item(&mut tx, item_id, new_qty, price).await?;
            }
            LineChange::Decrease {
                item_id,
                product_id,
                delta,
                new_qty,
                unit_price,
            } => {
                stock::add_stock(
                    &mut tx,
                    company_id,
                    product_id,
                    location,
                    delta,
                    MoveType::SaleEdit,
                    Some(&note),
                    None,
                )
                .await?;
                let price = match unit_price {
                    Some(price) => price,
                    None => find_item(&items, item_id)?.unit_price,
                };
                rewrite_item(&mut tx, item_id, new_qty, price).await?;
            }
            LineChange::Remove {
                item_id,
                product_id,
                qty,
            } => {
                stock::add_stock(
                    &mut tx,
                    company_id,
                    product_id,
                    location,
                    qty,
                    MoveType::SaleEdit,
                    Some(&note),
                    None,
                )
                .await?;
                sqlx::query("DELETE FROM sale_items WHERE id = ?1")
                    .bind(item_id)
                    .execute(&mut *tx)
                    .await?;
            }
            LineChange::Add {
                product_id,
                qty,
                unit_price,
            } => {
                let product = fetch_active_product(&mut tx, company_id, product_id).await?;
                stock::remove_stock(
                    &mut tx,
                    company_id,
                    product.id,
                    location,
                    qty,
                    MoveType::SaleEdit,
                    Some(&note),
                )
                .await?;
                let price = unit_price.unwrap_or_else(|| product.price_for(sale.price_tier));
                insert_item(&mut tx, sale.id, product.id, qty, price, product.cost_price).await?;
            }
        }
    }

    let subtotal: Money =
        sqlx::query_scalar("SELECT COALESCE(SUM(subtotal), 0) FROM sale_items WHERE sale_id = ?1")
            .bind(sale.id)
            .fetch_one(&mut *tx)
            .await?;
    let payment_method = edit.payment_method.unwrap_or(sale.payment_method);

    let sale = sqlx::query_as::<_, Sale>(
        r#"
        UPDATE sales SET subtotal = ?2, total = ?3, payment_method = ?4
        WHERE id = ?1
        RETURNING id, company_id, branch_id, client_id, price_tier, payment_method,
                  subtotal, discount_total, total, created_at
        "#,
    )
    .bind(sale.id)
    .bind(subtotal)
    .bind(subtotal - sale.discount_total)
    .bind(payment_method)
    .fetch_one(&mut *tx)
    .await?;
    let items = fetch_items(&mut tx, sale.id).await?;

    let document = SaleDocument { sale, items };
    enqueue(
        &mut tx,
        company_id,
        Some(document.sale.branch_id),
        SyncEntity::Sale,
        Some(document.sale.id),
        SyncAction::Update,
        &document,
    )
    .await?;

    tx.commit().await?;

    info!(sale_id, total = %document.sale.total, "Sale edited");
    Ok(document)
}

/// Returns every item's quantity with `SALE_VOID`, then removes the sale.
pub async fn delete_in(conn: &mut SqliteConnection, company_id: i64, sale_id: i64) -> DbResult<SaleDocument> {
    let mut tx = conn.begin().await?;

    let sale = fetch_sale(&mut tx, company_id, sale_id)
        .await?
        .ok_or(CoreError::SaleNotFound(sale_id))?;
    let items = fetch_items(&mut tx, sale.id).await?;

    debug!(sale_id, items = items.len(), "Voiding sale");

    let location = sale_location(&mut tx, &sale).await?;
    let note = format!("Sale #{} voided", sale.id);

    for item in &items {
        stock::add_stock(
            &mut tx,
            company_id,
            item.product_id,
            location,
            item.qty,
            MoveType::SaleVoid,
            Some(&note),
            None,
        )
        .await?;
    }

    sqlx::query("DELETE FROM sale_items WHERE sale_id = ?1")
        .bind(sale.id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM sales WHERE id = ?1 AND company_id = ?2")
        .bind(sale.id)
        .bind(company_id)
        .execute(&mut *tx)
        .await?;

    let document = SaleDocument { sale, items };
    enqueue(
        &mut tx,
        company_id,
        Some(document.sale.branch_id),
        SyncEntity::Sale,
        Some(sale_id),
        SyncAction::Delete,
        &document,
    )
    .await?;

    tx.commit().await?;

    info!(sale_id, returned_lines = document.items.len(), "Sale voided");
    Ok(document)
}

// =============================================================================
// Internals
// =============================================================================

async fn fetch_sale(conn: &mut SqliteConnection, company_id: i64, sale_id: i64) -> DbResult<Option<Sale>> {
    let sql = format!("{SELECT_SALE} WHERE company_id = ?1 AND id = ?2");
    let sale = sqlx::query_as::<_, Sale>(&sql)
        .bind(company_id)
        .bind(sale_id)
        .fetch_optional(&mut *conn)
        .await?;

    Ok(sale)
}

async fn fetch_items(conn: &mut SqliteConnection, sale_id: i64) -> DbResult<Vec<SaleItem>> {
    let items = sqlx::query_as::<_, SaleItem>(
        r#"
        SELECT id, sale_id, product_id, qty, unit_price, unit_cost, discount, subtotal
        FROM sale_items
        WHERE sale_id = ?1
        ORDER BY id
        "#,
    )
    .bind(sale_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(items)
}

/// The stock location of the sale's branch, active or not.
async fn sale_location(conn: &mut SqliteConnection, sale: &Sale) -> DbResult<Location> {
    let branch = fetch_branch(conn, sale.company_id, sale.branch_id)
        .await?
        .ok_or(CoreError::BranchNotFound(sale.branch_id))?;

    Ok(branch.location())
}

fn find_item(items: &[SaleItem], item_id: i64) -> DbResult<&SaleItem> {
    items
        .iter()
        .find(|item| item.id == item_id)
        .ok_or_else(|| DbError::Internal(format!("sale item {item_id} missing from plan source")))
}

async fn insert_item(
    conn: &mut SqliteConnection,
    sale_id: i64,
    product_id: i64,
    qty: Quantity,
    unit_price: Money,
    unit_cost: Money,
) -> DbResult<SaleItem> {
    let item = sqlx::query_as::<_, SaleItem>(
        r#"
        INSERT INTO sale_items (sale_id, product_id, qty, unit_price, unit_cost, discount, subtotal)
        VALUES (?1, ?2, ?3, ?4, ?5, 0, ?6)
        RETURNING id, sale_id, product_id, qty, unit_price, unit_cost, discount, subtotal
        "#,
    )
    .bind(sale_id)
    .bind(product_id)
    .bind(qty)
    .bind(unit_price)
    .bind(unit_cost)
    .bind(unit_price.times(qty))
    .fetch_one(&mut *conn)
    .await?;

    Ok(item)
}

/// New quantity and price; `unit_cost` keeps its sale-time photograph.
async fn rewrite_item(
    conn: &mut SqliteConnection,
    item_id: i64,
    qty: Quantity,
    unit_price: Money,
) -> DbResult<()> {
    sqlx::query(
        r#"
        UPDATE sale_items
        SET qty = ?2, unit_price = ?3, subtotal = ?4 - discount
        WHERE id = ?1
        "#,
    )
    .bind(item_id)
    .bind(qty)
    .bind(unit_price)
    .bind(unit_price.times(qty))
    .execute(&mut *conn)
    .await?;

    Ok(())
}
