//! # Product Repository
//!
//! Database operations for products.
//!
//! ## Key Operations
//! - Insert with per-company unique SKU / barcode
//! - Lookup by exact code, then by name fragment
//! - Activation toggle (products are never hard-deleted once referenced)
//! - Price and cost updates
//!
//! ## Lookup Order
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Cashier scans / types: "7790001"                                       │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  1. exact sku = term OR barcode = term   (active only)                 │
//! │       │ miss                                                            │
//! │       ▼                                                                 │
//! │  2. name contains term (case-insensitive), ordered by name             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use kardex_core::validation::{
    validate_optional_code, validate_price, validate_product_name, validate_search_query,
};
use kardex_core::{CoreError, Money, NewProduct, Product};

const SELECT_PRODUCT: &str = r#"
    SELECT id, company_id, name, sku, barcode,
           price_retail, price_wholesale, price_special, cost_price,
           is_active, created_at
    FROM products
"#;

/// Repository for product database operations.
///
/// ## Usage
/// ```rust,ignore
/// let repo = db.products();
///
/// let product = repo.insert(&new_product).await?;
/// let scanned = repo.lookup(company_id, "7790001").await?;
/// ```
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Inserts a new product.
    ///
    /// ## Errors
    /// - validation errors for a blank name, malformed codes or negative prices
    /// - [`DbError::UniqueViolation`] when the SKU or barcode is taken in the company
    pub async fn insert(&self, product: &NewProduct) -> DbResult<Product> {
        let name = validate_product_name(&product.name)?;
        let sku = validate_optional_code("sku", product.sku.as_deref())?;
        let barcode = validate_optional_code("barcode", product.barcode.as_deref())?;
        validate_price("price_retail", product.price_retail)?;
        validate_price("price_wholesale", product.price_wholesale)?;
        validate_price("price_special", product.price_special)?;
        validate_price("cost_price", product.cost_price)?;

        debug!(company_id = product.company_id, name = %name, "Inserting product");

        let inserted = sqlx::query_as::<_, Product>(
            r#"
            INSERT INTO products (
                company_id, name, sku, barcode,
                price_retail, price_wholesale, price_special, cost_price,
                is_active, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 1, ?9)
            RETURNING id, company_id, name, sku, barcode,
                      price_retail, price_wholesale, price_special, cost_price,
                      is_active, created_at
            "#,
        )
        .bind(product.company_id)
        .bind(&name)
        .bind(&sku)
        .bind(&barcode)
        .bind(product.price_retail)
        .bind(product.price_wholesale)
        .bind(product.price_special)
        .bind(product.cost_price)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(|err| match DbError::from(err) {
            DbError::UniqueViolation { field, .. } if field.ends_with("barcode") => {
                DbError::duplicate("barcode", barcode.clone().unwrap_or_default())
            }
            DbError::UniqueViolation { field, .. } if field.ends_with("sku") => {
                DbError::duplicate("sku", sku.clone().unwrap_or_default())
            }
            other => other,
        })?;

        info!(product_id = inserted.id, name = %inserted.name, "Product created");
        Ok(inserted)
    }

    /// Gets a product by ID within a company, active or not.
    pub async fn get_by_id(&self, company_id: i64, id: i64) -> DbResult<Option<Product>> {
        debug!(company_id, id, "Getting product by ID");

        let sql = format!("{SELECT_PRODUCT} WHERE company_id = ?1 AND id = ?2");
        let product = sqlx::query_as::<_, Product>(&sql)
            .bind(company_id)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(product)
    }

    /// Active product whose SKU or barcode equals `code` exactly.
    pub async fn find_by_code(&self, company_id: i64, code: &str) -> DbResult<Option<Product>> {
        let code = code.trim();
        if code.is_empty() {
            return Ok(None);
        }

        let sql = format!(
            "{SELECT_PRODUCT} WHERE company_id = ?1 AND is_active = 1 \
             AND (sku = ?2 OR barcode = ?2) ORDER BY id LIMIT 1"
        );
        let product = sqlx::query_as::<_, Product>(&sql)
            .bind(company_id)
            .bind(code)
            .fetch_optional(&self.pool)
            .await?;

        Ok(product)
    }

    /// Active products whose name, SKU or barcode contains `query`.
    ///
    /// An empty query lists active products by name.
    pub async fn search(&self, company_id: i64, query: &str, limit: u32) -> DbResult<Vec<Product>> {
        let query = validate_search_query(query)?;

        debug!(company_id, query = %query, limit, "Searching products");

        if query.is_empty() {
            return self.list_active(company_id, limit).await;
        }

        let sql = format!(
            "{SELECT_PRODUCT} WHERE company_id = ?1 AND is_active = 1 \
             AND (instr(lower(name), lower(?2)) > 0 \
                  OR instr(lower(COALESCE(sku, '')), lower(?2)) > 0 \
                  OR instr(COALESCE(barcode, ''), ?2) > 0) \
             ORDER BY name LIMIT ?3"
        );
        let products = sqlx::query_as::<_, Product>(&sql)
            .bind(company_id)
            .bind(&query)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        debug!(count = products.len(), "Search returned products");
        Ok(products)
    }

    /// Exact code first, then the first name match.
    pub async fn lookup(&self, company_id: i64, term: &str) -> DbResult<Option<Product>> {
        if let Some(product) = self.find_by_code(company_id, term).await? {
            return Ok(Some(product));
        }

        Ok(self.search(company_id, term, 1).await?.into_iter().next())
    }

    /// Lists active products sorted by name.
    pub async fn list_active(&self, company_id: i64, limit: u32) -> DbResult<Vec<Product>> {
        let sql = format!("{SELECT_PRODUCT} WHERE company_id = ?1 AND is_active = 1 ORDER BY name LIMIT ?2");
        let products = sqlx::query_as::<_, Product>(&sql)
            .bind(company_id)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        Ok(products)
    }

    /// Soft (de)activation. Balances and ledger rows stay untouched.
    pub async fn set_active(&self, company_id: i64, id: i64, active: bool) -> DbResult<()> {
        let result = sqlx::query("UPDATE products SET is_active = ?3 WHERE company_id = ?1 AND id = ?2")
            .bind(company_id)
            .bind(id)
            .bind(active)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        info!(product_id = id, active, "Product activation changed");
        Ok(())
    }

    /// Rewrites the three price tiers and the cost price.
    ///
    /// Sale items keep the price and cost they photographed at sale time.
    pub async fn update_prices(
        &self,
        company_id: i64,
        id: i64,
        retail: Money,
        wholesale: Money,
        special: Money,
        cost: Money,
    ) -> DbResult<Product> {
        validate_price("price_retail", retail)?;
        validate_price("price_wholesale", wholesale)?;
        validate_price("price_special", special)?;
        validate_price("cost_price", cost)?;

        let updated = sqlx::query_as::<_, Product>(
            r#"
            UPDATE products
            SET price_retail = ?3, price_wholesale = ?4, price_special = ?5, cost_price = ?6
            WHERE company_id = ?1 AND id = ?2
            RETURNING id, company_id, name, sku, barcode,
                      price_retail, price_wholesale, price_special, cost_price,
                      is_active, created_at
            "#,
        )
        .bind(company_id)
        .bind(id)
        .bind(retail)
        .bind(wholesale)
        .bind(special)
        .bind(cost)
        .fetch_optional(&self.pool)
        .await?;

        updated.ok_or_else(|| DbError::not_found("Product", id))
    }

    /// Counts products of a company (all, including inactive).
    pub async fn count(&self, company_id: i64) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE company_id = ?1")
            .bind(company_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

/// The product if it exists in the company and is active.
///
/// ## Errors
/// [`CoreError::ProductNotFound`] otherwise.
pub(crate) async fn fetch_active_product(
    conn: &mut SqliteConnection,
    company_id: i64,
    product_id: i64,
) -> DbResult<Product> {
    let sql = format!("{SELECT_PRODUCT} WHERE company_id = ?1 AND id = ?2 AND is_active = 1");
    let product = sqlx::query_as::<_, Product>(&sql)
        .bind(company_id)
        .bind(product_id)
        .fetch_optional(&mut *conn)
        .await?;

    product.ok_or_else(|| CoreError::ProductNotFound(product_id).into())
}

// =============================================================================
// Unit Tests
// =============================================================================
