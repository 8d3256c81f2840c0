//! Shared fixtures for the kardex-db integration tests.
//!
//! `Fixture::new()` runs against `DbConfig::in_memory()`, which is a single
//! connection: drop any connection acquired from `db.pool()` before calling
//! a repository method. `Fixture::on_disk()` backs a real WAL file with a
//! multi-connection pool for concurrency tests; call `remove()` at the end.

#![allow(dead_code)]

use std::path::PathBuf;

use kardex_core::{Branch, Location, Money, MoveType, NewProduct, Product, Quantity};
use kardex_db::{stock, Database, DbConfig};

pub struct Fixture {
    pub db: Database,
    pub company_id: i64,
    pub warehouse: Branch,
    pub branch: Branch,
    pub other_branch: Branch,
    path: Option<PathBuf>,
}

impl Fixture {
    /// One company with a warehouse and two selling branches.
    pub async fn new() -> Self {
        Self::with_config(DbConfig::in_memory(), None).await
    }

    /// Same layout in a fresh database file under the temp dir.
    pub async fn on_disk(max_connections: u32) -> Self {
        let path = std::env::temp_dir().join(format!("kardex-test-{}.db", uuid::Uuid::new_v4()));
        let config = DbConfig::new(&path).max_connections(max_connections);
        Self::with_config(config, Some(path)).await
    }

    async fn with_config(config: DbConfig, path: Option<PathBuf>) -> Self {
        let db = Database::new(config).await.unwrap();
        let company = db.companies().create("Acme").await.unwrap();
        let warehouse = db.branches().create(company.id, "Central", true).await.unwrap();
        let branch = db.branches().create(company.id, "Downtown", false).await.unwrap();
        let other_branch = db.branches().create(company.id, "Uptown", false).await.unwrap();

        Fixture {
            db,
            company_id: company.id,
            warehouse,
            branch,
            other_branch,
            path,
        }
    }

    /// Closes the pool and deletes the database file with its WAL files.
    pub async fn remove(self) {
        self.db.close().await;
        if let Some(path) = self.path {
            for suffix in ["", "-wal", "-shm"] {
                let _ = std::fs::remove_file(format!("{}{suffix}", path.display()));
            }
        }
    }

    /// Product with retail `retail` cents and cost `cost` cents.
    pub async fn product(&self, name: &str, sku: &str, retail: i64, cost: i64) -> Product {
        self.db
            .products()
            .insert(&NewProduct {
                company_id: self.company_id,
                name: name.to_string(),
                sku: Some(sku.to_string()),
                barcode: None,
                price_retail: Money::from_cents(retail),
                price_wholesale: Money::from_cents(retail * 9 / 10),
                price_special: Money::from_cents(0),
                cost_price: Money::from_cents(cost),
            })
            .await
            .unwrap()
    }

    /// Seeds `units` of `product_id` at `location` with an OPENING movement.
    pub async fn stock(&self, product_id: i64, location: Location, units: i64) {
        let mut conn = self.db.pool().acquire().await.unwrap();
        stock::add_stock(
            &mut conn,
            self.company_id,
            product_id,
            location,
            Quantity::from_units(units),
            MoveType::Opening,
            None,
            None,
        )
        .await
        .unwrap();
    }

    pub async fn balance(&self, product_id: i64, location: Location) -> Quantity {
        self.db
            .inventory()
            .balance(self.company_id, product_id, location)
            .await
            .unwrap()
    }

    pub async fn movement_count(&self) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM kardex_movements WHERE company_id = ?1")
            .bind(self.company_id)
            .fetch_one(self.db.pool())
            .await
            .unwrap()
    }

    pub async fn movement_count_of(&self, move_type: MoveType) -> i64 {
        sqlx::query_scalar(
            "SELECT COUNT(*) FROM kardex_movements WHERE company_id = ?1 AND move_type = ?2",
        )
        .bind(self.company_id)
        .bind(move_type)
        .fetch_one(self.db.pool())
        .await
        .unwrap()
    }

    /// Fails the test if any stored balance disagrees with the kardex.
    pub async fn assert_ledger_consistent(&self) {
        let mismatches = self.db.inventory().verify_balances(self.company_id).await.unwrap();
        assert!(mismatches.is_empty(), "balances disagree with kardex: {mismatches:?}");
    }
}

pub fn units(n: i64) -> Quantity {
    Quantity::from_units(n)
}
