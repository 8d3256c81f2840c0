//! # Seed Data Generator
//!
//! Populates a database with a demo company for development.
//!
//! ## Usage
//! ```bash
//! # Uses KARDEX_DB_PATH (default ./kardex.db)
//! cargo run -p kardex-db --bin seed
//!
//! # Specify database path
//! cargo run -p kardex-db --bin seed -- --db ./data/kardex.db
//!
//! # More logging
//! RUST_LOG=kardex_db=debug cargo run -p kardex-db --bin seed
//! ```
//!
//! ## Generated Data
//! - Company "Demo Market" with a central warehouse and two branches
//! - A small catalog with the three price tiers and a cost price
//! - Opening stock in the warehouse (OPENING, with unit cost)
//! - One confirmed transfer per branch, one draft transfer
//! - One sale at the first branch
//!
//! Every stock change goes through the Stock Engine, so the resulting
//! kardex explains every balance.

use std::env;

use kardex_core::{
    Cart, Money, NewProduct, NewTransfer, PaymentMethod, Quantity, TransferLine, UnitCost,
};
use kardex_db::{Database, DbConfig};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// (name, sku, barcode, retail, wholesale, special, cost) in cents
const CATALOG: &[(&str, &str, &str, i64, i64, i64, i64)] = &[
    ("Rice 1kg", "RICE-1KG", "7790001000011", 250, 210, 0, 180),
    ("Black Beans 500g", "BEAN-500", "7790001000028", 180, 150, 160, 120),
    ("Sunflower Oil 1L", "OIL-1L", "7790001000035", 520, 460, 480, 390),
    ("Sugar 1kg", "SUGAR-1KG", "7790001000042", 210, 185, 0, 150),
    ("Ground Coffee 250g", "COFFEE-250", "7790001000059", 890, 790, 820, 610),
    ("Cheese (per kg)", "CHEESE-KG", "2000000000015", 1450, 1300, 1350, 1050),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let mut config = DbConfig::from_env()?;

    let args: Vec<String> = env::args().collect();
    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    config.database_path = args[i + 1].clone().into();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Kardex POS Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>    Database file path (default: $KARDEX_DB_PATH or ./kardex.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    info!(path = %config.database_path.display(), "Seeding database");
    let db = Database::new(config).await?;

    if !db.companies().list_active().await?.is_empty() {
        warn!("Database already has companies, skipping seed (delete the file to regenerate)");
        return Ok(());
    }

    let company = db.companies().create("Demo Market").await?;
    let warehouse = db.branches().create(company.id, "Central Warehouse", true).await?;
    let downtown = db.branches().create(company.id, "Downtown", false).await?;
    let uptown = db.branches().create(company.id, "Uptown", false).await?;

    let mut products = Vec::with_capacity(CATALOG.len());
    for &(name, sku, barcode, retail, wholesale, special, cost) in CATALOG {
        let product = db
            .products()
            .insert(&NewProduct {
                company_id: company.id,
                name: name.to_string(),
                sku: Some(sku.to_string()),
                barcode: Some(barcode.to_string()),
                price_retail: Money::from_cents(retail),
                price_wholesale: Money::from_cents(wholesale),
                price_special: Money::from_cents(special),
                cost_price: Money::from_cents(cost),
            })
            .await?;

        db.inventory()
            .record_opening(
                company.id,
                product.id,
                warehouse.location(),
                Quantity::from_units(100),
                Some(UnitCost::from_money(product.cost_price)),
                Some("Demo opening stock"),
            )
            .await?;

        products.push(product);
    }
    info!(count = products.len(), "Catalog and opening stock created");

    for branch in [&downtown, &uptown] {
        let lines = products
            .iter()
            .map(|p| TransferLine {
                product_id: p.id,
                qty: Quantity::from_units(20),
            })
            .collect();

        db.transfers()
            .create(&NewTransfer {
                company_id: company.id,
                from_branch_id: warehouse.id,
                to_branch_id: branch.id,
                note: Some(format!("Initial stock for {}", branch.name)),
                lines,
                confirm: true,
                created_by_user_id: None,
            })
            .await?;
    }

    db.transfers()
        .create(&NewTransfer {
            company_id: company.id,
            from_branch_id: warehouse.id,
            to_branch_id: uptown.id,
            note: Some("Weekly restock (pending)".to_string()),
            lines: vec![TransferLine {
                product_id: products[0].id,
                qty: Quantity::normalize("12,5"),
            }],
            confirm: false,
            created_by_user_id: None,
        })
        .await?;

    let mut cart = Cart::new();
    cart.add_item(&products[0], Quantity::from_units(2))?;
    cart.add_item(&products[5], Quantity::normalize("0,750"))?;
    let sale = db
        .sales()
        .checkout(&cart.to_checkout(company.id, downtown.id, PaymentMethod::Cash)?)
        .await?;
    info!(sale_id = sale.sale.id, total = %sale.sale.total, "Demo sale created");

    let mismatches = db.inventory().verify_balances(company.id).await?;
    if mismatches.is_empty() {
        info!("Balances agree with kardex");
    } else {
        warn!(count = mismatches.len(), "Balances disagree with kardex");
    }

    info!(company_id = company.id, "Seed complete");
    db.close().await;
    Ok(())
}
