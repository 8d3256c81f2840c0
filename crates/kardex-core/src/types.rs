//! # Domain Types
//!
//! Tags and entities used throughout Kardex POS.
//!
//! ## Type Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  Tags (closed sets, parsed from strings)                                │
//! │  ├── LocationType   WAREHOUSE | BRANCH                                  │
//! │  ├── MoveType       OPENING | PURCHASE_IN | TRANSFER | ADJUST | ...     │
//! │  ├── TransferStatus DRAFT | CONFIRMED                                   │
//! │  ├── PriceTier      retail | wholesale | special                        │
//! │  └── PaymentMethod  cash | transfer                                     │
//! │                                                                         │
//! │  Stock              Documents                 Master data               │
//! │  ├── Location       ├── StockTransfer         ├── Company               │
//! │  ├── Inventory-     ├── StockTransferItem     ├── Branch                │
//! │  │   Balance        ├── Sale                  ├── Product               │
//! │  └── Kardex-        ├── SaleItem              └── Client                │
//! │      Movement       └── SyncEvent                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every entity is scoped by `company_id`; cross-company references are
//! rejected by the repositories.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::ValidationError;
use crate::money::Money;
use crate::quantity::{Quantity, UnitCost};

/// Implements `ALL`, `as_str`, `Display` and `FromStr` for a closed tag set.
///
/// Parsing trims and ignores ASCII case; unknown input is a
/// [`ValidationError::NotAllowed`].
macro_rules! tag_enum {
    ($ty:ident, $field:literal, { $($variant:ident => $tag:literal),+ $(,)? }) => {
        impl $ty {
            pub const ALL: &'static [$ty] = &[$($ty::$variant),+];

            pub const fn as_str(&self) -> &'static str {
                match self {
                    $($ty::$variant => $tag),+
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = ValidationError;

            fn from_str(raw: &str) -> Result<Self, Self::Err> {
                let raw = raw.trim();
                $(
                    if raw.eq_ignore_ascii_case($tag) {
                        return Ok($ty::$variant);
                    }
                )+
                Err(ValidationError::not_allowed($field, &[$($tag),+]))
            }
        }
    };
}

// =============================================================================
// Location
// =============================================================================

/// Kind of place where stock is held.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export)]
pub enum LocationType {
    Warehouse,
    Branch,
}

tag_enum!(LocationType, "location_type", {
    Warehouse => "WAREHOUSE",
    Branch => "BRANCH",
});

/// A stock location: `(kind, branch id)`.
///
/// Warehouses are branches flagged `is_warehouse`, so both kinds point at
/// the `branches` table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Location {
    pub kind: LocationType,
    pub id: i64,
}

impl Location {
    pub const fn new(kind: LocationType, id: i64) -> Self {
        Location { kind, id }
    }

    pub const fn warehouse(id: i64) -> Self {
        Location::new(LocationType::Warehouse, id)
    }

    pub const fn branch(id: i64) -> Self {
        Location::new(LocationType::Branch, id)
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}

// =============================================================================
// Move Type
// =============================================================================

/// Reason tag carried by every kardex movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export)]
pub enum MoveType {
    /// Initial stock load.
    Opening,
    /// Goods received from a supplier into the warehouse.
    PurchaseIn,
    /// Location to location move.
    Transfer,
    /// Manual correction after a count.
    Adjust,
    Shrinkage,
    Damage,
    SaleOut,
    SaleEdit,
    SaleVoid,
}

tag_enum!(MoveType, "move_type", {
    Opening => "OPENING",
    PurchaseIn => "PURCHASE_IN",
    Transfer => "TRANSFER",
    Adjust => "ADJUST",
    Shrinkage => "SHRINKAGE",
    Damage => "DAMAGE",
    SaleOut => "SALE_OUT",
    SaleEdit => "SALE_EDIT",
    SaleVoid => "SALE_VOID",
});

impl MoveType {
    /// Loss tags accepted by the loss-recording flow.
    pub const fn is_loss(&self) -> bool {
        matches!(self, MoveType::Shrinkage | MoveType::Damage)
    }
}

// =============================================================================
// Document / Commercial Tags
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export)]
pub enum TransferStatus {
    Draft,
    Confirmed,
}

tag_enum!(TransferStatus, "status", {
    Draft => "DRAFT",
    Confirmed => "CONFIRMED",
});

/// Which product price a sale uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum PriceTier {
    #[default]
    Retail,
    Wholesale,
    Special,
}

tag_enum!(PriceTier, "price_tier", {
    Retail => "retail",
    Wholesale => "wholesale",
    Special => "special",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum PaymentMethod {
    #[default]
    Cash,
    /// Bank transfer.
    Transfer,
}

tag_enum!(PaymentMethod, "payment_method", {
    Cash => "cash",
    Transfer => "transfer",
});

impl PaymentMethod {
    /// Lenient form used at checkout: anything unrecognized is cash.
    pub fn from_input(raw: &str) -> Self {
        raw.parse().unwrap_or_default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum ClientType {
    #[default]
    Normal,
    Wholesale,
    Special,
}

tag_enum!(ClientType, "client_type", {
    Normal => "normal",
    Wholesale => "wholesale",
    Special => "special",
});

impl ClientType {
    pub const fn price_tier(&self) -> PriceTier {
        match self {
            ClientType::Normal => PriceTier::Retail,
            ClientType::Wholesale => PriceTier::Wholesale,
            ClientType::Special => PriceTier::Special,
        }
    }
}

// =============================================================================
// Sync Tags
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export)]
pub enum SyncEventStatus {
    Pending,
    Sent,
    Applied,
    Error,
}

tag_enum!(SyncEventStatus, "status", {
    Pending => "PENDING",
    Sent => "SENT",
    Applied => "APPLIED",
    Error => "ERROR",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export)]
pub enum SyncEntity {
    Sale,
    StockTransfer,
    Inventory,
}

tag_enum!(SyncEntity, "entity", {
    Sale => "SALE",
    StockTransfer => "STOCK_TRANSFER",
    Inventory => "INVENTORY",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export)]
pub enum SyncAction {
    Create,
    Update,
    Delete,
    Confirm,
}

tag_enum!(SyncAction, "action", {
    Create => "CREATE",
    Update => "UPDATE",
    Delete => "DELETE",
    Confirm => "CONFIRM",
});

// =============================================================================
// Master Data
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Company {
    pub id: i64,
    pub name: String,
    pub is_active: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// A point of sale or the company warehouse.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Branch {
    pub id: i64,
    pub company_id: i64,
    pub name: String,
    /// At most one active branch per company carries this flag.
    pub is_warehouse: bool,
    pub is_active: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl Branch {
    /// Stock location of this branch; the warehouse flag picks the kind.
    pub const fn location(&self) -> Location {
        if self.is_warehouse {
            Location::warehouse(self.id)
        } else {
            Location::branch(self.id)
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Product {
    pub id: i64,
    pub company_id: i64,
    pub name: String,
    pub sku: Option<String>,
    pub barcode: Option<String>,
    pub price_retail: Money,
    pub price_wholesale: Money,
    pub price_special: Money,
    /// Current cost. Copied onto sale items at sale time.
    pub cost_price: Money,
    pub is_active: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl Product {
    /// Price for a tier. Wholesale and special fall back to retail when unset.
    pub fn price_for(&self, tier: PriceTier) -> Money {
        let price = match tier {
            PriceTier::Retail => self.price_retail,
            PriceTier::Wholesale => self.price_wholesale,
            PriceTier::Special => self.price_special,
        };
        if price.is_zero() {
            self.price_retail
        } else {
            price
        }
    }
}

/// Input for creating a product.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewProduct {
    pub company_id: i64,
    pub name: String,
    pub sku: Option<String>,
    pub barcode: Option<String>,
    pub price_retail: Money,
    pub price_wholesale: Money,
    pub price_special: Money,
    pub cost_price: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Client {
    pub id: i64,
    pub company_id: i64,
    pub full_name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub client_type: ClientType,
    pub is_active: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewClient {
    pub company_id: i64,
    pub full_name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub client_type: ClientType,
}

// =============================================================================
// Stock
// =============================================================================

/// Current quantity of one product at one location.
///
/// Never negative. Unique per `(company, product, location)`.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct InventoryBalance {
    pub id: i64,
    pub company_id: i64,
    pub product_id: i64,
    pub location_type: LocationType,
    pub location_id: i64,
    pub qty: Quantity,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl InventoryBalance {
    pub const fn location(&self) -> Location {
        Location::new(self.location_type, self.location_id)
    }
}

/// One append-only ledger row.
///
/// `qty` is always positive; direction is given by which side is set.
/// Inflows set only the destination, outflows only the source, transfers
/// both.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct KardexMovement {
    pub id: i64,
    pub company_id: i64,
    pub product_id: i64,
    pub move_type: MoveType,
    pub from_location_type: Option<LocationType>,
    pub from_location_id: Option<i64>,
    pub to_location_type: Option<LocationType>,
    pub to_location_id: Option<i64>,
    pub qty: Quantity,
    pub unit_cost: Option<UnitCost>,
    pub note: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl KardexMovement {
    pub fn source(&self) -> Option<Location> {
        self.from_location_type
            .zip(self.from_location_id)
            .map(|(kind, id)| Location::new(kind, id))
    }

    pub fn destination(&self) -> Option<Location> {
        self.to_location_type
            .zip(self.to_location_id)
            .map(|(kind, id)| Location::new(kind, id))
    }

    /// Signed effect of this row on the balance at `location`.
    pub fn effect_on(&self, location: Location) -> Quantity {
        let mut effect = Quantity::ZERO;
        if self.destination() == Some(location) {
            effect += self.qty;
        }
        if self.source() == Some(location) {
            effect -= self.qty;
        }
        effect
    }
}

// =============================================================================
// Stock Transfers
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct StockTransfer {
    pub id: i64,
    pub company_id: i64,
    pub from_branch_id: i64,
    pub to_branch_id: i64,
    pub note: Option<String>,
    pub status: TransferStatus,
    #[ts(as = "Option<String>")]
    pub confirmed_at: Option<DateTime<Utc>>,
    pub created_by_user_id: Option<i64>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct StockTransferItem {
    pub id: i64,
    pub transfer_id: i64,
    pub product_id: i64,
    pub qty: Quantity,
}

/// One requested transfer line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TransferLine {
    pub product_id: i64,
    pub qty: Quantity,
}

/// Input for creating a transfer document.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewTransfer {
    pub company_id: i64,
    pub from_branch_id: i64,
    pub to_branch_id: i64,
    pub note: Option<String>,
    pub lines: Vec<TransferLine>,
    /// Create already confirmed (applies stock immediately).
    pub confirm: bool,
    pub created_by_user_id: Option<i64>,
}

impl NewTransfer {
    /// Lines with a product and a positive quantity, in request order.
    pub fn usable_lines(&self) -> Vec<TransferLine> {
        self.lines
            .iter()
            .filter(|line| line.product_id > 0 && line.qty.is_positive())
            .copied()
            .collect()
    }
}

// =============================================================================
// Sales
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Sale {
    pub id: i64,
    pub company_id: i64,
    pub branch_id: i64,
    pub client_id: Option<i64>,
    pub price_tier: PriceTier,
    pub payment_method: PaymentMethod,
    /// Sum of item subtotals.
    pub subtotal: Money,
    pub discount_total: Money,
    pub total: Money,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// A sale line. `unit_cost` is the product cost when the line was created.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct SaleItem {
    pub id: i64,
    pub sale_id: i64,
    pub product_id: i64,
    pub qty: Quantity,
    pub unit_price: Money,
    pub unit_cost: Money,
    pub discount: Money,
    pub subtotal: Money,
}

impl SaleItem {
    /// Line cost at the photographed unit cost.
    pub fn cost(&self) -> Money {
        self.unit_cost.times(self.qty)
    }

    pub fn profit(&self) -> Money {
        self.subtotal - self.cost()
    }
}

// =============================================================================
// Sync Events
// =============================================================================

/// An entry in the outbound sync log. Written in the same transaction as
/// the change it describes.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct SyncEvent {
    /// UUID v4.
    pub id: String,
    pub company_id: i64,
    pub branch_id: Option<i64>,
    pub entity: SyncEntity,
    pub entity_id: Option<i64>,
    pub action: SyncAction,
    pub payload_json: Option<String>,
    pub status: SyncEventStatus,
    pub last_error: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn movement(from: Option<Location>, to: Option<Location>, qty: i64) -> KardexMovement {
        KardexMovement {
            id: 1,
            company_id: 1,
            product_id: 7,
            move_type: MoveType::Transfer,
            from_location_type: from.map(|l| l.kind),
            from_location_id: from.map(|l| l.id),
            to_location_type: to.map(|l| l.kind),
            to_location_id: to.map(|l| l.id),
            qty: Quantity::from_units(qty),
            unit_cost: None,
            note: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_move_type_parse() {
        assert_eq!("SALE_OUT".parse::<MoveType>().unwrap(), MoveType::SaleOut);
        assert_eq!(" purchase_in ".parse::<MoveType>().unwrap(), MoveType::PurchaseIn);
        assert!(matches!(
            "RESTOCK".parse::<MoveType>(),
            Err(ValidationError::NotAllowed { .. })
        ));
        assert_eq!(MoveType::ALL.len(), 9);
    }

    #[test]
    fn test_location_type_parse_rejects_unknown() {
        assert_eq!(
            "warehouse".parse::<LocationType>().unwrap(),
            LocationType::Warehouse
        );
        assert!("SHELF".parse::<LocationType>().is_err());
    }

    #[test]
    fn test_tags_round_trip_through_serde() {
        let json = serde_json::to_string(&MoveType::SaleVoid).unwrap();
        assert_eq!(json, "\"SALE_VOID\"");
        let json = serde_json::to_string(&PriceTier::Wholesale).unwrap();
        assert_eq!(json, "\"wholesale\"");
    }

    #[test]
    fn test_payment_method_falls_back_to_cash() {
        assert_eq!(PaymentMethod::from_input("transfer"), PaymentMethod::Transfer);
        assert_eq!(PaymentMethod::from_input("card"), PaymentMethod::Cash);
        assert_eq!(PaymentMethod::from_input(""), PaymentMethod::Cash);
    }

    #[test]
    fn test_branch_location_follows_warehouse_flag() {
        let mut branch = Branch {
            id: 3,
            company_id: 1,
            name: "Downtown".to_string(),
            is_warehouse: false,
            is_active: true,
            created_at: Utc::now(),
        };
        assert_eq!(branch.location(), Location::branch(3));
        branch.is_warehouse = true;
        assert_eq!(branch.location(), Location::warehouse(3));
        assert_eq!(branch.location().to_string(), "WAREHOUSE:3");
    }

    #[test]
    fn test_price_for_falls_back_to_retail() {
        let product = Product {
            id: 7,
            company_id: 1,
            name: "Rice 1kg".to_string(),
            sku: None,
            barcode: None,
            price_retail: Money::from_cents(1000),
            price_wholesale: Money::from_cents(850),
            price_special: Money::zero(),
            cost_price: Money::from_cents(600),
            is_active: true,
            created_at: Utc::now(),
        };
        assert_eq!(product.price_for(PriceTier::Wholesale).cents(), 850);
        assert_eq!(product.price_for(PriceTier::Special).cents(), 1000);
        assert_eq!(ClientType::Wholesale.price_tier(), PriceTier::Wholesale);
    }

    #[test]
    fn test_movement_effect_on_location() {
        let wh = Location::warehouse(1);
        let br = Location::branch(3);

        let transfer = movement(Some(wh), Some(br), 4);
        assert_eq!(transfer.effect_on(wh), Quantity::from_units(-4));
        assert_eq!(transfer.effect_on(br), Quantity::from_units(4));
        assert_eq!(transfer.effect_on(Location::branch(9)), Quantity::ZERO);

        let inflow = movement(None, Some(br), 2);
        assert_eq!(inflow.source(), None);
        assert_eq!(inflow.effect_on(br), Quantity::from_units(2));
    }

    #[test]
    fn test_usable_lines_drops_empty() {
        let transfer = NewTransfer {
            company_id: 1,
            from_branch_id: 1,
            to_branch_id: 3,
            lines: vec![
                TransferLine { product_id: 7, qty: Quantity::from_units(4) },
                TransferLine { product_id: 8, qty: Quantity::ZERO },
                TransferLine { product_id: 0, qty: Quantity::from_units(1) },
            ],
            ..Default::default()
        };
        assert_eq!(transfer.usable_lines().len(), 1);
    }

    #[test]
    fn test_sale_item_profit() {
        let item = SaleItem {
            id: 1,
            sale_id: 1,
            product_id: 7,
            qty: Quantity::from_units(3),
            unit_price: Money::from_cents(1000),
            unit_cost: Money::from_cents(600),
            discount: Money::zero(),
            subtotal: Money::from_cents(3000),
        };
        assert_eq!(item.cost().cents(), 1800);
        assert_eq!(item.profit().cents(), 1200);
    }
}
