//! # Cart
//!
//! The POS cart and the checkout request it turns into.
//!
//! The cart is a plain value owned by one request/session; it is not
//! global state. Nothing here touches stock: checkout hands a
//! [`CheckoutRequest`] to the sale flow in kardex-db, which decrements
//! balances through the Stock Engine.
//!
//! ## Cart Operations Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Action                    Cart method              Effect              │
//! │  ───────────────           ─────────────            ─────────────────   │
//! │  Scan / pick product ────► add_item()  ───────────► push or qty += n   │
//! │  Change quantity ────────► set_quantity() ────────► qty = n (0 drops)  │
//! │  Pick client ────────────► set_client() ──────────► tier + reprice     │
//! │  Pick tier ──────────────► set_price_tier() ──────► reprice lines      │
//! │  Pay ────────────────────► to_checkout() ─────────► CheckoutRequest    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::quantity::Quantity;
use crate::types::{Client, PaymentMethod, PriceTier, Product};
use crate::validation::{validate_positive_qty, validate_price};
use crate::MAX_CART_ITEMS;

// =============================================================================
// Cart Item
// =============================================================================

/// An item in the cart. The price is frozen when the item is added and only
/// changes when the cart's tier changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CartItem {
    pub product_id: i64,
    pub name: String,
    pub qty: Quantity,
    pub unit_price: Money,
}

impl CartItem {
    pub fn from_product(product: &Product, tier: PriceTier, qty: Quantity) -> Self {
        CartItem {
            product_id: product.id,
            name: product.name.clone(),
            qty,
            unit_price: product.price_for(tier),
        }
    }

    pub fn line_total(&self) -> Money {
        self.unit_price.times(self.qty)
    }
}

// =============================================================================
// Cart
// =============================================================================

/// The shopping cart.
///
/// ## Invariants
/// - Items are unique by `product_id` (adding the same product increases qty)
/// - Quantity is > 0 (setting qty to 0 removes the item)
/// - At most [`MAX_CART_ITEMS`] lines
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Cart {
    pub price_tier: PriceTier,
    pub client_id: Option<i64>,
    pub items: Vec<CartItem>,
}

impl Cart {
    pub fn new() -> Self {
        Cart::default()
    }

    /// Adds a product or increases its quantity if already present.
    pub fn add_item(&mut self, product: &Product, qty: Quantity) -> CoreResult<()> {
        validate_positive_qty(qty)?;
        if !product.is_active {
            return Err(CoreError::ProductNotFound(product.id));
        }

        if let Some(item) = self.items.iter_mut().find(|i| i.product_id == product.id) {
            item.qty += qty;
            item.unit_price = product.price_for(self.price_tier);
            return Ok(());
        }

        if self.items.len() >= MAX_CART_ITEMS {
            return Err(CoreError::CartTooLarge {
                max: MAX_CART_ITEMS,
            });
        }

        self.items
            .push(CartItem::from_product(product, self.price_tier, qty));
        Ok(())
    }

    /// Sets the quantity of a line. Zero removes it.
    pub fn set_quantity(&mut self, product_id: i64, qty: Quantity) -> CoreResult<()> {
        if qty.is_zero() {
            self.remove_item(product_id);
            return Ok(());
        }
        validate_positive_qty(qty)?;

        let item = self
            .items
            .iter_mut()
            .find(|i| i.product_id == product_id)
            .ok_or(CoreError::ProductNotFound(product_id))?;
        item.qty = qty;
        Ok(())
    }

    /// Removes a line. Returns whether it was present.
    pub fn remove_item(&mut self, product_id: i64) -> bool {
        let initial_len = self.items.len();
        self.items.retain(|i| i.product_id != product_id);
        self.items.len() != initial_len
    }

    /// Switches tier and reprices every line whose product is in `catalog`.
    pub fn set_price_tier(&mut self, tier: PriceTier, catalog: &[Product]) {
        self.price_tier = tier;
        for item in &mut self.items {
            if let Some(product) = catalog.iter().find(|p| p.id == item.product_id) {
                item.unit_price = product.price_for(tier);
            }
        }
    }

    /// Attaches a client (or walk-in with `None`); the tier follows the
    /// client type.
    pub fn set_client(&mut self, client: Option<&Client>, catalog: &[Product]) {
        self.client_id = client.map(|c| c.id);
        let tier = client
            .map(|c| c.client_type.price_tier())
            .unwrap_or_default();
        self.set_price_tier(tier, catalog);
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    pub fn total_quantity(&self) -> Quantity {
        self.items.iter().map(|i| i.qty).sum()
    }

    pub fn subtotal(&self) -> Money {
        self.items.iter().map(|i| i.line_total()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Builds the checkout request for this cart.
    pub fn to_checkout(
        &self,
        company_id: i64,
        branch_id: i64,
        payment_method: PaymentMethod,
    ) -> CoreResult<CheckoutRequest> {
        let request = CheckoutRequest {
            company_id,
            branch_id,
            client_id: self.client_id,
            price_tier: self.price_tier,
            payment_method,
            lines: self
                .items
                .iter()
                .map(|i| CheckoutLine {
                    product_id: i.product_id,
                    qty: i.qty,
                    unit_price: i.unit_price,
                })
                .collect(),
        };
        request.validate()?;
        Ok(request)
    }
}

// =============================================================================
// Checkout Request
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CheckoutLine {
    pub product_id: i64,
    pub qty: Quantity,
    pub unit_price: Money,
}

impl CheckoutLine {
    pub fn subtotal(&self) -> Money {
        self.unit_price.times(self.qty)
    }
}

/// Everything the sale flow needs to record a sale.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CheckoutRequest {
    pub company_id: i64,
    pub branch_id: i64,
    pub client_id: Option<i64>,
    pub price_tier: PriceTier,
    pub payment_method: PaymentMethod,
    pub lines: Vec<CheckoutLine>,
}

impl CheckoutRequest {
    /// Rejects empty or oversized requests, duplicate products,
    /// non-positive quantities and negative prices.
    pub fn validate(&self) -> CoreResult<()> {
        if self.lines.is_empty() {
            return Err(CoreError::EmptyDocument { document: "sale" });
        }
        if self.lines.len() > MAX_CART_ITEMS {
            return Err(CoreError::CartTooLarge {
                max: MAX_CART_ITEMS,
            });
        }

        let mut seen = HashSet::new();
        for line in &self.lines {
            if !seen.insert(line.product_id) {
                return Err(CoreError::DuplicateLine {
                    product_id: line.product_id,
                });
            }
            validate_positive_qty(line.qty)?;
            validate_price("unit_price", line.unit_price)?;
        }

        Ok(())
    }

    pub fn subtotal(&self) -> Money {
        self.lines.iter().map(|l| l.subtotal()).sum()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ClientType;
    use chrono::Utc;

    fn test_product(id: i64, retail: i64, wholesale: i64) -> Product {
        Product {
            id,
            company_id: 1,
            name: format!("Product {}", id),
            sku: Some(format!("SKU-{}", id)),
            barcode: None,
            price_retail: Money::from_cents(retail),
            price_wholesale: Money::from_cents(wholesale),
            price_special: Money::zero(),
            cost_price: Money::from_cents(retail / 2),
            is_active: true,
            created_at: Utc::now(),
        }
    }

    fn test_client(client_type: ClientType) -> Client {
        Client {
            id: 40,
            company_id: 1,
            full_name: "Ana Perez".to_string(),
            phone: None,
            email: None,
            client_type,
            is_active: true,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_cart_add_same_product_increases_quantity() {
        let mut cart = Cart::new();
        let product = test_product(7, 999, 800);

        cart.add_item(&product, Quantity::from_units(2)).unwrap();
        cart.add_item(&product, Quantity::from_milli(500)).unwrap();

        assert_eq!(cart.item_count(), 1);
        assert_eq!(cart.total_quantity(), Quantity::from_milli(2500));
        // 9.99 × 2.5 = 24.975 → 24.98
        assert_eq!(cart.subtotal().cents(), 2498);
    }

    #[test]
    fn test_cart_rejects_inactive_and_zero() {
        let mut cart = Cart::new();
        let mut product = test_product(7, 999, 800);

        assert!(cart.add_item(&product, Quantity::ZERO).is_err());
        product.is_active = false;
        assert!(matches!(
            cart.add_item(&product, Quantity::from_units(1)),
            Err(CoreError::ProductNotFound(7))
        ));
        assert!(cart.is_empty());
    }

    #[test]
    fn test_set_quantity_zero_removes() {
        let mut cart = Cart::new();
        cart.add_item(&test_product(7, 100, 90), Quantity::from_units(1)).unwrap();

        cart.set_quantity(7, Quantity::from_units(4)).unwrap();
        assert_eq!(cart.total_quantity(), Quantity::from_units(4));

        cart.set_quantity(7, Quantity::ZERO).unwrap();
        assert!(cart.is_empty());
        assert!(cart.set_quantity(7, Quantity::from_units(1)).is_err());
    }

    #[test]
    fn test_wholesale_client_reprices_cart() {
        let catalog = vec![test_product(7, 1000, 850), test_product(8, 500, 0)];
        let mut cart = Cart::new();
        cart.add_item(&catalog[0], Quantity::from_units(1)).unwrap();
        cart.add_item(&catalog[1], Quantity::from_units(2)).unwrap();
        assert_eq!(cart.subtotal().cents(), 2000);

        let client = test_client(ClientType::Wholesale);
        cart.set_client(Some(&client), &catalog);
        assert_eq!(cart.price_tier, PriceTier::Wholesale);
        assert_eq!(cart.client_id, Some(40));
        // product 8 has no wholesale price and stays at retail
        assert_eq!(cart.subtotal().cents(), 850 + 1000);

        cart.set_client(None, &catalog);
        assert_eq!(cart.price_tier, PriceTier::Retail);
        assert_eq!(cart.subtotal().cents(), 2000);
    }

    #[test]
    fn test_to_checkout_carries_lines_and_tier() {
        let product = test_product(7, 1000, 850);
        let mut cart = Cart::new();
        cart.add_item(&product, Quantity::from_units(3)).unwrap();

        let request = cart.to_checkout(1, 3, PaymentMethod::Transfer).unwrap();
        assert_eq!(request.lines.len(), 1);
        assert_eq!(request.subtotal().cents(), 3000);
        assert_eq!(request.payment_method, PaymentMethod::Transfer);
    }

    #[test]
    fn test_empty_cart_cannot_check_out() {
        let cart = Cart::new();
        assert!(matches!(
            cart.to_checkout(1, 3, PaymentMethod::Cash),
            Err(CoreError::EmptyDocument { .. })
        ));
    }

    #[test]
    fn test_checkout_rejects_duplicate_products() {
        let line = CheckoutLine {
            product_id: 7,
            qty: Quantity::from_units(1),
            unit_price: Money::from_cents(100),
        };
        let request = CheckoutRequest {
            company_id: 1,
            branch_id: 3,
            client_id: None,
            price_tier: PriceTier::Retail,
            payment_method: PaymentMethod::Cash,
            lines: vec![line, line],
        };
        assert!(matches!(
            request.validate(),
            Err(CoreError::DuplicateLine { product_id: 7 })
        ));
    }

    #[test]
    fn test_checkout_rejects_too_many_lines() {
        let lines = |count: usize| -> Vec<CheckoutLine> {
            (1..=count as i64)
                .map(|product_id| CheckoutLine {
                    product_id,
                    qty: Quantity::from_units(1),
                    unit_price: Money::from_cents(100),
                })
                .collect()
        };
        let mut request = CheckoutRequest {
            company_id: 1,
            branch_id: 3,
            client_id: None,
            price_tier: PriceTier::Retail,
            payment_method: PaymentMethod::Cash,
            lines: lines(MAX_CART_ITEMS),
        };
        assert!(request.validate().is_ok());

        request.lines = lines(MAX_CART_ITEMS + 1);
        assert!(matches!(
            request.validate(),
            Err(CoreError::CartTooLarge { max: MAX_CART_ITEMS })
        ));
    }
}
