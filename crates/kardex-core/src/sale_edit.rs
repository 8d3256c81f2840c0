//! # Sale Edit Planning
//!
//! Turns "the sale should now contain these lines" into per-product
//! changes, so the sale flow only moves the difference through the Stock
//! Engine.
//!
//! ```text
//!   persisted items            proposed lines             plan
//!   ───────────────            ──────────────             ─────────────────
//!   product 7 × 3      ───►    product 7 × 5      ───►    Increase +2 (out)
//!   product 8 × 2              product 9 × 1              Remove   2  (in)
//!                                                         Add      1  (out)
//! ```
//!
//! Applying the same proposal twice yields only `Keep` changes the second
//! time, so re-submitting an edit never moves stock.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::quantity::Quantity;
use crate::types::{PaymentMethod, SaleItem};
use crate::validation::validate_price;

/// One desired line of the edited sale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct EditLine {
    pub product_id: i64,
    /// Zero drops the line.
    pub qty: Quantity,
    /// `None` keeps the recorded price (or uses the tier price for new lines).
    pub unit_price: Option<Money>,
}

/// The complete desired state of a sale. Products not listed are removed.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SaleEdit {
    pub lines: Vec<EditLine>,
    pub payment_method: Option<PaymentMethod>,
}

/// What happens to one product when an edit is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineChange {
    /// Same quantity; the price may still be rewritten.
    Keep {
        item_id: i64,
        qty: Quantity,
        unit_price: Option<Money>,
    },
    /// More sold: `delta` leaves the branch.
    Increase {
        item_id: i64,
        product_id: i64,
        delta: Quantity,
        new_qty: Quantity,
        unit_price: Option<Money>,
    },
    /// Less sold: `delta` returns to the branch.
    Decrease {
        item_id: i64,
        product_id: i64,
        delta: Quantity,
        new_qty: Quantity,
        unit_price: Option<Money>,
    },
    /// Line dropped: its whole quantity returns to the branch.
    Remove {
        item_id: i64,
        product_id: i64,
        qty: Quantity,
    },
    /// New product on the sale.
    Add {
        product_id: i64,
        qty: Quantity,
        unit_price: Option<Money>,
    },
}

impl LineChange {
    /// Net stock leaving the branch because of this change (negative means
    /// stock coming back).
    pub fn stock_out(&self) -> Quantity {
        match *self {
            LineChange::Keep { .. } => Quantity::ZERO,
            LineChange::Increase { delta, .. } => delta,
            LineChange::Decrease { delta, .. } => -delta,
            LineChange::Remove { qty, .. } => -qty,
            LineChange::Add { qty, .. } => qty,
        }
    }

    /// Whether the sale still has this line afterwards.
    pub fn keeps_line(&self) -> bool {
        !matches!(self, LineChange::Remove { .. })
    }
}

/// Plans an edit against the persisted items of a sale.
///
/// Existing items come first in their stored order, then new products in
/// the order they were proposed.
///
/// ## Errors
/// - [`CoreError::DuplicateLine`] if a product is proposed twice
/// - [`CoreError::EmptyDocument`] if no line would remain
/// - validation errors for negative quantities or prices
pub fn plan_sale_edit(existing: &[SaleItem], edit: &SaleEdit) -> CoreResult<Vec<LineChange>> {
    let mut seen = HashSet::new();
    for line in &edit.lines {
        if !seen.insert(line.product_id) {
            return Err(CoreError::DuplicateLine {
                product_id: line.product_id,
            });
        }
        if line.qty.is_negative() {
            return Err(ValidationError::MustNotBeNegative {
                field: "qty".to_string(),
            }
            .into());
        }
        if let Some(price) = line.unit_price {
            validate_price("unit_price", price)?;
        }
    }

    let mut plan = Vec::with_capacity(existing.len() + edit.lines.len());

    for item in existing {
        let proposed = edit.lines.iter().find(|l| l.product_id == item.product_id);
        let change = match proposed {
            None => LineChange::Remove {
                item_id: item.id,
                product_id: item.product_id,
                qty: item.qty,
            },
            Some(line) if line.qty.is_zero() => LineChange::Remove {
                item_id: item.id,
                product_id: item.product_id,
                qty: item.qty,
            },
            Some(line) if line.qty > item.qty => LineChange::Increase {
                item_id: item.id,
                product_id: item.product_id,
                delta: line.qty - item.qty,
                new_qty: line.qty,
                unit_price: line.unit_price,
            },
            Some(line) if line.qty < item.qty => LineChange::Decrease {
                item_id: item.id,
                product_id: item.product_id,
                delta: item.qty - line.qty,
                new_qty: line.qty,
                unit_price: line.unit_price,
            },
            Some(line) => LineChange::Keep {
                item_id: item.id,
                qty: item.qty,
                unit_price: line.unit_price,
            },
        };
        plan.push(change);
    }

    for line in &edit.lines {
        let is_new = !existing.iter().any(|i| i.product_id == line.product_id);
        if is_new && line.qty.is_positive() {
            plan.push(LineChange::Add {
                product_id: line.product_id,
                qty: line.qty,
                unit_price: line.unit_price,
            });
        }
    }

    if !plan.iter().any(LineChange::keeps_line) {
        return Err(CoreError::EmptyDocument { document: "sale" });
    }

    Ok(plan)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: i64, product_id: i64, units: i64) -> SaleItem {
        SaleItem {
            id,
            sale_id: 1,
            product_id,
            qty: Quantity::from_units(units),
            unit_price: Money::from_cents(1000),
            unit_cost: Money::from_cents(600),
            discount: Money::zero(),
            subtotal: Money::from_cents(1000 * units),
        }
    }

    fn line(product_id: i64, units: i64) -> EditLine {
        EditLine {
            product_id,
            qty: Quantity::from_units(units),
            unit_price: None,
        }
    }

    fn edit(lines: Vec<EditLine>) -> SaleEdit {
        SaleEdit {
            lines,
            payment_method: None,
        }
    }

    #[test]
    fn test_increase_remove_and_add() {
        let existing = vec![item(1, 7, 3), item(2, 8, 2)];
        let plan = plan_sale_edit(&existing, &edit(vec![line(7, 5), line(9, 1)])).unwrap();

        assert_eq!(plan.len(), 3);
        assert_eq!(plan[0].stock_out(), Quantity::from_units(2));
        assert!(matches!(plan[1], LineChange::Remove { product_id: 8, .. }));
        assert_eq!(plan[1].stock_out(), Quantity::from_units(-2));
        assert!(matches!(plan[2], LineChange::Add { product_id: 9, .. }));
    }

    #[test]
    fn test_decrease_returns_difference() {
        let existing = vec![item(1, 7, 3)];
        let plan = plan_sale_edit(&existing, &edit(vec![line(7, 1)])).unwrap();

        match plan[0] {
            LineChange::Decrease { delta, new_qty, .. } => {
                assert_eq!(delta, Quantity::from_units(2));
                assert_eq!(new_qty, Quantity::from_units(1));
            }
            other => panic!("unexpected change: {:?}", other),
        }
    }

    #[test]
    fn test_same_lines_only_keep() {
        let existing = vec![item(1, 7, 3), item(2, 8, 2)];
        let plan = plan_sale_edit(&existing, &edit(vec![line(8, 2), line(7, 3)])).unwrap();

        assert!(plan.iter().all(|c| matches!(c, LineChange::Keep { .. })));
        let moved: Quantity = plan.iter().map(LineChange::stock_out).sum();
        assert!(moved.is_zero());
    }

    #[test]
    fn test_zero_qty_removes_line() {
        let existing = vec![item(1, 7, 3), item(2, 8, 2)];
        let plan = plan_sale_edit(&existing, &edit(vec![line(7, 0), line(8, 2)])).unwrap();

        assert!(matches!(plan[0], LineChange::Remove { item_id: 1, .. }));
    }

    #[test]
    fn test_removing_everything_is_rejected() {
        let existing = vec![item(1, 7, 3)];
        assert!(matches!(
            plan_sale_edit(&existing, &edit(vec![])),
            Err(CoreError::EmptyDocument { .. })
        ));
        assert!(matches!(
            plan_sale_edit(&existing, &edit(vec![line(7, 0), line(9, 0)])),
            Err(CoreError::EmptyDocument { .. })
        ));
    }

    #[test]
    fn test_duplicate_proposal_is_rejected() {
        let existing = vec![item(1, 7, 3)];
        assert!(matches!(
            plan_sale_edit(&existing, &edit(vec![line(7, 1), line(7, 2)])),
            Err(CoreError::DuplicateLine { product_id: 7 })
        ));
    }
}
