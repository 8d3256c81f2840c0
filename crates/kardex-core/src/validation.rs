//! # Validation Module
//!
//! Input validation utilities for Kardex POS.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: THIS MODULE                                                  │
//! │  ├── Names, codes, notes, positive quantities                          │
//! │  └── Runs before any write                                             │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Repositories (kardex-db)                                     │
//! │  └── Company scoping, active flags, warehouse uniqueness               │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── CHECK (qty >= 0) on balances, CHECK (qty > 0) on the ledger       │
//! │  ├── UNIQUE constraints                                                │
//! │  └── Foreign key constraints                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::error::ValidationError;
use crate::money::Money;
use crate::quantity::Quantity;
use crate::MAX_NOTE_LEN;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

fn required_text(field: &str, value: &str, max: usize) -> ValidationResult<String> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if value.chars().count() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }

    Ok(value.to_string())
}

// =============================================================================
// String Validators
// =============================================================================

/// Validates a product code (SKU or barcode).
///
/// ## Rules
/// - Must be between 1 and 64 characters
/// - Letters, numbers, hyphens, underscores and dots only
///
/// ## Example
/// ```rust
/// use kardex_core::validation::validate_code;
///
/// assert!(validate_code("sku", "RICE-1KG").is_ok());
/// assert!(validate_code("sku", "").is_err());
/// assert!(validate_code("barcode", "has space").is_err());
/// ```
pub fn validate_code(field: &str, code: &str) -> ValidationResult<String> {
    let code = required_text(field, code, 64)?;

    if !code
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_' || c == '.')
    {
        return Err(ValidationError::InvalidFormat {
            field: field.to_string(),
            reason: "must contain only letters, numbers, hyphens, underscores and dots"
                .to_string(),
        });
    }

    Ok(code)
}

/// Optional code: blank input means "no code".
pub fn validate_optional_code(field: &str, code: Option<&str>) -> ValidationResult<Option<String>> {
    match code.map(str::trim) {
        None | Some("") => Ok(None),
        Some(code) => validate_code(field, code).map(Some),
    }
}

/// Product names: 1 to 200 characters. Returns the trimmed name.
pub fn validate_product_name(name: &str) -> ValidationResult<String> {
    required_text("name", name, 200)
}

/// Branch and company names: 1 to 120 characters. Returns the trimmed name.
pub fn validate_branch_name(name: &str) -> ValidationResult<String> {
    required_text("name", name, 120)
}

/// Client names: 1 to 200 characters. Returns the trimmed name.
pub fn validate_client_name(name: &str) -> ValidationResult<String> {
    required_text("full_name", name, 200)
}

/// Free-text notes: trimmed, blank becomes `None`, at most 255 characters.
pub fn validate_note(note: Option<&str>) -> ValidationResult<Option<String>> {
    let note = match note.map(str::trim) {
        None | Some("") => return Ok(None),
        Some(note) => note,
    };

    if note.chars().count() > MAX_NOTE_LEN {
        return Err(ValidationError::TooLong {
            field: "note".to_string(),
            max: MAX_NOTE_LEN,
        });
    }

    Ok(Some(note.to_string()))
}

/// Search queries may be empty; at most 100 characters.
pub fn validate_search_query(query: &str) -> ValidationResult<String> {
    let query = query.trim();

    if query.chars().count() > 100 {
        return Err(ValidationError::TooLong {
            field: "query".to_string(),
            max: 100,
        });
    }

    Ok(query.to_string())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Quantities handed to the Stock Engine must be strictly positive.
///
/// ## User Workflow
/// ```text
/// User enters "0" or "abc"
///      │
///      ▼
/// Quantity::normalize → 0.000
///      │
///      ▼
/// validate_positive_qty ← THIS FUNCTION
///      │
///      └── MustBePositive, nothing written
/// ```
pub fn validate_positive_qty(qty: Quantity) -> ValidationResult<()> {
    if !qty.is_positive() {
        return Err(ValidationError::MustBePositive {
            field: "qty".to_string(),
        });
    }

    Ok(())
}

/// Prices and costs may be zero but never negative.
///
/// ## Example
/// ```rust
/// use kardex_core::{validation::validate_price, Money};
///
/// assert!(validate_price("price_retail", Money::from_cents(1099)).is_ok());
/// assert!(validate_price("price_retail", Money::zero()).is_ok());
/// assert!(validate_price("price_retail", Money::from_cents(-1)).is_err());
/// ```
pub fn validate_price(field: &str, price: Money) -> ValidationResult<()> {
    if price.is_negative() {
        return Err(ValidationError::MustNotBeNegative {
            field: field.to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_code() {
        assert_eq!(validate_code("sku", "  COKE-330 ").unwrap(), "COKE-330");
        assert!(validate_code("sku", "7791234.01").is_ok());
        assert!(validate_code("sku", "   ").is_err());
        assert!(validate_code("sku", &"A".repeat(65)).is_err());
    }

    #[test]
    fn test_validate_optional_code() {
        assert_eq!(validate_optional_code("sku", None).unwrap(), None);
        assert_eq!(validate_optional_code("sku", Some("  ")).unwrap(), None);
        assert_eq!(
            validate_optional_code("barcode", Some("779")).unwrap(),
            Some("779".to_string())
        );
        assert!(validate_optional_code("barcode", Some("a b")).is_err());
    }

    #[test]
    fn test_validate_names() {
        assert_eq!(validate_branch_name(" Downtown ").unwrap(), "Downtown");
        assert!(validate_product_name("").is_err());
        assert!(validate_product_name(&"A".repeat(300)).is_err());
        assert!(validate_client_name("Ana Perez").is_ok());
    }

    #[test]
    fn test_validate_note() {
        assert_eq!(validate_note(None).unwrap(), None);
        assert_eq!(validate_note(Some("   ")).unwrap(), None);
        assert_eq!(
            validate_note(Some(" recount ")).unwrap(),
            Some("recount".to_string())
        );
        assert!(validate_note(Some(&"x".repeat(256))).is_err());
    }

    #[test]
    fn test_validate_positive_qty() {
        assert!(validate_positive_qty(Quantity::from_milli(1)).is_ok());
        assert!(validate_positive_qty(Quantity::ZERO).is_err());
        assert!(validate_positive_qty(Quantity::from_milli(-5)).is_err());
    }
}
