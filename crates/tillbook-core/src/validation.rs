//! # Validation Module
//!
//! Input validation utilities for Tillbook.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Command interpreter                                           │
//! │  ├── Token shape (numbers where numbers belong)                         │
//! │  └── Catalog lookups                                                    │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Ledger services                                               │
//! │  └── THIS MODULE: Business rule validation                              │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                             │
//! │  ├── CHECK constraints (stock >= 0, amount > 0)                         │
//! │  ├── UNIQUE constraints (product name, phone, credit seq)               │
//! │  └── Foreign key constraints                                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use tillbook_core::validation::{validate_product_name, validate_quantity};
//!
//! validate_product_name("white bread").unwrap();
//! validate_quantity(5).unwrap();
//! ```

use crate::error::ValidationError;
use crate::money::Money;
use crate::types::LineRequest;
use crate::{MAX_AMOUNT_CENTS, MAX_ITEM_QUANTITY, MAX_LINE_ITEMS};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

const MAX_NAME_LEN: usize = 100;
const MAX_DESCRIPTION_LEN: usize = 500;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a product name.
///
/// ## Rules
/// - Must not be empty
/// - At most 100 characters
/// - Must contain a non-numeric word, since the command grammar reads
///   numeric tokens as quantities and prices
///
/// ## Example
/// ```rust
/// use tillbook_core::validation::validate_product_name;
///
/// assert!(validate_product_name("bread").is_ok());
/// assert!(validate_product_name("7up").is_ok());
/// assert!(validate_product_name("500").is_err());
/// assert!(validate_product_name("").is_err());
/// ```
pub fn validate_product_name(name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required {
            field: "name".to_string(),
        });
    }

    if name.chars().count() > MAX_NAME_LEN {
        return Err(ValidationError::TooLong {
            field: "name".to_string(),
            max: MAX_NAME_LEN,
        });
    }

    if name.split_whitespace().all(|word| Money::parse(word).is_some()) {
        return Err(ValidationError::InvalidFormat {
            field: "name".to_string(),
            reason: "must contain at least one word that is not a number".to_string(),
        });
    }

    Ok(())
}

/// Collapses runs of whitespace so `"white   bread "` and `"white bread"`
/// name the same product.
pub fn normalize_name(name: &str) -> String {
    name.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Validates a customer name.
pub fn validate_customer_name(name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required {
            field: "customer name".to_string(),
        });
    }

    if name.chars().count() > MAX_NAME_LEN {
        return Err(ValidationError::TooLong {
            field: "customer name".to_string(),
            max: MAX_NAME_LEN,
        });
    }

    Ok(())
}

/// Validates a phone number.
///
/// ## Rules
/// - Optional leading `+`
/// - 7 to 15 digits
///
/// ## Example
/// ```rust
/// use tillbook_core::validation::validate_phone;
///
/// assert!(validate_phone("+263771234567").is_ok());
/// assert!(validate_phone("0771234567").is_ok());
/// assert!(validate_phone("12ab").is_err());
/// ```
pub fn validate_phone(phone: &str) -> ValidationResult<()> {
    let phone = phone.trim();

    if phone.is_empty() {
        return Err(ValidationError::Required {
            field: "phone".to_string(),
        });
    }

    let digits = phone.strip_prefix('+').unwrap_or(phone);
    if !digits.chars().all(|c| c.is_ascii_digit()) || !(7..=15).contains(&digits.len()) {
        return Err(ValidationError::InvalidFormat {
            field: "phone".to_string(),
            reason: "must be 7 to 15 digits, optionally starting with +".to_string(),
        });
    }

    Ok(())
}

/// Validates a free-text description (expenses, credit entries).
pub fn validate_description(description: &str) -> ValidationResult<()> {
    let description = description.trim();

    if description.is_empty() {
        return Err(ValidationError::Required {
            field: "description".to_string(),
        });
    }

    if description.chars().count() > MAX_DESCRIPTION_LEN {
        return Err(ValidationError::TooLong {
            field: "description".to_string(),
            max: MAX_DESCRIPTION_LEN,
        });
    }

    Ok(())
}

/// Validates a shop identifier handed in by the identity gateway.
pub fn validate_shop_id(shop_id: &str) -> ValidationResult<()> {
    if shop_id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "shop".to_string(),
        });
    }
    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a line quantity.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed MAX_ITEM_QUANTITY
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_ITEM_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_ITEM_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a catalog price. Products cannot be free.
pub fn validate_price(price: Money) -> ValidationResult<()> {
    if !price.is_positive() {
        return Err(ValidationError::MustBePositive {
            field: "price".to_string(),
        });
    }
    validate_ceiling("price", price)
}

/// Validates a per-line price override. Zero is allowed (giveaways).
pub fn validate_line_price(price: Money) -> ValidationResult<()> {
    if price.is_negative() {
        return Err(ValidationError::Negative {
            field: "price".to_string(),
        });
    }
    validate_ceiling("price", price)
}

/// Validates a money amount that must be strictly positive
/// (credit, payment, installment, expense).
pub fn validate_amount(field: &str, amount: Money) -> ValidationResult<()> {
    if !amount.is_positive() {
        return Err(ValidationError::MustBePositive {
            field: field.to_string(),
        });
    }
    validate_ceiling(field, amount)
}

/// Validates a recorded unit cost. Zero is allowed.
pub fn validate_cost(cost: Money) -> ValidationResult<()> {
    if cost.is_negative() {
        return Err(ValidationError::Negative {
            field: "cost".to_string(),
        });
    }
    validate_ceiling("cost", cost)
}

/// Rejects amounts above [`MAX_AMOUNT_CENTS`].
pub fn validate_ceiling(field: &str, amount: Money) -> ValidationResult<()> {
    if amount.cents() > MAX_AMOUNT_CENTS {
        return Err(ValidationError::TooLarge {
            field: field.to_string(),
            max: Money::from_cents(MAX_AMOUNT_CENTS),
        });
    }
    Ok(())
}

/// Adds up `quantity × price` over the lines with checked arithmetic.
///
/// Fails when a line price, a line total or the grand total goes above
/// [`MAX_AMOUNT_CENTS`].
pub fn validate_lines_total(lines: &[LineRequest]) -> ValidationResult<Money> {
    let too_large = || ValidationError::TooLarge {
        field: "total".to_string(),
        max: Money::from_cents(MAX_AMOUNT_CENTS),
    };

    let mut total = Money::zero();
    for line in lines {
        validate_line_price(Money::from_cents(line.price_cents))?;
        if let Some(cost) = line.cost_cents {
            validate_cost(Money::from_cents(cost))?;
        }
        let line_total = line.checked_total().ok_or_else(too_large)?;
        total = total.checked_add(line_total).ok_or_else(too_large)?;
    }
    validate_ceiling("total", total)?;
    Ok(total)
}

/// Validates a stock level or threshold.
pub fn validate_non_negative(field: &str, value: i64) -> ValidationResult<()> {
    if value < 0 {
        return Err(ValidationError::Negative {
            field: field.to_string(),
        });
    }
    Ok(())
}

// =============================================================================
// Collection Validators
// =============================================================================

/// Validates the number of lines in a sale, order or lay-bye.
pub fn validate_line_count(lines: usize) -> ValidationResult<()> {
    if lines == 0 {
        return Err(ValidationError::Required {
            field: "items".to_string(),
        });
    }

    if lines > MAX_LINE_ITEMS {
        return Err(ValidationError::OutOfRange {
            field: "items".to_string(),
            min: 1,
            max: MAX_LINE_ITEMS as i64,
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
    fn test_validate_product_name() {
        assert!(validate_product_name("bread").is_ok());
        assert!(validate_product_name("coke 500ml").is_ok());
        assert!(validate_product_name("2 litre coke").is_ok());

        assert!(validate_product_name("").is_err());
        assert!(validate_product_name("   ").is_err());
        assert!(validate_product_name("12").is_err());
        assert!(validate_product_name("2.50 3").is_err());
        assert!(validate_product_name(&"a".repeat(101)).is_err());
    }

    #[test]
    fn test_normalize_name() {
        assert_eq!(normalize_name("  white   bread "), "white bread");
        assert_eq!(normalize_name("bread"), "bread");
    }

    #[test]
    fn test_validate_phone() {
        assert!(validate_phone("0771234567").is_ok());
        assert!(validate_phone("+263771234567").is_ok());
        assert!(validate_phone("123").is_err());
        assert!(validate_phone("077-123-4567").is_err());
        assert!(validate_phone("").is_err());
    }

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(MAX_ITEM_QUANTITY).is_ok());

        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(-1).is_err());
        assert!(validate_quantity(MAX_ITEM_QUANTITY + 1).is_err());
    }

    #[test]
    fn test_validate_prices_and_amounts() {
        assert!(validate_price(Money::from_cents(250)).is_ok());
        assert!(validate_price(Money::zero()).is_err());
        assert!(validate_line_price(Money::zero()).is_ok());
        assert!(validate_line_price(Money::from_cents(-1)).is_err());
        assert!(validate_amount("payment", Money::from_cents(1)).is_ok());
        assert!(validate_amount("payment", Money::zero()).is_err());
    }

    #[test]
    fn test_amounts_above_ceiling_rejected() {
        let ceiling = Money::from_cents(MAX_AMOUNT_CENTS);
        let over = Money::from_cents(MAX_AMOUNT_CENTS + 1);
        assert!(validate_price(ceiling).is_ok());
        assert!(matches!(validate_price(over), Err(ValidationError::TooLarge { .. })));
        assert!(validate_line_price(over).is_err());
        assert!(validate_amount("payment", over).is_err());
        assert!(validate_cost(over).is_err());
        assert!(validate_cost(Money::zero()).is_ok());
    }

    #[test]
    fn test_lines_total_is_checked() {
        let line = |quantity, price_cents| LineRequest {
            product_id: "p".to_string(),
            product_name: "bread".to_string(),
            quantity,
            price_cents,
            cost_cents: None,
        };

        let total = validate_lines_total(&[line(3, 250), line(1, 100)]).unwrap();
        assert_eq!(total, Money::from_cents(850));

        // Each line is fine on its own, their product is not
        let err = validate_lines_total(&[line(MAX_ITEM_QUANTITY, MAX_AMOUNT_CENTS)]).unwrap_err();
        assert!(matches!(err, ValidationError::TooLarge { ref field, .. } if field == "total"));

        // Would overflow i64 without the price check
        let err = validate_lines_total(&[line(2, 9_000_000_000_000_000_000)]).unwrap_err();
        assert!(matches!(err, ValidationError::TooLarge { ref field, .. } if field == "price"));
    }

    #[test]
    fn test_validate_line_count() {
        assert!(validate_line_count(1).is_ok());
        assert!(validate_line_count(0).is_err());
        assert!(validate_line_count(MAX_LINE_ITEMS + 1).is_err());
    }
}
