//! # Validation Module
//!
//! Input validation for Bodega.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: CLI / UI                                                     │
//! │  └── Parsing (clap value parsers, enum FromStr)                        │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                  │
//! │  └── Shape checks that need no storage (quantities, lengths)           │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Sale manager / ledger (bodega-db)                            │
//! │  └── Existence and stock checks against current data                   │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 4: SQLite                                                       │
//! │  └── CHECK (stock_quantity >= 0), UNIQUE, FOREIGN KEY                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::error::ValidationError;
use crate::types::{NewCustomer, NewExpense, NewMovement, NewProduct, ProductDetails, SaleDraft};
use crate::{
    MAX_ITEM_QUANTITY, MAX_NOTES_LEN, MAX_PRICE_CENTS, MAX_SALE_LINES, MAX_STOCK_QUANTITY,
};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a SKU.
///
/// ## Rules
/// - Must not be empty
/// - At most 50 characters
/// - Only alphanumeric characters, hyphens, underscores
///
/// ## Example
/// ```rust
/// use bodega_core::validation::validate_sku;
///
/// assert!(validate_sku("RICE-1KG").is_ok());
/// assert!(validate_sku("").is_err());
/// assert!(validate_sku("rice 1kg").is_err());
/// ```
pub fn validate_sku(sku: &str) -> ValidationResult<()> {
    let sku = sku.trim();

    if sku.is_empty() {
        return Err(ValidationError::Required {
            field: "sku".to_string(),
        });
    }

    if sku.len() > 50 {
        return Err(ValidationError::TooLong {
            field: "sku".to_string(),
            max: 50,
        });
    }

    if !sku
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ValidationError::InvalidFormat {
            field: "sku".to_string(),
            reason: "must contain only letters, numbers, hyphens, and underscores".to_string(),
        });
    }

    Ok(())
}

/// Validates a required display name (products, customers, expenses).
pub fn validate_name(field: &str, name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if name.len() > 200 {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: 200,
        });
    }

    Ok(())
}

/// Validates optional free text (notes, cancel reasons).
pub fn validate_notes(field: &str, notes: Option<&str>) -> ValidationResult<()> {
    match notes {
        Some(text) if text.len() > MAX_NOTES_LEN => Err(ValidationError::TooLong {
            field: field.to_string(),
            max: MAX_NOTES_LEN,
        }),
        _ => Ok(()),
    }
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a line or movement quantity.
///
/// ## Rules
/// - Must be positive
/// - Must not exceed `MAX_ITEM_QUANTITY`
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

/// Validates a non-negative amount in cents. Zero is allowed (free items).
pub fn validate_price_cents(field: &str, cents: i64) -> ValidationResult<()> {
    if !(0..=MAX_PRICE_CENTS).contains(&cents) {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: MAX_PRICE_CENTS,
        });
    }

    Ok(())
}

fn validate_non_negative_stock(field: &str, value: i64) -> ValidationResult<()> {
    if !(0..=MAX_STOCK_QUANTITY).contains(&value) {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: MAX_STOCK_QUANTITY,
        });
    }
    Ok(())
}

// =============================================================================
// Record Validators
// =============================================================================

/// Validates a sale draft before any storage work.
///
/// ## Rules
/// - At least one line, at most `MAX_SALE_LINES`
/// - Every quantity positive and bounded
/// - Every explicit unit price non-negative
///
/// ## Example
/// ```rust
/// use bodega_core::validation::validate_sale_draft;
/// use bodega_core::{SaleDraft, SaleLine};
///
/// assert!(validate_sale_draft(&SaleDraft::new(vec![SaleLine::new("p1", 2)])).is_ok());
/// assert!(validate_sale_draft(&SaleDraft::new(vec![])).is_err());
/// ```
pub fn validate_sale_draft(draft: &SaleDraft) -> ValidationResult<()> {
    if draft.items.is_empty() {
        return Err(ValidationError::Required {
            field: "items".to_string(),
        });
    }

    if draft.items.len() > MAX_SALE_LINES {
        return Err(ValidationError::OutOfRange {
            field: "items".to_string(),
            min: 1,
            max: MAX_SALE_LINES as i64,
        });
    }

    for line in &draft.items {
        if line.product_id.trim().is_empty() {
            return Err(ValidationError::Required {
                field: "productId".to_string(),
            });
        }
        validate_quantity(line.quantity)?;
        if let Some(price) = line.unit_price_cents {
            validate_price_cents("unitPrice", price)?;
        }
    }

    validate_notes("notes", draft.notes.as_deref())
}

pub fn validate_new_movement(movement: &NewMovement) -> ValidationResult<()> {
    if movement.product_id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "productId".to_string(),
        });
    }
    validate_quantity(movement.quantity)?;
    if let Some(cost) = movement.unit_cost_cents {
        validate_price_cents("unitCost", cost)?;
    }
    validate_notes("notes", movement.notes.as_deref())
}

pub fn validate_new_product(product: &NewProduct) -> ValidationResult<()> {
    validate_name("name", &product.name)?;
    if let Some(sku) = &product.sku {
        validate_sku(sku)?;
    }
    validate_price_cents("price", product.price_cents)?;
    if let Some(cost) = product.cost_cents {
        validate_price_cents("cost", cost)?;
    }
    validate_non_negative_stock("minimumStock", product.minimum_stock)?;
    validate_non_negative_stock("initialStock", product.initial_stock)
}

pub fn validate_product_details(details: &ProductDetails) -> ValidationResult<()> {
    validate_name("name", &details.name)?;
    if let Some(sku) = &details.sku {
        validate_sku(sku)?;
    }
    validate_price_cents("price", details.price_cents)?;
    if let Some(cost) = details.cost_cents {
        validate_price_cents("cost", cost)?;
    }
    validate_non_negative_stock("minimumStock", details.minimum_stock)
}

pub fn validate_new_customer(customer: &NewCustomer) -> ValidationResult<()> {
    validate_name("name", &customer.name)?;
    if let Some(email) = &customer.email {
        if !email.contains('@') {
            return Err(ValidationError::InvalidFormat {
                field: "email".to_string(),
                reason: "must contain '@'".to_string(),
            });
        }
    }
    Ok(())
}

pub fn validate_new_expense(expense: &NewExpense) -> ValidationResult<()> {
    validate_name("description", &expense.description)?;
    if expense.amount_cents <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "amount".to_string(),
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
    use crate::types::{MovementReason, SaleLine};

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(MAX_ITEM_QUANTITY).is_ok());
        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(-3).is_err());
        assert!(validate_quantity(MAX_ITEM_QUANTITY + 1).is_err());
    }

    #[test]
    fn test_validate_sale_draft() {
        let ok = SaleDraft::new(vec![SaleLine::new("p1", 1).at_price(0)]);
        assert!(validate_sale_draft(&ok).is_ok());

        let negative_price = SaleDraft::new(vec![SaleLine::new("p1", 1).at_price(-1)]);
        assert!(validate_sale_draft(&negative_price).is_err());

        let zero_qty = SaleDraft::new(vec![SaleLine::new("p1", 0)]);
        assert!(matches!(
            validate_sale_draft(&zero_qty),
            Err(ValidationError::MustBePositive { .. })
        ));

        let blank_product = SaleDraft::new(vec![SaleLine::new(" ", 1)]);
        assert!(validate_sale_draft(&blank_product).is_err());
    }

    #[test]
    fn test_validate_sale_draft_bounds_price() {
        let at_max = SaleDraft::new(vec![
            SaleLine::new("p1", MAX_ITEM_QUANTITY).at_price(MAX_PRICE_CENTS)
        ]);
        assert!(validate_sale_draft(&at_max).is_ok());

        let huge = SaleDraft::new(vec![SaleLine::new("p1", 3).at_price(i64::MAX / 2)]);
        assert!(matches!(
            validate_sale_draft(&huge),
            Err(ValidationError::OutOfRange { max: MAX_PRICE_CENTS, .. })
        ));
    }

    #[test]
    fn test_validate_new_product() {
        let mut product = NewProduct {
            name: "Rice 1kg".to_string(),
            sku: Some("RICE-1KG".to_string()),
            price_cents: 250,
            cost_cents: Some(180),
            minimum_stock: 2,
            initial_stock: 10,
        };
        assert!(validate_new_product(&product).is_ok());

        product.initial_stock = -1;
        assert!(validate_new_product(&product).is_err());

        product.initial_stock = MAX_STOCK_QUANTITY + 1;
        assert!(validate_new_product(&product).is_err());

        product.initial_stock = 10;
        product.price_cents = MAX_PRICE_CENTS + 1;
        assert!(validate_new_product(&product).is_err());
    }

    #[test]
    fn test_validate_new_movement() {
        let movement = NewMovement::new("p1", MovementReason::Purchase, 12);
        assert!(validate_new_movement(&movement).is_ok());

        let movement = NewMovement::new("p1", MovementReason::Purchase, 0);
        assert!(validate_new_movement(&movement).is_err());

        let movement = NewMovement::new("p1", MovementReason::Damaged, 1)
            .with_notes(Some("x".repeat(MAX_NOTES_LEN + 1)));
        assert!(matches!(
            validate_new_movement(&movement),
            Err(ValidationError::TooLong { .. })
        ));
    }

    #[test]
    fn test_validate_new_expense() {
        let expense = NewExpense {
            description: "Electricity".to_string(),
            category: Some("utilities".to_string()),
            amount_cents: 4_500,
            date: None,
        };
        assert!(validate_new_expense(&expense).is_ok());

        let free = NewExpense {
            amount_cents: 0,
            ..expense
        };
        assert!(validate_new_expense(&free).is_err());
    }

    #[test]
    fn test_validate_customer_email() {
        let customer = NewCustomer {
            name: "Ana".to_string(),
            phone: None,
            email: Some("ana.example.com".to_string()),
        };
        assert!(validate_new_customer(&customer).is_err());
    }
}
