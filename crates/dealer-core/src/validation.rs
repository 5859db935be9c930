//! # Validation Module
//!
//! Input validation for quotation payloads and stock-item creation payloads.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: HTTP boundary (external)                                     │
//! │  └── Deserialization into QuotationRequest / NewStockItem              │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                  │
//! │  ├── Shapes: quantities, prices, currency codes, VIN formats           │
//! │  └── Cross-field: VIN count == quantity, no VIN listed twice           │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Domain guards + SQLite constraints                           │
//! │  ├── Customer must exist and be a customer                             │
//! │  ├── Units must be in the expected state (ledger CAS)                  │
//! │  └── UNIQUE(quotation_number), UNIQUE(chassis_number)                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::HashSet;

use crate::error::ValidationError;
use crate::types::{Discount, LineItemRequest, NewStockItem, QuotationRequest};
use crate::{BPS_SCALE, MAX_LINE_ITEMS, MAX_LINE_QUANTITY, MAX_PRICE_CENTS};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

/// Validates an ISO-4217 style currency code (three uppercase letters).
///
/// ```rust
/// use dealer_core::validation::validate_currency;
///
/// assert!(validate_currency("AED").is_ok());
/// assert!(validate_currency("aed").is_err());
/// assert!(validate_currency("DIRHAM").is_err());
/// ```
pub fn validate_currency(code: &str) -> ValidationResult<()> {
    if code.is_empty() {
        return Err(ValidationError::Required {
            field: "currency".to_string(),
        });
    }

    if code.len() != 3 || !code.chars().all(|c| c.is_ascii_uppercase()) {
        return Err(ValidationError::InvalidFormat {
            field: "currency".to_string(),
            reason: "must be a three-letter uppercase code".to_string(),
        });
    }

    Ok(())
}

/// Validates a chassis (VIN) number.
///
/// ## Rules
/// - Must not be empty
/// - At most 30 characters (older chassis numbers are not 17-char VINs)
/// - Letters, digits and hyphens only
pub fn validate_chassis_number(chassis: &str) -> ValidationResult<()> {
    let chassis = chassis.trim();

    if chassis.is_empty() {
        return Err(ValidationError::Required {
            field: "chassis_number".to_string(),
        });
    }

    if chassis.len() > 30 {
        return Err(ValidationError::TooLong {
            field: "chassis_number".to_string(),
            max: 30,
        });
    }

    if !chassis.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
        return Err(ValidationError::InvalidFormat {
            field: "chassis_number".to_string(),
            reason: "must contain only letters, digits and hyphens".to_string(),
        });
    }

    Ok(())
}

/// Validates a required, bounded text field.
pub fn validate_name(field: &str, value: &str, max: usize) -> ValidationResult<()> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if value.len() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }

    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a line quantity (1..=999).
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_LINE_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_LINE_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a price in cents (0..=`MAX_PRICE_CENTS`). Zero is allowed.
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

/// Validates a payment amount in cents (must be > 0).
pub fn validate_payment_amount(cents: i64) -> ValidationResult<()> {
    if cents <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "payment amount".to_string(),
        });
    }

    Ok(())
}

/// Validates a basis-point rate (0%..=100%).
pub fn validate_rate_bps(field: &str, bps: u32) -> ValidationResult<()> {
    if bps as i64 > BPS_SCALE {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: BPS_SCALE,
        });
    }

    Ok(())
}

/// Validates a discount's own shape (not yet against the subtotal).
pub fn validate_discount(discount: &Discount) -> ValidationResult<()> {
    match *discount {
        Discount::None => Ok(()),
        Discount::Percentage { rate_bps } => validate_rate_bps("discount", rate_bps),
        Discount::Fixed { amount_cents } => validate_price_cents("discount", amount_cents),
    }
}

// =============================================================================
// Payload Validators
// =============================================================================

/// Validates requested lines.
///
/// ## Rules
/// - 1..=100 lines
/// - Each quantity 1..=999, each price override within `0..=MAX_PRICE_CENTS`
/// - When VINs are listed on a line, their count must equal its quantity
/// - A VIN may appear only once across the whole request
pub fn validate_line_items(lines: &[LineItemRequest]) -> ValidationResult<()> {
    if lines.is_empty() {
        return Err(ValidationError::Required {
            field: "items".to_string(),
        });
    }

    if lines.len() > MAX_LINE_ITEMS {
        return Err(ValidationError::OutOfRange {
            field: "items".to_string(),
            min: 1,
            max: MAX_LINE_ITEMS as i64,
        });
    }

    let mut seen = HashSet::new();
    for line in lines {
        if line.stock_item_id.trim().is_empty() {
            return Err(ValidationError::Required {
                field: "items.stock_item_id".to_string(),
            });
        }

        validate_quantity(line.quantity)?;

        if let Some(price) = line.unit_price_cents {
            validate_price_cents("items.unit_price", price)?;
        }

        if !line.chassis_numbers.is_empty()
            && line.chassis_numbers.len() as i64 != line.quantity
        {
            return Err(ValidationError::Inconsistent {
                field: format!("items[{}].chassis_numbers", line.stock_item_id),
                reason: format!(
                    "{} chassis numbers listed for quantity {}",
                    line.chassis_numbers.len(),
                    line.quantity
                ),
            });
        }

        for chassis in &line.chassis_numbers {
            validate_chassis_number(chassis)?;
            if !seen.insert(chassis.as_str()) {
                return Err(ValidationError::Duplicate {
                    field: "chassis_number".to_string(),
                    value: chassis.clone(),
                });
            }
        }
    }

    Ok(())
}

/// Validates a quotation payload before any lookups run.
pub fn validate_quotation_request(request: &QuotationRequest) -> ValidationResult<()> {
    if request.customer_id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "customer_id".to_string(),
        });
    }

    if let Some(ref currency) = request.currency {
        validate_currency(currency)?;
    }

    validate_line_items(&request.items)?;
    validate_discount(&request.discount)?;

    if let Some(ref notes) = request.notes {
        if notes.len() > 2000 {
            return Err(ValidationError::TooLong {
                field: "notes".to_string(),
                max: 2000,
            });
        }
    }

    Ok(())
}

/// Validates a stock-item creation payload from the bulk import.
pub fn validate_new_stock_item(item: &NewStockItem) -> ValidationResult<()> {
    validate_name("name", &item.name, 200)?;
    validate_currency(&item.currency)?;
    validate_price_cents("cost_price", item.cost_price_cents)?;
    validate_price_cents("selling_price", item.selling_price_cents)?;

    if item.units.is_empty() && item.quantity < 0 {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 0,
            max: i64::MAX,
        });
    }

    let mut seen = HashSet::new();
    for unit in &item.units {
        validate_chassis_number(&unit.chassis_number)?;
        if !seen.insert(unit.chassis_number.as_str()) {
            return Err(ValidationError::Duplicate {
                field: "chassis_number".to_string(),
                value: unit.chassis_number.clone(),
            });
        }
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expense::RawExpenses;
    use crate::types::NewUnit;

    fn line(qty: i64, vins: &[&str]) -> LineItemRequest {
        LineItemRequest {
            stock_item_id: "stk-1".to_string(),
            quantity: qty,
            unit_price_cents: None,
            chassis_numbers: vins.iter().map(|v| v.to_string()).collect(),
        }
    }

    #[test]
    fn test_validate_chassis_number() {
        assert!(validate_chassis_number("JTMHV05J604123456").is_ok());
        assert!(validate_chassis_number("KDH201-0012345").is_ok());
        assert!(validate_chassis_number("").is_err());
        assert!(validate_chassis_number("has space").is_err());
        assert!(validate_chassis_number(&"A".repeat(31)).is_err());
    }

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(999).is_ok());
        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(1000).is_err());
    }

    #[test]
    fn test_validate_price_cents_bounds() {
        assert!(validate_price_cents("price", 0).is_ok());
        assert!(validate_price_cents("price", MAX_PRICE_CENTS).is_ok());
        assert!(validate_price_cents("price", -1).is_err());
        assert!(validate_price_cents("price", MAX_PRICE_CENTS + 1).is_err());
        assert!(validate_discount(&Discount::Fixed {
            amount_cents: i64::MAX
        })
        .is_err());
    }

    #[test]
    fn test_oversized_unit_price_rejected() {
        let mut huge = line(3, &[]);
        huge.unit_price_cents = Some(i64::MAX / 2);
        assert!(matches!(
            validate_line_items(&[huge]),
            Err(ValidationError::OutOfRange { .. })
        ));
    }

    #[test]
    fn test_validate_rate_bps() {
        assert!(validate_rate_bps("vat", 500).is_ok());
        assert!(validate_rate_bps("vat", 10_000).is_ok());
        assert!(validate_rate_bps("vat", 10_001).is_err());
    }

    #[test]
    fn test_chassis_count_must_match_quantity() {
        assert!(validate_line_items(&[line(2, &["VIN-A", "VIN-B"])]).is_ok());
        assert!(validate_line_items(&[line(3, &[])]).is_ok());
        assert!(matches!(
            validate_line_items(&[line(3, &["VIN-A", "VIN-B"])]),
            Err(ValidationError::Inconsistent { .. })
        ));
    }

    #[test]
    fn test_duplicate_chassis_across_lines() {
        let lines = [line(1, &["VIN-A"]), line(1, &["VIN-A"])];
        assert!(matches!(
            validate_line_items(&lines),
            Err(ValidationError::Duplicate { .. })
        ));
    }

    #[test]
    fn test_validate_quotation_request() {
        let mut request = QuotationRequest {
            customer_id: "c-1".to_string(),
            currency: Some("AED".to_string()),
            items: vec![line(1, &["VIN-A"])],
            discount: Discount::Percentage { rate_bps: 1000 },
            additional_expenses: RawExpenses::None,
            valid_till: None,
            notes: None,
        };
        assert!(validate_quotation_request(&request).is_ok());

        request.discount = Discount::Percentage { rate_bps: 20_000 };
        assert!(validate_quotation_request(&request).is_err());

        request.discount = Discount::None;
        request.items.clear();
        assert!(validate_quotation_request(&request).is_err());
    }

    #[test]
    fn test_validate_new_stock_item() {
        let mut item = NewStockItem {
            name: "Land Cruiser GXR".to_string(),
            make: Some("Toyota".to_string()),
            model: Some("Land Cruiser".to_string()),
            year: Some(2024),
            color: None,
            cost_price_cents: 20_000_000,
            selling_price_cents: 24_000_000,
            currency: "AED".to_string(),
            quantity: 0,
            units: vec![NewUnit {
                chassis_number: "VIN-A".to_string(),
                engine_number: None,
                color: None,
            }],
        };
        assert!(validate_new_stock_item(&item).is_ok());

        item.units.push(item.units[0].clone());
        assert!(validate_new_stock_item(&item).is_err());
    }
}
