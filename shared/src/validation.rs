//! Validation utilities for stock and category attributes
//!
//! Shared by the backend request types and the browser bindings so both
//! reject the same input.

use rust_decimal::Decimal;

use crate::types::Quantity;

/// Longest accepted SKU or barcode
pub const MAX_CODE_LENGTH: usize = 64;

/// Longest accepted item or category name
pub const MAX_NAME_LENGTH: usize = 255;

/// Exclusive upper bound of a unit price, the range of a `NUMERIC(18,4)` column
pub const PRICE_LIMIT: i64 = 100_000_000_000_000;

// ============================================================================
// Stock Item Validations
// ============================================================================

/// Validate an item or category name
pub fn validate_name(name: &str) -> Result<(), &'static str> {
    if name.trim().is_empty() {
        return Err("Name is required");
    }
    if name.chars().count() > MAX_NAME_LENGTH {
        return Err("Name must be at most 255 characters");
    }
    Ok(())
}

/// Validate a SKU or barcode as typed or scanned
pub fn validate_code(code: &str) -> Result<(), &'static str> {
    if code.is_empty() {
        return Err("Code cannot be empty");
    }
    if code.len() > MAX_CODE_LENGTH {
        return Err("Code must be at most 64 characters");
    }
    if code.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err("Code cannot contain whitespace");
    }
    Ok(())
}

/// Validate a unit price
pub fn validate_price(price: Decimal) -> Result<(), &'static str> {
    if price < Decimal::ZERO {
        return Err("Price cannot be negative");
    }
    if price >= Decimal::from(PRICE_LIMIT) {
        return Err("Price must be less than 100000000000000");
    }
    Ok(())
}

/// Validate a VAT rate expressed in percent
pub fn validate_vat_rate(rate: Decimal) -> Result<(), &'static str> {
    if rate < Decimal::ZERO || rate > Decimal::from(100) {
        return Err("VAT rate must be between 0 and 100");
    }
    Ok(())
}

/// Validate optional minimum and maximum stock levels
pub fn validate_stock_levels(
    min: Option<Quantity>,
    max: Option<Quantity>,
) -> Result<(), &'static str> {
    if min.is_some_and(|m| m < 0) || max.is_some_and(|m| m < 0) {
        return Err("Stock levels cannot be negative");
    }
    if let (Some(min), Some(max)) = (min, max) {
        if min > max {
            return Err("Minimum stock level cannot exceed maximum");
        }
    }
    Ok(())
}

/// Validate the quantity an item is created with
pub fn validate_initial_quantity(quantity: Quantity) -> Result<(), &'static str> {
    if quantity < 0 {
        return Err("Initial quantity cannot be negative");
    }
    Ok(())
}

// ============================================================================
// Search
// ============================================================================

/// Normalize a search term, `None` when it matches everything
pub fn normalize_search(term: Option<&str>) -> Option<String> {
    term.map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_validate_name() {
        assert!(validate_name("Oat milk").is_ok());
        assert!(validate_name("   ").is_err());
        assert!(validate_name(&"x".repeat(256)).is_err());
    }

    #[test]
    fn test_validate_code() {
        assert!(validate_code("SKU-1A2B3C4D").is_ok());
        assert!(validate_code("4006381333931").is_ok());
        assert!(validate_code("").is_err());
        assert!(validate_code("SKU 1").is_err());
        assert!(validate_code(&"9".repeat(65)).is_err());
    }

    #[test]
    fn test_validate_price() {
        assert!(validate_price(Decimal::ZERO).is_ok());
        assert!(validate_price(Decimal::from_str("12.50").unwrap()).is_ok());
        assert!(validate_price(Decimal::from_str("-0.01").unwrap()).is_err());
        assert!(validate_price(Decimal::from_str("99999999999999.9999").unwrap()).is_ok());
        assert!(validate_price(Decimal::from(PRICE_LIMIT)).is_err());
        assert!(validate_price(Decimal::MAX).is_err());
    }

    #[test]
    fn test_validate_vat_rate() {
        assert!(validate_vat_rate(Decimal::from(7)).is_ok());
        assert!(validate_vat_rate(Decimal::from(100)).is_ok());
        assert!(validate_vat_rate(Decimal::from(101)).is_err());
        assert!(validate_vat_rate(Decimal::from(-1)).is_err());
    }

    #[test]
    fn test_validate_stock_levels() {
        assert!(validate_stock_levels(None, None).is_ok());
        assert!(validate_stock_levels(Some(5), None).is_ok());
        assert!(validate_stock_levels(Some(5), Some(5)).is_ok());
        assert!(validate_stock_levels(Some(6), Some(5)).is_err());
        assert!(validate_stock_levels(Some(-1), None).is_err());
    }

    #[test]
    fn test_validate_initial_quantity() {
        assert!(validate_initial_quantity(0).is_ok());
        assert!(validate_initial_quantity(-3).is_err());
    }

    #[test]
    fn test_normalize_search() {
        assert_eq!(normalize_search(Some("  cup ")), Some("cup".to_string()));
        assert_eq!(normalize_search(Some("   ")), None);
        assert_eq!(normalize_search(None), None);
    }
}
