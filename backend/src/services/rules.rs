//! `validator` adapters over the shared validation rules

use std::borrow::Cow;

use rust_decimal::Decimal;
use validator::ValidationError;

fn reject(code: &'static str, message: &'static str) -> ValidationError {
    let mut err = ValidationError::new(code);
    err.message = Some(Cow::Borrowed(message));
    err
}

pub fn name(value: &str) -> Result<(), ValidationError> {
    shared::validate_name(value).map_err(|m| reject("name", m))
}

pub fn code(value: &str) -> Result<(), ValidationError> {
    shared::validate_code(value).map_err(|m| reject("code", m))
}

/// Blank codes are accepted and replaced by generated ones
pub fn optional_code(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Ok(());
    }
    code(value)
}

pub fn price(value: &Decimal) -> Result<(), ValidationError> {
    shared::validate_price(*value).map_err(|m| reject("range", m))
}

pub fn initial_quantity(value: i32) -> Result<(), ValidationError> {
    shared::validate_initial_quantity(value).map_err(|m| reject("range", m))
}

pub fn vat_rate(value: &Decimal) -> Result<(), ValidationError> {
    shared::validate_vat_rate(*value).map_err(|m| reject("range", m))
}
