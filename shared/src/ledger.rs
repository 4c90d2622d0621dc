//! Movement ledger arithmetic
//!
//! Pure computation of what a movement does to an item: validation of the
//! request, the out-of-stock rule, the weighted-average cost update and the
//! signed log record. Persistence and locking live in the backend; this
//! module only decides.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::models::{MovementType, NewMovement, StockItem};
use crate::types::{Quantity, COST_SCALE};
use crate::validation::validate_price;

/// Business-rule violations raised by the ledger
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("{field}: {message}")]
    InvalidInput { field: &'static str, message: String },

    #[error("Insufficient stock. Available quantity: {available}")]
    InsufficientStock { available: Quantity, requested: Quantity },
}

impl LedgerError {
    fn invalid(field: &'static str, message: impl Into<String>) -> Self {
        LedgerError::InvalidInput {
            field,
            message: message.into(),
        }
    }

    fn too_large() -> Self {
        LedgerError::invalid("costPrice", "Stock value is too large")
    }
}

/// When an OUT movement without a selling price records the item's current
/// selling price instead of leaving it empty
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SellingPriceFallback {
    Never,
    /// Only for movements resolved from a scanned code
    #[default]
    ScanOnly,
    Always,
}

impl SellingPriceFallback {
    pub fn applies(&self, via_scan: bool) -> bool {
        match self {
            SellingPriceFallback::Never => false,
            SellingPriceFallback::ScanOnly => via_scan,
            SellingPriceFallback::Always => true,
        }
    }
}

/// A requested movement, direction carried by `movement_type`
#[derive(Debug, Clone, PartialEq)]
pub struct MovementCommand {
    pub movement_type: MovementType,
    /// Always positive
    pub quantity: Quantity,
    pub cost_price: Option<Decimal>,
    pub selling_price: Option<Decimal>,
    pub notes: Option<String>,
}

impl MovementCommand {
    pub fn stock_in(quantity: Quantity, cost_price: Option<Decimal>) -> Self {
        Self {
            movement_type: MovementType::In,
            quantity,
            cost_price,
            selling_price: None,
            notes: None,
        }
    }

    pub fn stock_out(quantity: Quantity, selling_price: Option<Decimal>) -> Self {
        Self {
            movement_type: MovementType::Out,
            quantity,
            cost_price: None,
            selling_price,
            notes: None,
        }
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    /// Reject malformed requests before any state is read
    pub fn validate(&self) -> Result<(), LedgerError> {
        if self.movement_type == MovementType::Adjust {
            return Err(LedgerError::invalid("type", "Type must be IN or OUT"));
        }
        if self.quantity <= 0 {
            return Err(LedgerError::invalid(
                "quantity",
                "Quantity must be a positive number",
            ));
        }
        if let Some(price) = self.cost_price {
            validate_price(price).map_err(|m| LedgerError::invalid("costPrice", m))?;
        }
        if let Some(price) = self.selling_price {
            validate_price(price).map_err(|m| LedgerError::invalid("sellingPrice", m))?;
        }
        Ok(())
    }
}

/// Outcome of planning a movement against the current item state
#[derive(Debug, Clone, PartialEq)]
pub struct MovementPlan {
    pub new_quantity: Quantity,
    pub new_cost_price: Decimal,
    /// Quantity as stored in the log
    pub signed_quantity: Quantity,
    pub movement_cost_price: Option<Decimal>,
    pub movement_selling_price: Option<Decimal>,
}

impl MovementPlan {
    /// The log record for this plan
    pub fn record(
        &self,
        stock_item_id: Uuid,
        movement_type: MovementType,
        user_id: Uuid,
        notes: Option<String>,
    ) -> NewMovement {
        NewMovement {
            stock_item_id,
            movement_type,
            quantity: self.signed_quantity,
            cost_price: self.movement_cost_price,
            selling_price: self.movement_selling_price,
            notes,
            user_id,
        }
    }
}

/// Running weighted-average unit cost after receiving `incoming_qty` units at
/// `incoming_cost`.
pub fn weighted_average_cost(
    current_qty: Quantity,
    current_cost: Decimal,
    incoming_qty: Quantity,
    incoming_cost: Decimal,
) -> Result<Decimal, LedgerError> {
    let total_qty = Decimal::from(current_qty) + Decimal::from(incoming_qty);
    if total_qty <= Decimal::ZERO {
        return Ok(incoming_cost);
    }

    let current_value = stock_value(current_qty, current_cost)?;
    let incoming_value = stock_value(incoming_qty, incoming_cost)?;
    current_value
        .checked_add(incoming_value)
        .and_then(|total| total.checked_div(total_qty))
        .map(|average| average.round_dp(COST_SCALE))
        .ok_or_else(LedgerError::too_large)
}

/// Value of `quantity` units at `unit_cost`
pub fn stock_value(quantity: Quantity, unit_cost: Decimal) -> Result<Decimal, LedgerError> {
    unit_cost
        .checked_mul(Decimal::from(quantity))
        .ok_or_else(LedgerError::too_large)
}

/// Profit of selling `quantity` units bought at `cost_price`
pub fn unrealised_profit(
    quantity: Quantity,
    cost_price: Decimal,
    selling_price: Decimal,
) -> Result<Decimal, LedgerError> {
    selling_price
        .checked_sub(cost_price)
        .and_then(|margin| margin.checked_mul(Decimal::from(quantity)))
        .ok_or_else(LedgerError::too_large)
}

/// Fail unless the value and profit of a holding fit in a `Decimal`
pub fn check_valuation(
    quantity: Quantity,
    cost_price: Decimal,
    selling_price: Decimal,
) -> Result<(), LedgerError> {
    stock_value(quantity, cost_price)?;
    unrealised_profit(quantity, cost_price, selling_price)?;
    Ok(())
}

/// Decide the effect of `command` on `item`.
///
/// The item must be the freshly locked row. `fallback_selling_price` records
/// the item's selling price on OUT movements that omit one.
pub fn plan_movement(
    item: &StockItem,
    command: &MovementCommand,
    fallback_selling_price: bool,
) -> Result<MovementPlan, LedgerError> {
    command.validate()?;

    match command.movement_type {
        MovementType::In => {
            let new_quantity = item
                .quantity
                .checked_add(command.quantity)
                .ok_or_else(|| LedgerError::invalid("quantity", "Quantity is too large"))?;

            // Uncosted receipts are taken at the current average.
            let new_cost_price = match command.cost_price {
                Some(cost) => {
                    weighted_average_cost(item.quantity, item.cost_price, command.quantity, cost)?
                }
                None => item.cost_price,
            };
            check_valuation(new_quantity, new_cost_price, item.selling_price)?;

            Ok(MovementPlan {
                new_quantity,
                new_cost_price,
                signed_quantity: command.quantity,
                movement_cost_price: command.cost_price,
                movement_selling_price: None,
            })
        }
        MovementType::Out => {
            if command.quantity > item.quantity {
                return Err(LedgerError::InsufficientStock {
                    available: item.quantity,
                    requested: command.quantity,
                });
            }

            let selling_price = match command.selling_price {
                Some(price) => Some(price),
                None if fallback_selling_price => Some(item.selling_price),
                None => None,
            };

            Ok(MovementPlan {
                new_quantity: item.quantity - command.quantity,
                new_cost_price: item.cost_price,
                signed_quantity: -command.quantity,
                movement_cost_price: None,
                movement_selling_price: selling_price,
            })
        }
        MovementType::Adjust => Err(LedgerError::invalid("type", "Type must be IN or OUT")),
    }
}

// ============================================================================
// Generated Codes
// ============================================================================

pub const SKU_PREFIX: &str = "SKU-";

/// Digits in a generated barcode
pub const BARCODE_LENGTH: usize = 13;

/// SKU built from four random bytes, e.g. `SKU-1A2B3C4D`.
///
/// Uniqueness is not checked against existing items.
pub fn format_sku(bytes: [u8; 4]) -> String {
    let hex: String = bytes.iter().map(|b| format!("{:02X}", b)).collect();
    format!("{}{}", SKU_PREFIX, hex)
}

/// Numeric barcode built from random digit values (each taken modulo 10)
pub fn format_barcode(digits: &[u8; BARCODE_LENGTH]) -> String {
    digits
        .iter()
        .map(|d| char::from(b'0' + d % 10))
        .collect()
}
