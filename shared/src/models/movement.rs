//! Stock movement models

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::Quantity;

/// Kind of stock movement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MovementType {
    In,
    Out,
    /// Present in stored history only, no entry point records it
    Adjust,
}

impl MovementType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementType::In => "IN",
            MovementType::Out => "OUT",
            MovementType::Adjust => "ADJUST",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "IN" => Some(MovementType::In),
            "OUT" => Some(MovementType::Out),
            "ADJUST" => Some(MovementType::Adjust),
            _ => None,
        }
    }
}

/// An immutable entry of the movement log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockMovement {
    pub id: Uuid,
    pub stock_item_id: Uuid,
    #[serde(rename = "type")]
    pub movement_type: MovementType,
    /// Signed: positive for IN, negative for OUT
    pub quantity: Quantity,
    /// Unit cost of the receipt, IN only
    pub cost_price: Option<Decimal>,
    /// Unit selling price, OUT only
    pub selling_price: Option<Decimal>,
    pub notes: Option<String>,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
}

/// A movement about to be appended
#[derive(Debug, Clone, PartialEq)]
pub struct NewMovement {
    pub stock_item_id: Uuid,
    pub movement_type: MovementType,
    pub quantity: Quantity,
    pub cost_price: Option<Decimal>,
    pub selling_price: Option<Decimal>,
    pub notes: Option<String>,
    pub user_id: Uuid,
}

/// Movement with the name of the item it belongs to, for history listings
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MovementEntry {
    #[serde(flatten)]
    pub movement: StockMovement,
    pub stock_item_name: String,
}
