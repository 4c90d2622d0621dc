//! Stock item models

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Capability, CapabilitySet};
use crate::ledger::{stock_value, unrealised_profit, LedgerError};
use crate::types::{deserialize_some, Quantity};

/// A stock item owned by a company.
///
/// `quantity` and `cost_price` are owned by the movement ledger: they only
/// change through recorded movements.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockItem {
    pub id: Uuid,
    pub company_id: Uuid,
    pub category_id: Option<Uuid>,
    pub name: String,
    pub description: Option<String>,
    pub sku: Option<String>,
    pub barcode: Option<String>,
    pub brand: Option<String>,
    pub location: Option<String>,
    pub quantity: Quantity,
    pub min_stock_level: Option<Quantity>,
    pub max_stock_level: Option<Quantity>,
    pub unit: String,
    /// Weighted-average unit cost of all receipts to date
    pub cost_price: Decimal,
    pub selling_price: Decimal,
    pub vat_rate: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl StockItem {
    /// Unrealised profit of the units on hand
    pub fn profit(&self) -> Result<Decimal, LedgerError> {
        unrealised_profit(self.quantity, self.cost_price, self.selling_price)
    }

    /// Whether the quantity on hand reached the configured minimum
    pub fn is_low_stock(&self) -> bool {
        self.min_stock_level
            .is_some_and(|min| self.quantity <= min)
    }

    /// Whether a scanned code identifies this item (SKU or barcode)
    pub fn matches_code(&self, code: &str) -> bool {
        self.sku.as_deref() == Some(code) || self.barcode.as_deref() == Some(code)
    }

    /// Project the item for a reader, redacting cost and profit according
    /// to the reader's capabilities.
    pub fn view(&self, capabilities: &CapabilitySet) -> StockItemView {
        StockItemView {
            id: self.id,
            category_id: self.category_id,
            name: self.name.clone(),
            description: self.description.clone(),
            sku: self.sku.clone(),
            barcode: self.barcode.clone(),
            brand: self.brand.clone(),
            location: self.location.clone(),
            quantity: self.quantity,
            min_stock_level: self.min_stock_level,
            max_stock_level: self.max_stock_level,
            unit: self.unit.clone(),
            selling_price: self.selling_price,
            vat_rate: self.vat_rate,
            cost_price: capabilities
                .contains(Capability::SeeCost)
                .then_some(self.cost_price),
            profit: capabilities
                .contains(Capability::SeeProfit)
                .then(|| self.profit().ok())
                .flatten(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Reader-facing projection of a stock item.
///
/// `cost_price` and `profit` are absent when the reader may not see them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockItemView {
    pub id: Uuid,
    pub category_id: Option<Uuid>,
    pub name: String,
    pub description: Option<String>,
    pub sku: Option<String>,
    pub barcode: Option<String>,
    pub brand: Option<String>,
    pub location: Option<String>,
    pub quantity: Quantity,
    pub min_stock_level: Option<Quantity>,
    pub max_stock_level: Option<Quantity>,
    pub unit: String,
    pub selling_price: Decimal,
    pub vat_rate: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost_price: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profit: Option<Decimal>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl StockItemView {
    /// Stock value at cost, zero when cost is redacted
    pub fn stock_value(&self) -> Result<Decimal, LedgerError> {
        stock_value(self.quantity, self.cost_price.unwrap_or(Decimal::ZERO))
    }
}

/// Fully resolved attributes of an item about to be inserted
#[derive(Debug, Clone, PartialEq)]
pub struct NewStockItem {
    pub company_id: Uuid,
    pub category_id: Option<Uuid>,
    pub name: String,
    pub description: Option<String>,
    pub sku: String,
    pub barcode: String,
    pub brand: Option<String>,
    pub location: Option<String>,
    pub quantity: Quantity,
    pub min_stock_level: Option<Quantity>,
    pub max_stock_level: Option<Quantity>,
    pub unit: String,
    pub cost_price: Decimal,
    pub selling_price: Decimal,
    pub vat_rate: Decimal,
}

/// Partial update of an item's descriptive attributes.
///
/// Quantity and cost are deliberately missing.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockItemPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub sku: Option<String>,
    pub barcode: Option<String>,
    pub brand: Option<String>,
    pub location: Option<String>,
    pub min_stock_level: Option<Quantity>,
    pub max_stock_level: Option<Quantity>,
    pub unit: Option<String>,
    pub selling_price: Option<Decimal>,
    pub vat_rate: Option<Decimal>,
    /// `null` detaches the item from its category
    #[serde(default, deserialize_with = "deserialize_some")]
    pub category_id: Option<Option<Uuid>>,
}

impl StockItemPatch {
    /// Apply the patch onto an item in place
    pub fn apply_to(&self, item: &mut StockItem) {
        if let Some(name) = &self.name {
            item.name = name.clone();
        }
        if let Some(description) = &self.description {
            item.description = Some(description.clone());
        }
        if let Some(sku) = &self.sku {
            item.sku = Some(sku.clone());
        }
        if let Some(barcode) = &self.barcode {
            item.barcode = Some(barcode.clone());
        }
        if let Some(brand) = &self.brand {
            item.brand = Some(brand.clone());
        }
        if let Some(location) = &self.location {
            item.location = Some(location.clone());
        }
        if let Some(min) = self.min_stock_level {
            item.min_stock_level = Some(min);
        }
        if let Some(max) = self.max_stock_level {
            item.max_stock_level = Some(max);
        }
        if let Some(unit) = &self.unit {
            item.unit = unit.clone();
        }
        if let Some(price) = self.selling_price {
            item.selling_price = price;
        }
        if let Some(vat) = self.vat_rate {
            item.vat_rate = vat;
        }
        if let Some(category_id) = self.category_id {
            item.category_id = category_id;
        }
    }
}
