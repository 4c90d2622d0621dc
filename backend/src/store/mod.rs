//! Persistence layer
//!
//! Services talk to an [`InventoryStore`]. Ledger writes go through a
//! [`StoreTransaction`] that holds the item row lock until it is committed;
//! dropping an uncommitted transaction rolls it back.

use async_trait::async_trait;
use rust_decimal::Decimal;
use shared::{
    Category, MovementEntry, NewMovement, NewStockItem, Quantity, StockItem, StockMovement,
};
use uuid::Uuid;

use crate::error::AppResult;

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// How a movement names its target item
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemLookup {
    Id(Uuid),
    /// SKU or barcode, as scanned
    Code(String),
}

impl ItemLookup {
    pub fn is_scan(&self) -> bool {
        matches!(self, ItemLookup::Code(_))
    }
}

/// Descriptive attributes written by item updates
#[derive(Debug, Clone, PartialEq)]
pub struct ItemDetails {
    pub category_id: Option<Uuid>,
    pub name: String,
    pub description: Option<String>,
    pub sku: Option<String>,
    pub barcode: Option<String>,
    pub brand: Option<String>,
    pub location: Option<String>,
    pub min_stock_level: Option<Quantity>,
    pub max_stock_level: Option<Quantity>,
    pub unit: String,
    pub selling_price: Decimal,
    pub vat_rate: Decimal,
}

impl From<&StockItem> for ItemDetails {
    fn from(item: &StockItem) -> Self {
        Self {
            category_id: item.category_id,
            name: item.name.clone(),
            description: item.description.clone(),
            sku: item.sku.clone(),
            barcode: item.barcode.clone(),
            brand: item.brand.clone(),
            location: item.location.clone(),
            min_stock_level: item.min_stock_level,
            max_stock_level: item.max_stock_level,
            unit: item.unit.clone(),
            selling_price: item.selling_price,
            vat_rate: item.vat_rate,
        }
    }
}

#[async_trait]
pub trait InventoryStore: Send + Sync {
    /// Open a transaction for ledger writes
    async fn begin(&self) -> AppResult<Box<dyn StoreTransaction>>;

    /// Check that the store is reachable
    async fn ping(&self) -> AppResult<()>;

    /// Items of a company, newest first
    async fn list_items(&self, company_id: Uuid) -> AppResult<Vec<StockItem>>;

    async fn find_item(&self, company_id: Uuid, item_id: Uuid) -> AppResult<Option<StockItem>>;

    /// Overwrite descriptive attributes. Quantity and cost are left alone.
    async fn update_item_details(
        &self,
        company_id: Uuid,
        item_id: Uuid,
        details: &ItemDetails,
    ) -> AppResult<Option<StockItem>>;

    /// Delete an item with its movements. `false` when nothing matched.
    async fn delete_item(&self, company_id: Uuid, item_id: Uuid) -> AppResult<bool>;

    /// Newest first, optionally restricted to one item
    async fn list_movements(
        &self,
        company_id: Uuid,
        item_id: Option<Uuid>,
        limit: i64,
    ) -> AppResult<Vec<MovementEntry>>;

    /// Categories of a company, by name
    async fn list_categories(&self, company_id: Uuid) -> AppResult<Vec<Category>>;

    async fn find_category(
        &self,
        company_id: Uuid,
        category_id: Uuid,
    ) -> AppResult<Option<Category>>;

    async fn insert_category(
        &self,
        company_id: Uuid,
        name: &str,
        parent_id: Option<Uuid>,
    ) -> AppResult<Category>;

    /// Delete a category and its descendants. `false` when nothing matched.
    async fn delete_category(&self, company_id: Uuid, category_id: Uuid) -> AppResult<bool>;

    /// Items referencing the category directly
    async fn count_items_in_category(&self, company_id: Uuid, category_id: Uuid)
        -> AppResult<i64>;
}

#[async_trait]
pub trait StoreTransaction: Send {
    /// Read an item and lock it until the transaction ends
    async fn lock_item(
        &mut self,
        company_id: Uuid,
        lookup: &ItemLookup,
    ) -> AppResult<Option<StockItem>>;

    async fn update_item_quantity_and_cost(
        &mut self,
        item_id: Uuid,
        quantity: Quantity,
        cost_price: Decimal,
    ) -> AppResult<()>;

    async fn insert_movement(&mut self, movement: &NewMovement) -> AppResult<StockMovement>;

    async fn insert_item(&mut self, item: &NewStockItem) -> AppResult<StockItem>;

    async fn commit(self: Box<Self>) -> AppResult<()>;

    async fn rollback(self: Box<Self>) -> AppResult<()>;
}
