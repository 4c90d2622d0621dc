//! In-memory store
//!
//! Backs tests and local runs without a database. A transaction holds the
//! state lock for its whole lifetime and works on a staged copy, so
//! transactions are serialized and an abandoned one leaves no trace.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use shared::{
    Category, MovementEntry, NewMovement, NewStockItem, Quantity, StockItem, StockMovement,
};
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use super::{InventoryStore, ItemDetails, ItemLookup, StoreTransaction};
use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Default)]
struct State {
    /// Insertion order
    items: Vec<StockItem>,
    categories: Vec<Category>,
    /// Commit order
    movements: Vec<StockMovement>,
}

impl State {
    fn item_mut(&mut self, item_id: Uuid) -> Option<&mut StockItem> {
        self.items.iter_mut().find(|i| i.id == item_id)
    }
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<State>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl InventoryStore for MemoryStore {
    async fn begin(&self) -> AppResult<Box<dyn StoreTransaction>> {
        let guard = self.state.clone().lock_owned().await;
        let staged = guard.clone();
        Ok(Box::new(MemoryTransaction { guard, staged }))
    }

    async fn ping(&self) -> AppResult<()> {
        Ok(())
    }

    async fn list_items(&self, company_id: Uuid) -> AppResult<Vec<StockItem>> {
        let state = self.state.lock().await;
        Ok(state
            .items
            .iter()
            .rev()
            .filter(|i| i.company_id == company_id)
            .cloned()
            .collect())
    }

    async fn find_item(&self, company_id: Uuid, item_id: Uuid) -> AppResult<Option<StockItem>> {
        let state = self.state.lock().await;
        Ok(state
            .items
            .iter()
            .find(|i| i.id == item_id && i.company_id == company_id)
            .cloned())
    }

    async fn update_item_details(
        &self,
        company_id: Uuid,
        item_id: Uuid,
        details: &ItemDetails,
    ) -> AppResult<Option<StockItem>> {
        let mut state = self.state.lock().await;
        let Some(item) = state
            .item_mut(item_id)
            .filter(|i| i.company_id == company_id)
        else {
            return Ok(None);
        };

        item.category_id = details.category_id;
        item.name = details.name.clone();
        item.description = details.description.clone();
        item.sku = details.sku.clone();
        item.barcode = details.barcode.clone();
        item.brand = details.brand.clone();
        item.location = details.location.clone();
        item.min_stock_level = details.min_stock_level;
        item.max_stock_level = details.max_stock_level;
        item.unit = details.unit.clone();
        item.selling_price = details.selling_price;
        item.vat_rate = details.vat_rate;
        item.updated_at = Utc::now();

        Ok(Some(item.clone()))
    }

    async fn delete_item(&self, company_id: Uuid, item_id: Uuid) -> AppResult<bool> {
        let mut state = self.state.lock().await;
        let before = state.items.len();
        state
            .items
            .retain(|i| !(i.id == item_id && i.company_id == company_id));
        if state.items.len() == before {
            return Ok(false);
        }
        state.movements.retain(|m| m.stock_item_id != item_id);
        Ok(true)
    }

    async fn list_movements(
        &self,
        company_id: Uuid,
        item_id: Option<Uuid>,
        limit: i64,
    ) -> AppResult<Vec<MovementEntry>> {
        let state = self.state.lock().await;
        let limit = usize::try_from(limit).unwrap_or(0);

        Ok(state
            .movements
            .iter()
            .rev()
            .filter(|m| item_id.map_or(true, |id| m.stock_item_id == id))
            .filter_map(|m| {
                let item = state
                    .items
                    .iter()
                    .find(|i| i.id == m.stock_item_id && i.company_id == company_id)?;
                Some(MovementEntry {
                    movement: m.clone(),
                    stock_item_name: item.name.clone(),
                })
            })
            .take(limit)
            .collect())
    }

    async fn list_categories(&self, company_id: Uuid) -> AppResult<Vec<Category>> {
        let state = self.state.lock().await;
        let mut categories: Vec<Category> = state
            .categories
            .iter()
            .filter(|c| c.company_id == company_id)
            .cloned()
            .collect();
        categories.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(categories)
    }

    async fn find_category(
        &self,
        company_id: Uuid,
        category_id: Uuid,
    ) -> AppResult<Option<Category>> {
        let state = self.state.lock().await;
        Ok(state
            .categories
            .iter()
            .find(|c| c.id == category_id && c.company_id == company_id)
            .cloned())
    }

    async fn insert_category(
        &self,
        company_id: Uuid,
        name: &str,
        parent_id: Option<Uuid>,
    ) -> AppResult<Category> {
        let mut state = self.state.lock().await;
        let category = Category {
            id: Uuid::new_v4(),
            company_id,
            name: name.to_string(),
            parent_id,
            created_at: Utc::now(),
        };
        state.categories.push(category.clone());
        Ok(category)
    }

    async fn delete_category(&self, company_id: Uuid, category_id: Uuid) -> AppResult<bool> {
        let mut state = self.state.lock().await;
        if !state
            .categories
            .iter()
            .any(|c| c.id == category_id && c.company_id == company_id)
        {
            return Ok(false);
        }

        // Collect the subtree, guarding against cyclic parent links
        let mut doomed = vec![category_id];
        let mut cursor = 0;
        while cursor < doomed.len() {
            let parent = doomed[cursor];
            for child in state.categories.iter().filter(|c| c.parent_id == Some(parent)) {
                if !doomed.contains(&child.id) {
                    doomed.push(child.id);
                }
            }
            cursor += 1;
        }

        state.categories.retain(|c| !doomed.contains(&c.id));
        // Items in deleted descendants lose their category
        for item in state.items.iter_mut() {
            if item.category_id.is_some_and(|id| doomed.contains(&id)) {
                item.category_id = None;
            }
        }
        Ok(true)
    }

    async fn count_items_in_category(
        &self,
        company_id: Uuid,
        category_id: Uuid,
    ) -> AppResult<i64> {
        let state = self.state.lock().await;
        let count = state
            .items
            .iter()
            .filter(|i| i.company_id == company_id && i.category_id == Some(category_id))
            .count();
        Ok(count as i64)
    }
}

pub struct MemoryTransaction {
    guard: OwnedMutexGuard<State>,
    staged: State,
}

#[async_trait]
impl StoreTransaction for MemoryTransaction {
    async fn lock_item(
        &mut self,
        company_id: Uuid,
        lookup: &ItemLookup,
    ) -> AppResult<Option<StockItem>> {
        let mut candidates = self
            .staged
            .items
            .iter()
            .filter(|i| i.company_id == company_id);

        let found = match lookup {
            ItemLookup::Id(id) => candidates.find(|i| i.id == *id),
            ItemLookup::Code(code) => candidates.find(|i| i.matches_code(code)),
        };
        Ok(found.cloned())
    }

    async fn update_item_quantity_and_cost(
        &mut self,
        item_id: Uuid,
        quantity: Quantity,
        cost_price: Decimal,
    ) -> AppResult<()> {
        let item = self
            .staged
            .item_mut(item_id)
            .ok_or_else(|| AppError::NotFound("Stock item".to_string()))?;
        item.quantity = quantity;
        item.cost_price = cost_price;
        item.updated_at = Utc::now();
        Ok(())
    }

    async fn insert_movement(&mut self, movement: &NewMovement) -> AppResult<StockMovement> {
        let record = StockMovement {
            id: Uuid::new_v4(),
            stock_item_id: movement.stock_item_id,
            movement_type: movement.movement_type,
            quantity: movement.quantity,
            cost_price: movement.cost_price,
            selling_price: movement.selling_price,
            notes: movement.notes.clone(),
            user_id: movement.user_id,
            created_at: Utc::now(),
        };
        self.staged.movements.push(record.clone());
        Ok(record)
    }

    async fn insert_item(&mut self, item: &NewStockItem) -> AppResult<StockItem> {
        let now = Utc::now();
        let record = StockItem {
            id: Uuid::new_v4(),
            company_id: item.company_id,
            category_id: item.category_id,
            name: item.name.clone(),
            description: item.description.clone(),
            sku: Some(item.sku.clone()),
            barcode: Some(item.barcode.clone()),
            brand: item.brand.clone(),
            location: item.location.clone(),
            quantity: item.quantity,
            min_stock_level: item.min_stock_level,
            max_stock_level: item.max_stock_level,
            unit: item.unit.clone(),
            cost_price: item.cost_price,
            selling_price: item.selling_price,
            vat_rate: item.vat_rate,
            created_at: now,
            updated_at: now,
        };
        self.staged.items.push(record.clone());
        Ok(record)
    }

    async fn commit(self: Box<Self>) -> AppResult<()> {
        let MemoryTransaction { mut guard, staged } = *self;
        *guard = staged;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> AppResult<()> {
        Ok(())
    }
}
