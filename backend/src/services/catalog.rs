//! Catalog service: item reads and edits, movement history, categories

use std::sync::Arc;

use serde::Deserialize;
use shared::{
    Capability, Category, MovementEntry, StockItem, StockItemPatch, StockItemView,
};
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::middleware::AuthUser;
use crate::store::{InventoryStore, ItemDetails};

/// Input for creating a category
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateCategoryInput {
    #[validate(custom = "crate::services::rules::name")]
    pub name: String,
    pub parent_id: Option<Uuid>,
}

/// Catalog service
#[derive(Clone)]
pub struct CatalogService {
    store: Arc<dyn InventoryStore>,
}

impl CatalogService {
    pub fn new(store: Arc<dyn InventoryStore>) -> Self {
        Self { store }
    }

    /// Items of the user's company, newest first, redacted for the reader
    pub async fn list_items(&self, user: &AuthUser) -> AppResult<Vec<StockItemView>> {
        let items = self.store.list_items(user.company_id).await?;
        Ok(items.iter().map(|i| i.view(&user.capabilities)).collect())
    }

    pub async fn get_item(&self, user: &AuthUser, item_id: Uuid) -> AppResult<StockItemView> {
        let item = self.find_item(user.company_id, item_id).await?;
        Ok(item.view(&user.capabilities))
    }

    /// Items at or below their minimum stock level
    pub async fn low_stock(&self, user: &AuthUser) -> AppResult<Vec<StockItemView>> {
        let items = self.store.list_items(user.company_id).await?;
        Ok(items
            .iter()
            .filter(|i| i.is_low_stock())
            .map(|i| i.view(&user.capabilities))
            .collect())
    }

    /// Edit descriptive attributes. Quantity and cost stay with the ledger.
    pub async fn update_item(
        &self,
        user: &AuthUser,
        item_id: Uuid,
        patch: StockItemPatch,
    ) -> AppResult<StockItemView> {
        validate_patch(&patch)?;

        let mut item = self.find_item(user.company_id, item_id).await?;
        patch.apply_to(&mut item);

        shared::validate_stock_levels(item.min_stock_level, item.max_stock_level)
            .map_err(|m| AppError::validation("minStockLevel", m))?;

        if let Some(category_id) = item.category_id {
            if self
                .store
                .find_category(user.company_id, category_id)
                .await?
                .is_none()
            {
                return Err(AppError::NotFound("Category".to_string()));
            }
        }

        let updated = self
            .store
            .update_item_details(user.company_id, item_id, &ItemDetails::from(&item))
            .await?
            .ok_or_else(|| AppError::NotFound("Stock item".to_string()))?;

        tracing::info!(item_id = %item_id, "Stock item updated");
        Ok(updated.view(&user.capabilities))
    }

    /// Movement history, newest first. Receipt costs are hidden from
    /// readers without the cost capability.
    pub async fn movements(
        &self,
        user: &AuthUser,
        item_id: Option<Uuid>,
        limit: i64,
    ) -> AppResult<Vec<MovementEntry>> {
        if let Some(item_id) = item_id {
            self.find_item(user.company_id, item_id).await?;
        }

        let mut entries = self
            .store
            .list_movements(user.company_id, item_id, limit)
            .await?;

        if !user.can(Capability::SeeCost) {
            for entry in entries.iter_mut() {
                entry.movement.cost_price = None;
            }
        }
        Ok(entries)
    }

    pub async fn list_categories(&self, company_id: Uuid) -> AppResult<Vec<Category>> {
        self.store.list_categories(company_id).await
    }

    pub async fn create_category(
        &self,
        company_id: Uuid,
        input: CreateCategoryInput,
    ) -> AppResult<Category> {
        input.validate()?;

        if let Some(parent_id) = input.parent_id {
            if self.store.find_category(company_id, parent_id).await?.is_none() {
                return Err(AppError::NotFound("Parent category".to_string()));
            }
        }

        let category = self
            .store
            .insert_category(company_id, input.name.trim(), input.parent_id)
            .await?;

        tracing::info!(category_id = %category.id, "Category created");
        Ok(category)
    }

    /// Delete a category with its subcategories. Refused while items still
    /// reference it directly.
    pub async fn delete_category(&self, company_id: Uuid, category_id: Uuid) -> AppResult<()> {
        if self
            .store
            .find_category(company_id, category_id)
            .await?
            .is_none()
        {
            return Err(AppError::NotFound("Category".to_string()));
        }

        let in_use = self
            .store
            .count_items_in_category(company_id, category_id)
            .await?;
        if in_use > 0 {
            return Err(AppError::Conflict {
                resource: "category".to_string(),
                message: format!(
                    "Category cannot be deleted: {} stock item(s) still belong to it",
                    in_use
                ),
            });
        }

        self.store.delete_category(company_id, category_id).await?;
        tracing::info!(category_id = %category_id, "Category deleted");
        Ok(())
    }

    async fn find_item(&self, company_id: Uuid, item_id: Uuid) -> AppResult<StockItem> {
        self.store
            .find_item(company_id, item_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Stock item".to_string()))
    }
}

fn validate_patch(patch: &StockItemPatch) -> AppResult<()> {
    if let Some(name) = &patch.name {
        shared::validate_name(name).map_err(|m| AppError::validation("name", m))?;
    }
    for (field, code) in [("sku", &patch.sku), ("barcode", &patch.barcode)] {
        if let Some(code) = code {
            shared::validate_code(code).map_err(|m| AppError::validation(field, m))?;
        }
    }
    if let Some(unit) = &patch.unit {
        if unit.trim().is_empty() {
            return Err(AppError::validation("unit", "Unit cannot be empty"));
        }
    }
    if let Some(price) = patch.selling_price {
        shared::validate_price(price).map_err(|m| AppError::validation("sellingPrice", m))?;
    }
    if let Some(rate) = patch.vat_rate {
        shared::validate_vat_rate(rate).map_err(|m| AppError::validation("vatRate", m))?;
    }
    Ok(())
}
