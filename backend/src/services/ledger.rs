//! Inventory ledger service
//!
//! Applies stock movements atomically: the item row is locked, the movement
//! is planned against the locked state, then the item update and the log
//! entry are written in the same transaction.

use std::sync::Arc;

use rand::Rng;
use rust_decimal::Decimal;
use serde::Deserialize;
use shared::{
    format_barcode, format_sku, plan_movement, MovementCommand, MovementType, NewMovement,
    NewStockItem, Quantity, SellingPriceFallback, StockItem, StockMovement, BARCODE_LENGTH,
};
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::store::{InventoryStore, ItemLookup};

pub const INITIAL_STOCK_NOTE: &str = "initial stock entry";
pub const SCAN_TRANSACTION_NOTE: &str = "quick scan transaction";
pub const SCAN_OUT_NOTE: &str = "scanned out";

/// Movement addressed by item id
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct MovementInput {
    pub stock_item_id: Uuid,
    #[validate(range(min = 1, message = "Quantity must be a positive number"))]
    pub quantity: i32,
    #[serde(rename = "type")]
    pub movement_type: MovementType,
    pub notes: Option<String>,
    #[validate(custom = "crate::services::rules::price")]
    pub cost_price: Option<Decimal>,
    #[validate(custom = "crate::services::rules::price")]
    pub selling_price: Option<Decimal>,
}

impl MovementInput {
    pub fn into_command(self) -> (ItemLookup, MovementCommand) {
        (
            ItemLookup::Id(self.stock_item_id),
            MovementCommand {
                movement_type: self.movement_type,
                quantity: self.quantity,
                cost_price: self.cost_price,
                selling_price: self.selling_price,
                notes: self.notes,
            },
        )
    }
}

/// Movement addressed by a scanned SKU or barcode
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ScanMovementInput {
    #[validate(custom = "crate::services::rules::code")]
    pub code: String,
    #[validate(range(min = 1, message = "Quantity must be a positive number"))]
    pub quantity: i32,
    #[serde(rename = "type")]
    pub movement_type: MovementType,
    #[validate(custom = "crate::services::rules::price")]
    pub cost_price: Option<Decimal>,
    #[validate(custom = "crate::services::rules::price")]
    pub selling_price: Option<Decimal>,
}

impl ScanMovementInput {
    pub fn into_command(self) -> (ItemLookup, MovementCommand) {
        (
            ItemLookup::Code(self.code),
            MovementCommand {
                movement_type: self.movement_type,
                quantity: self.quantity,
                cost_price: self.cost_price,
                selling_price: self.selling_price,
                notes: Some(SCAN_TRANSACTION_NOTE.to_string()),
            },
        )
    }
}

/// Single-unit removal by scanned code
#[derive(Debug, Deserialize, Validate)]
pub struct ScanOutInput {
    #[validate(custom = "crate::services::rules::code")]
    pub code: String,
}

impl ScanOutInput {
    pub fn into_command(self) -> (ItemLookup, MovementCommand) {
        (
            ItemLookup::Code(self.code),
            MovementCommand::stock_out(1, None).with_notes(SCAN_OUT_NOTE),
        )
    }
}

/// Attributes of a new stock item
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "validate_create_levels", skip_on_field_errors = false))]
pub struct CreateItemInput {
    #[validate(custom = "crate::services::rules::name")]
    pub name: String,
    pub description: Option<String>,
    #[validate(custom = "crate::services::rules::optional_code")]
    pub sku: Option<String>,
    #[validate(custom = "crate::services::rules::optional_code")]
    pub barcode: Option<String>,
    pub brand: Option<String>,
    pub location: Option<String>,
    #[validate(custom = "crate::services::rules::initial_quantity")]
    pub quantity: i32,
    pub min_stock_level: Option<Quantity>,
    pub max_stock_level: Option<Quantity>,
    pub unit: Option<String>,
    #[validate(custom = "crate::services::rules::price")]
    pub cost_price: Decimal,
    #[validate(custom = "crate::services::rules::price")]
    pub selling_price: Decimal,
    #[validate(custom = "crate::services::rules::vat_rate")]
    pub vat_rate: Option<Decimal>,
    pub category_id: Option<Uuid>,
}

fn validate_create_levels(input: &CreateItemInput) -> Result<(), validator::ValidationError> {
    shared::validate_stock_levels(input.min_stock_level, input.max_stock_level).map_err(|m| {
        let mut err = validator::ValidationError::new("stock_levels");
        err.message = Some(m.into());
        err
    })
}

pub const DEFAULT_UNIT: &str = "pcs";

/// Result of a committed movement
#[derive(Debug, Clone)]
pub struct MovementOutcome {
    pub item: StockItem,
    pub movement: StockMovement,
}

/// SKU and barcode for items created without them
fn generate_codes() -> (String, String) {
    let mut rng = rand::thread_rng();
    let sku = format_sku(rng.gen());
    let mut digits = [0u8; BARCODE_LENGTH];
    for d in digits.iter_mut() {
        *d = rng.gen_range(0..10);
    }
    (sku, format_barcode(&digits))
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Inventory ledger service
#[derive(Clone)]
pub struct InventoryLedger {
    store: Arc<dyn InventoryStore>,
    fallback: SellingPriceFallback,
}

impl InventoryLedger {
    pub fn new(store: Arc<dyn InventoryStore>, fallback: SellingPriceFallback) -> Self {
        Self { store, fallback }
    }

    /// Apply one IN or OUT movement.
    ///
    /// Exactly one item update and one movement insert are committed, or
    /// nothing is.
    pub async fn apply_movement(
        &self,
        company_id: Uuid,
        actor_id: Uuid,
        lookup: ItemLookup,
        command: MovementCommand,
    ) -> AppResult<MovementOutcome> {
        if actor_id.is_nil() {
            return Err(AppError::unauthorized("Movements require an identified user"));
        }
        command.validate()?;

        let mut tx = self.store.begin().await?;

        let item = match tx.lock_item(company_id, &lookup).await? {
            Some(item) => item,
            None => {
                tx.rollback().await?;
                return Err(match &lookup {
                    ItemLookup::Id(_) => AppError::NotFound("Stock item".to_string()),
                    ItemLookup::Code(code) => {
                        AppError::NotFound(format!("Stock item with code '{}'", code))
                    }
                });
            }
        };

        let fallback = self.fallback.applies(lookup.is_scan());
        let plan = match plan_movement(&item, &command, fallback) {
            Ok(plan) => plan,
            Err(err) => {
                tx.rollback().await?;
                tracing::warn!(
                    item_id = %item.id,
                    movement_type = command.movement_type.as_str(),
                    quantity = command.quantity,
                    available = item.quantity,
                    "Movement rejected: {}",
                    err
                );
                return Err(err.into());
            }
        };

        tx.update_item_quantity_and_cost(item.id, plan.new_quantity, plan.new_cost_price)
            .await?;
        let movement = tx
            .insert_movement(&plan.record(
                item.id,
                command.movement_type,
                actor_id,
                command.notes.clone(),
            ))
            .await?;
        tx.commit().await?;

        tracing::info!(
            item_id = %item.id,
            movement_type = command.movement_type.as_str(),
            quantity = command.quantity,
            new_quantity = plan.new_quantity,
            "Stock movement recorded"
        );

        Ok(MovementOutcome {
            item: StockItem {
                quantity: plan.new_quantity,
                cost_price: plan.new_cost_price,
                updated_at: movement.created_at,
                ..item
            },
            movement,
        })
    }

    /// Create an item together with the IN movement for its initial stock
    pub async fn create_item(
        &self,
        company_id: Uuid,
        actor_id: Uuid,
        input: CreateItemInput,
    ) -> AppResult<StockItem> {
        if actor_id.is_nil() {
            return Err(AppError::unauthorized("Movements require an identified user"));
        }
        input.validate()?;
        shared::check_valuation(input.quantity, input.cost_price, input.selling_price)?;

        if let Some(category_id) = input.category_id {
            if self.store.find_category(company_id, category_id).await?.is_none() {
                return Err(AppError::NotFound("Category".to_string()));
            }
        }

        let (generated_sku, generated_barcode) = generate_codes();
        let new_item = NewStockItem {
            company_id,
            category_id: input.category_id,
            name: input.name.trim().to_string(),
            description: input.description,
            sku: non_blank(input.sku).unwrap_or(generated_sku),
            barcode: non_blank(input.barcode).unwrap_or(generated_barcode),
            brand: input.brand,
            location: input.location,
            quantity: input.quantity,
            min_stock_level: input.min_stock_level,
            max_stock_level: input.max_stock_level,
            unit: non_blank(input.unit).unwrap_or_else(|| DEFAULT_UNIT.to_string()),
            cost_price: input.cost_price,
            selling_price: input.selling_price,
            vat_rate: input.vat_rate.unwrap_or(Decimal::ZERO),
        };

        let mut tx = self.store.begin().await?;
        let item = tx.insert_item(&new_item).await?;
        tx.insert_movement(&NewMovement {
            stock_item_id: item.id,
            movement_type: MovementType::In,
            quantity: item.quantity,
            cost_price: Some(item.cost_price),
            selling_price: None,
            notes: Some(INITIAL_STOCK_NOTE.to_string()),
            user_id: actor_id,
        })
        .await?;
        tx.commit().await?;

        tracing::info!(item_id = %item.id, quantity = item.quantity, "Stock item created");

        Ok(item)
    }

    /// Delete an item and, with it, its movement history
    pub async fn delete_item(&self, company_id: Uuid, item_id: Uuid) -> AppResult<()> {
        if !self.store.delete_item(company_id, item_id).await? {
            return Err(AppError::NotFound("Stock item".to_string()));
        }

        tracing::info!(item_id = %item_id, "Stock item deleted");
        Ok(())
    }
}
