//! PostgreSQL store
//!
//! Ledger transactions lock the item row with `SELECT ... FOR UPDATE`, so
//! concurrent movements on one item serialize on the row lock and always
//! read the latest committed quantity and cost.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use shared::{
    Category, MovementEntry, MovementType, NewMovement, NewStockItem, Quantity, StockItem,
    StockMovement,
};
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use uuid::Uuid;

use super::{InventoryStore, ItemDetails, ItemLookup, StoreTransaction};
use crate::error::{AppError, AppResult};

const ITEM_COLUMNS: &str = r#"
    id, company_id, category_id, name, description, sku, barcode, brand, location,
    quantity, min_stock_level, max_stock_level, unit, cost_price, selling_price,
    vat_rate, created_at, updated_at
"#;

const MOVEMENT_COLUMNS: &str = r#"
    id, stock_item_id, type, quantity, cost_price, selling_price, notes, user_id, created_at
"#;

#[derive(Debug, FromRow)]
struct ItemRow {
    id: Uuid,
    company_id: Uuid,
    category_id: Option<Uuid>,
    name: String,
    description: Option<String>,
    sku: Option<String>,
    barcode: Option<String>,
    brand: Option<String>,
    location: Option<String>,
    quantity: i32,
    min_stock_level: Option<i32>,
    max_stock_level: Option<i32>,
    unit: String,
    cost_price: Decimal,
    selling_price: Decimal,
    vat_rate: Decimal,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ItemRow> for StockItem {
    fn from(row: ItemRow) -> Self {
        StockItem {
            id: row.id,
            company_id: row.company_id,
            category_id: row.category_id,
            name: row.name,
            description: row.description,
            sku: row.sku,
            barcode: row.barcode,
            brand: row.brand,
            location: row.location,
            quantity: row.quantity,
            min_stock_level: row.min_stock_level,
            max_stock_level: row.max_stock_level,
            unit: row.unit,
            cost_price: row.cost_price,
            selling_price: row.selling_price,
            vat_rate: row.vat_rate,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct MovementRow {
    id: Uuid,
    stock_item_id: Uuid,
    #[sqlx(rename = "type")]
    movement_type: String,
    quantity: i32,
    cost_price: Option<Decimal>,
    selling_price: Option<Decimal>,
    notes: Option<String>,
    user_id: Uuid,
    created_at: DateTime<Utc>,
}

impl TryFrom<MovementRow> for StockMovement {
    type Error = AppError;

    fn try_from(row: MovementRow) -> AppResult<Self> {
        let movement_type = MovementType::parse(&row.movement_type).ok_or_else(|| {
            AppError::Internal(format!("Unknown movement type: {}", row.movement_type))
        })?;

        Ok(StockMovement {
            id: row.id,
            stock_item_id: row.stock_item_id,
            movement_type,
            quantity: row.quantity,
            cost_price: row.cost_price,
            selling_price: row.selling_price,
            notes: row.notes,
            user_id: row.user_id,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct MovementEntryRow {
    #[sqlx(flatten)]
    movement: MovementRow,
    stock_item_name: String,
}

#[derive(Debug, FromRow)]
struct CategoryRow {
    id: Uuid,
    company_id: Uuid,
    name: String,
    parent_id: Option<Uuid>,
    created_at: DateTime<Utc>,
}

impl From<CategoryRow> for Category {
    fn from(row: CategoryRow) -> Self {
        Category {
            id: row.id,
            company_id: row.company_id,
            name: row.name,
            parent_id: row.parent_id,
            created_at: row.created_at,
        }
    }
}

#[derive(Clone)]
pub struct PgStore {
    db: PgPool,
}

impl PgStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl InventoryStore for PgStore {
    async fn begin(&self) -> AppResult<Box<dyn StoreTransaction>> {
        let tx = self.db.begin().await?;
        Ok(Box::new(PgTransaction { tx }))
    }

    async fn ping(&self) -> AppResult<()> {
        sqlx::query("SELECT 1").execute(&self.db).await?;
        Ok(())
    }

    async fn list_items(&self, company_id: Uuid) -> AppResult<Vec<StockItem>> {
        let rows = sqlx::query_as::<_, ItemRow>(&format!(
            "SELECT {ITEM_COLUMNS} FROM stock_items WHERE company_id = $1 ORDER BY created_at DESC"
        ))
        .bind(company_id)
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(StockItem::from).collect())
    }

    async fn find_item(&self, company_id: Uuid, item_id: Uuid) -> AppResult<Option<StockItem>> {
        let row = sqlx::query_as::<_, ItemRow>(&format!(
            "SELECT {ITEM_COLUMNS} FROM stock_items WHERE id = $1 AND company_id = $2"
        ))
        .bind(item_id)
        .bind(company_id)
        .fetch_optional(&self.db)
        .await?;

        Ok(row.map(StockItem::from))
    }

    async fn update_item_details(
        &self,
        company_id: Uuid,
        item_id: Uuid,
        details: &ItemDetails,
    ) -> AppResult<Option<StockItem>> {
        let row = sqlx::query_as::<_, ItemRow>(&format!(
            r#"
            UPDATE stock_items
            SET category_id = $3, name = $4, description = $5, sku = $6, barcode = $7,
                brand = $8, location = $9, min_stock_level = $10, max_stock_level = $11,
                unit = $12, selling_price = $13, vat_rate = $14, updated_at = now()
            WHERE id = $1 AND company_id = $2
            RETURNING {ITEM_COLUMNS}
            "#
        ))
        .bind(item_id)
        .bind(company_id)
        .bind(details.category_id)
        .bind(&details.name)
        .bind(&details.description)
        .bind(&details.sku)
        .bind(&details.barcode)
        .bind(&details.brand)
        .bind(&details.location)
        .bind(details.min_stock_level)
        .bind(details.max_stock_level)
        .bind(&details.unit)
        .bind(details.selling_price)
        .bind(details.vat_rate)
        .fetch_optional(&self.db)
        .await?;

        Ok(row.map(StockItem::from))
    }

    async fn delete_item(&self, company_id: Uuid, item_id: Uuid) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM stock_items WHERE id = $1 AND company_id = $2")
            .bind(item_id)
            .bind(company_id)
            .execute(&self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_movements(
        &self,
        company_id: Uuid,
        item_id: Option<Uuid>,
        limit: i64,
    ) -> AppResult<Vec<MovementEntry>> {
        let rows = sqlx::query_as::<_, MovementEntryRow>(
            r#"
            SELECT m.id, m.stock_item_id, m.type, m.quantity, m.cost_price, m.selling_price,
                   m.notes, m.user_id, m.created_at, s.name AS stock_item_name
            FROM stock_movements m
            JOIN stock_items s ON s.id = m.stock_item_id
            WHERE s.company_id = $1 AND ($2::uuid IS NULL OR m.stock_item_id = $2)
            ORDER BY m.created_at DESC, m.id DESC
            LIMIT $3
            "#,
        )
        .bind(company_id)
        .bind(item_id)
        .bind(limit)
        .fetch_all(&self.db)
        .await?;

        rows.into_iter()
            .map(|row| -> AppResult<MovementEntry> {
                Ok(MovementEntry {
                    movement: row.movement.try_into()?,
                    stock_item_name: row.stock_item_name,
                })
            })
            .collect()
    }

    async fn list_categories(&self, company_id: Uuid) -> AppResult<Vec<Category>> {
        let rows = sqlx::query_as::<_, CategoryRow>(
            r#"
            SELECT id, company_id, name, parent_id, created_at
            FROM categories
            WHERE company_id = $1
            ORDER BY name ASC
            "#,
        )
        .bind(company_id)
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(Category::from).collect())
    }

    async fn find_category(
        &self,
        company_id: Uuid,
        category_id: Uuid,
    ) -> AppResult<Option<Category>> {
        let row = sqlx::query_as::<_, CategoryRow>(
            r#"
            SELECT id, company_id, name, parent_id, created_at
            FROM categories
            WHERE id = $1 AND company_id = $2
            "#,
        )
        .bind(category_id)
        .bind(company_id)
        .fetch_optional(&self.db)
        .await?;

        Ok(row.map(Category::from))
    }

    async fn insert_category(
        &self,
        company_id: Uuid,
        name: &str,
        parent_id: Option<Uuid>,
    ) -> AppResult<Category> {
        let row = sqlx::query_as::<_, CategoryRow>(
            r#"
            INSERT INTO categories (id, company_id, name, parent_id)
            VALUES ($1, $2, $3, $4)
            RETURNING id, company_id, name, parent_id, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(company_id)
        .bind(name)
        .bind(parent_id)
        .fetch_one(&self.db)
        .await?;

        Ok(row.into())
    }

    async fn delete_category(&self, company_id: Uuid, category_id: Uuid) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM categories WHERE id = $1 AND company_id = $2")
            .bind(category_id)
            .bind(company_id)
            .execute(&self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn count_items_in_category(
        &self,
        company_id: Uuid,
        category_id: Uuid,
    ) -> AppResult<i64> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM stock_items WHERE company_id = $1 AND category_id = $2",
        )
        .bind(company_id)
        .bind(category_id)
        .fetch_one(&self.db)
        .await?;

        Ok(count)
    }
}

pub struct PgTransaction {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl StoreTransaction for PgTransaction {
    async fn lock_item(
        &mut self,
        company_id: Uuid,
        lookup: &ItemLookup,
    ) -> AppResult<Option<StockItem>> {
        let row = match lookup {
            ItemLookup::Id(id) => {
                sqlx::query_as::<_, ItemRow>(&format!(
                    "SELECT {ITEM_COLUMNS} FROM stock_items WHERE id = $1 AND company_id = $2 FOR UPDATE"
                ))
                .bind(id)
                .bind(company_id)
                .fetch_optional(&mut *self.tx)
                .await?
            }
            ItemLookup::Code(code) => {
                sqlx::query_as::<_, ItemRow>(&format!(
                    r#"
                    SELECT {ITEM_COLUMNS} FROM stock_items
                    WHERE company_id = $1 AND (sku = $2 OR barcode = $2)
                    ORDER BY created_at ASC
                    LIMIT 1
                    FOR UPDATE
                    "#
                ))
                .bind(company_id)
                .bind(code)
                .fetch_optional(&mut *self.tx)
                .await?
            }
        };

        Ok(row.map(StockItem::from))
    }

    async fn update_item_quantity_and_cost(
        &mut self,
        item_id: Uuid,
        quantity: Quantity,
        cost_price: Decimal,
    ) -> AppResult<()> {
        sqlx::query(
            r#"
            UPDATE stock_items
            SET quantity = $2, cost_price = $3, updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(item_id)
        .bind(quantity)
        .bind(cost_price)
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    async fn insert_movement(&mut self, movement: &NewMovement) -> AppResult<StockMovement> {
        let row = sqlx::query_as::<_, MovementRow>(&format!(
            r#"
            INSERT INTO stock_movements
                (id, stock_item_id, type, quantity, cost_price, selling_price, notes, user_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {MOVEMENT_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(movement.stock_item_id)
        .bind(movement.movement_type.as_str())
        .bind(movement.quantity)
        .bind(movement.cost_price)
        .bind(movement.selling_price)
        .bind(&movement.notes)
        .bind(movement.user_id)
        .fetch_one(&mut *self.tx)
        .await?;

        row.try_into()
    }

    async fn insert_item(&mut self, item: &NewStockItem) -> AppResult<StockItem> {
        let row = sqlx::query_as::<_, ItemRow>(&format!(
            r#"
            INSERT INTO stock_items (
                id, company_id, category_id, name, description, sku, barcode, brand, location,
                quantity, min_stock_level, max_stock_level, unit, cost_price, selling_price,
                vat_rate
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            RETURNING {ITEM_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(item.company_id)
        .bind(item.category_id)
        .bind(&item.name)
        .bind(&item.description)
        .bind(&item.sku)
        .bind(&item.barcode)
        .bind(&item.brand)
        .bind(&item.location)
        .bind(item.quantity)
        .bind(item.min_stock_level)
        .bind(item.max_stock_level)
        .bind(&item.unit)
        .bind(item.cost_price)
        .bind(item.selling_price)
        .bind(item.vat_rate)
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(row.into())
    }

    async fn commit(self: Box<Self>) -> AppResult<()> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> AppResult<()> {
        self.tx.rollback().await?;
        Ok(())
    }
}
