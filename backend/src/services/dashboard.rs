//! Dashboard service: category tree and printable report

use std::sync::Arc;

use rust_decimal::Decimal;
use shared::{build_tree, normalize_search, round_money, CategoryTree, TreeRow};

use crate::error::{AppError, AppResult};
use crate::middleware::AuthUser;
use crate::store::InventoryStore;

const REPORT_HEADER: [&str; 11] = [
    "depth",
    "kind",
    "name",
    "sku",
    "quantity",
    "unit",
    "cost_price",
    "selling_price",
    "stock_value",
    "total_cost",
    "total_profit",
];

/// Dashboard service
#[derive(Clone)]
pub struct DashboardService {
    store: Arc<dyn InventoryStore>,
}

impl DashboardService {
    pub fn new(store: Arc<dyn InventoryStore>) -> Self {
        Self { store }
    }

    /// Category forest of the user's company.
    ///
    /// Items are redacted before aggregation, so hidden costs and profits
    /// contribute zero to the totals.
    pub async fn tree(&self, user: &AuthUser, search: Option<&str>) -> AppResult<CategoryTree> {
        let items = self.store.list_items(user.company_id).await?;
        let categories = self.store.list_categories(user.company_id).await?;

        let views: Vec<_> = items.iter().map(|i| i.view(&user.capabilities)).collect();
        let tree = build_tree(&views, &categories);

        Ok(match normalize_search(search) {
            Some(term) => tree.filter(&term),
            None => tree,
        })
    }

    /// CSV rendering of the tree, depth first
    pub async fn report_csv(&self, user: &AuthUser, search: Option<&str>) -> AppResult<Vec<u8>> {
        let tree = self.tree(user, search).await?;
        render_csv(&tree)
    }
}

fn money(value: Option<Decimal>) -> String {
    value.map(|v| round_money(v).to_string()).unwrap_or_default()
}

pub fn render_csv(tree: &CategoryTree) -> AppResult<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer
        .write_record(REPORT_HEADER)
        .map_err(|e| AppError::Internal(format!("Failed to write report: {}", e)))?;

    for row in tree.flatten() {
        let record = match row {
            TreeRow::Category {
                name,
                depth,
                total_cost,
                total_profit,
                ..
            } => [
                depth.to_string(),
                "category".to_string(),
                name,
                String::new(),
                String::new(),
                String::new(),
                String::new(),
                String::new(),
                String::new(),
                money(Some(total_cost)),
                money(Some(total_profit)),
            ],
            TreeRow::Item { depth, item } => [
                depth.to_string(),
                "item".to_string(),
                item.name.clone(),
                item.sku.clone().unwrap_or_default(),
                item.quantity.to_string(),
                item.unit.clone(),
                money(item.cost_price),
                money(Some(item.selling_price)),
                money(item.cost_price.and_then(|_| item.stock_value().ok())),
                String::new(),
                money(item.profit),
            ],
        };
        writer
            .write_record(&record)
            .map_err(|e| AppError::Internal(format!("Failed to write report: {}", e)))?;
    }

    writer
        .into_inner()
        .map_err(|e| AppError::Internal(format!("Failed to write report: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use shared::{Category, StockItemView};
    use uuid::Uuid;

    fn view(name: &str, category_id: Option<Uuid>, cost: Option<Decimal>) -> StockItemView {
        let now = Utc::now();
        StockItemView {
            id: Uuid::new_v4(),
            category_id,
            name: name.to_string(),
            description: None,
            sku: Some("SKU-1".to_string()),
            barcode: None,
            brand: None,
            location: None,
            quantity: 3,
            min_stock_level: None,
            max_stock_level: None,
            unit: "pcs".to_string(),
            selling_price: Decimal::from(4),
            vat_rate: Decimal::ZERO,
            cost_price: cost,
            profit: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_csv_layout() {
        let category = Category {
            id: Uuid::new_v4(),
            company_id: Uuid::new_v4(),
            name: "Drinks".to_string(),
            parent_id: None,
            created_at: Utc::now(),
        };
        let items = vec![view("Cola", Some(category.id), Some(Decimal::from(2)))];
        let tree = build_tree(&items, &[category]);

        let csv = String::from_utf8(render_csv(&tree).unwrap()).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("depth,kind,name"));
        assert_eq!(lines[1], "0,category,Drinks,,,,,,,6,0");
        assert_eq!(lines[2], "1,item,Cola,SKU-1,3,pcs,2,4,6,,");
    }

    #[test]
    fn test_csv_leaves_hidden_cost_blank() {
        let tree = build_tree(&[view("Cola", None, None)], &[]);
        let csv = String::from_utf8(render_csv(&tree).unwrap()).unwrap();
        let item_line = csv.lines().nth(2).unwrap();
        assert_eq!(item_line, "1,item,Cola,SKU-1,3,pcs,,4,,,");
    }
}
