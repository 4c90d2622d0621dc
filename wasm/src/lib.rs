//! WebAssembly module for Stockroom
//!
//! Provides client-side computation for the stock dashboard:
//! - Category tree building and search filtering
//! - Printable row flattening
//! - Collapse state of tree nodes
//! - Form validation before submit

use std::collections::HashSet;

use rust_decimal::Decimal;
use wasm_bindgen::prelude::*;

// Re-export shared types for use in JavaScript
pub use shared::models::*;
pub use shared::tree::*;
pub use shared::validation::*;

fn parse_tree(
    items_json: &str,
    categories_json: &str,
    search: Option<String>,
) -> Result<CategoryTree, JsValue> {
    let items: Vec<StockItemView> = serde_json::from_str(items_json)
        .map_err(|e| JsValue::from_str(&format!("Invalid items JSON: {}", e)))?;
    let categories: Vec<Category> = serde_json::from_str(categories_json)
        .map_err(|e| JsValue::from_str(&format!("Invalid categories JSON: {}", e)))?;

    let tree = build_tree(&items, &categories);
    Ok(match normalize_search(search.as_deref()) {
        Some(term) => tree.filter(&term),
        None => tree,
    })
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String, JsValue> {
    serde_json::to_string(value).map_err(|e| JsValue::from_str(&e.to_string()))
}

/// Build the category forest from item views and categories, as JSON nodes
#[wasm_bindgen]
pub fn build_category_tree(
    items_json: &str,
    categories_json: &str,
    search: Option<String>,
) -> Result<String, JsValue> {
    let tree = parse_tree(items_json, categories_json, search)?;
    to_json(&tree)
}

/// Depth-annotated rows of the forest, for printing
#[wasm_bindgen]
pub fn flatten_category_tree(
    items_json: &str,
    categories_json: &str,
    search: Option<String>,
) -> Result<String, JsValue> {
    let tree = parse_tree(items_json, categories_json, search)?;
    to_json(&tree.flatten())
}

/// Preview the unit cost after a receipt. Prices are decimal strings.
#[wasm_bindgen]
pub fn preview_weighted_average(
    current_qty: i32,
    current_cost: &str,
    incoming_qty: i32,
    incoming_cost: &str,
) -> Result<String, JsValue> {
    let parse = |s: &str| {
        s.trim()
            .parse::<Decimal>()
            .map_err(|e| JsValue::from_str(&format!("Invalid price '{}': {}", s, e)))
    };
    let cost = shared::weighted_average_cost(
        current_qty,
        parse(current_cost)?,
        incoming_qty,
        parse(incoming_cost)?,
    )
    .map_err(|e| JsValue::from_str(&e.to_string()))?;
    Ok(cost.to_string())
}

/// Error message for an item name, or `None` when valid
#[wasm_bindgen]
pub fn check_item_name(name: &str) -> Option<String> {
    validate_name(name).err().map(str::to_string)
}

/// Error message for a SKU or barcode, or `None` when valid
#[wasm_bindgen]
pub fn check_item_code(code: &str) -> Option<String> {
    validate_code(code).err().map(str::to_string)
}

/// Which tree nodes the user has collapsed
#[wasm_bindgen]
#[derive(Debug, Default)]
pub struct CollapseState {
    collapsed: HashSet<String>,
}

#[wasm_bindgen]
impl CollapseState {
    #[wasm_bindgen(constructor)]
    pub fn new() -> Self {
        Self::default()
    }

    /// Flip a node and return whether it is now collapsed
    pub fn toggle(&mut self, id: &str) -> bool {
        if self.collapsed.remove(id) {
            false
        } else {
            self.collapsed.insert(id.to_string());
            true
        }
    }

    pub fn is_collapsed(&self, id: &str) -> bool {
        self.collapsed.contains(id)
    }

    pub fn expand_all(&mut self) {
        self.collapsed.clear();
    }

    pub fn collapsed_count(&self) -> usize {
        self.collapsed.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collapse_toggle() {
        let mut state = CollapseState::new();
        assert!(state.toggle("a"));
        assert!(state.is_collapsed("a"));
        assert!(!state.toggle("a"));
        assert!(!state.is_collapsed("a"));

        state.toggle("a");
        state.toggle("b");
        assert_eq!(state.collapsed_count(), 2);
        state.expand_all();
        assert_eq!(state.collapsed_count(), 0);
    }

    #[test]
    fn test_preview_weighted_average() {
        assert_eq!(preview_weighted_average(10, "5", 10, "7").unwrap(), "6");
        assert_eq!(preview_weighted_average(0, "0", 3, "2.5").unwrap(), "2.5");
    }

    #[test]
    fn test_build_empty_tree() {
        assert_eq!(build_category_tree("[]", "[]", None).unwrap(), "[]");
    }

    #[test]
    fn test_code_check() {
        assert!(check_item_code("SKU-1").is_none());
        assert!(check_item_code("has space").is_some());
    }
}
