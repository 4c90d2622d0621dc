//! Inventory ledger tests
//!
//! Exercises the ledger against the in-memory store:
//! - Weighted-average costing on receipts
//! - Quantity conservation between items and the movement log
//! - Stock never going negative, including under concurrent movements
//! - Scan lookups and company scoping

mod common;

use std::sync::Arc;

use common::{dec, TestApp};
use proptest::prelude::*;
use serde_json::json;
use shared::{MovementCommand, MovementType, SellingPriceFallback};
use stockroom_backend::{
    services::{ledger::CreateItemInput, InventoryLedger},
    store::{InventoryStore, ItemLookup, MemoryStore},
    AppError,
};
use uuid::Uuid;

fn base_item() -> serde_json::Value {
    json!({
        "name": "Espresso cups",
        "sku": "CUP-001",
        "barcode": "8850000000017",
        "quantity": 10,
        "costPrice": "5",
        "sellingPrice": "9"
    })
}

// ============================================================================
// Unit Tests
// ============================================================================

#[tokio::test]
async fn test_receipt_updates_weighted_average() {
    let app = TestApp::new();
    let item = app.create_item(base_item()).await;

    let outcome = app
        .ledger()
        .apply_movement(
            app.company_id,
            app.user_id,
            ItemLookup::Id(item.id),
            MovementCommand::stock_in(10, Some(dec("7"))),
        )
        .await
        .unwrap();

    assert_eq!(outcome.item.quantity, 20);
    assert_eq!(outcome.item.cost_price, dec("6"));
    assert_eq!(outcome.movement.quantity, 10);
    assert_eq!(outcome.movement.cost_price, Some(dec("7")));

    let stored = app
        .state
        .store
        .find_item(app.company_id, item.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.quantity, 20);
    assert_eq!(stored.cost_price, dec("6"));
}

#[tokio::test]
async fn test_creation_records_initial_entry() {
    let app = TestApp::new();
    let item = app.create_item(base_item()).await;

    let entries = app
        .state
        .store
        .list_movements(app.company_id, Some(item.id), 10)
        .await
        .unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].movement.movement_type, MovementType::In);
    assert_eq!(entries[0].movement.quantity, 10);
    assert_eq!(entries[0].movement.cost_price, Some(dec("5")));
    assert_eq!(entries[0].stock_item_name, "Espresso cups");
}

#[tokio::test]
async fn test_blank_codes_are_generated() {
    let app = TestApp::new();
    let item = app
        .create_item(json!({
            "name": "Lids",
            "sku": "  ",
            "quantity": 0,
            "costPrice": "0",
            "sellingPrice": "1"
        }))
        .await;

    assert!(item.sku.as_deref().unwrap().starts_with("SKU-"));
    assert_eq!(item.barcode.as_deref().unwrap().len(), 13);
    assert_eq!(item.unit, "pcs");
}

#[tokio::test]
async fn test_oversized_out_is_rejected_without_side_effects() {
    let app = TestApp::new();
    let item = app.create_item(base_item()).await;

    let result = app
        .ledger()
        .apply_movement(
            app.company_id,
            app.user_id,
            ItemLookup::Id(item.id),
            MovementCommand::stock_out(11, None),
        )
        .await;

    assert!(matches!(
        result,
        Err(AppError::InsufficientStock {
            available: 10,
            requested: 11
        })
    ));

    let stored = app
        .state
        .store
        .find_item(app.company_id, item.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.quantity, 10);

    let entries = app
        .state
        .store
        .list_movements(app.company_id, Some(item.id), 10)
        .await
        .unwrap();
    assert_eq!(entries.len(), 1);
}

#[tokio::test]
async fn test_out_keeps_cost_and_logs_negative_quantity() {
    let app = TestApp::new();
    let item = app.create_item(base_item()).await;

    let outcome = app
        .ledger()
        .apply_movement(
            app.company_id,
            app.user_id,
            ItemLookup::Id(item.id),
            MovementCommand::stock_out(4, Some(dec("10"))),
        )
        .await
        .unwrap();

    assert_eq!(outcome.item.quantity, 6);
    assert_eq!(outcome.item.cost_price, dec("5"));
    assert_eq!(outcome.movement.quantity, -4);
    assert_eq!(outcome.movement.selling_price, Some(dec("10")));
}

#[tokio::test]
async fn test_scan_resolves_sku_and_barcode() {
    let app = TestApp::new();
    let item = app.create_item(base_item()).await;

    for code in ["CUP-001", "8850000000017"] {
        let outcome = app
            .ledger()
            .apply_movement(
                app.company_id,
                app.user_id,
                ItemLookup::Code(code.to_string()),
                MovementCommand::stock_out(1, None),
            )
            .await
            .unwrap();
        assert_eq!(outcome.item.id, item.id);
        // Scanned OUT without a price records the item's selling price
        assert_eq!(outcome.movement.selling_price, Some(dec("9")));
    }

    let missing = app
        .ledger()
        .apply_movement(
            app.company_id,
            app.user_id,
            ItemLookup::Code("nope".to_string()),
            MovementCommand::stock_out(1, None),
        )
        .await;
    assert!(matches!(missing, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn test_other_company_cannot_move_item() {
    let app = TestApp::new();
    let item = app.create_item(base_item()).await;

    let result = app
        .ledger()
        .apply_movement(
            Uuid::new_v4(),
            app.user_id,
            ItemLookup::Id(item.id),
            MovementCommand::stock_in(1, None),
        )
        .await;
    assert!(matches!(result, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn test_anonymous_actor_is_rejected() {
    let app = TestApp::new();
    let item = app.create_item(base_item()).await;

    let result = app
        .ledger()
        .apply_movement(
            app.company_id,
            Uuid::nil(),
            ItemLookup::Id(item.id),
            MovementCommand::stock_in(1, None),
        )
        .await;
    assert!(matches!(result, Err(AppError::Unauthorized(_))));
}

#[tokio::test]
async fn test_adjust_is_not_accepted() {
    let app = TestApp::new();
    let item = app.create_item(base_item()).await;

    let command = MovementCommand {
        movement_type: MovementType::Adjust,
        ..MovementCommand::stock_in(1, None)
    };
    let result = app
        .ledger()
        .apply_movement(app.company_id, app.user_id, ItemLookup::Id(item.id), command)
        .await;
    assert!(matches!(result, Err(AppError::Validation { .. })));
}

#[tokio::test]
async fn test_cost_beyond_price_range_is_rejected() {
    let app = TestApp::new();
    let item = app.create_item(base_item()).await;
    let max_decimal = dec("79228162514264337593543950335");

    let result = app
        .ledger()
        .apply_movement(
            app.company_id,
            app.user_id,
            ItemLookup::Id(item.id),
            MovementCommand::stock_in(2, Some(max_decimal)),
        )
        .await;
    assert!(matches!(result, Err(AppError::Validation { .. })));

    let stored = app
        .state
        .store
        .find_item(app.company_id, item.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.quantity, 10);
    assert_eq!(stored.cost_price, dec("5"));

    let mut body = base_item();
    body["sku"] = json!("CUP-002");
    body["barcode"] = json!("8850000000024");
    body["costPrice"] = json!("79228162514264337593543950335");
    let input: CreateItemInput = serde_json::from_value(body).unwrap();
    let result = app
        .ledger()
        .create_item(app.company_id, app.user_id, input)
        .await;
    assert!(matches!(result, Err(AppError::Validation { .. })));
    assert_eq!(app.state.store.list_items(app.company_id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_delete_removes_item_and_history() {
    let app = TestApp::new();
    let item = app.create_item(base_item()).await;

    app.ledger().delete_item(app.company_id, item.id).await.unwrap();

    let entries = app
        .state
        .store
        .list_movements(app.company_id, None, 10)
        .await
        .unwrap();
    assert!(entries.is_empty());
    assert!(matches!(
        app.ledger().delete_item(app.company_id, item.id).await,
        Err(AppError::NotFound(_))
    ));
}

// ============================================================================
// Concurrency Tests
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_receipts_are_serialized() {
    let app = TestApp::new();
    let item = app.create_item(base_item()).await;

    let handles: Vec<_> = (0..20)
        .map(|_| {
            let ledger = app.ledger();
            let (company_id, user_id, item_id) = (app.company_id, app.user_id, item.id);
            tokio::spawn(async move {
                ledger
                    .apply_movement(
                        company_id,
                        user_id,
                        ItemLookup::Id(item_id),
                        MovementCommand::stock_in(1, Some(dec("5"))),
                    )
                    .await
            })
        })
        .collect();

    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let stored = app
        .state
        .store
        .find_item(app.company_id, item.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.quantity, 30);
    assert_eq!(stored.cost_price, dec("5"));

    let entries = app
        .state
        .store
        .list_movements(app.company_id, Some(item.id), 100)
        .await
        .unwrap();
    assert_eq!(entries.len(), 21);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_outs_never_oversell() {
    let app = TestApp::new();
    let item = app
        .create_item(json!({
            "name": "Filters",
            "quantity": 5,
            "costPrice": "1",
            "sellingPrice": "2"
        }))
        .await;

    let handles: Vec<_> = (0..12)
        .map(|_| {
            let ledger = app.ledger();
            let (company_id, user_id, item_id) = (app.company_id, app.user_id, item.id);
            tokio::spawn(async move {
                ledger
                    .apply_movement(
                        company_id,
                        user_id,
                        ItemLookup::Id(item_id),
                        MovementCommand::stock_out(1, None),
                    )
                    .await
            })
        })
        .collect();

    let mut succeeded = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => succeeded += 1,
            Err(AppError::InsufficientStock { available: 0, .. }) => {}
            Err(other) => panic!("unexpected error: {:?}", other),
        }
    }

    assert_eq!(succeeded, 5);
    let stored = app
        .state
        .store
        .find_item(app.company_id, item.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.quantity, 0);
}

// ============================================================================
// Property-Based Tests
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// The item quantity always equals the sum of its signed log entries and
    /// never drops below zero, whatever mix of movements is attempted.
    #[test]
    fn prop_quantity_matches_movement_log(
        initial in 0i32..20,
        moves in prop::collection::vec((any::<bool>(), 1i32..15, 0u32..2000), 0..25),
    ) {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        runtime.block_on(async {
            let store: Arc<dyn InventoryStore> = Arc::new(MemoryStore::new());
            let ledger = InventoryLedger::new(store.clone(), SellingPriceFallback::Never);
            let (company_id, user_id) = (Uuid::new_v4(), Uuid::new_v4());

            let input = serde_json::from_value(json!({
                "name": "Beans",
                "quantity": initial,
                "costPrice": "3",
                "sellingPrice": "5"
            }))
            .unwrap();
            let item = ledger.create_item(company_id, user_id, input).await.unwrap();

            let mut expected = initial;
            for (is_in, quantity, cents) in moves {
                let cost = rust_decimal::Decimal::new(cents as i64, 2);
                let command = if is_in {
                    MovementCommand::stock_in(quantity, Some(cost))
                } else {
                    MovementCommand::stock_out(quantity, None)
                };
                match ledger
                    .apply_movement(company_id, user_id, ItemLookup::Id(item.id), command)
                    .await
                {
                    Ok(outcome) => {
                        expected += if is_in { quantity } else { -quantity };
                        prop_assert_eq!(outcome.item.quantity, expected);
                    }
                    Err(AppError::InsufficientStock { available, requested }) => {
                        prop_assert!(!is_in);
                        prop_assert_eq!(available, expected);
                        prop_assert!(requested > available);
                    }
                    Err(other) => prop_assert!(false, "unexpected error: {:?}", other),
                }
                prop_assert!(expected >= 0);
            }

            let stored = store.find_item(company_id, item.id).await.unwrap().unwrap();
            let logged: i32 = store
                .list_movements(company_id, Some(item.id), 1000)
                .await
                .unwrap()
                .iter()
                .map(|e| e.movement.quantity)
                .sum();
            prop_assert_eq!(stored.quantity, expected);
            prop_assert_eq!(logged, expected);
            Ok(())
        })?;
    }
}
