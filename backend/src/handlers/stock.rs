//! HTTP handlers for stock items and movements

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use shared::{
    Capability, MovementCommand, MovementEntry, MovementType, StockItemPatch, StockItemView,
    StockMovement,
};
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::middleware::{AuthUser, CurrentUser};
use crate::services::ledger::{
    CreateItemInput, MovementInput, MovementOutcome, ScanMovementInput, ScanOutInput,
};
use crate::store::ItemLookup;
use crate::AppState;

/// Outcome of a movement as returned to the client
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MovementResponse {
    pub message: String,
    pub item: StockItemView,
    pub movement: StockMovement,
}

impl MovementResponse {
    fn new(outcome: MovementOutcome, user: &AuthUser) -> Self {
        let MovementOutcome { item, mut movement } = outcome;
        if !user.can(Capability::SeeCost) {
            movement.cost_price = None;
        }

        let action = match movement.movement_type {
            MovementType::In => "added to stock",
            _ => "removed from stock",
        };
        let message = format!(
            "{} x '{}' {}. Remaining: {}",
            movement.quantity.abs(),
            item.name,
            action,
            item.quantity
        );

        Self {
            message,
            item: item.view(&user.capabilities),
            movement,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<i64>,
}

/// Capability a movement type requires
fn movement_capability(movement_type: MovementType) -> AppResult<Capability> {
    match movement_type {
        MovementType::In => Ok(Capability::AddStock),
        MovementType::Out => Ok(Capability::RemoveStock),
        MovementType::Adjust => Err(AppError::validation("type", "Type must be IN or OUT")),
    }
}

/// Company membership and the capability for the movement type, checked
/// before the body is validated
fn authorize(user: &AuthUser, movement_type: MovementType) -> AppResult<()> {
    user.require_company_access()?;
    user.require(movement_capability(movement_type)?)
}

async fn apply(
    state: &AppState,
    user: &AuthUser,
    lookup: ItemLookup,
    command: MovementCommand,
) -> AppResult<Json<MovementResponse>> {
    let outcome = state
        .ledger()
        .apply_movement(user.company_id, user.user_id, lookup, command)
        .await?;
    Ok(Json(MovementResponse::new(outcome, user)))
}

/// List the company's stock items
pub async fn list_items(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<Vec<StockItemView>>> {
    current_user.0.require_company_access()?;
    let items = state.catalog().list_items(&current_user.0).await?;
    Ok(Json(items))
}

/// Get a single stock item
pub async fn get_item(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(item_id): Path<Uuid>,
) -> AppResult<Json<StockItemView>> {
    current_user.0.require_company_access()?;
    let item = state.catalog().get_item(&current_user.0, item_id).await?;
    Ok(Json(item))
}

/// Create a stock item with its initial stock entry
pub async fn create_item(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateItemInput>,
) -> AppResult<(StatusCode, Json<StockItemView>)> {
    let user = &current_user.0;
    user.require_company_access()?;
    user.require(Capability::AddStock)?;

    let item = state
        .ledger()
        .create_item(user.company_id, user.user_id, input)
        .await?;
    Ok((StatusCode::CREATED, Json(item.view(&user.capabilities))))
}

/// Edit descriptive attributes of a stock item
pub async fn update_item(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(item_id): Path<Uuid>,
    Json(patch): Json<StockItemPatch>,
) -> AppResult<Json<StockItemView>> {
    let user = &current_user.0;
    user.require_company_access()?;
    user.require(Capability::AddStock)?;

    let item = state.catalog().update_item(user, item_id, patch).await?;
    Ok(Json(item))
}

/// Delete a stock item and its movements
pub async fn delete_item(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(item_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    let user = &current_user.0;
    user.require_company_access()?;
    user.require(Capability::RemoveStock)?;

    state.ledger().delete_item(user.company_id, item_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Record a movement for an item addressed by id
pub async fn record_movement(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<MovementInput>,
) -> AppResult<Json<MovementResponse>> {
    authorize(&current_user.0, input.movement_type)?;
    input.validate()?;
    let (lookup, command) = input.into_command();
    apply(&state, &current_user.0, lookup, command).await
}

/// Record a movement for an item addressed by scanned code
pub async fn scan_transaction(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<ScanMovementInput>,
) -> AppResult<Json<MovementResponse>> {
    authorize(&current_user.0, input.movement_type)?;
    input.validate()?;
    let (lookup, command) = input.into_command();
    apply(&state, &current_user.0, lookup, command).await
}

/// Remove one unit of the item matching a scanned code
pub async fn scan_out(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<ScanOutInput>,
) -> AppResult<Json<MovementResponse>> {
    authorize(&current_user.0, MovementType::Out)?;
    input.validate()?;
    let (lookup, command) = input.into_command();
    apply(&state, &current_user.0, lookup, command).await
}

/// Movement history of one item
pub async fn item_movements(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(item_id): Path<Uuid>,
    Query(query): Query<HistoryQuery>,
) -> AppResult<Json<Vec<MovementEntry>>> {
    current_user.0.require_company_access()?;
    let limit = state.history_limit(query.limit);
    let entries = state
        .catalog()
        .movements(&current_user.0, Some(item_id), limit)
        .await?;
    Ok(Json(entries))
}

/// Movement history of the whole company
pub async fn list_movements(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(query): Query<HistoryQuery>,
) -> AppResult<Json<Vec<MovementEntry>>> {
    current_user.0.require_company_access()?;
    let limit = state.history_limit(query.limit);
    let entries = state
        .catalog()
        .movements(&current_user.0, None, limit)
        .await?;
    Ok(Json(entries))
}

/// Items at or below their minimum level
pub async fn low_stock(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<Vec<StockItemView>>> {
    current_user.0.require_company_access()?;
    let items = state.catalog().low_stock(&current_user.0).await?;
    Ok(Json(items))
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::{CapabilitySet, Role};

    #[test]
    fn test_movement_capabilities() {
        assert_eq!(movement_capability(MovementType::In).unwrap(), Capability::AddStock);
        assert_eq!(
            movement_capability(MovementType::Out).unwrap(),
            Capability::RemoveStock
        );
        assert!(movement_capability(MovementType::Adjust).is_err());
    }

    fn user(role: Role, granted: &[Capability]) -> AuthUser {
        AuthUser {
            user_id: Uuid::new_v4(),
            company_id: Uuid::new_v4(),
            role,
            capabilities: CapabilitySet::effective(role, granted.iter().copied().collect()),
        }
    }

    #[test]
    fn test_authorize_checks_membership_then_capability() {
        assert!(matches!(
            authorize(&user(Role::Admin, &[]), MovementType::In),
            Err(AppError::InsufficientPermissions)
        ));
        let clerk = user(Role::User, &[Capability::AddStock]);
        assert!(authorize(&clerk, MovementType::In).is_ok());
        assert!(matches!(
            authorize(&clerk, MovementType::Out),
            Err(AppError::InsufficientPermissions)
        ));
        assert!(authorize(&user(Role::Manager, &[]), MovementType::Out).is_ok());
    }
}
