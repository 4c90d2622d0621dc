//! HTTP handlers for category management

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use shared::{Category, Role};
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::catalog::CreateCategoryInput;
use crate::AppState;

/// List the company's categories by name
pub async fn list_categories(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<Vec<Category>>> {
    current_user.0.require_company_access()?;
    let categories = state
        .catalog()
        .list_categories(current_user.0.company_id)
        .await?;
    Ok(Json(categories))
}

/// Create a category (managers only)
pub async fn create_category(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateCategoryInput>,
) -> AppResult<(StatusCode, Json<Category>)> {
    current_user.0.require_role(Role::Manager)?;
    let category = state
        .catalog()
        .create_category(current_user.0.company_id, input)
        .await?;
    Ok((StatusCode::CREATED, Json(category)))
}

/// Delete a category and its subcategories (managers only)
pub async fn delete_category(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(category_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    current_user.0.require_role(Role::Manager)?;
    state
        .catalog()
        .delete_category(current_user.0.company_id, category_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
