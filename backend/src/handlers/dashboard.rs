//! HTTP handlers for the stock dashboard

use axum::{
    extract::{Query, State},
    http::header,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use shared::{Capability, CategoryTree};

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    pub search: Option<String>,
}

/// Category tree with aggregated totals, optionally filtered
pub async fn get_tree(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(query): Query<SearchQuery>,
) -> AppResult<Json<CategoryTree>> {
    let user = &current_user.0;
    user.require_company_access()?;
    user.require(Capability::AccessDashboard)?;

    let tree = state.dashboard().tree(user, query.search.as_deref()).await?;
    Ok(Json(tree))
}

/// The same tree as a downloadable CSV report
pub async fn get_report(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(query): Query<SearchQuery>,
) -> AppResult<impl IntoResponse> {
    let user = &current_user.0;
    user.require_company_access()?;
    user.require(Capability::AccessDashboard)?;

    let body = state
        .dashboard()
        .report_csv(user, query.search.as_deref())
        .await?;

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"stock-report.csv\"",
            ),
        ],
        body,
    ))
}
