//! Category models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A stock category. Categories form a per-company forest through `parent_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: Uuid,
    pub company_id: Uuid,
    pub name: String,
    /// Root category when absent
    pub parent_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}
