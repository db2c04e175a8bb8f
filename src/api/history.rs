//! Change-history read handler.

use crate::api::AppState;
use crate::domain::{AssetId, ChangeHistoryEntry, ChangeType};
use crate::error::AppError;
use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

const DEFAULT_LIMIT: i64 = 50;
const MAX_LIMIT: i64 = 200;

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    /// Optional change-type filter: valuation, loan_balance, rental,
    /// property_details.
    #[serde(rename = "type")]
    pub change_type: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntryDto {
    pub id: String,
    pub asset_id: String,
    pub change_type: String,
    pub field_name: String,
    pub previous_value: Option<String>,
    pub new_value: Option<String>,
    pub changed_by: String,
    pub changed_by_user_id: Option<String>,
    pub update_date: i64,
}

impl HistoryEntryDto {
    fn from_entry(entry: &ChangeHistoryEntry) -> Self {
        HistoryEntryDto {
            id: entry.id.to_string(),
            asset_id: entry.asset_id.as_str().to_string(),
            change_type: entry.change_type.as_str().to_string(),
            field_name: entry.field_name.clone(),
            previous_value: entry.previous_value.clone(),
            new_value: entry.new_value.clone(),
            changed_by: entry.changed_by.as_str().to_string(),
            changed_by_user_id: entry
                .changed_by_user_id
                .as_ref()
                .map(|u| u.as_str().to_string()),
            update_date: entry.update_date.timestamp_millis(),
        }
    }
}

pub async fn get_history(
    State(state): State<AppState>,
    Path(asset_id): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Vec<HistoryEntryDto>>, AppError> {
    let asset_id = AssetId::new(asset_id);
    if state.repo.get_asset(&asset_id).await?.is_none() {
        return Err(AppError::NotFound(format!("asset {}", asset_id)));
    }

    let change_type = match query.change_type {
        Some(raw) => Some(
            ChangeType::from_str(&raw).map_err(|e| AppError::BadRequest(e.to_string()))?,
        ),
        None => None,
    };
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    let offset = query.offset.unwrap_or(0).max(0);

    let entries = state
        .repo
        .query_history(&asset_id, change_type, limit, offset)
        .await?;
    Ok(Json(entries.iter().map(HistoryEntryDto::from_entry).collect()))
}
