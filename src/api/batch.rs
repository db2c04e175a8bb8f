//! Internal batch-refresh endpoint.
//!
//! Meant to be hit by a scheduler, not end users, so it authenticates with a
//! shared service token rather than a user session.

use crate::api::AppState;
use crate::domain::OwnerId;
use crate::error::AppError;
use crate::orchestration::{BatchOptions, BatchScope, BatchSummary};
use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use serde::Deserialize;
use std::time::Duration;

const SERVICE_TOKEN_HEADER: &str = "x-service-token";

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchRefreshRequest {
    pub owner_id: Option<String>,
    pub skip_recent_days: Option<i64>,
    pub concurrency: Option<usize>,
}

pub async fn batch_refresh(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Option<Json<BatchRefreshRequest>>,
) -> Result<Json<BatchSummary>, AppError> {
    let presented = headers
        .get(SERVICE_TOKEN_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if presented != state.config.service_token {
        return Err(AppError::Unauthorized(
            "invalid or missing service token".to_string(),
        ));
    }

    let req = body.map(|Json(r)| r).unwrap_or_default();

    let scope = match req.owner_id {
        Some(owner_id) => BatchScope::Owner(OwnerId::new(owner_id)),
        None => BatchScope::All,
    };
    let options = BatchOptions {
        skip_recent_days: req.skip_recent_days.unwrap_or(state.config.skip_recent_days),
        concurrency: req.concurrency.unwrap_or(state.config.batch_concurrency).max(1),
        pause: Duration::from_millis(state.config.batch_pause_ms),
        deadline: None,
    };

    let summary = state.batch.run(&scope, &options).await?;
    Ok(Json(summary))
}
