pub mod assets;
pub mod batch;
pub mod health;
pub mod history;
pub mod valuation;

use crate::config::Config;
use crate::db::Repository;
use crate::orchestration::{BatchRefreshJob, RefreshPipeline, ValuationTrigger};
use crate::store::{ChangeHistoryRecorder, ValuationStore};
use axum::{
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<Repository>,
    pub store: Arc<ValuationStore>,
    pub recorder: ChangeHistoryRecorder,
    pub pipeline: Arc<RefreshPipeline>,
    pub trigger: ValuationTrigger,
    pub batch: Arc<BatchRefreshJob>,
    pub config: Config,
}

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health::health))
        .route("/ready", get(health::ready))
        .route("/v1/assets", post(assets::create_asset))
        .route("/v1/assets/:asset_id", put(assets::update_asset))
        .route("/v1/assets/:asset_id/override", put(assets::set_override))
        .route("/v1/assets/:asset_id/history", get(history::get_history))
        .route("/v1/valuation/:asset_id", get(valuation::get_valuation))
        .route(
            "/v1/valuation/:asset_id/refresh",
            post(valuation::refresh_valuation),
        )
        .route("/v1/valuation/batch-refresh", post(batch::batch_refresh))
        .layer(cors)
        .with_state(state)
}
