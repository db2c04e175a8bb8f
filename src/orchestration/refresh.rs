//! Single-asset refresh pipeline: provider lookup, calculation, guarded write.
//!
//! This is the one path shared by the write-path trigger, the on-demand
//! refresh endpoint, and the batch job. A provider failure is downgraded to
//! "no locality data" for this cycle (the calculator then falls back to
//! purchase-price banding); it is never retried here.

use crate::db::Repository;
use crate::domain::{Asset, AssetId, CalculationOutcome, ValuationResult};
use crate::engine::ValuationCalculator;
use crate::provider::LocalityPriceProvider;
use crate::store::{ApplyOutcome, StoreError, ValuationStore};
use chrono::Utc;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

/// Terminal outcome of one refresh attempt. None of these are errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// A fresh range was computed and written.
    Applied(ValuationResult),
    /// A user override exists; the system fields were left alone.
    SkippedOverride,
    /// Not enough data to value the asset this cycle.
    InsufficientData(String),
}

#[derive(Debug, Error)]
pub enum RefreshError {
    #[error("asset not found: {0}")]
    AssetNotFound(AssetId),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Db(#[from] sqlx::Error),
}

#[derive(Clone)]
pub struct RefreshPipeline {
    repo: Arc<Repository>,
    provider: Arc<dyn LocalityPriceProvider>,
    store: Arc<ValuationStore>,
}

impl RefreshPipeline {
    pub fn new(
        repo: Arc<Repository>,
        provider: Arc<dyn LocalityPriceProvider>,
        store: Arc<ValuationStore>,
    ) -> Self {
        Self {
            repo,
            provider,
            store,
        }
    }

    /// Load the asset and refresh its valuation.
    pub async fn refresh_asset(&self, asset_id: &AssetId) -> Result<RefreshOutcome, RefreshError> {
        let asset = self
            .repo
            .get_asset(asset_id)
            .await?
            .ok_or_else(|| RefreshError::AssetNotFound(asset_id.clone()))?;
        self.refresh_loaded(&asset).await
    }

    /// Refresh an already-loaded asset (the batch job loads rows itself so a
    /// corrupt row fails only its own item).
    pub async fn refresh_loaded(&self, asset: &Asset) -> Result<RefreshOutcome, RefreshError> {
        // Overrides win before any lookup is spent.
        if asset.user_override_value.is_some() {
            info!("Asset {}: user override present, not recomputing", asset.id);
            return Ok(RefreshOutcome::SkippedOverride);
        }

        // A locality band is only useful when there is an area to price.
        let locality = if asset.effective_area().is_some() {
            match self
                .provider
                .fetch_range(&asset.location, asset.property_type)
                .await
            {
                Ok(range) => range,
                Err(e) => {
                    warn!(
                        "Asset {}: locality lookup failed ({}); falling back for this cycle",
                        asset.id, e
                    );
                    None
                }
            }
        } else {
            None
        };

        match ValuationCalculator::calculate(asset, locality.as_ref(), Utc::now()) {
            CalculationOutcome::Valued(result) => {
                match self.store.apply_if_no_override(&asset.id, &result).await? {
                    ApplyOutcome::Applied => Ok(RefreshOutcome::Applied(result)),
                    ApplyOutcome::SkippedOverride => Ok(RefreshOutcome::SkippedOverride),
                }
            }
            CalculationOutcome::InsufficientData { reason } => {
                info!("Asset {}: insufficient data ({})", asset.id, reason);
                Ok(RefreshOutcome::InsufficientData(reason))
            }
        }
    }
}
