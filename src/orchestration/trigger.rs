//! Fire-and-forget valuation dispatch for the asset write path.
//!
//! Request handlers hand an asset id to `fire_and_forget` and return
//! immediately; the refresh runs on a detached task whose outcome is logged
//! and discarded. A semaphore bounds concurrent refreshes so a burst of asset
//! edits cannot fan out without limit.

use crate::domain::{AssetField, AssetId};
use crate::orchestration::refresh::{RefreshOutcome, RefreshPipeline};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{error, info};

#[derive(Clone)]
pub struct ValuationTrigger {
    pipeline: Arc<RefreshPipeline>,
    permits: Arc<Semaphore>,
}

impl ValuationTrigger {
    pub fn new(pipeline: Arc<RefreshPipeline>, max_concurrency: usize) -> Self {
        Self {
            pipeline,
            permits: Arc::new(Semaphore::new(max_concurrency.max(1))),
        }
    }

    /// Whether an edit touching the given fields warrants a re-valuation.
    /// Only location and area changes do; renames and loan/rent updates do
    /// not move the estimate.
    pub fn should_trigger(updated_fields: &[AssetField]) -> bool {
        updated_fields.iter().any(|f| {
            matches!(
                f,
                AssetField::City
                    | AssetField::Pincode
                    | AssetField::AreaPrimary
                    | AssetField::AreaSecondary
            )
        })
    }

    /// Kick off a refresh without waiting for it. Returns as soon as the task
    /// is handed to the runtime; the caller never observes the result.
    pub fn fire_and_forget(&self, asset_id: AssetId) {
        let pipeline = self.pipeline.clone();
        let permits = self.permits.clone();

        tokio::spawn(async move {
            let _permit = match permits.acquire_owned().await {
                Ok(permit) => permit,
                // Closed semaphore means shutdown; nothing to do.
                Err(_) => return,
            };

            match pipeline.refresh_asset(&asset_id).await {
                Ok(RefreshOutcome::Applied(result)) => {
                    info!(
                        "Triggered valuation for asset {}: [{}, {}] ({})",
                        asset_id,
                        result.min,
                        result.max,
                        result.confidence.as_str()
                    );
                }
                Ok(RefreshOutcome::SkippedOverride) => {
                    info!("Triggered valuation for asset {}: override present", asset_id);
                }
                Ok(RefreshOutcome::InsufficientData(reason)) => {
                    info!(
                        "Triggered valuation for asset {}: insufficient data ({})",
                        asset_id, reason
                    );
                }
                Err(e) => {
                    error!("Triggered valuation for asset {} failed: {}", asset_id, e);
                }
            }
        });
    }

    /// Number of free refresh slots; exposed for tests.
    pub fn available_permits(&self) -> usize {
        self.permits.available_permits()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{init_db, Repository};
    use crate::domain::{
        Asset, LocationKey, OwnerId, PropertyStatus, PropertyType,
    };
    use crate::provider::{LocalityPriceRange, MockLocalityProvider};
    use crate::store::{ChangeHistoryRecorder, ValuationStore};
    use chrono::Utc;
    use rust_decimal::Decimal;
    use std::time::{Duration, Instant};
    use tempfile::TempDir;

    fn location() -> LocationKey {
        LocationKey::new("Pune".to_string(), "411001".to_string())
    }

    fn test_asset(id: &str) -> Asset {
        Asset {
            id: AssetId::new(id.to_string()),
            owner_id: OwnerId::new("owner-1".to_string()),
            nickname: None,
            location: location(),
            property_type: PropertyType::Apartment,
            property_status: PropertyStatus::Ready,
            area_primary: Some(Decimal::from(1000)),
            area_secondary: None,
            purchase_price: None,
            loan_balance: None,
            monthly_rent: None,
            user_override_value: None,
            system_estimated_min: None,
            system_estimated_max: None,
            valuation_last_updated: None,
            created_at: Utc::now(),
        }
    }

    fn band() -> LocalityPriceRange {
        LocalityPriceRange {
            min_per_unit: Decimal::from(8000),
            max_per_unit: Decimal::from(9000),
            sample_size: 25,
            source_count: 3,
            as_of: Utc::now(),
        }
    }

    async fn setup(
        provider: MockLocalityProvider,
        max_concurrency: usize,
    ) -> (ValuationTrigger, Arc<Repository>, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir
            .path()
            .join("test.db")
            .to_string_lossy()
            .to_string();
        let pool = init_db(&db_path).await.expect("init_db failed");
        let repo = Arc::new(Repository::new(pool));
        let recorder = ChangeHistoryRecorder::new(repo.clone());
        let store = Arc::new(ValuationStore::new(repo.clone(), recorder));
        let pipeline = Arc::new(RefreshPipeline::new(
            repo.clone(),
            Arc::new(provider),
            store,
        ));
        (
            ValuationTrigger::new(pipeline, max_concurrency),
            repo,
            temp_dir,
        )
    }

    #[test]
    fn test_should_trigger_on_location_and_area_fields() {
        assert!(ValuationTrigger::should_trigger(&[AssetField::City]));
        assert!(ValuationTrigger::should_trigger(&[AssetField::Pincode]));
        assert!(ValuationTrigger::should_trigger(&[AssetField::AreaPrimary]));
        assert!(ValuationTrigger::should_trigger(&[
            AssetField::Nickname,
            AssetField::AreaSecondary
        ]));
    }

    #[test]
    fn test_should_not_trigger_on_unrelated_fields() {
        assert!(!ValuationTrigger::should_trigger(&[AssetField::Nickname]));
        assert!(!ValuationTrigger::should_trigger(&[
            AssetField::LoanBalance,
            AssetField::MonthlyRent
        ]));
        assert!(!ValuationTrigger::should_trigger(&[]));
    }

    #[tokio::test]
    async fn test_fire_and_forget_returns_before_slow_provider() {
        let provider = MockLocalityProvider::new()
            .with_range(&location(), PropertyType::Apartment, band())
            .with_delay(Duration::from_millis(500));
        let (trigger, repo, _temp) = setup(provider, 4).await;

        let asset = test_asset("a1");
        repo.insert_asset(&asset).await.unwrap();

        let started = Instant::now();
        trigger.fire_and_forget(asset.id.clone());
        let handoff = started.elapsed();

        // Task handoff only; the 500ms provider delay must not leak into the
        // caller.
        assert!(
            handoff < Duration::from_millis(100),
            "fire_and_forget took {:?}",
            handoff
        );

        // The refresh still completes in the background.
        tokio::time::sleep(Duration::from_millis(900)).await;
        let loaded = repo.get_asset(&asset.id).await.unwrap().unwrap();
        assert!(loaded.system_estimated_min.is_some());
    }

    #[tokio::test]
    async fn test_trigger_failure_is_swallowed() {
        let provider = MockLocalityProvider::new();
        let (trigger, _repo, _temp) = setup(provider, 4).await;

        // Asset does not exist; the task logs and drops the error.
        trigger.fire_and_forget(AssetId::new("missing".to_string()));
        tokio::time::sleep(Duration::from_millis(100)).await;
    }

    #[tokio::test]
    async fn test_burst_is_bounded_by_semaphore() {
        let provider = MockLocalityProvider::new()
            .with_range(&location(), PropertyType::Apartment, band())
            .with_delay(Duration::from_millis(200));
        let (trigger, repo, _temp) = setup(provider, 2).await;

        for i in 0..6 {
            let asset = test_asset(&format!("a{}", i));
            repo.insert_asset(&asset).await.unwrap();
            trigger.fire_and_forget(asset.id.clone());
        }

        // Give the runtime a moment to start tasks, then check the pool bound.
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(trigger.available_permits(), 0);

        // Eventually everything drains.
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(trigger.available_permits(), 2);
        for i in 0..6 {
            let loaded = repo
                .get_asset(&AssetId::new(format!("a{}", i)))
                .await
                .unwrap()
                .unwrap();
            assert!(loaded.system_estimated_min.is_some());
        }
    }
}
