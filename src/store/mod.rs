//! Write boundary for valuation fields.
//!
//! `ValuationStore` is the only path through which the engine touches asset
//! storage. Its system-estimate writer checks for a user override and then
//! delegates to a repository statement that names exactly three columns, so
//! the override cannot be overwritten even by accident. The separate
//! `set_user_override` entry point exists for the explicit user action and has
//! no skip logic.

pub mod history;

pub use history::ChangeHistoryRecorder;

use crate::db::Repository;
use crate::domain::{
    AssetId, ChangeHistoryEntry, ChangeType, Confidence, OwnerId, ValuationResult, ValuationSource,
};
use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

/// Field name used for system valuation history rows.
pub const VALUATION_FIELD: &str = "system_estimated_range";
/// Field name used for user override history rows.
pub const OVERRIDE_FIELD: &str = "user_override_value";

/// Result of a system-estimate write attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// The three system fields were written and a history row recorded.
    Applied,
    /// A user override exists; nothing was written (skips are not mutations).
    SkippedOverride,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("asset not found: {0}")]
    AssetNotFound(AssetId),
    #[error(transparent)]
    Db(#[from] sqlx::Error),
}

/// The serialized payload of a system valuation history row. This is where
/// the confidence label for the fast read path is persisted; the asset row
/// itself carries only the three system fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredValuation {
    pub min: Decimal,
    pub max: Decimal,
    pub confidence: Confidence,
    pub source: ValuationSource,
}

impl StoredValuation {
    pub fn from_result(result: &ValuationResult) -> Self {
        StoredValuation {
            min: result.min,
            max: result.max,
            confidence: result.confidence,
            source: result.source,
        }
    }

    /// Parse the payload back out of a history row's `new_value`.
    pub fn parse(new_value: Option<&str>) -> Option<Self> {
        new_value.and_then(|v| serde_json::from_str(v).ok())
    }
}

/// Read/write boundary to the asset's persisted valuation fields.
#[derive(Clone)]
pub struct ValuationStore {
    repo: Arc<Repository>,
    recorder: ChangeHistoryRecorder,
}

impl ValuationStore {
    pub fn new(repo: Arc<Repository>, recorder: ChangeHistoryRecorder) -> Self {
        Self { repo, recorder }
    }

    /// Write a computed range unless a user override exists.
    ///
    /// On success the mutation is recorded as a System history entry; a
    /// history failure is logged by the recorder and never rolls the write
    /// back.
    pub async fn apply_if_no_override(
        &self,
        asset_id: &AssetId,
        result: &ValuationResult,
    ) -> Result<ApplyOutcome, StoreError> {
        let asset = self
            .repo
            .get_asset(asset_id)
            .await?
            .ok_or_else(|| StoreError::AssetNotFound(asset_id.clone()))?;

        if asset.user_override_value.is_some() {
            info!("Skipping system estimate for asset {}: user override exists", asset_id);
            return Ok(ApplyOutcome::SkippedOverride);
        }

        let now = Utc::now();
        let applied = self
            .repo
            .apply_system_estimate(asset_id, result.min, result.max, now)
            .await?;
        if !applied {
            // Asset deleted between read and write.
            return Err(StoreError::AssetNotFound(asset_id.clone()));
        }

        let previous = match (asset.system_estimated_min, asset.system_estimated_max) {
            (Some(min), Some(max)) => Some(format!("{{\"min\":{},\"max\":{}}}", min, max)),
            _ => None,
        };
        let payload = serde_json::to_string(&StoredValuation::from_result(result))
            .unwrap_or_else(|e| {
                warn!("Failed to serialize valuation payload: {}", e);
                String::new()
            });

        self.recorder
            .record(ChangeHistoryEntry::system(
                asset_id.clone(),
                ChangeType::Valuation,
                VALUATION_FIELD,
                previous,
                Some(payload),
                now,
            ))
            .await;

        Ok(ApplyOutcome::Applied)
    }

    /// Set or clear the user override. Always writes; always records a User
    /// history entry.
    pub async fn set_user_override(
        &self,
        asset_id: &AssetId,
        value: Option<Decimal>,
        acting_user: &OwnerId,
    ) -> Result<(), StoreError> {
        let asset = self
            .repo
            .get_asset(asset_id)
            .await?
            .ok_or_else(|| StoreError::AssetNotFound(asset_id.clone()))?;

        let updated = self.repo.set_user_override(asset_id, value).await?;
        if !updated {
            return Err(StoreError::AssetNotFound(asset_id.clone()));
        }

        let now = Utc::now();
        self.recorder
            .record(ChangeHistoryEntry::user(
                asset_id.clone(),
                ChangeType::Valuation,
                OVERRIDE_FIELD,
                asset.user_override_value.map(|d| d.to_string()),
                value.map(|d| d.to_string()),
                acting_user.clone(),
                now,
            ))
            .await;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_db;
    use crate::domain::{
        Asset, ChangedBy, LocationKey, PropertyStatus, PropertyType,
    };
    use tempfile::TempDir;

    async fn setup() -> (ValuationStore, Arc<Repository>, sqlx::SqlitePool, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir
            .path()
            .join("test.db")
            .to_string_lossy()
            .to_string();
        let pool = init_db(&db_path).await.expect("init_db failed");
        let repo = Arc::new(Repository::new(pool.clone()));
        let recorder = ChangeHistoryRecorder::new(repo.clone());
        (
            ValuationStore::new(repo.clone(), recorder),
            repo,
            pool,
            temp_dir,
        )
    }

    fn test_asset(id: &str) -> Asset {
        Asset {
            id: AssetId::new(id.to_string()),
            owner_id: OwnerId::new("owner-1".to_string()),
            nickname: None,
            location: LocationKey::new("Pune".to_string(), "411001".to_string()),
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

    fn result(min: i64, max: i64) -> ValuationResult {
        ValuationResult {
            min: Decimal::from(min),
            max: Decimal::from(max),
            confidence: Confidence::Medium,
            source: ValuationSource::LocalityData,
            computed_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_apply_writes_fields_and_records_history() {
        let (store, repo, _pool, _temp) = setup().await;
        let asset = test_asset("a1");
        repo.insert_asset(&asset).await.unwrap();

        let outcome = store
            .apply_if_no_override(&asset.id, &result(100, 200))
            .await
            .unwrap();
        assert_eq!(outcome, ApplyOutcome::Applied);

        let loaded = repo.get_asset(&asset.id).await.unwrap().unwrap();
        assert_eq!(loaded.system_estimated_min, Some(Decimal::from(100)));
        assert_eq!(loaded.system_estimated_max, Some(Decimal::from(200)));
        assert!(loaded.valuation_last_updated.is_some());

        let history = repo.query_history(&asset.id, None, 10, 0).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].changed_by, ChangedBy::System);
        assert_eq!(history[0].field_name, VALUATION_FIELD);

        let stored = StoredValuation::parse(history[0].new_value.as_deref()).unwrap();
        assert_eq!(stored.min, Decimal::from(100));
        assert_eq!(stored.confidence, Confidence::Medium);
    }

    #[tokio::test]
    async fn test_apply_skips_when_override_present() {
        let (store, repo, _pool, _temp) = setup().await;
        let mut asset = test_asset("a1");
        asset.user_override_value = Some(Decimal::from(9_000_000));
        repo.insert_asset(&asset).await.unwrap();

        let outcome = store
            .apply_if_no_override(&asset.id, &result(100, 200))
            .await
            .unwrap();
        assert_eq!(outcome, ApplyOutcome::SkippedOverride);

        let loaded = repo.get_asset(&asset.id).await.unwrap().unwrap();
        assert_eq!(loaded.user_override_value, Some(Decimal::from(9_000_000)));
        assert_eq!(loaded.system_estimated_min, None);
        assert_eq!(loaded.system_estimated_max, None);
        assert!(loaded.valuation_last_updated.is_none());

        // Skips are not mutations: no history row.
        let history = repo.query_history(&asset.id, None, 10, 0).await.unwrap();
        assert!(history.is_empty());
    }

    #[tokio::test]
    async fn test_apply_survives_history_write_failure() {
        let (store, repo, pool, _temp) = setup().await;
        let asset = test_asset("a1");
        repo.insert_asset(&asset).await.unwrap();

        sqlx::query("DROP TABLE change_history")
            .execute(&pool)
            .await
            .unwrap();

        // The primary write must still succeed and report Applied.
        let outcome = store
            .apply_if_no_override(&asset.id, &result(100, 200))
            .await
            .unwrap();
        assert_eq!(outcome, ApplyOutcome::Applied);

        let loaded = repo.get_asset(&asset.id).await.unwrap().unwrap();
        assert_eq!(loaded.system_estimated_min, Some(Decimal::from(100)));
    }

    #[tokio::test]
    async fn test_apply_missing_asset_is_error() {
        let (store, _repo, _pool, _temp) = setup().await;
        let err = store
            .apply_if_no_override(&AssetId::new("missing".to_string()), &result(1, 2))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::AssetNotFound(_)));
    }

    #[tokio::test]
    async fn test_set_user_override_records_user_entry() {
        let (store, repo, _pool, _temp) = setup().await;
        let asset = test_asset("a1");
        repo.insert_asset(&asset).await.unwrap();

        let user = OwnerId::new("owner-1".to_string());
        store
            .set_user_override(&asset.id, Some(Decimal::from(8_000_000)), &user)
            .await
            .unwrap();

        let loaded = repo.get_asset(&asset.id).await.unwrap().unwrap();
        assert_eq!(loaded.user_override_value, Some(Decimal::from(8_000_000)));

        let history = repo.query_history(&asset.id, None, 10, 0).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].changed_by, ChangedBy::User);
        assert_eq!(history[0].changed_by_user_id, Some(user.clone()));
        assert_eq!(history[0].field_name, OVERRIDE_FIELD);

        // Clearing is also a recorded user action.
        store.set_user_override(&asset.id, None, &user).await.unwrap();
        let history = repo.query_history(&asset.id, None, 10, 0).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].previous_value, Some("8000000".to_string()));
        assert_eq!(history[0].new_value, None);
    }

    #[tokio::test]
    async fn test_override_then_apply_is_skip_and_override_unchanged() {
        let (store, repo, _pool, _temp) = setup().await;
        let asset = test_asset("a1");
        repo.insert_asset(&asset).await.unwrap();

        let user = OwnerId::new("owner-1".to_string());
        store
            .set_user_override(&asset.id, Some(Decimal::from(7_500_000)), &user)
            .await
            .unwrap();

        for _ in 0..3 {
            let outcome = store
                .apply_if_no_override(&asset.id, &result(1, 2))
                .await
                .unwrap();
            assert_eq!(outcome, ApplyOutcome::SkippedOverride);
        }

        let loaded = repo.get_asset(&asset.id).await.unwrap().unwrap();
        assert_eq!(loaded.user_override_value, Some(Decimal::from(7_500_000)));
        assert_eq!(loaded.system_estimated_min, None);
    }
}
