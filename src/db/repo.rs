//! Repository layer for database operations.
//!
//! Decimals are stored as canonical strings and timestamps as epoch
//! milliseconds. The system-estimate writer touches exactly three columns and
//! cannot express a write to `user_override_value`; the override writer is a
//! separate statement reserved for the explicit user path. History rows are
//! insert-only; no update or delete statement for them exists in this crate.

use crate::domain::{
    Asset, AssetId, ChangeHistoryEntry, ChangeType, ChangedBy, LocationKey, OwnerId,
    PropertyStatus, PropertyType,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::sqlite::{SqlitePool, SqliteRow};
use sqlx::Row;
use std::str::FromStr;
use uuid::Uuid;

/// Repository for database operations.
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Repository { pool }
    }

    // =========================================================================
    // Asset operations
    // =========================================================================

    /// Insert a new asset row.
    pub async fn insert_asset(&self, asset: &Asset) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO assets (
                id, owner_id, nickname, city, pincode, property_type,
                property_status, area_primary, area_secondary, purchase_price,
                loan_balance, monthly_rent, user_override_value,
                system_estimated_min, system_estimated_max,
                valuation_last_updated, created_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(asset.id.as_str())
        .bind(asset.owner_id.as_str())
        .bind(asset.nickname.as_deref())
        .bind(&asset.location.city)
        .bind(&asset.location.pincode)
        .bind(asset.property_type.as_str())
        .bind(asset.property_status.as_str())
        .bind(asset.area_primary.map(|d| d.to_string()))
        .bind(asset.area_secondary.map(|d| d.to_string()))
        .bind(asset.purchase_price.map(|d| d.to_string()))
        .bind(asset.loan_balance.map(|d| d.to_string()))
        .bind(asset.monthly_rent.map(|d| d.to_string()))
        .bind(asset.user_override_value.map(|d| d.to_string()))
        .bind(asset.system_estimated_min.map(|d| d.to_string()))
        .bind(asset.system_estimated_max.map(|d| d.to_string()))
        .bind(asset.valuation_last_updated.map(|t| t.timestamp_millis()))
        .bind(asset.created_at.timestamp_millis())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Fetch a single asset by id.
    pub async fn get_asset(&self, asset_id: &AssetId) -> Result<Option<Asset>, sqlx::Error> {
        let row = sqlx::query("SELECT * FROM assets WHERE id = ?")
            .bind(asset_id.as_str())
            .fetch_optional(&self.pool)
            .await?;

        row.map(|r| asset_from_row(&r)).transpose()
    }

    /// Update the user-editable detail columns of an asset.
    ///
    /// Deliberately leaves `user_override_value` and the system-estimated
    /// fields alone; those have their own entry points.
    pub async fn update_asset_details(&self, asset: &Asset) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE assets SET
                nickname = ?, city = ?, pincode = ?, property_type = ?,
                property_status = ?, area_primary = ?, area_secondary = ?,
                purchase_price = ?, loan_balance = ?, monthly_rent = ?
            WHERE id = ?
            "#,
        )
        .bind(asset.nickname.as_deref())
        .bind(&asset.location.city)
        .bind(&asset.location.pincode)
        .bind(asset.property_type.as_str())
        .bind(asset.property_status.as_str())
        .bind(asset.area_primary.map(|d| d.to_string()))
        .bind(asset.area_secondary.map(|d| d.to_string()))
        .bind(asset.purchase_price.map(|d| d.to_string()))
        .bind(asset.loan_balance.map(|d| d.to_string()))
        .bind(asset.monthly_rent.map(|d| d.to_string()))
        .bind(asset.id.as_str())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Write the system-estimated range. The statement names exactly three
    /// columns; it is structurally incapable of touching the user override.
    pub async fn apply_system_estimate(
        &self,
        asset_id: &AssetId,
        min: Decimal,
        max: Decimal,
        at: DateTime<Utc>,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE assets SET
                system_estimated_min = ?,
                system_estimated_max = ?,
                valuation_last_updated = ?
            WHERE id = ?
            "#,
        )
        .bind(min.to_string())
        .bind(max.to_string())
        .bind(at.timestamp_millis())
        .bind(asset_id.as_str())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Write (or clear) the user override. Reserved for the explicit user
    /// path; the engine never calls this.
    pub async fn set_user_override(
        &self,
        asset_id: &AssetId,
        value: Option<Decimal>,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE assets SET user_override_value = ? WHERE id = ?")
            .bind(value.map(|d| d.to_string()))
            .bind(asset_id.as_str())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// List asset ids in a batch scope, optionally restricted to one owner.
    ///
    /// Ids only: per-asset rows are fetched (and any decode failure isolated)
    /// item by item during batch processing.
    pub async fn list_asset_ids(
        &self,
        owner: Option<&OwnerId>,
    ) -> Result<Vec<AssetId>, sqlx::Error> {
        let rows = match owner {
            Some(owner) => {
                sqlx::query("SELECT id FROM assets WHERE owner_id = ? ORDER BY created_at")
                    .bind(owner.as_str())
                    .fetch_all(&self.pool)
                    .await?
            }
            None => {
                sqlx::query("SELECT id FROM assets ORDER BY created_at")
                    .fetch_all(&self.pool)
                    .await?
            }
        };

        rows.iter()
            .map(|r| r.try_get::<String, _>("id").map(AssetId::new))
            .collect()
    }

    // =========================================================================
    // Change history operations (append-only)
    // =========================================================================

    /// Append one history row. Rows are never updated or deleted.
    pub async fn insert_history(&self, entry: &ChangeHistoryEntry) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO change_history (
                id, asset_id, change_type, field_name, previous_value,
                new_value, changed_by, changed_by_user_id, update_date, created_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(entry.id.to_string())
        .bind(entry.asset_id.as_str())
        .bind(entry.change_type.as_str())
        .bind(&entry.field_name)
        .bind(entry.previous_value.as_deref())
        .bind(entry.new_value.as_deref())
        .bind(entry.changed_by.as_str())
        .bind(entry.changed_by_user_id.as_ref().map(|u| u.as_str()))
        .bind(entry.update_date.timestamp_millis())
        .bind(entry.created_at.timestamp_millis())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Query history for an asset, newest first, optionally filtered by type.
    pub async fn query_history(
        &self,
        asset_id: &AssetId,
        change_type: Option<ChangeType>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<ChangeHistoryEntry>, sqlx::Error> {
        let rows = match change_type {
            Some(ct) => {
                sqlx::query(
                    r#"
                    SELECT * FROM change_history
                    WHERE asset_id = ? AND change_type = ?
                    ORDER BY created_at DESC, id DESC
                    LIMIT ? OFFSET ?
                    "#,
                )
                .bind(asset_id.as_str())
                .bind(ct.as_str())
                .bind(limit)
                .bind(offset)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query(
                    r#"
                    SELECT * FROM change_history
                    WHERE asset_id = ?
                    ORDER BY created_at DESC, id DESC
                    LIMIT ? OFFSET ?
                    "#,
                )
                .bind(asset_id.as_str())
                .bind(limit)
                .bind(offset)
                .fetch_all(&self.pool)
                .await?
            }
        };

        rows.iter().map(history_from_row).collect()
    }

    /// Newest system-written valuation record for an asset, if any. Used by
    /// the read path to recover the stored confidence label.
    pub async fn latest_valuation_record(
        &self,
        asset_id: &AssetId,
    ) -> Result<Option<ChangeHistoryEntry>, sqlx::Error> {
        let row = sqlx::query(
            r#"
            SELECT * FROM change_history
            WHERE asset_id = ? AND change_type = 'valuation' AND changed_by = 'system'
            ORDER BY created_at DESC, id DESC
            LIMIT 1
            "#,
        )
        .bind(asset_id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(history_from_row).transpose()
    }
}

fn decode_err(column: &str, source: impl std::error::Error + Send + Sync + 'static) -> sqlx::Error {
    sqlx::Error::ColumnDecode {
        index: column.to_string(),
        source: Box::new(source),
    }
}

fn parse_decimal_opt(column: &str, value: Option<String>) -> Result<Option<Decimal>, sqlx::Error> {
    value
        .map(|s| Decimal::from_str(&s).map_err(|e| decode_err(column, e)))
        .transpose()
}

fn parse_timestamp(column: &str, ms: i64) -> Result<DateTime<Utc>, sqlx::Error> {
    DateTime::<Utc>::from_timestamp_millis(ms).ok_or_else(|| {
        decode_err(
            column,
            std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("timestamp out of range: {}", ms),
            ),
        )
    })
}

fn asset_from_row(row: &SqliteRow) -> Result<Asset, sqlx::Error> {
    let property_type: String = row.try_get("property_type")?;
    let property_status: String = row.try_get("property_status")?;
    let valuation_last_updated: Option<i64> = row.try_get("valuation_last_updated")?;

    Ok(Asset {
        id: AssetId::new(row.try_get("id")?),
        owner_id: OwnerId::new(row.try_get("owner_id")?),
        nickname: row.try_get("nickname")?,
        location: LocationKey::new(row.try_get("city")?, row.try_get("pincode")?),
        property_type: PropertyType::from_str(&property_type)
            .map_err(|e| decode_err("property_type", e))?,
        property_status: PropertyStatus::from_str(&property_status)
            .map_err(|e| decode_err("property_status", e))?,
        area_primary: parse_decimal_opt("area_primary", row.try_get("area_primary")?)?,
        area_secondary: parse_decimal_opt("area_secondary", row.try_get("area_secondary")?)?,
        purchase_price: parse_decimal_opt("purchase_price", row.try_get("purchase_price")?)?,
        loan_balance: parse_decimal_opt("loan_balance", row.try_get("loan_balance")?)?,
        monthly_rent: parse_decimal_opt("monthly_rent", row.try_get("monthly_rent")?)?,
        user_override_value: parse_decimal_opt(
            "user_override_value",
            row.try_get("user_override_value")?,
        )?,
        system_estimated_min: parse_decimal_opt(
            "system_estimated_min",
            row.try_get("system_estimated_min")?,
        )?,
        system_estimated_max: parse_decimal_opt(
            "system_estimated_max",
            row.try_get("system_estimated_max")?,
        )?,
        valuation_last_updated: valuation_last_updated
            .map(|ms| parse_timestamp("valuation_last_updated", ms))
            .transpose()?,
        created_at: parse_timestamp("created_at", row.try_get("created_at")?)?,
    })
}

fn history_from_row(row: &SqliteRow) -> Result<ChangeHistoryEntry, sqlx::Error> {
    let id: String = row.try_get("id")?;
    let change_type: String = row.try_get("change_type")?;
    let changed_by: String = row.try_get("changed_by")?;
    let changed_by_user_id: Option<String> = row.try_get("changed_by_user_id")?;

    Ok(ChangeHistoryEntry {
        id: Uuid::from_str(&id).map_err(|e| decode_err("id", e))?,
        asset_id: AssetId::new(row.try_get("asset_id")?),
        change_type: ChangeType::from_str(&change_type)
            .map_err(|e| decode_err("change_type", e))?,
        field_name: row.try_get("field_name")?,
        previous_value: row.try_get("previous_value")?,
        new_value: row.try_get("new_value")?,
        changed_by: ChangedBy::from_str(&changed_by).map_err(|e| decode_err("changed_by", e))?,
        changed_by_user_id: changed_by_user_id.map(OwnerId::new),
        update_date: parse_timestamp("update_date", row.try_get("update_date")?)?,
        created_at: parse_timestamp("created_at", row.try_get("created_at")?)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::migrations::init_db;
    use tempfile::TempDir;

    async fn setup() -> (Repository, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir
            .path()
            .join("test.db")
            .to_string_lossy()
            .to_string();
        let pool = init_db(&db_path).await.expect("init_db failed");
        (Repository::new(pool), temp_dir)
    }

    fn test_asset(id: &str) -> Asset {
        Asset {
            id: AssetId::new(id.to_string()),
            owner_id: OwnerId::new("owner-1".to_string()),
            nickname: Some("flat".to_string()),
            location: LocationKey::new("Pune".to_string(), "411001".to_string()),
            property_type: PropertyType::Apartment,
            property_status: PropertyStatus::Ready,
            area_primary: Some(Decimal::from(1000)),
            area_secondary: None,
            purchase_price: Some(Decimal::from(5_000_000)),
            loan_balance: None,
            monthly_rent: None,
            user_override_value: None,
            system_estimated_min: None,
            system_estimated_max: None,
            valuation_last_updated: None,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_insert_and_get_asset_round_trip() {
        let (repo, _temp) = setup().await;
        let asset = test_asset("a1");
        repo.insert_asset(&asset).await.unwrap();

        let loaded = repo.get_asset(&asset.id).await.unwrap().unwrap();
        assert_eq!(loaded.id, asset.id);
        assert_eq!(loaded.area_primary, Some(Decimal::from(1000)));
        assert_eq!(loaded.purchase_price, Some(Decimal::from(5_000_000)));
        assert_eq!(loaded.user_override_value, None);
        assert_eq!(loaded.location, asset.location);
    }

    #[tokio::test]
    async fn test_get_missing_asset_is_none() {
        let (repo, _temp) = setup().await;
        let result = repo
            .get_asset(&AssetId::new("missing".to_string()))
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_apply_system_estimate_writes_three_fields_only() {
        let (repo, _temp) = setup().await;
        let mut asset = test_asset("a1");
        asset.user_override_value = Some(Decimal::from(9_999_999));
        repo.insert_asset(&asset).await.unwrap();

        let at = Utc::now();
        let applied = repo
            .apply_system_estimate(&asset.id, Decimal::from(100), Decimal::from(200), at)
            .await
            .unwrap();
        assert!(applied);

        let loaded = repo.get_asset(&asset.id).await.unwrap().unwrap();
        assert_eq!(loaded.system_estimated_min, Some(Decimal::from(100)));
        assert_eq!(loaded.system_estimated_max, Some(Decimal::from(200)));
        assert!(loaded.valuation_last_updated.is_some());
        // The raw writer cannot touch the override even when one exists;
        // skip-on-override lives a layer up in the store.
        assert_eq!(loaded.user_override_value, Some(Decimal::from(9_999_999)));
        assert_eq!(loaded.purchase_price, asset.purchase_price);
    }

    #[tokio::test]
    async fn test_apply_system_estimate_missing_asset() {
        let (repo, _temp) = setup().await;
        let applied = repo
            .apply_system_estimate(
                &AssetId::new("missing".to_string()),
                Decimal::ONE,
                Decimal::ONE,
                Utc::now(),
            )
            .await
            .unwrap();
        assert!(!applied);
    }

    #[tokio::test]
    async fn test_set_and_clear_user_override() {
        let (repo, _temp) = setup().await;
        let asset = test_asset("a1");
        repo.insert_asset(&asset).await.unwrap();

        repo.set_user_override(&asset.id, Some(Decimal::from(7_000_000)))
            .await
            .unwrap();
        let loaded = repo.get_asset(&asset.id).await.unwrap().unwrap();
        assert_eq!(loaded.user_override_value, Some(Decimal::from(7_000_000)));

        repo.set_user_override(&asset.id, None).await.unwrap();
        let loaded = repo.get_asset(&asset.id).await.unwrap().unwrap();
        assert_eq!(loaded.user_override_value, None);
    }

    #[tokio::test]
    async fn test_update_asset_details_preserves_valuation_fields() {
        let (repo, _temp) = setup().await;
        let mut asset = test_asset("a1");
        repo.insert_asset(&asset).await.unwrap();
        repo.apply_system_estimate(&asset.id, Decimal::from(100), Decimal::from(200), Utc::now())
            .await
            .unwrap();

        asset.nickname = Some("renamed".to_string());
        asset.loan_balance = Some(Decimal::from(1_000_000));
        assert!(repo.update_asset_details(&asset).await.unwrap());

        let loaded = repo.get_asset(&asset.id).await.unwrap().unwrap();
        assert_eq!(loaded.nickname, Some("renamed".to_string()));
        assert_eq!(loaded.loan_balance, Some(Decimal::from(1_000_000)));
        assert_eq!(loaded.system_estimated_min, Some(Decimal::from(100)));
        assert_eq!(loaded.system_estimated_max, Some(Decimal::from(200)));
    }

    #[tokio::test]
    async fn test_list_asset_ids_scoped_by_owner() {
        let (repo, _temp) = setup().await;
        let a1 = test_asset("a1");
        let mut a2 = test_asset("a2");
        a2.owner_id = OwnerId::new("owner-2".to_string());
        repo.insert_asset(&a1).await.unwrap();
        repo.insert_asset(&a2).await.unwrap();

        let all = repo.list_asset_ids(None).await.unwrap();
        assert_eq!(all.len(), 2);

        let owner_1 = repo
            .list_asset_ids(Some(&OwnerId::new("owner-1".to_string())))
            .await
            .unwrap();
        assert_eq!(owner_1, vec![AssetId::new("a1".to_string())]);
    }

    #[tokio::test]
    async fn test_history_append_and_query_pagination() {
        let (repo, _temp) = setup().await;
        let asset_id = AssetId::new("a1".to_string());

        for i in 0..5 {
            let at = DateTime::<Utc>::from_timestamp_millis(1_700_000_000_000 + i * 1000).unwrap();
            let entry = ChangeHistoryEntry::system(
                asset_id.clone(),
                ChangeType::Valuation,
                "system_estimated_range",
                None,
                Some(format!("{{\"n\":{}}}", i)),
                at,
            );
            repo.insert_history(&entry).await.unwrap();
        }

        let page = repo.query_history(&asset_id, None, 2, 0).await.unwrap();
        assert_eq!(page.len(), 2);
        // Newest first.
        assert_eq!(page[0].new_value, Some("{\"n\":4}".to_string()));

        let next = repo.query_history(&asset_id, None, 2, 2).await.unwrap();
        assert_eq!(next[0].new_value, Some("{\"n\":2}".to_string()));
    }

    #[tokio::test]
    async fn test_history_type_filter() {
        let (repo, _temp) = setup().await;
        let asset_id = AssetId::new("a1".to_string());
        let now = Utc::now();

        let valuation = ChangeHistoryEntry::system(
            asset_id.clone(),
            ChangeType::Valuation,
            "system_estimated_range",
            None,
            None,
            now,
        );
        let loan = ChangeHistoryEntry::user(
            asset_id.clone(),
            ChangeType::LoanBalance,
            "loan_balance",
            Some("100".to_string()),
            Some("90".to_string()),
            OwnerId::new("u1".to_string()),
            now,
        );
        repo.insert_history(&valuation).await.unwrap();
        repo.insert_history(&loan).await.unwrap();

        let loans = repo
            .query_history(&asset_id, Some(ChangeType::LoanBalance), 10, 0)
            .await
            .unwrap();
        assert_eq!(loans.len(), 1);
        assert_eq!(loans[0].changed_by, ChangedBy::User);
        assert_eq!(
            loans[0].changed_by_user_id,
            Some(OwnerId::new("u1".to_string()))
        );
    }

    #[tokio::test]
    async fn test_latest_valuation_record_ignores_user_entries() {
        let (repo, _temp) = setup().await;
        let asset_id = AssetId::new("a1".to_string());

        let older = DateTime::<Utc>::from_timestamp_millis(1_700_000_000_000).unwrap();
        let newer = DateTime::<Utc>::from_timestamp_millis(1_700_000_100_000).unwrap();

        repo.insert_history(&ChangeHistoryEntry::system(
            asset_id.clone(),
            ChangeType::Valuation,
            "system_estimated_range",
            None,
            Some("old".to_string()),
            older,
        ))
        .await
        .unwrap();
        repo.insert_history(&ChangeHistoryEntry::user(
            asset_id.clone(),
            ChangeType::Valuation,
            "user_override_value",
            None,
            Some("override".to_string()),
            OwnerId::new("u1".to_string()),
            newer,
        ))
        .await
        .unwrap();

        let latest = repo
            .latest_valuation_record(&asset_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(latest.new_value, Some("old".to_string()));
    }
}
