//! Asset intake and edit handlers.
//!
//! These stand in for the wider application's CRUD surface: they persist the
//! engine-visible field subset, record user-actor history for each change,
//! and hand changed assets to the fire-and-forget trigger. The HTTP response
//! never waits on a valuation.

use crate::api::AppState;
use crate::domain::{
    Asset, AssetField, AssetId, ChangeHistoryEntry, ChangeType, LocationKey, OwnerId,
    PropertyStatus, PropertyType,
};
use crate::error::AppError;
use crate::orchestration::ValuationTrigger;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAssetRequest {
    pub owner_id: String,
    pub nickname: Option<String>,
    pub city: String,
    pub pincode: String,
    pub property_type: String,
    pub property_status: String,
    pub area_primary: Option<Decimal>,
    pub area_secondary: Option<Decimal>,
    pub purchase_price: Option<Decimal>,
    pub loan_balance: Option<Decimal>,
    pub monthly_rent: Option<Decimal>,
}

/// Edit request; absent fields are left untouched.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAssetRequest {
    pub user_id: String,
    pub nickname: Option<String>,
    pub city: Option<String>,
    pub pincode: Option<String>,
    pub property_status: Option<String>,
    pub area_primary: Option<Decimal>,
    pub area_secondary: Option<Decimal>,
    pub purchase_price: Option<Decimal>,
    pub loan_balance: Option<Decimal>,
    pub monthly_rent: Option<Decimal>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetOverrideRequest {
    pub user_id: String,
    /// `null` clears the override.
    pub value: Option<Decimal>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetDto {
    pub id: String,
    pub owner_id: String,
    pub nickname: Option<String>,
    pub city: String,
    pub pincode: String,
    pub property_type: String,
    pub property_status: String,
    pub area_primary: Option<Decimal>,
    pub area_secondary: Option<Decimal>,
    pub purchase_price: Option<Decimal>,
    pub loan_balance: Option<Decimal>,
    pub monthly_rent: Option<Decimal>,
    pub user_override_value: Option<Decimal>,
    pub system_estimated_min: Option<Decimal>,
    pub system_estimated_max: Option<Decimal>,
    pub valuation_last_updated: Option<i64>,
    pub created_at: i64,
}

impl AssetDto {
    pub fn from_asset(asset: &Asset) -> Self {
        AssetDto {
            id: asset.id.as_str().to_string(),
            owner_id: asset.owner_id.as_str().to_string(),
            nickname: asset.nickname.clone(),
            city: asset.location.city.clone(),
            pincode: asset.location.pincode.clone(),
            property_type: asset.property_type.as_str().to_string(),
            property_status: asset.property_status.as_str().to_string(),
            area_primary: asset.area_primary,
            area_secondary: asset.area_secondary,
            purchase_price: asset.purchase_price,
            loan_balance: asset.loan_balance,
            monthly_rent: asset.monthly_rent,
            user_override_value: asset.user_override_value,
            system_estimated_min: asset.system_estimated_min,
            system_estimated_max: asset.system_estimated_max,
            valuation_last_updated: asset.valuation_last_updated.map(|t| t.timestamp_millis()),
            created_at: asset.created_at.timestamp_millis(),
        }
    }
}

pub async fn create_asset(
    State(state): State<AppState>,
    Json(req): Json<CreateAssetRequest>,
) -> Result<(StatusCode, Json<AssetDto>), AppError> {
    let property_type = PropertyType::from_str(&req.property_type)
        .map_err(|e| AppError::BadRequest(e.to_string()))?;
    let property_status = PropertyStatus::from_str(&req.property_status)
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let asset = Asset {
        id: AssetId::new(Uuid::new_v4().to_string()),
        owner_id: OwnerId::new(req.owner_id),
        nickname: req.nickname,
        location: LocationKey::new(req.city, req.pincode),
        property_type,
        property_status,
        area_primary: positive("areaPrimary", req.area_primary)?,
        area_secondary: positive("areaSecondary", req.area_secondary)?,
        purchase_price: positive("purchasePrice", req.purchase_price)?,
        loan_balance: positive("loanBalance", req.loan_balance)?,
        monthly_rent: positive("monthlyRent", req.monthly_rent)?,
        user_override_value: None,
        system_estimated_min: None,
        system_estimated_max: None,
        valuation_last_updated: None,
        created_at: Utc::now(),
    };

    state.repo.insert_asset(&asset).await?;

    // A brand-new asset always warrants a first valuation attempt; the
    // response does not wait on it.
    state.trigger.fire_and_forget(asset.id.clone());

    Ok((StatusCode::CREATED, Json(AssetDto::from_asset(&asset))))
}

pub async fn update_asset(
    State(state): State<AppState>,
    Path(asset_id): Path<String>,
    Json(req): Json<UpdateAssetRequest>,
) -> Result<Json<AssetDto>, AppError> {
    let asset_id = AssetId::new(asset_id);
    let mut asset = state
        .repo
        .get_asset(&asset_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("asset {}", asset_id)))?;

    let mut changes: Vec<(AssetField, Option<String>, Option<String>)> = Vec::new();

    if let Some(nickname) = req.nickname {
        if asset.nickname.as_deref() != Some(nickname.as_str()) {
            changes.push((
                AssetField::Nickname,
                asset.nickname.clone(),
                Some(nickname.clone()),
            ));
            asset.nickname = Some(nickname);
        }
    }
    if let Some(city) = req.city {
        if asset.location.city != city {
            changes.push((
                AssetField::City,
                Some(asset.location.city.clone()),
                Some(city.clone()),
            ));
            asset.location.city = city;
        }
    }
    if let Some(pincode) = req.pincode {
        if asset.location.pincode != pincode {
            changes.push((
                AssetField::Pincode,
                Some(asset.location.pincode.clone()),
                Some(pincode.clone()),
            ));
            asset.location.pincode = pincode;
        }
    }
    if let Some(status) = req.property_status {
        let status = PropertyStatus::from_str(&status)
            .map_err(|e| AppError::BadRequest(e.to_string()))?;
        if asset.property_status != status {
            changes.push((
                AssetField::PropertyStatus,
                Some(asset.property_status.as_str().to_string()),
                Some(status.as_str().to_string()),
            ));
            asset.property_status = status;
        }
    }

    apply_decimal(
        AssetField::AreaPrimary,
        positive("areaPrimary", req.area_primary)?,
        &mut asset.area_primary,
        &mut changes,
    );
    apply_decimal(
        AssetField::AreaSecondary,
        positive("areaSecondary", req.area_secondary)?,
        &mut asset.area_secondary,
        &mut changes,
    );
    apply_decimal(
        AssetField::PurchasePrice,
        positive("purchasePrice", req.purchase_price)?,
        &mut asset.purchase_price,
        &mut changes,
    );
    apply_decimal(
        AssetField::LoanBalance,
        positive("loanBalance", req.loan_balance)?,
        &mut asset.loan_balance,
        &mut changes,
    );
    apply_decimal(
        AssetField::MonthlyRent,
        positive("monthlyRent", req.monthly_rent)?,
        &mut asset.monthly_rent,
        &mut changes,
    );

    if !changes.is_empty() {
        state.repo.update_asset_details(&asset).await?;

        let acting_user = OwnerId::new(req.user_id);
        let now = Utc::now();
        for (field, previous, new) in &changes {
            state
                .recorder
                .record(ChangeHistoryEntry::user(
                    asset.id.clone(),
                    change_type_for(*field),
                    field.as_str(),
                    previous.clone(),
                    new.clone(),
                    acting_user.clone(),
                    now,
                ))
                .await;
        }

        let changed_fields: Vec<AssetField> = changes.iter().map(|(f, _, _)| *f).collect();
        if ValuationTrigger::should_trigger(&changed_fields) {
            state.trigger.fire_and_forget(asset.id.clone());
        }
    }

    Ok(Json(AssetDto::from_asset(&asset)))
}

pub async fn set_override(
    State(state): State<AppState>,
    Path(asset_id): Path<String>,
    Json(req): Json<SetOverrideRequest>,
) -> Result<Json<AssetDto>, AppError> {
    let asset_id = AssetId::new(asset_id);
    let value = positive("value", req.value)?;
    let acting_user = OwnerId::new(req.user_id);

    state
        .store
        .set_user_override(&asset_id, value, &acting_user)
        .await?;

    let asset = state
        .repo
        .get_asset(&asset_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("asset {}", asset_id)))?;
    Ok(Json(AssetDto::from_asset(&asset)))
}

fn change_type_for(field: AssetField) -> ChangeType {
    match field {
        AssetField::LoanBalance => ChangeType::LoanBalance,
        AssetField::MonthlyRent => ChangeType::Rental,
        _ => ChangeType::PropertyDetails,
    }
}

fn apply_decimal(
    field: AssetField,
    incoming: Option<Decimal>,
    current: &mut Option<Decimal>,
    changes: &mut Vec<(AssetField, Option<String>, Option<String>)>,
) {
    if let Some(value) = incoming {
        if *current != Some(value) {
            changes.push((
                field,
                current.map(|d| d.to_string()),
                Some(value.to_string()),
            ));
            *current = Some(value);
        }
    }
}

fn positive(name: &str, value: Option<Decimal>) -> Result<Option<Decimal>, AppError> {
    match value {
        Some(v) if v <= Decimal::ZERO => Err(AppError::BadRequest(format!(
            "{} must be positive",
            name
        ))),
        other => Ok(other),
    }
}
