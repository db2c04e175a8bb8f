//! The engine-visible slice of an asset record.
//!
//! The wider application owns asset CRUD; the valuation engine reads the fields
//! below and writes back exactly three of them (`system_estimated_min`,
//! `system_estimated_max`, `valuation_last_updated`). `user_override_value` is
//! written only by the explicit user path, never by the engine.

use crate::domain::primitives::{AssetId, LocationKey, OwnerId, PropertyStatus, PropertyType};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

/// A real-estate asset as the valuation engine sees it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Asset {
    pub id: AssetId,
    pub owner_id: OwnerId,
    pub nickname: Option<String>,
    pub location: LocationKey,
    pub property_type: PropertyType,
    pub property_status: PropertyStatus,
    /// Primary area measurement (carpet area), preferred when present.
    pub area_primary: Option<Decimal>,
    /// Secondary area measurement (built-up area), used when primary is absent.
    pub area_secondary: Option<Decimal>,
    pub purchase_price: Option<Decimal>,
    pub loan_balance: Option<Decimal>,
    pub monthly_rent: Option<Decimal>,
    /// Manually supplied value; always wins over any computed estimate.
    pub user_override_value: Option<Decimal>,
    pub system_estimated_min: Option<Decimal>,
    pub system_estimated_max: Option<Decimal>,
    /// Timestamp of the last write to the system-estimated fields only.
    pub valuation_last_updated: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Asset {
    /// Area used for valuation: primary if present, else secondary.
    pub fn effective_area(&self) -> Option<Decimal> {
        self.area_primary.or(self.area_secondary)
    }

    /// Whether the asset carries enough data to attempt any valuation at all.
    pub fn has_valuation_inputs(&self) -> bool {
        self.effective_area().is_some() || self.purchase_price.is_some()
    }
}

/// Fields of an asset that the edit path can touch, used by the trigger to
/// decide whether a re-valuation is warranted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetField {
    Nickname,
    City,
    Pincode,
    PropertyType,
    PropertyStatus,
    AreaPrimary,
    AreaSecondary,
    PurchasePrice,
    LoanBalance,
    MonthlyRent,
}

impl AssetField {
    /// Stored column/field name, used in change-history entries.
    pub fn as_str(&self) -> &'static str {
        match self {
            AssetField::Nickname => "nickname",
            AssetField::City => "city",
            AssetField::Pincode => "pincode",
            AssetField::PropertyType => "property_type",
            AssetField::PropertyStatus => "property_status",
            AssetField::AreaPrimary => "area_primary",
            AssetField::AreaSecondary => "area_secondary",
            AssetField::PurchasePrice => "purchase_price",
            AssetField::LoanBalance => "loan_balance",
            AssetField::MonthlyRent => "monthly_rent",
        }
    }
}
