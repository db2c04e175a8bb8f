//! Append-only change history entries.
//!
//! Entries are write-once values: created exactly once per mutation, never
//! updated or deleted. No update/delete surface exists anywhere in the crate.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

use crate::domain::primitives::{AssetId, EnumParseError, OwnerId};

/// Category of mutation recorded in the audit trail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeType {
    Valuation,
    LoanBalance,
    Rental,
    PropertyDetails,
}

impl ChangeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeType::Valuation => "valuation",
            ChangeType::LoanBalance => "loan_balance",
            ChangeType::Rental => "rental",
            ChangeType::PropertyDetails => "property_details",
        }
    }
}

impl FromStr for ChangeType {
    type Err = EnumParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "valuation" => Ok(ChangeType::Valuation),
            "loan_balance" => Ok(ChangeType::LoanBalance),
            "rental" => Ok(ChangeType::Rental),
            "property_details" => Ok(ChangeType::PropertyDetails),
            other => Err(EnumParseError {
                field: "change_type",
                value: other.to_string(),
            }),
        }
    }
}

/// Actor responsible for a mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangedBy {
    User,
    System,
}

impl ChangedBy {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangedBy::User => "user",
            ChangedBy::System => "system",
        }
    }
}

impl FromStr for ChangedBy {
    type Err = EnumParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(ChangedBy::User),
            "system" => Ok(ChangedBy::System),
            other => Err(EnumParseError {
                field: "changed_by",
                value: other.to_string(),
            }),
        }
    }
}

/// One immutable audit record for one field mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeHistoryEntry {
    pub id: Uuid,
    pub asset_id: AssetId,
    pub change_type: ChangeType,
    pub field_name: String,
    pub previous_value: Option<String>,
    pub new_value: Option<String>,
    pub changed_by: ChangedBy,
    /// Present only when `changed_by` is `User`.
    pub changed_by_user_id: Option<OwnerId>,
    pub update_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl ChangeHistoryEntry {
    /// Entry for a mutation performed by the engine itself.
    pub fn system(
        asset_id: AssetId,
        change_type: ChangeType,
        field_name: &str,
        previous_value: Option<String>,
        new_value: Option<String>,
        at: DateTime<Utc>,
    ) -> Self {
        ChangeHistoryEntry {
            id: Uuid::new_v4(),
            asset_id,
            change_type,
            field_name: field_name.to_string(),
            previous_value,
            new_value,
            changed_by: ChangedBy::System,
            changed_by_user_id: None,
            update_date: at,
            created_at: at,
        }
    }

    /// Entry for a mutation performed by an explicit user action.
    pub fn user(
        asset_id: AssetId,
        change_type: ChangeType,
        field_name: &str,
        previous_value: Option<String>,
        new_value: Option<String>,
        acting_user: OwnerId,
        at: DateTime<Utc>,
    ) -> Self {
        ChangeHistoryEntry {
            id: Uuid::new_v4(),
            asset_id,
            change_type,
            field_name: field_name.to_string(),
            previous_value,
            new_value,
            changed_by: ChangedBy::User,
            changed_by_user_id: Some(acting_user),
            update_date: at,
            created_at: at,
        }
    }
}
