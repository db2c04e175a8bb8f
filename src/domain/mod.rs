//! Domain types for the property valuation engine.
//!
//! This module provides:
//! - Domain primitives: AssetId, OwnerId, LocationKey, PropertyStatus, PropertyType
//! - The engine-visible Asset slice and its derived-input helpers
//! - Valuation result types with closed source/confidence enums
//! - Write-once change-history entries for the audit trail

pub mod asset;
pub mod history;
pub mod primitives;
pub mod valuation;

pub use asset::{Asset, AssetField};
pub use history::{ChangeHistoryEntry, ChangeType, ChangedBy};
pub use primitives::{AssetId, EnumParseError, LocationKey, OwnerId, PropertyStatus, PropertyType};
pub use valuation::{CalculationOutcome, Confidence, ValuationResult, ValuationSource};
