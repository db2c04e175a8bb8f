//! Valuation result types.
//!
//! `ValuationSource` and `Confidence` are closed enums so every consumer is
//! forced to handle all cases, including the absence of data
//! (`CalculationOutcome::InsufficientData`).

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::domain::primitives::EnumParseError;

/// Coarse quality label for a computed range. The numeric score behind it is
/// internal to the engine and never crosses the API boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

impl Confidence {
    pub fn as_str(&self) -> &'static str {
        match self {
            Confidence::Low => "low",
            Confidence::Medium => "medium",
            Confidence::High => "high",
        }
    }
}

impl FromStr for Confidence {
    type Err = EnumParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(Confidence::Low),
            "medium" => Ok(Confidence::Medium),
            "high" => Ok(Confidence::High),
            other => Err(EnumParseError {
                field: "confidence",
                value: other.to_string(),
            }),
        }
    }
}

/// Where a computed range came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValuationSource {
    LocalityData,
    PurchasePriceFallback,
    UserOverride,
}

impl ValuationSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValuationSource::LocalityData => "locality_data",
            ValuationSource::PurchasePriceFallback => "purchase_price_fallback",
            ValuationSource::UserOverride => "user_override",
        }
    }
}

impl FromStr for ValuationSource {
    type Err = EnumParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "locality_data" => Ok(ValuationSource::LocalityData),
            "purchase_price_fallback" => Ok(ValuationSource::PurchasePriceFallback),
            "user_override" => Ok(ValuationSource::UserOverride),
            other => Err(EnumParseError {
                field: "valuation_source",
                value: other.to_string(),
            }),
        }
    }
}

/// A computed value range. Invariant: `min <= max`, both positive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValuationResult {
    pub min: Decimal,
    pub max: Decimal,
    pub confidence: Confidence,
    pub source: ValuationSource,
    pub computed_at: DateTime<Utc>,
}

impl ValuationResult {
    pub fn midpoint(&self) -> Decimal {
        (self.min + self.max) / Decimal::from(2)
    }
}

/// Outcome of a calculation attempt. Missing inputs are a valid, expected
/// state, not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CalculationOutcome {
    Valued(ValuationResult),
    InsufficientData { reason: String },
}
