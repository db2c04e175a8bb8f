//! Domain primitives: AssetId, OwnerId, LocationKey, PropertyStatus, PropertyType.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Opaque asset identifier, immutable for the life of the asset.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AssetId(pub String);

impl AssetId {
    /// Create an AssetId from a string.
    pub fn new(id: String) -> Self {
        AssetId(id)
    }

    /// Get the id as a string reference.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for AssetId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque owner identifier; ownership is enforced upstream of the engine.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct OwnerId(pub String);

impl OwnerId {
    /// Create an OwnerId from a string.
    pub fn new(id: String) -> Self {
        OwnerId(id)
    }

    /// Get the id as a string reference.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for OwnerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// City plus postal code; the key used for locality price lookups.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LocationKey {
    pub city: String,
    pub pincode: String,
}

impl LocationKey {
    pub fn new(city: String, pincode: String) -> Self {
        LocationKey { city, pincode }
    }

    /// Normalized form used as a cache key (case-insensitive city).
    pub fn normalized(&self) -> (String, String) {
        (
            self.city.trim().to_lowercase(),
            self.pincode.trim().to_string(),
        )
    }
}

/// Construction status of the property. Under-construction listings overstate
/// completed value and carry a discount in the calculator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyStatus {
    Ready,
    UnderConstruction,
}

impl PropertyStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PropertyStatus::Ready => "ready",
            PropertyStatus::UnderConstruction => "under_construction",
        }
    }
}

impl FromStr for PropertyStatus {
    type Err = EnumParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ready" => Ok(PropertyStatus::Ready),
            "under_construction" => Ok(PropertyStatus::UnderConstruction),
            other => Err(EnumParseError::new("property_status", other)),
        }
    }
}

/// Property type, part of the locality lookup key alongside location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyType {
    Apartment,
    IndependentHouse,
    Plot,
}

impl PropertyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PropertyType::Apartment => "apartment",
            PropertyType::IndependentHouse => "independent_house",
            PropertyType::Plot => "plot",
        }
    }
}

impl FromStr for PropertyType {
    type Err = EnumParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "apartment" => Ok(PropertyType::Apartment),
            "independent_house" => Ok(PropertyType::IndependentHouse),
            "plot" => Ok(PropertyType::Plot),
            other => Err(EnumParseError::new("property_type", other)),
        }
    }
}

/// Error for parsing a domain enum from its stored string form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumParseError {
    pub field: &'static str,
    pub value: String,
}

impl EnumParseError {
    fn new(field: &'static str, value: &str) -> Self {
        EnumParseError {
            field,
            value: value.to_string(),
        }
    }
}

impl std::fmt::Display for EnumParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid {} value: {}", self.field, self.value)
    }
}

impl std::error::Error for EnumParseError {}
