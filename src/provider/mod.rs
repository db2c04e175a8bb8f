//! Locality price data abstraction.
//!
//! Real market data acquisition lives behind `LocalityPriceProvider`; the
//! engine only ever sees a price-per-unit-area band plus quality metadata, or
//! "no data" for a location it has never heard of.

use crate::domain::{LocationKey, PropertyType};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::fmt;

pub mod cache;
pub mod http;
pub mod mock;

pub use cache::CachingLocalityProvider;
pub use http::HttpLocalityProvider;
pub use mock::MockLocalityProvider;

/// Externally sourced price-per-unit-area band for one (location, type) key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalityPriceRange {
    pub min_per_unit: Decimal,
    pub max_per_unit: Decimal,
    /// Number of listings behind the band.
    pub sample_size: u32,
    /// Number of distinct data sources contributing.
    pub source_count: u32,
    /// When the underlying data was collected.
    pub as_of: DateTime<Utc>,
}

/// Provider of locality price bands.
///
/// Implementations must tolerate concurrent calls; lookups are never retried
/// synchronously (the next scheduled batch run is the retry mechanism).
#[async_trait]
pub trait LocalityPriceProvider: Send + Sync + fmt::Debug {
    /// Fetch the price band for a location and property type.
    ///
    /// # Returns
    /// `Ok(None)` when the provider has no data for the key; that is an
    /// expected state, not an error.
    async fn fetch_range(
        &self,
        location: &LocationKey,
        property_type: PropertyType,
    ) -> Result<Option<LocalityPriceRange>, ProviderError>;
}

/// Error type for locality lookups.
#[derive(Debug, Clone)]
pub enum ProviderError {
    /// Network error (e.g., connection refused, DNS failure)
    NetworkError(String),
    /// HTTP error (e.g., 429 rate limit, 5xx server error)
    HttpError { status: u16, message: String },
    /// Parsing error (invalid JSON or malformed response)
    ParseError(String),
    /// Lookup exceeded the configured deadline
    Timeout,
    /// Other error
    Other(String),
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderError::NetworkError(msg) => write!(f, "Network error: {}", msg),
            ProviderError::HttpError { status, message } => {
                write!(f, "HTTP error {}: {}", status, message)
            }
            ProviderError::ParseError(msg) => write!(f, "Parse error: {}", msg),
            ProviderError::Timeout => write!(f, "Lookup timed out"),
            ProviderError::Other(msg) => write!(f, "Error: {}", msg),
        }
    }
}

impl std::error::Error for ProviderError {}
