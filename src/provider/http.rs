//! HTTP-backed locality price provider.

use super::{LocalityPriceProvider, LocalityPriceRange, ProviderError};
use crate::domain::{LocationKey, PropertyType};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::str::FromStr;
use std::time::Duration;
use tracing::debug;

/// Locality price provider backed by an HTTP price API.
///
/// A failed lookup is never retried here; callers fall back to purchase-price
/// banding for the current cycle and the next scheduled batch run retries.
#[derive(Debug, Clone)]
pub struct HttpLocalityProvider {
    client: Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LocalityPriceDto {
    min_per_unit: String,
    max_per_unit: String,
    sample_size: u32,
    source_count: u32,
    as_of_ms: i64,
}

impl HttpLocalityProvider {
    /// Create a provider against the given base URL with a per-request timeout.
    pub fn new(base_url: String, timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| Client::new());
        Self { client, base_url }
    }

    fn parse_range(dto: LocalityPriceDto) -> Result<LocalityPriceRange, ProviderError> {
        let min_per_unit = Decimal::from_str(&dto.min_per_unit)
            .map_err(|e| ProviderError::ParseError(format!("minPerUnit: {}", e)))?;
        let max_per_unit = Decimal::from_str(&dto.max_per_unit)
            .map_err(|e| ProviderError::ParseError(format!("maxPerUnit: {}", e)))?;
        let as_of = DateTime::<Utc>::from_timestamp_millis(dto.as_of_ms)
            .ok_or_else(|| ProviderError::ParseError(format!("asOfMs: {}", dto.as_of_ms)))?;

        Ok(LocalityPriceRange {
            min_per_unit,
            max_per_unit,
            sample_size: dto.sample_size,
            source_count: dto.source_count,
            as_of,
        })
    }
}

#[async_trait]
impl LocalityPriceProvider for HttpLocalityProvider {
    async fn fetch_range(
        &self,
        location: &LocationKey,
        property_type: PropertyType,
    ) -> Result<Option<LocalityPriceRange>, ProviderError> {
        let (city, pincode) = location.normalized();
        debug!(
            "Fetching locality prices for city={}, pincode={}, type={}",
            city,
            pincode,
            property_type.as_str()
        );

        let url = format!("{}/locality-prices", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[
                ("city", city.as_str()),
                ("pincode", pincode.as_str()),
                ("propertyType", property_type.as_str()),
            ])
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::Timeout
                } else {
                    ProviderError::NetworkError(e.to_string())
                }
            })?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            // No data for this locality; a valid, expected outcome.
            return Ok(None);
        }
        if !status.is_success() {
            return Err(ProviderError::HttpError {
                status: status.as_u16(),
                message: status
                    .canonical_reason()
                    .unwrap_or("unexpected status")
                    .to_string(),
            });
        }

        let dto = response
            .json::<LocalityPriceDto>()
            .await
            .map_err(|e| ProviderError::ParseError(e.to_string()))?;

        Self::parse_range(dto).map(Some)
    }
}
