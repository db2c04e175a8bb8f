//! Mock locality provider for testing without network calls.

use super::{LocalityPriceProvider, LocalityPriceRange, ProviderError};
use crate::domain::{LocationKey, PropertyType};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

type Key = (String, String, PropertyType);

/// Mock provider returning predefined price bands.
///
/// Locations without a configured band return `Ok(None)`. An optional
/// artificial delay simulates a slow upstream for non-blocking tests.
#[derive(Debug, Default)]
pub struct MockLocalityProvider {
    ranges: HashMap<Key, LocalityPriceRange>,
    error: Option<ProviderError>,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl MockLocalityProvider {
    /// Create a mock with no data and no failures.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a price band for a (location, property type) key.
    pub fn with_range(
        mut self,
        location: &LocationKey,
        property_type: PropertyType,
        range: LocalityPriceRange,
    ) -> Self {
        let (city, pincode) = location.normalized();
        self.ranges.insert((city, pincode, property_type), range);
        self
    }

    /// Make every lookup fail with the given error.
    pub fn with_error(mut self, error: ProviderError) -> Self {
        self.error = Some(error);
        self
    }

    /// Delay every lookup, simulating a slow upstream.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of lookups performed against this mock.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LocalityPriceProvider for MockLocalityProvider {
    async fn fetch_range(
        &self,
        location: &LocationKey,
        property_type: PropertyType,
    ) -> Result<Option<LocalityPriceRange>, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(err) = &self.error {
            return Err(err.clone());
        }

        let (city, pincode) = location.normalized();
        Ok(self.ranges.get(&(city, pincode, property_type)).cloned())
    }
}
