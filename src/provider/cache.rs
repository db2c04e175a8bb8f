//! TTL cache wrapper around a locality price provider.
//!
//! The cache is an explicit, injectable store keyed by (location, property
//! type), not a process-wide singleton. "No data" answers are cached too, so a
//! batch run does not hammer the upstream for localities it has already asked
//! about. Concurrent writers for the same key are fine: cached values are
//! derived, not authoritative, so last write wins.

use super::{LocalityPriceProvider, LocalityPriceRange, ProviderError};
use crate::domain::{LocationKey, PropertyType};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::debug;

type CacheKey = (String, String, PropertyType);

#[derive(Debug, Clone)]
struct CachedRange {
    fetched_at: Instant,
    range: Option<LocalityPriceRange>,
}

/// Caching decorator for any `LocalityPriceProvider`.
#[derive(Debug)]
pub struct CachingLocalityProvider {
    inner: Arc<dyn LocalityPriceProvider>,
    ttl: Duration,
    entries: RwLock<HashMap<CacheKey, CachedRange>>,
}

impl CachingLocalityProvider {
    pub fn new(inner: Arc<dyn LocalityPriceProvider>, ttl: Duration) -> Self {
        Self {
            inner,
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    fn key(location: &LocationKey, property_type: PropertyType) -> CacheKey {
        let (city, pincode) = location.normalized();
        (city, pincode, property_type)
    }

    /// Number of live entries, for tests and diagnostics.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}

#[async_trait]
impl LocalityPriceProvider for CachingLocalityProvider {
    async fn fetch_range(
        &self,
        location: &LocationKey,
        property_type: PropertyType,
    ) -> Result<Option<LocalityPriceRange>, ProviderError> {
        let key = Self::key(location, property_type);

        if let Some(cached) = self.entries.read().await.get(&key) {
            if cached.fetched_at.elapsed() < self.ttl {
                debug!("Locality cache hit for {:?}", key);
                return Ok(cached.range.clone());
            }
        }

        // Errors are not cached; the next caller asks the upstream again.
        let range = self.inner.fetch_range(location, property_type).await?;

        self.entries.write().await.insert(
            key,
            CachedRange {
                fetched_at: Instant::now(),
                range: range.clone(),
            },
        );

        Ok(range)
    }
}
