pub mod api;
pub mod config;
pub mod db;
pub mod domain;
pub mod engine;
pub mod error;
pub mod orchestration;
pub mod provider;
pub mod store;

pub use config::Config;
pub use db::{init_db, Repository};
pub use domain::{
    Asset, AssetField, AssetId, CalculationOutcome, ChangeHistoryEntry, ChangeType, ChangedBy,
    Confidence, LocationKey, OwnerId, PropertyStatus, PropertyType, ValuationResult,
    ValuationSource,
};
pub use engine::ValuationCalculator;
pub use error::AppError;
pub use provider::{
    CachingLocalityProvider, HttpLocalityProvider, LocalityPriceProvider, LocalityPriceRange,
    MockLocalityProvider, ProviderError,
};
pub use store::{ChangeHistoryRecorder, ValuationStore};
