//! Composition of provider, calculator, and store into the three execution
//! paths: fire-and-forget trigger, on-demand refresh, and scheduled batch.

pub mod batch;
pub mod refresh;
pub mod trigger;

pub use batch::{BatchOptions, BatchRefreshJob, BatchScope, BatchSummary};
pub use refresh::{RefreshError, RefreshOutcome, RefreshPipeline};
pub use trigger::ValuationTrigger;
