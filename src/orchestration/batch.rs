//! Scheduled bulk re-valuation with bounded concurrency and per-item failure
//! isolation.
//!
//! Assets are processed in small concurrent chunks with a pause in between so
//! the locality lookup path is never swamped. One item's failure is recorded
//! and never aborts the run; the job only errors when the asset list itself
//! cannot be fetched. There are no in-run retries, the next scheduled run is
//! the retry mechanism.

use crate::db::Repository;
use crate::domain::{AssetId, OwnerId};
use crate::orchestration::refresh::{RefreshOutcome, RefreshPipeline};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{info, warn};

/// Which assets a batch run covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchScope {
    All,
    Owner(OwnerId),
}

#[derive(Debug, Clone)]
pub struct BatchOptions {
    /// Items valued within this many days are skipped.
    pub skip_recent_days: i64,
    /// Items processed concurrently per chunk.
    pub concurrency: usize,
    /// Pause between chunks.
    pub pause: Duration,
    /// Stop dispatching new chunks past this point; in-flight items finish
    /// naturally and a partial summary is returned.
    pub deadline: Option<Instant>,
}

impl Default for BatchOptions {
    fn default() -> Self {
        BatchOptions {
            skip_recent_days: 90,
            concurrency: 3,
            pause: Duration::from_millis(250),
            deadline: None,
        }
    }
}

/// One failed item in a batch run.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchItemError {
    pub asset_id: AssetId,
    pub message: String,
}

/// Aggregate result of one batch run.
///
/// `processed` counts items that went through the calculator path
/// (`successful + failed`); deliberate non-processing of any kind (recent
/// valuation, missing inputs, user override) lands in `skipped`.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchSummary {
    pub total: usize,
    pub processed: usize,
    pub skipped: usize,
    pub successful: usize,
    pub failed: usize,
    pub errors: Vec<BatchItemError>,
}

/// Terminal state of one asset's pass through the batch.
enum ItemOutcome {
    Skipped,
    Applied,
    SkippedOverride,
    Insufficient,
    Failed(String),
}

#[derive(Clone)]
pub struct BatchRefreshJob {
    repo: Arc<Repository>,
    pipeline: Arc<RefreshPipeline>,
}

impl BatchRefreshJob {
    pub fn new(repo: Arc<Repository>, pipeline: Arc<RefreshPipeline>) -> Self {
        Self { repo, pipeline }
    }

    /// Run one refresh pass over the scope.
    ///
    /// # Errors
    /// Only when the asset list itself cannot be fetched; per-item failures
    /// are folded into the summary.
    pub async fn run(
        &self,
        scope: &BatchScope,
        options: &BatchOptions,
    ) -> Result<BatchSummary, sqlx::Error> {
        let owner = match scope {
            BatchScope::All => None,
            BatchScope::Owner(owner) => Some(owner),
        };
        let asset_ids = self.repo.list_asset_ids(owner).await?;

        let mut summary = BatchSummary {
            total: asset_ids.len(),
            ..Default::default()
        };
        let cutoff = Utc::now() - ChronoDuration::days(options.skip_recent_days.max(0));
        let chunk_size = options.concurrency.max(1);

        info!(
            "Batch refresh starting: {} assets, chunks of {}",
            summary.total, chunk_size
        );

        let mut chunks = asset_ids.chunks(chunk_size).peekable();
        while let Some(chunk) = chunks.next() {
            if let Some(deadline) = options.deadline {
                if Instant::now() >= deadline {
                    warn!(
                        "Batch refresh deadline reached; returning partial summary \
                         ({} of {} items dispatched)",
                        summary.processed + summary.skipped,
                        summary.total
                    );
                    break;
                }
            }

            let outcomes = futures::future::join_all(
                chunk
                    .iter()
                    .map(|asset_id| self.process_one(asset_id, cutoff)),
            )
            .await;

            for (asset_id, outcome) in chunk.iter().zip(outcomes) {
                match outcome {
                    ItemOutcome::Applied => {
                        summary.processed += 1;
                        summary.successful += 1;
                    }
                    ItemOutcome::Failed(message) => {
                        summary.processed += 1;
                        summary.failed += 1;
                        summary.errors.push(BatchItemError {
                            asset_id: asset_id.clone(),
                            message,
                        });
                    }
                    ItemOutcome::Skipped
                    | ItemOutcome::SkippedOverride
                    | ItemOutcome::Insufficient => summary.skipped += 1,
                }
            }

            if chunks.peek().is_some() {
                tokio::time::sleep(options.pause).await;
            }
        }

        info!(
            "Batch refresh finished: {} total, {} successful, {} skipped, {} failed",
            summary.total, summary.successful, summary.skipped, summary.failed
        );
        Ok(summary)
    }

    async fn process_one(&self, asset_id: &AssetId, cutoff: DateTime<Utc>) -> ItemOutcome {
        let asset = match self.repo.get_asset(asset_id).await {
            Ok(Some(asset)) => asset,
            Ok(None) => return ItemOutcome::Failed("asset disappeared during batch".to_string()),
            Err(e) => return ItemOutcome::Failed(e.to_string()),
        };

        if let Some(at) = asset.valuation_last_updated {
            if at > cutoff {
                return ItemOutcome::Skipped;
            }
        }
        if !asset.has_valuation_inputs() {
            return ItemOutcome::Skipped;
        }

        match self.pipeline.refresh_loaded(&asset).await {
            Ok(RefreshOutcome::Applied(_)) => ItemOutcome::Applied,
            Ok(RefreshOutcome::SkippedOverride) => ItemOutcome::SkippedOverride,
            Ok(RefreshOutcome::InsufficientData(_)) => ItemOutcome::Insufficient,
            Err(e) => ItemOutcome::Failed(e.to_string()),
        }
    }
}
