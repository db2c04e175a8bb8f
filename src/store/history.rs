//! Change-history recording and querying.

use crate::db::Repository;
use crate::domain::{AssetId, ChangeHistoryEntry, ChangeType};
use std::sync::Arc;
use tracing::error;

/// Recorder for the append-only audit trail.
///
/// `record` fails open: an audit gap is logged loudly but never rolls back or
/// fails the mutation that produced it.
#[derive(Clone)]
pub struct ChangeHistoryRecorder {
    repo: Arc<Repository>,
}

impl ChangeHistoryRecorder {
    pub fn new(repo: Arc<Repository>) -> Self {
        Self { repo }
    }

    /// Append one entry. Failures are logged and swallowed.
    pub async fn record(&self, entry: ChangeHistoryEntry) {
        if let Err(e) = self.repo.insert_history(&entry).await {
            error!(
                "AUDIT GAP: failed to record history for asset {} ({} / {}): {}",
                entry.asset_id,
                entry.change_type.as_str(),
                entry.field_name,
                e
            );
        }
    }

    /// Read history for an asset, newest first.
    pub async fn query(
        &self,
        asset_id: &AssetId,
        change_type: Option<ChangeType>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<ChangeHistoryEntry>, sqlx::Error> {
        self.repo
            .query_history(asset_id, change_type, limit, offset)
            .await
    }
}
