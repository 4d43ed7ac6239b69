// groupsconnector/src/sync/logic.rs
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::collections::HashMap;

use super::planner::{SourceRecord, SyncMode, plan_sync};
use crate::graph::items::item_for_record;
use crate::graph::{GroupDirectory, IndexClient};
use crate::store::{GroupStore, ReconcileSummary, WatermarkStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemAction {
    Upsert,
    Delete,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemFailure {
    pub id: String,
    pub action: ItemAction,
    pub error: String,
}

/// What one sync pass did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassReport {
    pub started_at: DateTime<Utc>,
    pub previous_watermark: Option<DateTime<Utc>>,
    pub reconcile: ReconcileSummary,
    pub planned_upserts: usize,
    pub planned_deletes: usize,
    pub upserted: usize,
    pub deleted: usize,
    /// Deletes the index answered with 404; counted as done.
    pub already_absent: usize,
    pub failures: Vec<ItemFailure>,
    pub watermark_advanced: bool,
}

impl PassReport {
    pub fn succeeded(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Runs one sync pass against `connection_id`, starting the clock now.
pub async fn perform_sync_pass<I, D, W>(
    index: &I,
    directory: &D,
    store: &GroupStore,
    watermarks: &W,
    connection_id: &str,
    mode: SyncMode,
) -> Result<PassReport>
where
    I: IndexClient + ?Sized,
    D: GroupDirectory + ?Sized,
    W: WatermarkStore + ?Sized,
{
    execute_pass(index, directory, store, watermarks, connection_id, mode, Utc::now()).await
}

/// The pass proper. `started_at` is captured before the directory is read and
/// becomes the new watermark only if every item in the plan succeeded.
pub(crate) async fn execute_pass<I, D, W>(
    index: &I,
    directory: &D,
    store: &GroupStore,
    watermarks: &W,
    connection_id: &str,
    mode: SyncMode,
    started_at: DateTime<Utc>,
) -> Result<PassReport>
where
    I: IndexClient + ?Sized,
    D: GroupDirectory + ?Sized,
    W: WatermarkStore + ?Sized,
{
    let previous_watermark = watermarks
        .read()
        .await
        .context("Failed to read the last upload time")?;

    let snapshot = directory
        .list_groups()
        .await
        .context("Failed to list directory groups")?;
    let reconcile = store
        .reconcile(&snapshot, started_at)
        .await
        .context("Failed to record directory snapshot in the local store")?;

    let records = match mode {
        SyncMode::Full => store.list_live().await,
        SyncMode::Incremental => store.list_all().await,
    }
    .context("Failed to read groups from the local store")?;

    let plan = plan_sync(&records, previous_watermark, mode);
    tracing::info!(
        connection_id,
        ?mode,
        previous_watermark = ?previous_watermark,
        upserts = plan.to_upsert.len(),
        deletes = plan.to_delete.len(),
        "sync plan computed"
    );

    if plan.is_empty() {
        tracing::info!(connection_id, "nothing to push");
    }

    let by_id: HashMap<&str, &SourceRecord> =
        records.iter().map(|r| (r.id.as_str(), r)).collect();

    let mut report = PassReport {
        started_at,
        previous_watermark,
        reconcile,
        planned_upserts: plan.to_upsert.len(),
        planned_deletes: plan.to_delete.len(),
        upserted: 0,
        deleted: 0,
        already_absent: 0,
        failures: Vec::new(),
        watermark_advanced: false,
    };

    for id in &plan.to_upsert {
        let Some(record) = by_id.get(id.as_str()) else {
            continue;
        };
        let item = item_for_record(record);
        match index.upsert_item(connection_id, &item).await {
            Ok(()) => {
                tracing::info!(connection_id, item_id = %id, "group uploaded");
                report.upserted += 1;
            }
            Err(e) => {
                tracing::warn!(connection_id, item_id = %id, status = ?e.status(), error = %e, "failed to upload group");
                report.failures.push(ItemFailure {
                    id: id.clone(),
                    action: ItemAction::Upsert,
                    error: e.to_string(),
                });
            }
        }
    }

    for id in &plan.to_delete {
        match index.delete_item(connection_id, id).await {
            Ok(()) => {
                tracing::info!(connection_id, item_id = %id, "group removed from index");
                report.deleted += 1;
            }
            Err(e) if e.is_not_found() => {
                tracing::info!(connection_id, item_id = %id, "group already absent from index");
                report.already_absent += 1;
            }
            Err(e) => {
                tracing::warn!(connection_id, item_id = %id, status = ?e.status(), error = %e, "failed to remove group");
                report.failures.push(ItemFailure {
                    id: id.clone(),
                    action: ItemAction::Delete,
                    error: e.to_string(),
                });
            }
        }
    }

    if report.succeeded() {
        watermarks
            .write(started_at)
            .await
            .context("Failed to save the last upload time")?;
        report.watermark_advanced = true;
    } else {
        tracing::warn!(
            failures = report.failures.len(),
            "sync pass had failures, last upload time left unchanged"
        );
    }

    Ok(report)
}
