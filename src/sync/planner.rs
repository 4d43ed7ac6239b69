// groupsconnector/src/sync/planner.rs
//! Decides which records a pass pushes to the index and which it removes.

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

/// A directory group as the sync pass sees it.
///
/// `created_at` is the last time the group was created or modified in the
/// source. A record is tombstoned when `deleted_at` is set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceRecord {
    pub id: String,
    pub display_name: Option<String>,
    pub description: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl SourceRecord {
    pub fn is_live(&self) -> bool {
        self.deleted_at.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncMode {
    /// Push changes newer than the watermark, delete tombstones newer than it.
    Incremental,
    /// Push every live record, never delete.
    Full,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncPlan {
    pub to_upsert: Vec<String>,
    pub to_delete: Vec<String>,
}

impl SyncPlan {
    pub fn is_empty(&self) -> bool {
        self.to_upsert.is_empty() && self.to_delete.is_empty()
    }
}

/// `None` on either side stands for the beginning of time; the comparison is strict.
fn is_after(timestamp: Option<DateTime<Utc>>, watermark: Option<DateTime<Utc>>) -> bool {
    match (timestamp, watermark) {
        (Some(ts), Some(wm)) => ts > wm,
        (Some(_), None) => true,
        (None, _) => false,
    }
}

/// Builds the plan for one pass. Output is sorted by id; a repeated id keeps
/// its last occurrence.
pub fn plan_sync(
    records: &[SourceRecord],
    watermark: Option<DateTime<Utc>>,
    mode: SyncMode,
) -> SyncPlan {
    let mut latest: BTreeMap<&str, &SourceRecord> = BTreeMap::new();
    for record in records {
        latest.insert(record.id.as_str(), record);
    }

    let mut plan = SyncPlan::default();
    for (id, record) in latest {
        match (mode, record.is_live()) {
            (SyncMode::Full, true) => plan.to_upsert.push(id.to_string()),
            (SyncMode::Full, false) => {}
            (SyncMode::Incremental, true) => {
                if is_after(record.created_at, watermark) {
                    plan.to_upsert.push(id.to_string());
                }
            }
            (SyncMode::Incremental, false) => {
                if is_after(record.deleted_at, watermark) {
                    plan.to_delete.push(id.to_string());
                }
            }
        }
    }
    plan
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn t(offset_minutes: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap() + Duration::minutes(offset_minutes)
    }

    fn live(id: &str, created_at: Option<DateTime<Utc>>) -> SourceRecord {
        SourceRecord {
            id: id.to_string(),
            display_name: Some(format!("Group {}", id)),
            description: None,
            created_at,
            deleted_at: None,
        }
    }

    fn tombstone(id: &str, deleted_at: DateTime<Utc>) -> SourceRecord {
        SourceRecord {
            id: id.to_string(),
            display_name: None,
            description: None,
            created_at: None,
            deleted_at: Some(deleted_at),
        }
    }

    fn ids(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    fn scenario() -> Vec<SourceRecord> {
        vec![live("a", Some(t(1))), live("b", Some(t(0))), tombstone("c", t(2))]
    }

    #[test]
    fn test_incremental_scenario() {
        let plan = plan_sync(&scenario(), Some(t(0)), SyncMode::Incremental);
        assert_eq!(plan.to_upsert, ids(&["a"]));
        assert_eq!(plan.to_delete, ids(&["c"]));
    }

    #[test]
    fn test_full_scenario() {
        let plan = plan_sync(&scenario(), Some(t(0)), SyncMode::Full);
        assert_eq!(plan.to_upsert, ids(&["a", "b"]));
        assert!(plan.to_delete.is_empty());
    }

    #[test]
    fn test_full_sync_ignores_timestamps() {
        let records = vec![
            live("old", Some(t(-500))),
            live("undated", None),
            tombstone("gone", t(500)),
        ];
        for watermark in [None, Some(t(0)), Some(t(10_000))] {
            let plan = plan_sync(&records, watermark, SyncMode::Full);
            assert_eq!(plan.to_upsert, ids(&["old", "undated"]));
            assert!(plan.to_delete.is_empty());
        }
    }

    #[test]
    fn test_incremental_boundary_is_exclusive() {
        let records = vec![live("same", Some(t(5))), tombstone("same-del", t(5))];
        let plan = plan_sync(&records, Some(t(5)), SyncMode::Incremental);
        assert!(plan.is_empty());

        let plan = plan_sync(&records, Some(t(4)), SyncMode::Incremental);
        assert_eq!(plan.to_upsert, ids(&["same"]));
        assert_eq!(plan.to_delete, ids(&["same-del"]));
    }

    #[test]
    fn test_absent_watermark_includes_every_dated_record() {
        let records = vec![
            live("x", Some(t(-10_000))),
            live("undated", None),
            tombstone("y", t(-10_000)),
        ];
        let plan = plan_sync(&records, None, SyncMode::Incremental);
        assert_eq!(plan.to_upsert, ids(&["x"]));
        assert_eq!(plan.to_delete, ids(&["y"]));
    }

    #[test]
    fn test_old_tombstones_are_not_deleted_again() {
        let records = vec![tombstone("ancient", t(-60))];
        let plan = plan_sync(&records, Some(t(0)), SyncMode::Incremental);
        assert!(plan.to_delete.is_empty());
    }

    #[test]
    fn test_output_is_sorted_and_stable() {
        let records = vec![
            live("m", Some(t(3))),
            live("b", Some(t(3))),
            tombstone("z", t(3)),
            live("a", Some(t(3))),
            tombstone("k", t(3)),
        ];
        let first = plan_sync(&records, Some(t(0)), SyncMode::Incremental);
        assert_eq!(first.to_upsert, ids(&["a", "b", "m"]));
        assert_eq!(first.to_delete, ids(&["k", "z"]));

        let mut reversed = records.clone();
        reversed.reverse();
        assert_eq!(plan_sync(&reversed, Some(t(0)), SyncMode::Incremental), first);
    }

    #[test]
    fn test_repeated_plan_with_same_watermark_is_identical() {
        let records = scenario();
        let first = plan_sync(&records, Some(t(0)), SyncMode::Incremental);
        let second = plan_sync(&records, Some(t(0)), SyncMode::Incremental);
        assert_eq!(first, second);
    }

    #[test]
    fn test_duplicate_ids_keep_last_occurrence() {
        let records = vec![live("dup", Some(t(9))), tombstone("dup", t(9))];
        let plan = plan_sync(&records, Some(t(0)), SyncMode::Incremental);
        assert!(plan.to_upsert.is_empty());
        assert_eq!(plan.to_delete, ids(&["dup"]));

        let records = vec![tombstone("dup", t(9)), live("dup", Some(t(9)))];
        let plan = plan_sync(&records, Some(t(0)), SyncMode::Incremental);
        assert_eq!(plan.to_upsert, ids(&["dup"]));
        assert!(plan.to_delete.is_empty());
    }

    #[test]
    fn test_upserts_and_deletes_are_disjoint() {
        let records = vec![
            live("a", Some(t(1))),
            tombstone("a", t(2)),
            live("b", Some(t(1))),
            tombstone("c", t(1)),
        ];
        let plan = plan_sync(&records, None, SyncMode::Incremental);
        for id in &plan.to_upsert {
            assert!(!plan.to_delete.contains(id));
        }
    }
}
