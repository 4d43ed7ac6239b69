// groupsconnector/src/store/groups.rs
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::collections::HashSet;
use std::path::Path;

use crate::errors::Result;
use crate::graph::models::DirectoryGroup;
use crate::sync::SourceRecord;

const CREATE_GROUPS_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS groups (
        id TEXT PRIMARY KEY NOT NULL,
        display_name TEXT,
        description TEXT,
        last_updated TEXT NOT NULL,
        deleted_at TEXT
    )
"#;

const CREATE_DELETED_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS groups_deleted_at_idx ON groups (deleted_at)";

type GroupRow = (
    String,
    Option<String>,
    Option<String>,
    DateTime<Utc>,
    Option<DateTime<Utc>>,
);

fn row_to_record(row: GroupRow) -> SourceRecord {
    let (id, display_name, description, last_updated, deleted_at) = row;
    SourceRecord {
        id,
        display_name,
        description,
        created_at: Some(last_updated),
        deleted_at,
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileSummary {
    pub added: usize,
    pub updated: usize,
    pub deleted: usize,
    pub unchanged: usize,
}

/// Local mirror of the directory. Rows are never removed; a group that
/// disappears from the directory gets `deleted_at` stamped instead.
#[derive(Debug, Clone)]
pub struct GroupStore {
    pool: SqlitePool,
}

impl GroupStore {
    pub async fn open(path: &Path) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;
        Self::with_pool(pool).await
    }

    /// Each in-memory connection is its own database, hence the single-connection pool.
    #[cfg(test)]
    pub async fn in_memory() -> Result<Self> {
        let options: SqliteConnectOptions = "sqlite::memory:".parse()?;
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;
        Self::with_pool(pool).await
    }

    async fn with_pool(pool: SqlitePool) -> Result<Self> {
        sqlx::query(CREATE_GROUPS_TABLE).execute(&pool).await?;
        sqlx::query(CREATE_DELETED_INDEX).execute(&pool).await?;
        Ok(Self { pool })
    }

    pub async fn list_live(&self) -> Result<Vec<SourceRecord>> {
        let rows = sqlx::query_as::<_, GroupRow>(
            "SELECT id, display_name, description, last_updated, deleted_at
             FROM groups WHERE deleted_at IS NULL ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(row_to_record).collect())
    }

    /// Live and tombstoned rows alike.
    pub async fn list_all(&self) -> Result<Vec<SourceRecord>> {
        let rows = sqlx::query_as::<_, GroupRow>(
            "SELECT id, display_name, description, last_updated, deleted_at
             FROM groups ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(row_to_record).collect())
    }

    /// Folds a full directory snapshot into the store, stamping every change with `observed_at`.
    pub async fn reconcile(
        &self,
        snapshot: &[DirectoryGroup],
        observed_at: DateTime<Utc>,
    ) -> Result<ReconcileSummary> {
        let mut summary = ReconcileSummary::default();
        let mut tx = self.pool.begin().await?;

        let existing = sqlx::query_as::<_, GroupRow>(
            "SELECT id, display_name, description, last_updated, deleted_at FROM groups",
        )
        .fetch_all(&mut *tx)
        .await?;
        let existing: std::collections::HashMap<String, SourceRecord> = existing
            .into_iter()
            .map(row_to_record)
            .map(|record| (record.id.clone(), record))
            .collect();

        let mut seen: HashSet<&str> = HashSet::new();
        for group in snapshot {
            if !seen.insert(group.id.as_str()) {
                continue;
            }
            match existing.get(&group.id) {
                None => {
                    sqlx::query(
                        "INSERT INTO groups (id, display_name, description, last_updated, deleted_at)
                         VALUES (?1, ?2, ?3, ?4, NULL)",
                    )
                    .bind(&group.id)
                    .bind(&group.display_name)
                    .bind(&group.description)
                    .bind(observed_at)
                    .execute(&mut *tx)
                    .await?;
                    summary.added += 1;
                }
                Some(current)
                    if current.is_live()
                        && current.display_name == group.display_name
                        && current.description == group.description =>
                {
                    summary.unchanged += 1;
                }
                Some(_) => {
                    sqlx::query(
                        "UPDATE groups
                         SET display_name = ?1, description = ?2, last_updated = ?3, deleted_at = NULL
                         WHERE id = ?4",
                    )
                    .bind(&group.display_name)
                    .bind(&group.description)
                    .bind(observed_at)
                    .bind(&group.id)
                    .execute(&mut *tx)
                    .await?;
                    summary.updated += 1;
                }
            }
        }

        for record in existing.values() {
            if record.is_live() && !seen.contains(record.id.as_str()) {
                sqlx::query("UPDATE groups SET deleted_at = ?1 WHERE id = ?2 AND deleted_at IS NULL")
                    .bind(observed_at)
                    .bind(&record.id)
                    .execute(&mut *tx)
                    .await?;
                summary.deleted += 1;
            }
        }

        tx.commit().await?;
        tracing::debug!(
            added = summary.added,
            updated = summary.updated,
            deleted = summary.deleted,
            unchanged = summary.unchanged,
            "directory snapshot reconciled"
        );
        Ok(summary)
    }
}
