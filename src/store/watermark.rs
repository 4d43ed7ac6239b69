// groupsconnector/src/store/watermark.rs
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

use crate::errors::{AppError, Result};

/// Persisted "synced as of" instant for incremental passes.
#[async_trait]
pub trait WatermarkStore: Send + Sync {
    /// `None` when no pass has ever committed.
    async fn read(&self) -> Result<Option<DateTime<Utc>>>;

    /// Must be durable before returning.
    async fn write(&self, watermark: DateTime<Utc>) -> Result<()>;
}

/// Stores the watermark as an RFC 3339 line in a single file.
#[derive(Debug, Clone)]
pub struct FileWatermarkStore {
    path: PathBuf,
}

impl FileWatermarkStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn parse_watermark(content: &str, path: &Path) -> Result<Option<DateTime<Utc>>> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    DateTime::parse_from_rfc3339(trimmed)
        .map(|ts| Some(ts.with_timezone(&Utc)))
        .map_err(|e| {
            AppError::Watermark(format!(
                "{} does not hold a valid timestamp ({:?}): {}",
                path.display(),
                trimmed,
                e
            ))
        })
}

fn write_atomically(path: &Path, content: &str) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&dir)?;

    let mut tmp = NamedTempFile::new_in(&dir)?;
    tmp.write_all(content.as_bytes())?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| AppError::Io(e.error))?;
    Ok(())
}

#[async_trait]
impl WatermarkStore for FileWatermarkStore {
    async fn read(&self) -> Result<Option<DateTime<Utc>>> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => parse_watermark(&content, &self.path),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::Io(e)),
        }
    }

    async fn write(&self, watermark: DateTime<Utc>) -> Result<()> {
        let path = self.path.clone();
        let content = format!("{}\n", watermark.to_rfc3339());
        tokio::task::spawn_blocking(move || write_atomically(&path, &content))
            .await
            .map_err(|e| AppError::Watermark(format!("watermark write task failed: {}", e)))??;
        tracing::debug!(path = %self.path.display(), %watermark, "watermark committed");
        Ok(())
    }
}
