use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use quill_types::{parse_time_key, time_key};
use redb::{Database, ReadableTable, TableDefinition};

use crate::error::{ImageError, ImageResult};
use crate::traits::{ImageStore, StoreInfo};

/// Committed images: id -> bytes
const COMMITTED: TableDefinition<'static, &'static str, &'static [u8]> =
    TableDefinition::new("images_committed");

/// Staged images: id -> bytes
const STAGED: TableDefinition<'static, &'static str, &'static [u8]> =
    TableDefinition::new("images_staged");

/// Staging insert times: id -> time key
const INSERT_TIMES: TableDefinition<'static, &'static str, &'static str> =
    TableDefinition::new("insert_times");

/// Image store kept in a single redb file.
pub struct DiskImageStore {
    db: Database,
    path: PathBuf,
}

impl DiskImageStore {
    /// Open (or create) the store at `path`.
    pub fn open(path: impl AsRef<Path>) -> ImageResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let db = Database::create(path)?;
        let txn = db.begin_write()?;
        txn.open_table(COMMITTED)?;
        txn.open_table(STAGED)?;
        txn.open_table(INSERT_TIMES)?;
        txn.commit()?;

        tracing::info!(path = %path.display(), "image store opened");
        Ok(Self {
            db,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Staged ids inserted before `now - ttl`, oldest first.
    fn expired(&self, ttl: chrono::Duration, now: DateTime<Utc>) -> ImageResult<Vec<String>> {
        let txn = self.db.begin_read()?;
        let times = txn.open_table(INSERT_TIMES)?;
        let mut expired = Vec::new();
        for item in times.iter()? {
            let (id, inserted) = item?;
            let Ok(inserted) = parse_time_key(inserted.value()) else {
                tracing::warn!(id = id.value(), "unreadable staging time");
                continue;
            };
            if inserted + ttl < now {
                expired.push((inserted, id.value().to_string()));
            }
        }
        expired.sort();
        Ok(expired.into_iter().map(|(_, id)| id).collect())
    }

    /// Drop one staged image if its insert time is still past the cutoff.
    /// A save or timer reset since the scan keeps it.
    fn remove_expired(&self, id: &str, ttl: chrono::Duration, now: DateTime<Utc>) -> ImageResult<bool> {
        let txn = self.db.begin_write()?;
        let still_expired = {
            let times = txn.open_table(INSERT_TIMES)?;
            let inserted = times.get(id)?;
            inserted.is_some_and(|inserted| {
                parse_time_key(inserted.value()).is_ok_and(|inserted| inserted + ttl < now)
            })
        };
        if !still_expired {
            txn.abort()?;
            return Ok(false);
        }

        {
            let mut times = txn.open_table(INSERT_TIMES)?;
            times.remove(id)?;
            let mut staged = txn.open_table(STAGED)?;
            if staged.remove(id)?.is_none() {
                tracing::warn!(id, "staged image missing for expired insert time");
            }
        }
        txn.commit()?;
        Ok(true)
    }
}

impl ImageStore for DiskImageStore {
    fn save(&self, id: &str, data: &[u8]) -> ImageResult<()> {
        let now = time_key(&Utc::now());
        let txn = self.db.begin_write()?;
        {
            let mut staged = txn.open_table(STAGED)?;
            staged.insert(id, data)?;
            let mut times = txn.open_table(INSERT_TIMES)?;
            times.insert(id, now.as_str())?;
        }
        txn.commit()?;
        tracing::debug!(id, size = data.len(), "image staged");
        Ok(())
    }

    fn commit(&self, id: &str) -> ImageResult<()> {
        let txn = self.db.begin_write()?;
        {
            let data = {
                let staged = txn.open_table(STAGED)?;
                let guard = staged.get(id)?;
                guard.map(|g| g.value().to_vec())
            };
            let data = data.ok_or_else(|| ImageError::NotInStaging(id.to_string()))?;
            let mut committed = txn.open_table(COMMITTED)?;
            committed.insert(id, data.as_slice())?;
        }
        txn.commit()?;
        tracing::debug!(id, "image committed");
        Ok(())
    }

    fn load(&self, id: &str) -> ImageResult<Vec<u8>> {
        let txn = self.db.begin_read()?;
        let committed = txn.open_table(COMMITTED)?;
        if let Some(data) = committed.get(id)? {
            return Ok(data.value().to_vec());
        }
        let staged = txn.open_table(STAGED)?;
        if let Some(data) = staged.get(id)? {
            return Ok(data.value().to_vec());
        }
        Err(ImageError::NotFound(id.to_string()))
    }

    fn reset_cleanup_timer(&self, id: &str) -> ImageResult<()> {
        let now = time_key(&Utc::now());
        let txn = self.db.begin_write()?;
        {
            let staged = txn.open_table(STAGED)?;
            if staged.get(id)?.is_some() {
                let mut times = txn.open_table(INSERT_TIMES)?;
                times.insert(id, now.as_str())?;
            }
        }
        txn.commit()?;
        Ok(())
    }

    fn cleanup(&self, ttl: Duration) -> ImageResult<()> {
        let Ok(ttl) = chrono::Duration::from_std(ttl) else {
            return Ok(());
        };
        let now = Utc::now();
        let expired = self.expired(ttl, now)?;

        let mut removed = 0;
        for id in &expired {
            if self.remove_expired(id, ttl, now)? {
                removed += 1;
            }
        }

        if removed > 0 {
            tracing::debug!(removed, "staged images cleaned up");
        }
        Ok(())
    }

    fn info(&self) -> ImageResult<StoreInfo> {
        let txn = self.db.begin_read()?;
        let times = txn.open_table(INSERT_TIMES)?;
        let mut first: Option<DateTime<Utc>> = None;
        for item in times.iter()? {
            let (_, inserted) = item?;
            if let Ok(ts) = parse_time_key(inserted.value()) {
                first = Some(first.map_or(ts, |f| f.min(ts)));
            }
        }
        Ok(StoreInfo {
            first_staging_image_ts: first,
        })
    }
}

impl std::fmt::Debug for DiskImageStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiskImageStore").field("path", &self.path).finish()
    }
}
