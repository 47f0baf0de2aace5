use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ImageResult;

/// Snapshot of an image store.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreInfo {
    /// Insert time of the oldest staged image, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_staging_image_ts: Option<DateTime<Utc>>,
}

/// Two-phase image storage.
///
/// Uploads land in staging and expire after a TTL unless committed.
/// Committed images are never removed by cleanup.
pub trait ImageStore: Send + Sync {
    /// Stage `data` under `id`. Re-saving resets the cleanup timer.
    fn save(&self, id: &str, data: &[u8]) -> ImageResult<()>;

    /// Copy a staged image into permanent storage.
    fn commit(&self, id: &str) -> ImageResult<()>;

    /// Committed bytes, falling back to staging.
    fn load(&self, id: &str) -> ImageResult<Vec<u8>>;

    /// Restart the TTL of a staged image. No-op for unknown ids.
    fn reset_cleanup_timer(&self, id: &str) -> ImageResult<()>;

    /// Remove staged images older than `ttl`, oldest first.
    fn cleanup(&self, ttl: Duration) -> ImageResult<()>;

    fn info(&self) -> ImageResult<StoreInfo>;
}
