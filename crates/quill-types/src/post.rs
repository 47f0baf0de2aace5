use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Counters and markers of a single post.
///
/// `count` is the number of live comments. `first_time` and `last_time` are
/// the oldest and newest live comment timestamps.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostInfo {
    pub url: String,
    #[serde(default)]
    pub count: usize,
    #[serde(default)]
    pub first_time: DateTime<Utc>,
    #[serde(default)]
    pub last_time: DateTime<Utc>,
    #[serde(default)]
    pub read_only: bool,
}

impl PostInfo {
    /// Info for a post that just received its first comment.
    pub fn first(url: impl Into<String>, ts: DateTime<Utc>) -> Self {
        Self {
            url: url.into(),
            count: 1,
            first_time: ts,
            last_time: ts,
            read_only: false,
        }
    }

    /// Account for one more live comment at `ts`.
    pub fn record(&mut self, ts: DateTime<Utc>) {
        if self.count == 0 {
            self.first_time = ts;
            self.last_time = ts;
        } else {
            self.first_time = self.first_time.min(ts);
            self.last_time = self.last_time.max(ts);
        }
        self.count += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn record_tracks_range() {
        let t0 = Utc::now();
        let mut info = PostInfo::first("u", t0);
        info.record(t0 + Duration::seconds(5));
        info.record(t0 - Duration::seconds(5));
        assert_eq!(info.count, 3);
        assert_eq!(info.first_time, t0 - Duration::seconds(5));
        assert_eq!(info.last_time, t0 + Duration::seconds(5));
    }

    #[test]
    fn record_after_all_deleted_resets_range() {
        let t0 = Utc::now();
        let mut info = PostInfo::first("u", t0);
        info.count = 0;
        let t1 = t0 + Duration::seconds(30);
        info.record(t1);
        assert_eq!(info.count, 1);
        assert_eq!(info.first_time, t1);
        assert_eq!(info.last_time, t1);
    }
}
