use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::locator::Locator;
use crate::reference::CommentRef;

/// Identifier used for the author of hard-deleted comments.
pub const DELETED_USER: &str = "deleted";

/// Comment author as stored with each comment.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub picture: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub ip: String,
    #[serde(default)]
    pub admin: bool,
    #[serde(default)]
    pub blocked: bool,
    #[serde(default)]
    pub verified: bool,
}

impl User {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            ..Default::default()
        }
    }

    /// The sentinel author that replaces the real one on hard delete.
    pub fn deleted() -> Self {
        Self::new(DELETED_USER, DELETED_USER)
    }
}

/// Marker of the last edit applied to a comment.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edit {
    pub time: DateTime<Utc>,
    #[serde(default)]
    pub summary: String,
}

/// How a comment is removed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeleteMode {
    /// Clear the text but keep the author and the row.
    #[default]
    Soft,
    /// Soft delete plus erasure of the author identity.
    Hard,
}

/// A single comment.
///
/// `id`, `parent_id`, `locator` and `timestamp` are fixed at creation; every
/// other field may change through moderation or voting.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: String,
    #[serde(rename = "pid", default, skip_serializing_if = "String::is_empty")]
    pub parent_id: String,
    #[serde(default)]
    pub text: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub orig: String,
    pub user: User,
    pub locator: Locator,
    #[serde(default)]
    pub score: i64,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub votes: BTreeMap<String, bool>,
    #[serde(default)]
    pub vote: i64,
    #[serde(default)]
    pub controversy: f64,
    #[serde(rename = "time")]
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edit: Option<Edit>,
    #[serde(rename = "pin", default)]
    pub pinned: bool,
    #[serde(rename = "delete", default)]
    pub deleted: bool,
    #[serde(rename = "title", default, skip_serializing_if = "String::is_empty")]
    pub post_title: String,
}

impl Comment {
    /// The reference this comment is indexed under.
    pub fn reference(&self) -> CommentRef {
        CommentRef::new(&self.locator.url, &self.id)
    }

    /// Apply a delete in place. The row survives so replies keep their thread.
    pub fn set_deleted(&mut self, mode: DeleteMode) {
        self.text.clear();
        self.orig.clear();
        self.score = 0;
        self.vote = 0;
        self.votes.clear();
        self.deleted = true;
        self.pinned = false;
        self.edit = None;
        if mode == DeleteMode::Hard {
            self.user = User::deleted();
        }
    }

    /// Copy the creation-time fields from `stored` back over `self`.
    pub fn restore_immutable(&mut self, stored: &Comment) {
        self.id = stored.id.clone();
        self.parent_id = stored.parent_id.clone();
        self.locator = stored.locator.clone();
        self.timestamp = stored.timestamp;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample() -> Comment {
        Comment {
            id: "id-1".into(),
            parent_id: "p-1".into(),
            text: "<p>some text</p>".into(),
            orig: "some text".into(),
            user: User::new("user1", "user name"),
            locator: Locator::new("radio-t", "https://radio-t.com"),
            timestamp: Utc.with_ymd_and_hms(2017, 12, 20, 15, 18, 22).unwrap(),
            pinned: true,
            ..Default::default()
        }
    }

    #[test]
    fn soft_delete_keeps_user() {
        let mut c = sample();
        c.set_deleted(DeleteMode::Soft);
        assert!(c.deleted);
        assert_eq!(c.text, "");
        assert_eq!(c.orig, "");
        assert!(!c.pinned);
        assert_eq!(c.user, User::new("user1", "user name"));
    }

    #[test]
    fn hard_delete_replaces_user() {
        let mut c = sample();
        c.set_deleted(DeleteMode::Hard);
        assert!(c.deleted);
        assert_eq!(c.user.id, "deleted");
        assert_eq!(c.user.name, "deleted");
    }

    #[test]
    fn restore_immutable_fields() {
        let stored = sample();
        let mut update = sample();
        update.id = "other".into();
        update.parent_id = String::new();
        update.locator = Locator::new("x", "y");
        update.timestamp = Utc::now();
        update.text = "edited".into();

        update.restore_immutable(&stored);
        assert_eq!(update.id, stored.id);
        assert_eq!(update.parent_id, stored.parent_id);
        assert_eq!(update.locator, stored.locator);
        assert_eq!(update.timestamp, stored.timestamp);
        assert_eq!(update.text, "edited");
    }

    #[test]
    fn json_field_names() {
        let c = sample();
        let v = serde_json::to_value(&c).unwrap();
        assert_eq!(v["pid"], "p-1");
        assert_eq!(v["pin"], true);
        assert_eq!(v["delete"], false);
        assert_eq!(v["locator"]["site"], "radio-t");
        assert!(v.get("votes").is_none());

        let back: Comment = serde_json::from_value(v).unwrap();
        assert_eq!(back, c);
    }

    #[test]
    fn nanoseconds_survive_json() {
        let mut c = sample();
        c.timestamp = Utc.timestamp_opt(1_513_783_102, 123_456_789).unwrap();
        let back: Comment = serde_json::from_str(&serde_json::to_string(&c).unwrap()).unwrap();
        assert_eq!(back.timestamp, c.timestamp);
    }

    #[test]
    fn reference_uses_url_and_id() {
        assert_eq!(sample().reference().encode(), "https://radio-t.com!!id-1");
    }
}
