//! Request shapes accepted by storage engines.
//!
//! These travel unchanged over the RPC protocol, so every field has a serde
//! default and optional fields are skipped when empty.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::comment::DeleteMode;
use crate::error::TypeError;
use crate::locator::Locator;
use crate::temporal::duration_nanos;
use crate::user::UserDetail;

/// Fetch one comment.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetRequest {
    pub locator: Locator,
    #[serde(rename = "id")]
    pub comment_id: String,
}

impl GetRequest {
    pub fn new(locator: Locator, comment_id: impl Into<String>) -> Self {
        Self {
            locator,
            comment_id: comment_id.into(),
        }
    }
}

/// Query comments by post, by site or by user.
///
/// Which mode applies depends on the fields set: `locator.url` selects a
/// post, `user_id` selects a user, neither selects the site-wide recent list.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FindRequest {
    pub locator: Locator,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub sort: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub since: Option<DateTime<Utc>>,
    #[serde(default)]
    pub limit: usize,
    #[serde(default)]
    pub skip: usize,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub user_id: String,
}

impl FindRequest {
    /// All comments of a post, sorted by `sort`.
    pub fn for_post(locator: Locator, sort: impl Into<String>) -> Self {
        Self {
            locator,
            sort: sort.into(),
            ..Default::default()
        }
    }

    /// Most recent comments across a site.
    pub fn for_site(site_id: impl Into<String>, limit: usize) -> Self {
        Self {
            locator: Locator::site(site_id),
            sort: "-time".into(),
            limit,
            ..Default::default()
        }
    }

    /// One page of a user's comments, newest first.
    pub fn for_user(
        site_id: impl Into<String>,
        user_id: impl Into<String>,
        limit: usize,
        skip: usize,
    ) -> Self {
        Self {
            locator: Locator::site(site_id),
            user_id: user_id.into(),
            limit,
            skip,
            ..Default::default()
        }
    }

    pub fn since(mut self, since: DateTime<Utc>) -> Self {
        self.since = Some(since);
        self
    }
}

/// Post info for one post (url set) or a page of posts of the site.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InfoRequest {
    pub locator: Locator,
    #[serde(default)]
    pub limit: usize,
    #[serde(default)]
    pub skip: usize,
    /// Overrides the engine's configured read-only age when set.
    #[serde(default, with = "duration_nanos", skip_serializing_if = "Option::is_none")]
    pub read_only_age: Option<Duration>,
}

impl InfoRequest {
    pub fn for_post(locator: Locator) -> Self {
        Self {
            locator,
            ..Default::default()
        }
    }

    pub fn for_site(site_id: impl Into<String>, limit: usize, skip: usize) -> Self {
        Self {
            locator: Locator::site(site_id),
            limit,
            skip,
            ..Default::default()
        }
    }
}

/// Per-post or per-user boolean flags.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Flag {
    #[serde(rename = "readonly")]
    ReadOnly,
    #[serde(rename = "blocked")]
    Blocked,
    #[serde(rename = "verified")]
    Verified,
}

impl Flag {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ReadOnly => "readonly",
            Self::Blocked => "blocked",
            Self::Verified => "verified",
        }
    }
}

impl fmt::Display for Flag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Flag {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "readonly" => Ok(Self::ReadOnly),
            "blocked" => Ok(Self::Blocked),
            "verified" => Ok(Self::Verified),
            other => Err(TypeError::UnsupportedFlag(other.to_string())),
        }
    }
}

/// Read or change a flag.
///
/// `update: None` reads the flag, `Some(true)` sets it and `Some(false)`
/// clears it. `ttl` only applies to [`Flag::Blocked`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlagRequest {
    pub flag: Flag,
    pub locator: Locator,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update: Option<bool>,
    #[serde(default, with = "duration_nanos", skip_serializing_if = "Option::is_none")]
    pub ttl: Option<Duration>,
}

impl FlagRequest {
    /// Read the read-only flag of a post.
    pub fn read_only(locator: Locator) -> Self {
        Self {
            flag: Flag::ReadOnly,
            locator,
            user_id: String::new(),
            update: None,
            ttl: None,
        }
    }

    /// Read a user flag (`blocked` or `verified`).
    pub fn user(flag: Flag, site_id: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            flag,
            locator: Locator::site(site_id),
            user_id: user_id.into(),
            update: None,
            ttl: None,
        }
    }

    /// List request for a flag across a site.
    pub fn list(flag: Flag, site_id: impl Into<String>) -> Self {
        Self::user(flag, site_id, "")
    }

    pub fn set(mut self, value: bool) -> Self {
        self.update = Some(value);
        self
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }
}

/// Read, change or list user details.
///
/// `update: None` reads; `Some("")` deletes the field; any other value sets
/// it. `detail: All` without a user lists every entry of the site.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserDetailRequest {
    pub detail: UserDetail,
    pub locator: Locator,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update: Option<String>,
}

impl UserDetailRequest {
    pub fn get(
        detail: UserDetail,
        site_id: impl Into<String>,
        user_id: impl Into<String>,
    ) -> Self {
        Self {
            detail,
            locator: Locator::site(site_id),
            user_id: user_id.into(),
            update: None,
        }
    }

    pub fn set(
        detail: UserDetail,
        site_id: impl Into<String>,
        user_id: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            update: Some(value.into()),
            ..Self::get(detail, site_id, user_id)
        }
    }

    /// Every user-detail entry of a site.
    pub fn all(site_id: impl Into<String>) -> Self {
        Self::get(UserDetail::All, site_id, "")
    }
}

/// What to delete. Each variant carries exactly the fields it needs.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DeleteRequest {
    /// One comment of a post.
    Comment {
        locator: Locator,
        comment_id: String,
        #[serde(default)]
        mode: DeleteMode,
    },
    /// Every comment of a user, plus the user's details.
    User {
        site_id: String,
        user_id: String,
        #[serde(default)]
        mode: DeleteMode,
    },
    /// One detail field of a user, or all of them.
    UserDetail {
        site_id: String,
        user_id: String,
        detail: UserDetail,
    },
    /// Every table of a site except blocks.
    Site { site_id: String },
}

impl DeleteRequest {
    pub fn site_id(&self) -> &str {
        match self {
            Self::Comment { locator, .. } => &locator.site_id,
            Self::User { site_id, .. }
            | Self::UserDetail { site_id, .. }
            | Self::Site { site_id } => site_id,
        }
    }
}
